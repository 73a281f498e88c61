//! 控制台输入
//!
//! 专用输入线程持有 rustyline 编辑器，通过通道把每行输入交给主循环，
//! 主循环因此可以同时处理 Ctrl+C 和后台任务。

use anyhow::Result;
use armlink_client::Mode;
use crossbeam_channel::{Receiver, Sender, bounded};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// 输入线程在读到这些命令后保存历史并退出
pub const EXIT_COMMANDS: [&str; 2] = ["exit", "quit"];

/// 输入事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// 行编辑状态下的 Ctrl+C
    Interrupted,
    /// Ctrl+D 或输入关闭
    Closed,
}

/// 两种模式对应的提示符
///
/// 输入线程在每次读取前查看当前模式。
#[derive(Debug, Default)]
pub struct PromptMode(AtomicBool);

impl PromptMode {
    pub fn set(&self, mode: Mode) {
        self.0.store(mode == Mode::Reading, Ordering::Relaxed);
    }

    pub fn prompt(&self) -> &'static str {
        if self.0.load(Ordering::Relaxed) {
            "pose> "
        } else {
            "armlink> "
        }
    }
}

/// 控制台输入线程
pub struct ReplInput {
    events: Receiver<InputEvent>,
    _input_thread: thread::JoinHandle<()>,
}

impl ReplInput {
    pub fn new(history: Option<PathBuf>, prompt: Arc<PromptMode>) -> Result<Self> {
        let (tx, rx) = bounded::<InputEvent>(10);

        // 编辑器在输入线程内创建，生命周期与控制台会话一致
        let input_thread = thread::Builder::new()
            .name("armlink-input".into())
            .spawn(move || match DefaultEditor::new() {
                Ok(mut editor) => {
                    if let Some(path) = &history {
                        // 首次运行时文件不存在
                        editor.load_history(path).ok();
                    }
                    read_loop(editor, history, prompt, tx);
                },
                Err(e) => {
                    eprintln!("Failed to initialize readline: {}", e);
                    let _ = tx.send(InputEvent::Closed);
                },
            })?;

        Ok(Self {
            events: rx,
            _input_thread: input_thread,
        })
    }

    pub fn events(&self) -> &Receiver<InputEvent> {
        &self.events
    }
}

fn read_loop(
    mut editor: DefaultEditor,
    history: Option<PathBuf>,
    prompt: Arc<PromptMode>,
    tx: Sender<InputEvent>,
) {
    loop {
        let mut last = false;
        let event = match editor.readline(prompt.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = editor.add_history_entry(trimmed);
                }
                last = EXIT_COMMANDS.contains(&trimmed);
                InputEvent::Line(line)
            },
            Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
            Err(ReadlineError::Eof) => InputEvent::Closed,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                InputEvent::Closed
            },
        };

        last |= event == InputEvent::Closed;
        if tx.send(event).is_err() || last {
            break;
        }
    }

    if let Some(path) = &history {
        editor.save_history(path).ok();
    }
}
