//! 操作员控制台协作接口
//!
//! 规划器和解释器只通过 [`Console`] 向操作员报告，不直接打印。

use parking_lot::Mutex;

/// 消息级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Error,
}

/// 面向操作员的输出
pub trait Console: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// 丢弃所有输出
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConsole;

impl Console for NullConsole {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// 记录到内存，用于测试
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<(ConsoleLevel, String)>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines.lock().clone()
    }

    /// 指定级别的消息
    pub fn messages(&self, level: ConsoleLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(ConsoleLevel::Error)
    }
}

impl Console for MemoryConsole {
    fn info(&self, message: &str) {
        self.lines.lock().push((ConsoleLevel::Info, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push((ConsoleLevel::Error, message.to_string()));
    }
}
