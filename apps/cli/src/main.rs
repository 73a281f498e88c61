//! # Armlink CLI
//!
//! 机械臂操作员控制台。
//!
//! ```bash
//! $ armlink --host 192.168.0.21
//! armlink> q500          # X 正方向点动 500
//! armlink> =             # 切换到位姿输入模式
//! pose> 900000 0 940000
//! pose> =
//! armlink> p|985000 0 940000 -180000 0 0 10 2 0|900000 0 940000 -180000 0 0 10 2 0|5
//! armlink> status
//! armlink> exit
//! ```

use anyhow::{Context, Result};
use armlink_driver::{SessionManager, TcpConnector, TracingMessageLog};
use clap::Parser;
use crossbeam_channel::{bounded, select, tick};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod config;
mod input;
mod logging;
mod operator;
mod terminal;

use config::{AppConfig, Overrides};
use input::{InputEvent, PromptMode, ReplInput};
use logging::init_logging;
use operator::{Flow, Operator};
use terminal::TerminalConsole;

/// 后台任务回收间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Armlink - 机械臂操作员控制台
#[derive(Parser, Debug)]
#[command(name = "armlink")]
#[command(about = "Operator console for armlink robot arm sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/armlink/config.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 控制器地址
    #[arg(long)]
    host: Option<String>,

    /// 命令通道端口
    #[arg(long)]
    command_port: Option<u16>,

    /// 遥测通道端口
    #[arg(long)]
    telemetry_port: Option<u16>,

    /// `x` 命令执行的轨迹文件
    #[arg(short, long)]
    trajectory_file: Option<PathBuf>,

    /// 消息历史日志目录
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            command_port: self.command_port,
            telemetry_port: self.telemetry_port,
            trajectory_file: self.trajectory_file.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())?;
    let logging = init_logging(config.console.log_dir.as_deref())?;

    let connector = TcpConnector::from_config(&config.session);
    let mut session = SessionManager::builder(config.session.clone())
        .message_log(Arc::new(TracingMessageLog))
        .build()
        .context("创建会话失败")?;
    session.start(connector).context("启动会话失败")?;

    println!("Armlink CLI v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "⏳ 连接 {} (命令 {}, 遥测 {})",
        config.session.host, config.session.command_port, config.session.telemetry_port
    );
    if let Some(dir) = logging.log_dir() {
        println!("📝 消息历史写入 {}", dir.display());
    }
    println!("输入 'help' 查看帮助，'exit' 退出");

    let (sigint_tx, sigint_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = sigint_tx.try_send(());
    })
    .context("安装 Ctrl+C 处理器失败")?;

    let prompt = Arc::new(PromptMode::default());
    let mut operator = Operator::new(
        session,
        Arc::new(TerminalConsole),
        prompt.clone(),
        config.console.trajectory_file.clone(),
    );
    let input = ReplInput::new(config.console.history_file.clone(), prompt)?;
    let ticker = tick(POLL_INTERVAL);

    loop {
        let flow = select! {
            recv(input.events()) -> event => match event {
                Ok(InputEvent::Line(line)) => operator.handle_line(&line),
                Ok(InputEvent::Interrupted) => operator.interrupt(),
                Ok(InputEvent::Closed) | Err(_) => Flow::Exit,
            },
            recv(sigint_rx) -> _ => {
                eprintln!("\n🛑 收到 Ctrl+C");
                operator.interrupt()
            },
            recv(ticker) -> _ => {
                operator.poll();
                Flow::Continue
            },
        };
        if flow == Flow::Exit {
            break;
        }
    }

    info!("Shutting down");
    operator.shutdown();
    println!("👋 再见！");
    Ok(())
}
