//! 日志初始化
//!
//! - 终端：`fmt` 输出，`RUST_LOG` 未设置时使用 `armlink=info`，不显示消息历史
//! - 消息历史：配置了 `log_dir` 时，`armlink::messages` 目标写入按天滚动的文件

use anyhow::{Context, Result};
use armlink_driver::MESSAGE_TARGET;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// 默认终端过滤器
pub const DEFAULT_FILTER: &str = "armlink=info";

/// 消息历史文件名前缀
const MESSAGE_LOG_PREFIX: &str = "messages.log";

/// 日志守卫，drop 时刷新文件写入
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// 初始化日志
pub fn init_logging(log_dir: Option<&Path>) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        .add_directive(format!("{}=off", MESSAGE_TARGET).parse()?);

    let mut layers = Vec::new();
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    );

    let mut file_guard = None;
    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("创建日志目录失败: {}", dir.display()))?;

        let appender = rolling::daily(dir, MESSAGE_LOG_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(MESSAGE_TARGET, Level::INFO))
                .boxed(),
        );
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("初始化日志失败")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_dir: log_dir.map(Path::to_path_buf),
    })
}
