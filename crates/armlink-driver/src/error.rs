//! 驱动层错误类型定义

use armlink_protocol::ProtocolError;
use std::io;
use thiserror::Error;

/// 链路层错误
///
/// 对应 TCP 读写的三种结果：
/// - `Timeout`: 超时、would-block 或读到 0 字节（IncompleteData，不是错误）
/// - `ConnectionLost`: 连接被重置/拒绝等硬错误，触发强制重启
/// - `Connect`: 建立连接失败，由重连状态机处理
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Read timeout")]
    Timeout,

    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] io::Error),

    #[error("Failed to connect to port {port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// 将 IO 错误按类别映射为链路错误
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                LinkError::Timeout
            },
            _ => LinkError::ConnectionLost(err),
        }
    }

    /// 是否为"无数据"（非错误）
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout)
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 会话已在运行
    #[error("Session is already running")]
    AlreadyRunning,

    /// 会话未运行
    #[error("Session is not running")]
    NotRunning,

    /// 后台线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
