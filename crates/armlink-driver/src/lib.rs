//! # Armlink Driver
//!
//! 双通道会话管理：
//! - 命令通道 / 遥测通道的连接与重连（含修复探测）
//! - TX/RX 后台线程与协作式停止
//! - 基于遥测沉默时间的存活检测（Healthy → Degraded → 强制重启）
//! - 线程安全的发送/接收队列
//!
//! # 使用场景
//!
//! ```rust,no_run
//! use armlink_driver::{SessionConfig, SessionManager, TcpConnector};
//! use armlink_protocol::Point;
//!
//! let config = SessionConfig::default();
//! let connector = TcpConnector::from_config(&config);
//! let mut session: SessionManager<Point> = SessionManager::builder(config).build()?;
//! session.start(connector)?;
//!
//! session.outbound().push(Point::home());
//! # Ok::<(), armlink_driver::DriverError>(())
//! ```

mod config;
mod error;
pub mod link;
pub mod liveness;
pub mod message_log;
pub mod metrics;
mod pipeline;
pub mod queue;
mod session;
pub mod state;
pub mod stop;

pub use config::SessionConfig;
pub use error::{DriverError, LinkError};
pub use link::{Connector, RxLink, TcpConnector, TcpRx, TcpTx, TxLink};
pub use liveness::LivenessMonitor;
pub use message_log::{
    Direction, MESSAGE_TARGET, MemoryMessageLog, MessageLog, MessageRecord, NullMessageLog,
    TracingMessageLog,
};
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use queue::{MessageQueue, PointQueue};
pub use session::{SessionBuilder, SessionManager};
pub use state::{AtomicSessionState, SessionState};
pub use stop::StopToken;

use armlink_protocol::Pose;

/// 会话可传输的载荷
///
/// 任何可编解码、可计算距离的位姿记录都可以作为会话载荷，
/// 默认使用 [`armlink_protocol::Point`]。`PartialEq` 用于把遥测与已发送的点配对。
pub trait Payload: Pose + Clone + PartialEq + Send + Sync + 'static {}

impl<T: Pose + Clone + PartialEq + Send + Sync + 'static> Payload for T {}
