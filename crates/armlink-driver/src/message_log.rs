//! 消息历史日志
//!
//! 会话把每条收发的消息按顺序写入 [`MessageLog`]，格式由实现决定。

use parking_lot::Mutex;
use std::fmt;
use std::time::SystemTime;

/// tracing 目标名，CLI 将其路由到独立的滚动日志文件
pub const MESSAGE_TARGET: &str = "armlink::messages";

/// 消息方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 发往控制器（命令通道）
    Outbound,
    /// 来自控制器（遥测通道）
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("out"),
            Direction::Inbound => f.write_str("in"),
        }
    }
}

/// 消息日志接收器
pub trait MessageLog: Send + Sync {
    /// 追加一条消息（`line` 不含换行符）
    fn record(&self, direction: Direction, line: &str);
}

/// 丢弃所有消息
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageLog;

impl MessageLog for NullMessageLog {
    fn record(&self, _direction: Direction, _line: &str) {}
}

/// 通过 tracing 输出到 [`MESSAGE_TARGET`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessageLog;

impl MessageLog for TracingMessageLog {
    fn record(&self, direction: Direction, line: &str) {
        tracing::info!(target: MESSAGE_TARGET, %direction, "{}", line);
    }
}

/// 一条带时间戳的消息记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub at: SystemTime,
    pub direction: Direction,
    pub line: String,
}

/// 内存日志（测试和状态查询用）
#[derive(Debug, Default)]
pub struct MemoryMessageLog {
    records: Mutex<Vec<MessageRecord>>,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.lock().clone()
    }

    /// 指定方向的消息内容
    pub fn lines(&self, direction: Direction) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.line.clone())
            .collect()
    }
}

impl MessageLog for MemoryMessageLog {
    fn record(&self, direction: Direction, line: &str) {
        self.records.lock().push(MessageRecord {
            at: SystemTime::now(),
            direction,
            line: line.to_string(),
        });
    }
}
