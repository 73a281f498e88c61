//! 会话指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 会话实时指标
///
/// # 使用示例
///
/// ```rust
/// use armlink_driver::SessionMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = SessionMetrics::default();
/// metrics.points_sent.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().points_sent, 1);
/// ```
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// 发送成功的点数（含重发和停止时的冲刷）
    pub points_sent: AtomicU64,

    /// 解码成功的遥测点数
    pub points_received: AtomicU64,

    /// 帧同步错误次数
    pub framing_errors: AtomicU64,

    /// 字段无效（数值溢出、段时间为 0 等）的消息数
    pub invalid_messages: AtomicU64,

    /// 接收超时次数（无数据时正常出现）
    pub rx_timeouts: AtomicU64,

    /// 发送失败次数
    pub send_failures: AtomicU64,

    /// 连接尝试次数
    pub connect_attempts: AtomicU64,

    /// 连接失败次数
    pub connect_failures: AtomicU64,

    /// 修复探测次数
    pub healing_probes: AtomicU64,

    /// 强制重启次数
    pub restarts: AtomicU64,

    /// 降级状态下重发上一个点的次数
    pub resends: AtomicU64,

    /// 进入降级状态的次数
    pub degraded_entries: AtomicU64,

    /// 重连后重新入队的未确认点数
    pub replayed: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            points_sent: self.points_sent.load(Ordering::Relaxed),
            points_received: self.points_received.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            invalid_messages: self.invalid_messages.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            healing_probes: self.healing_probes.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            degraded_entries: self.degraded_entries.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMetricsSnapshot {
    pub points_sent: u64,
    pub points_received: u64,
    pub framing_errors: u64,
    pub invalid_messages: u64,
    pub rx_timeouts: u64,
    pub send_failures: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub healing_probes: u64,
    pub restarts: u64,
    pub resends: u64,
    pub degraded_entries: u64,
    pub replayed: u64,
}

impl SessionMetricsSnapshot {
    /// 连接成功率（百分比），没有尝试过时返回 0.0
    pub fn connect_success_rate(&self) -> f64 {
        if self.connect_attempts == 0 {
            return 0.0;
        }
        let ok = self.connect_attempts.saturating_sub(self.connect_failures);
        (ok as f64 / self.connect_attempts as f64) * 100.0
    }
}
