//! 会话状态定义
//!
//! ```text
//! Disconnected → Connecting → Healthy ⇄ Degraded → Restarting → Connecting
//! ```
//!
//! `Healthy` 和 `Degraded` 都属于已连接状态。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// 未连接（初始状态，或停止后）
    #[default]
    Disconnected = 0,

    /// 正在建立两条连接
    Connecting = 1,

    /// 已连接且遥测正常
    Healthy = 2,

    /// 已连接但遥测沉默超过降级阈值
    ///
    /// 发送线程暂停按队列发送，改为重发上一个点或按距离节流。
    Degraded = 3,

    /// 正在拆除连接，随后回到 `Connecting`
    Restarting = 4,
}

impl SessionState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Disconnected。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Healthy,
            3 => Self::Degraded,
            4 => Self::Restarting,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否已连接（Healthy 或 Degraded）
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    pub fn is_degraded(self) -> bool {
        self == Self::Degraded
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

/// 会话状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicSessionState {
    inner: AtomicU8,
}

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SessionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换
    ///
    /// 只有当前状态为 `current` 时才切换到 `new`，返回是否成功。
    /// 接收线程用它在 Healthy/Degraded 之间切换，不会覆盖监督线程设置的状态。
    pub fn transition(&self, current: SessionState, new: SessionState) -> bool {
        self.inner
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrip() {
        for state in [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Healthy,
            SessionState::Degraded,
            SessionState::Restarting,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
        assert_eq!(SessionState::from_u8(200), SessionState::Disconnected);
    }

    #[test]
    fn test_connected_substates() {
        assert!(SessionState::Healthy.is_connected());
        assert!(SessionState::Degraded.is_connected());
        assert!(!SessionState::Connecting.is_connected());
        assert!(!SessionState::Restarting.is_connected());
    }

    #[test]
    fn test_atomic_transition() {
        let state = AtomicSessionState::new(SessionState::Healthy);
        assert!(state.transition(SessionState::Healthy, SessionState::Degraded));
        assert_eq!(state.get(), SessionState::Degraded);

        // 当前不是 Healthy，切换失败
        assert!(!state.transition(SessionState::Healthy, SessionState::Degraded));

        state.set(SessionState::Restarting);
        assert!(!state.transition(SessionState::Degraded, SessionState::Healthy));
        assert_eq!(state.get(), SessionState::Restarting);
    }
}
