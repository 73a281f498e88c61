//! 协作式取消令牌
//!
//! 所有后台任务在每个 tick 边界检查令牌，取消延迟受 tick 间隔限制。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 可睡眠等待的最大切片，保证取消后尽快醒来
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// 停止令牌（可克隆，所有克隆共享同一标志）
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn stop(&self) {
        // Release: 之前的写入对看到 true 的线程可见
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 睡眠 `duration`，期间按切片检查停止标志
    ///
    /// 返回 `true` 表示因停止而提前返回。
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_flag() {
        let token = StopToken::new();
        let clone = token.clone();
        assert!(!clone.is_stopped());
        token.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn test_sleep_full_duration() {
        let token = StopToken::new();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_sleep_wakes_on_stop() {
        let token = StopToken::new();
        let stopper = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                token.stop();
            })
        };
        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        stopper.join().unwrap();
    }
}
