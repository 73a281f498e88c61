//! Liveness Monitor - tracks inbound telemetry to detect a silent controller
//!
//! Uses monotonic time anchored to application start, stored in an `AtomicU64`
//! so the receiver can update it and any thread can read it lock-free.
//!
//! A fresh connection is *unarmed*: silence is not suspicious until the
//! controller has answered at least once.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static APP_START: OnceLock<Instant> = OnceLock::new();

/// Monotonic microseconds since app start, never 0
fn monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64 + 1
}

/// Sentinel for "no message received yet"
const UNARMED: u64 = 0;

/// Per-connection liveness tracker
#[derive(Debug)]
pub struct LivenessMonitor {
    last_message: AtomicU64,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self {
            last_message: AtomicU64::new(UNARMED),
        }
    }

    /// Record that a message was received
    pub fn register_message(&self) {
        self.last_message.store(monotonic_micros(), Ordering::Relaxed);
    }

    /// Whether at least one message arrived on this connection
    pub fn is_armed(&self) -> bool {
        self.last_message.load(Ordering::Relaxed) != UNARMED
    }

    /// Time since the last message, `None` while unarmed
    pub fn silence(&self) -> Option<Duration> {
        let last = self.last_message.load(Ordering::Relaxed);
        if last == UNARMED {
            return None;
        }
        Some(Duration::from_micros(monotonic_micros().saturating_sub(last)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_time_always_increases() {
        let t1 = monotonic_micros();
        thread::sleep(Duration::from_millis(5));
        let t2 = monotonic_micros();
        assert!(t2 > t1);
    }

    #[test]
    fn test_unarmed_until_first_message() {
        let monitor = LivenessMonitor::new();
        assert!(!monitor.is_armed());
        assert_eq!(monitor.silence(), None);

        monitor.register_message();
        assert!(monitor.is_armed());
        assert!(monitor.silence().unwrap() < Duration::from_secs(1));
    }

    #[test]
    fn test_silence_grows_and_resets() {
        let monitor = LivenessMonitor::new();
        monitor.register_message();
        thread::sleep(Duration::from_millis(50));
        assert!(monitor.silence().unwrap() >= Duration::from_millis(50));

        monitor.register_message();
        assert!(monitor.silence().unwrap() < Duration::from_millis(50));
    }
}
