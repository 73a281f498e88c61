//! 会话测试公共工具：可编排失败的假链路工厂

#![allow(dead_code)]

use armlink_driver::{Connector, LinkError, RxLink, SessionConfig, TxLink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// 连接工厂上发生的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    OpenCommand { ok: bool },
    OpenTelemetry,
    Probe,
}

/// 测试侧控制句柄
#[derive(Clone)]
pub struct Controller {
    pub events: Arc<Mutex<Vec<Event>>>,
    /// 会话写入命令通道的所有字节块
    pub written: Receiver<Vec<u8>>,
    /// 向遥测通道注入字节
    pub telemetry: Sender<Vec<u8>>,
    /// 置位后下一次遥测读取返回 ConnectionLost
    pub break_link: Arc<AtomicBool>,
}

impl Controller {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn successful_connects(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::OpenCommand { ok: true }))
            .count()
    }

    /// 等待命令通道上的下一块数据
    pub fn next_written(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.written.recv_timeout(timeout).ok()
    }

    /// 丢弃已写入的数据，直到遇到 `expected`
    pub fn wait_for_written(&self, expected: &[u8], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match self.written.recv_timeout(remaining) {
                Ok(chunk) if chunk == expected => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    }
}

pub struct FakeConnector {
    events: Arc<Mutex<Vec<Event>>>,
    fail_first: usize,
    attempts: AtomicUsize,
    written: Sender<Vec<u8>>,
    telemetry: Receiver<Vec<u8>>,
    break_link: Arc<AtomicBool>,
}

impl FakeConnector {
    /// 前 `fail_first` 次打开命令通道失败
    pub fn new(fail_first: usize) -> (Self, Controller) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (written_tx, written_rx) = unbounded();
        let (telemetry_tx, telemetry_rx) = unbounded();
        let break_link = Arc::new(AtomicBool::new(false));
        let connector = Self {
            events: events.clone(),
            fail_first,
            attempts: AtomicUsize::new(0),
            written: written_tx,
            telemetry: telemetry_rx,
            break_link: break_link.clone(),
        };
        let controller = Controller {
            events,
            written: written_rx,
            telemetry: telemetry_tx,
            break_link,
        };
        (connector, controller)
    }
}

impl Connector for FakeConnector {
    type Tx = FakeTx;
    type Rx = FakeRx;

    fn open_command(&self) -> Result<FakeTx, LinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let ok = attempt >= self.fail_first;
        self.events.lock().push(Event::OpenCommand { ok });
        if !ok {
            return Err(LinkError::Connect {
                port: 9998,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        Ok(FakeTx {
            written: self.written.clone(),
        })
    }

    fn open_telemetry(&self) -> Result<FakeRx, LinkError> {
        self.events.lock().push(Event::OpenTelemetry);
        Ok(FakeRx {
            incoming: self.telemetry.clone(),
            break_link: self.break_link.clone(),
        })
    }

    fn probe_telemetry(&self) -> Result<(), LinkError> {
        self.events.lock().push(Event::Probe);
        Ok(())
    }
}

pub struct FakeTx {
    written: Sender<Vec<u8>>,
}

impl TxLink for FakeTx {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let _ = self.written.send(bytes.to_vec());
        Ok(())
    }
}

pub struct FakeRx {
    incoming: Receiver<Vec<u8>>,
    break_link: Arc<AtomicBool>,
}

impl RxLink for FakeRx {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.break_link.swap(false, Ordering::SeqCst) {
            return Err(LinkError::ConnectionLost(io::Error::from(
                io::ErrorKind::ConnectionReset,
            )));
        }
        match self.incoming.recv_timeout(Duration::from_millis(5)) {
            Ok(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            },
            Err(RecvTimeoutError::Timeout) => Err(LinkError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::ConnectionLost(
                io::Error::from(io::ErrorKind::ConnectionReset),
            )),
        }
    }
}

/// 缩短所有时间常数的测试配置
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        tick_interval_ms: 2,
        reconnect_delay_ms: 10,
        disconnect_timeout_ms: 150,
        restart_timeout_ms: 2000,
        read_timeout_ms: 5,
        ..Default::default()
    }
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// 测试日志输出（重复调用无副作用）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("armlink=debug")
        .try_init();
}
