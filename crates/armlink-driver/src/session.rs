//! 会话管理器
//!
//! [`SessionManager`] 独占两条链路和所有后台线程：
//!
//! ```text
//!              ┌──────────── supervisor ────────────┐
//!              │ Connecting → Healthy/Degraded →    │
//!              │ Restarting → Connecting ...        │
//!              └──────┬──────────────────┬──────────┘
//!                     │ spawn/join       │ spawn/join
//!               TX 线程 (命令通道)   RX 线程 (遥测通道)
//! ```
//!
//! 连接失败时等待 `reconnect_delay` 后重试；连续失败 `healing_threshold` 次后
//! 向遥测端口发送一次修复探测并清零计数。强制重启总是先 join 两个线程，
//! 再关闭两条链路，然后重新建立完整连接。

use crate::config::SessionConfig;
use crate::error::{DriverError, LinkError};
use crate::link::Connector;
use crate::message_log::{MessageLog, NullMessageLog};
use crate::metrics::{SessionMetrics, SessionMetricsSnapshot};
use crate::pipeline::{LinkControl, SessionContext, rx_loop, tx_loop};
use crate::queue::MessageQueue;
use crate::state::SessionState;
use crate::stop::StopToken;
use crate::Payload;
use armlink_protocol::{CoordinateSystem, Point};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// 停止时等待监督线程退出的最长时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// 支持超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let _ = done_tx.send(self.join().map(|_| ()));
        });
        match done_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
        }
    }
}

/// 会话构建器
pub struct SessionBuilder<T = Point> {
    config: SessionConfig,
    log: Arc<dyn MessageLog>,
    outbound: Option<Arc<MessageQueue<T>>>,
    inbound: Option<Arc<MessageQueue<T>>>,
}

impl<T: Payload> SessionBuilder<T> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            log: Arc::new(NullMessageLog),
            outbound: None,
            inbound: None,
        }
    }

    /// 设置消息历史日志
    pub fn message_log(mut self, log: Arc<dyn MessageLog>) -> Self {
        self.log = log;
        self
    }

    /// 使用已有的发送队列
    pub fn outbound(mut self, queue: Arc<MessageQueue<T>>) -> Self {
        self.outbound = Some(queue);
        self
    }

    /// 使用已有的接收队列
    pub fn inbound(mut self, queue: Arc<MessageQueue<T>>) -> Self {
        self.inbound = Some(queue);
        self
    }

    /// 校验配置并创建会话（不连接）
    pub fn build(self) -> Result<SessionManager<T>, DriverError> {
        self.config.validate()?;
        let ctx = SessionContext::new(
            self.config,
            self.outbound.unwrap_or_default(),
            self.inbound.unwrap_or_default(),
            Arc::new(SessionMetrics::new()),
            self.log,
        );
        Ok(SessionManager {
            ctx: Arc::new(ctx),
            stop: StopToken::new(),
            supervisor: None,
        })
    }
}

/// 会话管理器
pub struct SessionManager<T: Payload = Point> {
    ctx: Arc<SessionContext<T>>,
    stop: StopToken,
    supervisor: Option<JoinHandle<()>>,
}

impl<T: Payload> SessionManager<T> {
    pub fn builder(config: SessionConfig) -> SessionBuilder<T> {
        SessionBuilder::new(config)
    }

    /// 启动监督线程，开始连接
    pub fn start<C: Connector>(&mut self, connector: C) -> Result<(), DriverError> {
        if self.supervisor.is_some() {
            return Err(DriverError::AlreadyRunning);
        }
        self.stop = StopToken::new();
        let ctx = self.ctx.clone();
        let global = self.stop.clone();
        let handle = thread::Builder::new()
            .name("armlink-supervisor".into())
            .spawn(move || supervisor_loop(connector, ctx, global))
            .map_err(DriverError::ThreadSpawn)?;
        self.supervisor = Some(handle);
        Ok(())
    }

    /// 停止会话
    ///
    /// 发送线程在退出前尽力发送剩余的排队点。
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let handle = self.supervisor.take().ok_or(DriverError::NotRunning)?;
        self.stop.stop();
        if handle.join_timeout(SHUTDOWN_TIMEOUT).is_err() {
            error!(
                "Supervisor thread panicked or failed to shut down within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_some()
    }

    /// 发送队列
    pub fn outbound(&self) -> Arc<MessageQueue<T>> {
        self.ctx.outbound.clone()
    }

    /// 接收队列
    pub fn inbound(&self) -> Arc<MessageQueue<T>> {
        self.ctx.inbound.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state.get()
    }

    pub fn metrics(&self) -> SessionMetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 最近一次成功发送的点
    pub fn last_sent(&self) -> Option<T> {
        self.ctx.last_sent.load_full().map(|p| (*p).clone())
    }

    /// 已发送但尚未在遥测中出现的点数
    pub fn unacknowledged(&self) -> usize {
        self.ctx.unacknowledged_len()
    }

    /// 最近一次收到的遥测点
    pub fn last_received(&self) -> Option<T> {
        self.ctx.last_received.load_full().map(|p| (*p).clone())
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.ctx.coordinate_system()
    }

    /// 切换坐标系
    ///
    /// 选择字节在已连接时立即发送，否则在下次连接建立后发送。
    pub fn set_coordinate_system(&self, system: CoordinateSystem) {
        self.ctx.select_coordinate_system(system);
        info!("Coordinate system set to {}", system);
    }

    /// 请求强制重启（完整拆除并重连两条链路）
    pub fn request_restart(&self) {
        self.ctx.restart_requested.store(true, Ordering::Release);
    }
}

impl<T: Payload> Drop for SessionManager<T> {
    fn drop(&mut self) {
        if self.supervisor.is_some() {
            let _ = self.stop();
        }
    }
}

/// 依次打开命令通道和遥测通道
///
/// 遥测通道失败时，已打开的命令通道随返回值一起被 drop 关闭。
fn open_links<C: Connector>(connector: &C) -> Result<(C::Tx, C::Rx), LinkError> {
    let tx = connector.open_command()?;
    let rx = connector.open_telemetry()?;
    Ok((tx, rx))
}

fn heal<C: Connector>(connector: &C, metrics: &SessionMetrics) {
    metrics.healing_probes.fetch_add(1, Ordering::Relaxed);
    match connector.probe_telemetry() {
        Ok(()) => info!("Healing probe sent to telemetry port"),
        Err(e) => warn!("Healing probe failed: {}", e),
    }
}

fn supervisor_loop<T: Payload, C: Connector>(
    connector: C,
    ctx: Arc<SessionContext<T>>,
    global: StopToken,
) {
    let config = &ctx.config;
    let mut failures: u32 = 0;

    while !global.is_stopped() {
        ctx.state.set(SessionState::Connecting);
        ctx.metrics.connect_attempts.fetch_add(1, Ordering::Relaxed);

        match open_links(&connector) {
            Ok((tx, rx)) => {
                failures = 0;
                info!(
                    "Connected to {} (command port {}, telemetry port {})",
                    config.host, config.command_port, config.telemetry_port
                );
                run_connection::<T, C>(tx, rx, &ctx, &global);
                if global.is_stopped() {
                    break;
                }
                ctx.state.set(SessionState::Restarting);
                ctx.metrics.restarts.fetch_add(1, Ordering::Relaxed);
                warn!("Session restarting");
            },
            Err(e) => {
                failures += 1;
                ctx.metrics.connect_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Connection attempt failed ({} in a row): {}", failures, e);
                if global.sleep(config.reconnect_delay()) {
                    break;
                }
                if failures >= config.healing_threshold {
                    heal(&connector, &ctx.metrics);
                    failures = 0;
                }
            },
        }
    }

    ctx.state.set(SessionState::Disconnected);
    info!("Session stopped");
}

/// 运行一条连接直到全局停止或强制重启，然后拆除
fn run_connection<T: Payload, C: Connector>(
    tx: C::Tx,
    rx: C::Rx,
    ctx: &Arc<SessionContext<T>>,
    global: &StopToken,
) {
    let link = Arc::new(LinkControl::new());
    ctx.restart_requested.store(false, Ordering::Release);
    ctx.selector_pending.store(true, Ordering::Release);

    // 上一条连接上发出但未见遥测的点可能没有到达控制器
    let replayed = ctx.replay_unacknowledged();
    if replayed > 0 {
        ctx.metrics
            .replayed
            .fetch_add(replayed as u64, Ordering::Relaxed);
        info!("Replaying {} unacknowledged points", replayed);
    }
    ctx.state.set(SessionState::Healthy);

    let tx_thread = {
        let (ctx, link, global) = (ctx.clone(), link.clone(), global.clone());
        thread::Builder::new()
            .name("armlink-tx".into())
            .spawn(move || tx_loop(tx, ctx, link, global))
    };
    let tx_thread = match tx_thread {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to spawn TX thread: {}", e);
            return;
        },
    };

    let rx_thread = {
        let (ctx, link, global) = (ctx.clone(), link.clone(), global.clone());
        thread::Builder::new()
            .name("armlink-rx".into())
            .spawn(move || rx_loop(rx, ctx, link, global))
    };
    let rx_thread = match rx_thread {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to spawn RX thread: {}", e);
            None
        },
    };

    if rx_thread.is_some() {
        let tick = ctx.config.tick_interval();
        while !global.is_stopped()
            && !link.restart_requested()
            && !ctx.restart_requested.swap(false, Ordering::AcqRel)
        {
            global.sleep(tick);
        }
    }

    // 先 join 两个线程，再关闭链路
    link.stop.stop();
    let tx = tx_thread.join();
    if tx.is_err() {
        error!("TX thread panicked");
    }
    let rx = rx_thread.map(|handle| handle.join());
    if matches!(rx, Some(Err(_))) {
        error!("RX thread panicked");
    }
    drop(tx);
    drop(rx);
}
