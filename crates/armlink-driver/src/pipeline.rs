//! 发送/接收循环
//!
//! 每条连接启动两个线程：
//! - TX 线程：按 tick 从发送队列取点写入命令通道；降级时改为重发或节流
//! - RX 线程：读取遥测通道，解码后推入接收队列，并运行存活检测
//!
//! 两个线程都在每个 tick 边界检查全局停止令牌和连接级停止令牌。
//! 线程退出时把链路交还给监督线程，由它在 join 之后统一关闭。

use crate::error::LinkError;
use crate::link::{RxLink, TxLink};
use crate::liveness::LivenessMonitor;
use crate::message_log::{Direction, MessageLog};
use crate::metrics::SessionMetrics;
use crate::queue::MessageQueue;
use crate::state::{AtomicSessionState, SessionState};
use crate::stop::StopToken;
use crate::{Payload, SessionConfig};
use arc_swap::ArcSwapOption;
use armlink_protocol::{CoordinateSystem, PointEncoder, RecordDecoder};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 遥测读取缓冲区大小
const RX_BUFFER_SIZE: usize = 4096;

/// 最多保留的未确认点数，超出时丢弃最旧的
pub(crate) const UNACKED_CAPACITY: usize = 4096;

/// 会话级共享状态（跨连接保留）
pub(crate) struct SessionContext<T> {
    pub config: SessionConfig,
    pub outbound: Arc<MessageQueue<T>>,
    pub inbound: Arc<MessageQueue<T>>,
    pub state: AtomicSessionState,
    pub metrics: Arc<SessionMetrics>,
    pub log: Arc<dyn MessageLog>,
    /// 当前坐标系的选择字节
    coordinate_system: AtomicU8,
    /// 坐标系选择字节待发送
    pub selector_pending: AtomicBool,
    pub last_sent: ArcSwapOption<T>,
    pub last_received: ArcSwapOption<T>,
    /// 外部请求的重启
    pub restart_requested: AtomicBool,
    /// 已发送但尚未在遥测中出现的点，按发送顺序
    unacknowledged: Mutex<VecDeque<T>>,
}

impl<T> SessionContext<T> {
    pub fn new(
        config: SessionConfig,
        outbound: Arc<MessageQueue<T>>,
        inbound: Arc<MessageQueue<T>>,
        metrics: Arc<SessionMetrics>,
        log: Arc<dyn MessageLog>,
    ) -> Self {
        let system = config.default_coordinate_system;
        Self {
            config,
            outbound,
            inbound,
            state: AtomicSessionState::new(SessionState::Disconnected),
            metrics,
            log,
            coordinate_system: AtomicU8::new(system.selector_byte()),
            selector_pending: AtomicBool::new(false),
            last_sent: ArcSwapOption::empty(),
            last_received: ArcSwapOption::empty(),
            restart_requested: AtomicBool::new(false),
            unacknowledged: Mutex::new(VecDeque::new()),
        }
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::from_selector_byte(self.coordinate_system.load(Ordering::Acquire))
            .unwrap_or(self.config.default_coordinate_system)
    }

    /// 切换坐标系，并在命令通道上（重新）发送选择字节
    pub fn select_coordinate_system(&self, system: CoordinateSystem) {
        self.coordinate_system
            .store(system.selector_byte(), Ordering::Release);
        self.selector_pending.store(true, Ordering::Release);
    }

    pub fn unacknowledged_len(&self) -> usize {
        self.unacknowledged.lock().len()
    }
}

impl<T: Clone + PartialEq> SessionContext<T> {
    /// 记录一个已发送、等待遥测确认的点
    fn track_sent(&self, record: &T) {
        let mut pending = self.unacknowledged.lock();
        if pending.len() == UNACKED_CAPACITY {
            pending.pop_front();
        }
        pending.push_back(record.clone());
    }

    /// 遥测到达某个已发送的点：它和之前发送的点都视为已确认
    fn acknowledge(&self, record: &T) {
        let mut pending = self.unacknowledged.lock();
        if let Some(index) = pending.iter().position(|sent| sent == record) {
            pending.drain(..=index);
        }
    }

    /// 把未确认的点按原顺序放回发送队列队首，返回放回的数量
    pub fn replay_unacknowledged(&self) -> usize {
        let pending: Vec<T> = self.unacknowledged.lock().drain(..).collect();
        let count = pending.len();
        self.outbound.prepend(pending);
        count
    }
}

/// 连接级控制状态（每次连接重新创建）
#[derive(Default)]
pub(crate) struct LinkControl {
    pub stop: StopToken,
    pub liveness: LivenessMonitor,
    pub forced_restart: AtomicBool,
    /// 降级时请求 TX 线程重发上一个点
    pub resend_request: AtomicBool,
    /// 降级时 TX 线程在此时刻之后才发送下一个排队的点
    pub pace_until: Mutex<Option<Instant>>,
}

impl LinkControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_restart(&self) {
        self.forced_restart.store(true, Ordering::Release);
    }

    pub fn restart_requested(&self) -> bool {
        self.forced_restart.load(Ordering::Acquire)
    }

    fn clear_degraded_actions(&self) {
        self.resend_request.store(false, Ordering::Release);
        *self.pace_until.lock() = None;
    }
}

fn wire_line(bytes: &Bytes) -> &str {
    std::str::from_utf8(bytes).unwrap_or_default().trim_end()
}

fn send_record<T: Payload, W: TxLink>(
    tx: &mut W,
    ctx: &SessionContext<T>,
    record: &T,
) -> Result<(), LinkError> {
    let bytes = PointEncoder::encode_to_bytes(record);
    tx.send(&bytes)?;
    ctx.metrics.points_sent.fetch_add(1, Ordering::Relaxed);
    ctx.last_sent.store(Some(Arc::new(record.clone())));
    ctx.log.record(Direction::Outbound, wire_line(&bytes));
    Ok(())
}

/// 发送一个排队的点并记录为待确认
fn send_queued<T: Payload, W: TxLink>(
    tx: &mut W,
    ctx: &SessionContext<T>,
    record: &T,
) -> Result<(), LinkError> {
    send_record(tx, ctx, record)?;
    ctx.track_sent(record);
    Ok(())
}

/// 处理发送失败，返回 TX 线程是否应退出
fn on_send_error<T>(err: &LinkError, ctx: &SessionContext<T>, link: &LinkControl) -> bool {
    ctx.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
    match err {
        LinkError::Timeout => {
            warn!("TX thread: send timed out, will retry");
            false
        },
        _ => {
            error!("TX thread: {}, requesting restart", err);
            link.request_restart();
            true
        },
    }
}

/// 停止时尽力发送剩余的排队点
fn flush_outbound<T: Payload, W: TxLink>(tx: &mut W, ctx: &SessionContext<T>) {
    if !ctx.state.get().is_connected() {
        return;
    }
    let mut flushed = 0usize;
    while let Some(record) = ctx.outbound.try_pop() {
        if let Err(e) = send_queued(tx, ctx, &record) {
            warn!("TX thread: flush aborted after {} points: {}", flushed, e);
            ctx.outbound.push_front(record);
            return;
        }
        flushed += 1;
    }
    if flushed > 0 {
        debug!("TX thread: flushed {} queued points on stop", flushed);
    }
}

/// 降级状态下的一次发送决策
fn send_degraded<T: Payload, W: TxLink>(
    tx: &mut W,
    ctx: &SessionContext<T>,
    link: &LinkControl,
) -> Result<(), LinkError> {
    if link.resend_request.swap(false, Ordering::AcqRel) {
        if let Some(last) = ctx.last_sent.load_full() {
            send_record(tx, ctx, &last)?;
            ctx.metrics.resends.fetch_add(1, Ordering::Relaxed);
            debug!("TX thread: resent last point while degraded");
        }
        return Ok(());
    }

    let due = {
        let mut pace = link.pace_until.lock();
        match *pace {
            Some(until) if Instant::now() >= until => {
                *pace = None;
                true
            },
            _ => false,
        }
    };
    if due && let Some(record) = ctx.outbound.try_pop() {
        if let Err(e) = send_queued(tx, ctx, &record) {
            ctx.outbound.push_front(record);
            return Err(e);
        }
        trace!("TX thread: paced point sent while degraded");
    }
    Ok(())
}

/// TX 线程主循环
///
/// 返回链路，由调用方在两个线程都退出后关闭。
pub(crate) fn tx_loop<T: Payload, W: TxLink>(
    mut tx: W,
    ctx: Arc<SessionContext<T>>,
    link: Arc<LinkControl>,
    global: StopToken,
) -> W {
    let tick = ctx.config.tick_interval();

    loop {
        if global.is_stopped() {
            flush_outbound(&mut tx, &ctx);
            trace!("TX thread: global stop, exiting");
            break;
        }
        if link.stop.is_stopped() {
            trace!("TX thread: connection stop, exiting");
            break;
        }

        if ctx.selector_pending.swap(false, Ordering::AcqRel) {
            let system = ctx.coordinate_system();
            match tx.send(&[system.selector_byte()]) {
                Ok(()) => {
                    debug!("TX thread: selected {} coordinate system", system);
                    ctx.log
                        .record(Direction::Outbound, system.selector().encode_utf8(&mut [0; 4]));
                },
                Err(e) => {
                    ctx.selector_pending.store(true, Ordering::Release);
                    if on_send_error(&e, &ctx, &link) {
                        break;
                    }
                    continue;
                },
            }
        }

        if ctx.state.get().is_degraded() {
            if let Err(e) = send_degraded(&mut tx, &ctx, &link)
                && on_send_error(&e, &ctx, &link)
            {
                break;
            }
            spin_sleep::sleep(tick);
            continue;
        }

        let Some(record) = ctx.outbound.pop_timeout(tick) else {
            continue;
        };
        match send_queued(&mut tx, &ctx, &record) {
            Ok(()) => spin_sleep::sleep(tick),
            Err(e) => {
                ctx.outbound.push_front(record);
                if on_send_error(&e, &ctx, &link) {
                    break;
                }
            },
        }
    }

    tx
}

/// 解码缓冲区中的所有消息，返回是否收到至少一个点
fn drain_decoder<T: Payload>(
    decoder: &mut RecordDecoder<T>,
    ctx: &SessionContext<T>,
    link: &LinkControl,
) -> bool {
    let mut received = false;
    loop {
        match decoder.decode() {
            Ok(Some(record)) => {
                received = true;
                link.liveness.register_message();
                ctx.metrics.points_received.fetch_add(1, Ordering::Relaxed);
                let bytes = PointEncoder::encode_to_bytes(&record);
                ctx.log.record(Direction::Inbound, wire_line(&bytes));
                ctx.last_received.store(Some(Arc::new(record.clone())));
                ctx.acknowledge(&record);
                ctx.inbound.push(record);
            },
            Ok(None) => break,
            Err(e) if e.is_framing() => {
                ctx.metrics.framing_errors.fetch_add(1, Ordering::Relaxed);
                warn!("RX thread: {}, resynchronizing", e);
            },
            Err(e) => {
                ctx.metrics.invalid_messages.fetch_add(1, Ordering::Relaxed);
                warn!("RX thread: dropped invalid message: {}", e);
            },
        }
    }

    if received && ctx.state.transition(SessionState::Degraded, SessionState::Healthy) {
        info!("Telemetry resumed, link healthy");
        link.clear_degraded_actions();
    }
    received
}

/// 第 `action` 次降级动作
///
/// 发送队列为空时请求重发上一个点；否则按到下一个点的距离计算节流时间。
fn degrade<T: Payload>(
    ctx: &SessionContext<T>,
    link: &LinkControl,
    silence: Duration,
    bonus: &mut Duration,
) {
    if ctx
        .state
        .transition(SessionState::Healthy, SessionState::Degraded)
    {
        ctx.metrics.degraded_entries.fetch_add(1, Ordering::Relaxed);
        warn!("Telemetry silent for {:?}, link degraded", silence);
    }

    match ctx.outbound.peek() {
        None => link.resend_request.store(true, Ordering::Release),
        Some(next) => {
            let distance = ctx
                .last_received
                .load_full()
                .map(|last| last.distance_to(&next))
                .unwrap_or(0.0);
            *bonus = ctx.config.travel_time(distance);
            let now = Instant::now();
            *link.pace_until.lock() = Some(now.checked_add(*bonus).unwrap_or(now));
            debug!("RX thread: pacing next point by {:?}", *bonus);
        },
    }
}

/// RX 线程主循环
///
/// 存活检测只在本连接收到第一条消息后启用。沉默时间超过
/// `k × 降级阈值 + 节流补偿` 时执行第 k 次降级动作，
/// 超过 `重启超时 + 节流补偿` 时请求强制重启。
pub(crate) fn rx_loop<T: Payload, R: RxLink>(
    mut rx: R,
    ctx: Arc<SessionContext<T>>,
    link: Arc<LinkControl>,
    global: StopToken,
) -> R {
    let mut decoder = RecordDecoder::<T>::new();
    let mut buf = vec![0u8; RX_BUFFER_SIZE];
    let threshold = ctx.config.degraded_threshold();
    let restart_timeout = ctx.config.restart_timeout();
    let mut actions: u32 = 0;
    let mut bonus = Duration::ZERO;

    loop {
        // Acquire: 看到 stop 时也能看到之前的所有写入
        if global.is_stopped() || link.stop.is_stopped() {
            trace!("RX thread: stop requested, exiting");
            break;
        }

        match rx.receive(&mut buf) {
            Ok(n) => {
                decoder.extend(&buf[..n]);
                if drain_decoder(&mut decoder, &ctx, &link) {
                    actions = 0;
                    bonus = Duration::ZERO;
                }
            },
            Err(LinkError::Timeout) => {
                ctx.metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                error!("RX thread: {}, requesting restart", e);
                link.request_restart();
                break;
            },
        }

        let Some(silence) = link.liveness.silence() else {
            continue;
        };
        let restart_limit = restart_timeout.saturating_add(bonus);
        if silence > restart_limit {
            warn!(
                "Telemetry silent for {:?} (limit {:?}), forcing restart",
                silence, restart_limit
            );
            link.request_restart();
            break;
        }
        let degrade_limit = threshold
            .saturating_mul(actions.saturating_add(1))
            .saturating_add(bonus);
        if silence > degrade_limit {
            actions += 1;
            degrade(&ctx, &link, silence, &mut bonus);
        }
    }

    rx
}
