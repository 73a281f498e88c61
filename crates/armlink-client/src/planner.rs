//! 轨迹规划器
//!
//! 把轨迹类指令展开为点序列并放入发送队列：
//!
//! - **SteppedMove**：`A`，然后每步加上 `(B - A) / steps`，最后若有舍入漂移再补发 `B`
//! - **PositionalList**：按顺序入队，不插值也不等待
//! - **CircularRepeat**：`SendA → AwaitA → SendB → AwaitB` 循环，
//!   每次等待接收队列中出现坐标相等的回显点
//!
//! 每个入队的点都要经过包络检查。越界的点被丢弃并报告一次错误，
//! 轨迹继续执行后续的点。

use crate::console::Console;
use crate::error::PlanError;
use armlink_driver::{PointQueue, StopToken};
use armlink_protocol::{BoundEnvelope, Point};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 等待回显时轮询接收队列的间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 线性插值路径
///
/// 依次产生 `A`、`steps` 个中间点（最后一个应当落在 `B` 上），
/// 若累加结果与 `B` 不相等则再产生 `B`。
#[derive(Debug, Clone)]
pub struct SteppedPath {
    current: Point,
    direction: Point,
    target: Point,
    remaining: u32,
    started: bool,
    finished: bool,
}

impl SteppedPath {
    pub fn new(a: Point, b: Point, steps: NonZeroU32) -> Self {
        Self {
            current: a,
            direction: (b - a) / steps,
            target: b,
            remaining: steps.get(),
            started: false,
            finished: false,
        }
    }

    /// 每步增量（非零分量永不为零）
    pub fn direction(&self) -> Point {
        self.direction
    }
}

impl Iterator for SteppedPath {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if !self.started {
            self.started = true;
            return Some(self.current);
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current += self.direction;
            return Some(self.current);
        }
        if !self.finished {
            self.finished = true;
            if self.current != self.target {
                return Some(self.target);
            }
        }
        None
    }
}

/// 一次轨迹执行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    pub enqueued: usize,
    pub rejected: usize,
}

impl PlanReport {
    fn record(&mut self, result: &Result<(), PlanError>) {
        match result {
            Ok(()) => self.enqueued += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// 后台轨迹任务句柄
pub struct PlanHandle {
    stop: StopToken,
    handle: JoinHandle<Result<PlanReport, PlanError>>,
}

impl PlanHandle {
    /// 请求取消，任务在下一次轮询时退出
    pub fn cancel(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<PlanReport, PlanError> {
        self.handle.join().unwrap_or_else(|_| {
            warn!("Trajectory task panicked");
            Err(PlanError::Cancelled)
        })
    }
}

/// 轨迹规划器
#[derive(Clone)]
pub struct TrajectoryPlanner {
    outbound: Arc<PointQueue>,
    inbound: Arc<PointQueue>,
    bounds: BoundEnvelope,
    console: Arc<dyn Console>,
    poll_interval: Duration,
}

impl TrajectoryPlanner {
    pub fn new(
        outbound: Arc<PointQueue>,
        inbound: Arc<PointQueue>,
        bounds: BoundEnvelope,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            bounds,
            console,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn bounds(&self) -> &BoundEnvelope {
        &self.bounds
    }

    /// 检查包络并入队
    ///
    /// 越界时不入队，向控制台报告一次错误。
    pub fn enqueue(&self, point: Point) -> Result<(), PlanError> {
        if let Some(axis) = self.bounds.violation(&point) {
            let err = PlanError::OutOfRange { point, axis };
            warn!("Dropping point: {}", err);
            self.console.error(&err.to_string());
            return Err(err);
        }
        self.outbound.push(point);
        Ok(())
    }

    /// 线性插值移动，不等待回显
    ///
    /// 每入队一个点前检查 `stop`，已入队的点保留在发送队列中。
    pub fn stepped_move(
        &self,
        a: Point,
        b: Point,
        steps: NonZeroU32,
        stop: &StopToken,
    ) -> Result<PlanReport, PlanError> {
        let mut report = PlanReport::default();
        for point in SteppedPath::new(a, b, steps) {
            if stop.is_stopped() {
                debug!("Stepped move cancelled after {} points", report.enqueued);
                return Err(PlanError::Cancelled);
            }
            report.record(&self.enqueue(point));
        }
        debug!(
            "Stepped move enqueued {} points ({} rejected)",
            report.enqueued, report.rejected
        );
        Ok(report)
    }

    /// 按顺序入队所有点
    pub fn positional_list(&self, points: &[Point]) -> PlanReport {
        let mut report = PlanReport::default();
        for point in points {
            report.record(&self.enqueue(*point));
        }
        report
    }

    /// A/B 往返 `iterations` 次，每个点等待回显后再发下一个
    ///
    /// 开始前清空接收队列。被拒绝的点不等待回显。
    pub fn circular_repeat(
        &self,
        a: Point,
        b: Point,
        iterations: NonZeroU32,
        stop: &StopToken,
    ) -> Result<PlanReport, PlanError> {
        self.inbound.clear();
        let mut report = PlanReport::default();

        for iteration in 1..=iterations.get() {
            for target in [a, b] {
                if stop.is_stopped() {
                    return Err(PlanError::Cancelled);
                }
                let result = self.enqueue(target);
                report.record(&result);
                if result.is_ok() {
                    self.await_echo(&target, stop)?;
                }
            }
            debug!("Circular repeat iteration {}/{} done", iteration, iterations);
        }

        info!(
            "Circular repeat finished: {} sent, {} rejected",
            report.enqueued, report.rejected
        );
        Ok(report)
    }

    /// 轮询接收队列直到出现与 `target` 坐标相等的点
    fn await_echo(&self, target: &Point, stop: &StopToken) -> Result<(), PlanError> {
        loop {
            while let Some(point) = self.inbound.try_pop() {
                if point == *target {
                    return Ok(());
                }
            }
            if stop.sleep(self.poll_interval) {
                return Err(PlanError::Cancelled);
            }
        }
    }

    /// 在后台线程中执行 CircularRepeat
    pub fn spawn_circular_repeat(
        &self,
        a: Point,
        b: Point,
        iterations: NonZeroU32,
    ) -> std::io::Result<PlanHandle> {
        let planner = self.clone();
        let stop = StopToken::new();
        let token = stop.clone();
        let handle = thread::Builder::new()
            .name("armlink-circular".into())
            .spawn(move || planner.circular_repeat(a, b, iterations, &token))?;
        Ok(PlanHandle { stop, handle })
    }

    /// 在后台线程中执行 SteppedMove
    pub fn spawn_stepped_move(
        &self,
        a: Point,
        b: Point,
        steps: NonZeroU32,
    ) -> std::io::Result<PlanHandle> {
        let planner = self.clone();
        let stop = StopToken::new();
        let token = stop.clone();
        let handle = thread::Builder::new()
            .name("armlink-stepped".into())
            .spawn(move || planner.stepped_move(a, b, steps, &token))?;
        Ok(PlanHandle { stop, handle })
    }
}
