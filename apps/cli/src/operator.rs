//! 操作员控制台
//!
//! 把解释出的指令作用到当前位姿、规划器和会话上。
//! 当前位姿只在包络检查通过后才更新。

use armlink_client::{
    CommandInterpreter, Console, Directive, JogCoefficient, Mode, PlanError, PlanHandle,
    TrajectoryPlanner, load_trajectory,
};
use armlink_driver::SessionManager;
use armlink_protocol::Point;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::input::{EXIT_COMMANDS, PromptMode};

/// 控制流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// 后台轨迹任务种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Stepped,
    Circular,
}

/// 操作员控制台状态
pub struct Operator {
    session: SessionManager,
    interpreter: CommandInterpreter,
    planner: TrajectoryPlanner,
    console: Arc<dyn Console>,
    prompt: Arc<PromptMode>,
    pose: Point,
    home: Point,
    trajectory_file: Option<PathBuf>,
    task: Option<(TaskKind, PlanHandle)>,
}

impl Operator {
    pub fn new(
        session: SessionManager,
        console: Arc<dyn Console>,
        prompt: Arc<PromptMode>,
        trajectory_file: Option<PathBuf>,
    ) -> Self {
        let config = session.config();
        let home = config.home;
        let interpreter = CommandInterpreter::new(
            Mode::Command,
            config.default_coordinate_system,
            Arc::new(JogCoefficient::default()),
        );
        let planner = TrajectoryPlanner::new(
            session.outbound(),
            session.inbound(),
            config.bounds,
            console.clone(),
        );
        prompt.set(interpreter.mode());

        Self {
            session,
            interpreter,
            planner,
            console,
            prompt,
            pose: home,
            home,
            trajectory_file,
            task: None,
        }
    }

    pub fn pose(&self) -> Point {
        self.pose
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// 处理一行输入
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let trimmed = line.trim();
        if EXIT_COMMANDS.contains(&trimmed) {
            return Flow::Exit;
        }
        match trimmed {
            "help" => print_help(),
            "status" | "?" => self.print_status(),
            _ => {
                let interpretation = self.interpreter.interpret(line, &self.pose);
                self.prompt.set(self.interpreter.mode());
                if let Some(err) = &interpretation.error {
                    self.console.error(&err.to_string());
                }
                self.apply(interpretation.directive);
            },
        }
        Flow::Continue
    }

    /// 执行一条指令
    pub fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::NoOp => {},
            Directive::SetCoordinateSystem(system) => {
                self.session.set_coordinate_system(system);
                self.console.info(&format!("坐标系切换为 {}", system));
            },
            Directive::Jog { axis, sign, step } => {
                self.move_to(Directive::jog_target(&self.pose, axis, sign, step));
            },
            Directive::Home => self.move_to(self.home),
            Directive::FullControl(point) => self.move_to(point),
            Directive::LoadFromFile => self.load_from_file(),
            Directive::PositionalList(points) => self.run_positional(&points),
            Directive::SteppedMove { a, b, steps } => {
                self.spawn_task(TaskKind::Stepped, a, b, steps);
            },
            Directive::CircularRepeat { a, b, iterations } => {
                self.spawn_task(TaskKind::Circular, a, b, iterations);
            },
        }
    }

    fn move_to(&mut self, target: Point) {
        if self.planner.enqueue(target).is_ok() {
            self.pose = target;
        }
    }

    fn run_positional(&mut self, points: &[Point]) {
        let report = self.planner.positional_list(points);
        if let Some(last) = points
            .iter()
            .rev()
            .find(|p| self.planner.bounds().contains(p))
        {
            self.pose = *last;
        }
        self.console.info(&format!(
            "已入队 {} 个点，拒绝 {} 个",
            report.enqueued, report.rejected
        ));
    }

    fn load_from_file(&mut self) {
        let Some(path) = self.trajectory_file.clone() else {
            self.console.error("未配置轨迹文件 (trajectory_file)");
            return;
        };
        match load_trajectory(&path, &self.home) {
            Ok(points) => {
                info!("Executing {} points from {}", points.len(), path.display());
                self.run_positional(&points);
            },
            Err(e) => self.console.error(&e.to_string()),
        }
    }

    fn spawn_task(&mut self, kind: TaskKind, a: Point, b: Point, count: NonZeroU32) {
        if self.task.is_some() {
            self.console.error("已有轨迹任务在执行，按 Ctrl+C 取消");
            return;
        }
        let spawned = match kind {
            TaskKind::Stepped => self.planner.spawn_stepped_move(a, b, count),
            TaskKind::Circular => self.planner.spawn_circular_repeat(a, b, count),
        };
        match spawned {
            Ok(handle) => {
                if self.planner.bounds().contains(&b) {
                    self.pose = b;
                }
                self.task = Some((kind, handle));
            },
            Err(e) => self.console.error(&format!("无法启动轨迹任务: {}", e)),
        }
    }

    /// 回收已结束的任务；没有往返任务时丢弃遥测，避免接收队列无限增长
    pub fn poll(&mut self) {
        let finished = self.task.as_ref().is_some_and(|(_, h)| h.is_finished());
        if finished && let Some((kind, handle)) = self.task.take() {
            match handle.join() {
                Ok(report) => self.console.info(&format!(
                    "轨迹完成：发送 {} 个点，拒绝 {} 个",
                    report.enqueued, report.rejected
                )),
                Err(PlanError::Cancelled) => self.console.info("轨迹已取消"),
                Err(e) => self.console.error(&e.to_string()),
            }
            info!("{:?} task finished", kind);
        }

        if !matches!(self.task, Some((TaskKind::Circular, _))) {
            self.session.inbound().clear();
        }
    }

    /// Ctrl+C：取消正在执行的轨迹并清空发送队列；空闲时退出
    pub fn interrupt(&mut self) -> Flow {
        let Some((_, handle)) = self.task.take() else {
            return Flow::Exit;
        };
        handle.cancel();
        let _ = handle.join();
        let dropped = self.session.outbound().drain().len();
        warn!("Trajectory cancelled, {} queued points dropped", dropped);
        self.console.info(&format!("轨迹已取消，丢弃 {} 个排队点", dropped));
        Flow::Continue
    }

    /// 停止任务与会话
    pub fn shutdown(mut self) {
        if let Some((_, handle)) = self.task.take() {
            handle.cancel();
            let _ = handle.join();
        }
        if self.session.is_running()
            && let Err(e) = self.session.stop()
        {
            warn!("Failed to stop session: {}", e);
        }
    }

    fn print_status(&self) {
        let metrics = self.session.metrics();
        println!("📊 会话状态: {}", self.session.state());
        println!("   坐标系:   {}", self.session.coordinate_system());
        println!("   输入模式: {}", self.interpreter.mode());
        println!("   点动系数: {}", self.interpreter.jog_coefficient().get());
        println!("   目标位姿: {}", self.pose);
        match self.session.last_received() {
            Some(p) => println!("   最近遥测: {}", p),
            None => println!("   最近遥测: (无)"),
        }
        println!(
            "   排队点数: {}  未确认: {}",
            self.session.outbound().len(),
            self.session.unacknowledged()
        );
        println!(
            "   发送/接收: {}/{}  重启: {}  降级: {}  重放: {}",
            metrics.points_sent,
            metrics.points_received,
            metrics.restarts,
            metrics.degraded_entries,
            metrics.replayed
        );
    }
}

fn print_help() {
    println!("可用命令:");
    println!("  q/a w/s e/d     X/Y/Z 正/负方向点动（可带步长，如 w500）");
    println!("  r/f t/g y/h     W/P/R 正/负方向点动");
    println!("  z               回到零位");
    println!("  x               执行轨迹文件");
    println!("  p|A|n|B         从 A 到 B 分 n 步直线移动");
    println!("  c|A|n|B         A/B 往返 n 次（等待回显）");
    println!("  o|P1|P2|...     依次移动到各点");
    println!("  1 / 2           选择关节 / 世界坐标系");
    println!("  =               切换位姿输入模式");
    println!("  status, ?       显示会话状态");
    println!("  exit, quit      退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use armlink_client::MemoryConsole;
    use armlink_driver::SessionConfig;
    use armlink_protocol::{Axis, CoordinateSystem};
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn operator(trajectory_file: Option<PathBuf>) -> (Operator, Arc<MemoryConsole>) {
        let session = SessionManager::builder(SessionConfig::default())
            .build()
            .unwrap();
        let console = Arc::new(MemoryConsole::new());
        let op = Operator::new(
            session,
            console.clone(),
            Arc::new(PromptMode::default()),
            trajectory_file,
        );
        (op, console)
    }

    fn wait_for_task(op: &mut Operator) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while op.has_task() && Instant::now() < deadline {
            op.poll();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(!op.has_task());
    }

    #[test]
    fn test_jog_commits_pose() {
        let (mut op, _) = operator(None);
        op.handle_line("q500");
        assert_eq!(op.pose().coord(Axis::X), 985_500);
        op.handle_line("q");
        assert_eq!(op.pose().coord(Axis::X), 986_000);
        assert_eq!(op.session().outbound().len(), 2);
    }

    #[test]
    fn test_rejected_jog_keeps_pose() {
        let (mut op, console) = operator(None);
        // Z 上限 960000
        op.handle_line("e30000");
        assert_eq!(op.pose(), Point::home());
        assert!(op.session().outbound().is_empty());
        assert_eq!(console.errors().len(), 1);
    }

    #[test]
    fn test_home_and_full_control() {
        let (mut op, _) = operator(None);
        op.handle_line("=");
        op.handle_line("900000 100");
        assert_eq!(&op.pose().coords()[..2], &[900_000, 100]);
        op.handle_line("=");
        op.handle_line("z");
        assert_eq!(op.pose(), Point::home());
        assert_eq!(op.session().outbound().len(), 2);
    }

    #[test]
    fn test_coordinate_system_selection() {
        let (mut op, _) = operator(None);
        op.handle_line("1");
        assert_eq!(op.session().coordinate_system(), CoordinateSystem::Joint);
    }

    #[test]
    fn test_invalid_input_reports_error() {
        let (mut op, console) = operator(None);
        assert_eq!(op.handle_line("k"), Flow::Continue);
        assert_eq!(console.errors().len(), 1);
        assert!(op.session().outbound().is_empty());
    }

    #[test]
    fn test_stepped_move_runs_detached() {
        let (mut op, _) = operator(None);
        op.handle_line(
            "p|985000 0 940000 -180000 0 0 10 2 0|900000 0 940000 -180000 0 0 10 2 0|5",
        );
        wait_for_task(&mut op);
        assert_eq!(op.session().outbound().len(), 6);
        assert_eq!(op.pose().coord(Axis::X), 900_000);
    }

    #[test]
    fn test_interrupt_cancels_circular_task() {
        let (mut op, _) = operator(None);
        op.handle_line("c|985000|3|900000");
        assert!(op.has_task());
        assert_eq!(op.interrupt(), Flow::Continue);
        assert!(!op.has_task());
        assert!(op.session().outbound().is_empty());
        // 空闲时 Ctrl+C 退出
        assert_eq!(op.interrupt(), Flow::Exit);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "950000\n# comment\n960000").unwrap();
        let (mut op, _) = operator(Some(file.path().to_path_buf()));
        op.handle_line("x");
        assert_eq!(op.session().outbound().len(), 2);
        assert_eq!(op.pose().coord(Axis::X), 960_000);
    }

    #[test]
    fn test_load_without_file_configured() {
        let (mut op, console) = operator(None);
        op.handle_line("x");
        assert_eq!(console.errors().len(), 1);
    }

    #[test]
    fn test_exit_commands() {
        let (mut op, _) = operator(None);
        assert_eq!(op.handle_line(" quit "), Flow::Exit);
    }
}
