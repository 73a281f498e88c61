//! # Armlink Client
//!
//! 操作员侧逻辑：把一行文本输入解释为 [`Directive`]，
//! 再由 [`TrajectoryPlanner`] 展开为点序列放入会话的发送队列。
//!
//! ```text
//! 输入行 → CommandInterpreter → Directive → TrajectoryPlanner → 发送队列
//! ```
//!
//! # 示例
//!
//! ```
//! use armlink_client::{CommandInterpreter, Directive, NullConsole, TrajectoryPlanner};
//! use armlink_driver::{PointQueue, StopToken};
//! use armlink_protocol::{BoundEnvelope, Point};
//! use std::sync::Arc;
//!
//! let outbound = Arc::new(PointQueue::new());
//! let planner = TrajectoryPlanner::new(
//!     outbound.clone(),
//!     Arc::new(PointQueue::new()),
//!     BoundEnvelope::default(),
//!     Arc::new(NullConsole),
//! );
//!
//! let mut interpreter = CommandInterpreter::default();
//! let pose = Point::home();
//! let line = "p|985000 0 940000 -180000 0 0 10 2 0|900000 0 940000 -180000 0 0 10 2 0|5";
//! if let Directive::SteppedMove { a, b, steps } = interpreter.interpret(line, &pose).directive {
//!     planner.stepped_move(a, b, steps, &StopToken::new()).unwrap();
//! }
//! assert_eq!(outbound.len(), 6);
//! ```

mod console;
mod directive;
mod error;
mod interpreter;
mod jog;
mod literal;
mod loader;
mod planner;

pub use console::{Console, ConsoleLevel, MemoryConsole, NullConsole};
pub use directive::{Directive, Mode, Sign};
pub use error::{InputError, PlanError};
pub use interpreter::{CommandInterpreter, Interpretation, MODE_TOGGLE};
pub use jog::{COMMAND_TABLE, Command, DEFAULT_JOG_STEP, JogCoefficient, lookup};
pub use literal::parse_point;
pub use loader::load_trajectory;
pub use planner::{DEFAULT_POLL_INTERVAL, PlanHandle, PlanReport, SteppedPath, TrajectoryPlanner};
