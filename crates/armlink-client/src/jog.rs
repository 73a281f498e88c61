//! 命令字母表与点动系数

use armlink_protocol::Axis;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::directive::Sign;

/// 默认点动系数（坐标单位）
pub const DEFAULT_JOG_STEP: i32 = 10_000;

/// 命令字母对应的原语
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Jog(Axis, Sign),
    CircularRepeat,
    SteppedMove,
    Home,
    LoadFromFile,
    PositionalList,
}

/// 命令字母表：12 个点动 + 5 个轨迹/系统命令
pub const COMMAND_TABLE: [(char, Command); 17] = [
    ('q', Command::Jog(Axis::X, Sign::Positive)),
    ('a', Command::Jog(Axis::X, Sign::Negative)),
    ('w', Command::Jog(Axis::Y, Sign::Positive)),
    ('s', Command::Jog(Axis::Y, Sign::Negative)),
    ('e', Command::Jog(Axis::Z, Sign::Positive)),
    ('d', Command::Jog(Axis::Z, Sign::Negative)),
    ('r', Command::Jog(Axis::W, Sign::Positive)),
    ('f', Command::Jog(Axis::W, Sign::Negative)),
    ('t', Command::Jog(Axis::P, Sign::Positive)),
    ('g', Command::Jog(Axis::P, Sign::Negative)),
    ('y', Command::Jog(Axis::R, Sign::Positive)),
    ('h', Command::Jog(Axis::R, Sign::Negative)),
    ('c', Command::CircularRepeat),
    ('p', Command::SteppedMove),
    ('z', Command::Home),
    ('x', Command::LoadFromFile),
    ('o', Command::PositionalList),
];

/// 查找命令字母
pub fn lookup(letter: char) -> Option<Command> {
    COMMAND_TABLE
        .iter()
        .find(|(c, _)| *c == letter)
        .map(|(_, command)| *command)
}

/// 持久化的点动系数
///
/// 任何带正整数参数的点动命令都会修改它，直到下次修改前一直有效。
#[derive(Debug)]
pub struct JogCoefficient(AtomicI32);

impl Default for JogCoefficient {
    fn default() -> Self {
        Self::new(DEFAULT_JOG_STEP)
    }
}

impl JogCoefficient {
    pub fn new(step: i32) -> Self {
        Self(AtomicI32::new(step))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, step: i32) {
        self.0.store(step, Ordering::Relaxed);
    }
}
