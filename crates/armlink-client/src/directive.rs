//! 指令与输入模式定义

use armlink_protocol::{Axis, CoordinateSystem, Point};
use std::fmt;
use std::num::NonZeroU32;

/// 输入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 每行是一个位姿字面量
    Reading,
    /// 每行以命令字母开头
    #[default]
    Command,
}

impl Mode {
    /// 切换到另一种模式
    pub fn toggled(self) -> Self {
        match self {
            Mode::Reading => Mode::Command,
            Mode::Command => Mode::Reading,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Reading => f.write_str("reading"),
            Mode::Command => f.write_str("command"),
        }
    }
}

/// 点动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    /// 带符号的步长
    pub fn apply(self, step: i32) -> i32 {
        match self {
            Sign::Positive => step,
            Sign::Negative => step.saturating_neg(),
        }
    }
}

/// 一行操作员输入解析出的意图
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    NoOp,
    SetCoordinateSystem(CoordinateSystem),
    /// 单轴点动，`step` 为解析时的点动系数
    Jog {
        axis: Axis,
        sign: Sign,
        step: i32,
    },
    Home,
    LoadFromFile,
    FullControl(Point),
    CircularRepeat {
        a: Point,
        b: Point,
        iterations: NonZeroU32,
    },
    SteppedMove {
        a: Point,
        b: Point,
        steps: NonZeroU32,
    },
    PositionalList(Vec<Point>),
}

impl Directive {
    pub fn is_noop(&self) -> bool {
        matches!(self, Directive::NoOp)
    }

    /// 点动后的目标位姿
    pub fn jog_target(pose: &Point, axis: Axis, sign: Sign, step: i32) -> Point {
        pose.offset(axis, sign.apply(step))
    }
}
