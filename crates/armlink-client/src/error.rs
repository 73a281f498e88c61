//! 客户端错误类型定义

use armlink_protocol::{Axis, Point};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 操作员输入错误
///
/// 解释器从不返回 `Err`：出错的输入总是解析为 `NoOp` 并附带此错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command '{input}'")]
    UnknownCommand { input: char },

    #[error("Command '{command}' takes no payload, got {payload:?}")]
    UnexpectedPayload { command: char, payload: String },

    #[error("Jog step must be a positive integer, got {payload:?}")]
    InvalidJogStep { payload: String },

    #[error("Count must be an integer >= 1, got {field:?}")]
    InvalidCount { field: String },

    #[error("Command '{command}' needs a count field")]
    MissingCount { command: char },

    #[error("Invalid point {literal:?}: {reason}")]
    InvalidPoint { literal: String, reason: String },

    #[error("Command '{command}' needs at least {expected} points, got {actual}")]
    TooFewPoints {
        command: char,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown coordinate system '{selector}'")]
    UnknownCoordinateSystem { selector: char },
}

/// 轨迹执行错误
#[derive(Error, Debug)]
pub enum PlanError {
    /// 点超出工作空间包络，未入队
    #[error("Point {point} is out of range on axis {axis}")]
    OutOfRange { point: Point, axis: Axis },

    /// 被停止令牌取消
    #[error("Trajectory cancelled")]
    Cancelled,

    /// 无法读取轨迹文件
    #[error("Failed to read trajectory file {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 轨迹文件中的某一行无效
    #[error("{}:{line}: {source}", path.display())]
    InvalidLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: InputError,
    },

    /// 轨迹文件没有任何点
    #[error("Trajectory file {} contains no points", path.display())]
    EmptyTrajectory { path: PathBuf },
}
