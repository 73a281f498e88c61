//! # Armlink Protocol
//!
//! 机械臂控制器 TCP 文本协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（字段数量、默认位姿）
//! - `point`: 位姿点 `Point` 及其运动参数
//! - `coordinate`: 坐标系注册表与轴定义
//! - `bounds`: 工作空间边界（包络）检查
//! - `codec`: 文本编解码（编码器 + 容错解码器）
//!
//! ## 线格式
//!
//! 两个方向都使用相同的格式：每条消息是一行 ASCII 文本，
//! 包含 9 个以空格分隔的整数，以换行符结尾，没有长度前缀。
//!
//! ```text
//! X Y Z W P R segment_time motion_type control\n
//! 985000 0 940000 -180000 0 0 10 2 0\n
//! ```

pub mod bounds;
pub mod codec;
pub mod constants;
pub mod coordinate;
pub mod point;

// 重新导出常用类型
pub use bounds::BoundEnvelope;
pub use codec::{FieldBuffer, PointDecoder, PointEncoder, RecordDecoder, WireRecord};
pub use constants::*;
pub use coordinate::{Axis, CoordinateSystem};
pub use point::{MotionParams, MotionType, Point, Pose};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 扫描 token 边界时遇到非数字、非分隔符的字节
    ///
    /// 解码器会丢弃当前消息并在下一个换行符处重新同步。
    #[error("Unexpected byte 0x{byte:02X} while scanning for a token boundary")]
    Framing { byte: u8 },

    /// token 形如数字但无法解析为 i32（单独的 `-` 或溢出）
    #[error("Invalid numeric token: {token:?}")]
    InvalidNumber { token: String },

    /// 字段数量不正确
    #[error("Invalid field count: expected {expected}, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// 字段值超出允许范围
    #[error("Invalid value for field {field}: {value}")]
    InvalidField { field: &'static str, value: i64 },
}

impl ProtocolError {
    /// 是否为帧同步错误（可恢复，解码继续）
    pub fn is_framing(&self) -> bool {
        matches!(self, ProtocolError::Framing { .. })
    }
}
