//! 协议常量定义

/// 位姿坐标数量（X, Y, Z, W, P, R）
pub const COORDINATE_COUNT: usize = 6;

/// 运动参数数量（segment_time, motion_type, control）
pub const PARAMETER_COUNT: usize = 3;

/// 每条消息的整数字段总数
pub const FIELD_COUNT: usize = COORDINATE_COUNT + PARAMETER_COUNT;

/// 参与边界检查的主坐标数量（X, Y, Z）
pub const MAIN_COORDINATE_COUNT: usize = 3;

/// 默认（零位）坐标：笛卡尔微米 / 关节毫度
pub const HOME_COORDINATES: [i32; COORDINATE_COUNT] = [985_000, 0, 940_000, -180_000, 0, 0];

/// 默认段时间
pub const DEFAULT_SEGMENT_TIME: u32 = 10;

/// 默认控制标志
pub const DEFAULT_CONTROL: i32 = 0;

/// 消息终止符
pub const MESSAGE_TERMINATOR: u8 = b'\n';

/// 字段分隔符
pub const FIELD_SEPARATOR: u8 = b' ';
