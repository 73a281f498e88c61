//! 位姿点定义
//!
//! `Point` 是控制链路上唯一的数据单元：6 个整数坐标 + 3 个运动参数。
//!
//! # 相等性
//!
//! `PartialEq` 只比较坐标，忽略运动参数。边界检查和应答匹配都依赖这一点：
//! 控制器回传的位姿可能带有不同的段时间或控制标志。
//! 需要完全相等时使用 [`Point::identical`]。
//!
//! # 算术
//!
//! 支持逐分量 `+`、`-`、`*`（结果保留左操作数的运动参数），以及按步数整除。
//! 整除遵循"永不为零步长"规则：被除数非零但商为零的分量强制为 ±1，
//! 保证增量运动不会停滞。

use crate::ProtocolError;
use crate::codec::{FieldBuffer, WireRecord};
use crate::constants::*;
use crate::coordinate::Axis;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::num::NonZeroU32;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// 运动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum MotionType {
    /// 精确到位（FINE）
    Fine = 0,
    /// 连续运动（不减速通过，CNT）
    #[default]
    Continuous = 2,
}

/// 运动参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotionParams {
    segment_time: NonZeroU32,
    motion_type: MotionType,
    control: i32,
}

impl MotionParams {
    /// 创建运动参数
    ///
    /// # 错误
    /// - `segment_time` 必须 > 0
    pub fn new(
        segment_time: i32,
        motion_type: MotionType,
        control: i32,
    ) -> Result<Self, ProtocolError> {
        let segment_time = u32::try_from(segment_time)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(ProtocolError::InvalidField {
                field: "segment_time",
                value: segment_time as i64,
            })?;
        Ok(Self {
            segment_time,
            motion_type,
            control,
        })
    }

    /// 从三个原始线格式整数解析
    pub fn from_raw(segment_time: i32, motion_type: i32, control: i32) -> Result<Self, ProtocolError> {
        let motion_type =
            MotionType::try_from(motion_type).map_err(|_| ProtocolError::InvalidField {
                field: "motion_type",
                value: motion_type as i64,
            })?;
        Self::new(segment_time, motion_type, control)
    }

    /// 段时间（> 0）
    pub fn segment_time(&self) -> u32 {
        self.segment_time.get()
    }

    /// 运动类型
    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    /// 控制标志
    pub fn control(&self) -> i32 {
        self.control
    }

    /// 转换为线格式整数
    pub fn to_raw(&self) -> [i32; PARAMETER_COUNT] {
        [
            self.segment_time.get().min(i32::MAX as u32) as i32,
            self.motion_type.into(),
            self.control,
        ]
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            segment_time: NonZeroU32::new(DEFAULT_SEGMENT_TIME).unwrap_or(NonZeroU32::MIN),
            motion_type: MotionType::Continuous,
            control: DEFAULT_CONTROL,
        }
    }
}

/// 位姿点
///
/// # Example
///
/// ```
/// use armlink_protocol::{MotionParams, Point};
///
/// let a = Point::new([985_000, 0, 940_000, -180_000, 0, 0], MotionParams::default());
/// let b = a.with_coord(armlink_protocol::Axis::X, 900_000);
/// assert_eq!((a - b).coords()[0], 85_000);
/// ```
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "[i32; FIELD_COUNT]", into = "[i32; FIELD_COUNT]")
)]
pub struct Point {
    coords: [i32; COORDINATE_COUNT],
    params: MotionParams,
}

impl Point {
    /// 创建位姿点
    pub const fn new(coords: [i32; COORDINATE_COUNT], params: MotionParams) -> Self {
        Self { coords, params }
    }

    /// 零位（默认位姿 + 默认运动参数）
    pub fn home() -> Self {
        Self::new(HOME_COORDINATES, MotionParams::default())
    }

    /// 坐标
    #[inline]
    pub fn coords(&self) -> [i32; COORDINATE_COUNT] {
        self.coords
    }

    /// 单轴坐标
    #[inline]
    pub fn coord(&self, axis: Axis) -> i32 {
        self.coords[axis.index()]
    }

    /// 运动参数
    #[inline]
    pub fn params(&self) -> MotionParams {
        self.params
    }

    /// 替换单轴坐标
    pub fn with_coord(mut self, axis: Axis, value: i32) -> Self {
        self.coords[axis.index()] = value;
        self
    }

    /// 单轴偏移（饱和运算）
    pub fn offset(mut self, axis: Axis, delta: i32) -> Self {
        let i = axis.index();
        self.coords[i] = self.coords[i].saturating_add(delta);
        self
    }

    /// 替换运动参数
    pub fn with_params(mut self, params: MotionParams) -> Self {
        self.params = params;
        self
    }

    /// 坐标和参数都相等
    pub fn identical(&self, other: &Self) -> bool {
        self.coords == other.coords && self.params == other.params
    }

    /// 六维坐标欧氏距离
    pub fn distance(&self, other: &Self) -> f64 {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| {
                let d = (*a as f64) - (*b as f64);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// 转换为 9 个线格式整数
    pub fn to_fields(&self) -> [i32; FIELD_COUNT] {
        let p = self.params.to_raw();
        let c = self.coords;
        [c[0], c[1], c[2], c[3], c[4], c[5], p[0], p[1], p[2]]
    }

    fn zip_with(self, rhs: Point, f: impl Fn(i32, i32) -> i32) -> Point {
        let mut coords = self.coords;
        for (l, r) in coords.iter_mut().zip(rhs.coords.iter()) {
            *l = f(*l, *r);
        }
        Point::new(coords, self.params)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::home()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl Eq for Point {}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        self.zip_with(rhs, i32::saturating_add)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        self.zip_with(rhs, i32::saturating_sub)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        *self = *self - rhs;
    }
}

impl Mul for Point {
    type Output = Point;

    fn mul(self, rhs: Point) -> Point {
        self.zip_with(rhs, i32::saturating_mul)
    }
}

impl Div<NonZeroU32> for Point {
    type Output = Point;

    /// 按步数整除（永不为零步长）
    fn div(self, steps: NonZeroU32) -> Point {
        let divisor = steps.get() as i64;
        let mut coords = self.coords;
        for c in coords.iter_mut() {
            if *c == 0 {
                continue;
            }
            let q = (*c as i64) / divisor;
            *c = if q == 0 { c.signum() } else { q as i32 };
        }
        Point::new(coords, self.params)
    }
}

impl TryFrom<[i32; FIELD_COUNT]> for Point {
    type Error = ProtocolError;

    fn try_from(f: [i32; FIELD_COUNT]) -> Result<Self, Self::Error> {
        let params = MotionParams::from_raw(f[6], f[7], f[8])?;
        Ok(Point::new([f[0], f[1], f[2], f[3], f[4], f[5]], params))
    }
}

impl From<Point> for [i32; FIELD_COUNT] {
    fn from(point: Point) -> Self {
        point.to_fields()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.to_fields();
        for (i, v) in fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl WireRecord for Point {
    const FIELD_COUNT: usize = FIELD_COUNT;

    fn to_fields(&self) -> FieldBuffer {
        FieldBuffer::from_slice(&Point::to_fields(self))
    }

    fn from_fields(fields: &[i32]) -> Result<Self, ProtocolError> {
        let fixed: [i32; FIELD_COUNT] =
            fields.try_into().map_err(|_| ProtocolError::FieldCount {
                expected: FIELD_COUNT,
                actual: fields.len(),
            })?;
        Point::try_from(fixed)
    }
}

/// 可用于会话存活检测和降级节流的位姿记录
///
/// 会话层对载荷类型保持泛型，只要求能编解码并计算两点间距离。
pub trait Pose: WireRecord {
    /// 与另一位姿的距离（与机器人速度同单位）
    fn distance_to(&self, other: &Self) -> f64;
}

impl Pose for Point {
    fn distance_to(&self, other: &Self) -> f64 {
        self.distance(other)
    }
}
