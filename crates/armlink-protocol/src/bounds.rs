//! 工作空间边界检查
//!
//! 只检查主坐标（X, Y, Z），姿态坐标不受限制。边界为闭区间。

use crate::constants::MAIN_COORDINATE_COUNT;
use crate::coordinate::Axis;
use crate::point::Point;

/// 默认最小边界（微米）
pub const DEFAULT_MIN: [i32; MAIN_COORDINATE_COUNT] = [830_000, -400_000, 539_000];

/// 默认最大边界（微米）
pub const DEFAULT_MAX: [i32; MAIN_COORDINATE_COUNT] = [1_320_000, 317_000, 960_000];

/// 工作空间包络
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundEnvelope {
    pub min: [i32; MAIN_COORDINATE_COUNT],
    pub max: [i32; MAIN_COORDINATE_COUNT],
}

impl Default for BoundEnvelope {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
        }
    }
}

impl BoundEnvelope {
    pub const fn new(
        min: [i32; MAIN_COORDINATE_COUNT],
        max: [i32; MAIN_COORDINATE_COUNT],
    ) -> Self {
        Self { min, max }
    }

    /// 每个轴都满足 `min <= max`
    pub fn is_valid(&self) -> bool {
        self.min.iter().zip(self.max.iter()).all(|(lo, hi)| lo <= hi)
    }

    /// 点是否在包络内（含边界）
    pub fn contains(&self, point: &Point) -> bool {
        self.violation(point).is_none()
    }

    /// 返回第一个越界的轴，全部在界内时返回 `None`
    pub fn violation(&self, point: &Point) -> Option<Axis> {
        Axis::ALL[..MAIN_COORDINATE_COUNT]
            .iter()
            .copied()
            .find(|axis| {
                let i = axis.index();
                let v = point.coord(*axis);
                v < self.min[i] || v > self.max[i]
            })
    }
}
