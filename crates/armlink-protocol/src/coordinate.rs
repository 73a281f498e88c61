//! 坐标系与坐标轴定义

use std::fmt;

/// 位姿坐标轴
///
/// 笛卡尔坐标系下前三个轴为位置（微米），后三个为姿态（毫度）；
/// 关节坐标系下六个轴依次对应 J1-J6（毫度）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    /// 横滚（Roll）
    W,
    /// 俯仰（Pitch）
    P,
    /// 偏航（Yaw）
    R,
}

impl Axis {
    /// 所有轴，按线格式字段顺序排列
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::W, Axis::P, Axis::R];

    /// 在坐标数组中的索引
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::W => 3,
            Axis::P => 4,
            Axis::R => 5,
        }
    }

    /// 轴名称（小写）
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::W => "w",
            Axis::P => "p",
            Axis::R => "r",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 控制器坐标系
///
/// 通过命令通道上的单个 ASCII 数字选择。新坐标系需要同时加入
/// [`CoordinateSystem::ALL`] 注册表，操作员输入和线格式都从注册表查找。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CoordinateSystem {
    /// 关节坐标系（J1-J6）
    Joint,
    /// 世界坐标系（笛卡尔）
    #[default]
    World,
}

impl CoordinateSystem {
    /// 坐标系注册表：`(选择字符, 坐标系)`
    pub const ALL: [(char, CoordinateSystem); 2] = [
        ('1', CoordinateSystem::Joint),
        ('2', CoordinateSystem::World),
    ];

    /// 根据选择字符查找坐标系
    ///
    /// # Example
    ///
    /// ```
    /// use armlink_protocol::CoordinateSystem;
    ///
    /// assert_eq!(CoordinateSystem::from_selector('1'), Some(CoordinateSystem::Joint));
    /// assert_eq!(CoordinateSystem::from_selector('9'), None);
    /// ```
    pub fn from_selector(selector: char) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(c, _)| *c == selector)
            .map(|(_, system)| *system)
    }

    /// 选择字符
    pub fn selector(self) -> char {
        Self::ALL
            .iter()
            .find(|(_, system)| *system == self)
            .map(|(c, _)| *c)
            .unwrap_or('2')
    }

    /// 命令通道上发送的选择字节
    pub fn selector_byte(self) -> u8 {
        self.selector() as u8
    }

    /// 从选择字节还原（用于原子存储）
    pub fn from_selector_byte(byte: u8) -> Option<Self> {
        Self::from_selector(byte as char)
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::Joint => f.write_str("joint"),
            CoordinateSystem::World => f.write_str("world"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_index_matches_field_order() {
        for (i, axis) in Axis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), i);
        }
    }

    #[test]
    fn test_coordinate_system_registry() {
        assert_eq!(
            CoordinateSystem::from_selector('2'),
            Some(CoordinateSystem::World)
        );
        assert_eq!(CoordinateSystem::Joint.selector(), '1');
        assert_eq!(CoordinateSystem::World.selector_byte(), b'2');
        assert_eq!(
            CoordinateSystem::from_selector_byte(b'1'),
            Some(CoordinateSystem::Joint)
        );
        assert_eq!(CoordinateSystem::from_selector('0'), None);
    }

    #[test]
    fn test_default_coordinate_system_is_world() {
        assert_eq!(CoordinateSystem::default(), CoordinateSystem::World);
    }
}
