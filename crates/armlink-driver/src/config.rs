//! 会话配置
//!
//! 在构造 [`SessionManager`](crate::SessionManager) 时传入的不可变配置。
//! 所有字段都有默认值，可以从 TOML 的部分字段反序列化。

use crate::error::DriverError;
use armlink_protocol::{BoundEnvelope, CoordinateSystem, Point};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 降级节流时间的上限，极小的 `robot_speed` 也不会让发送停顿更久
pub const MAX_TRAVEL_TIME: Duration = Duration::from_secs(3600);

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 控制器地址
    pub host: String,

    /// 命令通道端口（发送位姿）
    pub command_port: u16,

    /// 遥测通道端口（接收位姿）
    pub telemetry_port: u16,

    /// 发送/接收循环的 tick 间隔
    pub tick_interval_ms: u64,

    /// 机器人速度（坐标单位/毫秒），用于降级状态下的节流
    pub robot_speed: f64,

    /// 断连超时；沉默超过其三分之一进入降级状态
    pub disconnect_timeout_ms: u64,

    /// 降级后的第二个超时，超过则强制重启
    pub restart_timeout_ms: u64,

    /// 两次连接尝试之间的等待时间
    pub reconnect_delay_ms: u64,

    /// 单次 TCP 连接超时
    pub connect_timeout_ms: u64,

    /// 遥测读取超时（接收线程借此轮询停止标志）
    pub read_timeout_ms: u64,

    /// 连续失败多少次后发送修复探测
    pub healing_threshold: u32,

    /// 连接后选择的坐标系
    pub default_coordinate_system: CoordinateSystem,

    /// 工作空间包络
    pub bounds: BoundEnvelope,

    /// 零位
    pub home: Point,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.21".to_string(),
            command_port: 9998,
            telemetry_port: 9999,
            tick_interval_ms: 10,
            robot_speed: 100.0,
            disconnect_timeout_ms: 3000,
            restart_timeout_ms: 10_000,
            reconnect_delay_ms: 1000,
            connect_timeout_ms: 2000,
            read_timeout_ms: 50,
            healing_threshold: 3,
            default_coordinate_system: CoordinateSystem::World,
            bounds: BoundEnvelope::default(),
            home: Point::home(),
        }
    }
}

impl SessionConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        let invalid = |msg: &str| Err(DriverError::InvalidConfig(msg.to_string()));

        if self.host.trim().is_empty() {
            return invalid("host must not be empty");
        }
        if self.command_port == 0 || self.telemetry_port == 0 {
            return invalid("ports must be non-zero");
        }
        if self.command_port == self.telemetry_port {
            return invalid("command_port and telemetry_port must differ");
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be > 0");
        }
        if self.read_timeout_ms == 0 {
            return invalid("read_timeout_ms must be > 0");
        }
        if self.connect_timeout_ms == 0 {
            return invalid("connect_timeout_ms must be > 0");
        }
        if !(self.robot_speed.is_finite() && self.robot_speed > 0.0) {
            return invalid("robot_speed must be a positive number");
        }
        if self.disconnect_timeout_ms < 3 {
            return invalid("disconnect_timeout_ms must be >= 3");
        }
        if self.restart_timeout_ms <= self.degraded_threshold().as_millis() as u64 {
            return invalid("restart_timeout_ms must exceed one third of disconnect_timeout_ms");
        }
        if self.healing_threshold == 0 {
            return invalid("healing_threshold must be >= 1");
        }
        if !self.bounds.is_valid() {
            return invalid("bounds: every min must be <= max");
        }
        if !self.bounds.contains(&self.home) {
            return invalid("home must lie inside bounds");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 进入降级状态的沉默阈值（断连超时的三分之一）
    pub fn degraded_threshold(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms / 3)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// 以机器人速度移动 `distance` 所需时间，不超过 [`MAX_TRAVEL_TIME`]
    pub fn travel_time(&self, distance: f64) -> Duration {
        let ms = distance / self.robot_speed;
        if ms.is_nan() || ms <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(ms / 1000.0)
            .map_or(MAX_TRAVEL_TIME, |time| time.min(MAX_TRAVEL_TIME))
    }
}
