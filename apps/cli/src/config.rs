//! 配置加载
//!
//! 配置文件为 TOML，包含 `[session]` 与 `[console]` 两节，所有字段都可省略：
//!
//! ```toml
//! [session]
//! host = "192.168.0.21"
//! command_port = 9998
//! telemetry_port = 9999
//!
//! [session.bounds]
//! min = [830000, -400000, 539000]
//! max = [1320000, 317000, 960000]
//!
//! [console]
//! trajectory_file = "pick.traj"
//! log_dir = "logs"
//! ```
//!
//! 未指定 `--config` 时读取 `<config_dir>/armlink/config.toml`，文件不存在则使用默认值；
//! 显式指定的文件必须存在。解析或校验失败都是致命错误。

use anyhow::{Context, Result};
use armlink_driver::SessionConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 控制台配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// `x` 命令加载的轨迹文件
    pub trajectory_file: Option<PathBuf>,

    /// 消息历史日志目录（按天滚动）
    pub log_dir: Option<PathBuf>,

    /// 输入历史文件
    pub history_file: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub console: ConsoleConfig,
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub command_port: Option<u16>,
    pub telemetry_port: Option<u16>,
    pub trajectory_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("armlink").join("config.toml"))
}

impl AppConfig {
    /// 解析 TOML 文本
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("解析配置文件失败")
    }

    /// 从文件加载
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("配置文件无效: {}", path.display()))
    }

    /// 加载配置，应用命令行覆盖并校验
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    info!("No configuration file found, using defaults");
                    Self::default()
                },
            },
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.session.host = host;
        }
        if let Some(port) = overrides.command_port {
            self.session.command_port = port;
        }
        if let Some(port) = overrides.telemetry_port {
            self.session.telemetry_port = port;
        }
        if overrides.trajectory_file.is_some() {
            self.console.trajectory_file = overrides.trajectory_file;
        }
        if overrides.log_dir.is_some() {
            self.console.log_dir = overrides.log_dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.session.validate().context("会话配置无效")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armlink_protocol::CoordinateSystem;
    use std::io::Write;

    #[test]
    fn test_empty_toml_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [session]
            host = "10.0.0.5"
            default_coordinate_system = "joint"

            [console]
            trajectory_file = "pick.traj"
            "#,
        )
        .unwrap();
        assert_eq!(config.session.host, "10.0.0.5");
        assert_eq!(config.session.command_port, 9998);
        assert_eq!(
            config.session.default_coordinate_system,
            CoordinateSystem::Joint
        );
        assert_eq!(
            config.console.trajectory_file,
            Some(PathBuf::from("pick.traj"))
        );
        assert_eq!(config.console.log_dir, None);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            AppConfig::from_toml(include_str!("../../../config/armlink.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply(Overrides {
            host: Some("127.0.0.1".to_string()),
            telemetry_port: Some(7000),
            ..Default::default()
        });
        assert_eq!(config.session.host, "127.0.0.1");
        assert_eq!(config.session.command_port, 9998);
        assert_eq!(config.session.telemetry_port, 7000);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\ncommand_port = 9999").unwrap();
        // 两个端口相同
        assert!(AppConfig::load(Some(file.path()), Overrides::default()).is_err());
    }

    #[test]
    fn test_unparseable_config_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session\nhost = ").unwrap();
        assert!(AppConfig::load(Some(file.path()), Overrides::default()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_fatal() {
        let path = Path::new("/nonexistent/armlink/config.toml");
        assert!(AppConfig::load(Some(path), Overrides::default()).is_err());
    }
}
