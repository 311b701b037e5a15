//! 日志配置
//!
//! 从 `Data/Config/LogConfig.json` 读取；文件缺失或解析失败时回退到内置默认值，
//! 回退原因会在日志系统初始化后记录下来。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};
use crate::impl_default;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 文件轮转设置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RotationConfig {
    pub max_file_size_bytes: u64,
    pub max_time_interval_hours: u64,
    pub log_directory: PathBuf,
    pub current_log_name: String,
    pub session_prefix: String,
}

impl_default!(RotationConfig {
    max_file_size_bytes: 100 * 1024 * 1024,
    max_time_interval_hours: 2,
    log_directory: PathBuf::from("Logs"),
    current_log_name: "latest.log".to_string(),
    session_prefix: "session".to_string(),
});

/// 日志子系统配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// 未启用轮转时写入的文件
    pub log_file_path: PathBuf,
    pub enable_console: bool,
    pub enable_file: bool,
    /// 在开发者控制台中显示日志
    pub enable_on_screen: bool,
    /// 开发者控制台保留的最大行数
    pub max_log_entries: usize,
    pub timestamp_enabled: bool,
    pub thread_id_enabled: bool,
    pub auto_flush: bool,
    pub enable_smart_rotation: bool,
    pub smart_rotation_config: RotationConfig,
}

impl_default!(LogConfig {
    level: LogLevel::Info,
    log_file_path: PathBuf::from("Logs/ProtogameJS3D.log"),
    enable_console: true,
    enable_file: true,
    enable_on_screen: true,
    max_log_entries: 50_000,
    timestamp_enabled: true,
    thread_id_enabled: true,
    auto_flush: false,
    enable_smart_rotation: true,
    smart_rotation_config: RotationConfig::default(),
});

impl LogConfig {
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 加载配置；失败时返回默认值以及回退原因
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<String>) {
        let path = path.as_ref();
        match Self::from_json_file(path) {
            Ok(config) => (config, None),
            Err(ConfigError::FileError(_)) => (
                Self::default(),
                Some(format!("{} not found, using default log configuration", path.display())),
            ),
            Err(err) => (
                Self::default(),
                Some(format!("{} is invalid ({}), using default log configuration", path.display(), err)),
            ),
        }
    }

    /// 当前写入的日志文件
    pub fn active_log_path(&self) -> PathBuf {
        if self.enable_smart_rotation {
            self.smart_rotation_config
                .log_directory
                .join(&self.smart_rotation_config.current_log_name)
        } else {
            self.log_file_path.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builtin_fallback() {
        let config = LogConfig::default();
        assert_eq!(config.max_log_entries, 50_000);
        assert_eq!(config.smart_rotation_config.max_file_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.smart_rotation_config.max_time_interval_hours, 2);
        assert_eq!(config.active_log_path(), PathBuf::from("Logs/latest.log"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LogConfig::from_json_str(
            r#"{ "level": "debug", "enableFile": false, "smartRotationConfig": { "sessionPrefix": "run" } }"#,
        )
        .unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.enable_file);
        assert!(config.enable_console);
        assert_eq!(config.smart_rotation_config.session_prefix, "run");
        assert_eq!(config.smart_rotation_config.current_log_name, "latest.log");
    }

    #[test]
    fn test_fallback_reasons() {
        let (config, reason) = LogConfig::load_or_default("/no/such/LogConfig.json");
        assert_eq!(config, LogConfig::default());
        assert!(reason.unwrap().contains("not found"));

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ not json").unwrap();
        let (_, reason) = LogConfig::load_or_default(file.path());
        assert!(reason.unwrap().contains("invalid"));
    }

    #[test]
    fn test_rotation_disabled_uses_log_file_path() {
        let config = LogConfig {
            enable_smart_rotation: false,
            ..LogConfig::default()
        };
        assert_eq!(config.active_log_path(), PathBuf::from("Logs/ProtogameJS3D.log"));
    }
}
