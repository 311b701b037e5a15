/// 统一配置系统
///
/// 提供TOML/JSON配置文件与环境变量覆盖
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod logging;
pub mod script;

pub use logging::{LogConfig, LogLevel, RotationConfig};
pub use script::ScriptConfig;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    /// 不创建系统窗口，仅处理注入的平台事件
    pub headless: bool,
}

impl_default!(WindowConfig {
    title: "ProtogameJS3D".to_string(),
    width: 1600,
    height: 800,
    fullscreen: false,
    headless: true,
});

impl WindowConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// 作业系统配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobConfig {
    pub generic_workers: usize,
    pub io_workers: usize,
}

impl_default!(JobConfig {
    generic_workers: 3,
    io_workers: 1,
});

/// 帧驱动配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// 系统时钟单帧最大时长（秒），超过时截断
    pub max_delta_seconds: f64,
    /// 目标帧率，0 表示不限制
    pub target_fps: u32,
    /// 运行的最大帧数，0 表示直到请求退出
    pub max_frames: u64,
    /// 脚本入口不可用时改为调用原生 update/render
    pub native_fallback: bool,
}

impl_default!(FrameConfig {
    max_delta_seconds: 0.1,
    target_fps: 60,
    max_frames: 0,
    native_fallback: false,
});

/// 应用主配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 日志配置文件（JSON）
    pub log_config_path: PathBuf,
    pub window: WindowConfig,
    pub jobs: JobConfig,
    pub frame: FrameConfig,
    pub script: ScriptConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_config_path: PathBuf::from("Data/Config/LogConfig.json"),
            window: WindowConfig::default(),
            jobs: JobConfig::default(),
            frame: FrameConfig::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl AppConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PROTOGAME_WINDOW_WIDTH") {
            if let Ok(width) = val.parse() {
                self.window.width = width;
            }
        }
        if let Ok(val) = env::var("PROTOGAME_WINDOW_HEIGHT") {
            if let Ok(height) = val.parse() {
                self.window.height = height;
            }
        }
        if let Ok(val) = env::var("PROTOGAME_TARGET_FPS") {
            if let Ok(fps) = val.parse() {
                self.frame.target_fps = fps;
            }
        }
        if let Ok(val) = env::var("PROTOGAME_MAX_FRAMES") {
            if let Ok(frames) = val.parse() {
                self.frame.max_frames = frames;
            }
        }
        if let Ok(val) = env::var("PROTOGAME_NATIVE_FALLBACK") {
            self.frame.native_fallback = val.parse().unwrap_or(self.frame.native_fallback);
        }

        if let Ok(val) = env::var("PROTOGAME_SCRIPT_ROOT") {
            self.script.script_root = PathBuf::from(val);
        }
        if let Ok(val) = env::var("PROTOGAME_SCRIPT_ENABLED") {
            self.script.enabled = val.parse().unwrap_or(self.script.enabled);
        }
        if let Ok(val) = env::var("PROTOGAME_HOT_RELOAD") {
            self.script.enable_hot_reload = val.parse().unwrap_or(self.script.enable_hot_reload);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::ValidationError(
                "window dimensions must be non-zero".to_string(),
            ));
        }
        if self.frame.max_delta_seconds <= 0.0 {
            return Err(ConfigError::ValidationError(
                "frame.max_delta_seconds must be positive".to_string(),
            ));
        }
        if self.jobs.generic_workers == 0 {
            return Err(ConfigError::ValidationError(
                "jobs.generic_workers must be at least 1".to_string(),
            ));
        }
        self.script.validate()
    }

    /// 自动查找并加载配置文件，同时返回配置来源
    ///
    /// 按以下顺序查找：
    /// 1. ./config.toml
    /// 2. ./config.json
    /// 3. <用户配置目录>/protogame_js/config.toml
    /// 4. 使用默认配置
    ///
    /// 日志系统依赖此配置，因此来源描述由调用方在日志初始化后记录。
    pub fn load_or_default() -> (Self, String) {
        if let Ok(config) = Self::from_toml_file("config.toml") {
            return (config, "config.toml".to_string());
        }

        if let Ok(config) = Self::from_json_file("config.json") {
            return (config, "config.json".to_string());
        }

        if let Some(dir) = dirs::config_dir() {
            let config_path = dir.join("protogame_js").join("config.toml");
            if let Ok(config) = Self::from_toml_file(&config_path) {
                return (config, config_path.display().to_string());
            }
        }

        (Self::default(), "defaults".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.frame.native_fallback);
        assert_eq!(config.frame.max_delta_seconds, 0.1);
        assert_eq!(config.jobs.generic_workers, 3);
        assert_eq!(config.jobs.io_workers, 1);
        assert_eq!(config.script.entry_object, "JSEngine");
    }

    #[test]
    fn test_toml_round_trip_with_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [frame]
            max_frames = 10
            native_fallback = true

            [script]
            script_root = "Scripts"
            enable_hot_reload = false
            "#,
        )
        .unwrap();
        assert_eq!(config.frame.max_frames, 10);
        assert!(config.frame.native_fallback);
        assert_eq!(config.frame.max_delta_seconds, 0.1);
        assert_eq!(config.script.script_root, PathBuf::from("Scripts"));
        assert_eq!(config.script.entry_module, "main.mjs");

        let saved = toml::to_string(&config).unwrap();
        assert_eq!(AppConfig::from_toml_str(&saved).unwrap(), config);
    }

    #[test]
    fn test_json_config() {
        let config = AppConfig::from_json_str(r#"{ "window": { "title": "Test" } }"#).unwrap();
        assert_eq!(config.window.title, "Test");
        assert_eq!(config.window.width, 1600);
    }

    #[test]
    fn test_json_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.window.fullscreen = true;
        config.save_json(&path).unwrap();
        assert_eq!(AppConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        config.window.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = AppConfig::default();
        config.script.entry_object = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("frame = ["),
            Err(ConfigError::ParseError(_))
        ));
    }
}
