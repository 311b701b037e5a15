//! 日志子系统
//!
//! 基于 `tracing-subscriber` 组合三个输出：
//! - 控制台（stdout，fmt 层）
//! - 轮转文件（无 ANSI 的 fmt 层）
//! - 开发者控制台（[`DevConsoleLayer`]）
//!
//! `RUST_LOG` 存在时覆盖配置中的级别。重复初始化会被忽略。

pub mod console_layer;
pub mod rotation;

use std::sync::Mutex;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogConfig;
use crate::core::dev_console::DevConsole;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::Shared;

pub use console_layer::{DevConsoleLayer, PRINT_TARGET};
pub use rotation::RotatingFileWriter;

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync + 'static>;

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()))
}

fn stdout_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.thread_id_enabled);
    if config.timestamp_enabled {
        layer.boxed()
    } else {
        layer.without_time().boxed()
    }
}

fn file_layer(config: &LogConfig) -> AppResult<BoxedLayer> {
    let writer = if config.enable_smart_rotation {
        RotatingFileWriter::open(config.smart_rotation_config.clone(), config.auto_flush)
    } else {
        let path = config.log_file_path.clone();
        let rotation = crate::config::RotationConfig {
            log_directory: path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
            current_log_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "latest.log".to_string()),
            max_file_size_bytes: 0,
            max_time_interval_hours: 0,
            ..config.smart_rotation_config.clone()
        };
        RotatingFileWriter::open(rotation, config.auto_flush)
    }
    .map_err(|e| AppError::Logging(format!("cannot open log file: {}", e)))?;

    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.thread_id_enabled)
        .with_writer(Mutex::new(writer));
    Ok(if config.timestamp_enabled {
        layer.boxed()
    } else {
        layer.without_time().boxed()
    })
}

/// 安装全局订阅者
///
/// 返回 `Ok(false)` 表示已有全局订阅者，本次调用被忽略。
pub fn init_logging(config: &LogConfig, console: Option<Shared<DevConsole>>) -> AppResult<bool> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.enable_console {
        layers.push(stdout_layer(config));
    }
    if config.enable_file {
        layers.push(file_layer(config)?);
    }
    if config.enable_on_screen {
        if let Some(console) = console {
            layers.push(DevConsoleLayer::new(console).boxed());
        }
    }

    let installed = tracing_subscriber::registry()
        .with(build_filter(config))
        .with(layers)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            target: "app",
            level = config.level.as_filter(),
            console = config.enable_console,
            file = config.enable_file,
            on_screen = config.enable_on_screen,
            "logging initialised"
        );
    }
    Ok(installed)
}
