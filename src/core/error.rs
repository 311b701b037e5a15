//! 统一错误处理模块
//!
//! 提供应用范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - `AppError`: 启动/帧循环层面的错误，可由各子系统错误转换而来
//! - `ScriptError` / `ModuleError`: 脚本运行时与模块加载的错误
//! - 其余为各子系统自身的错误
//!
//! 桥接层的参数提取错误（`ExtractionError`）定义在 `scripting::extract` 中，
//! 它们永远不会越过桥接边界，只会被转换为 `ScriptMethodResult::Error`。

use thiserror::Error;

use crate::config::ConfigError;

/// 应用核心错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Job system error: {0}")]
    Job(#[from] JobError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 脚本系统错误
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script runtime is not initialized")]
    NotInitialized,

    #[error("Failed to create script runtime: {0}")]
    RuntimeCreation(String),

    #[error("Script compilation error: {0}")]
    Compilation(String),

    #[error("Script runtime error: {0}")]
    Runtime(String),

    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Invalid script binding: {0}")]
    InvalidBinding(String),

    #[error("Script entry point '{0}' is not defined")]
    MissingEntryPoint(String),

    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// 模块加载错误
///
/// 四种失败相互区分：找不到模块文件、依赖无法解析或导入名不存在（实例化失败）、
/// 语法错误（编译失败）、顶层代码抛出异常（求值失败）。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleError {
    #[error("module not found: {path}")]
    NotFound { path: String },

    #[error("failed to read module file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("module instantiation failed: cannot resolve '{specifier}' imported from '{importer}'")]
    Resolution { importer: String, specifier: String },

    #[error("module instantiation failed in '{module}': {message}")]
    Link { module: String, message: String },

    #[error("module compilation failed in '{module}': {message}")]
    Compilation { module: String, message: String },

    #[error("module evaluation failed in '{module}': {message}")]
    Evaluation { module: String, message: String },
}

/// 模块错误的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleErrorKind {
    NotFound,
    Resolution,
    Compilation,
    Evaluation,
}

impl ModuleError {
    pub fn kind(&self) -> ModuleErrorKind {
        match self {
            ModuleError::NotFound { .. } | ModuleError::Read { .. } => ModuleErrorKind::NotFound,
            ModuleError::Resolution { .. } | ModuleError::Link { .. } => {
                ModuleErrorKind::Resolution
            }
            ModuleError::Compilation { .. } => ModuleErrorKind::Compilation,
            ModuleError::Evaluation { .. } => ModuleErrorKind::Evaluation,
        }
    }
}

/// 音频系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    #[error("Unknown sound id: {0}")]
    UnknownSound(u32),

    #[error("Unknown playback id: {0}")]
    UnknownPlayback(u64),

    #[error("Invalid volume {0}, expected 0.0..=1.0")]
    InvalidVolume(f32),

    #[error("Invalid balance {0}, expected -1.0..=1.0")]
    InvalidBalance(f32),

    #[error("Invalid playback speed {0}, expected a positive value")]
    InvalidSpeed(f32),
}

/// 资源管理错误
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Failed to load resource: {path}, reason: {reason}")]
    LoadFailed { path: String, reason: String },
}

/// 作业系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("Job system is shut down")]
    Disconnected,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// 游戏逻辑错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("prop index {index} is out of range (prop count {count})")]
    PropIndexOutOfRange { index: i64, count: usize },

    #[error("player is not available")]
    NoPlayer,
}

/// 结果类型别名
pub type AppResult<T> = Result<T, AppError>;
pub type ScriptResult<T> = Result<T, ScriptError>;
pub type ModuleResult<T> = Result<T, ModuleError>;
pub type AudioResult<T> = Result<T, AudioError>;
pub type ResourceResult<T> = Result<T, ResourceError>;
pub type JobResult<T> = Result<T, JobError>;
pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let script_err = ScriptError::Runtime("boom".to_string());
        let app_err: AppError = script_err.into();
        assert!(matches!(app_err, AppError::Script(_)));
        assert!(app_err.to_string().contains("boom"));
    }

    #[test]
    fn test_module_error_kinds_are_distinct() {
        let errors = [
            ModuleError::NotFound { path: "a.mjs".into() },
            ModuleError::Resolution {
                importer: "a.mjs".into(),
                specifier: "./b.mjs".into(),
            },
            ModuleError::Compilation {
                module: "a.mjs".into(),
                message: "SyntaxError".into(),
            },
            ModuleError::Evaluation {
                module: "a.mjs".into(),
                message: "Error: thrown".into(),
            },
        ];
        let kinds: Vec<_> = errors.iter().map(ModuleError::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ModuleErrorKind::NotFound,
                ModuleErrorKind::Resolution,
                ModuleErrorKind::Compilation,
                ModuleErrorKind::Evaluation
            ]
        );
        assert!(errors[0].to_string().contains("not found"));
        assert!(errors[1].to_string().contains("instantiation"));
        assert!(errors[2].to_string().contains("compilation"));
        assert!(errors[3].to_string().contains("evaluation"));
    }

    #[test]
    fn test_link_error_is_instantiation() {
        let err = ModuleError::Link {
            module: "main.mjs".into(),
            message: "SyntaxError: Could not find export 'nothing'".into(),
        };
        assert_eq!(err.kind(), ModuleErrorKind::Resolution);
        assert!(err.to_string().starts_with("module instantiation failed in 'main.mjs'"));
    }

    #[test]
    fn test_module_error_into_script_error() {
        let err: ScriptError = ModuleError::NotFound { path: "x".into() }.into();
        assert_eq!(err.to_string(), "module not found: x");
    }
}
