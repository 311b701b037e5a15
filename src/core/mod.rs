//! 核心模块
//!
//! 包含应用的核心功能：
//! - `app` - 应用上下文与帧驱动
//! - `clock` - 系统时钟与游戏时钟
//! - `events` - 命名事件
//! - `jobs` - 工作线程池
//! - `dev_console` - 开发者控制台
//! - `error` - 错误类型定义

#[macro_use]
pub mod macros;

pub mod app;
pub mod clock;
pub mod dev_console;
pub mod error;
pub mod events;
pub mod jobs;
pub mod utils;

// 重新导出错误类型
pub use error::{
    AppError, AppResult, AudioError, AudioResult, GameError, GameResult, JobError, JobResult,
    ModuleError, ModuleErrorKind, ModuleResult, ResourceError, ResourceResult, ScriptError,
    ScriptResult,
};

// 重新导出主要类型
pub use app::{App, AppState, FramePhase, LifecycleStep, QuitSignal, Subsystem};
pub use clock::{Clock, SystemClock};
pub use dev_console::{ConsoleLine, DevConsole, LineKind};
pub use events::{EventArgs, EventSystem, SubscriptionId};
pub use jobs::{JobHandle, JobKind, JobSystem};
pub use utils::{current_timestamp, current_timestamp_f64, lock, shared, Shared};
