use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// 脚本子系统配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptConfig {
    /// 关闭后帧驱动跳过（或回退到原生实现）脚本入口
    pub enabled: bool,
    /// 脚本根目录，模块的裸名称与 `/` 前缀说明符相对于它解析
    pub script_root: PathBuf,
    /// 启动时执行的入口模块（相对脚本根目录）
    pub entry_module: String,
    /// 入口模块安装到全局的对象名，帧驱动调用其 `update`/`render`
    pub entry_object: String,
    pub enable_modules: bool,
    pub enable_hot_reload: bool,
    pub hot_reload_debounce_ms: u64,
    /// 运行时堆上限（MiB），0 表示不限制
    pub heap_size_limit_mb: usize,
    /// 触发垃圾回收的分配阈值（MiB），0 表示使用运行时默认值
    pub gc_threshold_mb: usize,
    /// 原生栈上限（KiB），0 表示使用默认值
    pub max_stack_size_kb: usize,
    /// 将 `console.*` 输出到日志
    pub enable_console_output: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script_root: PathBuf::from("Data/Scripts"),
            entry_module: "main.mjs".to_string(),
            entry_object: "JSEngine".to_string(),
            enable_modules: true,
            enable_hot_reload: true,
            hot_reload_debounce_ms: 100,
            heap_size_limit_mb: 256,
            gc_threshold_mb: 16,
            max_stack_size_kb: 1024,
            enable_console_output: true,
        }
    }
}

impl ScriptConfig {
    /// 以指定目录为脚本根目录、关闭文件监视的配置（工具与测试使用）
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            script_root: root.into(),
            enable_hot_reload: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.entry_object.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "script.entry_object must not be empty".to_string(),
            ));
        }
        if self.entry_module.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "script.entry_module must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
