//! 脚本桥接
//!
//! - `value` / `extract`: 动态脚本值与强类型参数提取
//! - `method` / `object`: 方法结果、方法描述与可脚本化对象协议
//! - `registry` / `marshal`: 名称注册表及其到 JS 全局的绑定
//! - `module_loader` / `module_scan`: ES 模块解析、加载与依赖图
//! - `subsystem`: 持有 QuickJS 运行时的脚本子系统
//! - `hot_reload` / `commands`: 帧间执行的热重载与延迟命令

pub mod commands;
pub mod extract;
pub mod hot_reload;
pub mod marshal;
pub mod method;
pub mod module_loader;
pub mod module_scan;
pub mod object;
pub mod registry;
pub mod subsystem;
pub mod value;

pub use commands::{ScriptCommand, ScriptCommandSender};
pub use extract::{
    check_arg_count, extract_bool, extract_float, extract_int, extract_string, extract_vec3,
    validate_arg_count, ExtractionError,
};
pub use hot_reload::{HotReloadCoordinator, HotReloadError, ReloadStats};
pub use method::{
    dispatch, method_infos, MethodError, MethodHandler, ScriptMethod, ScriptMethodInfo,
    ScriptMethodResult,
};
pub use module_loader::{ModuleGraph, ModuleLoader, SharedModuleLoader};
pub use module_scan::{scan_imports, ImportKind, ImportSpecifier};
pub use object::{share_object, ScriptableObject, SharedScriptableObject, WeakScriptableObject};
pub use registry::{GlobalFunction, ObjectLookup, ScriptRegistry, SharedRegistry};
pub use subsystem::ScriptSubsystem;
pub use value::{ScriptArgs, ScriptValue};
