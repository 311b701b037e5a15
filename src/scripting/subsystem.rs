//! 脚本子系统
//!
//! 持有 QuickJS 运行时与当前上下文，负责：
//! - 经典脚本与 ES 模块的执行
//! - 对象注册表/全局函数表到脚本全局的绑定
//! - 每帧调用入口对象的 `update(gameDt, systemDt)` 与 `render()`
//! - 帧间排空延迟命令、处理热重载
//!
//! 所有方法都只能在帧线程上调用。原生回调中不会重新进入运行时，
//! 需要执行脚本的请求一律通过 [`ScriptCommandSender`] 排队。

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rquickjs::function::This;
use rquickjs::{qjs, Context, Ctx, Function, Module, Object, Persistent, Promise, Runtime, Value};

use crate::config::ScriptConfig;
use crate::core::error::{ModuleError, ModuleResult, ScriptError, ScriptResult};
use crate::core::utils::lock;

use super::commands::{CommandQueue, ScriptCommand, ScriptCommandSender};
use super::hot_reload::{HotReloadCoordinator, ReloadStats};
use super::marshal::{
    exception_message, install_global_function, install_object, install_registry, remove_global,
};
use super::module_loader::{BridgeLoader, BridgeResolver, ModuleLoader, SharedModuleLoader};
use super::object::SharedScriptableObject;
use super::registry::{ScriptRegistry, SharedRegistry};
use super::value::{ScriptArgs, ScriptValue};

/// 单次排空最多执行的挂起作业数，防止脚本无限排队阻塞帧
const MAX_JOBS_PER_DRAIN: usize = 10_000;

struct ScriptHost {
    // 上下文必须先于运行时释放
    context: Context,
    runtime: Runtime,
}

enum EntryFailure {
    Missing(String),
    Thrown(String),
}

/// 脚本子系统
pub struct ScriptSubsystem {
    config: ScriptConfig,
    host: Option<ScriptHost>,
    registry: SharedRegistry,
    loader: SharedModuleLoader,
    commands: CommandQueue,
    hot_reload: HotReloadCoordinator,
    entry_module: Option<String>,
    last_result: String,
    last_error: Option<String>,
    last_frame_error: Option<String>,
}

impl ScriptSubsystem {
    pub fn new(config: ScriptConfig) -> Self {
        let loader = ModuleLoader::new(&config.script_root);
        let debounce = Duration::from_millis(config.hot_reload_debounce_ms);
        Self {
            config,
            host: None,
            registry: Arc::new(Mutex::new(ScriptRegistry::new())),
            loader: Arc::new(Mutex::new(loader)),
            commands: CommandQueue::new(),
            hot_reload: HotReloadCoordinator::new(debounce),
            entry_module: None,
            last_result: String::new(),
            last_error: None,
            last_frame_error: None,
        }
    }

    // ========================================================================
    // 生命周期
    // ========================================================================

    pub fn startup(&mut self) -> ScriptResult<()> {
        if self.host.is_some() {
            return Ok(());
        }

        let runtime = Runtime::new().map_err(|e| ScriptError::RuntimeCreation(e.to_string()))?;
        if self.config.heap_size_limit_mb > 0 {
            runtime.set_memory_limit(self.config.heap_size_limit_mb * 1024 * 1024);
        }
        if self.config.gc_threshold_mb > 0 {
            runtime.set_gc_threshold(self.config.gc_threshold_mb * 1024 * 1024);
        }
        if self.config.max_stack_size_kb > 0 {
            runtime.set_max_stack_size(self.config.max_stack_size_kb * 1024);
        }
        if self.config.enable_modules {
            runtime.set_loader(
                BridgeResolver(Arc::clone(&self.loader)),
                BridgeLoader(Arc::clone(&self.loader)),
            );
        }

        let context = self.create_context(&runtime)?;
        self.host = Some(ScriptHost { context, runtime });

        if self.config.enable_hot_reload {
            let root = lock(&self.loader).root().to_path_buf();
            if let Err(err) = self.hot_reload.watch(&root) {
                tracing::warn!(target: "script.hot_reload", "hot reload disabled: {}", err);
            }
        }

        tracing::info!(
            target: "script",
            root = %self.config.script_root.display(),
            modules = self.config.enable_modules,
            hot_reload = self.hot_reload.is_watching(),
            "script subsystem started"
        );
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.hot_reload.stop();
        if let Some(ScriptHost { context, runtime }) = self.host.take() {
            drop(context);
            runtime.run_gc();
            drop(runtime);
        }
        lock(&self.registry).clear();
        self.entry_module = None;
        tracing::info!(target: "script", "script subsystem shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.host.is_some()
    }

    pub fn are_modules_enabled(&self) -> bool {
        self.config.enable_modules
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    fn create_context(&self, runtime: &Runtime) -> ScriptResult<Context> {
        let context =
            Context::full(runtime).map_err(|e| ScriptError::RuntimeCreation(e.to_string()))?;
        context.with(|ctx| {
            install_registry(&ctx, &self.registry, self.config.enable_console_output)
                .map_err(|e| ScriptError::InvalidBinding(exception_message(&ctx, e)))
        })?;
        Ok(context)
    }

    // ========================================================================
    // 注册
    // ========================================================================

    /// 以全局名称暴露一个可脚本化对象；同名对象会被替换
    pub fn register_scriptable_object(&mut self, name: &str, object: &SharedScriptableObject) {
        lock(&self.registry).register_object(name, object);
        if let Some(host) = &self.host {
            let installed = host
                .context
                .with(|ctx| install_object(&ctx, &self.registry, name).map_err(|e| exception_message(&ctx, e)));
            if let Err(message) = installed {
                tracing::error!(target: "script", object = name, "failed to bind object: {}", message);
            }
        }
        tracing::info!(target: "script", object = name, "scriptable object registered");
    }

    pub fn unregister_scriptable_object(&mut self, name: &str) -> bool {
        let removed = lock(&self.registry).unregister_object(name);
        if removed {
            self.remove_script_global(name);
            tracing::info!(target: "script", object = name, "scriptable object unregistered");
        }
        removed
    }

    /// 注册一个全局原生函数；同名函数会被替换
    pub fn register_global_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&ScriptArgs) -> ScriptValue + Send + Sync + 'static,
    {
        lock(&self.registry).register_function(name, Arc::new(function));
        if let Some(host) = &self.host {
            let installed = host.context.with(|ctx| {
                install_global_function(&ctx, &self.registry, name)
                    .map_err(|e| exception_message(&ctx, e))
            });
            if let Err(message) = installed {
                tracing::error!(target: "script", function = name, "failed to bind function: {}", message);
            }
        }
        tracing::debug!(target: "script", function = name, "global function registered");
    }

    pub fn unregister_global_function(&mut self, name: &str) -> bool {
        let removed = lock(&self.registry).unregister_function(name);
        if removed {
            self.remove_script_global(name);
        }
        removed
    }

    fn remove_script_global(&self, name: &str) {
        if let Some(host) = &self.host {
            host.context.with(|ctx| {
                if let Err(err) = remove_global(&ctx, name) {
                    tracing::warn!(target: "script", name, "failed to remove global: {}", exception_message(&ctx, err));
                }
            });
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn module_loader(&self) -> SharedModuleLoader {
        Arc::clone(&self.loader)
    }

    /// 延迟命令的发送端，交给需要请求脚本执行的原生对象
    pub fn command_sender(&self) -> ScriptCommandSender {
        self.commands.sender()
    }

    // ========================================================================
    // 执行
    // ========================================================================

    /// 执行一段经典脚本，返回最后一个表达式的值
    pub fn execute_script(&mut self, source: &str) -> ScriptResult<ScriptValue> {
        let host = self.host.as_ref().ok_or(ScriptError::NotInitialized)?;
        let outcome = host.context.with(|ctx| {
            check_syntax(&ctx, source).map_err(ScriptError::Compilation)?;
            ctx.eval::<ScriptValue, _>(source)
                .map_err(|e| ScriptError::Runtime(exception_message(&ctx, e)))
        });
        drain_jobs(&host.runtime);

        match outcome {
            Ok(value) => {
                self.last_result = value.to_string();
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                match &err {
                    ScriptError::Compilation(message) | ScriptError::Runtime(message) => {
                        self.record_error(message)
                    }
                    other => self.record_error(&other.to_string()),
                }
                Err(err)
            }
        }
    }

    /// 执行脚本文件；相对路径先按当前目录、再按脚本根目录查找
    pub fn execute_script_file(&mut self, path: impl AsRef<Path>) -> ScriptResult<ScriptValue> {
        let path = path.as_ref();
        let resolved = self.locate_script_file(path).ok_or_else(|| {
            let message = format!("Script not found: {}", path.display());
            self.record_error(&message);
            ScriptError::NotFound(path.display().to_string())
        })?;

        let source = std::fs::read_to_string(&resolved).map_err(|err| {
            let message = format!("Failed to read script file {}: {}", resolved.display(), err);
            self.record_error(&message);
            ScriptError::NotFound(resolved.display().to_string())
        })?;

        tracing::debug!(target: "script", path = %resolved.display(), "executing script file");
        self.execute_script(&source)
    }

    fn locate_script_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        let under_root = self.config.script_root.join(path);
        under_root.is_file().then_some(under_root)
    }

    /// 执行磁盘上的 ES 模块
    pub fn execute_module(&mut self, path: &str) -> ScriptResult<()> {
        self.ensure_modules()?;
        let resolved = lock(&self.loader).resolve_entry(path);
        let name = resolved.map_err(|err| {
            self.record_error(&err.to_string());
            err
        })?;
        self.evaluate_module(&name)
    }

    /// 以给定名称执行内存中的 ES 模块源码
    ///
    /// 名称不带 `scheme://` 前缀时会加上 `inline://`；模块中的相对导入以
    /// 脚本根目录为基准。
    pub fn execute_module_from_source(&mut self, source: &str, name: &str) -> ScriptResult<()> {
        self.ensure_modules()?;
        let name = if ModuleLoader::is_virtual(name) {
            name.to_string()
        } else {
            format!("inline://{}", name)
        };
        lock(&self.loader).register_virtual(&name, source);
        self.evaluate_module(&name)
    }

    /// 执行配置中的入口模块，并把它作为热重载的根
    pub fn execute_entry_module(&mut self) -> ScriptResult<()> {
        self.ensure_modules()?;
        let entry = self.config.entry_module.clone();
        let resolved = lock(&self.loader).resolve_entry(&entry);
        let name = resolved.map_err(|err| {
            self.record_error(&err.to_string());
            err
        })?;
        self.entry_module = Some(name.clone());
        tracing::info!(target: "script", module = %name, "executing entry module");
        self.evaluate_module(&name)
    }

    pub fn entry_module(&self) -> Option<&str> {
        self.entry_module.as_deref()
    }

    fn ensure_modules(&self) -> ScriptResult<()> {
        if !self.config.enable_modules {
            return Err(ScriptError::Runtime("ES modules are disabled".to_string()));
        }
        if self.host.is_none() {
            return Err(ScriptError::NotInitialized);
        }
        Ok(())
    }

    fn evaluate_module(&mut self, name: &str) -> ScriptResult<()> {
        let host = self.host.as_ref().ok_or(ScriptError::NotInitialized)?;
        match run_module(&host.context, &host.runtime, &self.loader, name) {
            Ok(()) => {
                self.last_result = format!("module {} evaluated", name);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::error!(target: "script.modules", module = name, "{}", err);
                self.record_error(&err.to_string());
                Err(err.into())
            }
        }
    }

    // ========================================================================
    // 帧入口
    // ========================================================================

    /// 调用 `<entry_object>.update(gameDt, systemDt)`
    pub fn call_entry_update(&mut self, game_delta: f64, system_delta: f64) -> ScriptResult<()> {
        self.call_entry("update", Some((game_delta, system_delta)))
    }

    /// 调用 `<entry_object>.render()`
    pub fn call_entry_render(&mut self) -> ScriptResult<()> {
        self.call_entry("render", None)
    }

    /// 入口对象及其 update/render 是否已定义
    pub fn has_entry_point(&self) -> bool {
        let Some(host) = &self.host else {
            return false;
        };
        host.context.with(|ctx| {
            let engine = ctx
                .globals()
                .get::<_, Option<Object>>(self.config.entry_object.as_str())
                .ok()
                .flatten();
            engine.is_some_and(|engine| {
                engine.get::<_, Function>("update").is_ok()
                    && engine.get::<_, Function>("render").is_ok()
            })
        })
    }

    fn call_entry(&mut self, method: &str, deltas: Option<(f64, f64)>) -> ScriptResult<()> {
        let host = self.host.as_ref().ok_or(ScriptError::NotInitialized)?;
        let entry = self.config.entry_object.clone();

        let outcome = host.context.with(|ctx| -> Result<(), EntryFailure> {
            let engine: Option<Object> = ctx
                .globals()
                .get(entry.as_str())
                .map_err(|e| EntryFailure::Thrown(exception_message(&ctx, e)))?;
            let engine = engine.ok_or_else(|| EntryFailure::Missing(entry.clone()))?;
            let function: Option<Function> = engine
                .get(method)
                .map_err(|_| EntryFailure::Missing(format!("{}.{}", entry, method)))?;
            let function =
                function.ok_or_else(|| EntryFailure::Missing(format!("{}.{}", entry, method)))?;

            let called = match deltas {
                Some((game_delta, system_delta)) => {
                    function.call::<_, ()>((This(engine.clone()), game_delta, system_delta))
                }
                None => function.call::<_, ()>((This(engine.clone()),)),
            };
            called.map_err(|e| EntryFailure::Thrown(exception_message(&ctx, e)))
        });
        drain_jobs(&host.runtime);

        match outcome {
            Ok(()) => {
                self.last_frame_error = None;
                Ok(())
            }
            Err(EntryFailure::Missing(what)) => {
                self.report_frame_error(format!("entry point {} is not defined", what));
                Err(ScriptError::MissingEntryPoint(what))
            }
            Err(EntryFailure::Thrown(message)) => {
                self.report_frame_error(format!("{}.{} threw: {}", entry, method, message));
                Err(ScriptError::Runtime(message))
            }
        }
    }

    /// 同一错误每帧重复出现时只记录一次
    fn report_frame_error(&mut self, message: String) {
        if self.last_frame_error.as_deref() != Some(message.as_str()) {
            tracing::error!(target: "script", "{}", message);
            self.last_frame_error = Some(message.clone());
        }
        self.last_error = Some(message);
    }

    // ========================================================================
    // 帧间维护
    // ========================================================================

    /// 帧间调用：处理热重载，然后排空延迟命令
    pub fn update(&mut self) {
        self.process_hot_reload();
        self.drain_commands();
    }

    fn drain_commands(&mut self) {
        for command in self.commands.drain() {
            match command {
                ScriptCommand::ExecuteCommand(source) => {
                    if let Err(err) = self.execute_script(&source) {
                        tracing::warn!(target: "script", "executeCommand failed: {}", err);
                    }
                }
                ScriptCommand::ExecuteFile(path) => {
                    if let Err(err) = self.execute_script_file(&path) {
                        tracing::warn!(target: "script", "executeFile failed: {}", err);
                    }
                }
                ScriptCommand::CollectGarbage => self.force_garbage_collection(),
            }
        }
    }

    pub fn force_garbage_collection(&mut self) {
        if let Some(host) = &self.host {
            host.runtime.run_gc();
            tracing::debug!(target: "script", "garbage collection forced");
        }
    }

    // ========================================================================
    // 热重载
    // ========================================================================

    /// 报告脚本文件变更（与文件监视线程走同一通道，经过去抖）
    pub fn notify_script_changed(&self, path: impl Into<PathBuf>) {
        self.hot_reload.notify_changed(path);
    }

    pub fn has_pending_reload(&self) -> bool {
        self.hot_reload.has_pending()
    }

    pub fn reload_stats(&self) -> &ReloadStats {
        self.hot_reload.stats()
    }

    fn process_hot_reload(&mut self) {
        let changed = self.hot_reload.poll_ready();
        if changed.is_empty() {
            return;
        }
        let Some(entry) = self.entry_module.clone() else {
            tracing::debug!(target: "script.hot_reload", "no entry module loaded, ignoring changes");
            return;
        };

        let affected: Vec<String> = {
            let mut loader = lock(&self.loader);
            let tracked = loader.tracked_modules();
            let affected: Vec<String> = changed
                .iter()
                .map(|path| loader.module_name_for_path(path))
                .filter(|name| *name == entry || tracked.contains(name))
                .collect();
            for name in &affected {
                loader.invalidate(name);
            }
            affected
        };

        if affected.is_empty() {
            tracing::debug!(target: "script.hot_reload", ?changed, "changes are outside the entry module graph");
            return;
        }

        tracing::info!(target: "script.hot_reload", modules = ?affected, "script change detected, reloading");
        if let Err(err) = self.reload_entry_module() {
            tracing::error!(target: "script.hot_reload", "hot reload failed, keeping previous scripts: {}", err);
        }
    }

    /// 在新上下文中重新执行入口模块，成功后才替换当前上下文
    ///
    /// 失败时旧上下文保持不变，之前加载的脚本继续运行。
    pub fn reload_entry_module(&mut self) -> ScriptResult<()> {
        let entry = self
            .entry_module
            .clone()
            .ok_or_else(|| ScriptError::Runtime("no entry module has been executed".to_string()))?;

        let outcome: ScriptResult<Context> = {
            let host = self.host.as_ref().ok_or(ScriptError::NotInitialized)?;
            self.create_context(&host.runtime).and_then(|shadow| {
                run_module(&shadow, &host.runtime, &self.loader, &entry)
                    .map(|()| shadow)
                    .map_err(ScriptError::from)
            })
        };

        match outcome {
            Ok(shadow) => {
                if let Some(host) = self.host.as_mut() {
                    host.context = shadow;
                    host.runtime.run_gc();
                }
                self.hot_reload.stats_mut().record_success();
                self.last_error = None;
                self.last_frame_error = None;
                tracing::info!(
                    target: "script.hot_reload",
                    module = %entry,
                    reloads = self.hot_reload.stats().reload_count,
                    "hot reload succeeded"
                );
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.hot_reload.stats_mut().record_failure(message.clone());
                self.record_error(&message);
                Err(err)
            }
        }
    }

    // ========================================================================
    // 结果与错误
    // ========================================================================

    /// 最近一次成功执行的结果（字符串形式）
    pub fn last_result(&self) -> &str {
        &self.last_result
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
        self.last_frame_error = None;
    }

    fn record_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
    }
}

/// 预解析依赖图后在给定上下文中求值模块
fn run_module(
    context: &Context,
    runtime: &Runtime,
    loader: &SharedModuleLoader,
    name: &str,
) -> ModuleResult<()> {
    let source = {
        let mut loader = lock(loader);
        loader.take_failure();
        loader.collect_graph(name)?;
        loader.source(name)?
    };

    // 链接失败在 eval 时同步抛出；顶层代码的异常只会让返回的 Promise 被拒绝
    let pending = context.with(|ctx| -> ModuleResult<Persistent<Promise<'static>>> {
        let declared = Module::declare(ctx.clone(), name, source).map_err(|err| {
            ModuleError::Compilation {
                module: name.to_string(),
                message: exception_message(&ctx, err),
            }
        })?;
        let (_module, promise) = declared.eval().map_err(|err| {
            let message = exception_message(&ctx, err);
            match lock(loader).take_failure() {
                Some(ModuleError::Compilation { module, .. }) => {
                    ModuleError::Compilation { module, message }
                }
                Some(recorded) => recorded,
                None => ModuleError::Link {
                    module: name.to_string(),
                    message,
                },
            }
        })?;
        Ok(Persistent::save(&ctx, promise))
    });

    drain_jobs(runtime);
    let pending = pending?;

    context.with(|ctx| {
        let evaluation = |message: String| ModuleError::Evaluation {
            module: name.to_string(),
            message,
        };
        let promise = pending
            .restore(&ctx)
            .map_err(|err| evaluation(err.to_string()))?;
        match promise.result::<Value>() {
            Some(Ok(_)) => Ok(()),
            Some(Err(err)) => Err(evaluation(exception_message(&ctx, err))),
            None => {
                tracing::warn!(target: "script.modules", module = name, "module evaluation still pending after draining jobs");
                Ok(())
            }
        }
    })
}

/// 只编译不执行，用于区分语法错误和运行期抛出的 SyntaxError
fn check_syntax(ctx: &Ctx<'_>, source: &str) -> Result<(), String> {
    let source = CString::new(source).map_err(|err| format!("SyntaxError: {}", err))?;
    // 与 `Ctx::eval` 的默认选项一致：全局代码、严格模式
    let flags =
        (qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_STRICT | qjs::JS_EVAL_FLAG_COMPILE_ONLY) as i32;
    let raw = ctx.as_raw().as_ptr();
    // SAFETY: 上下文在 `with` 闭包内有效，源码以 NUL 结尾，编译结果就地释放
    let failed = unsafe {
        let compiled = qjs::JS_Eval(
            raw,
            source.as_ptr(),
            source.as_bytes().len() as _,
            b"eval_script\0".as_ptr().cast(),
            flags,
        );
        let failed = qjs::JS_IsException(compiled);
        qjs::JS_FreeValue(raw, compiled);
        failed
    };
    if failed {
        Err(exception_message(ctx, rquickjs::Error::Exception))
    } else {
        Ok(())
    }
}

/// 执行挂起的 Promise 作业（必须在上下文锁之外调用）
fn drain_jobs(runtime: &Runtime) {
    let mut executed = 0;
    while executed < MAX_JOBS_PER_DRAIN && runtime.is_job_pending() {
        match runtime.execute_pending_job() {
            Ok(true) => executed += 1,
            Ok(false) => break,
            Err(_) => {
                tracing::warn!(target: "script", "a pending script job raised an exception");
                executed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ModuleErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn started(dir: &TempDir) -> ScriptSubsystem {
        let mut scripts = ScriptSubsystem::new(ScriptConfig::with_root(dir.path()));
        scripts.startup().unwrap();
        scripts
    }

    #[test]
    fn test_not_initialized() {
        let mut scripts = ScriptSubsystem::new(ScriptConfig::default());
        assert!(!scripts.is_initialized());
        assert!(matches!(
            scripts.execute_script("1"),
            Err(ScriptError::NotInitialized)
        ));
    }

    #[test]
    fn test_execute_script_records_result_and_error() {
        let dir = TempDir::new().unwrap();
        let mut scripts = started(&dir);

        let value = scripts.execute_script("[1, 2, 3].map(x => x * 2).join(',')").unwrap();
        assert_eq!(value, ScriptValue::from("2,4,6"));
        assert_eq!(scripts.last_result(), "2,4,6");
        assert!(!scripts.has_error());

        let err = scripts.execute_script("throw new Error('nope')").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
        assert!(scripts.last_error().unwrap().contains("nope"));

        let err = scripts.execute_script("let = ;").unwrap_err();
        assert!(matches!(err, ScriptError::Compilation(_)));

        // 运行期抛出的 SyntaxError 不算编译失败
        let err = scripts.execute_script("JSON.parse('x')").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(ref m) if m.starts_with("SyntaxError")));

        scripts.clear_error();
        assert!(!scripts.has_error());
    }

    #[test]
    fn test_module_error_categories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad_syntax.mjs"), "export const = 1;").unwrap();
        fs::write(dir.path().join("throws.mjs"), "throw new Error('top-level');").unwrap();
        fs::write(dir.path().join("missing_dep.mjs"), "import x from './gone.mjs';").unwrap();
        fs::write(dir.path().join("lib.mjs"), "export const present = 1;").unwrap();
        fs::write(dir.path().join("bad_import.mjs"), "import { absent } from './lib.mjs';").unwrap();
        let mut scripts = started(&dir);

        let kind = |result: ScriptResult<()>| match result {
            Err(ScriptError::Module(err)) => err.kind(),
            other => panic!("unexpected: {:?}", other),
        };

        assert_eq!(kind(scripts.execute_module("nope.mjs")), ModuleErrorKind::NotFound);
        assert_eq!(
            kind(scripts.execute_module("bad_syntax.mjs")),
            ModuleErrorKind::Compilation
        );
        assert_eq!(
            kind(scripts.execute_module("throws.mjs")),
            ModuleErrorKind::Evaluation
        );
        assert!(scripts.last_error().unwrap().contains("top-level"));
        assert_eq!(
            kind(scripts.execute_module("missing_dep.mjs")),
            ModuleErrorKind::Resolution
        );
        assert_eq!(
            kind(scripts.execute_module("bad_import.mjs")),
            ModuleErrorKind::Resolution
        );
        assert!(scripts.last_error().unwrap().contains("instantiation"));
    }

    #[test]
    fn test_entry_update_missing() {
        let dir = TempDir::new().unwrap();
        let mut scripts = started(&dir);
        assert!(!scripts.has_entry_point());
        assert!(matches!(
            scripts.call_entry_update(0.016, 0.016),
            Err(ScriptError::MissingEntryPoint(_))
        ));
    }

    #[test]
    fn test_shutdown_clears_registry() {
        let dir = TempDir::new().unwrap();
        let mut scripts = started(&dir);
        scripts.register_global_function("noop", |_args| ScriptValue::Null);
        assert!(!lock(&scripts.registry()).is_empty());

        scripts.shutdown();
        assert!(!scripts.is_initialized());
        assert!(lock(&scripts.registry()).is_empty());
    }
}
