//! 对象注册表与全局函数表
//!
//! 名称 → 可脚本化对象 / 原生函数。重复注册同名条目会覆盖旧条目；
//! 脚本调用时按名称精确匹配（区分大小写）。注册表只在帧线程上修改
//! （初始化、关闭、以及帧间的命令排空阶段）。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::core::utils::lock;

use super::method::ScriptMethodResult;
use super::object::{SharedScriptableObject, WeakScriptableObject};
use super::value::{ScriptArgs, ScriptValue};

/// 全局原生函数
pub type GlobalFunction = Arc<dyn Fn(&ScriptArgs) -> ScriptValue + Send + Sync>;

/// 脚本回调与子系统共享的注册表
pub type SharedRegistry = Arc<Mutex<ScriptRegistry>>;

/// 对象解析结果
pub enum ObjectLookup {
    Live(SharedScriptableObject),
    /// 条目仍在，但拥有者已经释放了对象
    Released,
    Missing,
}

/// 对象注册表 + 全局函数表
#[derive(Default, Clone)]
pub struct ScriptRegistry {
    objects: HashMap<String, WeakScriptableObject>,
    functions: HashMap<String, GlobalFunction>,
}

impl fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("objects", &self.object_names())
            .field("functions", &self.function_names())
            .finish()
    }
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册对象；返回是否覆盖了已有条目
    pub fn register_object(&mut self, name: &str, object: &SharedScriptableObject) -> bool {
        let replaced = self
            .objects
            .insert(name.to_string(), Arc::downgrade(object))
            .is_some();
        if replaced {
            tracing::debug!(target: "script.registry", name, "scriptable object replaced");
        }
        replaced
    }

    pub fn unregister_object(&mut self, name: &str) -> bool {
        self.objects.remove(name).is_some()
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// 按名称解析对象
    pub fn resolve_object(&self, name: &str) -> ObjectLookup {
        match self.objects.get(name) {
            Some(weak) => match weak.upgrade() {
                Some(object) => ObjectLookup::Live(object),
                None => ObjectLookup::Released,
            },
            None => ObjectLookup::Missing,
        }
    }

    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.objects.keys().cloned().collect();
        names.sort();
        names
    }

    /// 注册全局函数；返回是否覆盖了已有条目
    pub fn register_function(&mut self, name: &str, function: GlobalFunction) -> bool {
        self.functions.insert(name.to_string(), function).is_some()
    }

    pub fn unregister_function(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn function(&self, name: &str) -> Option<GlobalFunction> {
        self.functions.get(name).cloned()
    }

    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.functions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.functions.is_empty()
    }
}

// ============================================================================
// 调用路径（注册表锁只在解析时持有）
// ============================================================================

fn resolve(registry: &SharedRegistry, object: &str) -> Result<SharedScriptableObject, String> {
    match lock(registry).resolve_object(object) {
        ObjectLookup::Live(target) => Ok(target),
        ObjectLookup::Released => {
            tracing::error!(
                target: "script.registry",
                object,
                "scriptable object was released while still registered"
            );
            Err(format!("scriptable object '{}' is no longer available", object))
        }
        ObjectLookup::Missing => Err(format!("unknown object: {}", object)),
    }
}

/// 脚本调用 `<object>.<method>(...)` 的入口
pub fn call_object_method(
    registry: &SharedRegistry,
    object: &str,
    method: &str,
    args: &ScriptArgs,
) -> ScriptMethodResult {
    match resolve(registry, object) {
        Ok(target) => lock(&target).call_method(method, args),
        Err(message) => ScriptMethodResult::Error(message),
    }
}

pub fn get_object_property(registry: &SharedRegistry, object: &str, property: &str) -> ScriptValue {
    resolve(registry, object)
        .ok()
        .and_then(|target| lock(&target).get_property(property))
        .unwrap_or_default()
}

pub fn set_object_property(
    registry: &SharedRegistry,
    object: &str,
    property: &str,
    value: &ScriptValue,
) -> bool {
    match resolve(registry, object) {
        Ok(target) => lock(&target).set_property(property, value),
        Err(_) => false,
    }
}

/// 脚本调用全局函数的入口；函数已被注销时返回 `undefined`
pub fn call_global_function(registry: &SharedRegistry, name: &str, args: &ScriptArgs) -> ScriptValue {
    let function = lock(registry).function(name);
    match function {
        Some(function) => function(args),
        None => {
            tracing::warn!(target: "script.registry", name, "call to unregistered global function");
            ScriptValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script_args;
    use crate::scripting::method::ScriptMethodInfo;
    use crate::scripting::object::ScriptableObject;

    struct Named(&'static str);

    impl ScriptableObject for Named {
        fn available_methods(&self) -> Vec<ScriptMethodInfo> {
            vec![ScriptMethodInfo::new("name", "object name", &[], "string")]
        }

        fn available_properties(&self) -> Vec<String> {
            vec!["label".to_string()]
        }

        fn call_method(&mut self, name: &str, _args: &ScriptArgs) -> ScriptMethodResult {
            match name {
                "name" => ScriptMethodResult::success_with(self.0),
                _ => ScriptMethodResult::error(format!("unknown method: {}", name)),
            }
        }

        fn get_property(&self, name: &str) -> Option<ScriptValue> {
            (name == "label").then(|| ScriptValue::from(self.0))
        }

        fn set_property(&mut self, _name: &str, _value: &ScriptValue) -> bool {
            false
        }
    }

    fn shared_named(name: &'static str) -> SharedScriptableObject {
        Arc::new(Mutex::new(Named(name)))
    }

    #[test]
    fn test_register_overwrites() {
        let first = shared_named("first");
        let second = shared_named("second");
        let registry: SharedRegistry = Arc::new(Mutex::new(ScriptRegistry::new()));

        assert!(!lock(&registry).register_object("game", &first));
        assert!(lock(&registry).register_object("game", &second));

        let result = call_object_method(&registry, "game", "name", &script_args![]);
        assert_eq!(result, ScriptMethodResult::success_with("second"));
    }

    #[test]
    fn test_exact_name_match() {
        let object = shared_named("obj");
        let registry: SharedRegistry = Arc::new(Mutex::new(ScriptRegistry::new()));
        lock(&registry).register_object("game", &object);

        let result = call_object_method(&registry, "Game", "name", &script_args![]);
        assert_eq!(result.error_message(), Some("unknown object: Game"));
        assert_eq!(get_object_property(&registry, "game", "label"), ScriptValue::from("obj"));
        assert_eq!(get_object_property(&registry, "game", "Label"), ScriptValue::Null);
    }

    #[test]
    fn test_released_owner_is_reported() {
        let registry: SharedRegistry = Arc::new(Mutex::new(ScriptRegistry::new()));
        {
            let object = shared_named("temp");
            lock(&registry).register_object("temp", &object);
        }
        let result = call_object_method(&registry, "temp", "name", &script_args![]);
        assert!(result.error_message().unwrap().contains("no longer available"));
        assert!(!set_object_property(&registry, "temp", "label", &ScriptValue::Null));
    }

    #[test]
    fn test_global_functions() {
        let registry: SharedRegistry = Arc::new(Mutex::new(ScriptRegistry::new()));
        lock(&registry).register_function(
            "double",
            Arc::new(|args: &ScriptArgs| match args.first().and_then(ScriptValue::as_f64) {
                Some(v) => ScriptValue::Float(v * 2.0),
                None => ScriptValue::Null,
            }),
        );

        assert_eq!(
            call_global_function(&registry, "double", &script_args![4]),
            ScriptValue::Float(8.0)
        );
        assert!(lock(&registry).unregister_function("double"));
        assert_eq!(
            call_global_function(&registry, "double", &script_args![4]),
            ScriptValue::Null
        );
        assert!(lock(&registry).is_empty());
    }
}
