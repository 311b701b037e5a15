//! JS 值与 `ScriptValue` 的互转，以及把注册表内容安装到脚本上下文
//!
//! 每个注册对象在脚本中表现为同名全局对象：方法是转发到注册表的函数，
//! 属性是 getter/setter 访问器。调用时按名称在注册表中重新解析，
//! 因此注销后的对象会得到 `unknown object` 错误而不是悬空访问。

use rquickjs::function::Rest;
use rquickjs::{Array, Ctx, FromJs, Function, IntoJs, Object, Type, Undefined, Value};

use crate::core::utils::lock;

use super::registry::{
    call_global_function, call_object_method, get_object_property, set_object_property,
    ObjectLookup, SharedRegistry,
};
use super::value::{ScriptArgs, ScriptValue};

/// 转换嵌套对象的最大深度，防止循环引用
const MAX_DEPTH: usize = 16;

const DEFINE_ACCESSOR: &str = "(function (target, name, get, set) {\n\
    Object.defineProperty(target, name, { get: get, set: set, enumerable: true, configurable: true });\n\
})";

// ============================================================================
// 值转换
// ============================================================================

fn from_value(value: &Value<'_>, depth: usize) -> ScriptValue {
    if depth > MAX_DEPTH {
        return ScriptValue::Null;
    }

    match value.type_of() {
        Type::Bool => ScriptValue::Bool(value.as_bool().unwrap_or_default()),
        Type::Int => ScriptValue::Int(value.as_int().unwrap_or_default() as i64),
        Type::Float => ScriptValue::Float(value.as_float().unwrap_or_default()),
        Type::String => ScriptValue::String(
            value
                .as_string()
                .and_then(|s| s.to_string().ok())
                .unwrap_or_default(),
        ),
        Type::Array => match value.as_array() {
            Some(array) => ScriptValue::Array(
                array
                    .iter::<Value>()
                    .filter_map(Result::ok)
                    .map(|item| from_value(&item, depth + 1))
                    .collect(),
            ),
            None => ScriptValue::Null,
        },
        _ if value.is_function() => ScriptValue::Null,
        _ => match value.as_object() {
            Some(object) => ScriptValue::Object(
                object
                    .props::<String, Value>()
                    .filter_map(Result::ok)
                    .map(|(key, item)| (key, from_value(&item, depth + 1)))
                    .collect(),
            ),
            None => ScriptValue::Null,
        },
    }
}

impl<'js> FromJs<'js> for ScriptValue {
    fn from_js(_ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        Ok(from_value(&value, 0))
    }
}

impl<'js> IntoJs<'js> for ScriptValue {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        match self {
            ScriptValue::Null => Undefined.into_js(ctx),
            ScriptValue::Bool(b) => b.into_js(ctx),
            ScriptValue::Int(i) => match i32::try_from(i) {
                Ok(small) => small.into_js(ctx),
                Err(_) => (i as f64).into_js(ctx),
            },
            ScriptValue::Float(f) => f.into_js(ctx),
            ScriptValue::String(s) => s.into_js(ctx),
            ScriptValue::Array(items) => {
                let array = Array::new(ctx.clone())?;
                for (index, item) in items.into_iter().enumerate() {
                    array.set(index, item)?;
                }
                Ok(array.into_value())
            }
            ScriptValue::Object(map) => {
                let object = Object::new(ctx.clone())?;
                for (key, item) in map {
                    object.set(key, item)?;
                }
                Ok(object.into_value())
            }
        }
    }
}

/// 取出挂起的异常并格式化为 "消息\n调用栈"
pub(crate) fn exception_message(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }

    let thrown = ctx.catch();
    if let Some(exception) = thrown.as_exception() {
        let name = thrown
            .as_object()
            .and_then(|object| object.get::<_, String>("name").ok())
            .unwrap_or_else(|| "Error".to_string());
        let headline = format!("{}: {}", name, exception.message().unwrap_or_default());
        return match exception.stack() {
            Some(stack) if !stack.trim().is_empty() => format!("{}\n{}", headline, stack.trim_end()),
            _ => headline,
        };
    }
    match from_value(&thrown, 0) {
        ScriptValue::Null => "uncaught exception".to_string(),
        other => format!("uncaught exception: {}", other),
    }
}

// ============================================================================
// console
// ============================================================================

#[derive(Clone, Copy)]
enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
}

fn console_function<'js>(ctx: &Ctx<'js>, level: ConsoleLevel) -> rquickjs::Result<Function<'js>> {
    Function::new(ctx.clone(), move |args: Rest<ScriptValue>| {
        let line = ScriptArgs::from(args.0).to_string();
        match level {
            ConsoleLevel::Debug => tracing::debug!(target: "script.console", "{}", line),
            ConsoleLevel::Info => tracing::info!(target: "script.console", "{}", line),
            ConsoleLevel::Warn => tracing::warn!(target: "script.console", "{}", line),
            ConsoleLevel::Error => tracing::error!(target: "script.console", "{}", line),
        }
    })
}

/// 安装 `console.log/info/warn/error/debug`，输出到 tracing
pub(crate) fn install_console(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    console.set("log", console_function(ctx, ConsoleLevel::Info)?)?;
    console.set("info", console_function(ctx, ConsoleLevel::Info)?)?;
    console.set("debug", console_function(ctx, ConsoleLevel::Debug)?)?;
    console.set("warn", console_function(ctx, ConsoleLevel::Warn)?)?;
    console.set("error", console_function(ctx, ConsoleLevel::Error)?)?;
    ctx.globals().set("console", console)?;
    Ok(())
}

// ============================================================================
// 注册表绑定
// ============================================================================

/// 把一个全局函数安装为同名脚本全局
pub(crate) fn install_global_function(
    ctx: &Ctx<'_>,
    registry: &SharedRegistry,
    name: &str,
) -> rquickjs::Result<()> {
    let registry = SharedRegistry::clone(registry);
    let function_name = name.to_string();
    let function = Function::new(ctx.clone(), move |args: Rest<ScriptValue>| -> ScriptValue {
        call_global_function(&registry, &function_name, &ScriptArgs::from(args.0))
    })?;
    ctx.globals().set(name, function)?;
    Ok(())
}

/// 把一个注册对象安装为同名脚本全局对象
pub(crate) fn install_object(
    ctx: &Ctx<'_>,
    registry: &SharedRegistry,
    name: &str,
) -> rquickjs::Result<()> {
    let (methods, properties) = {
        let target = lock(registry).resolve_object(name);
        match target {
            ObjectLookup::Live(object) => {
                let object = lock(&object);
                (object.available_methods(), object.available_properties())
            }
            _ => {
                tracing::warn!(target: "script.bridge", object = name, "cannot bind unavailable object");
                return Ok(());
            }
        }
    };

    let target = Object::new(ctx.clone())?;

    for method in methods {
        let registry = SharedRegistry::clone(registry);
        let object_name = name.to_string();
        let method_name = method.name.to_string();
        let function = Function::new(ctx.clone(), move |args: Rest<ScriptValue>| -> ScriptValue {
            let result =
                call_object_method(&registry, &object_name, &method_name, &ScriptArgs::from(args.0));
            if let Some(message) = result.error_message() {
                tracing::warn!(
                    target: "script.bridge",
                    object = %object_name,
                    method = %method_name,
                    "{}",
                    message
                );
            }
            result.into_script_value()
        })?;
        target.set(method.name, function)?;
    }

    if !properties.is_empty() {
        let define: Function = ctx.eval(DEFINE_ACCESSOR)?;
        for property in properties {
            let getter = {
                let registry = SharedRegistry::clone(registry);
                let object_name = name.to_string();
                let property_name = property.clone();
                Function::new(ctx.clone(), move || -> ScriptValue {
                    get_object_property(&registry, &object_name, &property_name)
                })?
            };
            let setter = {
                let registry = SharedRegistry::clone(registry);
                let object_name = name.to_string();
                let property_name = property.clone();
                Function::new(ctx.clone(), move |value: ScriptValue| {
                    if !set_object_property(&registry, &object_name, &property_name, &value) {
                        tracing::warn!(
                            target: "script.bridge",
                            object = %object_name,
                            property = %property_name,
                            value = %value,
                            "property assignment rejected"
                        );
                    }
                })?
            };
            define.call::<_, ()>((target.clone(), property.as_str(), getter, setter))?;
        }
    }

    ctx.globals().set(name, target)?;
    Ok(())
}

/// 删除脚本全局
pub(crate) fn remove_global(ctx: &Ctx<'_>, name: &str) -> rquickjs::Result<()> {
    ctx.globals().remove(name)
}

/// 安装 console（可选）以及注册表中的全部对象与函数
pub(crate) fn install_registry(
    ctx: &Ctx<'_>,
    registry: &SharedRegistry,
    console: bool,
) -> rquickjs::Result<()> {
    if console {
        install_console(ctx)?;
    }
    let (functions, objects) = {
        let registry = lock(registry);
        (registry.function_names(), registry.object_names())
    };
    for name in &functions {
        install_global_function(ctx, registry, name)?;
    }
    for name in &objects {
        install_object(ctx, registry, name)?;
    }
    tracing::debug!(
        target: "script.bridge",
        functions = functions.len(),
        objects = objects.len(),
        "bridge installed into context"
    );
    Ok(())
}
