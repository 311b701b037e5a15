//! 方法结果与方法描述
//!
//! `ScriptMethodResult` 是原生方法返回给桥接层的唯一形态。方法分发使用
//! 静态的 `ScriptMethod` 表（方法名 → 处理函数），参数个数在调用处理函数
//! 之前由描述符统一校验。

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

use super::extract::{check_arg_count, ExtractionError};
use super::value::{ScriptArgs, ScriptValue};

/// 原生方法的调用结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptMethodResult {
    /// 成功，可选携带返回值
    Success(Option<ScriptValue>),
    /// 失败，携带人类可读的错误信息
    Error(String),
}

impl ScriptMethodResult {
    pub fn success() -> Self {
        ScriptMethodResult::Success(None)
    }

    pub fn success_with(value: impl Into<ScriptValue>) -> Self {
        ScriptMethodResult::Success(Some(value.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScriptMethodResult::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScriptMethodResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScriptMethodResult::Error(_))
    }

    pub fn value(&self) -> Option<&ScriptValue> {
        match self {
            ScriptMethodResult::Success(value) => value.as_ref(),
            ScriptMethodResult::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ScriptMethodResult::Error(message) => Some(message),
            ScriptMethodResult::Success(_) => None,
        }
    }

    /// 转换为交给脚本的值
    ///
    /// - `Success(None)` → `undefined`
    /// - `Success(Some(v))` → `v`
    /// - `Error(msg)` → `{ error: msg }`
    pub fn into_script_value(self) -> ScriptValue {
        match self {
            ScriptMethodResult::Success(value) => value.unwrap_or_default(),
            ScriptMethodResult::Error(message) => {
                ScriptValue::object([("error", ScriptValue::String(message))])
            }
        }
    }
}

impl From<ExtractionError> for ScriptMethodResult {
    fn from(err: ExtractionError) -> Self {
        ScriptMethodResult::Error(err.to_string())
    }
}

/// 方法描述符（名称、说明、参数类型、返回类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptMethodInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub param_types: &'static [&'static str],
    pub return_type: &'static str,
}

impl ScriptMethodInfo {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        param_types: &'static [&'static str],
        return_type: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            param_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

/// 处理函数内部的失败
#[derive(Error, Debug)]
pub enum MethodError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{0} is no longer available")]
    Unavailable(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// 处理函数：成功时返回可选的结果值
pub type MethodHandler<T> = fn(&mut T, &ScriptArgs) -> Result<Option<ScriptValue>, MethodError>;

/// 分发表中的一项
pub struct ScriptMethod<T> {
    pub info: ScriptMethodInfo,
    pub handler: MethodHandler<T>,
}

/// 分发表的方法描述列表
pub fn method_infos<T>(table: &[ScriptMethod<T>]) -> Vec<ScriptMethodInfo> {
    table.iter().map(|method| method.info).collect()
}

/// 按名称分发调用
///
/// 未知方法返回 `"unknown method: <name>"`；参数个数不符时不会调用处理函数；
/// 处理函数中的 panic 在这里被捕获并转换为错误结果。
pub fn dispatch<T>(
    target: &mut T,
    table: &[ScriptMethod<T>],
    name: &str,
    args: &ScriptArgs,
) -> ScriptMethodResult {
    let Some(method) = table.iter().find(|method| method.info.name == name) else {
        return ScriptMethodResult::error(format!("unknown method: {}", name));
    };

    if let Err(err) = check_arg_count(args, method.info.arity(), name) {
        return err.into();
    }

    match catch_unwind(AssertUnwindSafe(|| (method.handler)(target, args))) {
        Ok(Ok(value)) => ScriptMethodResult::Success(value),
        Ok(Err(err)) => ScriptMethodResult::error(format!("{}: {}", name, err)),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(target: "script.bridge", method = name, "native method panicked: {}", message);
            ScriptMethodResult::error(format!("{} raised an internal error: {}", name, message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
