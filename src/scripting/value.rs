//! 脚本值模型
//!
//! 桥接层在原生代码与 JS 之间传递的动态值。转换到/自 JS 值的实现见
//! `scripting::marshal`。

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use glam::Vec3;

/// 动态脚本值
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// `undefined` 与 `null` 都映射到这里
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Object(BTreeMap<String, ScriptValue>),
}

impl ScriptValue {
    /// 用于诊断信息的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) | ScriptValue::Float(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    /// 数值（整数或浮点）转换为 f64；其他类型返回 None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(i) => Some(*i as f64),
            ScriptValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 取对象字段
    pub fn field(&self, key: &str) -> Option<&ScriptValue> {
        match self {
            ScriptValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// 从键值对构造对象
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ScriptValue)>,
    {
        ScriptValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "undefined"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::Float(v) => write!(f, "{}", v),
            ScriptValue::String(s) => write!(f, "{}", s),
            ScriptValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ScriptValue::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// From 转换
// ============================================================================

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Int(value as i64)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<u32> for ScriptValue {
    fn from(value: u32) -> Self {
        ScriptValue::Int(value as i64)
    }
}

impl From<u64> for ScriptValue {
    fn from(value: u64) -> Self {
        ScriptValue::Int(value as i64)
    }
}

impl From<usize> for ScriptValue {
    fn from(value: usize) -> Self {
        ScriptValue::Int(value as i64)
    }
}

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        ScriptValue::Float(value as f64)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<Vec3> for ScriptValue {
    fn from(value: Vec3) -> Self {
        ScriptValue::object([
            ("x", ScriptValue::from(value.x)),
            ("y", ScriptValue::from(value.y)),
            ("z", ScriptValue::from(value.z)),
        ])
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(values: Vec<T>) -> Self {
        ScriptValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ScriptValue>> From<Option<T>> for ScriptValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScriptValue::Null)
    }
}

// ============================================================================
// 参数列表
// ============================================================================

/// 脚本调用原生方法时传入的有序参数列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptArgs(Vec<ScriptValue>);

impl ScriptArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: impl Into<ScriptValue>) {
        self.0.push(value.into());
    }

    pub fn into_vec(self) -> Vec<ScriptValue> {
        self.0
    }
}

impl Deref for ScriptArgs {
    type Target = [ScriptValue];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<ScriptValue>> for ScriptArgs {
    fn from(values: Vec<ScriptValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<ScriptValue> for ScriptArgs {
    fn from_iter<I: IntoIterator<Item = ScriptValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ScriptArgs {
    /// 以空格连接，供 print/console.log 使用
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
