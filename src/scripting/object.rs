//! 可脚本化对象协议
//!
//! 原生子系统实现 [`ScriptableObject`] 后即可以一个全局名称暴露给脚本。
//! 对象由构造它的原生子系统拥有，注册表只保存弱引用。

use std::sync::{Arc, Mutex, Weak};

use super::method::{ScriptMethodInfo, ScriptMethodResult};
use super::value::{ScriptArgs, ScriptValue};

/// 暴露给脚本的原生对象
pub trait ScriptableObject: Send {
    /// 方法描述列表，绑定安装时读取一次
    fn available_methods(&self) -> Vec<ScriptMethodInfo>;

    /// 属性名列表
    fn available_properties(&self) -> Vec<String>;

    /// 调用方法；名称区分大小写，未知名称返回 `"unknown method: <name>"`
    fn call_method(&mut self, name: &str, args: &ScriptArgs) -> ScriptMethodResult;

    /// 读取属性；未知属性返回 `None`
    fn get_property(&self, name: &str) -> Option<ScriptValue>;

    /// 写入属性；未知属性、只读属性或类型不符返回 `false`
    fn set_property(&mut self, name: &str, value: &ScriptValue) -> bool;
}

/// 拥有者持有的共享句柄
pub type SharedScriptableObject = Arc<Mutex<dyn ScriptableObject>>;

/// 注册表持有的非拥有句柄
pub type WeakScriptableObject = Weak<Mutex<dyn ScriptableObject>>;

/// 包装为共享句柄
pub fn share_object<T: ScriptableObject + 'static>(object: T) -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(object))
}
