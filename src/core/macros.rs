//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use protogame_js::impl_default;
///
/// struct Limits {
///     max_frames: u32,
///     label: String,
/// }
///
/// impl_default!(Limits {
///     max_frames: 0,
///     label: String::new(),
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 同时实现Default和new()的宏
#[macro_export]
macro_rules! impl_default_and_new {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

/// 构造脚本参数列表
///
/// ```rust
/// use protogame_js::script_args;
///
/// let args = script_args![1.0, 2, "three", true];
/// assert_eq!(args.len(), 4);
/// ```
#[macro_export]
macro_rules! script_args {
    () => {
        $crate::scripting::ScriptArgs::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::scripting::ScriptArgs::from(vec![$($crate::scripting::ScriptValue::from($value)),+])
    };
}

/// 不可恢复的配置缺陷：记录错误日志后终止
///
/// 只用于"程序员错误"，例如脚本子系统在绑定注册时仍未初始化。
#[macro_export]
macro_rules! fatal_error {
    ($($arg:tt)+) => {{
        let message = format!($($arg)+);
        tracing::error!(target: "app", fatal = true, "{}", message);
        panic!("fatal configuration defect: {}", message);
    }};
}

#[cfg(test)]
mod tests {
    use crate::scripting::ScriptValue;

    struct Counter {
        ticks: u32,
        label: String,
    }

    impl_default_and_new!(Counter {
        ticks: 0,
        label: String::from("frame"),
    });

    #[test]
    fn test_impl_default_and_new() {
        let a = Counter::default();
        let b = Counter::new();

        assert_eq!(a.ticks, 0);
        assert_eq!(a.label, "frame");
        assert_eq!(b.ticks, 0);
    }

    #[test]
    fn test_script_args_macro() {
        let args = script_args![1.5, 2, "x"];
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(2), Some(&ScriptValue::String("x".into())));
        assert!(script_args![].is_empty());
    }

    #[test]
    #[should_panic(expected = "fatal configuration defect")]
    fn test_fatal_error_panics() {
        fatal_error!("script subsystem missing for {}", "bindings");
    }
}
