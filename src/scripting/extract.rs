//! 参数提取
//!
//! 将脚本传入的动态值转换为强类型原生值。数值类型接受任意脚本数值表示，
//! 但绝不做跨类型的隐式转换（字符串 "5" 不是数字，布尔也不是数字）。
//! 所有失败都以 [`ExtractionError`] 返回，由调用方转换为
//! `ScriptMethodResult::Error`，不会越过桥接边界。

use glam::Vec3;
use thiserror::Error;

use super::method::ScriptMethodResult;
use super::value::{ScriptArgs, ScriptValue};

/// 参数提取失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("{method} expects {expected} arguments, got {actual}")]
    ArgCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("missing argument {index}")]
    Missing { index: usize },

    #[error("{position}: expected {expected}, got {actual}")]
    TypeMismatch {
        position: String,
        expected: &'static str,
        actual: String,
    },

    #[error("{position}: {value} is out of range for {expected}")]
    OutOfRange {
        position: String,
        value: f64,
        expected: &'static str,
    },
}

/// 校验参数个数
///
/// 成功时返回 `Ok(())`；失败信息格式为
/// `"<method> expects <n> arguments, got <actual>"`。
pub fn check_arg_count(
    args: &ScriptArgs,
    expected: usize,
    method: &str,
) -> Result<(), ExtractionError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExtractionError::ArgCount {
            method: method.to_string(),
            expected,
            actual: args.len(),
        })
    }
}

/// [`check_arg_count`] 的结果版本，直接得到可返回给脚本的结果
pub fn validate_arg_count(args: &ScriptArgs, expected: usize, method: &str) -> ScriptMethodResult {
    match check_arg_count(args, expected, method) {
        Ok(()) => ScriptMethodResult::success(),
        Err(err) => err.into(),
    }
}

fn arg(args: &ScriptArgs, index: usize) -> Result<&ScriptValue, ExtractionError> {
    args.get(index).ok_or(ExtractionError::Missing { index })
}

fn position(index: usize) -> String {
    format!("argument {}", index)
}

fn mismatch(position: String, expected: &'static str, value: &ScriptValue) -> ExtractionError {
    let actual = match value {
        ScriptValue::String(s) => format!("string \"{}\"", s),
        other => other.type_name().to_string(),
    };
    ExtractionError::TypeMismatch {
        position,
        expected,
        actual,
    }
}

/// 值到 i32：浮点数必须是有限的整数值
pub fn int_from_value(value: &ScriptValue, position: String) -> Result<i32, ExtractionError> {
    match value {
        ScriptValue::Int(i) => i32::try_from(*i).map_err(|_| ExtractionError::OutOfRange {
            position,
            value: *i as f64,
            expected: "int",
        }),
        ScriptValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            if *f >= i32::MIN as f64 && *f <= i32::MAX as f64 {
                Ok(*f as i32)
            } else {
                Err(ExtractionError::OutOfRange {
                    position,
                    value: *f,
                    expected: "int",
                })
            }
        }
        other => Err(mismatch(position, "int", other)),
    }
}

/// 值到 f32：接受整数与有限浮点
pub fn float_from_value(value: &ScriptValue, position: String) -> Result<f32, ExtractionError> {
    match value {
        ScriptValue::Int(i) => Ok(*i as f32),
        ScriptValue::Float(f) if f.is_finite() => Ok(*f as f32),
        other => Err(mismatch(position, "float", other)),
    }
}

pub fn string_from_value(value: &ScriptValue, position: String) -> Result<String, ExtractionError> {
    match value {
        ScriptValue::String(s) => Ok(s.clone()),
        other => Err(mismatch(position, "string", other)),
    }
}

pub fn bool_from_value(value: &ScriptValue, position: String) -> Result<bool, ExtractionError> {
    match value {
        ScriptValue::Bool(b) => Ok(*b),
        other => Err(mismatch(position, "bool", other)),
    }
}

pub fn extract_int(args: &ScriptArgs, index: usize) -> Result<i32, ExtractionError> {
    int_from_value(arg(args, index)?, position(index))
}

pub fn extract_float(args: &ScriptArgs, index: usize) -> Result<f32, ExtractionError> {
    float_from_value(arg(args, index)?, position(index))
}

pub fn extract_string(args: &ScriptArgs, index: usize) -> Result<String, ExtractionError> {
    string_from_value(arg(args, index)?, position(index))
}

pub fn extract_bool(args: &ScriptArgs, index: usize) -> Result<bool, ExtractionError> {
    bool_from_value(arg(args, index)?, position(index))
}

/// 从 `start` 开始连续读取三个浮点数
pub fn extract_vec3(args: &ScriptArgs, start: usize) -> Result<Vec3, ExtractionError> {
    Ok(Vec3::new(
        extract_float(args, start)?,
        extract_float(args, start + 1)?,
        extract_float(args, start + 2)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script_args;
    use proptest::prelude::*;

    #[test]
    fn test_arg_count_message() {
        let args = script_args![1.0, 2.0];
        let err = check_arg_count(&args, 3, "createCube").unwrap_err();
        assert_eq!(err.to_string(), "createCube expects 3 arguments, got 2");

        let result = validate_arg_count(&args, 3, "createCube");
        assert_eq!(
            result.error_message(),
            Some("createCube expects 3 arguments, got 2")
        );
        assert!(validate_arg_count(&args, 2, "createCube").is_success());
    }

    #[test]
    fn test_extract_int_accepts_integral_numbers() {
        let args = script_args![7, 3.0, -2];
        assert_eq!(extract_int(&args, 0), Ok(7));
        assert_eq!(extract_int(&args, 1), Ok(3));
        assert_eq!(extract_int(&args, 2), Ok(-2));
    }

    #[test]
    fn test_extract_int_rejects_ambiguous_values() {
        let args = script_args![2.5, "5", true, f64::NAN, 1e12];
        assert!(matches!(
            extract_int(&args, 0),
            Err(ExtractionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            extract_int(&args, 1),
            Err(ExtractionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            extract_int(&args, 2),
            Err(ExtractionError::TypeMismatch { .. })
        ));
        assert!(extract_int(&args, 3).is_err());
        assert!(matches!(
            extract_int(&args, 4),
            Err(ExtractionError::OutOfRange { .. })
        ));
        assert_eq!(extract_int(&args, 9), Err(ExtractionError::Missing { index: 9 }));
    }

    #[test]
    fn test_extract_float_and_string() {
        let args = script_args![1, 2.5, "hello", "3.0"];
        assert_eq!(extract_float(&args, 0), Ok(1.0));
        assert_eq!(extract_float(&args, 1), Ok(2.5));
        assert_eq!(extract_string(&args, 2), Ok("hello".to_string()));
        let err = extract_float(&args, 3).unwrap_err();
        assert!(err.to_string().contains("expected float"));
        assert!(extract_string(&args, 0).is_err());
    }

    #[test]
    fn test_extract_vec3() {
        let args = script_args![0, 1.0, 2.0, 3.0];
        assert_eq!(extract_vec3(&args, 1), Ok(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            extract_vec3(&args, 2),
            Err(ExtractionError::Missing { index: 4 })
        );
    }

    #[test]
    fn test_extract_bool() {
        let args = script_args![true, 1];
        assert_eq!(extract_bool(&args, 0), Ok(true));
        assert!(extract_bool(&args, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_finite_float_is_accepted(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
            let args = script_args![ScriptValue::Float(x)];
            prop_assert_eq!(extract_float(&args, 0), Ok(x as f32));
        }

        #[test]
        fn prop_string_is_never_a_number(text in ".*") {
            let args = script_args![text];
            prop_assert!(extract_float(&args, 0).is_err());
            prop_assert!(extract_int(&args, 0).is_err());
        }

        #[test]
        fn prop_i32_survives_int_and_float_forms(n in any::<i32>()) {
            let args = script_args![n, n as f64];
            prop_assert_eq!(extract_int(&args, 0), Ok(n));
            prop_assert_eq!(extract_int(&args, 1), Ok(n));
        }

        #[test]
        fn prop_int_outside_i32_is_out_of_range(n in any::<i64>().prop_filter("outside i32", |n| i32::try_from(*n).is_err())) {
            let args = script_args![n];
            let is_out_of_range = matches!(extract_int(&args, 0), Err(ExtractionError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }
    }
}
