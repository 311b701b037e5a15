//! 输入系统的脚本接口（全局名 `input`）

use std::sync::{Mutex, Weak};

use super::{vec2_value, CursorMode, InputSystem};
use crate::core::utils::lock;
use crate::scripting::extract::{extract_int, extract_string, string_from_value};
use crate::scripting::{
    dispatch, method_infos, ExtractionError, MethodError, ScriptArgs, ScriptMethod,
    ScriptMethodInfo, ScriptMethodResult, ScriptValue, ScriptableObject,
};

type MethodOutput = Result<Option<ScriptValue>, MethodError>;

pub struct InputScriptInterface {
    input: Weak<Mutex<InputSystem>>,
}

impl InputScriptInterface {
    pub fn new(input: Weak<Mutex<InputSystem>>) -> Self {
        Self { input }
    }

    fn with_input<R>(&self, f: impl FnOnce(&mut InputSystem) -> R) -> Result<R, MethodError> {
        let input = self
            .input
            .upgrade()
            .ok_or(MethodError::Unavailable("input system"))?;
        let mut input = lock(&input);
        Ok(f(&mut input))
    }

    fn is_key_down(&mut self, args: &ScriptArgs) -> MethodOutput {
        let key = key_code(args)?;
        self.with_input(|input| Some(input.is_key_down(key).into()))
    }

    fn was_key_just_pressed(&mut self, args: &ScriptArgs) -> MethodOutput {
        let key = key_code(args)?;
        self.with_input(|input| Some(input.was_key_just_pressed(key).into()))
    }

    fn was_key_just_released(&mut self, args: &ScriptArgs) -> MethodOutput {
        let key = key_code(args)?;
        self.with_input(|input| Some(input.was_key_just_released(key).into()))
    }

    fn get_cursor_client_delta(&mut self, _args: &ScriptArgs) -> MethodOutput {
        self.with_input(|input| Some(vec2_value(input.cursor_client_delta())))
    }

    fn get_cursor_client_position(&mut self, _args: &ScriptArgs) -> MethodOutput {
        self.with_input(|input| Some(vec2_value(input.cursor_client_position())))
    }

    fn set_cursor_mode(&mut self, args: &ScriptArgs) -> MethodOutput {
        let text = extract_string(args, 0)?;
        let mode = CursorMode::parse(&text)
            .ok_or_else(|| MethodError::Failed(format!("unknown cursor mode '{}'", text)))?;
        self.with_input(|input| input.set_cursor_mode(mode))?;
        Ok(None)
    }
}

fn key_code(args: &ScriptArgs) -> Result<u8, ExtractionError> {
    let code = extract_int(args, 0)?;
    u8::try_from(code).map_err(|_| ExtractionError::OutOfRange {
        position: "argument 0".to_string(),
        value: code as f64,
        expected: "key code (0-255)",
    })
}

const INPUT_METHODS: &[ScriptMethod<InputScriptInterface>] = &[
    ScriptMethod {
        info: ScriptMethodInfo::new("isKeyDown", "whether the key is held", &["int"], "bool"),
        handler: InputScriptInterface::is_key_down,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "wasKeyJustPressed",
            "whether the key went down this frame",
            &["int"],
            "bool",
        ),
        handler: InputScriptInterface::was_key_just_pressed,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "wasKeyJustReleased",
            "whether the key went up this frame",
            &["int"],
            "bool",
        ),
        handler: InputScriptInterface::was_key_just_released,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "getCursorClientDelta",
            "cursor movement this frame",
            &[],
            "object",
        ),
        handler: InputScriptInterface::get_cursor_client_delta,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "getCursorClientPosition",
            "cursor position in client coordinates",
            &[],
            "object",
        ),
        handler: InputScriptInterface::get_cursor_client_position,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "setCursorMode",
            "POINTER or FPS",
            &["string"],
            "void",
        ),
        handler: InputScriptInterface::set_cursor_mode,
    },
];

impl ScriptableObject for InputScriptInterface {
    fn available_methods(&self) -> Vec<ScriptMethodInfo> {
        method_infos(INPUT_METHODS)
    }

    fn available_properties(&self) -> Vec<String> {
        vec!["cursorMode".to_string()]
    }

    fn call_method(&mut self, name: &str, args: &ScriptArgs) -> ScriptMethodResult {
        dispatch(self, INPUT_METHODS, name, args)
    }

    fn get_property(&self, name: &str) -> Option<ScriptValue> {
        match name {
            "cursorMode" => self
                .with_input(|input| ScriptValue::from(input.cursor_mode().as_str()))
                .ok(),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: &ScriptValue) -> bool {
        if name != "cursorMode" {
            return false;
        }
        let Some(mode) = string_from_value(value, "cursorMode".to_string())
            .ok()
            .and_then(|text| CursorMode::parse(&text))
        else {
            return false;
        };
        self.with_input(|input| input.set_cursor_mode(mode)).is_ok()
    }
}
