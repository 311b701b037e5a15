//! 输入系统
//!
//! 按虚拟键码（`u8`）记录按键状态，`end_frame` 时把本帧状态滚动为上一帧，
//! 用于判断“刚按下/刚释放”。光标记录客户区坐标与本帧累计位移。

pub mod script_interface;

use glam::Vec2;

use crate::scripting::ScriptValue;

pub use script_interface::InputScriptInterface;

/// 常用虚拟键码
pub mod keys {
    pub const LEFT_MOUSE: u8 = 0x01;
    pub const RIGHT_MOUSE: u8 = 0x02;
    pub const SHIFT: u8 = 0x10;
    pub const ESC: u8 = 0x1B;
    pub const SPACE: u8 = 0x20;
    pub const LEFT_ARROW: u8 = 0x25;
    pub const UP_ARROW: u8 = 0x26;
    pub const RIGHT_ARROW: u8 = 0x27;
    pub const DOWN_ARROW: u8 = 0x28;
    pub const F1: u8 = 0x70;
    pub const TILDE: u8 = 0xC0;

    /// 字母与数字键使用其大写 ASCII 码
    pub const fn letter(c: char) -> u8 {
        c.to_ascii_uppercase() as u8
    }
}

/// 光标模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// 可见、自由移动
    #[default]
    Pointer,
    /// 隐藏并锁定在窗口中心，只报告位移
    Fps,
}

impl CursorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CursorMode::Pointer => "POINTER",
            CursorMode::Fps => "FPS",
        }
    }

    /// 解析脚本传入的模式：名称不区分大小写，也接受 `"0"`/`"1"`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "POINTER" | "0" => Some(CursorMode::Pointer),
            "FPS" | "1" => Some(CursorMode::Fps),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    is_down: bool,
    was_down: bool,
}

/// 输入系统
#[derive(Debug)]
pub struct InputSystem {
    keys: [KeyState; 256],
    cursor_position: Vec2,
    cursor_delta: Vec2,
    cursor_mode: CursorMode,
}

impl Default for InputSystem {
    fn default() -> Self {
        Self {
            keys: [KeyState::default(); 256],
            cursor_position: Vec2::ZERO,
            cursor_delta: Vec2::ZERO,
            cursor_mode: CursorMode::default(),
        }
    }
}

impl InputSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn startup(&mut self) {
        tracing::debug!(target: "input", "input system started");
    }

    pub fn shutdown(&mut self) {
        *self = Self::default();
    }

    pub fn begin_frame(&mut self) {}

    /// 滚动按键状态并清空本帧的光标位移
    pub fn end_frame(&mut self) {
        for key in self.keys.iter_mut() {
            key.was_down = key.is_down;
        }
        self.cursor_delta = Vec2::ZERO;
    }

    pub fn handle_key_pressed(&mut self, key: u8) {
        self.keys[key as usize].is_down = true;
    }

    pub fn handle_key_released(&mut self, key: u8) {
        self.keys[key as usize].is_down = false;
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keys[key as usize].is_down
    }

    pub fn was_key_just_pressed(&self, key: u8) -> bool {
        let state = self.keys[key as usize];
        state.is_down && !state.was_down
    }

    pub fn was_key_just_released(&self, key: u8) -> bool {
        let state = self.keys[key as usize];
        !state.is_down && state.was_down
    }

    /// 平台报告的新光标位置；FPS 模式下累计位移
    pub fn handle_cursor_moved(&mut self, position: Vec2) {
        if self.cursor_mode == CursorMode::Fps {
            self.cursor_delta += position - self.cursor_position;
        }
        self.cursor_position = position;
    }

    pub fn cursor_client_position(&self) -> Vec2 {
        self.cursor_position
    }

    pub fn cursor_client_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    pub fn set_cursor_mode(&mut self, mode: CursorMode) {
        if self.cursor_mode != mode {
            tracing::debug!(target: "input", mode = mode.as_str(), "cursor mode changed");
        }
        self.cursor_mode = mode;
        self.cursor_delta = Vec2::ZERO;
    }
}

/// `{x, y}` 脚本对象
pub fn vec2_value(v: Vec2) -> ScriptValue {
    ScriptValue::object([("x", ScriptValue::from(v.x)), ("y", ScriptValue::from(v.y))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_just_pressed_and_released() {
        let mut input = InputSystem::new();
        input.handle_key_pressed(keys::SPACE);
        assert!(input.is_key_down(keys::SPACE));
        assert!(input.was_key_just_pressed(keys::SPACE));

        input.end_frame();
        assert!(input.is_key_down(keys::SPACE));
        assert!(!input.was_key_just_pressed(keys::SPACE));

        input.handle_key_released(keys::SPACE);
        assert!(input.was_key_just_released(keys::SPACE));
        input.end_frame();
        assert!(!input.was_key_just_released(keys::SPACE));
    }

    #[test]
    fn test_cursor_delta_only_in_fps_mode() {
        let mut input = InputSystem::new();
        input.handle_cursor_moved(Vec2::new(10.0, 10.0));
        assert_eq!(input.cursor_client_delta(), Vec2::ZERO);

        input.set_cursor_mode(CursorMode::Fps);
        input.handle_cursor_moved(Vec2::new(13.0, 6.0));
        input.handle_cursor_moved(Vec2::new(14.0, 6.0));
        assert_eq!(input.cursor_client_delta(), Vec2::new(4.0, -4.0));
        assert_eq!(input.cursor_client_position(), Vec2::new(14.0, 6.0));

        input.end_frame();
        assert_eq!(input.cursor_client_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_cursor_mode_parsing() {
        assert_eq!(CursorMode::parse("fps"), Some(CursorMode::Fps));
        assert_eq!(CursorMode::parse("0"), Some(CursorMode::Pointer));
        assert_eq!(CursorMode::parse("hidden"), None);
        assert_eq!(keys::letter('w'), b'W');
    }
}
