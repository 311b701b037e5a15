//! 平台抽象
//!
//! 目前只提供无头窗口：事件由外部注入，帧线程派发。

pub mod window;

pub use window::{PlatformEvent, Window, WindowEventSender, CLOSE_BUTTON_EVENT};
