//! 无头窗口
//!
//! 保存标题、客户区尺寸与焦点状态；平台事件通过 [`WindowEventSender`]
//! 注入（任意线程），在 `begin_frame` 中于帧线程上派发给输入系统与事件系统。

use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec2;

use crate::config::WindowConfig;
use crate::core::events::{EventArgs, EventSystem};
use crate::input::InputSystem;

/// 关闭按钮事件名
pub const CLOSE_BUTTON_EVENT: &str = "OnCloseButtonClicked";

/// 平台事件
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    KeyDown(u8),
    KeyUp(u8),
    CursorMoved(Vec2),
    FocusChanged(bool),
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// 事件注入端
#[derive(Debug, Clone)]
pub struct WindowEventSender {
    tx: Sender<PlatformEvent>,
}

impl WindowEventSender {
    pub fn send(&self, event: PlatformEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn key_down(&self, key: u8) -> bool {
        self.send(PlatformEvent::KeyDown(key))
    }

    pub fn key_up(&self, key: u8) -> bool {
        self.send(PlatformEvent::KeyUp(key))
    }

    pub fn request_close(&self) -> bool {
        self.send(PlatformEvent::CloseRequested)
    }
}

/// 窗口
#[derive(Debug)]
pub struct Window {
    title: String,
    client_size: (u32, u32),
    fullscreen: bool,
    focused: bool,
    tx: Sender<PlatformEvent>,
    rx: Receiver<PlatformEvent>,
    events_processed: u64,
}

impl Window {
    pub fn new(config: &WindowConfig) -> Self {
        let (tx, rx) = unbounded();
        Self {
            title: config.title.clone(),
            client_size: (config.width, config.height),
            fullscreen: config.fullscreen,
            focused: true,
            tx,
            rx,
            events_processed: 0,
        }
    }

    pub fn startup(&mut self) {
        tracing::info!(
            target: "window",
            title = %self.title,
            width = self.client_size.0,
            height = self.client_size.1,
            fullscreen = self.fullscreen,
            "window created"
        );
    }

    pub fn shutdown(&mut self) {
        while self.rx.try_recv().is_ok() {}
        tracing::info!(target: "window", "window closed");
    }

    pub fn event_sender(&self) -> WindowEventSender {
        WindowEventSender {
            tx: self.tx.clone(),
        }
    }

    /// 派发积压的平台事件
    pub fn begin_frame(&mut self, input: &mut InputSystem, events: &mut EventSystem) {
        while let Ok(event) = self.rx.try_recv() {
            self.events_processed += 1;
            match event {
                PlatformEvent::KeyDown(key) => input.handle_key_pressed(key),
                PlatformEvent::KeyUp(key) => input.handle_key_released(key),
                PlatformEvent::CursorMoved(position) => input.handle_cursor_moved(position),
                PlatformEvent::FocusChanged(focused) => self.focused = focused,
                PlatformEvent::Resized { width, height } => {
                    self.client_size = (width.max(1), height.max(1));
                }
                PlatformEvent::CloseRequested => {
                    tracing::info!(target: "window", "close button clicked");
                    events.fire(CLOSE_BUTTON_EVENT, &EventArgs::new());
                }
            }
        }
    }

    pub fn end_frame(&mut self) {}

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn client_size(&self) -> (u32, u32) {
        self.client_size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.client_size.0 as f32 / self.client_size.1.max(1) as f32
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keys;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_events_are_dispatched_on_begin_frame() {
        let mut window = Window::new(&WindowConfig::default());
        let mut input = InputSystem::new();
        let mut events = EventSystem::new();
        let closed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&closed);
        events.subscribe(CLOSE_BUTTON_EVENT, move |_| {
            flag.store(true, Ordering::SeqCst);
            true
        });

        let sender = window.event_sender();
        sender.key_down(keys::ESC);
        sender.send(PlatformEvent::Resized {
            width: 800,
            height: 0,
        });
        sender.request_close();
        assert!(!input.is_key_down(keys::ESC));

        window.begin_frame(&mut input, &mut events);
        assert!(input.is_key_down(keys::ESC));
        assert_eq!(window.client_size(), (800, 1));
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(window.events_processed(), 3);
    }
}
