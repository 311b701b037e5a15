//! 开发者控制台
//!
//! 有界的彩色文本行缓冲。日志的屏幕输出层与脚本 `print` 都写入这里，
//! 控制台打开时由渲染阶段绘制最近的若干行。

use std::collections::VecDeque;

use glam::Vec2;

use crate::render::{Renderer, Rgba8};

/// 行的来源，决定颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    Warning,
    Error,
    Script,
}

impl LineKind {
    pub fn color(self) -> Rgba8 {
        match self {
            LineKind::Info => Rgba8::WHITE,
            LineKind::Warning => Rgba8::YELLOW,
            LineKind::Error => Rgba8::RED,
            LineKind::Script => Rgba8::CYAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub kind: LineKind,
    pub text: String,
}

/// 开发者控制台
#[derive(Debug)]
pub struct DevConsole {
    lines: VecDeque<ConsoleLine>,
    capacity: usize,
    open: bool,
    visible_lines: usize,
    line_height: f32,
}

impl DevConsole {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            open: false,
            visible_lines: 30,
            line_height: 20.0,
        }
    }

    /// 追加一行；多行文本按行拆分，超过容量时丢弃最旧的行
    pub fn add_line(&mut self, kind: LineKind, text: &str) {
        for line in text.lines() {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(ConsoleLine {
                kind,
                text: line.to_string(),
            });
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &ConsoleLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn begin_frame(&mut self) {}

    pub fn end_frame(&mut self) {}

    /// 在屏幕空间绘制最近的行（最新的在最下方）
    pub fn render(&self, renderer: &mut Renderer) {
        if !self.open {
            return;
        }
        let start = self.lines.len().saturating_sub(self.visible_lines);
        for (row, line) in self.lines.iter().skip(start).enumerate() {
            let y = (self.visible_lines - row) as f32 * self.line_height;
            renderer.draw_text(&line.text, Vec2::new(4.0, y), line.kind.color());
        }
    }
}
