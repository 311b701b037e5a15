//! 渲染命令记录器
//!
//! 不接触 GPU：每帧把绘制请求记录为 [`RenderCommand`] 列表，
//! `end_frame` 时保存为上一帧的命令，供测试与调试覆盖层检查。

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use super::vertex::{Rgba8, Vertex};
use crate::config::WindowConfig;

/// 纹理句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// 相机（世界坐标 + 欧拉角，单位：度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    pub roll_degrees: f32,
    /// 屏幕空间相机使用正交范围，世界相机为 `None`
    pub ortho_bounds: Option<(Vec2, Vec2)>,
}

impl Camera {
    pub fn perspective(position: Vec3) -> Self {
        Self {
            position,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            roll_degrees: 0.0,
            ortho_bounds: None,
        }
    }

    pub fn screen(width: f32, height: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            roll_degrees: 0.0,
            ortho_bounds: Some((Vec2::ZERO, Vec2::new(width, height))),
        }
    }

    /// 前向向量（X 前、Y 左、Z 上）
    pub fn forward(&self) -> Vec3 {
        let yaw = self.yaw_degrees.to_radians();
        let pitch = self.pitch_degrees.to_radians();
        Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), -pitch.sin())
    }

    pub fn left(&self) -> Vec3 {
        let yaw = self.yaw_degrees.to_radians();
        Vec3::new(-yaw.sin(), yaw.cos(), 0.0)
    }
}

/// 一条记录的绘制命令
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    ClearScreen(Rgba8),
    BeginCamera(Camera),
    EndCamera,
    BindTexture(Option<TextureId>),
    DrawVertices { vertex_count: usize },
    DrawText { text: String, position: Vec2, color: Rgba8 },
}

/// 渲染器
#[derive(Debug, Default)]
pub struct Renderer {
    started: bool,
    in_frame: bool,
    camera_active: bool,
    commands: Vec<RenderCommand>,
    last_frame: Vec<RenderCommand>,
    draw_calls: usize,
    frames_rendered: u64,
    textures: HashMap<String, TextureId>,
    next_texture: u32,
    client_size: (u32, u32),
}

impl Renderer {
    pub fn new(window: &WindowConfig) -> Self {
        Self {
            client_size: (window.width, window.height),
            next_texture: 1,
            ..Self::default()
        }
    }

    pub fn startup(&mut self) {
        self.started = true;
        tracing::info!(
            target: "render",
            width = self.client_size.0,
            height = self.client_size.1,
            "renderer started"
        );
    }

    pub fn shutdown(&mut self) {
        self.textures.clear();
        self.commands.clear();
        self.started = false;
        tracing::info!(target: "render", frames = self.frames_rendered, "renderer shut down");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn begin_frame(&mut self) {
        self.commands.clear();
        self.draw_calls = 0;
        self.in_frame = true;
    }

    pub fn end_frame(&mut self) {
        if self.camera_active {
            tracing::warn!(target: "render", "end_frame with an active camera");
            self.camera_active = false;
        }
        self.in_frame = false;
        self.frames_rendered += 1;
        self.last_frame = std::mem::take(&mut self.commands);
    }

    pub fn clear_screen(&mut self, color: Rgba8) {
        self.record(RenderCommand::ClearScreen(color));
    }

    pub fn begin_camera(&mut self, camera: &Camera) {
        self.camera_active = true;
        self.record(RenderCommand::BeginCamera(*camera));
    }

    pub fn end_camera(&mut self) {
        self.camera_active = false;
        self.record(RenderCommand::EndCamera);
    }

    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.record(RenderCommand::BindTexture(texture));
    }

    pub fn draw_vertices(&mut self, vertices: &[Vertex]) {
        if vertices.is_empty() {
            return;
        }
        self.draw_calls += 1;
        self.record(RenderCommand::DrawVertices {
            vertex_count: vertices.len(),
        });
    }

    pub fn draw_text(&mut self, text: &str, position: Vec2, color: Rgba8) {
        self.draw_calls += 1;
        self.record(RenderCommand::DrawText {
            text: text.to_string(),
            position,
            color,
        });
    }

    fn record(&mut self, command: RenderCommand) {
        if !self.in_frame {
            tracing::trace!(target: "render", ?command, "draw outside of a frame ignored");
            return;
        }
        self.commands.push(command);
    }

    /// 按路径创建或复用纹理
    pub fn create_or_get_texture(&mut self, path: &str) -> TextureId {
        if let Some(id) = self.textures.get(path) {
            return *id;
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(path.to_string(), id);
        tracing::debug!(target: "render", path, id = id.0, "texture created");
        id
    }

    pub fn has_texture(&self, id: TextureId) -> bool {
        self.textures.values().any(|existing| *existing == id)
    }

    pub fn current_commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn last_frame_commands(&self) -> &[RenderCommand] {
        &self.last_frame
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn client_size(&self) -> (u32, u32) {
        self.client_size
    }
}
