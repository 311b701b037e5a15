//! 场景道具

use glam::Vec3;

use crate::render::vertex::{cube_vertices, grid_vertices, sphere_vertices, transform_vertices};
use crate::render::{Renderer, Rgba8, TextureId, Vertex};

/// 道具形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropShape {
    Cube,
    Sphere,
    Grid,
}

/// 每帧自动行为
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropBehavior {
    None,
    /// 按角速度旋转（度/秒：yaw, pitch, roll）
    Spin(Vec3),
    /// 灰度随时间明暗变化
    Pulse,
}

/// 场景中的一个可绘制实体
#[derive(Debug, Clone)]
pub struct Prop {
    pub shape: PropShape,
    pub position: Vec3,
    /// 欧拉角（度）：yaw, pitch, roll
    pub orientation: Vec3,
    pub color: Rgba8,
    pub texture: Option<TextureId>,
    pub behavior: PropBehavior,
    local_vertices: Vec<Vertex>,
}

impl Prop {
    pub fn new(shape: PropShape, position: Vec3, color: Rgba8) -> Self {
        let local_vertices = match shape {
            PropShape::Cube => cube_vertices(1.0, Rgba8::WHITE),
            PropShape::Sphere => sphere_vertices(1.0, 32, 16, Rgba8::WHITE),
            PropShape::Grid => grid_vertices(50, 0.05, Rgba8::WHITE),
        };
        Self {
            shape,
            position,
            orientation: Vec3::ZERO,
            color,
            texture: None,
            behavior: PropBehavior::None,
            local_vertices,
        }
    }

    pub fn with_behavior(mut self, behavior: PropBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// `total_seconds` 为游戏时钟累计时间
    pub fn update(&mut self, delta_seconds: f32, total_seconds: f32) {
        match self.behavior {
            PropBehavior::None => {}
            PropBehavior::Spin(rate) => self.orientation += rate * delta_seconds,
            PropBehavior::Pulse => {
                let level = ((total_seconds.sin() + 1.0) * 0.5 * 255.0) as u8;
                self.color = Rgba8::new(level, level, level, 255);
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.local_vertices.len()
    }

    pub fn render(&self, renderer: &mut Renderer) {
        let mut vertices = self.local_vertices.clone();
        transform_vertices(&mut vertices, self.position, self.color);
        renderer.bind_texture(self.texture);
        renderer.draw_vertices(&vertices);
    }
}
