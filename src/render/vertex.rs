//! 顶点与调试几何
//!
//! 只生成 CPU 端顶点列表，供渲染命令记录器计数与测试使用。

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// 8 位 RGBA 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
    pub const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);
    pub const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    pub const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);
    pub const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);
    pub const YELLOW: Rgba8 = Rgba8::new(255, 255, 0, 255);
    pub const CYAN: Rgba8 = Rgba8::new(0, 255, 255, 255);
    pub const MAGENTA: Rgba8 = Rgba8::new(255, 0, 255, 255);
    pub const GRAY: Rgba8 = Rgba8::new(127, 127, 127, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// 位置-颜色-纹理坐标顶点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Rgba8,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, color: Rgba8, uv: Vec2) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

fn push_quad(out: &mut Vec<Vertex>, corners: [Vec3; 4], color: Rgba8) {
    let uvs = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    for index in [0, 1, 2, 0, 2, 3] {
        out.push(Vertex::new(corners[index], color, uvs[index]));
    }
}

/// 以原点为中心、边长为 `size` 的立方体（6 面 × 2 三角形）
pub fn cube_vertices(size: f32, color: Rgba8) -> Vec<Vertex> {
    let h = size * 0.5;
    let p = |x: f32, y: f32, z: f32| Vec3::new(x * h, y * h, z * h);
    let mut out = Vec::with_capacity(36);
    push_quad(&mut out, [p(1., -1., -1.), p(1., 1., -1.), p(1., 1., 1.), p(1., -1., 1.)], color);
    push_quad(&mut out, [p(-1., 1., -1.), p(-1., -1., -1.), p(-1., -1., 1.), p(-1., 1., 1.)], color);
    push_quad(&mut out, [p(1., 1., -1.), p(-1., 1., -1.), p(-1., 1., 1.), p(1., 1., 1.)], color);
    push_quad(&mut out, [p(-1., -1., -1.), p(1., -1., -1.), p(1., -1., 1.), p(-1., -1., 1.)], color);
    push_quad(&mut out, [p(-1., -1., 1.), p(1., -1., 1.), p(1., 1., 1.), p(-1., 1., 1.)], color);
    push_quad(&mut out, [p(-1., 1., -1.), p(1., 1., -1.), p(1., -1., -1.), p(-1., -1., -1.)], color);
    out
}

/// 经纬球，`slices` 条经线、`stacks` 条纬线
pub fn sphere_vertices(radius: f32, slices: u32, stacks: u32, color: Rgba8) -> Vec<Vertex> {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let point = |slice: u32, stack: u32| {
        let yaw = std::f32::consts::TAU * slice as f32 / slices as f32;
        let pitch = std::f32::consts::PI * (stack as f32 / stacks as f32 - 0.5);
        Vec3::new(
            radius * pitch.cos() * yaw.cos(),
            radius * pitch.cos() * yaw.sin(),
            radius * pitch.sin(),
        )
    };

    let mut out = Vec::with_capacity((slices * stacks * 6) as usize);
    for stack in 0..stacks {
        for slice in 0..slices {
            push_quad(
                &mut out,
                [
                    point(slice, stack),
                    point(slice + 1, stack),
                    point(slice + 1, stack + 1),
                    point(slice, stack + 1),
                ],
                color,
            );
        }
    }
    out
}

/// XY 平面上的网格线，`half_extent` 为每侧的格数
pub fn grid_vertices(half_extent: i32, line_width: f32, color: Rgba8) -> Vec<Vertex> {
    let half = half_extent.max(1);
    let w = line_width * 0.5;
    let extent = half as f32;
    let mut out = Vec::new();
    for i in -half..=half {
        let c = i as f32;
        // 平行 X 轴
        push_quad(
            &mut out,
            [
                Vec3::new(-extent, c - w, 0.0),
                Vec3::new(extent, c - w, 0.0),
                Vec3::new(extent, c + w, 0.0),
                Vec3::new(-extent, c + w, 0.0),
            ],
            color,
        );
        // 平行 Y 轴
        push_quad(
            &mut out,
            [
                Vec3::new(c - w, -extent, 0.0),
                Vec3::new(c + w, -extent, 0.0),
                Vec3::new(c + w, extent, 0.0),
                Vec3::new(c - w, extent, 0.0),
            ],
            color,
        );
    }
    out
}

/// 平移并统一着色
pub fn transform_vertices(vertices: &mut [Vertex], offset: Vec3, tint: Rgba8) {
    for vertex in vertices {
        vertex.position += offset;
        vertex.color = tint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_counts() {
        assert_eq!(cube_vertices(1.0, Rgba8::WHITE).len(), 36);
        assert_eq!(sphere_vertices(0.5, 16, 8, Rgba8::WHITE).len(), 16 * 8 * 6);
        assert_eq!(grid_vertices(2, 0.05, Rgba8::GRAY).len(), 5 * 2 * 6);
    }

    #[test]
    fn test_cube_is_centered() {
        let vertices = cube_vertices(2.0, Rgba8::RED);
        let sum: Vec3 = vertices.iter().map(|v| v.position).sum();
        assert!(sum.length() < 1e-4);
        assert!(vertices.iter().all(|v| v.position.abs().max_element() <= 1.0 + 1e-6));
    }
}
