//! 渲染
//!
//! 帧命令记录器与调试几何生成。GPU 后端不在本 crate 范围内。

pub mod renderer;
pub mod vertex;

pub use renderer::{Camera, RenderCommand, Renderer, TextureId};
pub use vertex::{cube_vertices, grid_vertices, sphere_vertices, transform_vertices, Rgba8, Vertex};
