//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    /// Buffer layout matching `VertexInput` in `shader.wgsl`
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Colors for game elements
pub mod colors {
    pub const WORLD_BORDER: [f32; 4] = [0.3, 0.3, 0.4, 1.0];
    pub const GRID: [f32; 4] = [0.12, 0.12, 0.18, 1.0];
    pub const ORB: [f32; 4] = [0.3, 0.9, 1.0, 1.0];
    pub const ORB_GLOW: [f32; 4] = [0.3, 0.9, 1.0, 0.25];
    pub const HAZARD: [f32; 4] = [1.0, 0.35, 0.2, 1.0];
    pub const HAZARD_CORE: [f32; 4] = [0.4, 0.05, 0.05, 1.0];
    pub const PLAYER: [f32; 4] = [0.2, 0.8, 0.4, 1.0];
    pub const PLAYER_EYE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    /// Shield ring while autopilot holds invulnerability
    pub const SHIELD: [f32; 4] = [0.6, 0.2, 0.8, 0.5];
    pub const BOOST_TRAIL: [f32; 4] = [1.0, 0.85, 0.3, 0.6]; // Gold/yellow
    pub const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
}
