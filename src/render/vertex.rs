//! Vertex type produced by display lists

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// 2D vertex with position and color, laid out for direct GPU upload
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn at(point: Vec2, color: [f32; 4]) -> Self {
        Self::new(point.x, point.y, color)
    }

    pub fn point(&self) -> Vec2 {
        Vec2::from(self.position)
    }
}

/// Debug colors for physics bodies
pub mod colors {
    pub const STATIC: [f32; 4] = [0.3, 0.3, 0.4, 1.0];
    pub const KINEMATIC: [f32; 4] = [0.4, 0.7, 1.0, 1.0];
    pub const DYNAMIC: [f32; 4] = [0.2, 0.8, 0.4, 1.0];
    pub const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
}
