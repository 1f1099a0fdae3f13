//! Render target that records filled triangles as vertices

use glam::{Affine2, Vec2};

use super::RenderTarget;
use super::vertex::Vertex;
use crate::RenderError;
use crate::geom::EarClipper;

/// Accumulates triangle-list vertices in world space
#[derive(Debug, Default)]
pub struct DisplayList {
    transform: Affine2,
    vertices: Vec<Vertex>,
    clipper: EarClipper,
    scratch: Vec<Vec2>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Raw vertex bytes, ready for a vertex buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}

impl RenderTarget for DisplayList {
    fn transform(&self) -> Affine2 {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: [f32; 4]) -> Result<(), RenderError> {
        if points.len() < 3 {
            return Err(RenderError::TooFewPoints(points.len()));
        }
        self.scratch.clear();
        self.scratch
            .extend(points.iter().map(|p| self.transform.transform_point2(*p)));
        for tri in self.clipper.triangulate(&self.scratch) {
            for &i in tri {
                self.vertices.push(Vertex::at(self.scratch[i], color));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_applies_transform() {
        let mut list = DisplayList::new();
        list.set_transform(Affine2::from_translation(Vec2::new(10.0, 0.0)));
        list.fill_polygon(&[Vec2::ZERO, Vec2::X, Vec2::Y], [1.0; 4]).unwrap();
        let xs: Vec<f32> = list.vertices().iter().map(|v| v.position[0]).collect();
        assert!(xs.iter().all(|x| *x >= 10.0));
    }

    #[test]
    fn test_too_few_points() {
        let mut list = DisplayList::new();
        let err = list.fill_polygon(&[Vec2::ZERO, Vec2::X], [1.0; 4]).unwrap_err();
        assert!(matches!(err, RenderError::TooFewPoints(2)));
        assert!(list.vertices().is_empty());
    }

    #[test]
    fn test_bytes_match_vertex_layout() {
        let mut list = DisplayList::new();
        list.fill_polygon(&[Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y], [0.5; 4]).unwrap();
        assert_eq!(list.as_bytes().len(), 6 * std::mem::size_of::<Vertex>());
        list.clear();
        assert!(list.as_bytes().is_empty());
    }
}
