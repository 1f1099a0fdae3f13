//! Rendering contract
//!
//! The simulation never draws directly. Actors and debug views draw through
//! [`RenderTarget`], and every local transform they set is undone by a
//! [`ScopedTransform`] guard when the guard goes out of scope.

pub mod display_list;
pub mod vertex;

use glam::{Affine2, Vec2};

use crate::RenderError;
use crate::geom::Shape;
use crate::physics::{BodyHandle, BodyKind, PhysicsEngine};

pub use display_list::DisplayList;
pub use vertex::{Vertex, colors};

/// Segments used when a circle has to be drawn as a polygon
pub const CIRCLE_SEGMENTS: u32 = 16;

/// Something that can fill polygons under a current transform
pub trait RenderTarget {
    fn transform(&self) -> Affine2;
    fn set_transform(&mut self, transform: Affine2);

    /// Fill a simple polygon given in the current local coordinates
    fn fill_polygon(&mut self, points: &[Vec2], color: [f32; 4]) -> Result<(), RenderError>;
}

/// Applies a local transform on construction and restores the previous one
/// on drop, including when the draw call in between fails
pub struct ScopedTransform<'a> {
    target: &'a mut dyn RenderTarget,
    previous: Affine2,
}

impl<'a> ScopedTransform<'a> {
    /// Concatenate `local` onto the target's current transform
    pub fn push(target: &'a mut dyn RenderTarget, local: Affine2) -> Self {
        let previous = target.transform();
        target.set_transform(previous * local);
        Self { target, previous }
    }

    pub fn target(&mut self) -> &mut dyn RenderTarget {
        &mut *self.target
    }
}

impl Drop for ScopedTransform<'_> {
    fn drop(&mut self) {
        self.target.set_transform(self.previous);
    }
}

/// Polygon outline approximating a circle, counter-clockwise
pub fn circle_points(center: Vec2, radius: f32, segments: u32) -> Vec<Vec2> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let theta = (i as f32 / segments as f32) * std::f32::consts::TAU;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

pub fn body_color(kind: BodyKind) -> [f32; 4] {
    match kind {
        BodyKind::Static => colors::STATIC,
        BodyKind::Kinematic => colors::KINEMATIC,
        BodyKind::Dynamic => colors::DYNAMIC,
    }
}

/// Fill every non-sensor fixture of `body` at its current pose.
/// Chains have no area and are skipped. Unknown bodies draw nothing.
pub fn draw_body(
    physics: &dyn PhysicsEngine,
    body: BodyHandle,
    target: &mut dyn RenderTarget,
    color: [f32; 4],
) -> Result<(), RenderError> {
    let (Some(pose), Some(fixtures)) = (physics.body_transform(body), physics.body_fixtures(body)) else {
        return Ok(());
    };
    let mut scope = ScopedTransform::push(target, Affine2::from_angle_translation(pose.angle, pose.position));
    for fixture in fixtures.iter().filter(|f| !f.sensor) {
        match &fixture.shape.shape {
            Shape::Polygon { vertices } => scope.target().fill_polygon(vertices, color)?,
            Shape::Circle { center, radius } => {
                let outline = circle_points(*center, *radius, CIRCLE_SEGMENTS);
                scope.target().fill_polygon(&outline, color)?
            }
            Shape::Chain { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::ShapeDescriptor;
    use crate::physics::{BodyDef, FixtureDef, SimplePhysics};

    /// Target that fails every fill
    struct Broken {
        transform: Affine2,
    }

    impl RenderTarget for Broken {
        fn transform(&self) -> Affine2 {
            self.transform
        }

        fn set_transform(&mut self, transform: Affine2) {
            self.transform = transform;
        }

        fn fill_polygon(&mut self, _points: &[Vec2], _color: [f32; 4]) -> Result<(), RenderError> {
            Err(RenderError::Backend("lost device".into()))
        }
    }

    #[test]
    fn test_scope_restores_transform_on_error() {
        let base = Affine2::from_translation(Vec2::new(3.0, 4.0));
        let mut target = Broken { transform: base };
        let result = {
            let mut scope = ScopedTransform::push(&mut target, Affine2::from_scale(Vec2::splat(2.0)));
            assert_ne!(scope.target().transform(), base);
            scope.target().fill_polygon(&[Vec2::ZERO, Vec2::X, Vec2::Y], [1.0; 4])
        };
        assert!(result.is_err());
        assert_eq!(target.transform, base);
    }

    #[test]
    fn test_scopes_nest() {
        let mut list = DisplayList::new();
        {
            let mut outer = ScopedTransform::push(&mut list, Affine2::from_translation(Vec2::X));
            {
                let mut inner = ScopedTransform::push(outer.target(), Affine2::from_translation(Vec2::Y));
                assert_eq!(inner.target().transform().translation, Vec2::ONE);
            }
            assert_eq!(outer.target().transform().translation, Vec2::X);
        }
        assert_eq!(list.transform(), Affine2::IDENTITY);
    }

    #[test]
    fn test_draw_body_skips_sensors() {
        let mut physics = SimplePhysics::default();
        let body = physics.create_body(
            &BodyDef::fixed(Vec2::new(5.0, 0.0))
                .with_shapes([ShapeDescriptor::rect(1.0, 1.0)])
                .with_fixture(FixtureDef::from_descriptor(ShapeDescriptor::circle(3.0)).sensor()),
        );
        let mut list = DisplayList::new();
        draw_body(&physics, body, &mut list, colors::STATIC).unwrap();
        // One quad, two triangles
        assert_eq!(list.vertices().len(), 6);
        assert!(list.vertices().iter().all(|v| (v.point().x - 5.0).abs() <= 1.0 + 1e-5));
        assert_eq!(list.transform(), Affine2::IDENTITY);
    }

    #[test]
    fn test_draw_circle_body() {
        let mut physics = SimplePhysics::default();
        let body = physics.create_body(&BodyDef::fixed(Vec2::ZERO).with_shapes([ShapeDescriptor::circle(1.0)]));
        let mut list = DisplayList::new();
        draw_body(&physics, body, &mut list, colors::STATIC).unwrap();
        assert_eq!(list.vertices().len(), (CIRCLE_SEGMENTS as usize - 2) * 3);
    }
}
