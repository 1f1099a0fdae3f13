//! Shape descriptors handed to the physics engine at body construction

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rotate;

/// Friction, density and restitution attached from source metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProps {
    pub friction: f32,
    pub density: f32,
    pub restitution: f32,
}

impl PhysicalProps {
    pub fn new(friction: f32, density: f32, restitution: f32) -> Self {
        Self {
            friction,
            density,
            restitution,
        }
    }
}

/// Collision geometry in body-local coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Convex polygon, counter-clockwise
    Polygon { vertices: Vec<Vec2> },
    Circle { center: Vec2, radius: f32 },
    /// Open or closed edge chain (terrain outlines)
    Chain { vertices: Vec<Vec2>, closed: bool },
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Polygon { .. } => "polygon",
            Shape::Circle { .. } => "circle",
            Shape::Chain { .. } => "chain",
        }
    }

    /// Local axis-aligned bounds
    pub fn bounds(&self) -> Aabb {
        match self {
            Shape::Circle { center, radius } => Aabb::around(*center, Vec2::splat(*radius)),
            Shape::Polygon { vertices } | Shape::Chain { vertices, .. } => {
                Aabb::from_points(vertices).unwrap_or(Aabb::around(Vec2::ZERO, Vec2::ZERO))
            }
        }
    }

    /// Bounds after placing the shape at `position` rotated by `angle`
    pub fn world_bounds(&self, position: Vec2, angle: f32) -> Aabb {
        match self {
            Shape::Circle { center, radius } => {
                Aabb::around(position + rotate(*center, angle), Vec2::splat(*radius))
            }
            Shape::Polygon { vertices } | Shape::Chain { vertices, .. } => {
                let world: Vec<Vec2> = vertices.iter().map(|v| position + rotate(*v, angle)).collect();
                Aabb::from_points(&world).unwrap_or(Aabb::around(position, Vec2::ZERO))
            }
        }
    }

    /// Area of the shape (chains have none)
    pub fn area(&self) -> f32 {
        match self {
            Shape::Circle { radius, .. } => std::f32::consts::PI * radius * radius,
            Shape::Polygon { vertices } => polygon_signed_area(vertices).abs(),
            Shape::Chain { .. } => 0.0,
        }
    }

    /// Centroid in local coordinates
    pub fn centroid(&self) -> Vec2 {
        match self {
            Shape::Circle { center, .. } => *center,
            Shape::Polygon { vertices } | Shape::Chain { vertices, .. } => {
                if vertices.is_empty() {
                    return Vec2::ZERO;
                }
                vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
            }
        }
    }
}

/// An immutable piece of collision geometry plus optional physical properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub shape: Shape,
    pub props: Option<PhysicalProps>,
}

impl ShapeDescriptor {
    pub fn new(shape: Shape) -> Self {
        Self { shape, props: None }
    }

    pub fn with_props(mut self, props: Option<PhysicalProps>) -> Self {
        self.props = props;
        self
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(Shape::Circle {
            center: Vec2::ZERO,
            radius,
        })
    }

    pub fn circle_at(radius: f32, center: Vec2) -> Self {
        Self::new(Shape::Circle { center, radius })
    }

    /// Box centered on the body origin
    pub fn rect(half_width: f32, half_height: f32) -> Self {
        Self::rotated_rect(half_width, half_height, Vec2::ZERO, 0.0)
    }

    /// Box centered at `center`, rotated by `angle`
    pub fn rotated_rect(half_width: f32, half_height: f32, center: Vec2, angle: f32) -> Self {
        let corners = [
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ];
        let vertices = corners.iter().map(|c| center + rotate(*c, angle)).collect();
        Self::new(Shape::Polygon { vertices })
    }

    /// Box with its lower-left corner on the body origin
    pub fn rect_abs(width: f32, height: f32) -> Self {
        Self::rotated_rect(width / 2.0, height / 2.0, Vec2::new(width / 2.0, height / 2.0), 0.0)
    }

    /// Convex polygon; reordered counter-clockwise if given clockwise
    pub fn polygon(vertices: &[Vec2]) -> Self {
        let mut vertices = vertices.to_vec();
        if polygon_signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        Self::new(Shape::Polygon { vertices })
    }

    /// Convex polygon expressed relative to its first vertex
    pub fn polygon_relative(vertices: &[Vec2]) -> Self {
        let Some(&first) = vertices.first() else {
            return Self::polygon(vertices);
        };
        let relative: Vec<Vec2> = vertices.iter().map(|v| *v - first).collect();
        Self::polygon(&relative)
    }

    pub fn chain(vertices: Vec<Vec2>, closed: bool) -> Self {
        Self::new(Shape::Chain { vertices, closed })
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn around(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bb = Self::new(*first, *first);
        for p in rest {
            bb.min = bb.min.min(*p);
            bb.max = bb.max.max(*p);
        }
        Some(bb)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Signed area of a simple polygon; positive when counter-clockwise
pub fn polygon_signed_area(points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        sum += p.perp_dot(q);
    }
    sum * 0.5
}
