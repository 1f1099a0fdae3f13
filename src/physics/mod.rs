//! Physics engine contract
//!
//! The simulation only talks to rigid-body physics through [`PhysicsEngine`].
//! Bodies are addressed by opaque [`BodyHandle`]s; nothing about the owning
//! actor is stored on the engine side.

pub mod simple;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::geom::{Aabb, ShapeDescriptor};

pub use simple::SimplePhysics;

/// Opaque, stable identifier of a body inside one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Static,
    /// Moves by velocity only, unaffected by forces and contacts
    Kinematic,
    Dynamic,
}

/// Collision filtering bits, same semantics as category/mask pairs elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub category_bits: u16,
    pub mask_bits: u16,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
        }
    }
}

impl Filter {
    pub fn should_collide(&self, other: &Filter) -> bool {
        (self.mask_bits & other.category_bits) != 0 && (other.mask_bits & self.category_bits) != 0
    }
}

/// One collision shape attached to a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDef {
    pub shape: ShapeDescriptor,
    pub friction: f32,
    pub density: f32,
    pub restitution: f32,
    pub sensor: bool,
    pub filter: Filter,
}

impl FixtureDef {
    /// Fixture using the descriptor's properties, or engine defaults if it has none
    pub fn from_descriptor(shape: ShapeDescriptor) -> Self {
        let (friction, density, restitution) = match shape.props {
            Some(p) => (p.friction, p.density, p.restitution),
            None => (DEFAULT_FRICTION, DEFAULT_DENSITY, DEFAULT_RESTITUTION),
        };
        Self {
            shape,
            friction,
            density,
            restitution,
            sensor: false,
            filter: Filter::default(),
        }
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Everything needed to construct a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub fixtures: Vec<FixtureDef>,
}

impl BodyDef {
    pub fn new(kind: BodyKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            fixtures: Vec::new(),
        }
    }

    /// Static body, the usual target of level geometry
    pub fn fixed(position: Vec2) -> Self {
        Self::new(BodyKind::Static, position)
    }

    /// Dynamic body with the damping and material used for actors
    pub fn dynamic_actor(position: Vec2, shape: ShapeDescriptor) -> Self {
        let mut fixture = FixtureDef::from_descriptor(shape);
        if fixture.shape.props.is_none() {
            fixture.friction = ACTOR_FRICTION;
            fixture.density = ACTOR_DENSITY;
            fixture.restitution = ACTOR_RESTITUTION;
        }
        Self {
            linear_damping: ACTOR_LINEAR_DAMPING,
            angular_damping: ACTOR_ANGULAR_DAMPING,
            ..Self::new(BodyKind::Dynamic, position)
        }
        .with_fixture(fixture)
    }

    pub fn with_fixture(mut self, fixture: FixtureDef) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn with_shapes(mut self, shapes: impl IntoIterator<Item = ShapeDescriptor>) -> Self {
        self.fixtures.extend(shapes.into_iter().map(FixtureDef::from_descriptor));
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }
}

/// Body pose in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTransform {
    pub position: Vec2,
    pub angle: f32,
}

/// Fixture reported by a bounding-box query
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureView {
    pub body: BodyHandle,
    pub fixture_index: usize,
    pub body_kind: BodyKind,
    pub body_position: Vec2,
    pub sensor: bool,
    pub filter: Filter,
}

/// Contact geometry; the normal points from body A towards body B
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    pub normal: Vec2,
    pub points: Vec<Vec2>,
    pub depth: f32,
}

/// Contact phase notifications produced during one step
#[derive(Debug, Clone, PartialEq)]
pub enum ContactEvent {
    /// Fixtures started touching. Sensor contacts carry no manifold.
    Begin {
        a: BodyHandle,
        b: BodyHandle,
        manifold: Option<Manifold>,
    },
    /// Fixtures stopped touching. A side is None when its body was
    /// destroyed while the contact was live.
    End {
        a: Option<BodyHandle>,
        b: Option<BodyHandle>,
    },
    /// Impulses applied by the solver to a touching, non-sensor contact
    PostSolve {
        a: BodyHandle,
        b: BodyHandle,
        normal_impulses: Vec<f32>,
    },
}

/// A currently live contact
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub sensor: bool,
    pub manifold: Option<Manifold>,
}

impl ContactInfo {
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// The other participant, if `body` is one of the two
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }
}

/// Rigid-body physics collaborator
pub trait PhysicsEngine {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    /// Destroy a body. Live contacts end with this side invalidated.
    /// Returns false if the handle was unknown.
    fn destroy_body(&mut self, body: BodyHandle) -> bool;

    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32);

    /// Contact events produced since the last drain, in engine order
    fn drain_contact_events(&mut self) -> Vec<ContactEvent>;

    /// Contacts that are currently touching
    fn contacts(&self) -> Vec<ContactInfo>;

    /// Fixtures whose world bounds overlap `area`
    fn query_aabb(&self, area: Aabb) -> Vec<FixtureView>;

    fn body_transform(&self, body: BodyHandle) -> Option<BodyTransform>;
    fn set_body_transform(&mut self, body: BodyHandle, transform: BodyTransform);
    fn body_kind(&self, body: BodyHandle) -> Option<BodyKind>;
    fn body_fixtures(&self, body: BodyHandle) -> Option<&[FixtureDef]>;

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2);
    fn apply_linear_impulse(&mut self, body: BodyHandle, impulse: Vec2);

    fn contains(&self, body: BodyHandle) -> bool {
        self.body_kind(body).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::PhysicalProps;

    #[test]
    fn test_filter_requires_both_directions() {
        let a = Filter {
            category_bits: 0b01,
            mask_bits: 0b10,
        };
        let b = Filter {
            category_bits: 0b10,
            mask_bits: 0b01,
        };
        let deaf = Filter {
            category_bits: 0b10,
            mask_bits: 0,
        };
        assert!(a.should_collide(&b));
        assert!(!a.should_collide(&deaf));
    }

    #[test]
    fn test_fixture_defaults_without_props() {
        let fixture = FixtureDef::from_descriptor(ShapeDescriptor::circle(1.0));
        assert_eq!(fixture.friction, DEFAULT_FRICTION);
        assert_eq!(fixture.density, DEFAULT_DENSITY);
        assert!(!fixture.sensor);
    }

    #[test]
    fn test_fixture_takes_descriptor_props() {
        let desc = ShapeDescriptor::circle(1.0).with_props(Some(PhysicalProps::new(0.7, 3.0, 0.4)));
        let fixture = FixtureDef::from_descriptor(desc);
        assert_eq!((fixture.friction, fixture.density, fixture.restitution), (0.7, 3.0, 0.4));
    }

    #[test]
    fn test_dynamic_actor_def_uses_actor_material() {
        let def = BodyDef::dynamic_actor(Vec2::ONE, ShapeDescriptor::rect(0.5, 0.5));
        assert_eq!(def.kind, BodyKind::Dynamic);
        assert_eq!(def.linear_damping, ACTOR_LINEAR_DAMPING);
        assert_eq!(def.fixtures[0].friction, ACTOR_FRICTION);
    }
}
