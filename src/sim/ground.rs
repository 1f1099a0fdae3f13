//! Floor and wall contact sensing for side-view actors
//!
//! Inspects the engine's live contacts between an actor's body and static
//! bodies. A contact counts as floor or wall by the direction of its normal,
//! and each flag stays latched for a short time after the last matching
//! contact so that bumpy terrain does not flicker.

use crate::physics::{BodyHandle, BodyKind, PhysicsEngine};

/// sin 45°: steeper surfaces are not floor
pub const MAX_FLOOR_ANGLE: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// cos 30°
pub const MAX_WALL_ANGLE: f32 = 0.866_025_4;
pub const FLOOR_CONTACT_TTL: f32 = 0.2;
pub const WALL_CONTACT_TTL: f32 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct GroundSensor {
    state_time: f32,
    touching_floor: bool,
    touching_left_wall: bool,
    touching_right_wall: bool,
    last_floor_contact: f32,
    last_left_wall_contact: f32,
    last_right_wall_contact: f32,
}

impl GroundSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, physics: &dyn PhysicsEngine, body: BodyHandle, delta: f32) {
        self.state_time += delta;

        for contact in physics.contacts() {
            let Some(other) = contact.other(body) else {
                continue;
            };
            let Some(manifold) = &contact.manifold else {
                continue;
            };
            if physics.body_kind(other) != Some(BodyKind::Static) {
                continue;
            }
            // Orient from the surface towards our body
            let normal = if contact.body_b == body {
                manifold.normal
            } else {
                -manifold.normal
            };

            if normal.y > MAX_FLOOR_ANGLE {
                self.touching_floor = true;
                self.last_floor_contact = self.state_time;
            } else if normal.x > MAX_WALL_ANGLE {
                self.touching_left_wall = true;
                self.last_left_wall_contact = self.state_time;
            } else if normal.x < -MAX_WALL_ANGLE {
                self.touching_right_wall = true;
                self.last_right_wall_contact = self.state_time;
            }
        }

        if self.state_time - self.last_floor_contact > FLOOR_CONTACT_TTL {
            self.touching_floor = false;
        }
        if self.state_time - self.last_left_wall_contact > WALL_CONTACT_TTL {
            self.touching_left_wall = false;
        }
        if self.state_time - self.last_right_wall_contact > WALL_CONTACT_TTL {
            self.touching_right_wall = false;
        }
    }

    pub fn is_touching_floor(&self) -> bool {
        self.touching_floor
    }

    /// A wall on the body's left side
    pub fn is_touching_left_wall(&self) -> bool {
        self.touching_left_wall
    }

    pub fn is_touching_right_wall(&self) -> bool {
        self.touching_right_wall
    }
}
