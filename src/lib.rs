//! Stagehand - simulation substrate for 2D physics-driven games
//!
//! Core modules:
//! - `sim`: Fixed-step world driver, actors, task scheduling, contact routing
//! - `geom`: Vector path flattening and triangulation into collision shapes
//! - `svg`: Vector document model, path data and transform parsing
//! - `physics`: Physics engine contract plus a small reference engine
//! - `render`: Render target contract, scoped transforms, display lists
//! - `settings`: Data-driven simulation configuration

pub mod error;
pub mod geom;
pub mod physics;
pub mod render;
pub mod settings;
pub mod sim;
pub mod svg;

pub use error::{RenderError, Result, SimError};
pub use settings::SimSettings;

use glam::Vec2;

/// Simulation and geometry constants
pub mod consts {
    /// Fixed physics timestep (300 Hz)
    pub const PHYSICS_STEP: f32 = 1.0 / 300.0;
    /// Solver iterations per physics step
    pub const VELOCITY_ITERATIONS: u32 = 6;
    pub const POSITION_ITERATIONS: u32 = 3;

    /// Two points closer than this on both axes are the same point
    pub const POINT_EPSILON: f32 = 0.001;
    /// Triangles with a smaller area are rejected as degenerate
    pub const MIN_TRIANGLE_AREA: f32 = 0.0001;
    /// Default curve flattening tolerance (world units)
    pub const DEFAULT_FLATNESS: f32 = 0.1;

    /// Body defaults for body-backed actors
    pub const ACTOR_LINEAR_DAMPING: f32 = 0.1;
    pub const ACTOR_ANGULAR_DAMPING: f32 = 0.8;
    pub const ACTOR_FRICTION: f32 = 3.0;
    pub const ACTOR_RESTITUTION: f32 = 0.1;
    pub const ACTOR_DENSITY: f32 = 1.0;

    /// Engine defaults for fixtures without physical metadata
    pub const DEFAULT_FRICTION: f32 = 0.2;
    pub const DEFAULT_DENSITY: f32 = 1.0;
    pub const DEFAULT_RESTITUTION: f32 = 0.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Twice the signed area of triangle (a, b, c); positive when counter-clockwise
#[inline]
pub fn cross3(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}
