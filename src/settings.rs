//! Simulation settings
//!
//! Loaded from JSON so levels and tools can tune the fixed step without a
//! rebuild. Missing fields fall back to the defaults below.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::consts::*;

/// Tunables for the fixed-step driver and the geometry compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Fixed physics step in seconds
    pub physics_step: f32,
    /// Solver iterations handed to the physics engine each step
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    /// Upper bound on steps per `update` call (None = unbounded)
    pub max_steps_per_update: Option<u32>,
    /// World gravity (units/s²)
    pub gravity: Vec2,
    /// Maximum deviation of flattened curves from the true curve
    pub flatness: f32,
    /// Default edge length of the square used by spatial queries
    pub query_radius: f32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            physics_step: PHYSICS_STEP,
            velocity_iterations: VELOCITY_ITERATIONS,
            position_iterations: POSITION_ITERATIONS,
            max_steps_per_update: None,
            gravity: Vec2::new(0.0, -9.81),
            flatness: DEFAULT_FLATNESS,
            query_radius: 0.5,
        }
    }
}

impl SimSettings {
    /// Parse settings from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace unusable values with defaults
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.physics_step.is_finite() && self.physics_step > 0.0) {
            log::warn!(
                "physics_step {} is not usable, falling back to {}",
                self.physics_step,
                defaults.physics_step
            );
            self.physics_step = defaults.physics_step;
        }
        if !(self.flatness.is_finite() && self.flatness > 0.0) {
            self.flatness = defaults.flatness;
        }
        self
    }
}
