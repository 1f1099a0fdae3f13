//! Simulation driver
//!
//! The world advances on a fixed timestep only. Actors and callbacks never
//! mutate the registry directly; they queue commands that the world applies
//! between steps, so every step sees a stable actor list.

pub mod actor;
pub mod contact;
pub mod events;
pub mod ground;
pub mod tasks;
pub mod world;

pub use actor::{
    Actor, ActorCore, ActorCtx, ActorFrame, ActorId, AnyActor, Attachment, AuxiliaryBody, Behavior,
    SpawnAnchor, WorldCommand,
};
pub use contact::{CollisionListener, ContactRouter, Counterpart};
pub use events::{Cue, EventQueue};
pub use ground::GroundSensor;
pub use tasks::{TaskDef, TaskId, TaskKind, TaskScheduler};
pub use world::{ActorListener, GameRules, GameState, SimulationWorld, WorldInfo};
