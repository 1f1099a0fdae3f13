//! World-level event queue
//!
//! Actors post presentation cues (particles, sounds) while the simulation
//! runs; the presentation layer drains them by type once per frame.

use std::any::Any;

use glam::Vec2;

/// A named cue at a world position
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub name: String,
    pub position: Vec2,
}

impl Cue {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Heterogeneous FIFO of posted events
#[derive(Default)]
pub struct EventQueue {
    events: Vec<Box<dyn Any>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post<E: Any>(&mut self, event: E) {
        self.events.push(Box::new(event));
    }

    pub(crate) fn post_boxed(&mut self, event: Box<dyn Any>) {
        self.events.push(event);
    }

    /// Remove every event of type `E`, in posting order, handing each to
    /// `consume`. Events of other types stay queued.
    pub fn poll<E: Any>(&mut self, mut consume: impl FnMut(E)) {
        let mut kept = Vec::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            match event.downcast::<E>() {
                Ok(event) => consume(*event),
                Err(other) => kept.push(other),
            }
        }
        self.events = kept;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue").field("len", &self.events.len()).finish()
    }
}
