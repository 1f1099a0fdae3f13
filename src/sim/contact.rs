//! Routing of engine contact events to actor callbacks
//!
//! Bodies carry no back-reference to their actor. The router keeps the
//! body-to-actor association itself and checks each owner for the
//! [`CollisionListener`] capability before calling into it. Participants
//! without an owner or without the capability are skipped silently.

use std::collections::HashMap;

use glam::Vec2;

use super::actor::{ActorCore, ActorId, AnyActor};
use crate::physics::{BodyHandle, ContactEvent};

/// The other side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counterpart {
    pub body: BodyHandle,
    /// Owning actor, if the body belongs to one
    pub actor: Option<ActorId>,
}

/// Contact callbacks for actors that care about collisions
pub trait CollisionListener {
    /// Fixtures of `me` and `other` started touching. `normal` points from
    /// the first to the second body as reported by the engine, and is the
    /// same for both participants. Sensor contacts have a zero normal and no
    /// point.
    fn begin_contact(
        &mut self,
        core: &mut ActorCore,
        me: BodyHandle,
        other: Counterpart,
        normal: Vec2,
        point: Option<Vec2>,
    );

    fn end_contact(&mut self, _core: &mut ActorCore, _other: Counterpart) {}

    /// Largest normal impulse the solver applied to one contact this step
    fn hit(&mut self, _core: &mut ActorCore, _impulse: f32) {}
}

/// Body handle to actor association plus event dispatch
#[derive(Debug, Default)]
pub struct ContactRouter {
    owners: HashMap<BodyHandle, ActorId>,
}

impl ContactRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, body: BodyHandle, actor: ActorId) {
        self.owners.insert(body, actor);
    }

    pub fn unbind(&mut self, body: BodyHandle) -> Option<ActorId> {
        self.owners.remove(&body)
    }

    /// Drop every body bound to `actor`
    pub fn release(&mut self, actor: ActorId) {
        self.owners.retain(|_, owner| *owner != actor);
    }

    pub fn owner_of(&self, body: BodyHandle) -> Option<ActorId> {
        self.owners.get(&body).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Deliver `events` in order to the owning actors in `actors`
    pub fn dispatch(&self, events: &[ContactEvent], actors: &mut [Box<dyn AnyActor>]) {
        for event in events {
            match event {
                ContactEvent::Begin { a, b, manifold } => {
                    let normal = manifold.as_ref().map_or(Vec2::ZERO, |m| m.normal);
                    let point = manifold.as_ref().and_then(|m| m.points.first().copied());
                    for (me, other) in [(*a, *b), (*b, *a)] {
                        let counterpart = self.counterpart(other);
                        self.with_listener(me, actors, |core, listener| {
                            listener.begin_contact(core, me, counterpart, normal, point)
                        });
                    }
                }
                ContactEvent::End {
                    a: Some(a),
                    b: Some(b),
                } => {
                    for (me, other) in [(*a, *b), (*b, *a)] {
                        let counterpart = self.counterpart(other);
                        self.with_listener(me, actors, |core, listener| {
                            listener.end_contact(core, counterpart)
                        });
                    }
                }
                // One side already destroyed
                ContactEvent::End { .. } => {}
                ContactEvent::PostSolve {
                    a,
                    b,
                    normal_impulses,
                } => {
                    let impulse = normal_impulses.iter().copied().fold(0.0f32, f32::max);
                    for me in [*a, *b] {
                        self.with_listener(me, actors, |core, listener| listener.hit(core, impulse));
                    }
                }
            }
        }
    }

    fn counterpart(&self, body: BodyHandle) -> Counterpart {
        Counterpart {
            body,
            actor: self.owner_of(body),
        }
    }

    fn with_listener(
        &self,
        body: BodyHandle,
        actors: &mut [Box<dyn AnyActor>],
        call: impl FnOnce(&mut ActorCore, &mut dyn CollisionListener),
    ) {
        let Some(owner) = self.owner_of(body) else {
            return;
        };
        let Some(actor) = actors
            .iter_mut()
            .find(|actor| actor.core().id() == owner && !actor.core().is_removed())
        else {
            return;
        };
        if let Some((core, listener)) = actor.collision_listener() {
            call(core, listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Manifold;
    use crate::sim::actor::{Actor, ActorCtx, Behavior};

    #[derive(Default)]
    struct Bumper {
        log: Vec<String>,
    }

    impl Behavior for Bumper {
        fn collision_listener(&mut self) -> Option<&mut dyn CollisionListener> {
            Some(self)
        }
    }

    impl CollisionListener for Bumper {
        fn begin_contact(
            &mut self,
            core: &mut ActorCore,
            me: BodyHandle,
            other: Counterpart,
            normal: Vec2,
            point: Option<Vec2>,
        ) {
            self.log.push(format!("begin {} {} {:?} {} {:?}", me.0, other.body.0, other.actor, normal, point));
            core.add_score(1);
        }

        fn end_contact(&mut self, _core: &mut ActorCore, other: Counterpart) {
            self.log.push(format!("end {}", other.body.0));
        }

        fn hit(&mut self, _core: &mut ActorCore, impulse: f32) {
            self.log.push(format!("hit {}", impulse));
        }
    }

    /// Ignores contacts entirely
    struct Wall;

    impl Behavior for Wall {
        fn act(&mut self, _ctx: &mut ActorCtx<'_, Self>, _delta: f32) {}
    }

    fn bumper(id: u64) -> Box<dyn AnyActor> {
        let mut actor = Actor::new(ActorCore::default(), Bumper::default());
        actor.core.set_id(ActorId(id));
        Box::new(actor)
    }

    fn log_of(actor: &dyn AnyActor) -> Vec<String> {
        actor
            .as_any()
            .downcast_ref::<Actor<Bumper>>()
            .map(|a| a.behavior.log.clone())
            .unwrap_or_default()
    }

    fn setup() -> (ContactRouter, Vec<Box<dyn AnyActor>>) {
        let mut router = ContactRouter::new();
        router.bind(BodyHandle(10), ActorId(1));
        router.bind(BodyHandle(20), ActorId(2));
        router.bind(BodyHandle(30), ActorId(3));
        let mut wall = Actor::new(ActorCore::default(), Wall);
        wall.core.set_id(ActorId(3));
        (router, vec![bumper(1), bumper(2), Box::new(wall) as Box<dyn AnyActor>])
    }

    #[test]
    fn test_begin_reaches_both_sides_with_same_normal() {
        let (router, mut actors) = setup();
        let manifold = Manifold {
            normal: Vec2::Y,
            points: vec![Vec2::new(1.0, 2.0)],
            depth: 0.01,
        };
        router.dispatch(
            &[ContactEvent::Begin {
                a: BodyHandle(10),
                b: BodyHandle(20),
                manifold: Some(manifold),
            }],
            &mut actors,
        );
        assert_eq!(log_of(actors[0].as_ref()), ["begin 10 20 Some(ActorId(2)) [0, 1] Some(Vec2(1.0, 2.0))"]);
        assert_eq!(log_of(actors[1].as_ref()), ["begin 20 10 Some(ActorId(1)) [0, 1] Some(Vec2(1.0, 2.0))"]);
        // Callbacks may only queue world changes
        assert_eq!(actors[0].core_mut().take_commands().len(), 1);
    }

    #[test]
    fn test_sensor_begin_has_no_point() {
        let (router, mut actors) = setup();
        router.dispatch(
            &[ContactEvent::Begin {
                a: BodyHandle(10),
                b: BodyHandle(99),
                manifold: None,
            }],
            &mut actors,
        );
        assert_eq!(log_of(actors[0].as_ref()), ["begin 10 99 None [0, 0] None"]);
    }

    #[test]
    fn test_listener_capability_is_optional() {
        let (router, mut actors) = setup();
        router.dispatch(
            &[
                ContactEvent::Begin {
                    a: BodyHandle(30),
                    b: BodyHandle(20),
                    manifold: None,
                },
                ContactEvent::End {
                    a: Some(BodyHandle(30)),
                    b: Some(BodyHandle(20)),
                },
            ],
            &mut actors,
        );
        assert_eq!(log_of(actors[1].as_ref()), ["begin 20 30 Some(ActorId(3)) [0, 0] None", "end 30"]);
    }

    #[test]
    fn test_end_with_invalidated_side_is_ignored() {
        let (router, mut actors) = setup();
        router.dispatch(
            &[ContactEvent::End {
                a: Some(BodyHandle(10)),
                b: None,
            }],
            &mut actors,
        );
        assert!(log_of(actors[0].as_ref()).is_empty());
    }

    #[test]
    fn test_post_solve_reports_max_impulse() {
        let (router, mut actors) = setup();
        router.dispatch(
            &[ContactEvent::PostSolve {
                a: BodyHandle(10),
                b: BodyHandle(20),
                normal_impulses: vec![0.5, 2.5, 1.0],
            }],
            &mut actors,
        );
        assert_eq!(log_of(actors[0].as_ref()), ["hit 2.5"]);
        assert_eq!(log_of(actors[1].as_ref()), ["hit 2.5"]);
    }

    #[test]
    fn test_removed_or_unbound_owner_gets_nothing() {
        let (mut router, mut actors) = setup();
        router.unbind(BodyHandle(20));
        actors[0].core_mut().kill();
        let mut physics = crate::physics::SimplePhysics::default();
        actors[0].remove(&mut physics);
        router.dispatch(
            &[ContactEvent::PostSolve {
                a: BodyHandle(10),
                b: BodyHandle(20),
                normal_impulses: vec![1.0],
            }],
            &mut actors,
        );
        assert!(log_of(actors[0].as_ref()).is_empty());
        assert!(log_of(actors[1].as_ref()).is_empty());
    }
}
