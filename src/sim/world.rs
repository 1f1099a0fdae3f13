//! Fixed-step simulation world
//!
//! Owns the physics engine and the actor registry. `update` turns variable
//! frame deltas into a whole number of fixed physics steps; each step ticks
//! every actor, applies the world commands they queued, advances the engine
//! and routes its contact events back to the actors.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;

use super::actor::{Actor, ActorId, AnyActor, Behavior, WorldCommand};
use super::contact::ContactRouter;
use super::events::EventQueue;
use crate::geom::Aabb;
use crate::physics::{BodyHandle, BodyKind, FixtureView, PhysicsEngine, SimplePhysics};
use crate::render::RenderTarget;
use crate::{Result, SimSettings};

/// Coarse phase of a game session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    /// Level teardown and setup
    Init,
    PreGame,
    Game,
    Victory,
    Defeat,
    /// Game-specific phase
    Custom(u32),
}

/// Read-only snapshot of world state handed to actors
#[derive(Debug, Clone, Default)]
pub struct WorldInfo {
    pub state: Option<GameState>,
    pub state_time: f32,
    pub score: i64,
    pub keyboard_focus: Option<ActorId>,
}

/// Game-specific reactions to state changes
pub trait GameRules<P: PhysicsEngine + 'static> {
    /// Entry work for `to`. Runs before the state is committed, so
    /// `world.game_state()` still reports `from`. Transitions requested here
    /// are applied after this one completes.
    fn enter_state(&mut self, world: &mut SimulationWorld<P>, from: Option<GameState>, to: GameState);

    /// Once per `update`, after the physics steps
    fn update(&mut self, _world: &mut SimulationWorld<P>, _delta: f32) {}
}

/// Registry observer, typically a renderer keeping per-actor resources
pub trait ActorListener {
    fn actor_added(&mut self, actor: &dyn AnyActor);
    fn actor_removed(&mut self, actor: &dyn AnyActor);
}

pub struct SimulationWorld<P: PhysicsEngine + 'static> {
    physics: P,
    settings: SimSettings,
    actors: Vec<Box<dyn AnyActor>>,
    router: ContactRouter,
    rules: Option<Box<dyn GameRules<P>>>,
    listener: Option<Box<dyn ActorListener>>,
    events: EventQueue,
    game_state: Option<GameState>,
    state_time: f32,
    last_state_time: f32,
    score: i64,
    /// Unsimulated time, kept in f64 so long sessions do not drift
    carry: f64,
    keyboard_focus: Option<ActorId>,
    next_actor_id: u64,
    transitioning: bool,
    deferred_transitions: VecDeque<GameState>,
}

impl SimulationWorld<SimplePhysics> {
    /// World backed by the reference engine, using the settings' gravity
    pub fn simple(settings: SimSettings) -> Self {
        let physics = SimplePhysics::new(settings.gravity);
        Self::new(physics, settings)
    }
}

impl<P: PhysicsEngine + 'static> SimulationWorld<P> {
    /// Unusable settings values (a non-positive step, for one) are replaced
    /// with their defaults
    pub fn new(physics: P, settings: SimSettings) -> Self {
        Self {
            physics,
            settings: settings.sanitized(),
            actors: Vec::new(),
            router: ContactRouter::new(),
            rules: None,
            listener: None,
            events: EventQueue::new(),
            game_state: None,
            state_time: 0.0,
            last_state_time: 0.0,
            score: 0,
            carry: 0.0,
            keyboard_focus: None,
            next_actor_id: 1,
            transitioning: false,
            deferred_transitions: VecDeque::new(),
        }
    }

    pub fn set_rules(&mut self, rules: Box<dyn GameRules<P>>) {
        self.rules = Some(rules);
    }

    pub fn set_actor_listener(&mut self, listener: Box<dyn ActorListener>) {
        self.listener = Some(listener);
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn info(&self) -> WorldInfo {
        WorldInfo {
            state: self.game_state,
            state_time: self.state_time,
            score: self.score,
            keyboard_focus: self.keyboard_focus,
        }
    }

    /// Advance by `delta` seconds of wall time. Returns the number of fixed
    /// steps taken.
    pub fn update(&mut self, delta: f32) -> u32 {
        if self.game_state.is_none() {
            self.transition(GameState::Init);
        }

        let step = f64::from(self.settings.physics_step);
        self.carry += f64::from(delta);
        let mut steps = 0;
        while self.carry >= step {
            if let Some(cap) = self.settings.max_steps_per_update {
                if steps >= cap {
                    log::warn!(
                        "Step cap of {} reached, dropping {:.4}s of simulation time",
                        cap,
                        self.carry - self.carry % step
                    );
                    self.carry %= step;
                    break;
                }
            }
            self.step(step as f32);
            self.carry -= step;
            steps += 1;
        }

        self.state_time += delta;

        if let Some(mut rules) = self.rules.take() {
            rules.update(self, delta);
            self.rules.get_or_insert(rules);
        }
        steps
    }

    fn step(&mut self, dt: f32) {
        let info = self.info();
        for actor in self.actors.iter_mut() {
            actor.tick(dt, &mut self.physics, &info);
        }
        self.apply_commands();

        self.physics
            .step(dt, self.settings.velocity_iterations, self.settings.position_iterations);
        let events = self.physics.drain_contact_events();
        if !events.is_empty() {
            self.router.dispatch(&events, &mut self.actors);
            self.apply_commands();
        }
    }

    /// Apply queued actor commands until none are left, then drop removed
    /// actors and restore z-order
    fn apply_commands(&mut self) {
        loop {
            let mut commands = Vec::new();
            for actor in self.actors.iter_mut() {
                let source = actor.core().id();
                commands.extend(actor.core_mut().take_commands().into_iter().map(|c| (source, c)));
            }
            if commands.is_empty() {
                break;
            }
            for (source, command) in commands {
                self.apply(source, command);
            }
        }

        self.sweep_removed();

        let mut dirty = false;
        for actor in self.actors.iter_mut() {
            dirty |= actor.core_mut().take_z_dirty();
        }
        if dirty {
            self.refresh_z_order();
        }
    }

    fn apply(&mut self, source: ActorId, command: WorldCommand) {
        match command {
            WorldCommand::Spawn(build) => match build(&mut self.physics as &mut dyn PhysicsEngine) {
                Ok(actor) => {
                    self.register(actor);
                }
                Err(err) => log::warn!("Spawn requested by {:?} failed: {}", source, err),
            },
            WorldCommand::AddScore(points) => self.score += points,
            WorldCommand::Transition(state) => self.transition(state),
            WorldCommand::Event(event) => self.events.post_boxed(event),
            WorldCommand::Impulse(body, impulse) => self.physics.apply_linear_impulse(body, impulse),
            WorldCommand::Focus => self.keyboard_focus = Some(source),
        }
    }

    /// Switch to `state`. Entering the current state is a no-op; leaving the
    /// unset state always passes through `Init` first.
    pub fn transition(&mut self, state: GameState) {
        if self.transitioning {
            self.deferred_transitions.push_back(state);
            return;
        }
        self.transitioning = true;
        self.enter(state);
        while let Some(next) = self.deferred_transitions.pop_front() {
            self.enter(next);
        }
        self.transitioning = false;
    }

    fn enter(&mut self, state: GameState) {
        if self.game_state == Some(state) {
            return;
        }
        if self.game_state.is_none() && state != GameState::Init {
            self.enter(GameState::Init);
        }

        self.keyboard_focus = None;
        if state == GameState::Init {
            for actor in self.actors.iter_mut() {
                if !actor.core().survives_reset() {
                    actor.remove(&mut self.physics);
                }
            }
            self.sweep_removed();
        }
        if !matches!(state, GameState::Victory | GameState::Defeat) {
            self.score = 0;
        }

        let from = self.game_state;
        if let Some(mut rules) = self.rules.take() {
            rules.enter_state(self, from, state);
            self.rules.get_or_insert(rules);
        }

        self.game_state = Some(state);
        self.last_state_time = self.state_time;
        self.state_time = 0.0;
        log::info!("State {:?} -> {:?} after {:.2}s", from, state, self.last_state_time);
    }

    pub fn reset(&mut self) {
        self.transition(GameState::Init);
        self.transition(GameState::PreGame);
    }

    pub fn spawn<B: Behavior>(&mut self, actor: Actor<B>) -> ActorId {
        self.register(Box::new(actor))
    }

    /// Build an actor that needs the engine (usually for its body) and add it
    pub fn spawn_with<B: Behavior>(
        &mut self,
        build: impl FnOnce(&mut dyn PhysicsEngine) -> Result<Actor<B>>,
    ) -> Result<ActorId> {
        let actor = build(&mut self.physics as &mut dyn PhysicsEngine)?;
        Ok(self.spawn(actor))
    }

    pub fn spawn_boxed(&mut self, actor: Box<dyn AnyActor>) -> ActorId {
        self.register(actor)
    }

    fn register(&mut self, mut actor: Box<dyn AnyActor>) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        actor.core_mut().set_id(id);
        if let Some(body) = actor.core().body() {
            self.router.bind(body, id);
        }

        let info = self.info();
        actor.added(&mut self.physics, &info);
        if let Some(listener) = self.listener.as_mut() {
            listener.actor_added(actor.as_ref());
        }
        self.actors.push(actor);
        self.refresh_z_order();
        log::debug!("Added actor {:?}", id);
        id
    }

    /// Tear down an actor immediately. Returns false if it was unknown or
    /// already removed.
    pub fn remove_actor(&mut self, id: ActorId) -> bool {
        let Some(actor) = self.actors.iter_mut().find(|a| a.core().id() == id) else {
            return false;
        };
        let removed = actor.remove(&mut self.physics);
        self.sweep_removed();
        removed
    }

    fn sweep_removed(&mut self) {
        if !self.actors.iter().any(|a| a.core().is_removed()) {
            return;
        }
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.actors)
            .into_iter()
            .partition(|a| a.core().is_removed());
        self.actors = kept;

        for actor in removed {
            let id = actor.core().id();
            self.router.release(id);
            if self.keyboard_focus == Some(id) {
                self.keyboard_focus = None;
            }
            if let Some(listener) = self.listener.as_mut() {
                listener.actor_removed(actor.as_ref());
            }
        }
    }

    /// Set an actor's z-order and re-sort right away. Changes made directly
    /// on an `ActorCore` are sorted in at the next step.
    pub fn set_z_order(&mut self, id: ActorId, z_order: i32) -> bool {
        let Some(actor) = self.actor_mut(id) else {
            return false;
        };
        actor.core_mut().set_z_order(z_order);
        if actor.core_mut().take_z_dirty() {
            self.refresh_z_order();
        }
        true
    }

    /// Stable sort by z-order; equal z keeps insertion order
    pub fn refresh_z_order(&mut self) {
        self.actors.sort_by_key(|a| a.core().z_order());
    }

    pub fn actors(&self) -> &[Box<dyn AnyActor>] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> Option<&dyn AnyActor> {
        self.actors.iter().find(|a| a.core().id() == id).map(|a| a.as_ref())
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut (dyn AnyActor + 'static)> {
        self.actors.iter_mut().find(|a| a.core().id() == id).map(|a| a.as_mut())
    }

    /// Typed access to an actor with behaviour `B`
    pub fn actor_as<B: Behavior>(&self, id: ActorId) -> Option<&Actor<B>> {
        self.actor(id)?.as_any().downcast_ref()
    }

    pub fn actor_as_mut<B: Behavior>(&mut self, id: ActorId) -> Option<&mut Actor<B>> {
        self.actor_mut(id)?.as_any_mut().downcast_mut()
    }

    /// Actor owning `body`, if any
    pub fn owner_of(&self, body: BodyHandle) -> Option<ActorId> {
        self.router.owner_of(body)
    }

    /// Closest solid, collidable body around `point`. At equal distance a
    /// dynamic body wins, then the lower handle.
    pub fn nearest_body(&self, point: Vec2, radius: f32, excluding: Option<BodyHandle>) -> Option<BodyHandle> {
        self.closest(point, radius, |f| Some(f.body) != excluding)
    }

    /// `nearest_body` with the configured query size
    pub fn nearest_body_at(&self, point: Vec2) -> Option<BodyHandle> {
        self.nearest_body(point, self.settings.query_radius, None)
    }

    pub fn nearest_static_body(&self, point: Vec2, radius: f32) -> Option<BodyHandle> {
        self.closest(point, radius, |f| f.body_kind == BodyKind::Static)
    }

    /// Every body with a fixture in the query box, sensors included
    pub fn all_bodies_at(&self, point: Vec2, radius: f32) -> BTreeSet<BodyHandle> {
        self.physics
            .query_aabb(query_box(point, radius))
            .into_iter()
            .map(|f| f.body)
            .collect()
    }

    fn closest(&self, point: Vec2, radius: f32, accept: impl Fn(&FixtureView) -> bool) -> Option<BodyHandle> {
        self.physics
            .query_aabb(query_box(point, radius))
            .into_iter()
            .filter(|f| !f.sensor && f.filter.mask_bits != 0 && accept(f))
            .min_by(|a, b| {
                a.body_position
                    .distance(point)
                    .total_cmp(&b.body_position.distance(point))
                    .then((a.body_kind != BodyKind::Dynamic).cmp(&(b.body_kind != BodyKind::Dynamic)))
                    .then(a.body.cmp(&b.body))
            })
            .map(|f| f.body)
    }

    /// Draw visible actors in z-order, including z changes not yet sorted
    /// in. Failing actors are logged and skipped.
    pub fn draw(&self, target: &mut dyn RenderTarget) {
        let mut order: Vec<&dyn AnyActor> = self.actors.iter().map(|a| a.as_ref()).collect();
        if self.actors.iter().any(|a| a.core().is_z_dirty()) {
            order.sort_by_key(|a| a.core().z_order());
        }
        for actor in order {
            if let Err(err) = actor.draw(&self.physics, target) {
                log::warn!("Drawing actor {:?} failed: {}", actor.core().id(), err);
            }
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn add_score(&mut self, points: i64) {
        self.score += points;
    }

    pub fn game_state(&self) -> Option<GameState> {
        self.game_state
    }

    /// Seconds since the last transition
    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    /// How long the previous state lasted
    pub fn last_state_time(&self) -> f32 {
        self.last_state_time
    }

    pub fn is_game_in_progress(&self) -> bool {
        self.game_state == Some(GameState::Game)
    }

    pub fn is_game_finished(&self) -> bool {
        matches!(self.game_state, Some(GameState::Victory | GameState::Defeat))
    }

    pub fn keyboard_focus(&self) -> Option<ActorId> {
        self.keyboard_focus
    }

    pub fn set_keyboard_focus(&mut self, actor: Option<ActorId>) {
        self.keyboard_focus = actor;
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    pub fn poll_events<E: 'static>(&mut self, consume: impl FnMut(E)) {
        self.events.poll(consume);
    }
}

fn query_box(point: Vec2, radius: f32) -> Aabb {
    Aabb::around(point, Vec2::splat(radius * 0.5))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::SimError;
    use crate::geom::ShapeDescriptor;
    use crate::physics::{BodyDef, Filter, FixtureDef};
    use crate::sim::actor::{ActorCore, ActorCtx, SpawnAnchor};
    use crate::sim::events::Cue;

    type Journal = Rc<RefCell<Vec<String>>>;

    fn settings(step: f32) -> SimSettings {
        SimSettings {
            physics_step: step,
            gravity: Vec2::ZERO,
            ..SimSettings::default()
        }
    }

    fn world() -> SimulationWorld<SimplePhysics> {
        let mut world = SimulationWorld::simple(settings(1.0 / 64.0));
        world.reset();
        world
    }

    struct StateLog {
        journal: Journal,
        chain_from_victory: bool,
    }

    impl GameRules<SimplePhysics> for StateLog {
        fn enter_state(
            &mut self,
            world: &mut SimulationWorld<SimplePhysics>,
            from: Option<GameState>,
            to: GameState,
        ) {
            self.journal.borrow_mut().push(format!("{:?} -> {:?}", from, to));
            if self.chain_from_victory && to == GameState::Victory {
                world.transition(GameState::Defeat);
            }
        }
    }

    struct Registry(Journal);

    impl ActorListener for Registry {
        fn actor_added(&mut self, actor: &dyn AnyActor) {
            self.0.borrow_mut().push(format!("added {}", actor.core().id().0));
        }

        fn actor_removed(&mut self, actor: &dyn AnyActor) {
            self.0.borrow_mut().push(format!("removed {}", actor.core().id().0));
        }
    }

    /// Spawns one child on its first tick and scores on every tick
    struct Spawner {
        spawned: bool,
    }

    impl Behavior for Spawner {
        fn act(&mut self, ctx: &mut ActorCtx<'_, Self>, _delta: f32) {
            ctx.core.add_score(1);
            if !self.spawned {
                self.spawned = true;
                ctx.core.spawn_actor(Actor::new(ActorCore::visual(Vec2::ZERO, Vec2::ONE), ()));
            }
        }
    }

    #[test]
    fn test_first_update_enters_init() {
        let journal = Journal::default();
        let mut world = SimulationWorld::simple(settings(1.0 / 64.0));
        world.set_rules(Box::new(StateLog {
            journal: journal.clone(),
            chain_from_victory: false,
        }));
        world.update(0.0);
        assert_eq!(world.game_state(), Some(GameState::Init));
        assert_eq!(*journal.borrow(), ["None -> Init"]);
    }

    #[test]
    fn test_transition_from_unset_passes_through_init() {
        let journal = Journal::default();
        let mut world = SimulationWorld::simple(settings(1.0 / 64.0));
        world.set_rules(Box::new(StateLog {
            journal: journal.clone(),
            chain_from_victory: false,
        }));
        world.transition(GameState::Game);
        assert_eq!(*journal.borrow(), ["None -> Init", "Some(Init) -> Game"]);
        assert!(world.is_game_in_progress());
    }

    #[test]
    fn test_transition_is_idempotent() {
        let journal = Journal::default();
        let mut world = world();
        world.set_rules(Box::new(StateLog {
            journal: journal.clone(),
            chain_from_victory: false,
        }));
        world.transition(GameState::Game);
        world.transition(GameState::Game);
        assert_eq!(*journal.borrow(), ["Some(PreGame) -> Game"]);
    }

    #[test]
    fn test_nested_transition_is_deferred() {
        let journal = Journal::default();
        let mut world = world();
        world.set_rules(Box::new(StateLog {
            journal: journal.clone(),
            chain_from_victory: true,
        }));
        world.transition(GameState::Victory);
        assert_eq!(*journal.borrow(), ["Some(PreGame) -> Victory", "Some(Victory) -> Defeat"]);
        assert_eq!(world.game_state(), Some(GameState::Defeat));
        assert!(world.is_game_finished());
    }

    #[test]
    fn test_score_survives_only_into_end_states() {
        let mut world = world();
        world.transition(GameState::Game);
        world.add_score(5);
        world.transition(GameState::Victory);
        assert_eq!(world.score(), 5);
        world.transition(GameState::PreGame);
        assert_eq!(world.score(), 0);
    }

    #[test]
    fn test_state_time_snapshot() {
        let mut world = world();
        world.update(0.5);
        world.update(0.25);
        world.transition(GameState::Game);
        assert_eq!(world.last_state_time(), 0.75);
        assert_eq!(world.state_time(), 0.0);
    }

    #[test]
    fn test_init_keeps_only_reset_survivors() {
        let mut world = world();
        let mut hud = Actor::new(ActorCore::default(), ());
        hud.core.set_survives_reset(true);
        let hud = world.spawn(hud);
        let prop = world
            .spawn_with(|physics| {
                let def = BodyDef::dynamic_actor(Vec2::ZERO, ShapeDescriptor::circle(0.5));
                Actor::with_body(physics, &def, SpawnAnchor::Center, ())
            })
            .unwrap();
        world.reset();
        assert!(world.actor(hud).is_some());
        assert!(world.actor(prop).is_none());
        assert_eq!(world.physics().body_count(), 0);
    }

    #[test]
    fn test_kill_removes_once_and_notifies() {
        let journal = Journal::default();
        let mut world = world();
        world.set_actor_listener(Box::new(Registry(journal.clone())));
        let id = world
            .spawn_with(|physics| {
                let def = BodyDef::dynamic_actor(Vec2::ZERO, ShapeDescriptor::circle(0.5));
                Actor::with_body(physics, &def, SpawnAnchor::Center, ())
            })
            .unwrap();
        world.update(1.0 / 64.0);
        assert!(world.actor(id).is_some());

        world.actor_mut(id).unwrap().core_mut().kill();
        world.update(1.0 / 64.0);
        world.update(1.0 / 64.0);
        assert!(world.actor(id).is_none());
        assert_eq!(world.physics().body_count(), 0);
        assert_eq!(*journal.borrow(), [format!("added {}", id.0), format!("removed {}", id.0)]);
        assert!(!world.remove_actor(id));
    }

    #[test]
    fn test_remove_actor_directly() {
        let mut world = world();
        let id = world.spawn(Actor::new(ActorCore::default(), ()));
        assert!(world.remove_actor(id));
        assert!(world.actors().is_empty());
    }

    #[test]
    fn test_spawned_actor_ticks_from_next_step() {
        let mut world = world();
        let parent = world.spawn(Actor::new(ActorCore::default(), Spawner { spawned: false }));
        world.update(1.0 / 64.0);
        assert_eq!(world.actors().len(), 2);
        let child = world.actors().iter().find(|a| a.core().id() != parent).unwrap();
        assert_eq!(child.core().state_time(), 0.0);
        assert!(!child.core().is_visible());
        assert_eq!(world.score(), 1);

        world.update(1.0 / 64.0);
        let child = world.actors().iter().find(|a| a.core().id() != parent).unwrap();
        assert!(child.core().is_visible());
    }

    #[test]
    fn test_failed_spawn_is_skipped() {
        struct Faulty;
        impl Behavior for Faulty {
            fn act(&mut self, ctx: &mut ActorCtx<'_, Self>, _delta: f32) {
                ctx.core.spawn(|_| Err(SimError::UnsupportedShape("chain")));
            }
        }
        let mut world = world();
        world.spawn(Actor::new(ActorCore::default(), Faulty));
        world.update(1.0 / 64.0);
        assert_eq!(world.actors().len(), 1);
    }

    #[test]
    fn test_z_order_is_stable() {
        let mut world = world();
        let mut ids = Vec::new();
        for z in [2, 1, 1] {
            let mut core = ActorCore::default();
            core.set_z_order(z);
            ids.push(world.spawn(Actor::new(core, ())));
        }
        let order = |w: &SimulationWorld<SimplePhysics>| w.actors().iter().map(|a| a.core().id()).collect::<Vec<_>>();
        assert_eq!(order(&world), [ids[1], ids[2], ids[0]]);

        world.actor_mut(ids[0]).unwrap().core_mut().set_z_order(1);
        world.update(1.0 / 64.0);
        assert_eq!(order(&world), [ids[1], ids[2], ids[0]]);

        world.actor_mut(ids[2]).unwrap().core_mut().set_z_order(0);
        world.update(1.0 / 64.0);
        assert_eq!(order(&world), [ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_set_z_order_resorts_immediately() {
        let mut world = world();
        let a = world.spawn(Actor::new(ActorCore::default(), ()));
        let b = world.spawn(Actor::new(ActorCore::default(), ()));
        let order = |w: &SimulationWorld<SimplePhysics>| w.actors().iter().map(|a| a.core().id()).collect::<Vec<_>>();
        assert_eq!(order(&world), [a, b]);

        assert!(world.set_z_order(b, -5));
        assert_eq!(order(&world), [b, a]);
        assert!(!world.actor(b).unwrap().core().is_z_dirty());
        assert!(!world.set_z_order(ActorId(99), 1));
    }

    #[test]
    fn test_unusable_step_falls_back_to_default() {
        let mut world = SimulationWorld::simple(settings(0.0));
        assert_eq!(world.settings().physics_step, crate::consts::PHYSICS_STEP);
        let steps = world.update(0.1);
        assert!(steps > 0 && steps <= 30, "{} steps", steps);

        let world = SimulationWorld::simple(settings(f32::NAN));
        assert_eq!(world.settings().physics_step, crate::consts::PHYSICS_STEP);
    }

    #[test]
    fn test_focus_and_events_from_actors() {
        struct Player;
        impl Behavior for Player {
            fn added(&mut self, ctx: &mut ActorCtx<'_, Self>) {
                ctx.core.request_focus();
            }

            fn act(&mut self, ctx: &mut ActorCtx<'_, Self>, _delta: f32) {
                ctx.core.post_event(Cue::new("step", Vec2::ZERO));
            }
        }
        let mut world = world();
        let id = world.spawn(Actor::new(ActorCore::default(), Player));
        world.update(1.0 / 32.0);
        assert_eq!(world.keyboard_focus(), Some(id));

        let mut cues = 0;
        world.poll_events(|_: Cue| cues += 1);
        assert_eq!(cues, 2);

        world.transition(GameState::Game);
        assert_eq!(world.keyboard_focus(), None);
    }

    #[test]
    fn test_step_cap_drops_backlog() {
        let mut settings = settings(1.0 / 64.0);
        settings.max_steps_per_update = Some(4);
        let mut world = SimulationWorld::simple(settings);
        world.reset();
        assert_eq!(world.update(1.0), 4);
        assert_eq!(world.update(0.0), 0);
    }

    fn spatial_world() -> (SimulationWorld<SimplePhysics>, BodyHandle, BodyHandle, BodyHandle) {
        let mut world = world();
        let physics = world.physics_mut();
        let floor = physics.create_body(&BodyDef::fixed(Vec2::ZERO).with_shapes([ShapeDescriptor::rect(1.0, 1.0)]));
        let trigger = physics.create_body(
            &BodyDef::fixed(Vec2::new(10.0, 0.0))
                .with_fixture(FixtureDef::from_descriptor(ShapeDescriptor::circle(1.0)).sensor()),
        );
        let ball = physics.create_body(
            &BodyDef::new(BodyKind::Dynamic, Vec2::new(0.4, 0.0)).with_shapes([ShapeDescriptor::circle(0.25)]),
        );
        (world, floor, trigger, ball)
    }

    #[test]
    fn test_nearest_body_by_distance_then_dynamic() {
        let (world, floor, _, ball) = spatial_world();
        assert_eq!(world.nearest_body(Vec2::ZERO, 1.0, None), Some(floor));
        assert_eq!(world.nearest_body(Vec2::new(0.4, 0.0), 1.0, None), Some(ball));
        // Equidistant from both
        assert_eq!(world.nearest_body(Vec2::new(0.2, 0.0), 1.0, None), Some(ball));
        assert_eq!(world.nearest_body(Vec2::new(0.2, 0.0), 1.0, Some(ball)), Some(floor));
        assert_eq!(world.nearest_static_body(Vec2::new(0.4, 0.0), 1.0), Some(floor));
        assert_eq!(world.nearest_body_at(Vec2::new(0.0, 0.9)), Some(floor));
    }

    #[test]
    fn test_near_static_beats_far_dynamic() {
        let mut world = world();
        let physics = world.physics_mut();
        let post = physics.create_body(&BodyDef::fixed(Vec2::new(0.05, 0.0)).with_shapes([ShapeDescriptor::rect(0.1, 0.1)]));
        let crate_body = physics.create_body(
            &BodyDef::new(BodyKind::Dynamic, Vec2::new(2.4, 0.0)).with_shapes([ShapeDescriptor::rect(2.0, 0.5)]),
        );
        assert!(world.all_bodies_at(Vec2::ZERO, 1.0).contains(&crate_body));
        assert_eq!(world.nearest_body(Vec2::ZERO, 1.0, None), Some(post));
    }

    #[test]
    fn test_nearest_body_ignores_sensors_and_excluded() {
        let (mut world, _, trigger, _) = spatial_world();
        assert_eq!(world.nearest_body(Vec2::new(10.0, 0.0), 1.0, None), None);
        assert_eq!(world.all_bodies_at(Vec2::new(10.0, 0.0), 1.0), BTreeSet::from([trigger]));

        let ghost = world.physics_mut().create_body(
            &BodyDef::fixed(Vec2::new(-10.0, 0.0)).with_fixture(
                FixtureDef::from_descriptor(ShapeDescriptor::circle(1.0))
                    .with_filter(Filter { category_bits: 1, mask_bits: 0 }),
            ),
        );
        assert_eq!(world.nearest_body(Vec2::new(-10.0, 0.0), 1.0, None), None);
        assert!(world.all_bodies_at(Vec2::new(-10.0, 0.0), 1.0).contains(&ghost));

        let lone = world.physics_mut().create_body(
            &BodyDef::fixed(Vec2::new(0.0, 20.0)).with_shapes([ShapeDescriptor::rect(1.0, 1.0)]),
        );
        assert_eq!(world.nearest_body(Vec2::new(0.0, 20.0), 1.0, Some(lone)), None);
    }

    proptest! {
        #[test]
        fn prop_step_count_depends_only_on_total(units in prop::collection::vec(1u32..=4, 1..200)) {
            // Dyadic deltas of at most one step, summed exactly
            let step = 1.0 / 256.0;
            let mut chunked = SimulationWorld::simple(settings(step));
            let mut steps = 0;
            for unit in &units {
                steps += chunked.update(*unit as f32 / 1024.0);
            }

            let total: u32 = units.iter().sum();
            let mut single = SimulationWorld::simple(settings(step));
            let single_steps = single.update(total as f32 / 1024.0);

            prop_assert_eq!(steps, single_steps);
            prop_assert_eq!(steps, total / 4);
            prop_assert_eq!(chunked.state_time(), single.state_time());
        }
    }
}
