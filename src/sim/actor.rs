//! Actors: lifecycle-managed entities, optionally backed by a physics body
//!
//! An [`Actor`] pairs the shared bookkeeping in [`ActorCore`] with a
//! game-specific [`Behavior`]. The world stores actors type-erased as
//! [`AnyActor`] and drives them through `tick`, `draw` and `remove`.
//!
//! Actors never touch the registry directly. Anything that affects the world
//! (spawning, score, transitions, events) is queued on the core and applied
//! by the world between steps.

use std::any::Any;

use glam::{Affine2, Vec2};

use super::contact::CollisionListener;
use super::tasks::TaskScheduler;
use super::world::{GameState, WorldInfo};
use crate::geom::Shape;
use crate::physics::{BodyDef, BodyHandle, BodyTransform, PhysicsEngine};
use crate::render::{RenderTarget, ScopedTransform};
use crate::{RenderError, Result, SimError};

/// Stable identifier assigned when an actor enters a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u64);

/// Builds an actor once the world is free to create bodies
pub type SpawnFn = Box<dyn FnOnce(&mut dyn PhysicsEngine) -> Result<Box<dyn AnyActor>>>;

/// Deferred request from an actor to its world
pub enum WorldCommand {
    Spawn(SpawnFn),
    AddScore(i64),
    Transition(GameState),
    Event(Box<dyn Any>),
    Impulse(BodyHandle, Vec2),
    Focus,
}

/// Auxiliary resource owned by an actor and released with its body
pub trait Attachment {
    fn release(&mut self, physics: &mut dyn PhysicsEngine);
}

/// Extra body (light, trigger volume) that lives and dies with its actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryBody(pub BodyHandle);

impl Attachment for AuxiliaryBody {
    fn release(&mut self, physics: &mut dyn PhysicsEngine) {
        physics.destroy_body(self.0);
    }
}

/// Where a body-backed actor's spawn point sits relative to its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnAnchor {
    /// Spawn point is the body origin
    #[default]
    Center,
    /// Spawn point is the lower-left corner of the shape bounds
    BottomLeft,
}

/// Screen-space extent derived from a collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorFrame {
    pub size: Vec2,
    /// Offset from the lower-left corner to the body origin
    pub origin: Vec2,
}

impl ActorFrame {
    pub fn from_shape(shape: &Shape) -> Result<Self> {
        match shape {
            Shape::Circle { radius, .. } => Ok(Self {
                size: Vec2::splat(radius * 2.0),
                origin: Vec2::splat(*radius),
            }),
            Shape::Polygon { .. } => {
                let bounds = shape.bounds();
                Ok(Self {
                    size: bounds.size(),
                    origin: -bounds.min,
                })
            }
            other => Err(SimError::UnsupportedShape(other.kind_name())),
        }
    }
}

/// State shared by every actor regardless of behaviour
pub struct ActorCore {
    id: ActorId,
    dead: bool,
    removed: bool,
    state_time: f32,
    z_order: i32,
    z_dirty: bool,
    survives_reset: bool,
    body: Option<BodyHandle>,
    attachments: Vec<Box<dyn Attachment>>,
    /// Lower-left corner in world space
    pub position: Vec2,
    /// Radians
    pub rotation: f32,
    pub scale: Vec2,
    size: Vec2,
    origin: Vec2,
    use_rotation: bool,
    has_acted: bool,
    outbox: Vec<WorldCommand>,
}

impl Default for ActorCore {
    fn default() -> Self {
        Self {
            id: ActorId(0),
            dead: false,
            removed: false,
            state_time: 0.0,
            z_order: 0,
            z_dirty: false,
            survives_reset: false,
            body: None,
            attachments: Vec::new(),
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            size: Vec2::ZERO,
            origin: Vec2::ZERO,
            use_rotation: true,
            has_acted: false,
            outbox: Vec::new(),
        }
    }
}

impl ActorCore {
    /// Purely visual core with the given size, origin at its center
    pub fn visual(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            origin: size * 0.5,
            ..Self::default()
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ActorId) {
        self.id = id;
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Drawable only once it has ticked and until it is removed
    pub fn is_visible(&self) -> bool {
        self.has_acted && !self.removed
    }

    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// World position of the origin point (the body position for body actors)
    pub fn center(&self) -> Vec2 {
        self.position + self.origin
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn set_z_order(&mut self, z_order: i32) {
        if self.z_order != z_order {
            self.z_order = z_order;
            self.z_dirty = true;
        }
    }

    pub(crate) fn is_z_dirty(&self) -> bool {
        self.z_dirty
    }

    pub(crate) fn take_z_dirty(&mut self) -> bool {
        std::mem::take(&mut self.z_dirty)
    }

    pub fn survives_reset(&self) -> bool {
        self.survives_reset
    }

    /// Keep this actor when the world re-enters `Init`
    pub fn set_survives_reset(&mut self, survives: bool) {
        self.survives_reset = survives;
    }

    pub fn use_rotation(&self) -> bool {
        self.use_rotation
    }

    /// When false, the body angle is no longer copied onto the actor
    pub fn set_use_rotation(&mut self, use_rotation: bool) {
        self.use_rotation = use_rotation;
    }

    /// Mark for removal on the next tick. Safe to call repeatedly.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn attach(&mut self, attachment: Box<dyn Attachment>) {
        self.attachments.push(attachment);
    }

    pub fn add_score(&mut self, points: i64) {
        self.outbox.push(WorldCommand::AddScore(points));
    }

    pub fn transition(&mut self, state: GameState) {
        self.outbox.push(WorldCommand::Transition(state));
    }

    pub fn post_event<E: Any>(&mut self, event: E) {
        self.outbox.push(WorldCommand::Event(Box::new(event)));
    }

    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if let Some(body) = self.body {
            self.outbox.push(WorldCommand::Impulse(body, impulse));
        }
    }

    pub fn request_focus(&mut self) {
        self.outbox.push(WorldCommand::Focus);
    }

    /// Add an actor built with access to the physics engine. It becomes
    /// part of the world after the current step.
    pub fn spawn(
        &mut self,
        build: impl FnOnce(&mut dyn PhysicsEngine) -> Result<Box<dyn AnyActor>> + 'static,
    ) {
        self.outbox.push(WorldCommand::Spawn(Box::new(build)));
    }

    pub fn spawn_actor<B: Behavior>(&mut self, actor: Actor<B>) {
        self.spawn(move |_| Ok(Box::new(actor) as Box<dyn AnyActor>));
    }

    pub(crate) fn take_commands(&mut self) -> Vec<WorldCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Copy the body pose onto the actor
    pub fn sync_from_body(&mut self, physics: &dyn PhysicsEngine) {
        let Some(pose) = self.body.and_then(|b| physics.body_transform(b)) else {
            return;
        };
        self.position = pose.position - self.origin;
        if self.use_rotation {
            self.rotation = pose.angle;
        }
    }

    /// Local drawing transform. With `to_origin` the origin point is (0, 0),
    /// otherwise the lower-left corner is.
    pub fn client_transform(&self, to_origin: bool) -> Affine2 {
        let pivot = Affine2::from_scale_angle_translation(self.scale, self.rotation, self.center());
        if to_origin {
            pivot
        } else {
            pivot * Affine2::from_translation(-self.origin)
        }
    }

    /// Run `draw` in this actor's coordinate system; the target's previous
    /// transform is restored afterwards whether or not `draw` succeeds
    pub fn with_client_transform(
        &self,
        target: &mut dyn RenderTarget,
        to_origin: bool,
        draw: impl FnOnce(&mut dyn RenderTarget) -> std::result::Result<(), RenderError>,
    ) -> std::result::Result<(), RenderError> {
        let mut scope = ScopedTransform::push(target, self.client_transform(to_origin));
        draw(scope.target())
    }
}

/// Handles given to behaviour hooks
pub struct ActorCtx<'a, B: Behavior> {
    pub core: &'a mut ActorCore,
    pub tasks: &'a mut TaskScheduler<Actor<B>>,
    pub physics: &'a mut dyn PhysicsEngine,
    pub world: &'a WorldInfo,
}

/// Game-specific part of an actor
pub trait Behavior: Sized + 'static {
    /// The actor entered a world
    fn added(&mut self, _ctx: &mut ActorCtx<'_, Self>) {}

    /// Per-step update, after the pose sync and task update
    fn act(&mut self, _ctx: &mut ActorCtx<'_, Self>, _delta: f32) {}

    /// The actor was torn down; body and attachments are already gone
    fn removed(&mut self, _core: &mut ActorCore) {}

    fn draw(
        &self,
        _core: &ActorCore,
        _physics: &dyn PhysicsEngine,
        _target: &mut dyn RenderTarget,
    ) -> std::result::Result<(), RenderError> {
        Ok(())
    }

    /// Contact callbacks, for behaviours that want them
    fn collision_listener(&mut self) -> Option<&mut dyn CollisionListener> {
        None
    }
}

/// Props: no behaviour beyond the core
impl Behavior for () {}

/// An actor: shared core, its own task queue, and a behaviour
pub struct Actor<B: Behavior> {
    pub core: ActorCore,
    pub tasks: TaskScheduler<Actor<B>>,
    pub behavior: B,
}

impl<B: Behavior> Actor<B> {
    /// Actor without a body
    pub fn new(core: ActorCore, behavior: B) -> Self {
        Self {
            core,
            tasks: TaskScheduler::new(),
            behavior,
        }
    }

    /// Create the body described by `def` and size the actor from its first
    /// fixture. Fails before creating anything if that shape cannot size an
    /// actor.
    pub fn with_body(
        physics: &mut dyn PhysicsEngine,
        def: &BodyDef,
        anchor: SpawnAnchor,
        behavior: B,
    ) -> Result<Self> {
        let first = def
            .fixtures
            .first()
            .ok_or(SimError::UnsupportedShape("empty"))?;
        let frame = ActorFrame::from_shape(&first.shape.shape)?;

        let body = physics.create_body(def);
        if anchor == SpawnAnchor::BottomLeft {
            physics.set_body_transform(
                body,
                BodyTransform {
                    position: def.position + frame.origin,
                    angle: def.angle,
                },
            );
        }

        let mut core = ActorCore {
            body: Some(body),
            size: frame.size,
            origin: frame.origin,
            ..ActorCore::default()
        };
        core.sync_from_body(physics);
        Ok(Self::new(core, behavior))
    }
}

/// Type-erased actor as stored by the world
pub trait AnyActor {
    fn core(&self) -> &ActorCore;
    fn core_mut(&mut self) -> &mut ActorCore;

    fn added(&mut self, physics: &mut dyn PhysicsEngine, world: &WorldInfo);

    /// One simulation step. A dead actor removes itself instead of acting.
    fn tick(&mut self, delta: f32, physics: &mut dyn PhysicsEngine, world: &WorldInfo);

    /// Tear down once: destroy the body, release attachments in order, run
    /// the removal hook. Returns whether this call did the teardown.
    fn remove(&mut self, physics: &mut dyn PhysicsEngine) -> bool;

    fn draw(&self, physics: &dyn PhysicsEngine, target: &mut dyn RenderTarget) -> std::result::Result<(), RenderError>;

    fn collision_listener(&mut self) -> Option<(&mut ActorCore, &mut dyn CollisionListener)>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<B: Behavior> AnyActor for Actor<B> {
    fn core(&self) -> &ActorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActorCore {
        &mut self.core
    }

    fn added(&mut self, physics: &mut dyn PhysicsEngine, world: &WorldInfo) {
        let Actor { core, tasks, behavior } = self;
        let mut ctx = ActorCtx {
            core,
            tasks,
            physics,
            world,
        };
        behavior.added(&mut ctx);
    }

    fn tick(&mut self, delta: f32, physics: &mut dyn PhysicsEngine, world: &WorldInfo) {
        if self.core.dead {
            self.remove(physics);
            return;
        }
        self.core.state_time += delta;
        self.core.sync_from_body(physics);
        TaskScheduler::update_within(self, delta, |actor| &mut actor.tasks);

        let Actor { core, tasks, behavior } = self;
        let mut ctx = ActorCtx {
            core,
            tasks,
            physics,
            world,
        };
        behavior.act(&mut ctx, delta);
        self.core.has_acted = true;
    }

    fn remove(&mut self, physics: &mut dyn PhysicsEngine) -> bool {
        if self.core.removed {
            return false;
        }
        self.core.removed = true;
        self.core.dead = true;
        if let Some(body) = self.core.body.take() {
            physics.destroy_body(body);
        }
        for mut attachment in self.core.attachments.drain(..) {
            attachment.release(physics);
        }
        self.tasks.clear();
        self.behavior.removed(&mut self.core);
        log::debug!("Removed actor {:?}", self.core.id);
        true
    }

    fn draw(&self, physics: &dyn PhysicsEngine, target: &mut dyn RenderTarget) -> std::result::Result<(), RenderError> {
        if !self.core.is_visible() {
            return Ok(());
        }
        self.behavior.draw(&self.core, physics, target)
    }

    fn collision_listener(&mut self) -> Option<(&mut ActorCore, &mut dyn CollisionListener)> {
        let Actor { core, behavior, .. } = self;
        behavior.collision_listener().map(|listener| (core, listener))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
