//! Stagehand demo
//!
//! Loads the bundled level, drops the marked balls into it and runs the
//! fixed-step world until a ball reaches the goal or the round times out.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use stagehand::geom::{Aabb, GeometryCompiler, ShapeDescriptor};
use stagehand::physics::{BodyDef, BodyHandle, FixtureDef, PhysicsEngine, SimplePhysics};
use stagehand::render::{DisplayList, RenderTarget, colors, draw_body};
use stagehand::sim::{
    Actor, ActorCore, ActorCtx, ActorListener, AnyActor, AuxiliaryBody, Behavior, CollisionListener, Counterpart, Cue,
    GameRules, GameState, GroundSensor, SimulationWorld, SpawnAnchor,
};
use stagehand::svg::{VectorElement, VectorLayer};
use stagehand::{RenderError, Result, SimSettings};

const LEVEL: &str = include_str!("../assets/demo_level.json");
/// Document units to meters
const WORLD_SCALE: f32 = 0.05;
const FRAME: f32 = 1.0 / 60.0;
const ROUND_SECONDS: f32 = 20.0;
const SEED: u64 = 0x5eed;
/// Impulse that counts as a hard landing
const HARD_HIT: f32 = 0.5;

/// Static level geometry; its bodies go away with it on reset
#[derive(Default)]
struct Scenery {
    bodies: Vec<BodyHandle>,
}

impl Behavior for Scenery {
    fn draw(
        &self,
        _core: &ActorCore,
        physics: &dyn PhysicsEngine,
        target: &mut dyn RenderTarget,
    ) -> std::result::Result<(), RenderError> {
        for body in &self.bodies {
            draw_body(physics, *body, target, colors::STATIC)?;
        }
        Ok(())
    }
}

struct Ball {
    ground: GroundSensor,
    color: [f32; 4],
    landed: bool,
}

impl Ball {
    fn new(color: [f32; 4]) -> Self {
        Self {
            ground: GroundSensor::new(),
            color,
            landed: false,
        }
    }
}

impl Behavior for Ball {
    fn act(&mut self, ctx: &mut ActorCtx<'_, Self>, delta: f32) {
        let Some(body) = ctx.core.body() else {
            return;
        };
        self.ground.update(&*ctx.physics, body, delta);
        if self.ground.is_touching_floor() {
            if !self.landed {
                self.landed = true;
                ctx.core.post_event(Cue::new("landed", ctx.core.center()));
            }
            // Keep rolling towards the goal
            ctx.core.apply_impulse(Vec2::new(0.002, 0.0));
        }
        if ctx.core.center().y < -5.0 {
            ctx.core.kill();
        }
    }

    fn draw(
        &self,
        core: &ActorCore,
        physics: &dyn PhysicsEngine,
        target: &mut dyn RenderTarget,
    ) -> std::result::Result<(), RenderError> {
        match core.body() {
            Some(body) => draw_body(physics, body, target, self.color),
            None => Ok(()),
        }
    }

    fn collision_listener(&mut self) -> Option<&mut dyn CollisionListener> {
        Some(self)
    }
}

impl CollisionListener for Ball {
    fn begin_contact(
        &mut self,
        core: &mut ActorCore,
        _me: BodyHandle,
        _other: Counterpart,
        _normal: Vec2,
        point: Option<Vec2>,
    ) {
        if let Some(point) = point {
            core.post_event(Cue::new("bounce", point));
        }
    }

    fn hit(&mut self, core: &mut ActorCore, impulse: f32) {
        if impulse > HARD_HIT {
            core.add_score(1);
        }
    }
}

/// Sensor region that ends the round when a ball enters
struct Goal {
    color: [f32; 4],
}

impl Behavior for Goal {
    fn draw(
        &self,
        core: &ActorCore,
        _physics: &dyn PhysicsEngine,
        target: &mut dyn RenderTarget,
    ) -> std::result::Result<(), RenderError> {
        let size = core.size();
        let outline = [Vec2::ZERO, Vec2::new(size.x, 0.0), size, Vec2::new(0.0, size.y)];
        core.with_client_transform(target, false, |target| target.fill_polygon(&outline, self.color))
    }

    fn collision_listener(&mut self) -> Option<&mut dyn CollisionListener> {
        Some(self)
    }
}

impl CollisionListener for Goal {
    fn begin_contact(
        &mut self,
        core: &mut ActorCore,
        _me: BodyHandle,
        other: Counterpart,
        _normal: Vec2,
        _point: Option<Vec2>,
    ) {
        if other.actor.is_some() {
            core.add_score(10);
            core.transition(GameState::Victory);
        }
    }
}

struct Census;

impl ActorListener for Census {
    fn actor_added(&mut self, actor: &dyn AnyActor) {
        log::debug!("+ actor {:?} at {}", actor.core().id(), actor.core().center());
    }

    fn actor_removed(&mut self, actor: &dyn AnyActor) {
        log::debug!("- actor {:?} after {:.2}s", actor.core().id(), actor.core().state_time());
    }
}

struct DemoRules {
    level: VectorElement,
    rng: Pcg32,
}

impl DemoRules {
    fn build_level(&mut self, world: &mut SimulationWorld<SimplePhysics>) -> Result<()> {
        let mut root = VectorLayer::root(&self.level)?;
        root.apply_scale(WORLD_SCALE);

        let mut compiler = GeometryCompiler::new(world.settings().flatness);
        let mut defs = Vec::new();
        root.layer_by_label("terrain")?.create_bodies(&mut compiler, &mut defs)?;
        let mut scenery = Actor::new(ActorCore::default(), Scenery::default());
        for def in &defs {
            let body = world.physics_mut().create_body(def);
            scenery.core.attach(Box::new(AuxiliaryBody(body)));
            scenery.behavior.bodies.push(body);
        }
        scenery.core.set_z_order(-1);
        world.spawn(scenery);
        log::info!("Level built: {} static bodies", defs.len());

        let markers = root.layer_by_label("markers")?;
        for ball in markers.circles_by_prefix("ball_")? {
            let jitter = Vec2::new(self.rng.random_range(-0.2..0.2), 0.0);
            let def = BodyDef::dynamic_actor(ball.value.center + jitter, ShapeDescriptor::circle(ball.value.radius));
            let color = ball.color;
            let id = world.spawn_with(|physics| Actor::with_body(physics, &def, SpawnAnchor::Center, Ball::new(color)))?;
            log::debug!("Ball '{}' is {:?}", ball.name, id);
        }
        for goal in markers.rects_by_prefix("goal")? {
            let Some(area) = Aabb::from_points(&goal.value) else {
                continue;
            };
            let half = area.size() * 0.5;
            let def = BodyDef::fixed(area.center())
                .with_fixture(FixtureDef::from_descriptor(ShapeDescriptor::rect(half.x, half.y)).sensor());
            let color = goal.color;
            world.spawn_with(|physics| Actor::with_body(physics, &def, SpawnAnchor::Center, Goal { color }))?;
        }
        Ok(())
    }
}

impl GameRules<SimplePhysics> for DemoRules {
    fn enter_state(&mut self, world: &mut SimulationWorld<SimplePhysics>, _from: Option<GameState>, to: GameState) {
        match to {
            GameState::PreGame => match self.build_level(world) {
                Ok(()) => world.transition(GameState::Game),
                Err(err) => log::error!("Level failed to load: {}", err),
            },
            GameState::Victory => log::info!("Goal reached after {:.2}s", world.state_time()),
            GameState::Defeat => log::info!("Out of time"),
            _ => {}
        }
    }

    fn update(&mut self, world: &mut SimulationWorld<SimplePhysics>, _delta: f32) {
        if world.is_game_in_progress() && world.state_time() > ROUND_SECONDS {
            world.transition(GameState::Defeat);
        }
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Stagehand demo starting...");

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => SimSettings::load(path)?,
        None => SimSettings::default(),
    };
    let level = VectorElement::from_json_str(LEVEL)?;

    let mut world = SimulationWorld::simple(settings);
    world.set_actor_listener(Box::new(Census));
    world.set_rules(Box::new(DemoRules {
        level,
        rng: Pcg32::seed_from_u64(SEED),
    }));
    world.reset();

    let mut display = DisplayList::new();
    let mut bounces = 0u32;
    let mut frames = 0u32;
    let max_frames = ((ROUND_SECONDS + 2.0) / FRAME) as u32;
    while !world.is_game_finished() && frames < max_frames {
        world.update(FRAME);
        world.poll_events(|cue: Cue| {
            if cue.name == "bounce" {
                bounces += 1;
            } else {
                log::debug!("{} at {}", cue.name, cue.position);
            }
        });
        frames += 1;

        if frames % 60 == 0 {
            display.clear();
            world.draw(&mut display);
            log::info!(
                "t={:.1}s score={} actors={} vertices={}",
                world.state_time(),
                world.score(),
                world.actors().len(),
                display.vertices().len()
            );
        }
    }

    log::info!(
        "Finished in {:?} after {} frames: score {}, {} bounces",
        world.game_state(),
        frames,
        world.score(),
        bounces
    );
    Ok(())
}
