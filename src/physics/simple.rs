//! Small deterministic reference engine
//!
//! Bodies live in a `BTreeMap` keyed by handle so every iteration (broad
//! phase, solver, queries) runs in handle order. Contacts are discrete:
//! overlap is tested at the start of each step, resolved with sequential
//! impulses, then positions are nudged apart.

use std::collections::BTreeMap;

use glam::Vec2;

use super::{
    BodyDef, BodyHandle, BodyKind, BodyTransform, ContactEvent, ContactInfo, FixtureDef,
    FixtureView, Manifold, PhysicsEngine,
};
use crate::geom::{Aabb, Shape};
use crate::{normalize_angle, rotate};

/// Penetration allowed before positional correction kicks in
const LINEAR_SLOP: f32 = 0.005;
/// Fraction of the remaining penetration removed per position iteration
const BAUMGARTE: f32 = 0.2;

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    position: Vec2,
    angle: f32,
    linear_velocity: Vec2,
    angular_velocity: f32,
    linear_damping: f32,
    angular_damping: f32,
    inv_mass: f32,
    fixtures: Vec<FixtureDef>,
}

impl Body {
    fn from_def(def: &BodyDef) -> Self {
        let inv_mass = match def.kind {
            BodyKind::Dynamic => {
                let mass: f32 = def.fixtures.iter().map(|f| f.density * f.shape.shape.area()).sum();
                if mass > 0.0 { 1.0 / mass } else { 1.0 }
            }
            _ => 0.0,
        };
        Self {
            kind: def.kind,
            position: def.position,
            angle: def.angle,
            linear_velocity: def.linear_velocity,
            angular_velocity: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            inv_mass,
            fixtures: def.fixtures.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FixtureKey {
    body: BodyHandle,
    index: usize,
}

type PairKey = (FixtureKey, FixtureKey);

#[derive(Debug, Clone)]
struct LiveContact {
    sensor: bool,
    manifold: Option<Manifold>,
}

/// Convex piece of a fixture in world space
#[derive(Debug, Clone)]
enum Part {
    /// Counter-clockwise polygon, or a 2-point segment
    Convex(Vec<Vec2>),
    Circle(Vec2, f32),
}

/// Reference rigid-body engine used by tests and the demo
#[derive(Debug)]
pub struct SimplePhysics {
    gravity: Vec2,
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u32,
    contacts: BTreeMap<PairKey, LiveContact>,
    events: Vec<ContactEvent>,
}

impl SimplePhysics {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            next_handle: 0,
            contacts: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn parts(&self, key: FixtureKey) -> Vec<Part> {
        let Some(body) = self.bodies.get(&key.body) else {
            return Vec::new();
        };
        let Some(fixture) = body.fixtures.get(key.index) else {
            return Vec::new();
        };
        let to_world = |v: &Vec2| body.position + rotate(*v, body.angle);
        match &fixture.shape.shape {
            Shape::Circle { center, radius } => vec![Part::Circle(to_world(center), *radius)],
            Shape::Polygon { vertices } => vec![Part::Convex(vertices.iter().map(to_world).collect())],
            Shape::Chain { vertices, closed } => {
                let world: Vec<Vec2> = vertices.iter().map(to_world).collect();
                let mut parts: Vec<Part> =
                    world.windows(2).map(|w| Part::Convex(vec![w[0], w[1]])).collect();
                if *closed && world.len() > 2 {
                    if let (Some(last), Some(first)) = (world.last(), world.first()) {
                        parts.push(Part::Convex(vec![*last, *first]));
                    }
                }
                parts
            }
        }
    }

    fn manifold(&self, pair: PairKey) -> Option<Manifold> {
        let parts_a = self.parts(pair.0);
        let parts_b = self.parts(pair.1);
        let mut best: Option<Manifold> = None;
        for a in &parts_a {
            for b in &parts_b {
                if let Some(m) = collide(a, b) {
                    if best.as_ref().is_none_or(|cur| m.depth > cur.depth) {
                        best = Some(m);
                    }
                }
            }
        }
        best
    }

    /// Overlapping fixture pairs at the current poses
    fn find_contacts(&self) -> BTreeMap<PairKey, LiveContact> {
        let mut proxies = Vec::new();
        for (&handle, body) in &self.bodies {
            for (index, fixture) in body.fixtures.iter().enumerate() {
                let bounds = fixture.shape.shape.world_bounds(body.position, body.angle);
                proxies.push((FixtureKey { body: handle, index }, body.kind, fixture, bounds));
            }
        }

        let mut found = BTreeMap::new();
        for (i, (ka, kind_a, fa, ba)) in proxies.iter().enumerate() {
            for (kb, kind_b, fb, bb) in &proxies[i + 1..] {
                if ka.body == kb.body
                    || (*kind_a != BodyKind::Dynamic && *kind_b != BodyKind::Dynamic)
                    || !fa.filter.should_collide(&fb.filter)
                    || !ba.overlaps(bb)
                {
                    continue;
                }
                let Some(manifold) = self.manifold((*ka, *kb)) else {
                    continue;
                };
                let sensor = fa.sensor || fb.sensor;
                found.insert(
                    (*ka, *kb),
                    LiveContact {
                        sensor,
                        manifold: (!sensor).then_some(manifold),
                    },
                );
            }
        }
        found
    }

    fn material(&self, key: FixtureKey) -> (f32, f32) {
        self.bodies
            .get(&key.body)
            .and_then(|b| b.fixtures.get(key.index))
            .map(|f| (f.friction, f.restitution))
            .unwrap_or((0.0, 0.0))
    }

    fn inv_masses(&self, pair: PairKey) -> (f32, f32) {
        let inv = |h: BodyHandle| self.bodies.get(&h).map_or(0.0, |b| b.inv_mass);
        (inv(pair.0.body), inv(pair.1.body))
    }

    /// One sequential-impulse pass over a contact; returns the normal impulse applied
    fn solve_velocity(&mut self, pair: PairKey, manifold: &Manifold) -> f32 {
        let (ia, ib) = self.inv_masses(pair);
        if ia + ib == 0.0 {
            return 0.0;
        }
        let (friction_a, restitution_a) = self.material(pair.0);
        let (friction_b, restitution_b) = self.material(pair.1);
        let velocity = |h: BodyHandle| self.bodies.get(&h).map_or(Vec2::ZERO, |b| b.linear_velocity);
        let mut va = velocity(pair.0.body);
        let mut vb = velocity(pair.1.body);

        let n = manifold.normal;
        let relative = vb - va;
        let vn = relative.dot(n);
        if vn >= 0.0 {
            return 0.0;
        }
        let restitution = restitution_a.max(restitution_b);
        let j = -(1.0 + restitution) * vn / (ia + ib);
        va -= n * j * ia;
        vb += n * j * ib;

        let relative = vb - va;
        let tangent = relative - n * relative.dot(n);
        if tangent.length_squared() > 1e-12 {
            let t = tangent.normalize();
            let mu = (friction_a * friction_b).sqrt();
            let jt = (-relative.dot(t) / (ia + ib)).clamp(-mu * j, mu * j);
            va -= t * jt * ia;
            vb += t * jt * ib;
        }

        if let Some(body) = self.bodies.get_mut(&pair.0.body) {
            body.linear_velocity = va;
        }
        if let Some(body) = self.bodies.get_mut(&pair.1.body) {
            body.linear_velocity = vb;
        }
        j
    }

    fn solve_position(&mut self, pair: PairKey) {
        let (ia, ib) = self.inv_masses(pair);
        if ia + ib == 0.0 {
            return;
        }
        let Some(manifold) = self.manifold(pair) else {
            return;
        };
        let correction = (manifold.depth - LINEAR_SLOP).max(0.0) * BAUMGARTE / (ia + ib);
        if correction == 0.0 {
            return;
        }
        if let Some(body) = self.bodies.get_mut(&pair.0.body) {
            body.position -= manifold.normal * correction * ia;
        }
        if let Some(body) = self.bodies.get_mut(&pair.1.body) {
            body.position += manifold.normal * correction * ib;
        }
    }
}

impl Default for SimplePhysics {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, -9.81))
    }
}

impl PhysicsEngine for SimplePhysics {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, Body::from_def(def));
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        if self.bodies.remove(&body).is_none() {
            return false;
        }
        let ended: Vec<PairKey> = self
            .contacts
            .keys()
            .filter(|(a, b)| a.body == body || b.body == body)
            .copied()
            .collect();
        for pair in ended {
            self.contacts.remove(&pair);
            let side = |h: BodyHandle| (h != body).then_some(h);
            self.events.push(ContactEvent::End {
                a: side(pair.0.body),
                b: side(pair.1.body),
            });
        }
        true
    }

    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            body.linear_velocity += gravity * dt;
            body.linear_velocity *= 1.0 / (1.0 + dt * body.linear_damping);
            body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
        }

        let current = self.find_contacts();
        for (pair, contact) in &current {
            if !self.contacts.contains_key(pair) {
                self.events.push(ContactEvent::Begin {
                    a: pair.0.body,
                    b: pair.1.body,
                    manifold: contact.manifold.clone(),
                });
            }
        }
        for pair in self.contacts.keys() {
            if !current.contains_key(pair) {
                self.events.push(ContactEvent::End {
                    a: Some(pair.0.body),
                    b: Some(pair.1.body),
                });
            }
        }

        let solid: Vec<(PairKey, Manifold)> = current
            .iter()
            .filter_map(|(pair, c)| c.manifold.clone().map(|m| (*pair, m)))
            .collect();
        let mut impulses = vec![0.0f32; solid.len()];
        for _ in 0..velocity_iterations {
            for (i, (pair, manifold)) in solid.iter().enumerate() {
                impulses[i] += self.solve_velocity(*pair, manifold);
            }
        }

        for body in self.bodies.values_mut() {
            if body.kind == BodyKind::Static {
                continue;
            }
            body.position += body.linear_velocity * dt;
            body.angle = normalize_angle(body.angle + body.angular_velocity * dt);
        }

        for _ in 0..position_iterations {
            for (pair, _) in &solid {
                self.solve_position(*pair);
            }
        }

        for ((pair, manifold), total) in solid.iter().zip(&impulses) {
            let (ia, ib) = self.inv_masses(*pair);
            if ia + ib == 0.0 {
                continue;
            }
            let count = manifold.points.len().max(1);
            self.events.push(ContactEvent::PostSolve {
                a: pair.0.body,
                b: pair.1.body,
                normal_impulses: vec![*total / count as f32; count],
            });
        }

        log::trace!("physics step: {} bodies, {} contacts", self.bodies.len(), current.len());
        self.contacts = current;
    }

    fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    fn contacts(&self) -> Vec<ContactInfo> {
        self.contacts
            .iter()
            .map(|(pair, c)| ContactInfo {
                body_a: pair.0.body,
                body_b: pair.1.body,
                sensor: c.sensor,
                manifold: c.manifold.clone(),
            })
            .collect()
    }

    fn query_aabb(&self, area: Aabb) -> Vec<FixtureView> {
        let mut found = Vec::new();
        for (&handle, body) in &self.bodies {
            for (index, fixture) in body.fixtures.iter().enumerate() {
                if fixture.shape.shape.world_bounds(body.position, body.angle).overlaps(&area) {
                    found.push(FixtureView {
                        body: handle,
                        fixture_index: index,
                        body_kind: body.kind,
                        body_position: body.position,
                        sensor: fixture.sensor,
                        filter: fixture.filter,
                    });
                }
            }
        }
        found
    }

    fn body_transform(&self, body: BodyHandle) -> Option<BodyTransform> {
        self.bodies.get(&body).map(|b| BodyTransform {
            position: b.position,
            angle: b.angle,
        })
    }

    fn set_body_transform(&mut self, body: BodyHandle, transform: BodyTransform) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.position = transform.position;
            b.angle = transform.angle;
        }
    }

    fn body_kind(&self, body: BodyHandle) -> Option<BodyKind> {
        self.bodies.get(&body).map(|b| b.kind)
    }

    fn body_fixtures(&self, body: BodyHandle) -> Option<&[FixtureDef]> {
        self.bodies.get(&body).map(|b| b.fixtures.as_slice())
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.linear_velocity)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.kind != BodyKind::Static {
                b.linear_velocity = velocity;
            }
        }
    }

    fn apply_linear_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.linear_velocity += impulse * b.inv_mass;
        }
    }
}

fn collide(a: &Part, b: &Part) -> Option<Manifold> {
    match (a, b) {
        (Part::Circle(ca, ra), Part::Circle(cb, rb)) => circle_circle(*ca, *ra, *cb, *rb),
        (Part::Convex(pa), Part::Convex(pb)) => polygon_polygon(pa, pb),
        (Part::Convex(poly), Part::Circle(c, r)) => polygon_circle(poly, *c, *r),
        (Part::Circle(c, r), Part::Convex(poly)) => polygon_circle(poly, *c, *r).map(|m| Manifold {
            normal: -m.normal,
            ..m
        }),
    }
}

fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Manifold> {
    let d = cb - ca;
    let dist = d.length();
    if dist >= ra + rb {
        return None;
    }
    let normal = if dist > 1e-6 { d / dist } else { Vec2::Y };
    Some(Manifold {
        normal,
        points: vec![ca + normal * ra],
        depth: ra + rb - dist,
    })
}

fn polygon_circle(poly: &[Vec2], center: Vec2, radius: f32) -> Option<Manifold> {
    let n = poly.len();
    if n < 2 {
        return None;
    }
    let edge_count = if n == 2 { 1 } else { n };

    let mut inside = n >= 3;
    let mut closest = poly[0];
    let mut closest_dist = f32::MAX;
    let mut shallowest_edge = (f32::MAX, Vec2::ZERO);
    for i in 0..edge_count {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let q = closest_on_segment(center, a, b);
        let dist = (center - q).length();
        if dist < closest_dist {
            closest_dist = dist;
            closest = q;
        }
        if n >= 3 {
            let Some(outward) = (b - a).perp().try_normalize().map(|p| -p) else {
                continue;
            };
            let signed = (center - a).dot(outward);
            if signed > 0.0 {
                inside = false;
            }
            if -signed < shallowest_edge.0 {
                shallowest_edge = (-signed, outward);
            }
        }
    }

    if inside {
        let (dist, outward) = shallowest_edge;
        return Some(Manifold {
            normal: outward,
            points: vec![center + outward * dist],
            depth: radius + dist,
        });
    }
    if closest_dist >= radius {
        return None;
    }
    let normal = if closest_dist > 1e-6 {
        (center - closest) / closest_dist
    } else {
        (poly[1] - poly[0]).perp().try_normalize().map_or(Vec2::Y, |p| -p)
    };
    Some(Manifold {
        normal,
        points: vec![closest],
        depth: radius - closest_dist,
    })
}

fn polygon_polygon(a: &[Vec2], b: &[Vec2]) -> Option<Manifold> {
    let mut depth = f32::MAX;
    let mut axis = Vec2::ZERO;
    for candidate in edge_normals(a).chain(edge_normals(b)) {
        let (min_a, max_a) = project(a, candidate);
        let (min_b, max_b) = project(b, candidate);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < depth {
            depth = overlap;
            axis = candidate;
        }
    }
    if axis == Vec2::ZERO {
        return None;
    }
    if (average(b) - average(a)).dot(axis) < 0.0 {
        axis = -axis;
    }

    // Vertices of B pushed deepest into A along the normal
    let (min_b, _) = project(b, axis);
    let mut points: Vec<Vec2> = b
        .iter()
        .copied()
        .filter(|v| v.dot(axis) <= min_b + LINEAR_SLOP)
        .collect();
    points.truncate(2);
    Some(Manifold {
        normal: axis,
        points,
        depth,
    })
}

fn edge_normals(poly: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    let n = poly.len();
    let edges = if n == 2 { 1 } else { n };
    (0..edges).filter_map(move |i| (poly[(i + 1) % n] - poly[i]).perp().try_normalize())
}

fn project(poly: &[Vec2], axis: Vec2) -> (f32, f32) {
    poly.iter()
        .map(|v| v.dot(axis))
        .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

fn average(poly: &[Vec2]) -> Vec2 {
    poly.iter().copied().sum::<Vec2>() / poly.len().max(1) as f32
}

fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    a + ab * ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{PhysicalProps, ShapeDescriptor};
    use crate::physics::{Filter, FixtureDef};

    const DT: f32 = 1.0 / 300.0;

    fn ground(physics: &mut SimplePhysics) -> BodyHandle {
        physics.create_body(&BodyDef::fixed(Vec2::ZERO).with_shapes([ShapeDescriptor::rect(10.0, 0.5)]))
    }

    fn ball(physics: &mut SimplePhysics, at: Vec2) -> BodyHandle {
        physics.create_body(
            &BodyDef::new(BodyKind::Dynamic, at).with_shapes([ShapeDescriptor::circle(0.5)]),
        )
    }

    fn run(physics: &mut SimplePhysics, steps: usize) {
        for _ in 0..steps {
            physics.step(DT, 6, 3);
        }
    }

    #[test]
    fn test_free_fall() {
        let mut physics = SimplePhysics::default();
        let b = ball(&mut physics, Vec2::new(0.0, 10.0));
        run(&mut physics, 300);
        let t = physics.body_transform(b).unwrap();
        // One second of fall under 9.81 covers roughly 4.9 units
        assert!((10.0 - t.position.y - 4.9).abs() < 0.1, "y = {}", t.position.y);
    }

    #[test]
    fn test_ball_comes_to_rest_on_ground() {
        let mut physics = SimplePhysics::default();
        ground(&mut physics);
        let b = ball(&mut physics, Vec2::new(0.0, 1.5));
        run(&mut physics, 900);
        let t = physics.body_transform(b).unwrap();
        assert!((t.position.y - 1.0).abs() < 0.05, "y = {}", t.position.y);

        let events = physics.drain_contact_events();
        let begins = events.iter().filter(|e| matches!(e, ContactEvent::Begin { .. })).count();
        assert_eq!(begins, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            ContactEvent::PostSolve { normal_impulses, .. } if normal_impulses.iter().any(|j| *j > 0.0)
        )));
    }

    #[test]
    fn test_manifold_normal_points_from_a_to_b() {
        let mut physics = SimplePhysics::default();
        let g = ground(&mut physics);
        ball(&mut physics, Vec2::new(0.0, 0.9));
        physics.step(DT, 6, 3);
        let begin = physics
            .drain_contact_events()
            .into_iter()
            .find_map(|e| match e {
                ContactEvent::Begin { a, manifold, .. } => Some((a, manifold)),
                _ => None,
            })
            .unwrap();
        assert_eq!(begin.0, g);
        let manifold = begin.1.unwrap();
        assert!(manifold.normal.y > 0.99);
        assert_eq!(manifold.points.len(), 1);
    }

    #[test]
    fn test_box_rests_on_box() {
        let mut physics = SimplePhysics::default();
        ground(&mut physics);
        let crate_box = physics.create_body(
            &BodyDef::new(BodyKind::Dynamic, Vec2::new(0.0, 1.2)).with_shapes([ShapeDescriptor::rect(0.5, 0.5)]),
        );
        run(&mut physics, 900);
        let t = physics.body_transform(crate_box).unwrap();
        assert!((t.position.y - 1.0).abs() < 0.05, "y = {}", t.position.y);
    }

    #[test]
    fn test_restitution_bounces() {
        let mut physics = SimplePhysics::default();
        ground(&mut physics);
        let bouncy = ShapeDescriptor::circle(0.5).with_props(Some(PhysicalProps::new(0.0, 1.0, 1.0)));
        let b = physics.create_body(&BodyDef::new(BodyKind::Dynamic, Vec2::new(0.0, 3.0)).with_shapes([bouncy]));
        let mut max_up = 0.0f32;
        for _ in 0..600 {
            physics.step(DT, 6, 3);
            max_up = max_up.max(physics.linear_velocity(b).unwrap().y);
        }
        assert!(max_up > 3.0, "max upward speed {}", max_up);
    }

    #[test]
    fn test_sensor_contact_has_no_manifold_and_no_response() {
        let mut physics = SimplePhysics::new(Vec2::ZERO);
        let sensor = physics.create_body(
            &BodyDef::fixed(Vec2::ZERO).with_fixture(FixtureDef::from_descriptor(ShapeDescriptor::rect(1.0, 1.0)).sensor()),
        );
        let b = physics.create_body(
            &BodyDef::new(BodyKind::Dynamic, Vec2::ZERO)
                .with_shapes([ShapeDescriptor::circle(0.5)])
                .with_velocity(Vec2::new(1.0, 0.0)),
        );
        physics.step(DT, 6, 3);
        let events = physics.drain_contact_events();
        assert_eq!(
            events,
            vec![ContactEvent::Begin {
                a: sensor,
                b,
                manifold: None
            }]
        );
        assert_eq!(physics.linear_velocity(b), Some(Vec2::new(1.0, 0.0)));
        assert!(physics.contacts()[0].sensor);
    }

    #[test]
    fn test_destroy_mid_contact_ends_with_invalidated_side() {
        let mut physics = SimplePhysics::default();
        let g = ground(&mut physics);
        let b = ball(&mut physics, Vec2::new(0.0, 0.95));
        physics.step(DT, 6, 3);
        physics.drain_contact_events();
        assert!(physics.destroy_body(b));
        assert!(!physics.destroy_body(b));
        assert_eq!(
            physics.drain_contact_events(),
            vec![ContactEvent::End { a: Some(g), b: None }]
        );
        assert!(physics.contacts().is_empty());
    }

    #[test]
    fn test_separation_ends_contact() {
        let mut physics = SimplePhysics::new(Vec2::ZERO);
        ground(&mut physics);
        let b = ball(&mut physics, Vec2::new(0.0, 0.95));
        physics.step(DT, 6, 3);
        physics.set_body_transform(b, BodyTransform { position: Vec2::new(0.0, 5.0), angle: 0.0 });
        physics.drain_contact_events();
        physics.step(DT, 6, 3);
        let events = physics.drain_contact_events();
        assert!(matches!(events[..], [ContactEvent::End { a: Some(_), b: Some(_) }]));
    }

    #[test]
    fn test_zero_mask_never_collides() {
        let mut physics = SimplePhysics::default();
        ground(&mut physics);
        let ghost = FixtureDef::from_descriptor(ShapeDescriptor::circle(0.5)).with_filter(Filter {
            category_bits: 1,
            mask_bits: 0,
        });
        let b = physics.create_body(&BodyDef::new(BodyKind::Dynamic, Vec2::new(0.0, 1.0)).with_fixture(ghost));
        run(&mut physics, 300);
        assert!(physics.drain_contact_events().is_empty());
        assert!(physics.body_transform(b).unwrap().position.y < -1.0);
    }

    #[test]
    fn test_chain_supports_ball() {
        let mut physics = SimplePhysics::default();
        physics.create_body(&BodyDef::fixed(Vec2::ZERO).with_shapes([ShapeDescriptor::chain(
            vec![Vec2::new(-5.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0)],
            false,
        )]));
        let b = ball(&mut physics, Vec2::new(0.0, 1.0));
        run(&mut physics, 900);
        assert!((physics.body_transform(b).unwrap().position.y - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_query_aabb_in_handle_order() {
        let mut physics = SimplePhysics::default();
        let g = ground(&mut physics);
        let b = ball(&mut physics, Vec2::new(0.0, 1.0));
        let hits = physics.query_aabb(Aabb::around(Vec2::new(0.0, 0.6), Vec2::splat(0.2)));
        let bodies: Vec<BodyHandle> = hits.iter().map(|f| f.body).collect();
        assert_eq!(bodies, vec![g, b]);
        assert!(physics.query_aabb(Aabb::around(Vec2::new(50.0, 50.0), Vec2::ONE)).is_empty());
    }
}
