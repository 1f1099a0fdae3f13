//! Path to convex shape compilation
//!
//! A closed path is flattened, closed explicitly, triangulated and filtered
//! for degenerate triangles. Each surviving triangle becomes one convex
//! polygon in coordinates relative to the subpath's start point.

use glam::{Affine2, Vec2};

use super::flatten::{FlatSegment, PathSegment, flatten};
use super::shape::{PhysicalProps, Shape, ShapeDescriptor};
use super::triangulate::EarClipper;
use crate::consts::{MIN_TRIANGLE_AREA, POINT_EPSILON};
use crate::cross3;

/// Shapes compiled from one closed subpath, anchored at `origin`
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGeometry {
    /// World position the shapes are relative to
    pub origin: Vec2,
    pub shapes: Vec<ShapeDescriptor>,
    /// Triangles rejected as degenerate
    pub rejected: usize,
}

/// Why a triangle was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    CoincidentVertices,
    AreaTooSmall,
}

/// Compiles vector paths into convex collision shapes
#[derive(Debug)]
pub struct GeometryCompiler {
    tolerance: f32,
    clipper: EarClipper,
    flat: Vec<FlatSegment>,
    polygon: Vec<Vec2>,
}

impl GeometryCompiler {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            clipper: EarClipper::new(),
            flat: Vec::new(),
            polygon: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Compile every closed subpath of `segments` after applying `transform`.
    ///
    /// Subpaths that are never closed contribute nothing. A subpath with fewer
    /// than 3 distinct vertices yields geometry with no shapes.
    pub fn compile_path(
        &mut self,
        segments: &[PathSegment],
        transform: &Affine2,
        props: Option<PhysicalProps>,
    ) -> Vec<CompiledGeometry> {
        let transformed: Vec<PathSegment> = segments.iter().map(|s| s.transformed(transform)).collect();
        self.flat.clear();
        flatten(&transformed, self.tolerance, &mut self.flat);

        let flat = std::mem::take(&mut self.flat);
        let mut result = Vec::new();
        let mut start = Vec2::ZERO;
        self.polygon.clear();

        for seg in &flat {
            match *seg {
                FlatSegment::MoveTo(p) => {
                    if !self.polygon.is_empty() {
                        log::debug!("Skipping open subpath with {} points", self.polygon.len());
                        self.polygon.clear();
                    }
                    start = p;
                }
                FlatSegment::LineTo(p) => self.polygon.push(p - start),
                FlatSegment::Close => {
                    let needs_closing = self
                        .polygon
                        .last()
                        .is_some_and(|last| !same_point(*last, Vec2::ZERO));
                    if needs_closing {
                        log::debug!("Closing subpath at start point {}", start);
                        self.polygon.push(Vec2::ZERO);
                    }
                    let polygon = std::mem::take(&mut self.polygon);
                    result.push(self.compile_polygon(start, &polygon, props));
                    self.polygon = polygon;
                    self.polygon.clear();
                }
            }
        }
        if !self.polygon.is_empty() {
            log::debug!("Skipping open subpath with {} points", self.polygon.len());
            self.polygon.clear();
        }

        self.flat = flat;
        result
    }

    /// Triangulate a simple polygon given relative to `origin`
    pub fn compile_polygon(
        &mut self,
        origin: Vec2,
        polygon: &[Vec2],
        props: Option<PhysicalProps>,
    ) -> CompiledGeometry {
        let mut geometry = CompiledGeometry {
            origin,
            shapes: Vec::new(),
            rejected: 0,
        };
        if distinct_count(polygon) < 3 {
            log::debug!("Polygon at {} has fewer than 3 distinct vertices", origin);
            return geometry;
        }

        for (i, tri) in self.clipper.triangulate(polygon).iter().enumerate() {
            let pts = [polygon[tri[0]], polygon[tri[1]], polygon[tri[2]]];
            if let Some(reason) = triangle_degeneracy(&pts) {
                log::warn!("Rejected triangle {} of polygon at {}: {:?}", i, origin, reason);
                geometry.rejected += 1;
                continue;
            }
            geometry
                .shapes
                .push(ShapeDescriptor::polygon(&pts).with_props(props));
        }
        geometry
    }

    /// A rectangle given by its four corners becomes one 4-vertex polygon
    /// relative to its first corner, without triangulation
    pub fn compile_rect(&self, corners: &[Vec2; 4], props: Option<PhysicalProps>) -> CompiledGeometry {
        CompiledGeometry {
            origin: corners[0],
            shapes: vec![ShapeDescriptor::polygon_relative(corners).with_props(props)],
            rejected: 0,
        }
    }

    /// Flatten an open path into one chain per subpath
    pub fn compile_polyline(
        &mut self,
        segments: &[PathSegment],
        transform: &Affine2,
        props: Option<PhysicalProps>,
    ) -> Vec<CompiledGeometry> {
        let transformed: Vec<PathSegment> = segments.iter().map(|s| s.transformed(transform)).collect();
        self.flat.clear();
        flatten(&transformed, self.tolerance, &mut self.flat);

        let mut result = Vec::new();
        let mut start = Vec2::ZERO;
        let mut points: Vec<Vec2> = Vec::new();
        let mut finish = |start: Vec2, points: &mut Vec<Vec2>, closed: bool| {
            if points.len() >= 2 {
                result.push(CompiledGeometry {
                    origin: start,
                    shapes: vec![ShapeDescriptor::chain(std::mem::take(points), closed).with_props(props)],
                    rejected: 0,
                });
            }
            points.clear();
        };

        for seg in &self.flat {
            match *seg {
                FlatSegment::MoveTo(p) => {
                    finish(start, &mut points, false);
                    start = p;
                    points.push(Vec2::ZERO);
                }
                FlatSegment::LineTo(p) => {
                    let rel = p - start;
                    if points.last().is_none_or(|last| !same_point(*last, rel)) {
                        points.push(rel);
                    }
                }
                FlatSegment::Close => finish(start, &mut points, true),
            }
        }
        finish(start, &mut points, false);
        result
    }
}

impl Default for GeometryCompiler {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_FLATNESS)
    }
}

/// Classify a triangle, or None if it is usable
pub fn triangle_degeneracy(tri: &[Vec2; 3]) -> Option<Degeneracy> {
    if same_point(tri[0], tri[1]) || same_point(tri[1], tri[2]) || same_point(tri[2], tri[0]) {
        return Some(Degeneracy::CoincidentVertices);
    }
    let area = (cross3(tri[0], tri[1], tri[2]) * 0.5).abs();
    if area <= MIN_TRIANGLE_AREA {
        return Some(Degeneracy::AreaTooSmall);
    }
    None
}

#[inline]
fn same_point(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < POINT_EPSILON && (a.y - b.y).abs() < POINT_EPSILON
}

fn distinct_count(points: &[Vec2]) -> usize {
    let mut distinct: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if !distinct.iter().any(|d| same_point(*d, *p)) {
            distinct.push(*p);
        }
    }
    distinct.len()
}

/// Parse physical properties from free-text metadata.
///
/// Entries are separated by `;`. Two forms are understood:
/// `fp:friction,density,restitution` and individual `friction:x`,
/// `density:x`, `restitution:x` pairs. Returns None when nothing usable is
/// present; individual pairs fill unspecified fields from `defaults`.
pub fn parse_physical_props(metadata: &str, defaults: PhysicalProps) -> Option<PhysicalProps> {
    let mut props = defaults;
    let mut found = false;
    for entry in metadata.split(';') {
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "fp" => {
                let parts: Vec<f32> = value.split(',').filter_map(|v| v.trim().parse().ok()).collect();
                if let [friction, density, restitution] = parts[..] {
                    props = PhysicalProps::new(friction, density, restitution);
                    found = true;
                } else {
                    log::warn!("Ignoring malformed physics metadata 'fp:{}'", value);
                }
            }
            "friction" | "density" | "restitution" => match value.parse::<f32>() {
                Ok(v) => {
                    match key {
                        "friction" => props.friction = v,
                        "density" => props.density = v,
                        _ => props.restitution = v,
                    }
                    found = true;
                }
                Err(_) => log::warn!("Ignoring malformed physics metadata '{}:{}'", key, value),
            },
            _ => {}
        }
    }
    found.then_some(props)
}

/// Sum of polygon areas of the compiled shapes
pub fn covered_area(geometry: &CompiledGeometry) -> f32 {
    geometry
        .shapes
        .iter()
        .filter(|d| matches!(d.shape, Shape::Polygon { .. }))
        .map(|d| d.shape.area())
        .sum()
}
