//! Curve flattening
//!
//! Paths arrive as absolute move/line/quad/cubic/close segments. Curves are
//! split recursively until every control point lies within the tolerance of
//! its chord, which bounds the deviation of the polyline from the curve.

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

/// Subdivision depth cap; 2^16 pieces per curve is far below any sane tolerance
const MAX_SUBDIVISION_DEPTH: u32 = 16;

/// One absolute path segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo(Vec2, Vec2),
    CubicTo(Vec2, Vec2, Vec2),
    Close,
}

impl PathSegment {
    /// Apply an affine transform to every point of the segment
    pub fn transformed(self, t: &Affine2) -> Self {
        match self {
            PathSegment::MoveTo(p) => PathSegment::MoveTo(t.transform_point2(p)),
            PathSegment::LineTo(p) => PathSegment::LineTo(t.transform_point2(p)),
            PathSegment::QuadTo(c, p) => {
                PathSegment::QuadTo(t.transform_point2(c), t.transform_point2(p))
            }
            PathSegment::CubicTo(c1, c2, p) => PathSegment::CubicTo(
                t.transform_point2(c1),
                t.transform_point2(c2),
                t.transform_point2(p),
            ),
            PathSegment::Close => PathSegment::Close,
        }
    }
}

/// A flattened path element: curves already replaced by line runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlatSegment {
    MoveTo(Vec2),
    LineTo(Vec2),
    Close,
}

/// Flatten `segments` into move/line/close runs with the given tolerance
pub fn flatten(segments: &[PathSegment], tolerance: f32, out: &mut Vec<FlatSegment>) {
    let tolerance = tolerance.max(f32::EPSILON);
    let mut current = Vec2::ZERO;
    let mut subpath_start = Vec2::ZERO;

    for seg in segments {
        match *seg {
            PathSegment::MoveTo(p) => {
                out.push(FlatSegment::MoveTo(p));
                current = p;
                subpath_start = p;
            }
            PathSegment::LineTo(p) => {
                out.push(FlatSegment::LineTo(p));
                current = p;
            }
            PathSegment::QuadTo(c, p) => {
                // Degree-elevate so one subdivider handles both curve kinds
                let c1 = current + (c - current) * (2.0 / 3.0);
                let c2 = p + (c - p) * (2.0 / 3.0);
                flatten_cubic([current, c1, c2, p], tolerance, 0, out);
                current = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                flatten_cubic([current, c1, c2, p], tolerance, 0, out);
                current = p;
            }
            PathSegment::Close => {
                out.push(FlatSegment::Close);
                current = subpath_start;
            }
        }
    }
}

fn flatten_cubic(pts: [Vec2; 4], tolerance: f32, depth: u32, out: &mut Vec<FlatSegment>) {
    if depth >= MAX_SUBDIVISION_DEPTH || cubic_flatness(&pts) <= tolerance {
        out.push(FlatSegment::LineTo(pts[3]));
        return;
    }
    let (left, right) = split_cubic(&pts);
    flatten_cubic(left, tolerance, depth + 1, out);
    flatten_cubic(right, tolerance, depth + 1, out);
}

/// Largest distance of the inner control points from the chord
fn cubic_flatness(pts: &[Vec2; 4]) -> f32 {
    point_segment_distance(pts[1], pts[0], pts[3]).max(point_segment_distance(pts[2], pts[0], pts[3]))
}

/// de Casteljau split at t = 0.5
fn split_cubic(p: &[Vec2; 4]) -> ([Vec2; 4], [Vec2; 4]) {
    let p01 = (p[0] + p[1]) * 0.5;
    let p12 = (p[1] + p[2]) * 0.5;
    let p23 = (p[2] + p[3]) * 0.5;
    let p012 = (p01 + p12) * 0.5;
    let p123 = (p12 + p23) * 0.5;
    let mid = (p012 + p123) * 0.5;
    ([p[0], p01, p012, mid], [mid, p123, p23, p[3]])
}

/// Distance from `p` to segment `a`-`b`
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}
