//! Ear-clipping triangulation of simple polygons
//!
//! The clipper owns its scratch buffers so repeated calls (one per path at
//! level load, one per filled polygon when drawing) reuse allocations.

use glam::Vec2;

use super::shape::polygon_signed_area;
use crate::cross3;

/// Cross products smaller than this are treated as collinear
const COLLINEAR_EPSILON: f32 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    Convex,
    Collinear,
    Reflex,
}

/// Reusable ear-clipping triangulator
#[derive(Debug, Default)]
pub struct EarClipper {
    ring: Vec<usize>,
    corners: Vec<Corner>,
    triangles: Vec<[usize; 3]>,
}

impl EarClipper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangulate `points` (either winding) into index triples.
    ///
    /// Triangles are always emitted counter-clockwise. A polygon with n
    /// vertices yields n - 2 triangles, some of which may be degenerate when
    /// the input has repeated or collinear vertices; callers filter those.
    pub fn triangulate(&mut self, points: &[Vec2]) -> &[[usize; 3]] {
        self.triangles.clear();
        self.ring.clear();
        self.corners.clear();

        let n = points.len();
        if n < 3 {
            return &self.triangles;
        }

        self.ring.extend(0..n);
        if polygon_signed_area(points) < 0.0 {
            self.ring.reverse();
        }
        for i in 0..n {
            let corner = self.classify(points, i);
            self.corners.push(corner);
        }

        while self.ring.len() > 3 {
            let ear = self.find_ear(points);
            let len = self.ring.len();
            let prev = self.ring[(ear + len - 1) % len];
            let next = self.ring[(ear + 1) % len];
            self.triangles.push([prev, self.ring[ear], next]);

            self.ring.remove(ear);
            self.corners.remove(ear);

            let len = self.ring.len();
            let prev_pos = (ear + len - 1) % len;
            let next_pos = ear % len;
            self.corners[prev_pos] = self.classify(points, prev_pos);
            self.corners[next_pos] = self.classify(points, next_pos);
        }
        self.triangles.push([self.ring[0], self.ring[1], self.ring[2]]);

        &self.triangles
    }

    fn classify(&self, points: &[Vec2], pos: usize) -> Corner {
        let len = self.ring.len();
        let prev = points[self.ring[(pos + len - 1) % len]];
        let cur = points[self.ring[pos]];
        let next = points[self.ring[(pos + 1) % len]];
        let cross = cross3(prev, cur, next);
        if cross > COLLINEAR_EPSILON {
            Corner::Convex
        } else if cross < -COLLINEAR_EPSILON {
            Corner::Reflex
        } else {
            Corner::Collinear
        }
    }

    /// Ring position of the next vertex to clip
    fn find_ear(&self, points: &[Vec2]) -> usize {
        // Prefer real ears, then collinear corners (zero-area clips), then
        // anything that is not reflex, so self-touching input still terminates
        for wanted in [Corner::Convex, Corner::Collinear] {
            for pos in 0..self.ring.len() {
                if self.corners[pos] == wanted && self.is_ear(points, pos) {
                    return pos;
                }
            }
        }
        self.corners
            .iter()
            .position(|c| *c != Corner::Reflex)
            .unwrap_or(0)
    }

    fn is_ear(&self, points: &[Vec2], pos: usize) -> bool {
        let len = self.ring.len();
        let prev_pos = (pos + len - 1) % len;
        let next_pos = (pos + 1) % len;
        let a = points[self.ring[prev_pos]];
        let b = points[self.ring[pos]];
        let c = points[self.ring[next_pos]];

        for (i, &idx) in self.ring.iter().enumerate() {
            if i == pos || i == prev_pos || i == next_pos || self.corners[i] != Corner::Reflex {
                continue;
            }
            let p = points[idx];
            if p == a || p == b || p == c {
                continue;
            }
            if point_in_triangle(p, a, b, c) {
                return false;
            }
        }
        true
    }
}

/// Inclusive point-in-triangle test for a counter-clockwise triangle
fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross3(a, b, p) >= 0.0 && cross3(b, c, p) >= 0.0 && cross3(c, a, p) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn total_area(points: &[Vec2], tris: &[[usize; 3]]) -> f32 {
        tris.iter()
            .map(|t| cross3(points[t[0]], points[t[1]], points[t[2]]) * 0.5)
            .sum()
    }

    #[test]
    fn test_square_two_triangles() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let mut clipper = EarClipper::new();
        let tris = clipper.triangulate(&pts).to_vec();
        assert_eq!(tris.len(), 2);
        assert!((total_area(&pts, &tris) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clockwise_input_emits_ccw_triangles() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 0.0),
        ];
        let mut clipper = EarClipper::new();
        for t in clipper.triangulate(&pts) {
            assert!(cross3(pts[t[0]], pts[t[1]], pts[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_concave_l_shape() {
        // L-shaped hexagon, area 3
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let mut clipper = EarClipper::new();
        let tris = clipper.triangulate(&pts).to_vec();
        assert_eq!(tris.len(), 4);
        assert!((total_area(&pts, &tris) - 3.0).abs() < 1e-5);
        for t in &tris {
            assert!(cross3(pts[t[0]], pts[t[1]], pts[t[2]]) >= 0.0);
        }
    }

    #[test]
    fn test_scratch_reuse_between_calls() {
        let mut clipper = EarClipper::new();
        let tri = [Vec2::ZERO, Vec2::X, Vec2::Y];
        assert_eq!(clipper.triangulate(&tri).len(), 1);
        let quad = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
        assert_eq!(clipper.triangulate(&quad).len(), 2);
        assert!(clipper.triangulate(&tri[..2]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_star_polygon_area_preserved(
            radii in prop::collection::vec(0.5f32..4.0, 3..24),
        ) {
            // Star-shaped around the origin, so always simple
            let n = radii.len();
            let pts: Vec<Vec2> = radii
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let a = i as f32 / n as f32 * std::f32::consts::TAU;
                    Vec2::new(a.cos(), a.sin()) * *r
                })
                .collect();
            let mut clipper = EarClipper::new();
            let tris = clipper.triangulate(&pts).to_vec();
            prop_assert_eq!(tris.len(), n - 2);
            let expected = polygon_signed_area(&pts);
            let got = total_area(&pts, &tris);
            prop_assert!((expected - got).abs() < 1e-3 * expected.max(1.0));
        }
    }
}
