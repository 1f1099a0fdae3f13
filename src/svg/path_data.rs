//! Path data (`d` attribute) parsing
//!
//! All commands are lowered to absolute move/line/quad/cubic/close segments.
//! Horizontal and vertical lines become lines, smooth curves get their
//! reflected control point resolved, and elliptical arcs are approximated
//! with one cubic per quarter turn.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;

use crate::geom::PathSegment;
use crate::{Result, SimError, rotate};

/// Parse SVG path data into absolute segments
pub fn parse_path_data(data: &str) -> Result<Vec<PathSegment>> {
    let mut parser = PathParser {
        cursor: Cursor {
            src: data.as_bytes(),
            pos: 0,
        },
        out: Vec::new(),
        current: Vec2::ZERO,
        start: Vec2::ZERO,
        last_cubic_ctrl: None,
        last_quad_ctrl: None,
    };
    parser.run()?;
    Ok(parser.out)
}

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn error(&self, message: impl Into<String>) -> SimError {
        SimError::PathSyntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_number(&mut self) -> bool {
        self.skip_separators();
        matches!(self.peek(), Some(b'+' | b'-' | b'.' | b'0'..=b'9'))
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn number(&mut self) -> Result<f32> {
        self.skip_separators();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut mantissa = self.digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            mantissa += self.digits();
        }
        if mantissa == 0 {
            self.pos = start;
            return Err(self.error("expected a number"));
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let before_exponent = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits() == 0 {
                // Not an exponent after all
                self.pos = before_exponent;
            }
        }
        // Only ASCII was consumed
        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|_| self.error("invalid UTF-8"))?;
        text.parse().map_err(|_| SimError::PathSyntax {
            position: start,
            message: format!("invalid number '{}'", text),
        })
    }

    /// Arc flags may be packed without separators (`a1 1 0 011 1`)
    fn flag(&mut self) -> Result<bool> {
        self.skip_separators();
        let flag = match self.peek() {
            Some(b'0') => false,
            Some(b'1') => true,
            _ => return Err(self.error("expected arc flag 0 or 1")),
        };
        self.pos += 1;
        Ok(flag)
    }

    fn pair(&mut self) -> Result<Vec2> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Vec2::new(x, y))
    }
}

struct PathParser<'a> {
    cursor: Cursor<'a>,
    out: Vec<PathSegment>,
    current: Vec2,
    start: Vec2,
    /// Second control point of the previous C/S, for S reflection
    last_cubic_ctrl: Option<Vec2>,
    /// Control point of the previous Q/T, for T reflection
    last_quad_ctrl: Option<Vec2>,
}

impl PathParser<'_> {
    fn run(&mut self) -> Result<()> {
        let mut previous: Option<u8> = None;
        loop {
            self.cursor.skip_separators();
            let Some(b) = self.cursor.peek() else {
                return Ok(());
            };
            let command = if b.is_ascii_alphabetic() {
                self.cursor.pos += 1;
                b
            } else {
                // Implicit repetition; extra pairs after a move are lines
                match previous {
                    Some(b'M') => b'L',
                    Some(b'm') => b'l',
                    Some(p) if !matches!(p, b'Z' | b'z') => p,
                    _ => return Err(self.cursor.error(format!("unexpected '{}'", b as char))),
                }
            };
            if previous.is_none() && !matches!(command, b'M' | b'm') {
                return Err(self.cursor.error("path must start with a move"));
            }
            self.command(command)?;
            previous = Some(command);
        }
    }

    fn command(&mut self, command: u8) -> Result<()> {
        let relative = command.is_ascii_lowercase();
        let base = |current: Vec2| if relative { current } else { Vec2::ZERO };
        match command.to_ascii_uppercase() {
            b'M' => {
                let p = self.cursor.pair()? + base(self.current);
                self.out.push(PathSegment::MoveTo(p));
                self.current = p;
                self.start = p;
                self.clear_controls();
                // Further pairs are implicit lines
                while self.cursor.at_number() {
                    let p = self.cursor.pair()? + base(self.current);
                    self.line_to(p);
                }
            }
            b'L' => loop {
                let p = self.cursor.pair()? + base(self.current);
                self.line_to(p);
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'H' => loop {
                let x = self.cursor.number()? + base(self.current).x;
                self.line_to(Vec2::new(x, self.current.y));
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'V' => loop {
                let y = self.cursor.number()? + base(self.current).y;
                self.line_to(Vec2::new(self.current.x, y));
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'C' => loop {
                let origin = base(self.current);
                let c1 = self.cursor.pair()? + origin;
                let c2 = self.cursor.pair()? + origin;
                let p = self.cursor.pair()? + origin;
                self.cubic_to(c1, c2, p);
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'S' => loop {
                let origin = base(self.current);
                let c1 = self.last_cubic_ctrl.map_or(self.current, |c| self.current * 2.0 - c);
                let c2 = self.cursor.pair()? + origin;
                let p = self.cursor.pair()? + origin;
                self.cubic_to(c1, c2, p);
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'Q' => loop {
                let origin = base(self.current);
                let c = self.cursor.pair()? + origin;
                let p = self.cursor.pair()? + origin;
                self.quad_to(c, p);
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'T' => loop {
                let c = self.last_quad_ctrl.map_or(self.current, |c| self.current * 2.0 - c);
                let p = self.cursor.pair()? + base(self.current);
                self.quad_to(c, p);
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'A' => loop {
                let radii = self.cursor.pair()?;
                let x_rotation = self.cursor.number()?;
                let large_arc = self.cursor.flag()?;
                let sweep = self.cursor.flag()?;
                let p = self.cursor.pair()? + base(self.current);
                arc_to_cubics(self.current, radii, x_rotation, large_arc, sweep, p, &mut self.out);
                self.current = p;
                self.clear_controls();
                if !self.cursor.at_number() {
                    break;
                }
            },
            b'Z' => {
                self.out.push(PathSegment::Close);
                self.current = self.start;
                self.clear_controls();
            }
            other => {
                self.cursor.pos -= 1;
                return Err(self.cursor.error(format!("unknown command '{}'", other as char)));
            }
        }
        Ok(())
    }

    fn clear_controls(&mut self) {
        self.last_cubic_ctrl = None;
        self.last_quad_ctrl = None;
    }

    fn line_to(&mut self, p: Vec2) {
        self.out.push(PathSegment::LineTo(p));
        self.current = p;
        self.clear_controls();
    }

    fn cubic_to(&mut self, c1: Vec2, c2: Vec2, p: Vec2) {
        self.out.push(PathSegment::CubicTo(c1, c2, p));
        self.current = p;
        self.last_cubic_ctrl = Some(c2);
        self.last_quad_ctrl = None;
    }

    fn quad_to(&mut self, c: Vec2, p: Vec2) {
        self.out.push(PathSegment::QuadTo(c, p));
        self.current = p;
        self.last_quad_ctrl = Some(c);
        self.last_cubic_ctrl = None;
    }
}

/// Endpoint-parameterized elliptical arc as cubic segments
fn arc_to_cubics(
    from: Vec2,
    radii: Vec2,
    x_rotation_deg: f32,
    large_arc: bool,
    sweep: bool,
    to: Vec2,
    out: &mut Vec<PathSegment>,
) {
    if from.abs_diff_eq(to, 1e-6) {
        return;
    }
    let mut rx = radii.x.abs();
    let mut ry = radii.y.abs();
    if rx == 0.0 || ry == 0.0 {
        out.push(PathSegment::LineTo(to));
        return;
    }

    let phi = x_rotation_deg.to_radians();
    let p = rotate((from - to) * 0.5, -phi);

    // Scale up radii that cannot span the endpoints
    let lambda = (p.x * p.x) / (rx * rx) + (p.y * p.y) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let (rx2, ry2) = (rx * rx, ry * ry);
    let num = rx2 * ry2 - rx2 * p.y * p.y - ry2 * p.x * p.x;
    let den = rx2 * p.y * p.y + ry2 * p.x * p.x;
    let mut coef = (num / den).max(0.0).sqrt();
    if large_arc == sweep {
        coef = -coef;
    }
    let center_local = Vec2::new(coef * rx * p.y / ry, -coef * ry * p.x / rx);
    let center = rotate(center_local, phi) + (from + to) * 0.5;

    let u = Vec2::new((p.x - center_local.x) / rx, (p.y - center_local.y) / ry);
    let v = Vec2::new((-p.x - center_local.x) / rx, (-p.y - center_local.y) / ry);
    let theta1 = u.y.atan2(u.x);
    let mut sweep_angle = u.perp_dot(v).atan2(u.dot(v));
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= TAU;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += TAU;
    }

    let segments = (sweep_angle.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let delta = sweep_angle / segments as f32;
    let k = 4.0 / 3.0 * (delta / 4.0).tan();
    let point_at = |theta: f32| center + rotate(Vec2::new(rx * theta.cos(), ry * theta.sin()), phi);
    let tangent_at = |theta: f32| rotate(Vec2::new(-rx * theta.sin(), ry * theta.cos()), phi);

    for i in 0..segments {
        let t0 = theta1 + delta * i as f32;
        let t1 = t0 + delta;
        let p0 = point_at(t0);
        let p3 = if i + 1 == segments { to } else { point_at(t1) };
        out.push(PathSegment::CubicTo(p0 + tangent_at(t0) * k, p3 - tangent_at(t1) * k, p3));
    }
}
