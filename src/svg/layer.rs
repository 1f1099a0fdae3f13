//! Layers of a vector document mapped into world space
//!
//! The root layer flips the document's Y axis (documents grow downwards,
//! the world grows upwards) and can be scaled into world units. Group
//! layers inherit their parent's transform.

use std::f32::consts::PI;

use glam::{Affine2, Vec2};

use super::document::VectorElement;
use super::path_data::parse_path_data;
use super::transform::parse_transform;
use crate::consts::{DEFAULT_DENSITY, DEFAULT_FRICTION, DEFAULT_RESTITUTION};
use crate::geom::{Aabb, GeometryCompiler, PathSegment, PhysicalProps, ShapeDescriptor, parse_physical_props};
use crate::physics::BodyDef;
use crate::{Result, SimError};

/// Attribute holding an element's human-readable name
pub const ATTR_LABEL: &str = "inkscape:label";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

/// Circular arc; angles in radians, world orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub center: Vec2,
    pub radius: f32,
    pub start: f32,
    pub end: f32,
}

/// A value found by label prefix, with the rest of its label and its fill
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled<T> {
    pub name: String,
    pub value: T,
    pub color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct VectorLayer<'a> {
    element: &'a VectorElement,
    transform: Affine2,
    /// viewBox (x, y, width, height); root layer only
    view_box: Option<[f32; 4]>,
}

impl<'a> VectorLayer<'a> {
    /// Root layer of a document with a `viewBox`
    pub fn root(document: &'a VectorElement) -> Result<Self> {
        let raw = document.require("viewBox")?;
        let values: Vec<f32> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid("viewBox", raw))?;
        let [x, y, width, height] = values[..] else {
            return Err(invalid("viewBox", raw));
        };

        let half = Vec2::new(0.0, height * 0.5);
        let flip = Affine2::from_translation(half) * Affine2::from_scale(Vec2::new(1.0, -1.0)) * Affine2::from_translation(-half);
        Ok(Self {
            element: document,
            transform: flip,
            view_box: Some([x, y, width, height]),
        })
    }

    pub fn element(&self) -> &'a VectorElement {
        self.element
    }

    /// Document to world transform for elements of this layer
    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    /// Scale world output uniformly, e.g. pixels to meters
    pub fn apply_scale(&mut self, scale: f32) {
        self.transform = Affine2::from_scale(Vec2::splat(scale)) * self.transform;
    }

    /// The viewBox in world coordinates; None below the root
    pub fn dimensions(&self) -> Option<Aabb> {
        let [x, y, width, height] = self.view_box?;
        let corners = [
            Vec2::new(x, y),
            Vec2::new(x + width, y + height),
        ]
        .map(|p| self.transform.transform_point2(p));
        Aabb::from_points(&corners)
    }

    pub fn layer_by_label(&self, label: &str) -> Result<VectorLayer<'a>> {
        self.sub_layer(self.child_by_label("g", label)?)
    }

    fn sub_layer(&self, element: &'a VectorElement) -> Result<VectorLayer<'a>> {
        Ok(VectorLayer {
            element,
            transform: self.transform * element_transform(element)?,
            view_box: None,
        })
    }

    /// Untransformed width and height of a labelled rect
    pub fn rect_size(&self, label: &str) -> Result<Vec2> {
        let rect = self.child_by_label("rect", label)?;
        Ok(Vec2::new(rect.require_f32("width")?, rect.require_f32("height")?))
    }

    pub fn rect_center(&self, label: &str) -> Result<Vec2> {
        let corners = self.rect_corners_of(self.child_by_label("rect", label)?)?;
        Ok(corners[0].lerp(corners[2], 0.5))
    }

    /// World corners of a labelled rect, in document order: (x, y),
    /// (x, y + h), (x + w, y + h), (x + w, y)
    pub fn rect_corners(&self, label: &str) -> Result<[Vec2; 4]> {
        self.rect_corners_of(self.child_by_label("rect", label)?)
    }

    pub fn rects_by_prefix(&self, prefix: &str) -> Result<Vec<Labeled<[Vec2; 4]>>> {
        self.by_prefix("rect", prefix, |layer, e| layer.rect_corners_of(e))
    }

    pub fn rect_centers_by_prefix(&self, prefix: &str) -> Result<Vec<Labeled<Vec2>>> {
        self.by_prefix("rect", prefix, |layer, e| {
            let corners = layer.rect_corners_of(e)?;
            Ok(corners[0].lerp(corners[2], 0.5))
        })
    }

    pub fn circles_by_prefix(&self, prefix: &str) -> Result<Vec<Labeled<Circle>>> {
        self.by_prefix("circle", prefix, |layer, e| layer.circle_of(e))
    }

    /// Arcs drawn as paths carrying `sodipodi:` arc attributes
    pub fn arcs_by_prefix(&self, prefix: &str) -> Result<Vec<Labeled<Arc>>> {
        self.by_prefix("path", prefix, |layer, e| layer.arc_of(e))
    }

    /// Static body definitions for every path, rect and circle on this layer
    /// and its groups. Closed paths are triangulated; paths without a close
    /// become chains.
    pub fn create_bodies(&self, compiler: &mut GeometryCompiler, out: &mut Vec<BodyDef>) -> Result<()> {
        for path in self.element.children_of("path") {
            let transform = self.transform * element_transform(path)?;
            let segments = parse_path_data(path.require("d")?)?;
            let props = physical_props(path);
            let compiled = if segments.contains(&PathSegment::Close) {
                compiler.compile_path(&segments, &transform, props)
            } else {
                compiler.compile_polyline(&segments, &transform, props)
            };
            for geometry in compiled.into_iter().filter(|g| !g.shapes.is_empty()) {
                out.push(BodyDef::fixed(geometry.origin).with_shapes(geometry.shapes));
            }
        }
        for rect in self.element.children_of("rect") {
            let geometry = compiler.compile_rect(&self.rect_corners_of(rect)?, physical_props(rect));
            out.push(BodyDef::fixed(geometry.origin).with_shapes(geometry.shapes));
        }
        for element in self.element.children_of("circle") {
            let circle = self.circle_of(element)?;
            let shape = ShapeDescriptor::circle(circle.radius).with_props(physical_props(element));
            out.push(BodyDef::fixed(circle.center).with_shapes([shape]));
        }
        for group in self.element.children_of("g") {
            self.sub_layer(group)?.create_bodies(compiler, out)?;
        }
        Ok(())
    }

    fn child_by_label(&self, kind: &str, label: &str) -> Result<&'a VectorElement> {
        self.element
            .children_of(kind)
            .find(|e| e.attr(ATTR_LABEL) == Some(label))
            .ok_or_else(|| SimError::MissingElement {
                kind: kind.to_string(),
                label: label.to_string(),
            })
    }

    fn by_prefix<T>(
        &self,
        kind: &str,
        prefix: &str,
        mut parse: impl FnMut(&Self, &'a VectorElement) -> Result<T>,
    ) -> Result<Vec<Labeled<T>>> {
        let mut found = Vec::new();
        for element in self.element.children_of(kind) {
            let Some(name) = element.attr(ATTR_LABEL).and_then(|l| l.strip_prefix(prefix)) else {
                continue;
            };
            found.push(Labeled {
                name: name.to_string(),
                value: parse(self, element)?,
                color: fill_color(element),
            });
        }
        Ok(found)
    }

    fn rect_corners_of(&self, rect: &VectorElement) -> Result<[Vec2; 4]> {
        let transform = self.transform * element_transform(rect)?;
        let min = Vec2::new(rect.require_f32("x")?, rect.require_f32("y")?);
        let max = min + Vec2::new(rect.require_f32("width")?, rect.require_f32("height")?);
        Ok([min, Vec2::new(min.x, max.y), max, Vec2::new(max.x, min.y)].map(|p| transform.transform_point2(p)))
    }

    fn circle_of(&self, circle: &VectorElement) -> Result<Circle> {
        let transform = self.transform * element_transform(circle)?;
        let center = Vec2::new(circle.require_f32("cx")?, circle.require_f32("cy")?);
        let radius = circle.require_f32("r")?;
        Ok(Circle {
            center: transform.transform_point2(center),
            radius: transform.transform_vector2(Vec2::new(radius, 0.0)).length(),
        })
    }

    fn arc_of(&self, arc: &VectorElement) -> Result<Arc> {
        let transform = self.transform * element_transform(arc)?;
        let center = Vec2::new(arc.require_f32("sodipodi:cx")?, arc.require_f32("sodipodi:cy")?);
        let radius = arc.require_f32("sodipodi:rx")?;
        let mut start = arc.require_f32("sodipodi:start")?;
        let mut end = arc.require_f32("sodipodi:end")?;

        // Mirrored axes reverse the angle direction
        let mirror = transform.transform_vector2(Vec2::ONE);
        if mirror.x < 0.0 {
            start = PI - start;
            end = PI - end;
        }
        if mirror.y < 0.0 {
            start = -start;
            end = -end;
        }
        Ok(Arc {
            center: transform.transform_point2(center),
            radius: transform.transform_vector2(Vec2::new(radius, 0.0)).length(),
            start,
            end,
        })
    }
}

fn invalid(attribute: &str, value: &str) -> SimError {
    SimError::InvalidAttribute {
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn element_transform(element: &VectorElement) -> Result<Affine2> {
    element.attr("transform").map_or(Ok(Affine2::IDENTITY), parse_transform)
}

fn physical_props(element: &VectorElement) -> Option<PhysicalProps> {
    let defaults = PhysicalProps::new(DEFAULT_FRICTION, DEFAULT_DENSITY, DEFAULT_RESTITUTION);
    element.desc.as_deref().and_then(|desc| parse_physical_props(desc, defaults))
}

/// Fill colour from an inline style (`fill:#rrggbb;fill-opacity:a`).
/// Transparent black when there is none.
fn fill_color(element: &VectorElement) -> [f32; 4] {
    let mut color = [0.0; 4];
    for entry in element.attr("style").unwrap_or_default().split(';') {
        if let Some(hex) = entry.trim().strip_prefix("fill:#") {
            if let Some(parsed) = parse_hex_color(hex) {
                color = parsed;
            }
        } else if let Some(opacity) = entry.trim().strip_prefix("fill-opacity:") {
            if let Ok(alpha) = opacity.parse() {
                color[3] = alpha;
            }
        }
    }
    color
}

fn parse_hex_color(hex: &str) -> Option<[f32; 4]> {
    if !matches!(hex.len(), 6 | 8) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    let value = if hex.len() == 6 { value << 8 | 0xff } else { value };
    Some([24, 16, 8, 0].map(|shift| ((value >> shift) & 0xff) as f32 / 255.0))
}
