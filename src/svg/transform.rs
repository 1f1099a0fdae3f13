//! Transform list (`transform` attribute) parsing

use glam::{Affine2, Mat2, Vec2};

use crate::{Result, SimError};

/// Parse a transform list such as `translate(10 5) rotate(30)` into one
/// affine transform. Transforms apply right to left, as in SVG.
pub fn parse_transform(text: &str) -> Result<Affine2> {
    let mut result = Affine2::IDENTITY;
    let mut rest = text.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    while !rest.is_empty() {
        let open = rest
            .find('(')
            .ok_or_else(|| SimError::TransformSyntax(format!("expected '(' in '{}'", rest)))?;
        let close = rest[open..]
            .find(')')
            .map(|i| open + i)
            .ok_or_else(|| SimError::TransformSyntax(format!("unclosed '(' in '{}'", rest)))?;
        let name = rest[..open].trim();
        let args = parse_args(&rest[open + 1..close])?;
        result = result * single(name, &args)?;
        rest = rest[close + 1..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }
    Ok(result)
}

fn parse_args(text: &str) -> Result<Vec<f32>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| SimError::TransformSyntax(format!("invalid number '{}'", s)))
        })
        .collect()
}

fn single(name: &str, args: &[f32]) -> Result<Affine2> {
    let transform = match (name, args) {
        ("matrix", &[a, b, c, d, e, f]) => Affine2::from_cols_array(&[a, b, c, d, e, f]),
        ("translate", &[tx]) => Affine2::from_translation(Vec2::new(tx, 0.0)),
        ("translate", &[tx, ty]) => Affine2::from_translation(Vec2::new(tx, ty)),
        ("scale", &[s]) => Affine2::from_scale(Vec2::splat(s)),
        ("scale", &[sx, sy]) => Affine2::from_scale(Vec2::new(sx, sy)),
        ("rotate", &[deg]) => Affine2::from_angle(deg.to_radians()),
        ("rotate", &[deg, cx, cy]) => {
            let pivot = Vec2::new(cx, cy);
            Affine2::from_translation(pivot) * Affine2::from_angle(deg.to_radians()) * Affine2::from_translation(-pivot)
        }
        ("skewX", &[deg]) => Affine2::from_mat2(Mat2::from_cols(Vec2::X, Vec2::new(deg.to_radians().tan(), 1.0))),
        ("skewY", &[deg]) => Affine2::from_mat2(Mat2::from_cols(Vec2::new(1.0, deg.to_radians().tan()), Vec2::Y)),
        _ => {
            return Err(SimError::TransformSyntax(format!(
                "unsupported transform {}({} arguments)",
                name,
                args.len()
            )));
        }
    };
    Ok(transform)
}
