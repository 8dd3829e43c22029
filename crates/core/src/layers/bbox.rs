//! Bounding boxes for logo and overlay placement.
//!
//! Computed from geometry attributes only; `transform` is ignored and path
//! data is not interpreted, so paths have no box.

use super::markup::Element;
use super::parser::CONTAINERS;

/// Box used when an element's geometry cannot be computed.
pub const DEFAULT_BOX: BoundingBox = BoundingBox {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 100.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::from_extents(
            self.x.min(other.x),
            self.y.min(other.y),
            (self.x + self.width).max(other.x + other.width),
            (self.y + self.height).max(other.y + other.height),
        )
    }

    /// Scale around the box centre by `percent / 100`.
    pub fn scaled(&self, percent: f64) -> BoundingBox {
        let factor = percent / 100.0;
        let width = self.width * factor;
        let height = self.height * factor;
        BoundingBox {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Bounding box of `el`, or `None` for element types without computable
/// geometry (paths, text, unknown elements, empty groups).
pub fn bounding_box(el: &Element) -> Option<BoundingBox> {
    match el.local_name() {
        "rect" | "image" | "use" | "foreignObject" => {
            let width = length(el, "width")?;
            let height = length(el, "height")?;
            Some(BoundingBox {
                x: length(el, "x").unwrap_or(0.0),
                y: length(el, "y").unwrap_or(0.0),
                width,
                height,
            })
        }
        "circle" => {
            let r = length(el, "r")?;
            let cx = length(el, "cx").unwrap_or(0.0);
            let cy = length(el, "cy").unwrap_or(0.0);
            Some(BoundingBox::from_extents(cx - r, cy - r, cx + r, cy + r))
        }
        "ellipse" => {
            let rx = length(el, "rx")?;
            let ry = length(el, "ry")?;
            let cx = length(el, "cx").unwrap_or(0.0);
            let cy = length(el, "cy").unwrap_or(0.0);
            Some(BoundingBox::from_extents(cx - rx, cy - ry, cx + rx, cy + ry))
        }
        "line" => {
            let x1 = length(el, "x1").unwrap_or(0.0);
            let y1 = length(el, "y1").unwrap_or(0.0);
            let x2 = length(el, "x2").unwrap_or(0.0);
            let y2 = length(el, "y2").unwrap_or(0.0);
            Some(BoundingBox::from_extents(
                x1.min(x2),
                y1.min(y2),
                x1.max(x2),
                y1.max(y2),
            ))
        }
        "polygon" | "polyline" => points_box(el.attr("points")?),
        local if CONTAINERS.contains(&local) => el
            .child_elements()
            .filter_map(bounding_box)
            .reduce(|acc, b| acc.union(&b)),
        _ => None,
    }
}

/// Parse a plain or `px` length. Percentages and other units are rejected.
fn length(el: &Element, key: &str) -> Option<f64> {
    let raw = el.attr(key)?.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw);
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn points_box(points: &str) -> Option<BoundingBox> {
    let coords: Vec<f64> = points
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .ok()?;
    if coords.len() < 2 {
        return None;
    }
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for pair in coords.chunks_exact(2) {
        min_x = min_x.min(pair[0]);
        max_x = max_x.max(pair[0]);
        min_y = min_y.min(pair[1]);
        max_y = max_y.max(pair[1]);
    }
    Some(BoundingBox::from_extents(min_x, min_y, max_x, max_y))
}

/// Format a coordinate for output: integers without a fraction, others
/// rounded to three decimals with trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let rounded = format!("{value:.3}");
    rounded.trim_end_matches('0').trim_end_matches('.').to_string()
}
