//! Typed layer nodes.

use serde::Serialize;

/// Flat kind of a layer, as exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Group,
    Text,
    Image,
    Rect,
    Circle,
    Path,
    Unknown,
}

/// Shape flavours that matter to the pipeline. Everything else drawable
/// (ellipse, line, polygon, `use`, ...) is [`ShapeKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    Circle,
    Path,
    Other,
}

/// Kind-specific payload of a [`LayerNode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerBody {
    Group { children: Vec<LayerNode> },
    Text { content: String },
    Image { href: Option<String> },
    Shape { shape: ShapeKind },
}

/// A node of the parsed layer tree.
///
/// Children are owned by exactly one parent. `fill` and `stroke` are the
/// element's own attributes; inherited or CSS-declared paint is not
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerNode {
    pub id: String,
    pub name: String,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub body: LayerBody,
}

impl LayerNode {
    pub fn kind(&self) -> LayerKind {
        match &self.body {
            LayerBody::Group { .. } => LayerKind::Group,
            LayerBody::Text { .. } => LayerKind::Text,
            LayerBody::Image { .. } => LayerKind::Image,
            LayerBody::Shape { shape } => match shape {
                ShapeKind::Rect => LayerKind::Rect,
                ShapeKind::Circle => LayerKind::Circle,
                ShapeKind::Path => LayerKind::Path,
                ShapeKind::Other => LayerKind::Unknown,
            },
        }
    }

    pub fn children(&self) -> &[LayerNode] {
        match &self.body {
            LayerBody::Group { children } => children,
            _ => &[],
        }
    }

    /// Text payload; only `text` layers carry one.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            LayerBody::Text { content } => Some(content),
            _ => None,
        }
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a LayerNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a LayerNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// `true` when a paint value is the `none` sentinel.
pub fn is_none_paint(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("none")
}
