//! Editable-role classification.
//!
//! Roles are derived, never stored: [`classify`] is a pure function of a
//! node's kind, name and fill structure.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::node::{is_none_paint, LayerKind, LayerNode};

/// Name fragments that mark a layer as a logo slot.
pub const LOGO_KEYWORDS: &[&str] = &["logo", "emblem", "badge", "crest", "mascot"];

static LOGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", LOGO_KEYWORDS.join("|"))).expect("valid regex")
});

/// How an operator may edit a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    Text,
    Graphic,
    Logo,
}

/// One row of the editable-layer listing shown to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableLayer {
    pub id: String,
    pub name: String,
    pub kind: LayerKind,
    pub role: LayerRole,
}

/// Classify a node, or `None` when it is not editable.
///
/// Checks run in order: text content, logo vocabulary in the name, then a
/// non-`none` fill on the node or any descendant.
pub fn classify(node: &LayerNode) -> Option<LayerRole> {
    if node.kind() == LayerKind::Text || node.content().is_some_and(|c| !c.trim().is_empty()) {
        return Some(LayerRole::Text);
    }
    if is_logo_name(&node.name) {
        return Some(LayerRole::Logo);
    }
    if has_visible_fill(node) {
        return Some(LayerRole::Graphic);
    }
    None
}

pub fn is_logo_name(name: &str) -> bool {
    LOGO_RE.is_match(name)
}

/// `true` if the node or any descendant declares a fill other than `none`.
pub fn has_visible_fill(node: &LayerNode) -> bool {
    node.descendants()
        .any(|n| n.fill.as_deref().is_some_and(|fill| !is_none_paint(fill)))
}

/// Every classified layer under `root` (root included), in document order.
pub fn editable_layers(root: &LayerNode) -> Vec<EditableLayer> {
    root.descendants()
        .filter_map(|node| {
            classify(node).map(|role| EditableLayer {
                id: node.id.clone(),
                name: node.name.clone(),
                kind: node.kind(),
                role,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::node::{LayerBody, ShapeKind};

    fn shape(id: &str, fill: Option<&str>) -> LayerNode {
        LayerNode {
            id: id.to_string(),
            name: id.to_string(),
            fill: fill.map(str::to_string),
            stroke: None,
            body: LayerBody::Shape {
                shape: ShapeKind::Path,
            },
        }
    }

    fn group(name: &str, children: Vec<LayerNode>) -> LayerNode {
        LayerNode {
            id: name.to_string(),
            name: name.to_string(),
            fill: None,
            stroke: None,
            body: LayerBody::Group { children },
        }
    }

    #[test]
    fn logo_keyword_in_name() {
        let node = group("team_logo_left", vec![shape("p", Some("none"))]);
        assert_eq!(classify(&node), Some(LayerRole::Logo));
        assert!(is_logo_name("Club CREST"));
        assert!(is_logo_name("badge-2"));
        assert!(!is_logo_name("sleeve"));
    }

    #[test]
    fn text_node_without_name_match() {
        let node = LayerNode {
            id: "t".into(),
            name: "player_name".into(),
            fill: None,
            stroke: None,
            body: LayerBody::Text {
                content: "SMITH".into(),
            },
        };
        assert_eq!(classify(&node), Some(LayerRole::Text));
    }

    #[test]
    fn text_wins_over_logo_name() {
        let node = LayerNode {
            id: "t".into(),
            name: "logo_caption".into(),
            fill: None,
            stroke: None,
            body: LayerBody::Text {
                content: String::new(),
            },
        };
        assert_eq!(classify(&node), Some(LayerRole::Text));
    }

    #[test]
    fn group_with_only_none_fills_is_excluded() {
        let node = group(
            "outline",
            vec![shape("a", Some("none")), shape("b", Some(" NONE "))],
        );
        assert_eq!(classify(&node), None);
    }

    #[test]
    fn filled_descendant_makes_graphic() {
        let node = group("body", vec![shape("a", Some("none")), shape("b", Some("#fff"))]);
        assert_eq!(classify(&node), Some(LayerRole::Graphic));
    }

    #[test]
    fn missing_fill_is_not_graphic() {
        assert_eq!(classify(&shape("bare", None)), None);
    }

    #[test]
    fn editable_listing_is_in_document_order() {
        let root = group(
            "root",
            vec![
                group("body", vec![shape("stripe", Some("#123456"))]),
                group("crest", vec![]),
            ],
        );
        let ids: Vec<String> = editable_layers(&root).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, ["root", "body", "stripe", "crest"]);
    }
}
