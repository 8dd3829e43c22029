//! Vector document parser.
//!
//! Walks the markup tree once, producing a [`LayerNode`] for every
//! rendering element and registering it in a [`LayerIndex`]. All later
//! lookups by id or name go through the index.
//!
//! Identifier precedence per element:
//!
//! 1. explicit `id` attribute,
//! 2. semantic name (`data-name`, then `inkscape:label`),
//! 3. positional `element-<index>` (pre-order position in the document).
//!
//! A candidate already taken elsewhere in the document falls through to
//! the next rule, so ids are unique and identical across re-parses of the
//! same text.

use std::collections::{HashMap, HashSet};

use super::error::ParseError;
use super::markup::{Document, Element, ElementPath, Markup};
use super::node::{LayerBody, LayerKind, LayerNode, ShapeKind};

/// Elements that never render on their own and are not layers.
const NON_RENDERING: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "pattern",
    "marker",
    "symbol",
    "linearGradient",
    "radialGradient",
    "filter",
    "style",
    "script",
    "metadata",
    "title",
    "desc",
];

/// Containers whose children are walked as layers.
pub(crate) const CONTAINERS: &[&str] = &["svg", "g", "a", "switch"];

/// Elements painted with `fill`.
pub(crate) const DRAWABLE: &[&str] = &[
    "rect", "circle", "ellipse", "line", "polygon", "polyline", "path", "text", "use",
];

/// Prefix used for positional synthetic ids.
const SYNTHETIC_ID_PREFIX: &str = "element-";

/// Index entry for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub name: String,
    pub kind: LayerKind,
    /// Path through [`LayerNode`] children from the root layer.
    pub layer_path: Vec<usize>,
    /// Path through markup children from the root element.
    pub element_path: ElementPath,
}

/// id -> layer and name -> ids lookups, built at parse time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerIndex {
    entries: Vec<IndexEntry>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl LayerIndex {
    fn insert(&mut self, entry: IndexEntry) {
        let slot = self.entries.len();
        self.by_id.insert(entry.id.clone(), slot);
        self.by_name.entry(entry.name.clone()).or_default().push(slot);
        self.entries.push(entry);
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.by_id.get(id).map(|&slot| &self.entries[slot])
    }

    /// Layers carrying exactly `name`, in document order.
    pub fn named(&self, name: &str) -> impl Iterator<Item = &IndexEntry> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&slot| &self.entries[slot])
    }

    /// Resolve a configuration reference: an id match wins, otherwise
    /// every layer with that name. Empty when nothing matches.
    pub fn resolve(&self, reference: &str) -> Vec<&IndexEntry> {
        match self.get(reference) {
            Some(entry) => vec![entry],
            None => self.named(reference).collect(),
        }
    }

    /// All entries in document order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`parse`]: the mutable markup, the layer tree and its index.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub markup: Document,
    pub root: LayerNode,
    pub index: LayerIndex,
}

impl ParsedDocument {
    /// Look up a layer node by id through the index.
    pub fn layer(&self, id: &str) -> Option<&LayerNode> {
        let entry = self.index.get(id)?;
        let mut node = &self.root;
        for &idx in &entry.layer_path {
            node = node.children().get(idx)?;
        }
        Some(node)
    }

    /// Look up the markup element behind a layer id.
    pub fn element(&self, id: &str) -> Option<&Element> {
        let entry = self.index.get(id)?;
        self.markup.root.at_path(&entry.element_path)
    }
}

/// Parse vector markup into a layer tree.
pub fn parse(text: &str) -> Result<ParsedDocument, ParseError> {
    let markup = Document::parse(text)?;
    if markup.root.local_name() != "svg" {
        return Err(ParseError::NotVector(markup.root.name.clone()));
    }

    let mut walker = Walker {
        next_position: 0,
        reserved: HashSet::new(),
        taken: HashSet::new(),
        index: LayerIndex::default(),
    };
    collect_explicit_ids(&markup.root, &mut walker.reserved);

    let root = walker.visit(&markup.root, Vec::new(), Vec::new());

    Ok(ParsedDocument {
        markup,
        root,
        index: walker.index,
    })
}

/// Explicit ids outrank semantic names, so names must not claim them even
/// when the named element comes first in document order.
fn collect_explicit_ids(el: &Element, out: &mut HashSet<String>) {
    if let Some(id) = el.attr("id").filter(|id| !id.is_empty()) {
        out.insert(id.to_string());
    }
    for child in el.child_elements() {
        collect_explicit_ids(child, out);
    }
}

struct Walker {
    next_position: usize,
    reserved: HashSet<String>,
    taken: HashSet<String>,
    index: LayerIndex,
}

impl Walker {
    fn visit(&mut self, el: &Element, layer_path: Vec<usize>, element_path: ElementPath) -> LayerNode {
        let position = self.next_position;
        self.next_position += 1;

        let id = self.assign_id(el, position);
        let name = semantic_name(el)
            .or_else(|| el.attr("id"))
            .unwrap_or_else(|| el.local_name())
            .to_string();

        let body = match el.local_name() {
            local if CONTAINERS.contains(&local) => {
                let mut children = Vec::new();
                for (markup_idx, child) in el.children.iter().enumerate() {
                    let Markup::Element(child) = child else {
                        continue;
                    };
                    if !is_layer_element(child) {
                        continue;
                    }
                    let mut child_layer_path = layer_path.clone();
                    child_layer_path.push(children.len());
                    let mut child_element_path = element_path.clone();
                    child_element_path.push(markup_idx);
                    children.push(self.visit(child, child_layer_path, child_element_path));
                }
                LayerBody::Group { children }
            }
            "text" => LayerBody::Text {
                content: el.text_content(),
            },
            "image" => LayerBody::Image {
                href: el
                    .attr("href")
                    .or_else(|| el.attr("xlink:href"))
                    .map(str::to_string),
            },
            "rect" => LayerBody::Shape {
                shape: ShapeKind::Rect,
            },
            "circle" => LayerBody::Shape {
                shape: ShapeKind::Circle,
            },
            "path" => LayerBody::Shape {
                shape: ShapeKind::Path,
            },
            _ => LayerBody::Shape {
                shape: ShapeKind::Other,
            },
        };

        let node = LayerNode {
            id: id.clone(),
            name: name.clone(),
            fill: el.attr("fill").map(str::to_string),
            stroke: el.attr("stroke").map(str::to_string),
            body,
        };

        self.index.insert(IndexEntry {
            id,
            name,
            kind: node.kind(),
            layer_path,
            element_path,
        });

        node
    }

    fn assign_id(&mut self, el: &Element, position: usize) -> String {
        if let Some(explicit) = el.attr("id").filter(|id| !id.is_empty()) {
            if self.taken.insert(explicit.to_string()) {
                return explicit.to_string();
            }
        }

        if let Some(name) = semantic_name(el) {
            if !self.reserved.contains(name) && self.taken.insert(name.to_string()) {
                return name.to_string();
            }
        }

        let mut candidate = format!("{SYNTHETIC_ID_PREFIX}{position}");
        let mut suffix = 1;
        while self.reserved.contains(&candidate) || !self.taken.insert(candidate.clone()) {
            candidate = format!("{SYNTHETIC_ID_PREFIX}{position}-{suffix}");
            suffix += 1;
        }
        candidate
    }
}

fn semantic_name(el: &Element) -> Option<&str> {
    el.attr("data-name")
        .or_else(|| el.attr("inkscape:label"))
        .filter(|name| !name.trim().is_empty())
}

/// Editor-namespaced elements (`sodipodi:namedview`, ...) and non-rendering
/// definitions are skipped.
fn is_layer_element(el: &Element) -> bool {
    if matches!(el.prefix(), Some(prefix) if prefix != "svg") {
        return false;
    }
    !NON_RENDERING.contains(&el.local_name())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const JERSEY: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 200">
  <defs><linearGradient id="grad"/></defs>
  <g id="body" fill="#ffffff">
    <path d="M0 0h10v10z" fill="#ffffff"/>
    <path d="M0 0h5v5z" fill="none"/>
  </g>
  <g data-name="team_logo_left"><rect x="10" y="10" width="40" height="40" fill="#000"/></g>
  <text id="player_name" x="5" y="190"><tspan>SMITH</tspan></text>
  <circle cx="5" cy="5" r="2"/>
  <ellipse cx="5" cy="5" rx="2" ry="1"/>
</svg>"##;

    #[test]
    fn builds_typed_tree() {
        let doc = parse(JERSEY).expect("parse");
        assert_eq!(doc.root.kind(), LayerKind::Group);
        let kinds: Vec<LayerKind> = doc.root.children().iter().map(LayerNode::kind).collect();
        assert_eq!(
            kinds,
            [
                LayerKind::Group,
                LayerKind::Group,
                LayerKind::Text,
                LayerKind::Circle,
                LayerKind::Unknown
            ]
        );
    }

    #[test]
    fn skips_non_rendering_definitions() {
        let doc = parse(JERSEY).expect("parse");
        assert!(doc.index.get("grad").is_none());
    }

    #[test]
    fn id_precedence_explicit_then_name_then_position() {
        let doc = parse(JERSEY).expect("parse");
        assert!(doc.layer("body").is_some());
        assert!(doc.layer("team_logo_left").is_some());
        // root svg has no id or name: position 0.
        assert_eq!(doc.root.id, "element-0");
    }

    #[test]
    fn ids_are_stable_across_reparses() {
        let first = parse(JERSEY).expect("parse");
        let second = parse(JERSEY).expect("parse");
        let ids = |d: &ParsedDocument| -> Vec<String> {
            d.index.entries().iter().map(|e| e.id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn sibling_names_never_collide() {
        let src = r#"<svg><g data-name="stripe"/><g data-name="stripe"/><g id="stripe2"/></svg>"#;
        let doc = parse(src).expect("parse");
        let ids: Vec<&str> = doc.root.children().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["stripe", "element-2", "stripe2"]);
        assert_eq!(doc.index.named("stripe").count(), 2);
    }

    #[test]
    fn names_do_not_steal_explicit_ids() {
        let src = r#"<svg><g data-name="sleeve"/><g id="sleeve"/></svg>"#;
        let doc = parse(src).expect("parse");
        let ids: Vec<&str> = doc.root.children().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["element-1", "sleeve"]);
    }

    #[test]
    fn text_content_includes_tspans() {
        let doc = parse(JERSEY).expect("parse");
        let text = doc.layer("player_name").expect("text layer");
        assert_eq!(text.content(), Some("SMITH"));
    }

    #[test]
    fn direct_attributes_only() {
        let src = r##"<svg><g id="g" fill="#f00"><rect id="r" style="fill:#0f0"/></g></svg>"##;
        let doc = parse(src).expect("parse");
        assert_eq!(doc.layer("g").and_then(|n| n.fill.clone()).as_deref(), Some("#f00"));
        assert_eq!(doc.layer("r").and_then(|n| n.fill.clone()), None);
    }

    #[test]
    fn index_resolves_elements() {
        let doc = parse(JERSEY).expect("parse");
        let el = doc.element("player_name").expect("element");
        assert_eq!(el.name, "text");
        let entry = doc.index.resolve("team_logo_left");
        assert_eq!(entry.len(), 1);
        assert!(doc.index.resolve("missing").is_empty());
    }

    #[test]
    fn rejects_non_svg_root() {
        assert_matches!(parse("<html/>"), Err(ParseError::NotVector(name)) if name == "html");
    }

    #[test]
    fn rejects_malformed_markup() {
        assert!(parse("<svg><g></svg>").is_err());
    }
}
