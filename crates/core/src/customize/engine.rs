//! Applies a [`VariantConfiguration`] to a template document.
//!
//! Every application starts from a fresh copy of the pristine markup, so
//! the output depends only on the template, the configuration and the
//! resolved assets. Passes run in a fixed order: text, graphic and logo
//! modifications (in configuration order), the team-number toggle, then
//! pattern and embellishment overlays.
//!
//! References that resolve to no layer, and assets missing from
//! [`ResolvedAssets`], are skipped with a debug log.

use super::assets::ResolvedAssets;
use super::config::{LayerModification, VariantConfiguration};
use crate::layers::bbox::{bounding_box, format_number, BoundingBox, DEFAULT_BOX};
use crate::layers::markup::{Document, Element, ElementPath, Markup};
use crate::layers::parser::{CONTAINERS, DRAWABLE};
use crate::layers::{editable_layers, parse, EditableLayer, LayerIndex, LayerRole, ParseError, ParsedDocument};

/// Marker attribute carried by every overlay image the engine inserts.
pub const OVERLAY_ATTR: &str = "data-overlay";

/// A parsed template ready for repeated customization.
#[derive(Debug, Clone)]
pub struct CustomizationSession {
    pristine: ParsedDocument,
}

impl CustomizationSession {
    pub fn new(original: &str) -> Result<Self, ParseError> {
        Ok(Self::from_parsed(parse(original)?))
    }

    pub fn from_parsed(parsed: ParsedDocument) -> Self {
        Self { pristine: parsed }
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.pristine
    }

    pub fn editable_layers(&self) -> Vec<EditableLayer> {
        editable_layers(&self.pristine.root)
    }

    /// Produce the customized document text.
    pub fn apply(&self, config: &VariantConfiguration, assets: &ResolvedAssets) -> String {
        let mut pass = Pass {
            index: &self.pristine.index,
            doc: self.pristine.markup.clone(),
            replaced: Vec::new(),
        };

        for modification in &config.layer_modifications {
            pass.modify(modification, assets);
        }

        pass.toggle_team_number(config.team_number_visible);

        for overlay in &config.pattern_overlays {
            match assets.pattern(&overlay.pattern_asset_id) {
                Some(url) => pass.overlay(
                    &overlay.target_position,
                    OverlayKind::Pattern,
                    &overlay.pattern_asset_id,
                    url,
                    None,
                ),
                None => tracing::debug!(
                    asset_id = %overlay.pattern_asset_id,
                    "Pattern asset not resolved, skipping overlay",
                ),
            }
        }

        for overlay in &config.embellishment_overlays {
            match assets.embellishment(&overlay.embellishment_asset_id) {
                Some(url) => pass.overlay(
                    &overlay.target_position,
                    OverlayKind::Embellishment,
                    &overlay.embellishment_asset_id,
                    url,
                    Some(f64::from(overlay.size_percent)),
                ),
                None => tracing::debug!(
                    asset_id = %overlay.embellishment_asset_id,
                    "Embellishment asset not resolved, skipping overlay",
                ),
            }
        }

        pass.doc.to_xml()
    }
}

/// Parse `original` and apply `config` in one step.
pub fn apply(
    original: &str,
    config: &VariantConfiguration,
    assets: &ResolvedAssets,
) -> Result<String, ParseError> {
    Ok(CustomizationSession::new(original)?.apply(config, assets))
}

/// `true` for layer names that denote the team-number slot, ignoring case
/// and separators (`teamNumber`, `team_number`, `Team Number 2`).
pub fn is_team_number_name(name: &str) -> bool {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    normalized.contains("teamnumber")
}

#[derive(Debug, Clone, Copy)]
enum OverlayKind {
    Pattern,
    Embellishment,
}

impl OverlayKind {
    fn as_str(self) -> &'static str {
        match self {
            OverlayKind::Pattern => "pattern",
            OverlayKind::Embellishment => "embellishment",
        }
    }

    fn aspect(self) -> &'static str {
        match self {
            OverlayKind::Pattern => "xMidYMid slice",
            OverlayKind::Embellishment => "xMidYMid meet",
        }
    }
}

/// One application in progress over a private copy of the markup.
struct Pass<'a> {
    index: &'a LayerIndex,
    doc: Document,
    /// Subtrees whose original content was swapped for a logo. Index paths
    /// below them no longer point at the original elements.
    replaced: Vec<ElementPath>,
}

impl Pass<'_> {
    fn targets(&self, reference: &str) -> Vec<ElementPath> {
        self.index
            .resolve(reference)
            .into_iter()
            .map(|entry| entry.element_path.clone())
            .filter(|path| !self.is_stale(path))
            .collect()
    }

    fn is_stale(&self, path: &[usize]) -> bool {
        self.replaced
            .iter()
            .any(|r| path.len() > r.len() && path.starts_with(r))
    }

    fn modify(&mut self, modification: &LayerModification, assets: &ResolvedAssets) {
        let targets = self.targets(&modification.layer_id);
        if targets.is_empty() {
            tracing::debug!(layer = %modification.layer_id, "No layer matches, skipping");
            return;
        }

        match modification.role {
            LayerRole::Text => {
                for path in &targets {
                    if let Some(text) = self.doc.root.at_path_mut(path).and_then(first_text_mut) {
                        set_text(text, &modification.value);
                    }
                }
            }
            LayerRole::Graphic => {
                let Some(color) = assets.color(&modification.value) else {
                    tracing::debug!(color = %modification.value, "Color not resolved, skipping");
                    return;
                };
                for path in &targets {
                    if let Some(el) = self.doc.root.at_path_mut(path) {
                        recolor(el, &color);
                    }
                }
            }
            LayerRole::Logo => {
                let Some(url) = assets.logo(&modification.value) else {
                    tracing::debug!(logo = %modification.value, "Logo not resolved, skipping");
                    return;
                };
                for path in targets {
                    self.place_logo(path, url);
                }
            }
        }
    }

    fn place_logo(&mut self, path: ElementPath, url: &str) {
        let Some(el) = self.doc.root.at_path_mut(&path) else {
            return;
        };
        let frame = bounding_box(el).unwrap_or(DEFAULT_BOX);

        if CONTAINERS.contains(&el.local_name()) {
            let image = image_element(Element::new("image"), url, &frame, "xMidYMid meet");
            el.children = vec![Markup::Element(image)];
        } else {
            let mut image = Element::new("image");
            for key in ["id", "data-name", "inkscape:label"] {
                if let Some(value) = el.attr(key) {
                    image.set_attr(key, value);
                }
            }
            *el = image_element(image, url, &frame, "xMidYMid meet");
        }

        self.replaced.push(path);
    }

    fn toggle_team_number(&mut self, visible: bool) {
        let paths: Vec<ElementPath> = self
            .index
            .entries()
            .iter()
            .filter(|entry| is_team_number_name(&entry.name) || is_team_number_name(&entry.id))
            .map(|entry| entry.element_path.clone())
            .filter(|path| !self.is_stale(path))
            .collect();

        for path in paths {
            let Some(el) = self.doc.root.at_path_mut(&path) else {
                continue;
            };
            if visible {
                if el.attr("display").is_some_and(|d| d.trim() == "none") {
                    el.remove_attr("display");
                }
                if el.attr("visibility").is_some_and(|v| v.trim() == "hidden") {
                    el.remove_attr("visibility");
                }
            } else {
                el.set_attr("display", "none");
            }
        }
    }

    fn overlay(
        &mut self,
        target: &str,
        kind: OverlayKind,
        asset_id: &str,
        url: &str,
        scale_percent: Option<f64>,
    ) {
        let Some(path) = self.targets(target).into_iter().next() else {
            tracing::debug!(position = %target, overlay = kind.as_str(), "No overlay target, skipping");
            return;
        };
        let Some(el) = self.doc.root.at_path(&path) else {
            return;
        };

        let mut frame = bounding_box(el).unwrap_or(DEFAULT_BOX);
        if let Some(percent) = scale_percent {
            frame = frame.scaled(percent);
        }
        let is_container = CONTAINERS.contains(&el.local_name());

        let image = image_element(
            Element::new("image")
                .with_attr(OVERLAY_ATTR, kind.as_str())
                .with_attr("data-asset", asset_id),
            url,
            &frame,
            kind.aspect(),
        );

        let host_path = if is_container || path.is_empty() {
            &path[..]
        } else {
            &path[..path.len() - 1]
        };
        if let Some(host) = self.doc.root.at_path_mut(host_path) {
            host.children.push(Markup::Element(image));
        }
    }
}

fn image_element(base: Element, url: &str, frame: &BoundingBox, aspect: &str) -> Element {
    base.with_attr("x", format_number(frame.x))
        .with_attr("y", format_number(frame.y))
        .with_attr("width", format_number(frame.width))
        .with_attr("height", format_number(frame.height))
        .with_attr("href", url)
        .with_attr("preserveAspectRatio", aspect)
}

/// The element itself if it is `text`, else its first `text` descendant.
fn first_text_mut(el: &mut Element) -> Option<&mut Element> {
    if el.local_name() == "text" {
        return Some(el);
    }
    el.children.iter_mut().find_map(|child| match child {
        Markup::Element(inner) => first_text_mut(inner),
        _ => None,
    })
}

/// Replace the text of a `text` element. The first `tspan` keeps its
/// attributes and receives the value; other content is dropped.
fn set_text(el: &mut Element, value: &str) {
    let tspan = el.children.drain(..).find_map(|child| match child {
        Markup::Element(inner) if inner.local_name() == "tspan" => Some(inner),
        _ => None,
    });
    el.children = match tspan {
        Some(mut tspan) => {
            tspan.children = vec![Markup::Text(value.to_string())];
            vec![Markup::Element(tspan)]
        }
        None => vec![Markup::Text(value.to_string())],
    };
}

/// Recolor drawable descendants whose fill is not `none`, or the element
/// itself when it has no drawable descendants. Returns how many elements
/// changed.
fn recolor(el: &mut Element, color: &str) -> usize {
    if count_drawables(el) > 0 {
        recolor_descendants(el, color)
    } else if is_paintable(el) {
        el.set_attr("fill", color);
        1
    } else {
        0
    }
}

fn count_drawables(el: &Element) -> usize {
    el.child_elements()
        .map(|child| {
            let local = child.local_name();
            if DRAWABLE.contains(&local) {
                1
            } else if CONTAINERS.contains(&local) {
                count_drawables(child)
            } else {
                0
            }
        })
        .sum()
}

fn recolor_descendants(el: &mut Element, color: &str) -> usize {
    let mut changed = 0;
    for child in &mut el.children {
        let Markup::Element(child) = child else {
            continue;
        };
        let local = child.local_name();
        if DRAWABLE.contains(&local) {
            if is_paintable(child) {
                child.set_attr("fill", color);
                changed += 1;
            }
        } else if CONTAINERS.contains(&local) {
            changed += recolor_descendants(child, color);
        }
    }
    changed
}

/// A missing fill paints black by default, so it counts as paintable.
fn is_paintable(el: &Element) -> bool {
    el.attr("fill")
        .map_or(true, |fill| !crate::layers::node::is_none_paint(fill))
}
