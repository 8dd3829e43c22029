//! Catalog lookups a configuration depends on.
//!
//! The engine never talks to the catalog itself. Callers gather the ids a
//! configuration references with [`AssetRequest::for_configuration`],
//! resolve them, and pass the result in as [`ResolvedAssets`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::config::VariantConfiguration;
use crate::layers::LayerRole;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

/// `true` for `#rgb` and `#rrggbb` literals.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Catalog values keyed by the ids a configuration references.
///
/// Colors map to hex strings; logos, patterns and embellishments map to
/// image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAssets {
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub logos: BTreeMap<String, String>,
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,
    #[serde(default)]
    pub embellishments: BTreeMap<String, String>,
}

impl ResolvedAssets {
    /// Hex value for a color reference. Literal hex colors resolve to
    /// themselves (lowercased); anything else must be a catalog id.
    pub fn color(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if is_hex_color(reference) {
            return Some(reference.to_ascii_lowercase());
        }
        self.colors.get(reference).cloned()
    }

    pub fn logo(&self, id: &str) -> Option<&str> {
        self.logos.get(id).map(String::as_str)
    }

    pub fn pattern(&self, id: &str) -> Option<&str> {
        self.patterns.get(id).map(String::as_str)
    }

    pub fn embellishment(&self, id: &str) -> Option<&str> {
        self.embellishments.get(id).map(String::as_str)
    }
}

/// Catalog ids referenced by a configuration, grouped by asset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRequest {
    pub color_ids: BTreeSet<String>,
    pub logo_ids: BTreeSet<String>,
    pub pattern_ids: BTreeSet<String>,
    pub embellishment_ids: BTreeSet<String>,
}

impl AssetRequest {
    pub fn for_configuration(config: &VariantConfiguration) -> Self {
        let mut request = Self::default();
        for modification in &config.layer_modifications {
            let value = modification.value.trim();
            match modification.role {
                LayerRole::Graphic if !is_hex_color(value) => {
                    request.color_ids.insert(value.to_string());
                }
                LayerRole::Logo => {
                    request.logo_ids.insert(value.to_string());
                }
                _ => {}
            }
        }
        request.pattern_ids.extend(
            config
                .pattern_overlays
                .iter()
                .map(|p| p.pattern_asset_id.clone()),
        );
        request.embellishment_ids.extend(
            config
                .embellishment_overlays
                .iter()
                .map(|e| e.embellishment_asset_id.clone()),
        );
        request
    }

    pub fn is_empty(&self) -> bool {
        self.color_ids.is_empty()
            && self.logo_ids.is_empty()
            && self.pattern_ids.is_empty()
            && self.embellishment_ids.is_empty()
    }
}
