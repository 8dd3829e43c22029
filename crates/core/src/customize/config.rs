//! Operator intent for one customization, independent of any document.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::layers::LayerRole;

/// Smallest embellishment scale, in percent of the target box.
pub const MIN_EMBELLISHMENT_PERCENT: u16 = 50;

/// Largest embellishment scale, in percent of the target box.
pub const MAX_EMBELLISHMENT_PERCENT: u16 = 200;

/// Maximum length of a replacement text.
pub const MAX_TEXT_LENGTH: usize = 200;

/// One layer edit.
///
/// `value` depends on `role`: the replacement text, a hex color or catalog
/// color id, or a catalog logo id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LayerModification {
    #[validate(length(min = 1))]
    pub layer_id: String,
    pub role: LayerRole,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PatternOverlay {
    #[validate(length(min = 1))]
    pub pattern_asset_id: String,
    /// Layer id or name of the slot the pattern covers.
    #[validate(length(min = 1))]
    pub target_position: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmbellishmentOverlay {
    #[validate(length(min = 1))]
    pub embellishment_asset_id: String,
    #[validate(length(min = 1))]
    pub target_position: String,
    #[validate(range(min = 50, max = 200))]
    pub size_percent: u16,
}

/// Everything an operator asked for in one submission.
///
/// Always applied to the pristine template, never on top of an earlier
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VariantConfiguration {
    #[serde(default)]
    #[validate(nested)]
    pub layer_modifications: Vec<LayerModification>,
    #[serde(default)]
    #[validate(nested)]
    pub pattern_overlays: Vec<PatternOverlay>,
    #[serde(default)]
    #[validate(nested)]
    pub embellishment_overlays: Vec<EmbellishmentOverlay>,
    #[serde(default = "default_team_number_visible")]
    pub team_number_visible: bool,
}

fn default_team_number_visible() -> bool {
    true
}

impl Default for VariantConfiguration {
    fn default() -> Self {
        Self {
            layer_modifications: Vec::new(),
            pattern_overlays: Vec::new(),
            embellishment_overlays: Vec::new(),
            team_number_visible: default_team_number_visible(),
        }
    }
}

impl VariantConfiguration {
    /// Field validation plus the role-dependent value rules.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;

        for modification in &self.layer_modifications {
            match modification.role {
                LayerRole::Text => {
                    if modification.value.chars().count() > MAX_TEXT_LENGTH {
                        return Err(CoreError::Validation(format!(
                            "Text for layer '{}' exceeds {MAX_TEXT_LENGTH} characters",
                            modification.layer_id
                        )));
                    }
                }
                LayerRole::Graphic | LayerRole::Logo => {
                    if modification.value.trim().is_empty() {
                        return Err(CoreError::Validation(format!(
                            "Layer '{}' needs a color or logo reference",
                            modification.layer_id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
