//! Customization of template documents.

pub mod assets;
pub mod config;
pub mod engine;

pub use assets::{is_hex_color, AssetRequest, ResolvedAssets};
pub use config::{EmbellishmentOverlay, LayerModification, PatternOverlay, VariantConfiguration};
pub use engine::{apply, is_team_number_name, CustomizationSession, OVERLAY_ATTR};
