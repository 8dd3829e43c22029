//! Variant generation policy: expansion and the per-item ceiling.

use crate::customize::VariantConfiguration;
use crate::error::CoreError;

/// Most live variants a single item may have.
pub const MAX_VARIANTS_PER_ITEM: usize = 20;

/// Concrete configurations produced from one submission.
///
/// Combinatorial expansion over alternative colors is not supported: a
/// submission always yields itself.
pub fn expand_configuration(config: &VariantConfiguration) -> Vec<VariantConfiguration> {
    vec![config.clone()]
}

/// Keep at most `room` expansions, in order.
pub fn cap_expansion<T>(mut expansions: Vec<T>, room: usize) -> Vec<T> {
    expansions.truncate(room);
    expansions
}

/// Slots left for an item that already has `existing` variants.
pub fn remaining_capacity(existing: i64) -> usize {
    let existing = usize::try_from(existing.max(0)).unwrap_or(usize::MAX);
    MAX_VARIANTS_PER_ITEM.saturating_sub(existing)
}

/// Error for an item with no room left.
pub fn ceiling_reached(item_id: i64) -> CoreError {
    CoreError::Conflict(format!(
        "Item {item_id} already has the maximum of {MAX_VARIANTS_PER_ITEM} variants"
    ))
}

/// Display name for the `ordinal`-th variant of a template (1-based).
pub fn variant_name(template_name: &str, ordinal: i64) -> String {
    format!("{template_name} #{ordinal}")
}
