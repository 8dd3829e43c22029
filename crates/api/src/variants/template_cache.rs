//! Parsed templates cached per template id.
//!
//! An entry holds the pristine [`CustomizationSession`] and its editable
//! layers. It is reused only while the template's vector source is
//! unchanged; editing the template invalidates it on the next lookup.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use kitforge_core::customize::CustomizationSession;
use kitforge_core::layers::{EditableLayer, ParseError};
use kitforge_core::types::DbId;

/// One parsed template.
#[derive(Debug)]
pub struct CachedTemplate {
    pub session: CustomizationSession,
    pub layers: Vec<EditableLayer>,
}

struct Entry {
    fingerprint: u64,
    template: Arc<CachedTemplate>,
}

#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<DbId, Entry>>,
}

fn fingerprint(source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed form of `source`, parsing only on a miss.
    pub fn get_or_parse(
        &self,
        template_id: DbId,
        source: &str,
    ) -> Result<Arc<CachedTemplate>, ParseError> {
        let fingerprint = fingerprint(source);

        if let Some(template) = self.lookup(template_id, fingerprint) {
            return Ok(template);
        }

        let session = CustomizationSession::new(source)?;
        let layers = session.editable_layers();
        let template = Arc::new(CachedTemplate { session, layers });
        tracing::debug!(
            template_id,
            layers = template.layers.len(),
            "Cached parsed template"
        );

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                template_id,
                Entry {
                    fingerprint,
                    template: Arc::clone(&template),
                },
            );
        }
        Ok(template)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, template_id: DbId, fingerprint: u64) -> Option<Arc<CachedTemplate>> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(&template_id)
            .filter(|e| e.fingerprint == fingerprint)
            .map(|e| Arc::clone(&e.template))
    }
}

#[cfg(test)]
mod tests {
    use kitforge_core::customize::{ResolvedAssets, VariantConfiguration};

    use super::*;

    const JERSEY: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="body" fill="#ffffff"><rect width="10" height="10"/></g>
        <text id="player_name">SMITH</text>
    </svg>"##;

    #[test]
    fn reuses_entry_for_same_source() {
        let cache = TemplateCache::new();
        let first = cache.get_or_parse(1, JERSEY).unwrap();
        let second = cache.get_or_parse(1, JERSEY).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.layers.len(), 2);
    }

    #[test]
    fn cached_session_renders_like_a_fresh_parse() {
        let cache = TemplateCache::new();
        let config = VariantConfiguration::default();
        let assets = ResolvedAssets::default();

        let cached = cache.get_or_parse(1, JERSEY).unwrap();
        let first = cached.session.apply(&config, &assets);
        let again = cache.get_or_parse(1, JERSEY).unwrap().session.apply(&config, &assets);
        let fresh = CustomizationSession::new(JERSEY).unwrap().apply(&config, &assets);
        assert_eq!(first, fresh);
        assert_eq!(again, fresh);
    }

    #[test]
    fn reparses_when_source_changes() {
        let cache = TemplateCache::new();
        let first = cache.get_or_parse(1, JERSEY).unwrap();
        let edited = JERSEY.replace("SMITH", "JONES");
        let second = cache.get_or_parse(1, &edited).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let cache = TemplateCache::new();
        assert!(cache.get_or_parse(2, "<svg>").is_err());
        assert!(cache.is_empty());
    }
}
