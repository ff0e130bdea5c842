//! Render cache for in-text citations.
//!
//! Keyed by (citation id, style id). An explicit cache object with injected
//! lifetime rather than a process global: the owning formatter instance
//! decides when entries are invalidated, and tests get isolation for free.
//! Entries are invalidated only by explicit clears, never by time.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct RenderCache {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, citation_id: &str, style_id: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries
            .get(&(citation_id.to_string(), style_id.to_string()))
            .cloned()
    }

    pub fn insert(&self, citation_id: &str, style_id: &str, rendered: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((citation_id.to_string(), style_id.to_string()), rendered);
        }
    }

    /// Drop every entry, e.g. when citation data is re-derived.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Drop entries for one style, e.g. when the active style changes and
    /// its rendering rules may have been refetched.
    pub fn clear_for_style(&self, style_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(_, s), _| s != style_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_clear() {
        let cache = RenderCache::new();
        cache.insert("c1", "apa", "(Smith, 2023)".to_string());
        cache.insert("c1", "ieee", "[1]".to_string());
        assert_eq!(cache.get("c1", "apa").as_deref(), Some("(Smith, 2023)"));
        assert!(cache.get("c2", "apa").is_none());

        cache.clear_for_style("apa");
        assert!(cache.get("c1", "apa").is_none());
        assert_eq!(cache.get("c1", "ieee").as_deref(), Some("[1]"));

        cache.clear();
        assert!(cache.is_empty());
    }
}
