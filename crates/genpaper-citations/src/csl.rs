//! Deferred style-engine path: CSL style resolution, fetch and caching.
//!
//! A small set of styles ships bundled at build time; any other id is
//! fetched on demand from the remote style repository, validated as
//! well-formed CSL XML, registered, and cached for the process lifetime.
//! Fetch or validation failure degrades to the APA fallback rather than
//! erroring. Rendering of external styles goes through the nearest builtin
//! (author-date defaults), which keeps the two formatting paths
//! behaviorally consistent for the styles both claim to support.

use std::collections::HashMap;
use std::sync::RwLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::style::StyleId;

/// Style id every failure path degrades to.
pub const FALLBACK_STYLE: &str = "apa";

const DEFAULT_REPOSITORY: &str =
    "https://raw.githubusercontent.com/citation-style-language/styles/master";

/// Styles registered at build time.
const BUNDLED: &[(&str, &str)] = &[
    ("apa", include_str!("../styles/apa.csl")),
    (
        "modern-language-association",
        include_str!("../styles/modern-language-association.csl"),
    ),
    (
        "chicago-author-date",
        include_str!("../styles/chicago-author-date.csl"),
    ),
    ("ieee", include_str!("../styles/ieee.csl")),
    ("harvard1", include_str!("../styles/harvard1.csl")),
];

pub struct StyleEngine {
    client: reqwest::Client,
    repository_url: String,
    registry: RwLock<HashMap<String, String>>,
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REPOSITORY)
    }
}

impl StyleEngine {
    pub fn new(repository_url: impl Into<String>) -> Self {
        let mut registry = HashMap::new();
        for (id, xml) in BUNDLED {
            registry.insert((*id).to_string(), (*xml).to_string());
        }
        Self {
            client: reqwest::Client::new(),
            repository_url: repository_url.into(),
            registry: RwLock::new(registry),
        }
    }

    /// Style-availability predicate over the registry (bundled + fetched).
    pub fn has_style(&self, style: &StyleId) -> bool {
        self.registry
            .read()
            .map(|r| r.contains_key(style.canonical()))
            .unwrap_or(false)
    }

    /// Fetch-or-fallback. Returns the style id actually usable for
    /// formatting: the requested canonical id when it is registered or could
    /// be fetched and validated, otherwise the APA fallback.
    pub async fn ensure_style(&self, style: &StyleId) -> String {
        let id = style.canonical().to_string();
        if self.has_style(style) {
            return id;
        }
        match self.fetch_style(&id).await {
            Ok(xml) => {
                if let Ok(mut registry) = self.registry.write() {
                    registry.insert(id.clone(), xml);
                }
                debug!(style = %id, "registered remote citation style");
                id
            }
            Err(reason) => {
                warn!(style = %id, reason = %reason, "style unavailable, falling back");
                FALLBACK_STYLE.to_string()
            }
        }
    }

    async fn fetch_style(&self, id: &str) -> Result<String, String> {
        let url = format!("{}/{}.csl", self.repository_url.trim_end_matches('/'), id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status().as_u16()));
        }
        let body = resp.text().await.map_err(|e| format!("body read failed: {e}"))?;
        validate_csl(&body)?;
        Ok(body)
    }

    /// Drop fetched styles, keeping the bundled set. Used when the remote
    /// repository content is suspected stale.
    pub fn clear_fetched(&self) {
        if let Ok(mut registry) = self.registry.write() {
            registry.clear();
            for (id, xml) in BUNDLED {
                registry.insert((*id).to_string(), (*xml).to_string());
            }
        }
    }

    pub fn registered_count(&self) -> usize {
        self.registry.read().map(|r| r.len()).unwrap_or(0)
    }
}

/// Well-formedness check for a fetched style document: parses as XML from
/// start to EOF and the root element is `style`.
pub fn validate_csl(body: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut saw_root = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !saw_root {
                    let name = e.local_name();
                    if name.as_ref() != b"style" {
                        return Err(format!(
                            "root element is not <style>: <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        ));
                    }
                    saw_root = true;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed XML: {e}")),
        }
    }
    if !saw_root {
        return Err("no root element".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(id: &str) -> StyleId {
        StyleId::new(id).unwrap()
    }

    #[test]
    fn test_bundled_styles_registered() {
        let engine = StyleEngine::default();
        for id in ["apa", "ieee", "harvard1", "chicago-author-date"] {
            assert!(engine.has_style(&style(id)), "missing bundled style {id}");
        }
        assert!(!engine.has_style(&style("nature")));
    }

    #[test]
    fn test_aliases_hit_bundled_styles() {
        let engine = StyleEngine::default();
        assert!(engine.has_style(&style("harvard")));
        assert!(engine.has_style(&style("mla")));
        assert!(engine.has_style(&style("chicago")));
        assert!(engine.has_style(&style("apa-7")));
    }

    #[test]
    fn test_bundled_documents_are_well_formed() {
        for (id, xml) in BUNDLED {
            validate_csl(xml).unwrap_or_else(|e| panic!("bundled style {id} invalid: {e}"));
        }
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate_csl("not xml at all").is_err());
        assert!(validate_csl("<html><body>404</body></html>").is_err());
        assert!(validate_csl("<style><unclosed></style>").is_err());
        assert!(validate_csl("").is_err());
    }

    #[tokio::test]
    async fn test_ensure_style_registered_is_immediate() {
        let engine = StyleEngine::default();
        assert_eq!(engine.ensure_style(&style("apa")).await, "apa");
        assert_eq!(engine.ensure_style(&style("harvard")).await, "harvard1");
    }

    #[tokio::test]
    async fn test_ensure_style_unreachable_repo_falls_back() {
        // port 9 is discard; the request fails fast and the fallback applies
        let engine = StyleEngine::new("http://127.0.0.1:9");
        assert_eq!(engine.ensure_style(&style("nature")).await, "apa");
    }

    #[test]
    fn test_clear_fetched_keeps_bundled() {
        let engine = StyleEngine::default();
        let before = engine.registered_count();
        engine.clear_fetched();
        assert_eq!(engine.registered_count(), before);
    }
}
