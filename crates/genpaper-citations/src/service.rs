//! Async citation service: resolution against the paper store and the
//! matcher, layered over the pure post-processing core.
//!
//! Network- and database-backed resolution lives here so postprocess.rs
//! stays deterministic. The service also owns the streaming buffer logic:
//! text is flushed to clients only up to the last offset that cannot be
//! inside a partially received marker.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use genpaper_common::Result;
use genpaper_db::PaperStore;

use crate::formatter::CitationFormatter;
use crate::marker::{extract_markers, CitationMarker, ReferenceType};
use crate::matcher::CitationMatcher;
use crate::models::Citation;
use crate::numeric::NumberMap;
use crate::postprocess::{process, ProcessedDocument};
use crate::style::StyleId;

/// Longest marker any grammar can produce; streaming lookback is bounded by
/// this. Extended markers cap at type + value + 80 chars of context.
const MAX_MARKER_LEN: usize = 512;

pub struct CitationService {
    formatter: CitationFormatter,
    papers: Arc<dyn PaperStore>,
    matcher: RwLock<CitationMatcher>,
}

impl CitationService {
    pub fn new(formatter: CitationFormatter, papers: Arc<dyn PaperStore>) -> Self {
        Self {
            formatter,
            papers,
            matcher: RwLock::new(CitationMatcher::new(Vec::new())),
        }
    }

    pub fn formatter(&self) -> &CitationFormatter {
        &self.formatter
    }

    /// Replace the citation set used for title/URL/fuzzy resolution.
    /// Render caches are cleared since citation data may have been
    /// re-derived.
    pub fn update_citations(&self, citations: Vec<Citation>) {
        if let Ok(mut matcher) = self.matcher.write() {
            matcher.update_citations(citations);
        }
        self.formatter.clear_caches();
    }

    /// Resolve every unique marker reference. Lookups that fail are simply
    /// absent from the returned map; the post-processor records them as
    /// unresolved.
    pub async fn resolve_references(
        &self,
        markers: &[CitationMarker],
    ) -> Result<HashMap<String, Citation>> {
        let mut resolved: HashMap<String, Citation> = HashMap::new();
        for m in markers {
            if resolved.contains_key(&m.value) {
                continue;
            }
            let citation = match m.ref_type {
                ReferenceType::PaperId => self
                    .papers
                    .get(&m.value)
                    .await?
                    .map(|rec| Citation::from_record(&rec)),
                ReferenceType::Doi => self
                    .papers
                    .find_by_doi(&m.value)
                    .await?
                    .map(|rec| Citation::from_record(&rec)),
                ReferenceType::Title => self.match_text(&m.value, m.context.as_deref()),
                ReferenceType::Url => self.match_url(&m.value),
            };
            match citation {
                Some(c) => {
                    resolved.insert(m.value.clone(), c);
                }
                None => {
                    debug!(reference = %m.value, ref_type = ?m.ref_type, "reference not found");
                }
            }
        }
        Ok(resolved)
    }

    fn match_text(&self, value: &str, context: Option<&str>) -> Option<Citation> {
        let matcher = self.matcher.read().ok()?;
        matcher
            .find_best_match(value)
            .or_else(|| context.and_then(|ctx| matcher.find_best_match(ctx)))
            .map(|m| m.citation)
    }

    fn match_url(&self, value: &str) -> Option<Citation> {
        let matcher = self.matcher.read().ok()?;
        let needle = value.trim_end_matches('/');
        matcher
            .citations()
            .iter()
            .find(|c| {
                c.url
                    .as_deref()
                    .is_some_and(|u| u.trim_end_matches('/') == needle)
            })
            .cloned()
    }

    /// Full pipeline over a finished document: extract, resolve, format,
    /// replace, clean.
    pub async fn process_document(
        &self,
        text: &str,
        style: &StyleId,
        numbers: Option<&NumberMap>,
    ) -> Result<ProcessedDocument> {
        let markers = extract_markers(text);
        let resolved = self.resolve_references(&markers).await?;
        Ok(process(text, &resolved, style, &self.formatter, numbers))
    }
}

/// Largest prefix of `text` that is safe to flush mid-stream: everything
/// before the last marker opener that has not yet seen its closing
/// delimiter. Lookback is bounded, so a stray bracket cannot stall the
/// stream forever.
pub fn safe_split_point(text: &str) -> usize {
    let tail_start = floor_char_boundary(text, text.len().saturating_sub(MAX_MARKER_LEN));
    let tail = &text[tail_start..];

    let mut hold: Option<usize> = None;
    if let Some(pos) = tail.rfind("[[") {
        if !tail[pos..].contains("]]") {
            hold = Some(tail_start + pos);
        }
    }
    if let Some(pos) = tail.rfind('[') {
        // a lone opener still waiting for any close
        if !tail[pos..].contains(']') {
            hold = Some(hold.map_or(tail_start + pos, |h| h.min(tail_start + pos)));
        }
    }
    hold.unwrap_or(text.len())
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Rolling buffer for streamed generation. Chunks accumulate; `take_ready`
/// yields the prefix that cannot contain a partial marker, `finish` drains
/// the remainder.
#[derive(Default)]
pub struct StreamBuffer {
    pending: String,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.pending.push_str(chunk);
    }

    pub fn take_ready(&mut self) -> Option<String> {
        let split = safe_split_point(&self.pending);
        if split == 0 {
            return None;
        }
        let rest = self.pending.split_off(split);
        let ready = std::mem::replace(&mut self.pending, rest);
        Some(ready)
    }

    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpaper_db::{MemoryStore, PaperRecord};

    fn service_with_paper() -> (CitationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = CitationService::new(CitationFormatter::default(), store.clone());
        (service, store)
    }

    fn smith_record() -> PaperRecord {
        let mut rec = PaperRecord::stub("a1b2c3", "Deep Learning Advances");
        rec.authors = vec!["Smith, J.".to_string()];
        rec.year = Some(2023);
        rec.doi = Some("10.1038/s42256".to_string());
        rec
    }

    #[tokio::test]
    async fn test_process_document_end_to_end() {
        let (service, store) = service_with_paper();
        store.upsert(&smith_record()).await.unwrap();

        let style = StyleId::new("apa").unwrap();
        let doc = service
            .process_document("Accuracy improved [@a1b2c3].", &style, None)
            .await
            .unwrap();
        assert_eq!(doc.content, "Accuracy improved (Smith, 2023).");
        assert_eq!(doc.citations.len(), 1);
        assert!(doc.unresolved_references.is_empty());
    }

    #[tokio::test]
    async fn test_doi_reference_resolves_via_store() {
        let (service, store) = service_with_paper();
        store.upsert(&smith_record()).await.unwrap();

        let style = StyleId::new("apa").unwrap();
        let doc = service
            .process_document("Shown in [[CITE:doi:10.1038/s42256]].", &style, None)
            .await
            .unwrap();
        assert_eq!(doc.content, "Shown in (Smith, 2023).");
    }

    #[tokio::test]
    async fn test_title_reference_resolves_via_matcher() {
        let (service, store) = service_with_paper();
        store.upsert(&smith_record()).await.unwrap();
        service.update_citations(vec![Citation::from_record(&smith_record())]);

        let style = StyleId::new("apa").unwrap();
        let doc = service
            .process_document(
                "Per [[CITE:title:Deep Learning Advances]], accuracy rose.",
                &style,
                None,
            )
            .await
            .unwrap();
        assert_eq!(doc.content, "Per (Smith, 2023), accuracy rose.");
    }

    #[tokio::test]
    async fn test_unknown_reference_reported() {
        let (service, _) = service_with_paper();
        let style = StyleId::new("apa").unwrap();
        let doc = service
            .process_document("Nothing here [@ffff].", &style, None)
            .await
            .unwrap();
        assert_eq!(doc.unresolved_references, vec!["ffff".to_string()]);
    }

    #[test]
    fn test_safe_split_holds_partial_markers() {
        assert_eq!(safe_split_point("hello world"), 11);
        // partial modern marker held back
        let t = "hello [@ab";
        assert_eq!(safe_split_point(t), 6);
        // partial extended marker held back even after one bracket closes
        let t = "hello [[CITE:doi:10.1/x]";
        assert_eq!(safe_split_point(t), 6);
        // closed marker flushes fully
        assert_eq!(safe_split_point("done [@abcd12] x"), 16);
    }

    #[test]
    fn test_stream_buffer_reassembles_markers() {
        let mut buf = StreamBuffer::new();
        buf.push("Accuracy improved [@a1");
        let ready = buf.take_ready().unwrap();
        assert_eq!(ready, "Accuracy improved ");
        buf.push("b2c3] end.");
        assert_eq!(buf.finish(), "[@a1b2c3] end.");
    }
}
