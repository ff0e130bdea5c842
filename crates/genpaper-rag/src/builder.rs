//! Chunk scoring and selection for retrieval context.
//!
//! Lexical term-overlap scoring with metadata boosts, then greedy top-down
//! selection under a token budget. Chunks from sections that usually carry
//! evidence (results, methods, discussion) score higher, as do chunks with
//! numeric data and matching key terms.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use genpaper_common::text::{content_words, estimate_tokens};
use genpaper_common::{GenPaperError, Result};
use genpaper_db::ChunkRecord;
use genpaper_ingestion::SectionType;

/// Weights for the score components. Components are each in [0, 1]; the
/// weighted sum is too.
#[derive(Debug, Clone)]
pub struct SelectionWeights {
    pub term_overlap: f64,
    pub section: f64,
    pub numeric_data: f64,
    pub key_terms: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            term_overlap: 0.55,
            section: 0.20,
            numeric_data: 0.10,
            key_terms: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub paper_id: String,
    pub chunk_id: String,
    pub section_type: Option<String>,
    pub score: f64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub entries: Vec<ContextEntry>,
    pub token_estimate: usize,
}

impl ContextBundle {
    /// Distinct papers contributing evidence, in score order.
    pub fn paper_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.paper_id.clone()))
            .map(|e| e.paper_id.clone())
            .collect()
    }
}

pub struct ContextBuilder {
    weights: SelectionWeights,
    pub max_entries: usize,
    pub token_budget: usize,
    pub min_score: f64,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            weights: SelectionWeights::default(),
            max_entries: 12,
            token_budget: 6_000,
            min_score: 0.08,
        }
    }
}

impl ContextBuilder {
    pub fn new(weights: SelectionWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    /// Score and select chunks for `query`. Fails with the actionable
    /// no-content error when nothing clears the score floor.
    pub fn build(&self, query: &str, chunks: &[ChunkRecord]) -> Result<ContextBundle> {
        let query_terms: HashSet<String> = content_words(query, 3).into_iter().collect();

        let mut scored: Vec<(f64, &ChunkRecord)> = chunks
            .iter()
            .map(|c| (self.score_chunk(&query_terms, c), c))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut entries = Vec::new();
        let mut tokens = 0usize;
        for (score, chunk) in scored {
            if entries.len() >= self.max_entries {
                break;
            }
            let chunk_tokens = estimate_tokens(&chunk.content);
            if tokens + chunk_tokens > self.token_budget && !entries.is_empty() {
                continue; // a smaller later chunk may still fit
            }
            tokens += chunk_tokens;
            entries.push(ContextEntry {
                paper_id: chunk.paper_id.clone(),
                chunk_id: chunk.id.clone(),
                section_type: chunk.section_type.clone(),
                score,
                content: chunk.content.clone(),
            });
        }

        if entries.is_empty() {
            return Err(GenPaperError::NoRelevantContent(format!(
                "no chunks matched the query across {} candidates",
                chunks.len()
            )));
        }
        debug!(
            selected = entries.len(),
            candidates = chunks.len(),
            tokens,
            "retrieval context built"
        );
        Ok(ContextBundle {
            entries,
            token_estimate: tokens,
        })
    }

    fn score_chunk(&self, query_terms: &HashSet<String>, chunk: &ChunkRecord) -> f64 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let chunk_terms: HashSet<String> = content_words(&chunk.content, 3).into_iter().collect();
        let overlap = query_terms.intersection(&chunk_terms).count() as f64
            / query_terms.len() as f64;

        let section_score = match chunk
            .section_type
            .as_deref()
            .map(SectionType::parse)
        {
            Some(SectionType::Results) => 1.0,
            Some(SectionType::Methods) => 0.8,
            Some(SectionType::Discussion) => 0.7,
            Some(SectionType::Conclusion) => 0.6,
            Some(SectionType::Abstract) => 0.5,
            Some(SectionType::References) => 0.0,
            _ => 0.3,
        };

        let has_numeric = chunk.metadata["has_numeric_data"]
            .as_bool()
            .unwrap_or(false);

        let key_term_score = match chunk.metadata["key_terms"].as_array() {
            Some(terms) if !terms.is_empty() => {
                let hits = terms
                    .iter()
                    .filter_map(|t| t.as_str())
                    .filter(|t| query_terms.contains(*t))
                    .count();
                hits as f64 / terms.len() as f64
            }
            _ => 0.0,
        };

        self.weights.term_overlap * overlap
            + self.weights.section * section_score
            + self.weights.numeric_data * if has_numeric { 1.0 } else { 0.0 }
            + self.weights.key_terms * key_term_score
    }
}
