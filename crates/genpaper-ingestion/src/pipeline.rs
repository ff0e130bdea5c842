//! Ingestion pipeline for a single paper's extracted text.
//!
//! Orchestrates chunking, metadata extraction and chunk persistence.
//! Collaborator failures are converted into the content-error taxonomy with
//! the paper id attached for diagnosis.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use genpaper_common::{GenPaperError, Result};
use genpaper_db::ChunkStore;

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::models::SectionType;

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub paper_id: String,
    pub chunks_inserted: usize,
    pub sections_detected: usize,
}

/// Chunk `full_text`, extract metadata, and persist the chunks.
#[instrument(skip(store, full_text))]
pub async fn ingest_paper(
    store: Arc<dyn ChunkStore>,
    paper_id: &str,
    full_text: &str,
    config: &ChunkerConfig,
) -> Result<IngestSummary> {
    let chunks = chunk_text(paper_id, full_text, config);
    if chunks.is_empty() {
        return Err(GenPaperError::ChunkingFailed {
            paper_id: paper_id.to_string(),
            message: "no text to chunk".to_string(),
        });
    }

    let sections_detected = chunks
        .iter()
        .filter(|c| {
            c.metadata
                .section_type
                .is_some_and(|s| s != SectionType::Unknown)
        })
        .count();

    let records: Vec<_> = chunks.iter().map(|c| c.to_record()).collect();
    let inserted = store
        .insert_batch(&records)
        .await
        .map_err(|e| GenPaperError::IngestionFailed {
            paper_id: paper_id.to_string(),
            message: e.to_string(),
        })?;

    info!(paper_id, inserted, sections_detected, "paper chunked and stored");
    Ok(IngestSummary {
        paper_id: paper_id.to_string(),
        chunks_inserted: inserted,
        sections_detected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpaper_db::MemoryStore;

    #[tokio::test]
    async fn test_ingest_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let text = "Methods: We recruited participants. ".repeat(50);
        let summary = ingest_paper(store.clone(), "p1", &text, &ChunkerConfig::default())
            .await
            .unwrap();
        assert!(summary.chunks_inserted >= 1);
        assert_eq!(
            store.count_for_paper("p1").await.unwrap(),
            summary.chunks_inserted
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_chunking_failure() {
        let store = Arc::new(MemoryStore::new());
        let err = ingest_paper(store, "p1", "  ", &ChunkerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenPaperError::ChunkingFailed { .. }));
    }
}
