//! In-memory store for tests and local development.
//!
//! Single-process substitute for the real database; all three store traits
//! are implemented over `RwLock`-guarded maps.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use genpaper_common::{GenPaperError, Result};

use crate::models::{ChunkRecord, PaperRecord, ProjectRecord};
use crate::stores::{ChunkStore, PaperStore, ProjectStore};

#[derive(Default)]
pub struct MemoryStore {
    papers: RwLock<HashMap<String, PaperRecord>>,
    chunks: RwLock<HashMap<String, Vec<ChunkRecord>>>,
    projects: RwLock<HashMap<String, ProjectRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err(what: &str) -> GenPaperError {
        GenPaperError::Storage(format!("poisoned lock: {what}"))
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<PaperRecord>> {
        let papers = self.papers.read().map_err(|_| Self::lock_err("papers"))?;
        Ok(papers.get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<PaperRecord>> {
        let papers = self.papers.read().map_err(|_| Self::lock_err("papers"))?;
        Ok(ids.iter().filter_map(|id| papers.get(id).cloned()).collect())
    }

    async fn find_by_doi(&self, doi: &str) -> Result<Option<PaperRecord>> {
        let papers = self.papers.read().map_err(|_| Self::lock_err("papers"))?;
        let needle = doi.to_lowercase();
        Ok(papers
            .values()
            .find(|p| p.doi.as_deref().is_some_and(|d| d.to_lowercase() == needle))
            .cloned())
    }

    async fn upsert(&self, record: &PaperRecord) -> Result<()> {
        let mut papers = self.papers.write().map_err(|_| Self::lock_err("papers"))?;
        papers.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn get_for_paper(&self, paper_id: &str) -> Result<Vec<ChunkRecord>> {
        let chunks = self.chunks.read().map_err(|_| Self::lock_err("chunks"))?;
        Ok(chunks.get(paper_id).cloned().unwrap_or_default())
    }

    async fn get_for_papers(&self, paper_ids: &[String]) -> Result<Vec<ChunkRecord>> {
        let chunks = self.chunks.read().map_err(|_| Self::lock_err("chunks"))?;
        let mut out = Vec::new();
        for id in paper_ids {
            if let Some(list) = chunks.get(id) {
                out.extend(list.iter().cloned());
            }
        }
        Ok(out)
    }

    async fn insert_batch(&self, batch: &[ChunkRecord]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut chunks = self.chunks.write().map_err(|_| Self::lock_err("chunks"))?;
        for chunk in batch {
            chunks
                .entry(chunk.paper_id.clone())
                .or_default()
                .push(chunk.clone());
        }
        Ok(batch.len())
    }

    async fn count_for_paper(&self, paper_id: &str) -> Result<usize> {
        let chunks = self.chunks.read().map_err(|_| Self::lock_err("chunks"))?;
        Ok(chunks.get(paper_id).map(|v| v.len()).unwrap_or(0))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let projects = self.projects.read().map_err(|_| Self::lock_err("projects"))?;
        Ok(projects.get(id).cloned())
    }

    async fn upsert(&self, record: &ProjectRecord) -> Result<()> {
        let mut projects = self.projects.write().map_err(|_| Self::lock_err("projects"))?;
        projects.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunk(paper_id: &str, index: usize) -> ChunkRecord {
        ChunkRecord {
            id: format!("{paper_id}-{index}"),
            paper_id: paper_id.to_string(),
            chunk_index: index,
            content: "some content".to_string(),
            overlap_len: 0,
            section_type: None,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_paper_roundtrip() {
        let store = MemoryStore::new();
        let mut rec = PaperRecord::stub("p1", "A Title");
        rec.doi = Some("10.1234/ABC".to_string());
        store.upsert(&rec).await.unwrap();

        assert!(store.get("p1").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
        // DOI lookup is case-insensitive
        let by_doi = store.find_by_doi("10.1234/abc").await.unwrap();
        assert_eq!(by_doi.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_chunk_batch_and_count() {
        let store = MemoryStore::new();
        let batch = vec![chunk("p1", 0), chunk("p1", 1), chunk("p2", 0)];
        assert_eq!(store.insert_batch(&batch).await.unwrap(), 3);
        assert_eq!(store.count_for_paper("p1").await.unwrap(), 2);

        let both = store
            .get_for_papers(&["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();
        assert_eq!(both.len(), 3);
    }
}
