//! Store traits — the seams between the pipeline and the database.

use async_trait::async_trait;
use genpaper_common::Result;

use crate::models::{ChunkRecord, PaperRecord, ProjectRecord};

#[async_trait]
pub trait PaperStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PaperRecord>>;
    async fn get_many(&self, ids: &[String]) -> Result<Vec<PaperRecord>>;
    /// DOI lookup is case-insensitive.
    async fn find_by_doi(&self, doi: &str) -> Result<Option<PaperRecord>>;
    async fn upsert(&self, record: &PaperRecord) -> Result<()>;
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn get_for_paper(&self, paper_id: &str) -> Result<Vec<ChunkRecord>>;
    async fn get_for_papers(&self, paper_ids: &[String]) -> Result<Vec<ChunkRecord>>;
    async fn insert_batch(&self, chunks: &[ChunkRecord]) -> Result<usize>;
    async fn count_for_paper(&self, paper_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>>;
    async fn upsert(&self, record: &ProjectRecord) -> Result<()>;
}
