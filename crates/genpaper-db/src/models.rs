//! Record models for the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored paper. Author names are kept as entered ("Family, Given" where
/// parseable, otherwise a literal display name); the citation layer derives
/// structured authors from these at formatting time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub abstract_text: Option<String>,
    /// Publication type: "journal-article", "book", "chapter",
    /// "conference-paper", "thesis", "webpage", "report".
    pub record_type: String,
    pub ingested_at: DateTime<Utc>,
}

impl PaperRecord {
    /// Minimal record for tests and fixtures.
    pub fn stub(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            authors: Vec::new(),
            year: None,
            venue: None,
            publisher: None,
            doi: None,
            url: None,
            volume: None,
            issue: None,
            pages: None,
            abstract_text: None,
            record_type: "journal-article".to_string(),
            ingested_at: Utc::now(),
        }
    }
}

/// A stored chunk of a paper's extracted text.
/// `overlap_len` is the character length of the prefix duplicated from the
/// previous chunk; metadata extraction must skip it for section detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub paper_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub overlap_len: usize,
    pub section_type: Option<String>,
    /// Extracted metadata flags and scores, stored as JSON so the schema can
    /// evolve without migrations.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A user project: a topic plus the set of papers in its library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub topic: String,
    pub description: Option<String>,
    pub paper_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}
