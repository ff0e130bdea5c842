//! Data models for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use genpaper_db::ChunkRecord;

/// Structural section of a paper, detected from headings or content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Abstract,
    Introduction,
    Background,
    LiteratureReview,
    Methods,
    Results,
    Discussion,
    Conclusion,
    References,
    Appendix,
    Unknown,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Abstract         => "abstract",
            SectionType::Introduction     => "introduction",
            SectionType::Background       => "background",
            SectionType::LiteratureReview => "literature_review",
            SectionType::Methods          => "methods",
            SectionType::Results          => "results",
            SectionType::Discussion       => "discussion",
            SectionType::Conclusion       => "conclusion",
            SectionType::References       => "references",
            SectionType::Appendix         => "appendix",
            SectionType::Unknown          => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "abstract"          => SectionType::Abstract,
            "introduction"      => SectionType::Introduction,
            "background"        => SectionType::Background,
            "literature_review" => SectionType::LiteratureReview,
            "methods"           => SectionType::Methods,
            "results"           => SectionType::Results,
            "discussion"        => SectionType::Discussion,
            "conclusion"        => SectionType::Conclusion,
            "references"        => SectionType::References,
            "appendix"          => SectionType::Appendix,
            _                   => SectionType::Unknown,
        }
    }
}

/// Metadata derived from one chunk's content.
///
/// The boolean detectors are independent presence checks over the full
/// content; section detection ignores the overlap prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub section_type: Option<SectionType>,
    pub has_citations: bool,
    pub has_figures: bool,
    pub has_numeric_data: bool,
    pub is_conclusion: bool,
    /// Readability-style score in [0, 1].
    pub complexity: f32,
    pub key_terms: Vec<String>,
}

/// A bounded span of a paper's extracted text plus derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub paper_id: String,
    pub chunk_index: usize,
    pub content: String,
    /// Character length of the prefix duplicated from the previous chunk.
    pub overlap_len: usize,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(paper_id: &str, chunk_index: usize, content: String, overlap_len: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            paper_id: paper_id.to_string(),
            chunk_index,
            content,
            overlap_len,
            metadata: ChunkMetadata {
                section_type: None,
                has_citations: false,
                has_figures: false,
                has_numeric_data: false,
                is_conclusion: false,
                complexity: 0.0,
                key_terms: Vec::new(),
            },
        }
    }

    pub fn to_record(&self) -> ChunkRecord {
        ChunkRecord {
            id: self.id.clone(),
            paper_id: self.paper_id.clone(),
            chunk_index: self.chunk_index,
            content: self.content.clone(),
            overlap_len: self.overlap_len,
            section_type: self.metadata.section_type.map(|s| s.as_str().to_string()),
            metadata: serde_json::to_value(&self.metadata).unwrap_or(serde_json::Value::Null),
            created_at: chrono::Utc::now(),
        }
    }
}
