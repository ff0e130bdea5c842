use thiserror::Error;

/// Content-error taxonomy shared across the pipeline.
///
/// Citation non-resolution is deliberately NOT here: an unresolvable marker
/// is a recorded outcome, not an error. These variants exist so orchestration
/// layers can branch on cause and return actionable messages.
#[derive(Debug, Error)]
pub enum GenPaperError {
    #[error("No relevant content found: {0}. Add papers to the project or process existing ones.")]
    NoRelevantContent(String),

    #[error("Content quality too low: {0}")]
    QualityTooLow(String),

    #[error("Ingestion failed for paper {paper_id}: {message}")]
    IngestionFailed { paper_id: String, message: String },

    #[error("Chunking failed for paper {paper_id}: {message}")]
    ChunkingFailed { paper_id: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    #[error("Generation aborted by client")]
    GenerationAborted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GenPaperError>;
