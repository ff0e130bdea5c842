//! genpaper-ingestion — document chunking and chunk metadata extraction.
//!
//! Papers arrive as extracted full text; the chunker splits them into
//! bounded, overlapping retrieval units and the metadata extractor tags each
//! unit with its structural section and content features. See
//! ARCHITECTURE.md §5.

pub mod chunker;
pub mod metadata;
pub mod models;
pub mod pipeline;

pub use chunker::{chunk_text, ChunkerConfig};
pub use metadata::extract_metadata;
pub use models::{Chunk, ChunkMetadata, SectionType};
