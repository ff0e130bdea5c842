//! genpaper-db — persistence collaborator contracts.
//!
//! The relational database is an external collaborator addressed by opaque
//! string identifiers. This crate defines the record models and store traits
//! the pipeline depends on, plus an in-memory implementation used by tests
//! and local development. See ARCHITECTURE.md §3.

pub mod memory;
pub mod models;
pub mod stores;

pub use memory::MemoryStore;
pub use models::{ChunkRecord, PaperRecord, ProjectRecord};
pub use stores::{ChunkStore, PaperStore, ProjectStore};
