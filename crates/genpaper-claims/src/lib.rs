//! genpaper-claims — claim extraction and research gap analysis.
//!
//! Extraction judgment is delegated to the language model through a
//! structured-output contract; this crate owns the prompt construction and
//! the post-processing (deduplication, capping, confidence defaulting) plus
//! the batched relationship analysis between literature claims and the
//! user's own research claims. See ARCHITECTURE.md §8.

pub mod extraction;
pub mod gaps;
pub mod models;
pub mod relationships;

pub use extraction::{extract_claims, post_process_claims};
pub use gaps::synthesize_gaps;
pub use models::{
    ClaimRelationship, ClaimSource, ClaimType, ExtractedClaim, GapType, RelationKind, ResearchGap,
};
pub use relationships::analyze_relationships;
