//! genpaper-citations — citation marker protocol, matching, style
//! formatting and post-processing.
//!
//! The pipeline: generated text carries citation markers (marker.rs), each
//! marker's reference is resolved to a bibliographic record (matcher.rs or a
//! direct store lookup in service.rs), rendered in the active style
//! (builtin.rs / numeric.rs / csl.rs), and spliced back into display text
//! with artifact cleanup (postprocess.rs). See ARCHITECTURE.md §4.

pub mod builtin;
pub mod cache;
pub mod csl;
pub mod formatter;
pub mod marker;
pub mod matcher;
pub mod models;
pub mod numeric;
pub mod postprocess;
pub mod service;
pub mod style;

pub use formatter::CitationFormatter;
pub use marker::{extract_markers, has_markers, CitationMarker, MarkerGrammar, ReferenceType};
pub use matcher::{CitationMatch, CitationMatcher, MatchType};
pub use models::{Author, Citation, CitationType, FormattedCitation, Span};
pub use postprocess::{process, ProcessedDocument};
pub use service::CitationService;
pub use style::{BuiltinStyle, NumericStyle, ResolvedStyle, StyleError, StyleId};
