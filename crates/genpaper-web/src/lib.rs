//! genpaper-web — HTTP layer: generation streaming, citation and claim
//! endpoints. See ARCHITECTURE.md §9.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;

pub use config::ServerConfig;
pub use router::build_router;
pub use state::{AppEvent, AppState, SharedState};
