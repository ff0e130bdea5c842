//! Shared application state for the web server.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use genpaper_citations::CitationService;
use genpaper_db::{ChunkStore, PaperStore, ProjectStore};
use genpaper_llm::LlmBackend;
use genpaper_rag::ContextBuilder;

use crate::config::ServerConfig;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A paper was added and chunked
    PaperIngested { paper_id: String, title: String, chunks: usize },
    /// A generation run started
    GenerationStarted { project_id: String },
    /// A generation run finished
    GenerationFinished { project_id: String, citations: usize, unresolved: usize },
    /// General system notification
    Notification { level: String, message: String },
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub papers: Arc<dyn PaperStore>,
    pub chunks: Arc<dyn ChunkStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub llm: Arc<dyn LlmBackend>,
    pub citations: Arc<CitationService>,
    pub context_builder: ContextBuilder,
    pub config: ServerConfig,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(
        papers: Arc<dyn PaperStore>,
        chunks: Arc<dyn ChunkStore>,
        projects: Arc<dyn ProjectStore>,
        llm: Arc<dyn LlmBackend>,
        citations: Arc<CitationService>,
        config: ServerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            papers,
            chunks,
            projects,
            llm,
            citations,
            context_builder: ContextBuilder::default(),
            config,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn notify(&self, event: AppEvent) {
        // send fails only when no client is subscribed, which is fine
        let _ = self.event_tx.send(event);
    }
}

pub type SharedState = Arc<AppState>;
