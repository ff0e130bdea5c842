//! GenPaper web server entry point.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use genpaper_citations::csl::StyleEngine;
use genpaper_citations::{CitationFormatter, CitationService};
use genpaper_db::MemoryStore;
use genpaper_llm::{AnthropicBackend, LlmBackend, OpenAiCompatibleBackend};
use genpaper_web::config::LlmProvider;
use genpaper_web::{build_router, AppState, ServerConfig};

use secrecy::ExposeSecret;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;

    let llm: Arc<dyn LlmBackend> = match config.llm.provider {
        LlmProvider::OpenAiCompatible => Arc::new(OpenAiCompatibleBackend::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
        )),
        LlmProvider::Anthropic => Arc::new(AnthropicBackend::new(
            config
                .llm
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string())
                .unwrap_or_default(),
            config.llm.model.clone(),
        )),
    };

    let engine = match &config.style_repository_url {
        Some(url) => StyleEngine::new(url.clone()),
        None => StyleEngine::default(),
    };

    // Single-node store; a database-backed store implements the same traits.
    let store = Arc::new(MemoryStore::new());
    let citations = Arc::new(CitationService::new(
        CitationFormatter::new(engine),
        store.clone(),
    ));

    let state = AppState::new(
        store.clone(),
        store.clone(),
        store,
        llm,
        citations,
        config.clone(),
    );

    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = state.llm.model_id(), "genpaper-web listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
