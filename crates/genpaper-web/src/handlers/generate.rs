//! Streaming generation endpoint.
//!
//! Validates the request before any model call, gathers retrieval context,
//! streams model tokens, and resolves citations in-band: each flushed
//! segment is post-processed before it reaches the client, and the final
//! event carries the fully processed document with its citation list.
//!
//! The model call runs in a spawned task feeding an mpsc channel. When the
//! client disconnects the SSE stream is dropped, sends start failing, and
//! the task returns, dropping the model stream and cancelling the upstream
//! request. A deadline wraps every token read; expiry surfaces as a timeout
//! event, not a generic failure.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use genpaper_citations::models::FormattedCitation;
use genpaper_citations::numeric::assign_numbers;
use genpaper_citations::service::StreamBuffer;
use genpaper_citations::{Citation, StyleId};
use genpaper_rag::build_generation_prompt;

use crate::error::ApiError;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub project_id: String,
    /// What to draft, e.g. "Write the related-work section".
    pub instruction: String,
    pub style: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Display-ready text with citations already resolved. Numeric-style
    /// numbering in segments is provisional; the final document is
    /// authoritative.
    Segment { text: String },
    Done {
        content: String,
        citations: Vec<FormattedCitation>,
        unresolved_references: Vec<String>,
        bibliography: Vec<String>,
    },
    Error { message: String, timeout: bool },
}

pub async fn generate(
    State(state): State<SharedState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // Everything that can be rejected is rejected before the model call.
    if payload.instruction.trim().is_empty() {
        return Err(ApiError::bad_request("instruction must not be empty"));
    }
    let style = StyleId::new(
        payload
            .style
            .as_deref()
            .unwrap_or(&state.config.default_style),
    )?;

    let project = state
        .projects
        .get(&payload.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("project {} not found", payload.project_id)))?;

    let papers = state.papers.get_many(&project.paper_ids).await?;
    let chunks = state.chunks.get_for_papers(&project.paper_ids).await?;

    // context selection fails with the actionable no-content error
    let bundle = state.context_builder.build(&payload.instruction, &chunks)?;

    state
        .citations
        .update_citations(papers.iter().map(Citation::from_record).collect());
    state.citations.formatter().ensure_style(&style).await;

    let mut request = build_generation_prompt(&project.topic, &payload.instruction, &bundle, &papers);
    request.max_tokens = payload.max_tokens;

    state.notify(AppEvent::GenerationStarted {
        project_id: project.id.clone(),
    });
    info!(project_id = %project.id, sources = bundle.entries.len(), "generation started");

    let (tx, rx) = mpsc::channel::<GenerationEvent>(32);
    let timeout = Duration::from_secs(state.config.generation_timeout_secs);
    tokio::spawn(run_generation(
        state.clone(),
        style,
        request,
        project.id.clone(),
        timeout,
        tx,
    ));

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

async fn run_generation(
    state: Arc<crate::state::AppState>,
    style: StyleId,
    request: genpaper_llm::LlmRequest,
    project_id: String,
    timeout: Duration,
    tx: mpsc::Sender<GenerationEvent>,
) {
    let deadline = tokio::time::Instant::now() + timeout;

    let mut stream = match state.llm.complete_stream(request).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "model call failed before streaming");
            let _ = tx
                .send(GenerationEvent::Error { message: e.to_string(), timeout: false })
                .await;
            return;
        }
    };

    let mut buffer = StreamBuffer::new();
    let mut raw = String::new();

    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => {
                warn!(project_id = %project_id, "generation deadline exceeded");
                let _ = tx
                    .send(GenerationEvent::Error {
                        message: format!("generation timed out after {}s", timeout.as_secs()),
                        timeout: true,
                    })
                    .await;
                return;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                let _ = tx
                    .send(GenerationEvent::Error { message: e.to_string(), timeout: false })
                    .await;
                return;
            }
            Ok(Some(Ok(token))) => {
                raw.push_str(&token);
                buffer.push(&token);
                if let Some(ready) = buffer.take_ready() {
                    match state.citations.process_document(&ready, &style, None).await {
                        Ok(doc) => {
                            if tx.send(GenerationEvent::Segment { text: doc.content }).await.is_err() {
                                // client went away; abandon in-flight work
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "segment processing failed, streaming raw text");
                            if tx.send(GenerationEvent::Segment { text: ready }).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
    drop(buffer); // remainder is re-processed as part of the full document

    match state.citations.process_document(&raw, &style, None).await {
        Ok(doc) => {
            let cited: Vec<Citation> = doc.citations.iter().map(|f| f.citation.clone()).collect();
            let numbers = style.is_numeric().then(|| {
                assign_numbers(&cited.iter().map(|c| c.id.clone()).collect::<Vec<_>>())
            });
            let bibliography =
                state
                    .citations
                    .formatter()
                    .bibliography(&cited, &style, numbers.as_ref());

            state.notify(AppEvent::GenerationFinished {
                project_id: project_id.clone(),
                citations: doc.citations.len(),
                unresolved: doc.unresolved_references.len(),
            });
            info!(
                project_id = %project_id,
                citations = doc.citations.len(),
                unresolved = doc.unresolved_references.len(),
                "generation finished"
            );
            let _ = tx
                .send(GenerationEvent::Done {
                    content: doc.content,
                    citations: doc.citations,
                    unresolved_references: doc.unresolved_references,
                    bibliography,
                })
                .await;
        }
        Err(e) => {
            let _ = tx
                .send(GenerationEvent::Error { message: e.to_string(), timeout: false })
                .await;
        }
    }
}
