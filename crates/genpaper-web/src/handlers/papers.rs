//! Paper and project management endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use genpaper_db::{PaperRecord, ProjectRecord};
use genpaper_ingestion::chunker::ChunkerConfig;
use genpaper_ingestion::pipeline::ingest_paper;

use crate::error::ApiError;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct AddPaperRequest {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub abstract_text: Option<String>,
    #[serde(default = "default_record_type")]
    pub record_type: String,
    /// Extracted full text; when present the paper is chunked immediately.
    pub full_text: Option<String>,
}

fn default_record_type() -> String {
    "journal-article".to_string()
}

#[derive(Debug, Serialize)]
pub struct AddPaperResponse {
    pub paper_id: String,
    pub chunks_inserted: usize,
}

/// Add a paper to a project's library, chunking its full text when given.
pub async fn add_paper(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(payload): Json<AddPaperRequest>,
) -> Result<Json<AddPaperResponse>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let mut project = state
        .projects
        .get(&project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("project {project_id} not found")))?;

    let record = PaperRecord {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        authors: payload.authors,
        year: payload.year,
        venue: payload.venue,
        publisher: payload.publisher,
        doi: payload.doi,
        url: payload.url,
        volume: payload.volume,
        issue: payload.issue,
        pages: payload.pages,
        abstract_text: payload.abstract_text,
        record_type: payload.record_type,
        ingested_at: Utc::now(),
    };
    state.papers.upsert(&record).await?;

    project.paper_ids.push(record.id.clone());
    state.projects.upsert(&project).await?;

    let mut chunks_inserted = 0;
    if let Some(full_text) = payload.full_text.as_deref() {
        let summary = ingest_paper(
            state.chunks.clone(),
            &record.id,
            full_text,
            &ChunkerConfig::default(),
        )
        .await?;
        chunks_inserted = summary.chunks_inserted;
    }

    state.notify(AppEvent::PaperIngested {
        paper_id: record.id.clone(),
        title: record.title.clone(),
        chunks: chunks_inserted,
    });

    Ok(Json(AddPaperResponse {
        paper_id: record.id,
        chunks_inserted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub topic: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project_id: String,
}

pub async fn create_project(
    State(state): State<SharedState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<CreateProjectResponse>, ApiError> {
    if payload.topic.trim().is_empty() {
        return Err(ApiError::bad_request("topic must not be empty"));
    }
    let record = ProjectRecord {
        id: Uuid::new_v4().to_string(),
        topic: payload.topic,
        description: payload.description,
        paper_ids: Vec::new(),
        created_at: Utc::now(),
    };
    state.projects.upsert(&record).await?;
    Ok(Json(CreateProjectResponse { project_id: record.id }))
}
