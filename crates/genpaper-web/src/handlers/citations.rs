//! Citation API: formatting, matching, marker validation.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use genpaper_citations::marker::{validate_markers, MarkerValidation};
use genpaper_citations::matcher::{CitationMatch, CitationMatcher};
use genpaper_citations::numeric::assign_numbers;
use genpaper_citations::{Citation, StyleId};

use crate::error::ApiError;
use crate::state::SharedState;

// ── Formatting ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    pub paper_ids: Vec<String>,
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct FormatResponse {
    /// Style id actually used (the fallback when the requested style could
    /// not be loaded).
    pub style: String,
    pub in_text: Vec<InTextEntry>,
    pub bibliography: Vec<String>,
    pub missing_paper_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InTextEntry {
    pub paper_id: String,
    pub rendered: String,
}

pub async fn format_citations(
    State(state): State<SharedState>,
    Json(payload): Json<FormatRequest>,
) -> Result<Json<FormatResponse>, ApiError> {
    let style = StyleId::new(&payload.style)?;
    let usable = state.citations.formatter().ensure_style(&style).await;

    let records = state.papers.get_many(&payload.paper_ids).await?;
    let missing: Vec<String> = payload
        .paper_ids
        .iter()
        .filter(|id| !records.iter().any(|r| &r.id == *id))
        .cloned()
        .collect();

    let citations: Vec<Citation> = records.iter().map(Citation::from_record).collect();
    let numbers = style.is_numeric().then(|| {
        assign_numbers(&citations.iter().map(|c| c.id.clone()).collect::<Vec<_>>())
    });

    let formatter = state.citations.formatter();
    let in_text = citations
        .iter()
        .map(|c| InTextEntry {
            paper_id: c.id.clone(),
            rendered: formatter.in_text(c, &style, numbers.as_ref()),
        })
        .collect();
    let bibliography = formatter.bibliography(&citations, &style, numbers.as_ref());

    Ok(Json(FormatResponse {
        style: usable,
        in_text,
        bibliography,
        missing_paper_ids: missing,
    }))
}

// ── Matching ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub project_id: String,
    pub text: String,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.3
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub best: Option<CitationMatch>,
    pub all: Vec<CitationMatch>,
}

pub async fn match_citations(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    let project = state
        .projects
        .get(&payload.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("project {} not found", payload.project_id)))?;

    let records = state.papers.get_many(&project.paper_ids).await?;
    let matcher = CitationMatcher::new(records.iter().map(Citation::from_record).collect());

    Ok(Json(MatchResponse {
        best: matcher.find_best_match(&payload.text),
        all: matcher.find_all_matches(&payload.text, payload.min_confidence),
    }))
}

// ── Marker validation ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub text: String,
}

pub async fn validate_text(
    Json(payload): Json<ValidateRequest>,
) -> Json<MarkerValidation> {
    Json(validate_markers(&payload.text))
}
