//! Claim extraction and research gap analysis endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use genpaper_claims::{
    analyze_relationships, extract_claims, synthesize_gaps, ClaimRelationship, ClaimSource,
    ExtractedClaim, ResearchGap,
};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub project_id: String,
    /// The user's description of their own research.
    pub research_description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub user_claims: Vec<ExtractedClaim>,
    pub literature_claims: Vec<ExtractedClaim>,
    pub relationships: Vec<ClaimRelationship>,
    pub gaps: Vec<ResearchGap>,
    /// Papers skipped because they carry no abstract or their extraction
    /// call failed.
    pub skipped_papers: Vec<String>,
}

pub async fn analyze(
    State(state): State<SharedState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if payload.research_description.trim().is_empty() {
        return Err(ApiError::bad_request("research_description must not be empty"));
    }
    let project = state
        .projects
        .get(&payload.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("project {} not found", payload.project_id)))?;

    let user_claims = extract_claims(
        state.llm.as_ref(),
        &project.topic,
        &payload.research_description,
        ClaimSource::OriginalResearch,
    )
    .await
    .map_err(|e| ApiError::bad_request(format!("claim extraction failed: {e}")))?;

    let papers = state.papers.get_many(&project.paper_ids).await?;
    let mut literature_claims = Vec::new();
    let mut skipped = Vec::new();
    for paper in &papers {
        let Some(abstract_text) = paper.abstract_text.as_deref() else {
            skipped.push(paper.id.clone());
            continue;
        };
        match extract_claims(
            state.llm.as_ref(),
            &project.topic,
            abstract_text,
            ClaimSource::Paper(paper.id.clone()),
        )
        .await
        {
            Ok(claims) => literature_claims.extend(claims),
            Err(e) => {
                // extraction failure for one paper never sinks the analysis
                warn!(paper_id = %paper.id, error = %e, "claim extraction failed");
                skipped.push(paper.id.clone());
            }
        }
    }

    let relationships =
        analyze_relationships(state.llm.as_ref(), &literature_claims, &user_claims).await;
    let gaps = synthesize_gaps(&literature_claims, &user_claims, &relationships);

    Ok(Json(AnalyzeResponse {
        user_claims,
        literature_claims,
        relationships,
        gaps,
        skipped_papers: skipped,
    }))
}
