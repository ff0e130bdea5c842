//! Claim extraction: prompt contract and post-processing.
//!
//! The model does the judgment; this module guarantees the output shape.
//! Post-processing dedups by a stable content key, defaults and clamps
//! confidence, and caps the claim count per call.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use genpaper_common::text::normalize;
use genpaper_llm::{complete_structured, LlmBackend, LlmError, LlmRequest, Message};

use crate::models::{ClaimSource, ClaimType, ExtractedClaim};

/// Hard cap on claims accepted from a single extraction call.
pub const MAX_CLAIMS_PER_CALL: usize = 20;

const EXTRACTION_SYSTEM: &str = "\
You extract atomic factual claims from research text. A claim is a single
assertion that could be independently supported or contradicted. Respond
with ONLY a JSON array, no prose.";

/// Shape demanded from the model. Fields the model omits get defaults in
/// post-processing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClaim {
    pub text: String,
    #[serde(default)]
    pub claim_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
}

/// Prompt contract: topic plus source text in, JSON array of claims out.
pub fn build_extraction_prompt(topic: &str, text: &str) -> LlmRequest {
    let user = format!(
        "Research topic: {topic}\n\n\
         Text to analyze:\n{text}\n\n\
         Extract up to {MAX_CLAIMS_PER_CALL} atomic claims as a JSON array of objects:\n\
         [{{\"text\": \"...\", \"claim_type\": \"finding|method|limitation|hypothesis|contribution|implication\",\n\
           \"confidence\": 0.0-1.0, \"quote\": \"supporting quote from the text\", \"key_terms\": [\"...\"]}}]"
    );
    LlmRequest::new(vec![Message::system(EXTRACTION_SYSTEM), Message::user(user)])
}

/// Stable dedup key: short hash of the normalized claim text.
pub fn claim_key(text: &str) -> String {
    let digest = Sha256::digest(normalize(text).as_bytes());
    hex::encode(&digest[..6])
}

/// Enforce the post-processing contract over raw model output.
pub fn post_process_claims(raw: Vec<RawClaim>, source: &ClaimSource) -> Vec<ExtractedClaim> {
    let mut seen = std::collections::HashSet::new();
    let mut claims = Vec::new();
    for r in raw {
        let text = r.text.trim().to_string();
        if text.is_empty() {
            continue;
        }
        let id = claim_key(&text);
        if !seen.insert(id.clone()) {
            continue;
        }
        let claim_type = r
            .claim_type
            .as_deref()
            .and_then(ClaimType::parse)
            .unwrap_or(ClaimType::Finding);
        let confidence = r.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
        claims.push(ExtractedClaim {
            id,
            text,
            claim_type,
            confidence,
            source: source.clone(),
            quote: r.quote.filter(|q| !q.trim().is_empty()),
            key_terms: r.key_terms,
        });
        if claims.len() >= MAX_CLAIMS_PER_CALL {
            break;
        }
    }
    claims
}

/// Full extraction call: prompt, structured completion, post-processing.
pub async fn extract_claims(
    backend: &dyn LlmBackend,
    topic: &str,
    text: &str,
    source: ClaimSource,
) -> Result<Vec<ExtractedClaim>, LlmError> {
    let req = build_extraction_prompt(topic, text);
    let raw: Vec<RawClaim> = complete_structured(backend, req).await?;
    let claims = post_process_claims(raw, &source);
    debug!(count = claims.len(), ?source, "claims extracted");
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawClaim {
        RawClaim {
            text: text.to_string(),
            claim_type: None,
            confidence: None,
            quote: None,
            key_terms: Vec::new(),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let claims = post_process_claims(vec![raw("Accuracy improved.")], &ClaimSource::OriginalResearch);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Finding);
        assert!((claims[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_by_normalized_text() {
        let claims = post_process_claims(
            vec![raw("Accuracy improved."), raw("accuracy improved"), raw("Other claim.")],
            &ClaimSource::Paper("p1".to_string()),
        );
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_cap_and_empty_skipped() {
        let mut many: Vec<RawClaim> = (0..30).map(|i| raw(&format!("claim number {i}"))).collect();
        many.push(raw("   "));
        let claims = post_process_claims(many, &ClaimSource::OriginalResearch);
        assert_eq!(claims.len(), MAX_CLAIMS_PER_CALL);
    }

    #[test]
    fn test_confidence_clamped_and_type_parsed() {
        let mut r = raw("Model generalizes poorly to unseen domains.");
        r.claim_type = Some("Limitation".to_string());
        r.confidence = Some(1.7);
        let claims = post_process_claims(vec![r], &ClaimSource::Paper("p1".to_string()));
        assert_eq!(claims[0].claim_type, ClaimType::Limitation);
        assert!((claims[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_claim_key_stable() {
        assert_eq!(claim_key("Accuracy improved."), claim_key("accuracy  improved"));
        assert_ne!(claim_key("a"), claim_key("b"));
    }
}
