//! Relationship analysis between literature claims and user claims.
//!
//! Literature claims are batched in fixed-size groups against the full user
//! claim set to stay under model input limits. A failed batch never drops
//! claims silently: every pair in it is emitted as `not_analyzed`.

use serde::Deserialize;
use tracing::warn;

use genpaper_llm::{complete_structured, LlmBackend, LlmRequest, Message};

use crate::models::{ClaimRelationship, ExtractedClaim, RelationKind};

/// Literature claims per analysis batch.
pub const RELATIONSHIP_BATCH_SIZE: usize = 5;

const RELATIONSHIP_SYSTEM: &str = "\
You compare claims from published literature against a researcher's own
claims and classify each pair. Respond with ONLY a JSON array, no prose.";

#[derive(Debug, Deserialize)]
struct RawRelation {
    literature_claim_id: String,
    user_claim_id: String,
    relationship: String,
    #[serde(default)]
    justification: String,
}

fn build_batch_prompt(batch: &[ExtractedClaim], user_claims: &[ExtractedClaim]) -> LlmRequest {
    let mut user = String::from("Literature claims:\n");
    for c in batch {
        user.push_str(&format!("- id {}: {}\n", c.id, c.text));
    }
    user.push_str("\nResearcher claims:\n");
    for c in user_claims {
        user.push_str(&format!("- id {}: {}\n", c.id, c.text));
    }
    user.push_str(
        "\nFor every (literature, researcher) pair with a meaningful relationship, output:\n\
         [{\"literature_claim_id\": \"...\", \"user_claim_id\": \"...\",\n\
           \"relationship\": \"supports|extends|contradicts|unrelated\",\n\
           \"justification\": \"one sentence\"}]\n\
         Omit pairs that are clearly unrelated.",
    );
    LlmRequest::new(vec![Message::system(RELATIONSHIP_SYSTEM), Message::user(user)])
}

/// Classify every (literature, user) claim pair. Pairs the model does not
/// mention in a successful batch are `unrelated`; pairs in a failed batch
/// are `not_analyzed`.
pub async fn analyze_relationships(
    backend: &dyn LlmBackend,
    literature_claims: &[ExtractedClaim],
    user_claims: &[ExtractedClaim],
) -> Vec<ClaimRelationship> {
    let mut out = Vec::new();
    if literature_claims.is_empty() || user_claims.is_empty() {
        return out;
    }

    for batch in literature_claims.chunks(RELATIONSHIP_BATCH_SIZE) {
        let req = build_batch_prompt(batch, user_claims);
        match complete_structured::<Vec<RawRelation>>(backend, req).await {
            Ok(raw) => merge_batch(batch, user_claims, raw, &mut out),
            Err(e) => {
                warn!(error = %e, batch_size = batch.len(), "relationship batch failed");
                for lit in batch {
                    for user in user_claims {
                        out.push(ClaimRelationship {
                            literature_claim_id: lit.id.clone(),
                            user_claim_id: user.id.clone(),
                            kind: RelationKind::NotAnalyzed,
                            justification: "analysis batch failed".to_string(),
                        });
                    }
                }
            }
        }
    }
    out
}

fn merge_batch(
    batch: &[ExtractedClaim],
    user_claims: &[ExtractedClaim],
    raw: Vec<RawRelation>,
    out: &mut Vec<ClaimRelationship>,
) {
    let known_lit = |id: &str| batch.iter().any(|c| c.id == id);
    let known_user = |id: &str| user_claims.iter().any(|c| c.id == id);

    let mut reported: Vec<ClaimRelationship> = Vec::new();
    for r in raw {
        // discard hallucinated ids
        if !known_lit(&r.literature_claim_id) || !known_user(&r.user_claim_id) {
            continue;
        }
        let kind = RelationKind::parse(&r.relationship).unwrap_or(RelationKind::Unrelated);
        reported.push(ClaimRelationship {
            literature_claim_id: r.literature_claim_id,
            user_claim_id: r.user_claim_id,
            kind,
            justification: r.justification,
        });
    }

    for lit in batch {
        for user in user_claims {
            let found = reported
                .iter()
                .find(|r| r.literature_claim_id == lit.id && r.user_claim_id == user.id);
            match found {
                Some(r) => out.push(r.clone()),
                None => out.push(ClaimRelationship {
                    literature_claim_id: lit.id.clone(),
                    user_claim_id: user.id.clone(),
                    kind: RelationKind::Unrelated,
                    justification: String::new(),
                }),
            }
        }
    }
}
