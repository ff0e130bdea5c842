//! Research gap synthesis over claims and their relationships.
//!
//! Three gap kinds: contradictions between a paper and the user's research,
//! limitations the literature acknowledges itself, and user claims no
//! literature claim relates to (unstudied topics).

use std::collections::HashMap;

use crate::models::{
    ClaimRelationship, ClaimSource, ClaimType, ExtractedClaim, GapType, RelationKind, ResearchGap,
};

const LIMITATION_MIN_CONFIDENCE: f64 = 0.5;

pub fn synthesize_gaps(
    literature_claims: &[ExtractedClaim],
    user_claims: &[ExtractedClaim],
    relationships: &[ClaimRelationship],
) -> Vec<ResearchGap> {
    let by_id: HashMap<&str, &ExtractedClaim> = literature_claims
        .iter()
        .chain(user_claims.iter())
        .map(|c| (c.id.as_str(), c))
        .collect();
    let paper_of = |claim: &ExtractedClaim| match &claim.source {
        ClaimSource::Paper(id) => Some(id.clone()),
        ClaimSource::OriginalResearch => None,
    };

    let mut gaps = Vec::new();

    // 1. Contradictions between papers and the user's claims.
    for rel in relationships {
        if rel.kind != RelationKind::Contradicts {
            continue;
        }
        let (Some(lit), Some(user)) = (
            by_id.get(rel.literature_claim_id.as_str()),
            by_id.get(rel.user_claim_id.as_str()),
        ) else {
            continue;
        };
        let description = if rel.justification.is_empty() {
            format!(
                "Published finding \"{}\" contradicts the stated claim \"{}\"",
                lit.text, user.text
            )
        } else {
            rel.justification.clone()
        };
        gaps.push(ResearchGap {
            gap_type: GapType::Contradiction,
            description,
            confidence: lit.confidence.min(user.confidence),
            supporting_papers: paper_of(lit).into_iter().collect(),
        });
    }

    // 2. Limitations the literature itself acknowledges.
    for claim in literature_claims {
        if claim.claim_type == ClaimType::Limitation
            && claim.confidence >= LIMITATION_MIN_CONFIDENCE
        {
            gaps.push(ResearchGap {
                gap_type: GapType::AcknowledgedLimitation,
                description: claim.text.clone(),
                confidence: claim.confidence,
                supporting_papers: paper_of(claim).into_iter().collect(),
            });
        }
    }

    // 3. User claims with analyzed relations, none of them substantive.
    for user in user_claims {
        let rels: Vec<&ClaimRelationship> = relationships
            .iter()
            .filter(|r| r.user_claim_id == user.id)
            .collect();
        if rels.is_empty() {
            continue;
        }
        let analyzed = rels.iter().filter(|r| r.kind != RelationKind::NotAnalyzed);
        let mut any_analyzed = false;
        let mut any_related = false;
        for r in analyzed {
            any_analyzed = true;
            if r.kind != RelationKind::Unrelated {
                any_related = true;
            }
        }
        if any_analyzed && !any_related {
            gaps.push(ResearchGap {
                gap_type: GapType::UnstudiedTopic,
                description: format!(
                    "No literature in the library addresses: {}",
                    user.text
                ),
                confidence: user.confidence,
                supporting_papers: Vec::new(),
            });
        }
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: &str, text: &str, ty: ClaimType, source: ClaimSource) -> ExtractedClaim {
        ExtractedClaim {
            id: id.to_string(),
            text: text.to_string(),
            claim_type: ty,
            confidence: 0.8,
            source,
            quote: None,
            key_terms: Vec::new(),
        }
    }

    fn rel(lit: &str, user: &str, kind: RelationKind) -> ClaimRelationship {
        ClaimRelationship {
            literature_claim_id: lit.to_string(),
            user_claim_id: user.to_string(),
            kind,
            justification: String::new(),
        }
    }

    #[test]
    fn test_contradiction_gap_carries_paper() {
        let lit = vec![claim("l1", "X increases Y", ClaimType::Finding, ClaimSource::Paper("p7".into()))];
        let user = vec![claim("u1", "X decreases Y", ClaimType::Finding, ClaimSource::OriginalResearch)];
        let rels = vec![rel("l1", "u1", RelationKind::Contradicts)];
        let gaps = synthesize_gaps(&lit, &user, &rels);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_type, GapType::Contradiction);
        assert_eq!(gaps[0].supporting_papers, vec!["p7".to_string()]);
    }

    #[test]
    fn test_limitation_gap() {
        let lit = vec![claim(
            "l1",
            "Evaluation covered only English corpora",
            ClaimType::Limitation,
            ClaimSource::Paper("p2".into()),
        )];
        let gaps = synthesize_gaps(&lit, &[], &[]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_type, GapType::AcknowledgedLimitation);
    }

    #[test]
    fn test_unstudied_topic_requires_analyzed_unrelated() {
        let lit = vec![claim("l1", "X", ClaimType::Finding, ClaimSource::Paper("p1".into()))];
        let user = vec![claim("u1", "novel direction", ClaimType::Hypothesis, ClaimSource::OriginalResearch)];

        // all unrelated → gap
        let gaps = synthesize_gaps(&lit, &user, &[rel("l1", "u1", RelationKind::Unrelated)]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_type, GapType::UnstudiedTopic);

        // supported → no gap
        let gaps = synthesize_gaps(&lit, &user, &[rel("l1", "u1", RelationKind::Supports)]);
        assert!(gaps.is_empty());

        // only not_analyzed → undecided, no gap
        let gaps = synthesize_gaps(&lit, &user, &[rel("l1", "u1", RelationKind::NotAnalyzed)]);
        assert!(gaps.is_empty());
    }
}
