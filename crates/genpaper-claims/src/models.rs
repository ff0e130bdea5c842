//! Claim and gap data models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Finding,
    Method,
    Limitation,
    Hypothesis,
    Contribution,
    Implication,
}

impl ClaimType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "finding"      => Some(ClaimType::Finding),
            "method"       => Some(ClaimType::Method),
            "limitation"   => Some(ClaimType::Limitation),
            "hypothesis"   => Some(ClaimType::Hypothesis),
            "contribution" => Some(ClaimType::Contribution),
            "implication"  => Some(ClaimType::Implication),
            _ => None,
        }
    }
}

/// Where a claim came from: a specific paper, or the user's own research
/// description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "paper_id", rename_all = "snake_case")]
pub enum ClaimSource {
    Paper(String),
    OriginalResearch,
}

/// An atomic assertion extracted from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedClaim {
    /// Stable content-derived id; duplicates collapse on it.
    pub id: String,
    pub text: String,
    pub claim_type: ClaimType,
    pub confidence: f64,
    pub source: ClaimSource,
    pub quote: Option<String>,
    pub key_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Supports,
    Extends,
    Contradicts,
    Unrelated,
    NotAnalyzed,
}

impl RelationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "supports"     => Some(RelationKind::Supports),
            "extends"      => Some(RelationKind::Extends),
            "contradicts"  => Some(RelationKind::Contradicts),
            "unrelated"    => Some(RelationKind::Unrelated),
            "not_analyzed" => Some(RelationKind::NotAnalyzed),
            _ => None,
        }
    }
}

/// A classified relationship between a literature claim and a user claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRelationship {
    pub literature_claim_id: String,
    pub user_claim_id: String,
    pub kind: RelationKind,
    pub justification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    UnstudiedTopic,
    Contradiction,
    AcknowledgedLimitation,
}

/// A synthesized research gap over a set of claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchGap {
    pub gap_type: GapType,
    pub description: String,
    pub confidence: f64,
    pub supporting_papers: Vec<String>,
}
