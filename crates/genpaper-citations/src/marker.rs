//! Citation marker protocol.
//!
//! Generated prose carries textual placeholders for citations. Two grammars
//! are recognized on read; only the modern form is emitted in prompts:
//!
//!   modern    `[@a1b2c3]`                       id matches `[a-f0-9-]+`
//!   legacy    `[CITE: a1b2c3]`                  kept for old content
//!   extended  `[[CITE:type:value]]`             pre-resolution placeholder
//!             `[[CITE:type:value|context]]`     with disambiguation context
//!
//! with extended `type` one of doi | paperId | title | url. The extended form
//! uses a distinct delimiter syntax so embedded metadata never breaks the
//! primary parser. Each grammar is a variant with its own regex; new grammars
//! extend the set rather than branching the extraction logic.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerGrammar {
    Modern,
    Legacy,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Doi,
    PaperId,
    Title,
    Url,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Doi     => "doi",
            ReferenceType::PaperId => "paperId",
            ReferenceType::Title   => "title",
            ReferenceType::Url     => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doi"     => Some(ReferenceType::Doi),
            "paperId" => Some(ReferenceType::PaperId),
            "title"   => Some(ReferenceType::Title),
            "url"     => Some(ReferenceType::Url),
            _ => None,
        }
    }
}

/// A marker found in text. Transient: produced by scanning, consumed by
/// resolution; only the resolution outcome is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMarker {
    pub grammar: MarkerGrammar,
    pub ref_type: ReferenceType,
    pub value: String,
    pub context: Option<String>,
    pub span: Span,
    pub text: String,
}

fn modern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[@([a-f0-9-]+)\]").unwrap())
}

fn legacy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[CITE:\s*([a-f0-9-]+)\]").unwrap())
}

fn extended_ctx_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[CITE:(doi|paperId|title|url):([^|\[\]]+)\|([^\[\]]+?)\]\]").unwrap()
    })
}

fn extended_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[CITE:(doi|paperId|title|url):([^|\[\]]+?)\]\]").unwrap())
}

/// Cheap existence check, used to skip post-processing entirely on
/// marker-free text.
pub fn has_markers(text: &str) -> bool {
    modern_re().is_match(text)
        || legacy_re().is_match(text)
        || extended_bare_re().is_match(text)
        || extended_ctx_re().is_match(text)
}

/// Scan `text` for every well-formed marker of every grammar.
///
/// Returns markers sorted ascending by start offset. Where a context-bearing
/// extended match overlaps a bare extended match, the context-bearing one
/// wins.
pub fn extract_markers(text: &str) -> Vec<CitationMarker> {
    let mut markers: Vec<CitationMarker> = Vec::new();

    for cap in modern_re().captures_iter(text) {
        let whole = cap.get(0).unwrap();
        markers.push(CitationMarker {
            grammar: MarkerGrammar::Modern,
            ref_type: ReferenceType::PaperId,
            value: cap[1].to_string(),
            context: None,
            span: Span::new(whole.start(), whole.end()),
            text: whole.as_str().to_string(),
        });
    }

    for cap in legacy_re().captures_iter(text) {
        let whole = cap.get(0).unwrap();
        markers.push(CitationMarker {
            grammar: MarkerGrammar::Legacy,
            ref_type: ReferenceType::PaperId,
            value: cap[1].to_string(),
            context: None,
            span: Span::new(whole.start(), whole.end()),
            text: whole.as_str().to_string(),
        });
    }

    for cap in extended_ctx_re().captures_iter(text) {
        let whole = cap.get(0).unwrap();
        // ref type is constrained by the regex alternation
        let ref_type = ReferenceType::parse(&cap[1]).unwrap_or(ReferenceType::PaperId);
        markers.push(CitationMarker {
            grammar: MarkerGrammar::Extended,
            ref_type,
            value: cap[2].trim().to_string(),
            context: Some(cap[3].trim().to_string()),
            span: Span::new(whole.start(), whole.end()),
            text: whole.as_str().to_string(),
        });
    }

    for cap in extended_bare_re().captures_iter(text) {
        let whole = cap.get(0).unwrap();
        let ref_type = ReferenceType::parse(&cap[1]).unwrap_or(ReferenceType::PaperId);
        markers.push(CitationMarker {
            grammar: MarkerGrammar::Extended,
            ref_type,
            value: cap[2].trim().to_string(),
            context: None,
            span: Span::new(whole.start(), whole.end()),
            text: whole.as_str().to_string(),
        });
    }

    markers.sort_by_key(|m| (m.span.start, m.span.end));

    // Dedup overlapping matches, preferring the context-bearing one.
    let mut deduped: Vec<CitationMarker> = Vec::with_capacity(markers.len());
    for m in markers {
        match deduped.last() {
            Some(prev) if prev.span.overlaps(&m.span) => {
                if m.context.is_some() && prev.context.is_none() {
                    deduped.pop();
                    deduped.push(m);
                }
                // otherwise keep the earlier match
            }
            _ => deduped.push(m),
        }
    }
    deduped
}

/// Construct the canonical (extended) marker string for a reference.
/// The inverse of extraction: the built marker round-trips through
/// `extract_markers` as a single marker with the same value.
pub fn build_marker(ref_type: ReferenceType, value: &str, context: Option<&str>) -> String {
    let value = sanitize_component(value);
    match context {
        Some(ctx) if !ctx.trim().is_empty() => {
            let ctx = truncate_chars(&sanitize_component(ctx), 80);
            format!("[[CITE:{}:{}|{}]]", ref_type.as_str(), value, ctx)
        }
        _ => format!("[[CITE:{}:{}]]", ref_type.as_str(), value),
    }
}

/// Strip the characters that delimit marker components.
fn sanitize_component(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '[' | ']' | '|' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Structured validation outcome. Malformed placeholders (recognizable
/// opening delimiter, unparsable body) are countable separately from
/// well-formed-but-unresolvable references, which the post-processor
/// reports on its own channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerValidation {
    pub is_valid: bool,
    pub malformed_count: usize,
    pub errors: Vec<String>,
}

/// Check every occurrence of a marker opening delimiter against the grammar
/// that delimiter announces. Never panics on malformed input.
pub fn validate_markers(text: &str) -> MarkerValidation {
    let mut errors = Vec::new();
    let well_formed = extract_markers(text);
    let covered = |pos: usize| well_formed.iter().any(|m| m.span.start == pos);

    for (pos, _) in text.match_indices("[[CITE:") {
        if !covered(pos) {
            errors.push(format!("malformed extended placeholder at offset {pos}"));
        }
    }
    for (pos, _) in text.match_indices("[CITE:") {
        // every "[[CITE:" occurrence contains "[CITE:" one byte in
        if pos > 0 && text.as_bytes()[pos - 1] == b'[' {
            continue;
        }
        if !covered(pos) {
            errors.push(format!("malformed legacy placeholder at offset {pos}"));
        }
    }
    for (pos, _) in text.match_indices("[@") {
        if !covered(pos) {
            errors.push(format!("malformed citation marker at offset {pos}"));
        }
    }

    MarkerValidation {
        is_valid: errors.is_empty(),
        malformed_count: errors.len(),
        errors,
    }
}
