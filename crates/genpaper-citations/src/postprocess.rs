//! Citation post-processing: marker replacement, artifact cleanup,
//! whitespace normalization.
//!
//! `process` is pure and synchronous over an already-resolved citation map;
//! anything network- or database-backed lives in the async service layer on
//! top (service.rs), which keeps the replacement algorithm deterministically
//! testable.
//!
//! Replacement builds the display text and both offset sets in a single
//! forward pass, so a formatted citation that happens to be a substring of
//! surrounding text can never corrupt positions. Cleanup passes afterwards
//! only ever delete characters and remap the recorded spans through the
//! deletions.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::formatter::CitationFormatter;
use crate::marker::extract_markers;
use crate::models::{Citation, FormattedCitation, Span};
use crate::numeric::{assign_numbers, NumberMap};
use crate::style::StyleId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub content: String,
    /// One entry per unique resolved reference, at its first occurrence.
    pub citations: Vec<FormattedCitation>,
    /// Reference values that could not be resolved; their markers were
    /// removed from the display text.
    pub unresolved_references: Vec<String>,
}

/// Replace every citation marker in `text` with its rendered form.
///
/// `resolved` maps reference values (paper id, DOI, title or URL, exactly as
/// they appear in markers) to citations. Unresolvable references are removed
/// from the text, recorded in `unresolved_references`, and never left
/// visible. For numeric styles with no supplied number map, numbers are
/// assigned in order of first mention.
pub fn process(
    text: &str,
    resolved: &HashMap<String, Citation>,
    style: &StyleId,
    formatter: &CitationFormatter,
    numbers: Option<&NumberMap>,
) -> ProcessedDocument {
    let markers = extract_markers(text);

    // Number assignment precedes rendering so first-mention order holds.
    let assigned: Option<NumberMap> = if style.is_numeric() && numbers.is_none() {
        let ids: Vec<String> = markers
            .iter()
            .filter_map(|m| resolved.get(&m.value).map(|c| c.id.clone()))
            .collect();
        Some(assign_numbers(&ids))
    } else {
        None
    };
    let numbers = numbers.or(assigned.as_ref());

    // Render each unique reference once.
    let mut rendered: HashMap<&str, Option<String>> = HashMap::new();
    for m in &markers {
        rendered.entry(m.value.as_str()).or_insert_with(|| {
            resolved
                .get(&m.value)
                .map(|c| formatter.in_text(c, style, numbers))
        });
    }

    // Single forward pass: build the display text, emitting raw and display
    // spans as we go.
    let mut content = String::with_capacity(text.len());
    let mut citations: Vec<FormattedCitation> = Vec::new();
    let mut emitted: HashMap<&str, ()> = HashMap::new();
    let mut unresolved: Vec<String> = Vec::new();
    let mut last = 0;

    for m in &markers {
        content.push_str(&text[last..m.span.start]);
        match rendered.get(m.value.as_str()).and_then(|r| r.as_ref()) {
            Some(in_text) => {
                let display_start = content.len();
                content.push_str(in_text);
                if emitted.insert(m.value.as_str(), ()).is_none() {
                    // first occurrence carries the span pair
                    citations.push(FormattedCitation {
                        marker_text: m.text.clone(),
                        in_text: in_text.clone(),
                        citation: resolved[&m.value].clone(),
                        raw_span: m.span,
                        display_span: Span::new(display_start, content.len()),
                    });
                }
            }
            None => {
                if !unresolved.iter().any(|v| v == &m.value) {
                    unresolved.push(m.value.clone());
                }
            }
        }
        last = m.span.end;
    }
    content.push_str(&text[last..]);

    // Cleanup only deletes; spans are remapped through the deletions.
    let mut spans: Vec<Span> = citations.iter().map(|c| c.display_span).collect();
    let content = cleanup_mapped(&content, &mut spans);
    for (c, span) in citations.iter_mut().zip(spans) {
        c.display_span = span;
    }

    ProcessedDocument {
        content,
        citations,
        unresolved_references: unresolved,
    }
}

/// Strip known model artifacts and normalize whitespace. Idempotent.
pub fn cleanup_artifacts(text: &str) -> String {
    cleanup_mapped(text, &mut Vec::new())
}

fn artifact_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            // stray context markers leaked from prompt assembly
            Regex::new(r"\[CONTEXT FROM:[^\]]*\]").unwrap(),
            // leaked tool-call shaped text
            Regex::new(r"(?s)<tool_call>.*?</tool_call>").unwrap(),
            Regex::new(r"(?s)<function_call>.*?</function_call>").unwrap(),
            // numbered placeholder leftovers
            Regex::new(r"CITATION_\d+").unwrap(),
            // bracketed boilerplate
            Regex::new(r"(?i)\[citation needed\]").unwrap(),
            Regex::new(r"(?i)\[cite\]").unwrap(),
            Regex::new(r"(?i)\[ref\]").unwrap(),
        ]
    })
}

fn space_before_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+[.,;:!?]").unwrap())
}

fn multi_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap())
}

fn trailing_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+\n").unwrap())
}

fn excess_newlines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn cleanup_mapped(text: &str, spans: &mut Vec<Span>) -> String {
    // pass 1: artifact removal
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for re in artifact_res() {
        for m in re.find_iter(text) {
            ranges.push((m.start(), m.end()));
        }
    }
    let text = delete_ranges(text, ranges, spans);

    // pass 2: whitespace normalization, expressed purely as deletions
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for m in space_before_punct_re().find_iter(&text) {
        // the punctuation byte stays
        ranges.push((m.start(), m.end() - 1));
    }
    for m in multi_space_re().find_iter(&text) {
        ranges.push((m.start() + 1, m.end()));
    }
    for m in trailing_space_re().find_iter(&text) {
        ranges.push((m.start(), m.end() - 1));
    }
    for m in excess_newlines_re().find_iter(&text) {
        ranges.push((m.start(), m.end() - 2));
    }
    let leading = text.len() - text.trim_start().len();
    if leading > 0 {
        ranges.push((0, leading));
    }
    let trailing = text.trim_end().len();
    if trailing < text.len() {
        ranges.push((trailing, text.len()));
    }
    delete_ranges(&text, ranges, spans)
}

/// Delete `ranges` (merged where overlapping) from `text`, shifting `spans`
/// to keep pointing at the same characters.
fn delete_ranges(text: &str, mut ranges: Vec<(usize, usize)>, spans: &mut [Span]) -> String {
    if ranges.is_empty() {
        return text.to_string();
    }
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (s, e) in ranges {
        match merged.last_mut() {
            Some((_, pe)) if s <= *pe => *pe = (*pe).max(e),
            _ => merged.push((s, e)),
        }
    }

    let removed_before = |pos: usize| -> usize {
        let mut total = 0;
        for &(s, e) in &merged {
            if e <= pos {
                total += e - s;
            } else if s < pos {
                total += pos - s;
            } else {
                break;
            }
        }
        total
    };
    for span in spans.iter_mut() {
        let start = span.start - removed_before(span.start);
        let end = span.end - removed_before(span.end);
        *span = Span::new(start, end.max(start));
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (s, e) in merged {
        out.push_str(&text[last..s]);
        last = e;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, CitationType};

    fn citation(id: &str, family: &str, year: i32) -> Citation {
        Citation {
            id: id.to_string(),
            title: format!("Paper by {family}"),
            authors: vec![Author::Parsed { family: family.into(), given: "J.".into() }],
            year: Some(year),
            container_title: None,
            publisher: None,
            doi: None,
            url: None,
            volume: None,
            issue: None,
            pages: None,
            citation_type: CitationType::JournalArticle,
            abstract_text: None,
        }
    }

    fn resolved(entries: &[(&str, Citation)]) -> HashMap<String, Citation> {
        entries
            .iter()
            .map(|(k, c)| (k.to_string(), c.clone()))
            .collect()
    }

    fn apa() -> StyleId {
        StyleId::new("apa").unwrap()
    }

    #[test]
    fn test_modern_marker_replaced_apa() {
        let f = CitationFormatter::default();
        let map = resolved(&[("a1b2c3", citation("a1b2c3", "Smith", 2023))]);
        let doc = process(
            "Deep learning improved accuracy [@a1b2c3].",
            &map,
            &apa(),
            &f,
            None,
        );
        assert_eq!(doc.content, "Deep learning improved accuracy (Smith, 2023).");
        assert_eq!(doc.citations.len(), 1);
        assert!(doc.unresolved_references.is_empty());
    }

    #[test]
    fn test_unresolved_marker_removed_and_reported() {
        let f = CitationFormatter::default();
        let doc = process(
            "See [CITE: deadbeef] for details.",
            &HashMap::new(),
            &apa(),
            &f,
            None,
        );
        assert_eq!(doc.content, "See for details.");
        assert_eq!(doc.unresolved_references, vec!["deadbeef".to_string()]);
        assert!(doc.citations.is_empty());
    }

    #[test]
    fn test_mixed_grammars_all_replaced() {
        let f = CitationFormatter::default();
        let map = resolved(&[
            ("aa11", citation("aa11", "Smith", 2023)),
            ("bb22", citation("bb22", "Kim", 2020)),
        ]);
        let text = "First [@aa11] then [CITE: bb22] then [@aa11] again.";
        let doc = process(text, &map, &apa(), &f, None);
        assert!(!doc.content.contains("[@"));
        assert!(!doc.content.contains("[CITE"));
        assert_eq!(doc.content.matches("(Smith, 2023)").count(), 2);
        assert_eq!(doc.content.matches("(Kim, 2020)").count(), 1);
        // citations list is per unique reference
        assert_eq!(doc.citations.len(), 2);
    }

    #[test]
    fn test_spans_point_at_claimed_substrings() {
        let f = CitationFormatter::default();
        let map = resolved(&[("aa11", citation("aa11", "Smith", 2023))]);
        let text = "Some   text [@aa11] with [[CITE:title:Unknown Thing]] leftovers  .";
        let doc = process(text, &map, &apa(), &f, None);
        for fc in &doc.citations {
            assert_eq!(&text[fc.raw_span.start..fc.raw_span.end], fc.marker_text);
            assert_eq!(
                &doc.content[fc.display_span.start..fc.display_span.end],
                fc.in_text
            );
        }
    }

    #[test]
    fn test_numeric_style_assigns_numbers_by_first_mention() {
        let f = CitationFormatter::default();
        let map = resolved(&[
            ("aa11", citation("aa11", "Smith", 2023)),
            ("bb22", citation("bb22", "Kim", 2020)),
        ]);
        let doc = process(
            "First [@bb22], then [@aa11], then [@bb22].",
            &map,
            &StyleId::new("ieee").unwrap(),
            &f,
            None,
        );
        assert_eq!(doc.content, "First [1], then [2], then [1].");
    }

    #[test]
    fn test_artifact_cleanup() {
        let cleaned = cleanup_artifacts(
            "Real text [CONTEXT FROM: paper 12] more [citation needed] and CITATION_3 end [ref].",
        );
        assert_eq!(cleaned, "Real text more and end.");
    }

    #[test]
    fn test_cleanup_idempotent() {
        let input = "a [cite] b\n\n\n\nc  d , e<tool_call>x</tool_call>f";
        let once = cleanup_artifacts(input);
        let twice = cleanup_artifacts(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_cleanup_collapses_blank_lines_and_spaces() {
        let cleaned = cleanup_artifacts("one\n\n\n\ntwo   three .");
        assert_eq!(cleaned, "one\n\ntwo three.");
    }

    #[test]
    fn test_cleanup_preserves_single_blank_line() {
        let cleaned = cleanup_artifacts("para one\n\npara two");
        assert_eq!(cleaned, "para one\n\npara two");
    }

    #[test]
    fn test_legacy_cite_marker_not_treated_as_boilerplate() {
        // [cite] boilerplate removal must not eat well-formed legacy markers
        let f = CitationFormatter::default();
        let map = resolved(&[("aa11", citation("aa11", "Smith", 2023))]);
        let doc = process("Keep [CITE: aa11] here.", &map, &apa(), &f, None);
        assert_eq!(doc.content, "Keep (Smith, 2023) here.");
    }
}
