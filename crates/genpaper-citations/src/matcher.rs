//! Citation matcher — resolves free text to the most likely citation.
//!
//! Four strategies, tried in confidence order: DOI, author-year, title,
//! fuzzy. Each strategy is a pure function returning `Option<CitationMatch>`
//! so adding or reordering strategies is a one-line change to the chain.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use genpaper_common::text::{jaccard_words, normalize};

use crate::models::Citation;

const DOI_CONFIDENCE: f64 = 0.95;
const AUTHOR_YEAR_CONFIDENCE: f64 = 0.85;
const TITLE_THRESHOLD: f64 = 0.7;
const TITLE_DISCOUNT: f64 = 0.8;
const FUZZY_THRESHOLD: f64 = 0.5;
const FUZZY_DISCOUNT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Doi,
    AuthorYear,
    Title,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationMatch {
    pub citation: Citation,
    pub confidence: f64,
    pub match_type: MatchType,
    pub matched_span: String,
}

fn doi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+"#).unwrap())
}

/// "Author (2020)", optionally "Author et al. (2020)".
fn author_paren_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z][A-Za-z'’-]+)(?:\s+et\s+al\.?)?\s*\((\d{4})\)").unwrap()
    })
}

/// "(Author, 2020)" / "(Author et al., 2020)".
fn paren_author_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(([A-Z][A-Za-z'’-]+)(?:\s+et\s+al\.?)?,\s*(\d{4})\)").unwrap()
    })
}

/// Bare "Author, 2020" / "Author et al., 2020".
fn bare_author_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z][A-Za-z'’-]+)(?:\s+et\s+al\.?)?,\s*(\d{4})\b").unwrap()
    })
}

/// Matcher over a known citation set, with prebuilt lookup indexes.
/// `update_citations` rebuilds the indexes without reconstructing the
/// matcher.
pub struct CitationMatcher {
    citations: Vec<Citation>,
    by_doi: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
    by_author_year: HashMap<String, usize>,
}

impl CitationMatcher {
    pub fn new(citations: Vec<Citation>) -> Self {
        let mut matcher = Self {
            citations: Vec::new(),
            by_doi: HashMap::new(),
            by_title: HashMap::new(),
            by_author_year: HashMap::new(),
        };
        matcher.update_citations(citations);
        matcher
    }

    /// Replace the citation set and rebuild every index.
    pub fn update_citations(&mut self, citations: Vec<Citation>) {
        self.by_doi.clear();
        self.by_title.clear();
        self.by_author_year.clear();

        for (i, c) in citations.iter().enumerate() {
            if let Some(doi) = &c.doi {
                if !doi.is_empty() {
                    self.by_doi.insert(doi.to_lowercase(), i);
                }
            }
            let title_key = normalize(&c.title);
            if !title_key.is_empty() {
                self.by_title.insert(title_key, i);
            }
            if let (Some(family), Some(year)) = (c.first_author_family(), c.year) {
                self.by_author_year
                    .insert(format!("{}_{}", family.to_lowercase(), year), i);
            }
        }
        self.citations = citations;
    }

    pub fn citation_count(&self) -> usize {
        self.citations.len()
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// First strategy that yields any match wins; each strategy's output is
    /// ordered best-first.
    pub fn find_best_match(&self, text: &str) -> Option<CitationMatch> {
        let strategies: [fn(&Self, &str) -> Vec<CitationMatch>; 4] = [
            Self::match_doi,
            Self::match_author_year,
            Self::match_title,
            Self::match_fuzzy,
        ];
        strategies
            .iter()
            .find_map(|s| s(self, text).into_iter().next())
    }

    /// Union of every strategy's matches, deduplicated by citation identity
    /// (DOI-or-title key) keeping the highest confidence, sorted by
    /// confidence descending.
    pub fn find_all_matches(&self, text: &str, min_confidence: f64) -> Vec<CitationMatch> {
        let mut best: HashMap<String, CitationMatch> = HashMap::new();
        let all = [
            self.match_doi(text),
            self.match_author_year(text),
            self.match_title(text),
            self.match_fuzzy(text),
        ];
        for m in all.into_iter().flatten() {
            if m.confidence < min_confidence {
                continue;
            }
            let key = m.citation.dedup_key();
            match best.get(&key) {
                Some(existing) if existing.confidence >= m.confidence => {}
                _ => {
                    best.insert(key, m);
                }
            }
        }
        let mut out: Vec<CitationMatch> = best.into_values().collect();
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out
    }

    // ── Strategies ───────────────────────────────────────────────────────────

    fn match_doi(&self, text: &str) -> Vec<CitationMatch> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for m in doi_re().find_iter(text) {
            // Trailing sentence punctuation is not part of the DOI.
            let raw = m.as_str().trim_end_matches(['.', ',', ';', ')']);
            if let Some(&idx) = self.by_doi.get(&raw.to_lowercase()) {
                if seen.insert(idx) {
                    out.push(CitationMatch {
                        citation: self.citations[idx].clone(),
                        confidence: DOI_CONFIDENCE,
                        match_type: MatchType::Doi,
                        matched_span: raw.to_string(),
                    });
                }
            }
        }
        out
    }

    fn match_author_year(&self, text: &str) -> Vec<CitationMatch> {
        let patterns = [
            author_paren_year_re(),
            paren_author_year_re(),
            bare_author_year_re(),
        ];
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for re in patterns {
            for cap in re.captures_iter(text) {
                let key = format!("{}_{}", cap[1].to_lowercase(), &cap[2]);
                if let Some(&idx) = self.by_author_year.get(&key) {
                    if seen.insert(idx) {
                        out.push(CitationMatch {
                            citation: self.citations[idx].clone(),
                            confidence: AUTHOR_YEAR_CONFIDENCE,
                            match_type: MatchType::AuthorYear,
                            matched_span: cap[0].to_string(),
                        });
                    }
                }
            }
        }
        out
    }

    fn match_title(&self, text: &str) -> Vec<CitationMatch> {
        let input = normalize(text);
        if input.is_empty() {
            return Vec::new();
        }
        let mut out: Vec<CitationMatch> = Vec::new();
        for (title_key, &idx) in &self.by_title {
            if !input.contains(title_key.as_str()) && !title_key.contains(input.as_str()) {
                continue;
            }
            let score = jaccard_words(&input, title_key);
            if score > TITLE_THRESHOLD {
                out.push(CitationMatch {
                    citation: self.citations[idx].clone(),
                    confidence: score * TITLE_DISCOUNT,
                    match_type: MatchType::Title,
                    matched_span: self.citations[idx].title.clone(),
                });
            }
        }
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out
    }

    /// Unlike the other strategies this one returns at most the single
    /// best-scoring citation; fuzzy scores are too noisy to union.
    fn match_fuzzy(&self, text: &str) -> Vec<CitationMatch> {
        let input = normalize(text);
        if input.is_empty() {
            return Vec::new();
        }
        let mut best: Option<(f64, usize)> = None;
        for (idx, c) in self.citations.iter().enumerate() {
            let score = jaccard_words(&input, &normalize(&c.search_text()));
            if score > FUZZY_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
                best = Some((score, idx));
            }
        }
        best.map(|(score, idx)| CitationMatch {
            citation: self.citations[idx].clone(),
            confidence: score * FUZZY_DISCOUNT,
            match_type: MatchType::Fuzzy,
            matched_span: self.citations[idx].title.clone(),
        })
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, CitationType};

    fn citation(id: &str, title: &str, family: &str, year: i32, doi: Option<&str>) -> Citation {
        Citation {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec![Author::Parsed {
                family: family.to_string(),
                given: "A".to_string(),
            }],
            year: Some(year),
            container_title: Some("Journal of Tests".to_string()),
            publisher: None,
            doi: doi.map(str::to_string),
            url: None,
            volume: None,
            issue: None,
            pages: None,
            citation_type: CitationType::JournalArticle,
            abstract_text: None,
        }
    }

    fn matcher() -> CitationMatcher {
        CitationMatcher::new(vec![
            citation("p1", "Attention Is All You Need", "Vaswani", 2017, Some("10.5555/3295222")),
            citation("p2", "Deep Residual Learning for Image Recognition", "He", 2016, None),
        ])
    }

    #[test]
    fn test_doi_match_case_insensitive() {
        let m = matcher();
        let hit = m.find_best_match("as shown in 10.5555/3295222.").unwrap();
        assert_eq!(hit.match_type, MatchType::Doi);
        assert_eq!(hit.citation.id, "p1");
        assert!((hit.confidence - 0.95).abs() < 1e-9);

        let hit = m.find_best_match("doi 10.5555/3295222").unwrap();
        assert_eq!(hit.citation.id, "p1");
    }

    #[test]
    fn test_author_year_variants() {
        let m = matcher();
        for text in [
            "Vaswani (2017) introduced transformers",
            "transformers were introduced (Vaswani et al., 2017)",
            "per Vaswani, 2017 the model",
        ] {
            let hit = m.find_best_match(text).unwrap_or_else(|| panic!("no match for {text:?}"));
            assert_eq!(hit.match_type, MatchType::AuthorYear, "text: {text}");
            assert_eq!(hit.citation.id, "p1");
            assert!((hit.confidence - 0.85).abs() < 1e-9);
        }
    }

    #[test]
    fn test_title_match() {
        let m = matcher();
        let hit = m
            .find_best_match("see Deep Residual Learning for Image Recognition")
            .unwrap();
        assert_eq!(hit.match_type, MatchType::Title);
        assert_eq!(hit.citation.id, "p2");
        assert!(hit.confidence <= 0.8);
    }

    #[test]
    fn test_strategy_priority_doi_over_author_year() {
        let m = matcher();
        let hit = m
            .find_best_match("Vaswani (2017), doi 10.5555/3295222")
            .unwrap();
        assert_eq!(hit.match_type, MatchType::Doi);
    }

    #[test]
    fn test_no_match_returns_none() {
        let m = matcher();
        assert!(m.find_best_match("completely unrelated prose about cooking").is_none());
    }

    #[test]
    fn test_find_all_matches_dedups_by_citation() {
        let m = matcher();
        // DOI and author-year both point at p1
        let all = m.find_all_matches("Vaswani (2017), doi 10.5555/3295222", 0.1);
        let p1_hits = all.iter().filter(|h| h.citation.id == "p1").count();
        assert_eq!(p1_hits, 1);
        // highest-confidence strategy kept
        let p1 = all.iter().find(|h| h.citation.id == "p1").unwrap();
        assert_eq!(p1.match_type, MatchType::Doi);
    }

    #[test]
    fn test_find_all_sorted_desc_and_thresholded() {
        let m = matcher();
        let all = m.find_all_matches(
            "Vaswani (2017); Deep Residual Learning for Image Recognition",
            0.1,
        );
        assert!(all.len() >= 2);
        for pair in all.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert!(m
            .find_all_matches("Vaswani (2017)", 0.99)
            .is_empty());
    }

    #[test]
    fn test_two_dois_in_one_text_both_found() {
        let m = CitationMatcher::new(vec![
            citation("p1", "First Paper", "Adams", 2001, Some("10.1000/aaa")),
            citation("p2", "Second Paper", "Brown", 2002, Some("10.2000/bbb")),
        ]);
        let all = m.find_all_matches("compare 10.1000/aaa with 10.2000/bbb", 0.5);
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|h| h.match_type == MatchType::Doi));
    }

    #[test]
    fn test_update_citations_rebuilds_indexes() {
        let mut m = matcher();
        m.update_citations(vec![citation("p9", "New Paper", "Kim", 2020, None)]);
        assert!(m.find_best_match("Vaswani (2017)").is_none());
        assert!(m.find_best_match("Kim (2020)").is_some());
        assert_eq!(m.citation_count(), 1);
    }
}
