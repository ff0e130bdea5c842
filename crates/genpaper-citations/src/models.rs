//! Bibliographic data models.

use genpaper_db::PaperRecord;
use serde::{Deserialize, Serialize};

use genpaper_common::text::normalize;

/// An author: structured where the source name was parseable,
/// otherwise the literal display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Parsed { family: String, given: String },
    Literal { literal: String },
}

impl Author {
    /// Parse a raw stored name. "Family, Given" splits into a structured
    /// author; anything else is kept literal.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(',') {
            Some((family, given)) if !family.trim().is_empty() && !given.trim().is_empty() => {
                Author::Parsed {
                    family: family.trim().to_string(),
                    given: given.trim().to_string(),
                }
            }
            _ => Author::Literal {
                literal: raw.to_string(),
            },
        }
    }

    /// Surname for in-text rendering and sorting. Literal names fall back to
    /// their last whitespace-separated token.
    pub fn family_name(&self) -> &str {
        match self {
            Author::Parsed { family, .. } => family,
            Author::Literal { literal } => {
                literal.rsplit(' ').next().unwrap_or(literal)
            }
        }
    }

    /// First initial of the given name, if structured.
    pub fn initial(&self) -> Option<char> {
        match self {
            Author::Parsed { given, .. } => given.chars().next(),
            Author::Literal { .. } => None,
        }
    }

    pub fn given_name(&self) -> Option<&str> {
        match self {
            Author::Parsed { given, .. } => Some(given),
            Author::Literal { .. } => None,
        }
    }
}

/// Publication type of a citation. Drives field ordering in bibliographies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationType {
    JournalArticle,
    Book,
    Chapter,
    ConferencePaper,
    Thesis,
    Webpage,
    Report,
    Other,
}

impl CitationType {
    pub fn from_record_type(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "journal-article" | "article" => CitationType::JournalArticle,
            "book" => CitationType::Book,
            "chapter" | "book-chapter" => CitationType::Chapter,
            "conference-paper" | "proceedings-article" => CitationType::ConferencePaper,
            "thesis" | "dissertation" => CitationType::Thesis,
            "webpage" | "website" => CitationType::Webpage,
            "report" => CitationType::Report,
            _ => CitationType::Other,
        }
    }
}

/// An immutable bibliographic record, built from a stored paper at
/// resolution time and re-derived (never mutated) if the paper changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub container_title: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub citation_type: CitationType,
    pub abstract_text: Option<String>,
}

impl Citation {
    pub fn from_record(record: &PaperRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            authors: record.authors.iter().map(|a| Author::parse(a)).collect(),
            year: record.year,
            container_title: record.venue.clone(),
            publisher: record.publisher.clone(),
            doi: record.doi.clone(),
            url: record.url.clone(),
            volume: record.volume.clone(),
            issue: record.issue.clone(),
            pages: record.pages.clone(),
            citation_type: CitationType::from_record_type(&record.record_type),
            abstract_text: record.abstract_text.clone(),
        }
    }

    /// Surname of the first author, if any.
    pub fn first_author_family(&self) -> Option<&str> {
        self.authors.first().map(|a| a.family_name())
    }

    /// Identity key for deduplication: lowercased DOI when present,
    /// otherwise the normalized title.
    pub fn dedup_key(&self) -> String {
        match &self.doi {
            Some(doi) if !doi.is_empty() => format!("doi:{}", doi.to_lowercase()),
            _ => format!("title:{}", normalize(&self.title)),
        }
    }

    /// Synthetic text used by the fuzzy matching strategy: title, author
    /// names, venue and a bounded abstract prefix.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = vec![self.title.clone()];
        for a in &self.authors {
            parts.push(a.family_name().to_string());
        }
        if let Some(venue) = &self.container_title {
            parts.push(venue.clone());
        }
        if let Some(abs) = &self.abstract_text {
            let prefix: String = abs.chars().take(300).collect();
            parts.push(prefix);
        }
        parts.join(" ")
    }
}

/// Character span into a text buffer. Invariant: `end >= start` and the
/// range addresses the literal substring it claims to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// The outcome of resolving one marker reference and rendering it.
/// `raw_span` points into the marker-bearing source text, `display_span`
/// into the processed display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedCitation {
    pub marker_text: String,
    pub in_text: String,
    pub citation: Citation,
    pub raw_span: Span,
    pub display_span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_parse_structured() {
        let a = Author::parse("Smith, Jane");
        assert_eq!(a, Author::Parsed { family: "Smith".into(), given: "Jane".into() });
        assert_eq!(a.family_name(), "Smith");
        assert_eq!(a.initial(), Some('J'));
    }

    #[test]
    fn test_author_parse_literal() {
        let a = Author::parse("Research Consortium");
        assert_eq!(a.family_name(), "Consortium");
        assert_eq!(a.initial(), None);
    }

    #[test]
    fn test_dedup_key_prefers_doi() {
        let mut rec = PaperRecord::stub("p1", "Some Title");
        rec.doi = Some("10.1/ABC".to_string());
        let c = Citation::from_record(&rec);
        assert_eq!(c.dedup_key(), "doi:10.1/abc");

        rec.doi = None;
        let c = Citation::from_record(&rec);
        assert_eq!(c.dedup_key(), "title:some title");
    }

    #[test]
    fn test_span_overlap() {
        assert!(Span::new(0, 5).overlaps(&Span::new(4, 8)));
        assert!(!Span::new(0, 5).overlaps(&Span::new(5, 8)));
    }
}
