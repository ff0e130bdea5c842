//! Builtin fast-path style formatting: APA, MLA and Chicago author-date,
//! implemented directly with no style data. Pure and synchronous.
//!
//! Degrades gracefully on missing data: no authors renders "Anonymous",
//! no year renders "n.d.", absent fields are skipped rather than leaving
//! empty-parens artifacts.

use crate::models::{Author, Citation, CitationType};
use crate::style::BuiltinStyle;

const ANONYMOUS: &str = "Anonymous";
const NO_DATE: &str = "n.d.";

fn year_token(citation: &Citation) -> String {
    citation
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// In-text citation. Author-list joining per style:
/// one author: surname; two: "A & B" (APA) / "A and B" (MLA, Chicago);
/// three or more: "A et al.".
pub fn in_text(style: BuiltinStyle, citation: &Citation) -> String {
    let names = in_text_names(style, &citation.authors);
    let year = year_token(citation);
    match style {
        BuiltinStyle::Apa => format!("({names}, {year})"),
        BuiltinStyle::Chicago => format!("({names} {year})"),
        // MLA in-text has no date; pages would go here when a locator is known
        BuiltinStyle::Mla => format!("({names})"),
    }
}

fn in_text_names(style: BuiltinStyle, authors: &[Author]) -> String {
    let and = match style {
        BuiltinStyle::Apa => "&",
        BuiltinStyle::Mla | BuiltinStyle::Chicago => "and",
    };
    match authors {
        [] => ANONYMOUS.to_string(),
        [a] => a.family_name().to_string(),
        [a, b] => format!("{} {} {}", a.family_name(), and, b.family_name()),
        [a, ..] => format!("{} et al.", a.family_name()),
    }
}

/// Bibliography entry for a single citation.
pub fn bibliography_entry(style: BuiltinStyle, citation: &Citation) -> String {
    match style {
        BuiltinStyle::Apa => apa_entry(citation),
        BuiltinStyle::Mla => mla_entry(citation),
        BuiltinStyle::Chicago => chicago_entry(citation),
    }
}

/// Full bibliography: entries deduplicated by citation identity and sorted
/// alphabetically by first author's surname, authorless entries last.
pub fn bibliography(style: BuiltinStyle, citations: &[Citation]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<&Citation> = Vec::new();
    for c in citations {
        if seen.insert(c.dedup_key()) {
            unique.push(c);
        }
    }
    unique.sort_by(|a, b| {
        let ka = sort_key(a);
        let kb = sort_key(b);
        ka.cmp(&kb)
    });
    unique
        .into_iter()
        .map(|c| bibliography_entry(style, c))
        .collect()
}

fn sort_key(c: &Citation) -> (bool, String, Option<i32>, String) {
    match c.first_author_family() {
        Some(family) => (false, family.to_lowercase(), c.year, c.title.to_lowercase()),
        None => (true, String::new(), c.year, c.title.to_lowercase()),
    }
}

/// Join name strings with a final conjunction: "a", "a & b", "a, b, & c".
fn join_names(names: &[String], and: &str, oxford: bool) -> String {
    match names {
        [] => ANONYMOUS.to_string(),
        [a] => a.clone(),
        [a, b] => format!("{a} {and} {b}"),
        _ => {
            let head = &names[..names.len() - 1];
            let last = &names[names.len() - 1];
            let sep = if oxford { format!(", {and} ") } else { format!(" {and} ") };
            format!("{}{}{}", head.join(", "), sep, last)
        }
    }
}

// ── APA ──────────────────────────────────────────────────────────────────────

/// "Family, G." — literal names pass through unchanged.
fn apa_name(author: &Author) -> String {
    match author.initial() {
        Some(initial) => format!("{}, {}.", author.family_name(), initial),
        None => match author {
            Author::Literal { literal } => literal.clone(),
            Author::Parsed { family, .. } => family.clone(),
        },
    }
}

fn apa_authors(authors: &[Author]) -> String {
    let names: Vec<String> = authors.iter().map(apa_name).collect();
    join_names(&names, "&", true)
}

fn apa_entry(c: &Citation) -> String {
    let authors = apa_authors(&c.authors);
    let year = year_token(c);
    let mut out = format!("{authors} ({year}). {title}.", title = c.title.trim_end_matches('.'));

    match c.citation_type {
        CitationType::JournalArticle | CitationType::Other => {
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container}"));
                if let Some(v) = &c.volume {
                    out.push_str(&format!(", {v}"));
                    if let Some(i) = &c.issue {
                        out.push_str(&format!("({i})"));
                    }
                }
                if let Some(p) = &c.pages {
                    out.push_str(&format!(", {p}"));
                }
                out.push('.');
            }
        }
        CitationType::Book => {
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher}."));
            }
        }
        CitationType::Chapter | CitationType::ConferencePaper => {
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" In {container}"));
                if let Some(p) = &c.pages {
                    out.push_str(&format!(" (pp. {p})"));
                }
                out.push('.');
            }
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher}."));
            }
        }
        CitationType::Thesis => {
            out.push_str(" [Doctoral dissertation].");
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher}."));
            }
        }
        CitationType::Webpage | CitationType::Report => {
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container}."));
            }
        }
    }

    if let Some(doi) = &c.doi {
        out.push_str(&format!(" https://doi.org/{doi}"));
    } else if let Some(url) = &c.url {
        out.push_str(&format!(" {url}"));
    }
    out
}

// ── MLA ──────────────────────────────────────────────────────────────────────

/// First author inverted ("Family, Given"), the rest in natural order;
/// three or more collapse to "Family, Given, et al."
fn mla_authors(authors: &[Author]) -> String {
    let inverted = |a: &Author| match a {
        Author::Parsed { family, given } => format!("{family}, {given}"),
        Author::Literal { literal } => literal.clone(),
    };
    let natural = |a: &Author| match a {
        Author::Parsed { family, given } => format!("{given} {family}"),
        Author::Literal { literal } => literal.clone(),
    };
    match authors {
        [] => ANONYMOUS.to_string(),
        [a] => inverted(a),
        [a, b] => format!("{}, and {}", inverted(a), natural(b)),
        [a, ..] => format!("{}, et al.", inverted(a)),
    }
}

fn mla_entry(c: &Citation) -> String {
    let authors = mla_authors(&c.authors);
    let year = year_token(c);
    let title = c.title.trim_end_matches('.');

    match c.citation_type {
        CitationType::Book => {
            let mut out = format!("{authors}. {title}.");
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher},"));
            }
            out.push_str(&format!(" {year}."));
            out
        }
        CitationType::Thesis => {
            let mut out = format!("{authors}. {title}. {year}.");
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher},"));
            }
            out.push_str(" PhD dissertation.");
            out
        }
        _ => {
            let mut out = format!("{authors}. \"{title}.\"");
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container},"));
            }
            if let Some(v) = &c.volume {
                out.push_str(&format!(" vol. {v},"));
            }
            if let Some(i) = &c.issue {
                out.push_str(&format!(" no. {i},"));
            }
            out.push_str(&format!(" {year}"));
            if let Some(p) = &c.pages {
                out.push_str(&format!(", pp. {p}"));
            }
            out.push('.');
            if matches!(c.citation_type, CitationType::Webpage) {
                if let Some(url) = &c.url {
                    out.push_str(&format!(" {url}."));
                }
            }
            out
        }
    }
}

// ── Chicago (author-date) ────────────────────────────────────────────────────

fn chicago_authors(authors: &[Author]) -> String {
    let inverted = |a: &Author| match a {
        Author::Parsed { family, given } => format!("{family}, {given}"),
        Author::Literal { literal } => literal.clone(),
    };
    let natural = |a: &Author| match a {
        Author::Parsed { family, given } => format!("{given} {family}"),
        Author::Literal { literal } => literal.clone(),
    };
    match authors {
        [] => ANONYMOUS.to_string(),
        [a] => inverted(a),
        [first, rest @ ..] => {
            let mut names = vec![inverted(first)];
            names.extend(rest.iter().map(natural));
            join_names(&names, "and", true)
        }
    }
}

fn chicago_entry(c: &Citation) -> String {
    let authors = chicago_authors(&c.authors);
    let year = year_token(c);
    let title = c.title.trim_end_matches('.');

    match c.citation_type {
        CitationType::Book => {
            let mut out = format!("{authors}. {year}. {title}.");
            if let Some(publisher) = &c.publisher {
                out.push_str(&format!(" {publisher}."));
            }
            out
        }
        _ => {
            let mut out = format!("{authors}. {year}. \"{title}.\"");
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container}"));
                if let Some(v) = &c.volume {
                    out.push_str(&format!(" {v}"));
                    if let Some(i) = &c.issue {
                        out.push_str(&format!(" ({i})"));
                    }
                }
                if let Some(p) = &c.pages {
                    out.push_str(&format!(": {p}"));
                }
                out.push('.');
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smith_2023() -> Citation {
        Citation {
            id: "a1b2c3".to_string(),
            title: "Deep Learning Advances".to_string(),
            authors: vec![Author::Parsed { family: "Smith".into(), given: "J.".into() }],
            year: Some(2023),
            container_title: Some("Nature Machine Intelligence".to_string()),
            publisher: None,
            doi: None,
            url: None,
            volume: Some("5".to_string()),
            issue: Some("2".to_string()),
            pages: Some("101-115".to_string()),
            citation_type: CitationType::JournalArticle,
            abstract_text: None,
        }
    }

    fn with_authors(mut c: Citation, families: &[&str]) -> Citation {
        c.authors = families
            .iter()
            .map(|f| Author::Parsed { family: f.to_string(), given: "A.".to_string() })
            .collect();
        c
    }

    #[test]
    fn test_apa_in_text_author_counts() {
        let c = smith_2023();
        assert_eq!(in_text(BuiltinStyle::Apa, &c), "(Smith, 2023)");

        let c2 = with_authors(smith_2023(), &["Smith", "Jones"]);
        assert_eq!(in_text(BuiltinStyle::Apa, &c2), "(Smith & Jones, 2023)");

        let c3 = with_authors(smith_2023(), &["Smith", "Jones", "Lee"]);
        assert_eq!(in_text(BuiltinStyle::Apa, &c3), "(Smith et al., 2023)");
    }

    #[test]
    fn test_chicago_and_mla_in_text() {
        let c2 = with_authors(smith_2023(), &["Smith", "Jones"]);
        assert_eq!(in_text(BuiltinStyle::Chicago, &c2), "(Smith and Jones 2023)");
        assert_eq!(in_text(BuiltinStyle::Mla, &c2), "(Smith and Jones)");
    }

    #[test]
    fn test_missing_data_fallbacks() {
        let mut c = smith_2023();
        c.authors.clear();
        c.year = None;
        let rendered = in_text(BuiltinStyle::Apa, &c);
        assert_eq!(rendered, "(Anonymous, n.d.)");
        assert!(!rendered.contains("undefined"));
        assert!(!rendered.contains("(, )"));

        for style in [BuiltinStyle::Apa, BuiltinStyle::Mla, BuiltinStyle::Chicago] {
            let entry = bibliography_entry(style, &c);
            assert!(entry.contains("Anonymous"), "{style:?}: {entry}");
            assert!(entry.contains("n.d."), "{style:?}: {entry}");
        }
    }

    #[test]
    fn test_apa_journal_entry() {
        let entry = bibliography_entry(BuiltinStyle::Apa, &smith_2023());
        assert_eq!(
            entry,
            "Smith, J. (2023). Deep Learning Advances. Nature Machine Intelligence, 5(2), 101-115."
        );
    }

    #[test]
    fn test_apa_entry_with_doi() {
        let mut c = smith_2023();
        c.doi = Some("10.1038/s42256".to_string());
        let entry = bibliography_entry(BuiltinStyle::Apa, &c);
        assert!(entry.ends_with("https://doi.org/10.1038/s42256"));
    }

    #[test]
    fn test_mla_journal_entry() {
        let mut c = smith_2023();
        c.authors = vec![Author::Parsed { family: "Smith".into(), given: "Jane".into() }];
        let entry = bibliography_entry(BuiltinStyle::Mla, &c);
        assert_eq!(
            entry,
            "Smith, Jane. \"Deep Learning Advances.\" Nature Machine Intelligence, vol. 5, no. 2, 2023, pp. 101-115."
        );
    }

    #[test]
    fn test_chicago_journal_entry() {
        let mut c = smith_2023();
        c.authors = vec![Author::Parsed { family: "Smith".into(), given: "Jane".into() }];
        let entry = bibliography_entry(BuiltinStyle::Chicago, &c);
        assert_eq!(
            entry,
            "Smith, Jane. 2023. \"Deep Learning Advances.\" Nature Machine Intelligence 5 (2): 101-115."
        );
    }

    #[test]
    fn test_apa_book_entry() {
        let mut c = smith_2023();
        c.citation_type = CitationType::Book;
        c.container_title = None;
        c.volume = None;
        c.issue = None;
        c.pages = None;
        c.publisher = Some("MIT Press".to_string());
        let entry = bibliography_entry(BuiltinStyle::Apa, &c);
        assert_eq!(entry, "Smith, J. (2023). Deep Learning Advances. MIT Press.");
    }

    #[test]
    fn test_bibliography_dedups_and_sorts() {
        let lee_a = {
            let mut c = with_authors(smith_2023(), &["Lee"]);
            c.id = "x1".into();
            c.title = "Shared Title".into();
            c.year = Some(1998);
            c
        };
        let lee_b = {
            let mut c = lee_a.clone();
            c.id = "x2".into(); // same title + no doi: duplicate identity
            c
        };
        let kim = {
            let mut c = with_authors(smith_2023(), &["Kim"]);
            c.id = "x3".into();
            c.title = "Another Title".into();
            c.year = Some(2020);
            c
        };
        let entries = bibliography(BuiltinStyle::Apa, &[lee_a, lee_b, kim]);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Kim"));
        assert!(entries[1].starts_with("Lee"));
    }

    #[test]
    fn test_authorless_sorts_last() {
        let mut anon = smith_2023();
        anon.id = "x9".into();
        anon.title = "AAA First Alphabetically".into();
        anon.authors.clear();
        let entries = bibliography(BuiltinStyle::Apa, &[anon, smith_2023()]);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Smith"));
        assert!(entries[1].starts_with("Anonymous"));
    }
}
