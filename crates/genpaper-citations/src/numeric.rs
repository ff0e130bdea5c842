//! Numeric citation formatting (IEEE, Vancouver).
//!
//! In-text citations render as bracketed numbers from an externally supplied
//! citation-number map. The map is owned by the caller because numbering is
//! a document-level concern (order of first mention), not a property of the
//! citation itself.

use std::collections::HashMap;

use crate::models::Citation;
use crate::style::NumericStyle;

/// Citation id → assigned number (1-based, order of first mention).
pub type NumberMap = HashMap<String, u32>;

/// Build a number map assigning 1, 2, 3… in the order citations are given.
pub fn assign_numbers(ids: &[String]) -> NumberMap {
    let mut map = NumberMap::new();
    let mut next = 1;
    for id in ids {
        map.entry(id.clone()).or_insert_with(|| {
            let n = next;
            next += 1;
            n
        });
    }
    map
}

/// Single in-text citation: `[3]`, or `[?]` when no number is assigned.
pub fn format_inline(numbers: &NumberMap, citation_id: &str) -> String {
    match numbers.get(citation_id) {
        Some(n) => format!("[{n}]"),
        None => "[?]".to_string(),
    }
}

/// Multiple citations cited together. Runs of three or more consecutive
/// numbers collapse to a range: {1,2,3} → `[1-3]`; {1,3,5} → `[1, 3, 5]`.
/// Unassigned citations render as `?` after the numbered ones.
pub fn format_inline_multiple(numbers: &NumberMap, citation_ids: &[String]) -> String {
    let mut assigned: Vec<u32> = citation_ids
        .iter()
        .filter_map(|id| numbers.get(id).copied())
        .collect();
    assigned.sort_unstable();
    assigned.dedup();
    let unassigned = citation_ids
        .iter()
        .filter(|id| !numbers.contains_key(id.as_str()))
        .count();

    if assigned.is_empty() {
        return "[?]".to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < assigned.len() {
        let start = assigned[i];
        let mut j = i;
        while j + 1 < assigned.len() && assigned[j + 1] == assigned[j] + 1 {
            j += 1;
        }
        let run = j - i + 1;
        if run >= 3 {
            parts.push(format!("{start}-{}", assigned[j]));
        } else {
            for &n in &assigned[i..=j] {
                parts.push(n.to_string());
            }
        }
        i = j + 1;
    }
    for _ in 0..unassigned {
        parts.push("?".to_string());
    }
    format!("[{}]", parts.join(", "))
}

/// Bibliography in citation-number order. Every entry is prefixed with its
/// number; citations without a number sort last under `[?]`.
pub fn bibliography(
    style: NumericStyle,
    numbers: &NumberMap,
    citations: &[Citation],
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<&Citation> = Vec::new();
    for c in citations {
        if seen.insert(c.dedup_key()) {
            unique.push(c);
        }
    }
    unique.sort_by_key(|c| numbers.get(&c.id).copied().unwrap_or(u32::MAX));
    unique
        .into_iter()
        .map(|c| {
            let prefix = match numbers.get(&c.id) {
                Some(n) => format!("[{n}]"),
                None => "[?]".to_string(),
            };
            format!("{prefix} {}", entry_body(style, c))
        })
        .collect()
}

/// "J. Smith and A. Jones" (IEEE) / "Smith J, Jones A" (Vancouver).
fn author_list(style: NumericStyle, c: &Citation) -> String {
    if c.authors.is_empty() {
        return "Anonymous".to_string();
    }
    match style {
        NumericStyle::Ieee => {
            let names: Vec<String> = c
                .authors
                .iter()
                .map(|a| match a.initial() {
                    Some(init) => format!("{}. {}", init, a.family_name()),
                    None => a.family_name().to_string(),
                })
                .collect();
            match names.len() {
                1 => names[0].clone(),
                2 => format!("{} and {}", names[0], names[1]),
                _ => format!("{} et al.", names[0]),
            }
        }
        NumericStyle::Vancouver => {
            let names: Vec<String> = c
                .authors
                .iter()
                .map(|a| match a.initial() {
                    Some(init) => format!("{} {}", a.family_name(), init),
                    None => a.family_name().to_string(),
                })
                .collect();
            names.join(", ")
        }
    }
}

fn entry_body(style: NumericStyle, c: &Citation) -> String {
    let authors = author_list(style, c);
    let year = c.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".to_string());
    let title = c.title.trim_end_matches('.');
    match style {
        NumericStyle::Ieee => {
            let mut out = format!("{authors}, \"{title},\"");
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container},"));
            }
            if let Some(v) = &c.volume {
                out.push_str(&format!(" vol. {v},"));
            }
            if let Some(i) = &c.issue {
                out.push_str(&format!(" no. {i},"));
            }
            if let Some(p) = &c.pages {
                out.push_str(&format!(" pp. {p},"));
            }
            out.push_str(&format!(" {year}."));
            out
        }
        NumericStyle::Vancouver => {
            let mut out = format!("{authors}. {title}.");
            if let Some(container) = &c.container_title {
                out.push_str(&format!(" {container}."));
            }
            out.push_str(&format!(" {year}"));
            if let Some(v) = &c.volume {
                out.push_str(&format!(";{v}"));
                if let Some(i) = &c.issue {
                    out.push_str(&format!("({i})"));
                }
            }
            if let Some(p) = &c.pages {
                out.push_str(&format!(":{p}"));
            }
            out.push('.');
            out
        }
    }
}
