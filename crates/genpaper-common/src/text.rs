//! Text utilities shared by the matcher, chunk metadata extractor and
//! claim analysis: normalization, word-set similarity, sentence splitting.

use std::collections::HashSet;

/// Stop words excluded from key-term extraction and fuzzy matching.
/// Deliberately small: scientific prose rarely needs a larger list.
const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "between", "both",
    "could", "data", "does", "each", "from", "have", "however", "into",
    "their", "there", "these", "they", "this", "those", "through", "under",
    "using", "were", "what", "when", "where", "which", "while", "with",
    "within", "would", "than", "that", "then", "them", "some", "such", "more",
    "most", "other", "over", "only", "very", "will", "based", "study",
    "studies", "paper", "results", "research",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercase, strip punctuation to spaces, collapse whitespace.
/// Used for title comparison and dedup keys.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Word-level Jaccard coefficient over normalized text.
/// Returns 0.0 when either side has no words.
pub fn jaccard_words(a: &str, b: &str) -> f64 {
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    intersection as f64 / union as f64
}

/// Content words of at least `min_len` characters, stop words excluded,
/// in normalized form.
pub fn content_words(text: &str, min_len: usize) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|w| w.len() >= min_len && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Split into sentences on `.`, `!`, `?` followed by whitespace.
/// Good enough for length statistics; not a linguistic segmenter.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let next_ws = bytes.get(i + 1).map(|b| b.is_ascii_whitespace()).unwrap_or(true);
            if next_ws {
                let s = text[start..=i].trim();
                if !s.is_empty() {
                    sentences.push(s);
                }
                start = i + 1;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Rough token estimation: words / 0.75 (subword tokenizers average
/// ~1.3 tokens per word on English prose).
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f32) / 0.75).ceil() as usize
}
