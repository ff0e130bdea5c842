//! Sliding-window document chunker.
//!
//! Splits extracted full text into retrieval units bounded by a token
//! budget, with a defined word overlap between consecutive chunks so
//! sentences cut at a boundary stay searchable. The duplicated prefix
//! length is recorded per chunk; metadata extraction skips it.

use crate::metadata::extract_metadata;
use crate::models::Chunk;

/// Configuration for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum tokens per chunk.
    pub max_tokens: usize,
    /// Token overlap between consecutive chunks.
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 480,
            overlap_tokens: 64,
        }
    }
}

/// Chunk a paper's full text and extract metadata for every chunk.
pub fn chunk_text(paper_id: &str, text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    // 1 token ≈ 0.75 words for subword tokenizers on English prose
    let words_per_chunk = ((config.max_tokens as f32 * 0.75) as usize).max(1);
    let overlap_words = ((config.overlap_tokens as f32 * 0.75) as usize).min(words_per_chunk / 2);
    let step = (words_per_chunk - overlap_words).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;
    while start < words.len() {
        let end = (start + words_per_chunk).min(words.len());
        let content = words[start..end].join(" ");

        // chars duplicated from the previous chunk, including the joining space
        let overlap_len = if start == 0 {
            0
        } else {
            let shared_end = (start + overlap_words).min(end);
            let prefix = words[start..shared_end].join(" ");
            if shared_end < end {
                (prefix.len() + 1).min(content.len())
            } else {
                prefix.len()
            }
        };

        let mut chunk = Chunk::new(paper_id, chunk_index, content, overlap_len);
        chunk.metadata = extract_metadata(&chunk.content, chunk.chunk_index, chunk.overlap_len);
        chunks.push(chunk);
        chunk_index += 1;

        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("p1", "A short abstract about transformers.", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].overlap_len, 0);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let text = (0..1000).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let config = ChunkerConfig { max_tokens: 100, overlap_tokens: 20 };
        let chunks = chunk_text("p1", &text, &config);
        assert!(chunks.len() > 1);

        // every later chunk starts with the tail of the previous one
        for pair in chunks.windows(2) {
            let overlap = &pair[1].content[..pair[1].overlap_len];
            assert!(
                pair[0].content.ends_with(overlap.trim_end()),
                "overlap prefix not shared: {overlap:?}"
            );
            assert!(pair[1].overlap_len > 0);
        }
    }

    #[test]
    fn test_indices_are_sequential() {
        let text = "w ".repeat(500);
        let config = ChunkerConfig { max_tokens: 100, overlap_tokens: 10 };
        let chunks = chunk_text("p1", &text, &config);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(chunk_text("p1", "   ", &ChunkerConfig::default()).is_empty());
    }
}
