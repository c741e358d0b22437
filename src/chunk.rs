//! Overlapping window chunker.
//!
//! Text is measured in token units. A window of `max_tokens` units is cut,
//! then the window start advances by `max_tokens - overlap_tokens` units
//! until the start passes the end of the text. Windows whose trimmed text is
//! shorter than `min_chunk_chars` are dropped as noise.
//!
//! Units come from a HuggingFace tokenizer when the `hf-tokenizer` feature is
//! enabled and `chunking.tokenizer_path` loads; otherwise (or when encoding
//! fails) a unit is [`CHARS_PER_TOKEN`] characters.

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::{Chunk, DocumentRecord};

/// Approximate chars-per-token ratio for the heuristic counter.
pub const CHARS_PER_TOKEN: usize = 4;

/// How text is divided into token units.
pub enum TokenCounter {
    Heuristic,
    #[cfg(feature = "hf-tokenizer")]
    HuggingFace(Box<tokenizers::Tokenizer>),
}

impl TokenCounter {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        match &config.tokenizer_path {
            #[cfg(feature = "hf-tokenizer")]
            Some(path) => match tokenizers::Tokenizer::from_file(path) {
                Ok(tokenizer) => TokenCounter::HuggingFace(Box::new(tokenizer)),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "tokenizer load failed, using character heuristic"
                    );
                    TokenCounter::Heuristic
                }
            },
            #[cfg(not(feature = "hf-tokenizer"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "tokenizer_path set but built without the hf-tokenizer feature, using character heuristic"
                );
                TokenCounter::Heuristic
            }
            None => TokenCounter::Heuristic,
        }
    }

    /// Byte offsets where units begin, followed by `text.len()`.
    ///
    /// Units cover the text contiguously, so any window `[i, j)` maps to the
    /// exact slice `text[b[i]..b[j]]`.
    pub fn unit_boundaries(&self, text: &str) -> Vec<usize> {
        match self {
            TokenCounter::Heuristic => heuristic_boundaries(text),
            #[cfg(feature = "hf-tokenizer")]
            TokenCounter::HuggingFace(tokenizer) => match tokenizer.encode(text, false) {
                Ok(encoding) => {
                    let mut bounds: Vec<usize> = std::iter::once(0)
                        .chain(encoding.get_offsets().iter().map(|(start, _)| *start))
                        .filter(|&b| b < text.len() && text.is_char_boundary(b))
                        .collect();
                    bounds.sort_unstable();
                    bounds.dedup();
                    bounds.push(text.len());
                    bounds
                }
                Err(e) => {
                    tracing::warn!(error = %e, "tokenization failed, using character heuristic");
                    heuristic_boundaries(text)
                }
            },
        }
    }
}

fn heuristic_boundaries(text: &str) -> Vec<usize> {
    if text.is_empty() {
        return vec![0];
    }
    let mut bounds: Vec<usize> = text
        .char_indices()
        .step_by(CHARS_PER_TOKEN)
        .map(|(i, _)| i)
        .collect();
    bounds.push(text.len());
    bounds
}

/// Start unit of every window over `units` units.
pub fn window_starts(units: usize, size: usize, overlap: usize) -> Vec<usize> {
    let step = size.saturating_sub(overlap).max(1);
    (0..units).step_by(step).collect()
}

/// Split `text` into overlapping windows of `size` units.
pub fn split_windows<'a>(
    text: &'a str,
    bounds: &[usize],
    size: usize,
    overlap: usize,
) -> Vec<&'a str> {
    let units = bounds.len().saturating_sub(1);
    window_starts(units, size, overlap)
        .into_iter()
        .map(|start| {
            let end = (start + size).min(units);
            &text[bounds[start]..bounds[end]]
        })
        .collect()
}

pub struct Chunker {
    counter: TokenCounter,
    max_tokens: usize,
    overlap_tokens: usize,
    min_chunk_chars: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self::with_counter(config, TokenCounter::from_config(config))
    }

    pub fn with_counter(config: &ChunkingConfig, counter: TokenCounter) -> Self {
        let max_tokens = config.max_tokens.max(1);
        Self {
            counter,
            max_tokens,
            overlap_tokens: config.overlap_tokens.min(max_tokens - 1),
            min_chunk_chars: config.min_chunk_chars,
        }
    }

    /// Split raw text into windows, before the noise filter.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let bounds = self.counter.unit_boundaries(text);
        split_windows(text, &bounds, self.max_tokens, self.overlap_tokens)
    }

    /// Chunk one document of an indexing batch.
    ///
    /// `doc_seq` is the document's position in the batch; ids are
    /// `doc_{doc_seq}_chunk_{window}` and windows dropped by the noise
    /// filter leave gaps in `chunk_index`.
    pub fn chunk_document(&self, doc_seq: usize, doc: &DocumentRecord) -> Vec<Chunk> {
        self.split_text(&doc.text)
            .into_iter()
            .enumerate()
            .filter(|(_, piece)| piece.trim().chars().count() >= self.min_chunk_chars)
            .map(|(i, piece)| make_chunk(doc_seq, i as i64, doc, piece))
            .collect()
    }
}

fn make_chunk(doc_seq: usize, index: i64, doc: &DocumentRecord, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("doc_{}_chunk_{}", doc_seq, index),
        category: doc.category,
        filename: doc.filename.clone(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn config(max_tokens: usize, overlap_tokens: usize, min_chunk_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_tokens,
            overlap_tokens,
            min_chunk_chars,
            tokenizer_path: None,
        }
    }

    fn doc(text: &str) -> DocumentRecord {
        DocumentRecord {
            category: Category::Contract,
            filename: "contract.pdf".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn window_starts_advance_by_size_minus_overlap() {
        assert_eq!(window_starts(10, 4, 1), vec![0, 3, 6, 9]);
        assert_eq!(window_starts(0, 4, 1), Vec::<usize>::new());
        assert_eq!(window_starts(3, 5, 0), vec![0]);
    }

    #[test]
    fn heuristic_windows_advance_by_exact_char_step() {
        // 10 tokens = 40 chars per window, step of 8 tokens = 32 chars.
        let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = Chunker::new(&config(10, 2, 0));
        let pieces = chunker.split_text(&text);

        let mut expected_start = 0;
        for piece in &pieces {
            let start = piece.as_ptr() as usize - text.as_ptr() as usize;
            assert_eq!(start, expected_start);
            assert_eq!(piece.len(), 40usize.min(text.len() - start));
            expected_start += 32;
        }
        assert!(expected_start >= text.len());
        assert_eq!(pieces.len(), 16);
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let text = "0123456789abcdefghij";
        let chunker = Chunker::new(&config(2, 1, 0));
        let pieces = chunker.split_text(text);
        assert_eq!(pieces[0], "01234567");
        assert_eq!(pieces[1], "456789ab");
        assert_eq!(&pieces[0][4..], &pieces[1][..4]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "공사 지연에 따른 클레임 검토 보고서입니다".repeat(10);
        let chunker = Chunker::new(&config(5, 1, 0));
        let pieces = chunker.split_text(&text);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.chars().count() <= 20));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = Chunker::new(&config(10, 2, 0));
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.chunk_document(0, &doc("")).is_empty());
    }

    #[test]
    fn short_chunks_are_dropped_and_ids_keep_position() {
        // 60 chars of content, window 12 tokens = 48 chars, step 40 chars:
        // second window is 20 chars of text and falls under the 30-char floor.
        let text = "x".repeat(60);
        let chunker = Chunker::new(&config(12, 2, 30));
        let chunks = chunker.chunk_document(3, &doc(&text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc_3_chunk_0");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].filename, "contract.pdf");
        assert_eq!(chunks[0].category, Category::Contract);

        let whitespace = format!("{}{}", " ".repeat(48), "y".repeat(40));
        let chunks = chunker.chunk_document(0, &doc(&whitespace));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc_0_chunk_1");
    }

    #[test]
    fn chunk_hash_is_deterministic() {
        let chunker = Chunker::new(&config(50, 10, 0));
        let a = chunker.chunk_document(0, &doc("The contractor shall notify the engineer."));
        let b = chunker.chunk_document(0, &doc("The contractor shall notify the engineer."));
        assert_eq!(a[0].hash, b[0].hash);
        assert_eq!(a[0].hash.len(), 64);
    }
}
