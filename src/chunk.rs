//! Overlap-preserving text chunker.
//!
//! Splits a [`Document`]'s content into token-bounded [`Chunk`]s whose
//! character offsets trace back to exact substrings of the source text.
//! That substring property is what makes citations verifiable, and it is
//! the invariant every step of this module protects.
//!
//! # Algorithm
//!
//! 1. Convert `chunk_size_tokens` / `overlap_tokens` to character budgets
//!    using a 4 chars/token ratio.
//! 2. Cut at the character budget, then pull the cut back to the latest
//!    natural break (`\n\n`, sentence end, `\n`, space) inside a tolerance
//!    window covering the trailing quarter of the chunk. If no break exists
//!    there, the hard cut stands, snapped to a UTF-8 boundary.
//! 3. Start the next chunk at `end - overlap_chars`, so consecutive chunks
//!    share an overlap span of the configured size (within one token unit
//!    after boundary snapping).
//!
//! Documents that are empty or below the minimum viable size yield zero
//! chunks; callers log them as skipped. The transformation is pure.

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Approximate characters-per-token ratio used for all token accounting
/// (chunk budgets, context assembly). Must stay consistent across the crate.
pub const CHARS_PER_TOKEN: usize = 4;

/// Documents shorter than this yield no chunks.
pub const MIN_VIABLE_CHARS: usize = 50;

/// Estimate the token count of a text under the crate-wide ratio.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Split a batch of documents, skipping (and logging) the ones too short to
/// chunk. Chunks from one document are contiguous in the output.
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        let doc_chunks = split_document(doc, config);
        if doc_chunks.is_empty() {
            tracing::warn!(
                source_url = %doc.source_url,
                section = %doc.section_title,
                "skipping document below minimum viable chunk size"
            );
            continue;
        }
        chunks.extend(doc_chunks);
    }
    chunks
}

/// Split one document into overlapping chunks.
///
/// Every returned chunk satisfies
/// `doc.content[chunk.start_char..chunk.end_char] == chunk.content`, and for
/// consecutive chunks `next.start_char = prev.end_char - overlap_chars`
/// (modulo UTF-8 boundary snapping). Returns an empty vector for documents
/// that are empty, whitespace-only, or shorter than [`MIN_VIABLE_CHARS`].
pub fn split_document(doc: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let content = doc.content.as_str();
    if content.trim().is_empty() || content.len() < MIN_VIABLE_CHARS {
        return Vec::new();
    }

    let max_chars = config.chunk_size_tokens * CHARS_PER_TOKEN;
    let overlap_chars = config.overlap_tokens * CHARS_PER_TOKEN;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = if content.len() - start <= max_chars {
            content.len()
        } else {
            let hard = snap_back(content, start + max_chars);
            natural_break(content, start, hard)
        };

        chunks.push(make_chunk(doc, start, end));

        if end >= content.len() {
            break;
        }

        // Re-base the next chunk to preserve the configured overlap.
        let mut next = snap_back(content, end.saturating_sub(overlap_chars));
        if next <= start {
            next = snap_forward(content, start + 1);
        }
        start = next;
    }

    chunks
}

/// Pull a hard cut back to the latest natural text break inside the
/// tolerance window (the trailing quarter of the span). Falls back to the
/// hard cut when the window contains no break.
fn natural_break(content: &str, start: usize, hard: usize) -> usize {
    let span = hard - start;
    let window_start = snap_forward(content, hard - (span / 4).max(1));
    if window_start >= hard {
        return hard;
    }
    let window = &content[window_start..hard];

    for sep in ["\n\n", ". ", "\n", " "] {
        if let Some(pos) = window.rfind(sep) {
            let break_at = window_start + pos + sep.len();
            if break_at > start {
                return break_at;
            }
        }
    }

    hard
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_back(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Snap a byte index forward to the nearest valid UTF-8 char boundary.
fn snap_forward(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn make_chunk(doc: &Document, start: usize, end: usize) -> Chunk {
    let text = &doc.content[start..end];
    Chunk {
        id: Uuid::new_v4().to_string(),
        source_url: doc.source_url.clone(),
        section_title: doc.section_title.clone(),
        content: text.to_string(),
        start_char: start,
        end_char: end,
        token_count: estimate_tokens(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document {
            source_url: "https://docs.example.com/handbook/values".to_string(),
            section_title: "Values".to_string(),
            content: content.to_string(),
            start_char: 0,
            end_char: content.len(),
        }
    }

    fn cfg(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size_tokens: size,
            overlap_tokens: overlap,
        }
    }

    /// Concatenate chunks minus their overlaps and compare to the source.
    fn reconstruct(doc: &Document, chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut prev_end = 0usize;
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.content);
            } else {
                let overlap = prev_end - c.start_char;
                out.push_str(&c.content[overlap..]);
            }
            prev_end = c.end_char;
        }
        assert_eq!(prev_end, doc.content.len());
        out
    }

    #[test]
    fn test_short_document_yields_no_chunks() {
        let d = doc("Too short.");
        assert!(split_document(&d, &cfg(300, 50)).is_empty());
    }

    #[test]
    fn test_empty_and_whitespace_yield_no_chunks() {
        assert!(split_document(&doc(""), &cfg(300, 50)).is_empty());
        let blank = " ".repeat(80);
        assert!(split_document(&doc(&blank), &cfg(300, 50)).is_empty());
    }

    #[test]
    fn test_small_document_single_chunk() {
        let text = "GitLab values transparency. ".repeat(3);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(300, 50));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, text.len());
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_long_document_splits_with_overlap() {
        // 1400 chars: forces a split at chunk_size_tokens = 300 (1200 chars)
        let text = "GitLab values transparency. ".repeat(50);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(300, 50));
        assert!(chunks.len() >= 2);

        for pair in chunks.windows(2) {
            let overlap = pair[0].end_char as i64 - pair[1].start_char as i64;
            assert!(overlap > 0, "consecutive chunks must overlap");
            // within one token unit of the configured 50-token span
            let configured = (50 * CHARS_PER_TOKEN) as i64;
            assert!(
                (overlap - configured).abs() <= CHARS_PER_TOKEN as i64,
                "overlap {} deviates from configured {}",
                overlap,
                configured
            );
        }
    }

    #[test]
    fn test_offsets_trace_back_to_exact_substrings() {
        let text = "First sentence here. Second sentence follows. ".repeat(40);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(100, 20));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.start_char < c.end_char);
            assert!(c.end_char <= d.content.len());
            assert_eq!(&d.content[c.start_char..c.end_char], c.content);
        }
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let text = "Alpha beta gamma delta. Epsilon zeta eta theta.\n\nIota kappa lambda. "
            .repeat(60);
        let d = doc(&text);
        for (size, overlap) in [(300, 50), (100, 20), (50, 10), (80, 79)] {
            let chunks = split_document(&d, &cfg(size, overlap));
            assert!(!chunks.is_empty());
            assert_eq!(reconstruct(&d, &chunks), d.content, "size={}", size);
        }
    }

    #[test]
    fn test_cuts_prefer_sentence_boundaries() {
        let text = "One short sentence. ".repeat(100);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(100, 20));
        assert!(chunks.len() > 1);
        // every non-final chunk should end right after a sentence break
        for c in &chunks[..chunks.len() - 1] {
            assert!(
                c.content.ends_with(". "),
                "chunk should end at a sentence boundary, got ...{:?}",
                &c.content[c.content.len().saturating_sub(12)..]
            );
        }
    }

    #[test]
    fn test_hard_cut_without_breaks() {
        let text = "x".repeat(1000);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(100, 20));
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&d, &chunks), d.content);
        for c in &chunks {
            assert!(c.content.len() <= 100 * CHARS_PER_TOKEN);
        }
    }

    #[test]
    fn test_multibyte_content_respects_char_boundaries() {
        let text = "Überblick über die Werte für Transparenz und Effizienz. ".repeat(40);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(60, 15));
        assert!(chunks.len() > 1);
        for c in &chunks {
            // slicing would have panicked on a bad boundary; double-check anyway
            assert_eq!(&d.content[c.start_char..c.end_char], c.content);
        }
        assert_eq!(reconstruct(&d, &chunks), d.content);
    }

    #[test]
    fn test_token_counts_reflect_budget() {
        let text = "Words and more words in a row. ".repeat(100);
        let d = doc(&text);
        let chunks = split_document(&d, &cfg(100, 20));
        for c in &chunks {
            assert_eq!(c.token_count, estimate_tokens(&c.content));
            assert!(c.token_count <= 100);
        }
    }

    #[test]
    fn test_batch_split_skips_short_documents() {
        let long = "A perfectly reasonable section with enough text to chunk. ".repeat(10);
        let docs = vec![doc("tiny"), doc(&long), doc("")];
        let chunks = split_documents(&docs, &cfg(300, 50));
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.content.len() >= MIN_VIABLE_CHARS));
    }

    #[test]
    fn test_deterministic_boundaries() {
        let text = "Repeatable content for determinism checks. ".repeat(80);
        let d = doc(&text);
        let a = split_document(&d, &cfg(120, 30));
        let b = split_document(&d, &cfg(120, 30));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.start_char, y.start_char);
            assert_eq!(x.end_char, y.end_char);
            assert_eq!(x.content, y.content);
        }
    }
}
