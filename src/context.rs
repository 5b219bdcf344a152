//! Context assembly from ranked search results.
//!
//! Formats retrieved chunks into the citation-labeled context block handed
//! to the language model, enforcing a token budget with whole-result
//! truncation: a result either fits completely or is dropped along with
//! everything after it. Citations record exactly what was included, in
//! presentation order.

use crate::chunk::estimate_tokens;
use crate::models::{Citation, SearchResult};

/// Shown to the model in place of retrieved context when retrieval returned
/// nothing.
pub const NO_CONTEXT_NOTICE: &str = "No relevant context was found.";

/// The assembled context block plus the citation record backing it.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    /// One entry per included result, in the order presented.
    pub citations: Vec<Citation>,
    /// False when `results` was empty; callers decide whether to answer
    /// ungrounded or refuse.
    pub grounded: bool,
}

/// Assemble a context block from results already ordered by ascending
/// distance. Stops before the block that would exceed `max_tokens`; never
/// truncates mid-chunk.
pub fn assemble(results: &[SearchResult], max_tokens: usize) -> AssembledContext {
    if results.is_empty() {
        return AssembledContext {
            text: String::new(),
            citations: Vec::new(),
            grounded: false,
        };
    }

    let mut text = String::new();
    let mut citations = Vec::new();
    let mut used_tokens = 0usize;

    for (i, result) in results.iter().enumerate() {
        let block = format!(
            "[Source {}]\nSection: {}\nURL: {}\nContent: {}\n",
            i + 1,
            result.chunk.section_title,
            result.chunk.source_url,
            result.chunk.content
        );

        let block_tokens = estimate_tokens(&block);
        if used_tokens + block_tokens > max_tokens {
            break;
        }

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&block);
        used_tokens += block_tokens;

        citations.push(Citation {
            source_url: result.chunk.source_url.clone(),
            section_title: result.chunk.section_title.clone(),
            start_char: result.chunk.start_char,
            end_char: result.chunk.end_char,
            distance: result.distance,
        });
    }

    AssembledContext {
        grounded: !citations.is_empty(),
        text,
        citations,
    }
}
