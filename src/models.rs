//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, search results, and answers
//! that flow through the indexing and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scraped documentation section, as produced by the external crawler.
///
/// Offsets are absolute positions in the original page text; they are carried
/// through untouched. Documents are immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source_url: String,
    pub section_title: String,
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// A token-bounded segment of a document with traceable character offsets.
///
/// `start_char`/`end_char` are 0-based offsets into the originating
/// document's `content`, so `doc.content[start_char..end_char]` always
/// equals `content`. Consecutive chunks from the same document overlap by
/// the configured overlap span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub source_url: String,
    pub section_title: String,
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
    pub token_count: usize,
}

/// A ranked hit returned from [`VectorIndex::search`](crate::index::VectorIndex::search).
///
/// `distance` is cosine distance: non-negative, lower = more similar.
/// Ephemeral; created per query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub distance: f32,
    pub rank: usize,
}

/// A reference back to the originating source for a piece of retrieved
/// context, in the order it was presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub source_url: String,
    pub section_title: String,
    pub start_char: usize,
    pub end_char: usize,
    pub distance: f32,
}

/// One completed user/assistant exchange, held by
/// [`ConversationMemory`](crate::memory::ConversationMemory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Discrete confidence category derived from retrieval distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::None => "none",
        };
        f.write_str(s)
    }
}

/// Structured response from [`Engine::answer_query`](crate::engine::Engine::answer_query).
///
/// A blocked query carries `blocked: true` with a reason and an empty
/// `response` — producing the user-facing refusal text is the caller's job.
/// `grounded` is false when no retrieved context backed the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<Citation>,
    pub confidence: Confidence,
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub grounded: bool,
}

impl Answer {
    /// The terminal outcome for a guardrail-blocked query.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            response: String::new(),
            sources: Vec::new(),
            confidence: Confidence::None,
            blocked: true,
            block_reason: Some(reason.into()),
            grounded: false,
        }
    }
}
