//! Error taxonomy for the retrieval pipeline.
//!
//! Configuration problems are reported through `anyhow` at startup (see
//! [`config::load_config`](crate::config::load_config)); the typed errors
//! here cover the corpus build and the per-query path. Guardrail blocking
//! and empty retrieval are *not* errors — they are normal outcomes carried
//! on [`Answer`](crate::models::Answer) and
//! [`AssembledContext`](crate::context::AssembledContext).

use thiserror::Error;

/// Errors raised while loading or indexing the corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A record failed validation (bad offsets, missing URL).
    #[error("invalid corpus record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// No documents, or every document yielded zero chunks. Surfaced as an
    /// explicit "nothing to index" state rather than an empty success.
    #[error("corpus produced nothing to index: {0}")]
    Empty(String),
}

/// Per-query errors, caught at the query boundary and rendered by the
/// caller. `Provider` is recoverable ("we couldn't get an answer right
/// now"), distinct from a guardrail block ("we won't answer this").
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query embedding failed: {0}")]
    Embedding(String),

    /// The language-model call failed or timed out after bounded retries.
    #[error("language model unavailable: {0}")]
    Provider(String),

    /// The loaded index does not match the configured embedding model.
    #[error("index was built with embedding model '{index_model}' but '{query_model}' is configured")]
    ModelMismatch {
        index_model: String,
        query_model: String,
    },
}
