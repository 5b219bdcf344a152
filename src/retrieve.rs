//! Query-time retrieval.
//!
//! The [`Retriever`] embeds a query with the same provider used at index
//! time and delegates to [`VectorIndex::search`]. Construction fails if the
//! provider's model does not match the index's recorded model: distances
//! across embedding spaces are meaningless, and that mismatch must never
//! reach a query.

use std::sync::Arc;

use crate::config::{MAX_K, MIN_K};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::QueryError;
use crate::index::VectorIndex;
use crate::models::SearchResult;

pub struct Retriever {
    index: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    default_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("default_k", &self.default_k)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    pub fn new(
        index: Arc<VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        default_k: usize,
    ) -> Result<Self, QueryError> {
        if index.model_name() != provider.model_name() {
            return Err(QueryError::ModelMismatch {
                index_model: index.model_name().to_string(),
                query_model: provider.model_name().to_string(),
            });
        }
        Ok(Self {
            index,
            provider,
            default_k,
        })
    }

    /// Retrieve the `k` nearest chunks for a query.
    ///
    /// `k` defaults to the configured value and is clamped to
    /// [`MIN_K`]..=[`MAX_K`]; asking for more results than exist returns
    /// however many exist.
    pub async fn retrieve(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let k = k.unwrap_or(self.default_k).clamp(MIN_K, MAX_K);

        let query_vector = embedding::embed_query(self.provider.as_ref(), query)
            .await
            .map_err(|e| QueryError::Embedding(e.to_string()))?;

        Ok(self.index.search(&query_vector, k))
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}
