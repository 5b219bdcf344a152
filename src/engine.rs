//! The query boundary.
//!
//! [`Engine`] wires the retrieval core together and exposes
//! [`answer_query`](Engine::answer_query): guardrail → retrieval → context
//! assembly → prompt → generation → confidence. The guardrail runs first so
//! a blocked query never constructs an embedding or touches the index; that
//! ordering is a cost and safety control, not an optimization.
//!
//! Guardrail blocks and empty retrieval are normal outcomes carried on the
//! returned [`Answer`]. Provider failures (after the model's own bounded
//! retries) surface as [`QueryError::Provider`], which callers render as a
//! temporary failure distinct from a refusal.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::confidence;
use crate::context::{self, AssembledContext};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::QueryError;
use crate::guardrail::GuardrailFilter;
use crate::index::VectorIndex;
use crate::ingest;
use crate::llm::{self, LanguageModel};
use crate::models::{Answer, ConversationTurn, SearchResult};
use crate::prompt;
use crate::retrieve::Retriever;

pub struct Engine {
    guardrail: GuardrailFilter,
    retriever: Retriever,
    model: Arc<dyn LanguageModel>,
    corpus_name: String,
    max_context_tokens: usize,
    confidence: crate::config::ConfidenceConfig,
}

impl Engine {
    /// Assemble an engine from its parts. Fails on an index/provider
    /// embedding-model mismatch.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        config: &Config,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            guardrail: GuardrailFilter::new(&config.guardrail),
            retriever: Retriever::new(index, embedder, config.retrieval.k)?,
            model,
            corpus_name: config.corpus.name.clone(),
            max_context_tokens: config.retrieval.max_context_tokens,
            confidence: config.confidence.clone(),
        })
    }

    /// Open an engine from configuration: create providers, then load the
    /// persisted index (building it first if the corpus fingerprint
    /// changed).
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);
        let model: Arc<dyn LanguageModel> = Arc::from(llm::create_model(&config.llm)?);
        let (index, _report) = ingest::build_or_load(config, false).await?;
        Ok(Self::new(Arc::new(index), embedder, model, config)?)
    }

    /// Answer a query with retrieved grounding.
    ///
    /// `history` is the caller-owned rolling window of prior turns; the
    /// engine does not record the exchange — append to memory after a
    /// successful return.
    pub async fn answer_query(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<Answer, QueryError> {
        // Guardrail short-circuits before any retrieval cost.
        let verdict = self.guardrail.check(query);
        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_else(|| "query not allowed".to_string());
            tracing::info!(%reason, "query blocked by guardrail");
            return Ok(Answer::blocked(reason));
        }

        let results = self.retriever.retrieve(query, None).await?;
        let assembled = context::assemble(&results, self.max_context_tokens);
        let confidence = confidence::score(&results, &self.confidence);

        let full_prompt = prompt::build_prompt(&self.corpus_name, &assembled.text, history, query);

        let raw = self
            .model
            .generate(&full_prompt)
            .await
            .map_err(|e| QueryError::Provider(e.to_string()))?;

        let AssembledContext {
            citations, grounded, ..
        } = assembled;

        Ok(Answer {
            response: prompt::strip_sources_section(&raw),
            sources: citations,
            confidence,
            blocked: false,
            block_reason: None,
            grounded,
        })
    }

    /// Retrieval-only preview of what a query would be grounded on.
    pub async fn preview(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<SearchResult>, QueryError> {
        self.retriever.retrieve(query, k).await
    }

    /// Lifetime search count of the underlying index.
    pub fn search_count(&self) -> usize {
        self.retriever.index().search_count()
    }
}
