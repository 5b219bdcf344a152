//! Index build orchestration.
//!
//! Coordinates the full build flow: corpus file → chunking → embedding →
//! in-memory index → SQLite persistence. Building is the single most
//! expensive operation in the system and runs at most once per corpus
//! version: the persisted index carries a fingerprint of the corpus,
//! chunking configuration, and embedding model, and a build is skipped when
//! the stored fingerprint matches.
//!
//! [`IndexManager`] wraps the same logic for embedded use: concurrent
//! `ensure_built` calls serialize on an async mutex, so a second caller
//! either waits for the in-flight build or observes it already completed —
//! the storage is never written by two builders at once.

use std::sync::Arc;

use anyhow::Result;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::chunk;
use crate::config::{ChunkingConfig, Config};
use crate::corpus;
use crate::db;
use crate::embedding;
use crate::error::CorpusError;
use crate::index::{self, VectorIndex};
use crate::migrate;
use crate::models::Document;

/// Outcome of [`build_or_load`].
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub documents: usize,
    pub skipped_documents: usize,
    pub chunks_indexed: usize,
    pub duplicates_dropped: usize,
    /// False when the stored fingerprint matched and the persisted index
    /// was reused.
    pub rebuilt: bool,
    pub fingerprint: String,
}

/// Fingerprint identifying a corpus version under a given chunking config
/// and embedding model. Any change forces a rebuild; nothing else does.
pub fn corpus_fingerprint(
    documents: &[Document],
    chunking: &ChunkingConfig,
    model_name: &str,
) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update(doc.source_url.as_bytes());
        hasher.update(doc.start_char.to_le_bytes());
        hasher.update(doc.end_char.to_le_bytes());
        hasher.update(doc.content.as_bytes());
    }
    hasher.update(chunking.chunk_size_tokens.to_le_bytes());
    hasher.update(chunking.overlap_tokens.to_le_bytes());
    hasher.update(model_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Load the persisted index if its fingerprint is current, otherwise build,
/// persist, and return a fresh one.
pub async fn build_or_load(config: &Config, force: bool) -> Result<(VectorIndex, BuildReport)> {
    let provider = embedding::create_provider(&config.embedding)?;
    let documents = corpus::load_documents(&config.corpus.path)?;
    let fingerprint = corpus_fingerprint(&documents, &config.chunking, provider.model_name());

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    if !force {
        if let Some(meta) = index::load_meta(&pool).await? {
            if meta.fingerprint == fingerprint && meta.model == provider.model_name() {
                let loaded = index::load_index(&pool, &meta).await?;
                tracing::info!(chunks = loaded.len(), "reusing persisted index");
                let report = BuildReport {
                    documents: documents.len(),
                    skipped_documents: 0,
                    chunks_indexed: loaded.len(),
                    duplicates_dropped: 0,
                    rebuilt: false,
                    fingerprint,
                };
                pool.close().await;
                return Ok((loaded, report));
            }
        }
    }

    let mut chunks = Vec::new();
    let mut skipped = 0usize;
    for doc in &documents {
        let doc_chunks = chunk::split_document(doc, &config.chunking);
        if doc_chunks.is_empty() {
            tracing::warn!(
                source_url = %doc.source_url,
                section = %doc.section_title,
                "skipping document below minimum viable chunk size"
            );
            skipped += 1;
            continue;
        }
        chunks.extend(doc_chunks);
    }

    if chunks.is_empty() {
        pool.close().await;
        return Err(CorpusError::Empty(format!(
            "all {} documents yielded zero chunks",
            documents.len()
        ))
        .into());
    }

    let mut built = VectorIndex::new(provider.model_name(), provider.dims());
    let insert_report = built
        .insert(chunks, provider.as_ref(), config.embedding.batch_size)
        .await?;

    index::save_index(&pool, &built, &fingerprint).await?;
    pool.close().await;

    tracing::info!(
        chunks = insert_report.inserted,
        duplicates = insert_report.duplicates_dropped,
        "index built and persisted"
    );

    Ok((
        built,
        BuildReport {
            documents: documents.len(),
            skipped_documents: skipped,
            chunks_indexed: insert_report.inserted,
            duplicates_dropped: insert_report.duplicates_dropped,
            rebuilt: true,
            fingerprint,
        },
    ))
}

/// CLI entry point for `ask build`.
pub async fn run_build(config: &Config, full: bool) -> Result<()> {
    let (index, report) = build_or_load(config, full).await?;

    println!("build corpus");
    println!("  documents: {}", report.documents);
    if report.rebuilt {
        println!("  skipped (too short): {}", report.skipped_documents);
        println!("  chunks indexed: {}", report.chunks_indexed);
        println!("  duplicates dropped: {}", report.duplicates_dropped);
    } else {
        println!("  index up to date ({} chunks), nothing to do", index.len());
    }
    println!("  fingerprint: {}", &report.fingerprint[..16.min(report.fingerprint.len())]);
    println!("ok");

    Ok(())
}

/// Serialized, cached access to the built index for embedded callers.
///
/// Lifecycle: `init → (build once) → many reads`. The index is owned here
/// and shared out as `Arc<VectorIndex>`; there is no global mutable state.
pub struct IndexManager {
    config: Config,
    build_lock: Mutex<Option<Arc<VectorIndex>>>,
}

impl IndexManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            build_lock: Mutex::new(None),
        }
    }

    /// Return the shared index, building (or loading) it on first use.
    ///
    /// Concurrent callers serialize on the internal mutex: exactly one
    /// performs the build; the rest wait and receive the same `Arc`.
    pub async fn ensure_built(&self) -> Result<Arc<VectorIndex>> {
        let mut guard = self.build_lock.lock().await;
        if let Some(ref built) = *guard {
            return Ok(Arc::clone(built));
        }

        let (built, _report) = build_or_load(&self.config, false).await?;
        let shared = Arc::new(built);
        *guard = Some(Arc::clone(&shared));
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, content: &str) -> Document {
        Document {
            source_url: url.to_string(),
            section_title: "Section".to_string(),
            content: content.to_string(),
            start_char: 0,
            end_char: content.len(),
        }
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let cfg = ChunkingConfig::default();
        let a = corpus_fingerprint(&[doc("https://a", "one")], &cfg, "m");
        let b = corpus_fingerprint(&[doc("https://a", "two")], &cfg, "m");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_chunking_config() {
        let docs = [doc("https://a", "content")];
        let a = corpus_fingerprint(
            &docs,
            &ChunkingConfig {
                chunk_size_tokens: 300,
                overlap_tokens: 50,
            },
            "m",
        );
        let b = corpus_fingerprint(
            &docs,
            &ChunkingConfig {
                chunk_size_tokens: 200,
                overlap_tokens: 50,
            },
            "m",
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_model() {
        let cfg = ChunkingConfig::default();
        let docs = [doc("https://a", "content")];
        let a = corpus_fingerprint(&docs, &cfg, "hashed-tf-384");
        let b = corpus_fingerprint(&docs, &cfg, "text-embedding-3-small");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let cfg = ChunkingConfig::default();
        let docs = [doc("https://a", "stable content")];
        assert_eq!(
            corpus_fingerprint(&docs, &cfg, "m"),
            corpus_fingerprint(&docs, &cfg, "m")
        );
    }

    fn manager_config(root: &std::path::Path) -> Config {
        let toml_str = format!(
            r#"
[corpus]
path = "{root}/corpus.json"

[db]
path = "{root}/ask.sqlite"

[embedding]
provider = "local"
"#,
            root = root.display()
        );
        toml::from_str(&toml_str).unwrap()
    }

    #[tokio::test]
    async fn test_index_manager_serializes_concurrent_builds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let long = "GitLab values transparency. ".repeat(10);
        let corpus = serde_json::json!([{
            "source_url": "https://docs.example.com/values",
            "section_title": "Values",
            "content": long,
            "start_char": 0,
            "end_char": long.len(),
        }]);
        std::fs::write(
            tmp.path().join("corpus.json"),
            serde_json::to_string(&corpus).unwrap(),
        )
        .unwrap();

        let manager = IndexManager::new(manager_config(tmp.path()));

        // both callers race ensure_built; exactly one build runs and both
        // observe the same shared index
        let (a, b) = tokio::join!(manager.ensure_built(), manager.ensure_built());
        let a = a.unwrap();
        let b = b.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_empty());

        // a later call reuses the cached Arc
        let c = manager.ensure_built().await.unwrap();
        assert!(Arc::ptr_eq(&a, &c));
    }
}
