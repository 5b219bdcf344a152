//! In-memory vector index with SQLite persistence.
//!
//! The [`VectorIndex`] owns `(vector, chunk)` pairs and serves k-nearest
//! search by cosine distance, brute-force over all entries. It is built
//! once per corpus version, persisted to SQLite (see [`save_index`] /
//! [`load_index`]), and read-only afterwards: query paths share it behind
//! an `Arc` with no further locking.
//!
//! Duplicate protection: two insertions with the same
//! `(source_url, start_char, end_char)` identity would skew retrieval
//! toward redundant content, so exact duplicates are silently dropped and
//! counted in the [`InsertReport`].
//!
//! Tie-breaking: results at equal distance keep insertion order. Entry
//! positions are persisted so ordering is stable across restarts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::embedding::{self, EmbeddingProvider};
use crate::models::{Chunk, SearchResult};

/// Identity under which duplicate chunks are detected.
type ChunkKey = (String, usize, usize);

/// One stored entry: a chunk and its embedding vector.
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Counts from a batch insertion.
#[derive(Debug, Clone, Default)]
pub struct InsertReport {
    pub inserted: usize,
    pub duplicates_dropped: usize,
}

/// Metadata describing a persisted index.
#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub fingerprint: String,
    pub model: String,
    pub dims: usize,
    pub built_at: i64,
}

pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    seen: HashSet<ChunkKey>,
    model: String,
    dims: usize,
    searches: AtomicUsize,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            entries: Vec::new(),
            seen: HashSet::new(),
            model: model.into(),
            dims,
            searches: AtomicUsize::new(0),
        }
    }

    /// The embedding model this index was built with. Queries must be
    /// embedded with the same model.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of searches served by this instance. Instrumentation for
    /// stats output and the guardrail short-circuit guarantee.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::Relaxed)
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    /// Embed and store a batch of chunks.
    ///
    /// Duplicates (by `(source_url, start_char, end_char)`) are dropped
    /// before embedding, which also makes repeated insertion idempotent.
    pub async fn insert(
        &mut self,
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<InsertReport> {
        let mut report = InsertReport::default();
        let mut fresh = Vec::new();

        for chunk in chunks {
            let key = (
                chunk.source_url.clone(),
                chunk.start_char,
                chunk.end_char,
            );
            if self.seen.contains(&key) {
                tracing::debug!(
                    source_url = %chunk.source_url,
                    start_char = chunk.start_char,
                    end_char = chunk.end_char,
                    "dropping duplicate chunk"
                );
                report.duplicates_dropped += 1;
                continue;
            }
            self.seen.insert(key);
            fresh.push(chunk);
        }

        let batch_size = batch_size.max(1);
        for batch in fresh.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = provider.embed_batch(&texts).await?;
            for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
                self.entries.push(IndexedChunk {
                    chunk: chunk.clone(),
                    vector,
                });
                report.inserted += 1;
            }
        }

        Ok(report)
    }

    /// Restore one entry from persistence, bypassing embedding.
    fn push_restored(&mut self, chunk: Chunk, vector: Vec<f32>) {
        self.seen.insert((
            chunk.source_url.clone(),
            chunk.start_char,
            chunk.end_char,
        ));
        self.entries.push(IndexedChunk { chunk, vector });
    }

    /// Return the `k` nearest chunks by cosine distance, ascending, ties
    /// broken by insertion order. An empty index returns an empty vector.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<SearchResult> {
        self.searches.fetch_add(1, Ordering::Relaxed);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, embedding::cosine_distance(query_vector, &entry.vector)))
            .collect();

        // stable sort keeps insertion order for equal distances
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, distance))| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                distance,
                rank,
            })
            .collect()
    }
}

// ============ Persistence ============

/// Replace the persisted index with `index`, transactionally.
pub async fn save_index(pool: &SqlitePool, index: &VectorIndex, fingerprint: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunk_vectors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM index_meta").execute(&mut *tx).await?;

    for (position, entry) in index.entries().iter().enumerate() {
        let c = &entry.chunk;
        sqlx::query(
            r#"
            INSERT INTO chunks (id, position, source_url, section_title, content, start_char, end_char, token_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&c.id)
        .bind(position as i64)
        .bind(&c.source_url)
        .bind(&c.section_title)
        .bind(&c.content)
        .bind(c.start_char as i64)
        .bind(c.end_char as i64)
        .bind(c.token_count as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
            .bind(&c.id)
            .bind(embedding::vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await?;
    }

    let built_at = chrono::Utc::now().timestamp();
    for (key, value) in [
        ("fingerprint", fingerprint.to_string()),
        ("model", index.model_name().to_string()),
        ("dims", index.dims().to_string()),
        ("built_at", built_at.to_string()),
    ] {
        sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Read the persisted index metadata, if an index has been built.
pub async fn load_meta(pool: &SqlitePool) -> Result<Option<IndexMeta>> {
    let rows = sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut fingerprint = None;
    let mut model = None;
    let mut dims = None;
    let mut built_at = None;

    for row in rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            "fingerprint" => fingerprint = Some(value),
            "model" => model = Some(value),
            "dims" => dims = value.parse::<usize>().ok(),
            "built_at" => built_at = value.parse::<i64>().ok(),
            _ => {}
        }
    }

    match (fingerprint, model, dims, built_at) {
        (Some(fingerprint), Some(model), Some(dims), Some(built_at)) => Ok(Some(IndexMeta {
            fingerprint,
            model,
            dims,
            built_at,
        })),
        _ => Ok(None),
    }
}

/// Load the full index into memory, preserving insertion order.
pub async fn load_index(pool: &SqlitePool, meta: &IndexMeta) -> Result<VectorIndex> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.source_url, c.section_title, c.content,
               c.start_char, c.end_char, c.token_count, cv.embedding
        FROM chunks c
        JOIN chunk_vectors cv ON cv.chunk_id = c.id
        ORDER BY c.position ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut index = VectorIndex::new(meta.model.clone(), meta.dims);
    for row in rows {
        let start_char: i64 = row.get("start_char");
        let end_char: i64 = row.get("end_char");
        let token_count: i64 = row.get("token_count");
        let blob: Vec<u8> = row.get("embedding");

        index.push_restored(
            Chunk {
                id: row.get("id"),
                source_url: row.get("source_url"),
                section_title: row.get("section_title"),
                content: row.get("content"),
                start_char: start_char as usize,
                end_char: end_char as usize,
                token_count: token_count as usize,
            },
            embedding::blob_to_vec(&blob),
        );
    }

    Ok(index)
}
