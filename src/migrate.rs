use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index storage schema. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Chunk metadata and content. `position` preserves insertion order so
    // distance ties stay stable across restarts.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            source_url TEXT NOT NULL,
            section_title TEXT NOT NULL,
            content TEXT NOT NULL,
            start_char INTEGER NOT NULL,
            end_char INTEGER NOT NULL,
            token_count INTEGER NOT NULL,
            UNIQUE(source_url, start_char, end_char)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Embedding vectors, little-endian f32 BLOBs
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL,
            FOREIGN KEY (chunk_id) REFERENCES chunks(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Build metadata: corpus fingerprint, model, dims, built_at
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_position ON chunks(position)")
        .execute(pool)
        .await?;

    Ok(())
}
