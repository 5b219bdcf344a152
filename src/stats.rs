//! Index statistics and health overview.
//!
//! Provides a quick summary of what's indexed: chunk counts, embedding
//! model, corpus fingerprint, and build time. Used by `ask stats` to give
//! confidence that a build completed and is current.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::index;
use crate::migrate;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let total_vectors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
        .fetch_one(&pool)
        .await?;

    let distinct_sources: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT source_url) FROM chunks")
            .fetch_one(&pool)
            .await?;

    let meta = index::load_meta(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("askdocs — Index Stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Sources:     {}", distinct_sources);
    println!("  Chunks:      {}", total_chunks);
    println!("  Vectors:     {}", total_vectors);
    println!();

    match meta {
        Some(meta) => {
            let built = chrono::DateTime::from_timestamp(meta.built_at, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| meta.built_at.to_string());
            println!("  Model:       {} ({} dims)", meta.model, meta.dims);
            println!("  Fingerprint: {}", &meta.fingerprint[..16.min(meta.fingerprint.len())]);
            println!("  Built:       {}", built);
        }
        None => {
            println!("  No index built yet. Run `ask build` first.");
        }
    }

    // Largest sections by chunk count
    let rows = sqlx::query(
        r#"
        SELECT section_title, COUNT(*) AS chunk_count
        FROM chunks
        GROUP BY section_title
        ORDER BY chunk_count DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !rows.is_empty() {
        println!();
        println!("  Top sections by chunks:");
        for row in rows {
            let title: String = row.get("section_title");
            let count: i64 = row.get("chunk_count");
            println!("    {:<40} {}", title, count);
        }
    }

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
