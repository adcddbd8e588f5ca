use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.store).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Applies the schema to an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Records table: composite key mirrors the store's (id, published_date)
    // addressing; optional list fields are stored as JSON text.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT NOT NULL,
            published_date TEXT NOT NULL,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL,
            embeddings_generated INTEGER NOT NULL DEFAULT 0,
            content_hash TEXT,
            keywords TEXT,
            categories TEXT,
            summary TEXT,
            PRIMARY KEY (id, published_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Secondary lookup index for dedup-by-hash
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_content_hash ON records(content_hash)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_embeddings_generated ON records(embeddings_generated)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
