//! SQLite-backed [`RecordStore`] implementation.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{NewsDraft, NewsRecord};

use super::RecordStore;

pub struct SqliteRecordStore {
    pool: SqlitePool,
    page_size: i64,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, page_size: i64) -> Self {
        Self { pool, page_size }
    }
}

fn json_opt(list: &Option<Vec<String>>) -> Result<Option<String>> {
    Ok(match list {
        Some(v) => Some(serde_json::to_string(v)?),
        None => None,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<NewsRecord> {
    let keywords: Option<String> = row.try_get("keywords")?;
    let categories: Option<String> = row.try_get("categories")?;

    Ok(NewsRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        content: row.try_get("content")?,
        published_date: row.try_get("published_date")?,
        source: row.try_get("source")?,
        embeddings_generated: row.try_get::<i64, _>("embeddings_generated")? != 0,
        content_hash: row.try_get("content_hash")?,
        keywords: keywords.map(|s| serde_json::from_str(&s)).transpose()?,
        categories: categories.map(|s| serde_json::from_str(&s)).transpose()?,
        summary: row.try_get("summary")?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save(&self, draft: &NewsDraft) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO records (id, published_date, title, url, content, source,
                                 embeddings_generated, content_hash, keywords, categories, summary)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.published_date)
        .bind(&draft.title)
        .bind(&draft.url)
        .bind(&draft.content)
        .bind(&draft.source)
        .bind(&draft.content_hash)
        .bind(json_opt(&draft.keywords)?)
        .bind(json_opt(&draft.categories)?)
        .bind(&draft.summary)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<NewsRecord>> {
        // Keyset pagination over the composite key: keep fetching pages
        // until a short page signals exhaustion.
        let mut records = Vec::new();
        let mut cursor: Option<(String, String)> = None;

        loop {
            let rows = match &cursor {
                None => {
                    sqlx::query(
                        "SELECT * FROM records ORDER BY id, published_date LIMIT ?",
                    )
                    .bind(self.page_size)
                    .fetch_all(&self.pool)
                    .await?
                }
                Some((last_id, last_date)) => {
                    sqlx::query(
                        r#"
                        SELECT * FROM records
                        WHERE (id, published_date) > (?, ?)
                        ORDER BY id, published_date
                        LIMIT ?
                        "#,
                    )
                    .bind(last_id)
                    .bind(last_date)
                    .bind(self.page_size)
                    .fetch_all(&self.pool)
                    .await?
                }
            };

            let page_len = rows.len();
            for row in &rows {
                records.push(record_from_row(row)?);
            }

            if page_len < self.page_size as usize {
                break;
            }
            let last = records.last().expect("non-empty page");
            cursor = Some((last.id.clone(), last.published_date.clone()));
        }

        Ok(records)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<NewsRecord>> {
        let row = sqlx::query("SELECT * FROM records WHERE content_hash = ? LIMIT 1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn mark_embedded(&self, id: &str, published_date: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE records SET embeddings_generated = 1 WHERE id = ? AND published_date = ?",
        )
        .bind(id)
        .bind(published_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("no record with id {} and published_date {}", id, published_date);
        }
        Ok(())
    }
}
