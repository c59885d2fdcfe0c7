use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nv_core::{Error, Priority, Result, StorageManager, SummarizedArticle};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::ensure_complete;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        headline TEXT NOT NULL,
        summary TEXT NOT NULL,
        images TEXT NOT NULL,
        priority BIGINT NOT NULL,
        position BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS articles_priority_idx ON articles (priority DESC)
    "#,
];

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self { pool })
    }
}

fn article_from_row(row: &PgRow) -> Result<SummarizedArticle> {
    let read = |e: sqlx::Error| Error::Persistence(format!("Failed to read article row: {}", e));
    let images: String = row.try_get("images").map_err(read)?;

    Ok(SummarizedArticle {
        url: row.try_get("url").map_err(read)?,
        headline: row.try_get("headline").map_err(read)?,
        summary: row.try_get("summary").map_err(read)?,
        images: serde_json::from_str(&images)?,
        priority: Priority(row.try_get("priority").map_err(read)?),
        position: usize::try_from(row.try_get::<i64, _>("position").map_err(read)?)
            .unwrap_or_default(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(read)?,
    })
}

#[async_trait]
impl StorageManager for PostgresStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT url FROM articles")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to list known urls: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("url")
                    .map_err(|e| Error::Persistence(format!("Failed to read url: {}", e)))
            })
            .collect()
    }

    async fn save(&self, article: &SummarizedArticle) -> Result<()> {
        ensure_complete(article)?;
        let images = serde_json::to_string(&article.images)?;

        sqlx::query(
            r#"
            INSERT INTO articles (url, headline, summary, images, priority, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (url) DO UPDATE SET
                headline = EXCLUDED.headline,
                summary = EXCLUDED.summary,
                images = EXCLUDED.images,
                priority = EXCLUDED.priority,
                position = EXCLUDED.position,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&article.url)
        .bind(&article.headline)
        .bind(&article.summary)
        .bind(images)
        .bind(article.priority.value())
        .bind(i64::try_from(article.position).unwrap_or(i64::MAX))
        .bind(article.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to store article: {}", e)))?;

        Ok(())
    }

    async fn update_priority(&self, url: &str, priority: Priority) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET priority = $1 WHERE url = $2")
            .bind(priority.value())
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to update priority: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Error::Persistence(format!("no stored article for {}", url)));
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<SummarizedArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to get article: {}", e)))?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<SummarizedArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            ORDER BY priority DESC, created_at DESC, position ASC, url ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to rank articles: {}", e)))?;

        rows.iter().map(article_from_row).collect()
    }
}
