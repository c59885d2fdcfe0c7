use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nv_core::{Error, Priority, Result, StorageManager, SummarizedArticle};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::ensure_complete;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        headline TEXT NOT NULL,
        summary TEXT NOT NULL,
        images TEXT NOT NULL,
        priority INTEGER NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS articles_priority_idx ON articles (priority DESC)
    "#,
];

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Persistence(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to run migration {}: {}", i, e)))?;
        }
        debug!("💾 SQLite database ready at {}", db_path.display());

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    // fixed width so that text ordering matches time ordering
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn article_from_row(row: &SqliteRow) -> Result<SummarizedArticle> {
    let read = |e: sqlx::Error| Error::Persistence(format!("Failed to read article row: {}", e));

    let images: String = row.try_get("images").map_err(read)?;
    let created_at: String = row.try_get("created_at").map_err(read)?;

    Ok(SummarizedArticle {
        url: row.try_get("url").map_err(read)?,
        headline: row.try_get("headline").map_err(read)?,
        summary: row.try_get("summary").map_err(read)?,
        images: serde_json::from_str(&images)?,
        priority: Priority(row.try_get("priority").map_err(read)?),
        position: usize::try_from(row.try_get::<i64, _>("position").map_err(read)?)
            .unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Persistence(format!("Failed to parse date: {}", e)))?
            .with_timezone(&Utc),
    })
}

#[async_trait]
impl StorageManager for SQLiteStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT url FROM articles")
            .fetch_all(&*self.pool)
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
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                headline = excluded.headline,
                summary = excluded.summary,
                images = excluded.images,
                priority = excluded.priority,
                position = excluded.position,
                created_at = excluded.created_at
            "#,
        )
        .bind(&article.url)
        .bind(&article.headline)
        .bind(&article.summary)
        .bind(images)
        .bind(article.priority.value())
        .bind(i64::try_from(article.position).unwrap_or(i64::MAX))
        .bind(timestamp(&article.created_at))
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to store article: {}", e)))?;

        Ok(())
    }

    async fn update_priority(&self, url: &str, priority: Priority) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET priority = ? WHERE url = ?")
            .bind(priority.value())
            .bind(url)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to update priority: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Error::Persistence(format!("no stored article for {}", url)));
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<SummarizedArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to get article: {}", e)))?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<SummarizedArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            ORDER BY priority DESC, created_at DESC, position ASC, url ASC
            LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to rank articles: {}", e)))?;

        rows.iter().map(article_from_row).collect()
    }
}
