use std::cmp::Ordering;
use std::sync::Arc;

use nv_core::{Error, Result, StorageManager, SummarizedArticle};
use serde::Deserialize;

pub mod backends;

pub use backends::*;

/// Engines this build knows how to create.
pub const ENGINES: &[&str] = &["memory", "sqlite", "postgres"];

const DEFAULT_SQLITE_PATH: &str = "articles.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// One of [`ENGINES`]
    pub engine: String,
    /// Connection string. For SQLite a bare file path is accepted too.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            database_url: None,
            max_connections: 5,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if !ENGINES.contains(&self.engine.as_str()) {
            return Err(Error::Configuration(format!(
                "unknown storage engine '{}', expected one of: {}",
                self.engine,
                ENGINES.join(", ")
            )));
        }
        if self.engine == "postgres" && self.database_url.is_none() {
            return Err(Error::Configuration(
                "postgres storage requires a database URL".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(Error::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> &str {
        self.database_url
            .as_deref()
            .map(|url| url.trim_start_matches("sqlite://").trim_start_matches("sqlite:"))
            .unwrap_or(DEFAULT_SQLITE_PATH)
    }
}

/// Build the storage engine named in the configuration.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StorageManager>> {
    config.validate()?;

    match config.engine.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = std::path::PathBuf::from(config.sqlite_path());
            Ok(Arc::new(
                SQLiteStorage::new_with_path(&path, config.max_connections).await?,
            ))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.database_url.as_deref().unwrap_or_default();
            Ok(Arc::new(
                PostgresStorage::connect(url, config.max_connections).await?,
            ))
        }
        other => Err(Error::Configuration(format!(
            "storage engine '{}' is not compiled into this build",
            other
        ))),
    }
}

/// Ordering used by `ranked`, see [`nv_core::RankKey`].
pub fn rank_cmp(a: &SummarizedArticle, b: &SummarizedArticle) -> Ordering {
    a.rank_key().cmp(&b.rank_key())
}

pub(crate) fn ensure_complete(article: &SummarizedArticle) -> Result<()> {
    if article.is_complete() {
        Ok(())
    } else {
        Err(Error::Persistence(format!(
            "refusing to store {} without headline and summary",
            article.url
        )))
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageConfig};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use nv_core::Priority;

    fn article(url: &str, priority: i64, age_minutes: i64) -> SummarizedArticle {
        SummarizedArticle {
            url: url.to_string(),
            headline: "Headline".to_string(),
            summary: "Summary.".to_string(),
            images: vec![],
            priority: Priority(priority),
            position: 0,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_validate() {
        assert!(StorageConfig::default().validate().is_ok());

        let config = StorageConfig {
            engine: "mssql".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = StorageConfig {
            engine: "postgres".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_sqlite_path() {
        assert_eq!(StorageConfig::default().sqlite_path(), "articles.db");
        let config = StorageConfig {
            database_url: Some("sqlite://data/news.db".to_string()),
            ..Default::default()
        };
        assert_eq!(config.sqlite_path(), "data/news.db");
    }

    #[test]
    fn test_rank_cmp() {
        let mut articles = vec![
            article("https://b.example", 10, 5),
            article("https://a.example", 10, 5),
            article("https://c.example", 20, 60),
            article("https://d.example", 10, 1),
        ];
        // same created_at and position for a and b so the url decides
        articles[1].created_at = articles[0].created_at;
        articles.sort_by(rank_cmp);
        let urls: Vec<_> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://c.example",
                "https://d.example",
                "https://a.example",
                "https://b.example"
            ]
        );
    }

    #[test]
    fn test_rank_cmp_prefers_listing_position_over_url() {
        let mut first = article("https://example.com/z-first-listed", 10_000, 5);
        let mut second = article("https://example.com/a-second-listed", 10_000, 5);
        second.created_at = first.created_at;
        first.position = 0;
        second.position = 1;

        let mut articles = vec![second, first];
        articles.sort_by(rank_cmp);
        assert_eq!(articles[0].url, "https://example.com/z-first-listed");
        assert_eq!(articles[1].url, "https://example.com/a-second-listed");
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let config = StorageConfig {
            engine: "memory".to_string(),
            ..Default::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert!(storage.known_urls().await.unwrap().is_empty());
    }
}
