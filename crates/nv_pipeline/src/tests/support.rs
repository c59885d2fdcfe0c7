use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nv_core::{
    ArticleCandidate, ArticleDigest, Error, Priority, RawArticle, Result, Scraper,
    StorageManager, SummarizedArticle, Summarizer,
};
use nv_storage::MemoryStorage;

use crate::{ContentPipeline, PipelineConfig};

pub const HOMEPAGE: &str = "https://news.example.com/";

pub fn url(slug: &str) -> String {
    format!("https://news.example.com/{}", slug)
}

pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Scraper serving a fixed listing and per-URL pages.
#[derive(Default)]
pub struct MockScraper {
    pub listing: Vec<ArticleCandidate>,
    pub fail_listing: bool,
    pub listing_delay: Option<Duration>,
    pub fail_fetch: HashSet<String>,
    pub fetch_delay: HashMap<String, Duration>,
    pub published_at: HashMap<String, DateTime<Utc>>,
    pub list_calls: AtomicUsize,
    pub fetched: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockScraper {
    pub fn with_slugs(slugs: &[&str]) -> Self {
        Self {
            listing: slugs
                .iter()
                .enumerate()
                .map(|(position, slug)| ArticleCandidate::new(url(slug), position))
                .collect(),
            ..Default::default()
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    fn source(&self) -> &str {
        "mock"
    }

    fn homepage(&self) -> &str {
        HOMEPAGE
    }

    async fn list_urls(&self, homepage: &str) -> Result<Vec<ArticleCandidate>> {
        assert_eq!(homepage, HOMEPAGE);
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing {
            return Err(Error::Fetch("homepage unreachable".to_string()));
        }
        Ok(self.listing.clone())
    }

    async fn fetch(&self, url: &str) -> Result<RawArticle> {
        self.fetched.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .fetch_delay
            .get(url)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_fetch.contains(url) {
            return Err(Error::Fetch(format!("{} returned 404", url)));
        }
        Ok(RawArticle {
            url: url.to_string(),
            text: format!("Body of {}. It has a second sentence.", url),
            images: vec![format!("{}/cover.jpg", url)],
            published_at: self.published_at.get(url).copied(),
        })
    }
}

/// Summarizer deriving the digest from the article text.
#[derive(Default)]
pub struct MockSummarizer {
    pub fail_for: HashSet<String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn summarize(&self, text: &str) -> Result<ArticleDigest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_for.iter().any(|u| text.contains(u.as_str())) {
            return Err(Error::Summarization("rate limited by mock".to_string()));
        }
        Ok(ArticleDigest {
            headline: format!("Headline for {}", text.len()),
            summary: text.to_string(),
        })
    }
}

/// Memory storage that counts calls and can refuse selected writes.
#[derive(Default)]
pub struct CountingStorage {
    pub inner: MemoryStorage,
    pub fail_known_urls: bool,
    pub fail_save: HashSet<String>,
    pub known_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub priority_updates: AtomicUsize,
}

impl CountingStorage {
    pub async fn seed(&self, slug: &str, priority: i64) -> SummarizedArticle {
        let article = SummarizedArticle {
            url: url(slug),
            headline: format!("Stored {}", slug),
            summary: "Already processed.".to_string(),
            images: Vec::new(),
            priority: Priority(priority),
            position: 0,
            created_at: run_start(),
        };
        self.inner.save(&article).await.unwrap();
        article
    }
}

#[async_trait]
impl StorageManager for CountingStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        self.known_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_known_urls {
            return Err(Error::Persistence("database is locked".to_string()));
        }
        self.inner.known_urls().await
    }

    async fn save(&self, article: &SummarizedArticle) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.contains(&article.url) {
            return Err(Error::Persistence("UNIQUE constraint failed".to_string()));
        }
        self.inner.save(article).await
    }

    async fn update_priority(&self, url: &str, priority: Priority) -> Result<()> {
        self.priority_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_priority(url, priority).await
    }

    async fn get(&self, url: &str) -> Result<Option<SummarizedArticle>> {
        self.inner.get(url).await
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<SummarizedArticle>> {
        self.inner.ranked(limit).await
    }
}

pub fn pipeline(
    scraper: &Arc<MockScraper>,
    summarizer: &Arc<MockSummarizer>,
    storage: &Arc<CountingStorage>,
    config: PipelineConfig,
) -> ContentPipeline {
    ContentPipeline::new(scraper.clone(), summarizer.clone(), storage.clone(), config).unwrap()
}
