use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nv_core::{Error, Priority, Result, StorageManager, SummarizedArticle};
use tokio::sync::RwLock;

use crate::{ensure_complete, rank_cmp};

#[derive(Default)]
pub struct MemoryStore {
    articles: HashMap<String, SummarizedArticle>,
}

impl MemoryStore {
    pub fn upsert(&mut self, article: &SummarizedArticle) {
        self.articles.insert(article.url.clone(), article.clone());
    }

    pub fn set_priority(&mut self, url: &str, priority: Priority) -> Result<()> {
        let article = self
            .articles
            .get_mut(url)
            .ok_or_else(|| Error::Persistence(format!("no stored article for {}", url)))?;
        article.priority = priority;
        Ok(())
    }

    pub fn ranked(&self, limit: usize) -> Vec<SummarizedArticle> {
        let mut articles: Vec<_> = self.articles.values().cloned().collect();
        articles.sort_by(rank_cmp);
        articles.truncate(limit);
        articles
    }
}

/// Process-local storage, useful for dry runs and tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageManager for MemoryStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        let store = self.store.read().await;
        Ok(store.articles.keys().cloned().collect())
    }

    async fn save(&self, article: &SummarizedArticle) -> Result<()> {
        ensure_complete(article)?;
        let mut store = self.store.write().await;
        store.upsert(article);
        Ok(())
    }

    async fn update_priority(&self, url: &str, priority: Priority) -> Result<()> {
        let mut store = self.store.write().await;
        store.set_priority(url, priority)
    }

    async fn get(&self, url: &str) -> Result<Option<SummarizedArticle>> {
        let store = self.store.read().await;
        Ok(store.articles.get(url).cloned())
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<SummarizedArticle>> {
        let store = self.store.read().await;
        Ok(store.ranked(limit))
    }
}
