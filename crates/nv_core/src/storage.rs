use std::collections::HashSet;

use async_trait::async_trait;

use crate::types::{Priority, SummarizedArticle};
use crate::Result;

#[async_trait]
pub trait StorageManager: Send + Sync {
    /// Snapshot of every URL currently stored
    async fn known_urls(&self) -> Result<HashSet<String>>;

    /// Upsert an article keyed by its URL
    async fn save(&self, article: &SummarizedArticle) -> Result<()>;

    /// Change the priority of an already stored article
    async fn update_priority(&self, url: &str, priority: Priority) -> Result<()>;

    /// Fetch a single stored article
    async fn get(&self, url: &str) -> Result<Option<SummarizedArticle>>;

    /// Stored articles, most prominent first
    async fn ranked(&self, limit: usize) -> Result<Vec<SummarizedArticle>>;
}
