use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ranking attached to a stored article. Higher values are more prominent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i64);

impl Priority {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A link discovered on a homepage. Only lives for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub url: String,
    /// 0-based position in the homepage listing, in order of first appearance.
    pub position: usize,
    /// Optional site-specific boost, e.g. for links in a "latest news" block.
    #[serde(default)]
    pub site_weight: i64,
}

impl ArticleCandidate {
    pub fn new(url: impl Into<String>, position: usize) -> Self {
        Self {
            url: url.into(),
            position,
            site_weight: 0,
        }
    }

    pub fn with_site_weight(mut self, weight: i64) -> Self {
        self.site_weight = weight;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub url: String,
    pub text: String,
    pub images: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Headline and summary produced by a [`crate::Summarizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDigest {
    pub headline: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedArticle {
    pub url: String,
    pub headline: String,
    pub summary: String,
    pub images: Vec<String>,
    pub priority: Priority,
    /// Listing position when the article was stored, used to break ranking ties.
    #[serde(default)]
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

impl SummarizedArticle {
    pub fn compose(
        raw: RawArticle,
        digest: ArticleDigest,
        priority: Priority,
        position: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: raw.url,
            headline: digest.headline,
            summary: digest.summary,
            images: raw.images,
            priority,
            position,
            created_at,
        }
    }

    pub fn rank_key(&self) -> RankKey {
        RankKey {
            priority: self.priority,
            created_at: self.created_at,
            position: self.position,
            url: self.url.clone(),
        }
    }

    /// Headline and summary must both carry text before a record may be stored.
    pub fn is_complete(&self) -> bool {
        !self.headline.trim().is_empty() && !self.summary.trim().is_empty()
    }
}

/// Total order over ranked articles: priority desc, newer first,
/// then listing position, then URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankKey {
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub position: usize,
    pub url: String,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.url.cmp(&other.url))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
