use async_trait::async_trait;

use crate::types::{ArticleCandidate, RawArticle};
use crate::Result;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the news source
    fn source(&self) -> &str;

    /// Returns the homepage this scraper was configured for
    fn homepage(&self) -> &str;

    /// Returns the article links found on the homepage, in listing order.
    ///
    /// An empty listing is not an error; failing to reach or parse the
    /// homepage is.
    async fn list_urls(&self, homepage: &str) -> Result<Vec<ArticleCandidate>>;

    /// Retrieves the text and images of a single article
    async fn fetch(&self, url: &str) -> Result<RawArticle>;
}
