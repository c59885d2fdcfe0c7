use async_trait::async_trait;

use crate::types::ArticleDigest;
use crate::Result;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short name used in logs and `nv list`
    fn name(&self) -> &str;

    /// Produce a headline and summary for the given article text.
    ///
    /// Fails with [`crate::Error::Summarization`] on empty or too-short input,
    /// when the backing model is unavailable, or when its output does not
    /// look like a headline followed by a summary.
    async fn summarize(&self, text: &str) -> Result<ArticleDigest>;
}
