pub mod error;
pub mod models;
pub mod scraper;
pub mod storage;
pub mod types;

pub use error::{Error, ErrorKind};
pub use models::Summarizer;
pub use scraper::Scraper;
pub use storage::StorageManager;
pub use types::{
    ArticleCandidate, ArticleDigest, Priority, RankKey, RawArticle, SummarizedArticle,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{
        ArticleCandidate, ArticleDigest, Error, Priority, RankKey, RawArticle, Result, Scraper,
        StorageManager, SummarizedArticle, Summarizer,
    };
}
