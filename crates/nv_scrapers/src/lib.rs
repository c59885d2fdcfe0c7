pub mod scrapers;

pub use scrapers::{create_scraper, ScraperConfig, SelectorScraper, SiteProfile, SITES};

pub mod prelude {
    pub use super::scrapers::{create_scraper, ScraperConfig};
    pub use nv_core::{ArticleCandidate, Error, RawArticle, Result, Scraper};
}
