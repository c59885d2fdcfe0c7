use std::sync::Arc;
use std::time::Duration;

use nv_core::{Error, Result, Scraper};
use serde::Deserialize;

pub mod selector;
pub mod slovenia;

pub use selector::{DateFormat, FeaturedBlock, SelectorScraper, SiteProfile, TextSelector};

/// Sites with a built-in profile, plus `generic` which takes its profile from config.
pub const SITES: &[&str] = &["rtvslo", "generic"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub site: String,
    /// Overrides the homepage of the site profile
    pub homepage: Option<String>,
    /// Required when `site` is `generic`
    pub profile: Option<SiteProfile>,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site: "rtvslo".to_string(),
            homepage: None,
            profile: None,
            request_timeout_ms: 15_000,
            user_agent: concat!("nv/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScraperConfig {
    /// Resolves the site profile this configuration selects.
    pub fn site_profile(&self) -> Result<SiteProfile> {
        let mut profile = match self.site.as_str() {
            "rtvslo" => slovenia::rtvslo::profile(),
            "generic" => self.profile.clone().ok_or_else(|| {
                Error::Configuration("the generic scraper needs a site profile".to_string())
            })?,
            other => {
                return Err(Error::Configuration(format!(
                    "unknown site '{}', expected one of: {}",
                    other,
                    SITES.join(", ")
                )))
            }
        };
        if let Some(homepage) = &self.homepage {
            profile.homepage = homepage.clone();
        }
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(Error::Configuration(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.site_profile().map(|_| ())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Build the scraper selected by the configuration.
pub fn create_scraper(config: &ScraperConfig) -> Result<Arc<dyn Scraper>> {
    config.validate()?;
    let scraper = SelectorScraper::new(
        config.site_profile()?,
        config.request_timeout(),
        &config.user_agent,
    )?;
    Ok(Arc::new(scraper))
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use std::collections::HashSet;

    use nv_core::{Error, Result};
    use scraper::{ElementRef, Selector};
    use url::Url;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| Error::Configuration(format!("Invalid selector {:?}: {}", selector, e)))
    }

    /// Collapses whitespace runs inside an element's text into single spaces.
    pub fn element_text(element: &ElementRef) -> String {
        element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Resolves `href` against `base`, dropping fragments.
    pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
            return None;
        }
        let mut url = base.join(href).ok()?;
        url.set_fragment(None);
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    /// Removes duplicates while preserving order of first appearance.
    pub fn dedup_in_order(urls: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
    }
}
