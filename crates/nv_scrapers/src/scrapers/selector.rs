use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nv_core::{ArticleCandidate, Error, RawArticle, Result, Scraper};
use scraper::{ElementRef, Html};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::slovenia;
use super::utils::{dedup_in_order, element_text, parse_selector, parse_url, resolve_link};

/// A block of article text. When `inner` is set only those descendants are read,
/// e.g. the `p` elements of an article body.
#[derive(Debug, Clone, Deserialize)]
pub struct TextSelector {
    pub selector: String,
    #[serde(default)]
    pub inner: Option<String>,
}

impl TextSelector {
    pub fn new(selector: &str, inner: Option<&str>) -> Self {
        Self {
            selector: selector.to_string(),
            inner: inner.map(str::to_string),
        }
    }
}

/// Locates the homepage block holding the freshest headlines.
///
/// The block is found from an `anchor` element by climbing `ancestor_depth`
/// parents and, when `next_sibling` is set, stepping to the following element.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturedBlock {
    pub anchor: String,
    #[serde(default)]
    pub ancestor_depth: usize,
    #[serde(default)]
    pub next_sibling: bool,
    pub weight: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// RFC 3339 in a `content`/`datetime` attribute or in the element text
    #[default]
    Rfc3339,
    /// "12. oktober 2023 ob 14.35"
    Slovenian,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    pub homepage: String,
    /// Elements that are article links, or that contain them
    pub link_selectors: Vec<String>,
    #[serde(default)]
    pub featured: Option<FeaturedBlock>,
    pub text_selectors: Vec<TextSelector>,
    #[serde(default)]
    pub skip_substrings: Vec<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
    #[serde(default)]
    pub date_format: DateFormat,
    /// Offset of naive page timestamps from UTC
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl SiteProfile {
    pub fn validate(&self) -> Result<()> {
        parse_url(&self.homepage).map_err(|e| Error::Configuration(e.to_string()))?;
        if self.link_selectors.is_empty() {
            return Err(Error::Configuration(format!("{}: no link selectors", self.name)));
        }
        if self.text_selectors.is_empty() {
            return Err(Error::Configuration(format!("{}: no text selectors", self.name)));
        }
        for selector in &self.link_selectors {
            parse_selector(selector)?;
        }
        for text in &self.text_selectors {
            parse_selector(&text.selector)?;
            if let Some(inner) = &text.inner {
                parse_selector(inner)?;
            }
        }
        if let Some(featured) = &self.featured {
            parse_selector(&featured.anchor)?;
        }
        if let Some(date) = &self.date_selector {
            parse_selector(date)?;
        }
        Ok(())
    }

    fn is_skipped(&self, url: &str) -> bool {
        self.skip_substrings.iter().any(|s| url.contains(s.as_str()))
    }

    /// Article links in listing order, with the featured block's links weighted.
    pub fn extract_candidates(&self, base: &Url, document: &Html) -> Result<Vec<ArticleCandidate>> {
        let selector = parse_selector(&self.link_selectors.join(", "))?;
        let mut urls = Vec::new();
        for element in document.select(&selector) {
            self.collect_links(base, element, &mut urls)?;
        }

        let featured = match &self.featured {
            Some(block) => self.featured_links(base, document, block)?,
            None => Vec::new(),
        };
        urls.extend(featured.iter().cloned());
        let featured: HashSet<String> = featured.into_iter().collect();
        let weight = self.featured.as_ref().map(|f| f.weight).unwrap_or_default();

        Ok(dedup_in_order(urls)
            .into_iter()
            .enumerate()
            .map(|(position, url)| {
                let boost = if featured.contains(&url) { weight } else { 0 };
                ArticleCandidate::new(url, position).with_site_weight(boost)
            })
            .collect())
    }

    fn collect_links(&self, base: &Url, element: ElementRef, urls: &mut Vec<String>) -> Result<()> {
        let mut push = |href: &str| {
            if let Some(url) = resolve_link(base, href) {
                if url.host_str() == base.host_str() && url.path() != "/" && !self.is_skipped(url.as_str()) {
                    urls.push(url.to_string());
                }
            }
        };

        if element.value().name() == "a" {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
            return Ok(());
        }
        let anchors = parse_selector("a[href]")?;
        for anchor in element.select(&anchors) {
            if let Some(href) = anchor.value().attr("href") {
                push(href);
            }
        }
        Ok(())
    }

    fn featured_links(&self, base: &Url, document: &Html, block: &FeaturedBlock) -> Result<Vec<String>> {
        let anchor = parse_selector(&block.anchor)?;
        let Some(mut node) = document.select(&anchor).next() else {
            debug!("{}: featured anchor {} not present", self.name, block.anchor);
            return Ok(Vec::new());
        };
        for _ in 0..block.ancestor_depth {
            match node.parent().and_then(ElementRef::wrap) {
                Some(parent) => node = parent,
                None => return Ok(Vec::new()),
            }
        }
        if block.next_sibling {
            match node.next_siblings().find_map(ElementRef::wrap) {
                Some(sibling) => node = sibling,
                None => return Ok(Vec::new()),
            }
        }
        let mut urls = Vec::new();
        self.collect_links(base, node, &mut urls)?;
        Ok(urls)
    }

    pub fn extract_text(&self, document: &Html) -> Result<Option<String>> {
        let mut parts = Vec::new();
        for text in &self.text_selectors {
            let selector = parse_selector(&text.selector)?;
            let Some(block) = document.select(&selector).next() else {
                continue;
            };
            match &text.inner {
                None => parts.push(element_text(&block)),
                Some(inner) => {
                    let inner = parse_selector(inner)?;
                    parts.extend(block.select(&inner).map(|el| element_text(&el)));
                }
            }
        }
        let text = parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok((!text.is_empty()).then_some(text))
    }

    /// Content images inside the text blocks, in document order.
    /// Images with a `class` attribute are decorative and skipped.
    pub fn extract_images(&self, base: &Url, document: &Html) -> Result<Vec<String>> {
        let images = parse_selector("img[src]")?;
        let mut urls = Vec::new();
        for text in &self.text_selectors {
            let selector = parse_selector(&text.selector)?;
            for block in document.select(&selector) {
                for img in block.select(&images) {
                    if img.value().attr("class").is_some() {
                        continue;
                    }
                    let src = img.value().attr("src").unwrap_or_default();
                    if src.starts_with("data:") {
                        continue;
                    }
                    if let Some(url) = resolve_link(base, src) {
                        urls.push(url.to_string());
                    }
                }
            }
        }
        Ok(dedup_in_order(urls))
    }

    pub fn extract_published_at(&self, document: &Html) -> Result<Option<DateTime<Utc>>> {
        let Some(date_selector) = &self.date_selector else {
            return Ok(None);
        };
        let selector = parse_selector(date_selector)?;
        let Some(element) = document.select(&selector).next() else {
            return Ok(None);
        };

        let parsed = match self.date_format {
            DateFormat::Rfc3339 => {
                let raw = element
                    .value()
                    .attr("content")
                    .or_else(|| element.value().attr("datetime"))
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(&element));
                DateTime::parse_from_rfc3339(raw.trim())
                    .ok()
                    .map(|at| at.with_timezone(&Utc))
            }
            DateFormat::Slovenian => {
                slovenia::parse_slovenian_datetime(&element_text(&element), self.utc_offset_hours)
            }
        };
        Ok(parsed)
    }
}

/// Scraper driven entirely by a [`SiteProfile`].
#[derive(Debug, Clone)]
pub struct SelectorScraper {
    profile: SiteProfile,
    client: reqwest::Client,
}

impl SelectorScraper {
    pub fn new(profile: SiteProfile, timeout: Duration, user_agent: &str) -> Result<Self> {
        profile.validate()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { profile, client })
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to request {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} answered with status {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", url, e)))
    }

    fn parse_listing(&self, base: &Url, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        self.profile.extract_candidates(base, &document)
    }

    fn parse_article(&self, url: &str, html: &str) -> Result<RawArticle> {
        let base = parse_url(url)?;
        let document = Html::parse_document(html);

        let text = self.profile.extract_text(&document)?.ok_or_else(|| {
            warn!("No suitable text found for: {}", url);
            Error::Fetch(format!("No suitable text found for {}", url))
        })?;

        Ok(RawArticle {
            url: url.to_string(),
            text,
            images: self.profile.extract_images(&base, &document)?,
            published_at: self.profile.extract_published_at(&document)?,
        })
    }
}

#[async_trait]
impl Scraper for SelectorScraper {
    fn source(&self) -> &str {
        &self.profile.name
    }

    fn homepage(&self) -> &str {
        &self.profile.homepage
    }

    async fn list_urls(&self, homepage: &str) -> Result<Vec<ArticleCandidate>> {
        let base = parse_url(homepage)?;
        let html = self.fetch_html(homepage).await?;
        let candidates = self.parse_listing(&base, &html)?;
        debug!("{}: {} candidate links on {}", self.profile.name, candidates.len(), homepage);
        Ok(candidates)
    }

    async fn fetch(&self, url: &str) -> Result<RawArticle> {
        let html = self.fetch_html(url).await?;
        self.parse_article(url, &html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    const HOMEPAGE: &str = r#"
        <html><body>
            <div class="xl-news"><a href="/slovenija/prva/1">Prva</a></div>
            <div class="md-news">
                <a href="/svet/druga/2">Druga</a>
                <a href="/slovenija/prva/1#comments">Prva again</a>
                <a href="/oglasno-sporocilo/promo/3">Promo</a>
                <a href="https://elsewhere.example/4">Elsewhere</a>
            </div>
            <section>
                <div><div><h2 id="aktualno">Aktualno</h2></div></div>
                <ul class="latest">
                    <li><a href="/svet/druga/2">Druga</a></li>
                    <li><a href="/kultura/peta/5">Peta</a></li>
                </ul>
            </section>
        </body></html>
    "#;

    const ARTICLE: &str = r#"
        <html><body>
            <div class="publish-meta">12. oktober 2023 ob 14.35</div>
            <header class="article-header"><h1>Naslov   članka</h1></header>
            <div class="article-body">
                <p>Prvi odstavek.</p>
                <img src="/media/slika.jpg">
                <img class="icon" src="/media/ikona.png">
                <img src="data:image/png;base64,AAAA">
                <div class="ad">Oglas</div>
                <p>Drugi odstavek.</p>
            </div>
        </body></html>
    "#;

    fn profile(homepage: &str) -> SiteProfile {
        SiteProfile {
            name: "Test".to_string(),
            homepage: homepage.to_string(),
            link_selectors: vec!["div.xl-news".to_string(), "div.md-news".to_string()],
            featured: Some(FeaturedBlock {
                anchor: "#aktualno".to_string(),
                ancestor_depth: 2,
                next_sibling: true,
                weight: 500,
            }),
            text_selectors: vec![
                TextSelector::new(".article-header", None),
                TextSelector::new(".article-body", Some("p")),
            ],
            skip_substrings: vec!["/oglasno-sporocilo/".to_string()],
            date_selector: Some(".publish-meta".to_string()),
            date_format: DateFormat::Slovenian,
            utc_offset_hours: 0,
        }
    }

    #[test]
    fn test_extract_candidates() {
        let base = Url::parse("https://www.rtvslo.si").unwrap();
        let document = Html::parse_document(HOMEPAGE);
        let candidates = profile(base.as_str()).extract_candidates(&base, &document).unwrap();

        let urls: Vec<_> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.rtvslo.si/slovenija/prva/1",
                "https://www.rtvslo.si/svet/druga/2",
                "https://www.rtvslo.si/kultura/peta/5",
            ]
        );
        assert_eq!(candidates[0].position, 0);
        assert_eq!(candidates[0].site_weight, 0);
        assert_eq!(candidates[1].site_weight, 500);
        assert_eq!(candidates[2].position, 2);
        assert_eq!(candidates[2].site_weight, 500);
    }

    #[test]
    fn test_extract_candidates_without_links() {
        let base = Url::parse("https://www.rtvslo.si").unwrap();
        let document = Html::parse_document("<html><body><p>Vzdrževanje</p></body></html>");
        let candidates = profile(base.as_str()).extract_candidates(&base, &document).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_extract_article_parts() {
        let base = Url::parse("https://www.rtvslo.si/slovenija/prva/1").unwrap();
        let document = Html::parse_document(ARTICLE);
        let profile = profile("https://www.rtvslo.si");

        let text = profile.extract_text(&document).unwrap().unwrap();
        assert_eq!(text, "Naslov članka Prvi odstavek. Drugi odstavek.");

        let images = profile.extract_images(&base, &document).unwrap();
        assert_eq!(images, vec!["https://www.rtvslo.si/media/slika.jpg"]);

        let published = profile.extract_published_at(&document).unwrap().unwrap();
        assert_eq!(published.to_rfc3339(), "2023-10-12T14:35:00+00:00");
    }

    #[test]
    fn test_extract_rfc3339_date() {
        let mut profile = profile("https://example.com");
        profile.date_selector = Some("meta[property='article:published_time']".to_string());
        profile.date_format = DateFormat::Rfc3339;
        let document = Html::parse_document(
            r#"<html><head><meta property="article:published_time" content="2024-03-01T08:00:00+01:00"></head></html>"#,
        );
        let published = profile.extract_published_at(&document).unwrap().unwrap();
        assert_eq!(published.to_rfc3339(), "2024-03-01T07:00:00+00:00");
    }

    #[test]
    fn test_validate_profile() {
        assert!(profile("https://example.com").validate().is_ok());
        assert!(profile("not a url").validate().is_err());

        let mut broken = profile("https://example.com");
        broken.link_selectors = vec!["div[".to_string()];
        assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/", get(|| async { axum::response::Html(HOMEPAGE) }))
            .route("/slovenija/prva/1", get(|| async { axum::response::Html(ARTICLE) }))
            .route("/empty", get(|| async { axum::response::Html("<html><body></body></html>") }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_list_and_fetch() {
        let homepage = serve().await;
        let scraper =
            SelectorScraper::new(profile(&homepage), Duration::from_secs(5), "nv-test").unwrap();

        let candidates = scraper.list_urls(&homepage).await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].url, format!("{}/slovenija/prva/1", homepage));

        let article = scraper.fetch(&candidates[0].url).await.unwrap();
        assert!(article.text.starts_with("Naslov članka"));
        assert_eq!(article.images, vec![format!("{}/media/slika.jpg", homepage)]);
        assert!(article.published_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let homepage = serve().await;
        let scraper =
            SelectorScraper::new(profile(&homepage), Duration::from_secs(5), "nv-test").unwrap();

        let broken = scraper.fetch(&format!("{}/broken", homepage)).await;
        assert!(matches!(broken, Err(Error::Fetch(_))));

        let empty = scraper.fetch(&format!("{}/empty", homepage)).await;
        assert!(matches!(empty, Err(Error::Fetch(_))));

        let listing = scraper.list_urls(&format!("{}/broken", homepage)).await;
        assert!(matches!(listing, Err(Error::Fetch(_))));
    }
}
