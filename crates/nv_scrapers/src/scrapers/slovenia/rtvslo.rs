use crate::scrapers::selector::{DateFormat, FeaturedBlock, SiteProfile, TextSelector};

pub const HOMEPAGE: &str = "https://www.rtvslo.si";

/// Profile for the RTV SLO news portal.
pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "RTV SLO".to_string(),
        homepage: HOMEPAGE.to_string(),
        link_selectors: vec!["div.xl-news".to_string(), "div.md-news".to_string()],
        featured: Some(FeaturedBlock {
            anchor: "div#aktualno".to_string(),
            ancestor_depth: 2,
            next_sibling: true,
            weight: 1_000,
        }),
        text_selectors: vec![
            TextSelector::new(".article-header", None),
            TextSelector::new(".article-body", Some("p")),
        ],
        skip_substrings: vec![
            "/oglasno-sporocilo/".to_string(),
            "mmcpodrobno".to_string(),
        ],
        date_selector: Some("div.publish-meta".to_string()),
        date_format: DateFormat::Slovenian,
        utc_offset_hours: 1,
    }
}
