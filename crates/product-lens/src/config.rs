//! Resolver tunables. Defaults match the Hanwha Vision catalog the resolver was built for.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Desktop-browser user agent; some CDNs reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

pub const DEFAULT_ORIGIN: &str = "https://www.hanwhavision.com";

/// Where the hand-curated override document lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "snake_case")]
pub enum OverrideSource {
    #[default]
    None,
    Url(String),
    File(PathBuf),
}

impl OverrideSource {
    /// Treat `http(s)://` values as URLs and anything else as a file path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            OverrideSource::None
        } else if value.starts_with("http://") || value.starts_with("https://") {
            OverrideSource::Url(value.to_string())
        } else {
            OverrideSource::File(PathBuf::from(value))
        }
    }
}

/// Caps bounding one sitemap crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlLimits {
    /// Sub-sitemaps fetched per crawl.
    pub max_sitemaps: usize,
    /// Pending queue entries.
    pub max_queue: usize,
    /// Product URLs collected.
    pub max_product_urls: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_sitemaps: 50,
            max_queue: 200,
            max_product_urls: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Origin of the manufacturer site; relative links resolve against it.
    pub origin: String,
    pub root_sitemaps: Vec<String>,
    /// Path fragment marking a location as another sitemap.
    pub sitemap_marker: String,
    /// Path fragment marking a product-detail page.
    pub product_marker: String,
    pub search_path: String,
    /// `src` values containing one of these are accepted as product images.
    pub asset_patterns: Vec<String>,
    pub limits: CrawlLimits,
    pub page_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_step_ms: u64,
    pub user_agent: String,
    pub overrides: OverrideSource,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::for_origin(DEFAULT_ORIGIN)
    }
}

impl ResolverConfig {
    /// Default settings pointed at a different origin (root sitemaps follow it).
    pub fn for_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/').to_string();
        Self {
            root_sitemaps: vec![
                format!("{origin}/sitemap_index.xml"),
                format!("{origin}/sitemap.xml"),
                format!("{origin}/en/sitemap.xml"),
            ],
            origin,
            sitemap_marker: "/sitemap".to_string(),
            product_marker: "/en/products/".to_string(),
            search_path: "/en/search/".to_string(),
            asset_patterns: vec![
                "hvsgmpprdstorage".to_string(),
                "wp-content/uploads".to_string(),
            ],
            limits: CrawlLimits::default(),
            page_timeout_ms: 60_000,
            max_retries: 2,
            backoff_step_ms: 400,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            overrides: OverrideSource::None,
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert_eq!(config.root_sitemaps.len(), 3);
        assert_eq!(config.limits.max_sitemaps, 50);
        assert_eq!(config.limits.max_queue, 200);
        assert_eq!(config.limits.max_product_urls, 20_000);
        assert_eq!(config.page_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_for_origin_strips_trailing_slash() {
        let config = ResolverConfig::for_origin("http://127.0.0.1:8080/");
        assert_eq!(config.origin, "http://127.0.0.1:8080");
        assert_eq!(config.root_sitemaps[0], "http://127.0.0.1:8080/sitemap_index.xml");
    }

    #[test]
    fn test_override_source_parse() {
        assert_eq!(OverrideSource::parse(""), OverrideSource::None);
        assert_eq!(
            OverrideSource::parse("https://shop.example/overrides.json"),
            OverrideSource::Url("https://shop.example/overrides.json".into())
        );
        assert_eq!(
            OverrideSource::parse("public/overrides.json"),
            OverrideSource::File(PathBuf::from("public/overrides.json"))
        );
    }
}
