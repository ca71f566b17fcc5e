//! Product page inspection: pick one representative image URL from page markup.
//!
//! Markup scanning sits behind [`ImageExtractor`] so the regex-based
//! [`PatternExtractor`] can be swapped for a stricter parser without touching
//! the resolver. Finding nothing is a normal outcome, not an error.

use crate::config::ResolverConfig;
use crate::fetch::FetchClient;
use crate::types::ResolveResult;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Pulls an image URL out of a fetched page.
pub trait ImageExtractor: Send + Sync {
    /// `page_url` is the base for relative values.
    fn extract(&self, html: &str, page_url: &str) -> Option<String>;
}

/// Best-effort regex extraction: Open Graph image first, then known asset hosts.
pub struct PatternExtractor {
    og_property_first: Regex,
    og_content_first: Regex,
    asset_src: Option<Regex>,
}

impl PatternExtractor {
    /// `asset_patterns` are literal fragments (host names, upload paths).
    pub fn new(asset_patterns: &[String]) -> Self {
        let og_property_first = Regex::new(
            r#"(?i)<meta[^>]+property\s*=\s*["']og:image["'][^>]+content\s*=\s*["']([^"']+)["']"#,
        )
        .expect("og:image regex is valid");
        let og_content_first = Regex::new(
            r#"(?i)<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]+property\s*=\s*["']og:image["']"#,
        )
        .expect("og:image regex is valid");

        let alternatives: Vec<String> = asset_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(p))
            .collect();
        let asset_src = if alternatives.is_empty() {
            None
        } else {
            let pattern = format!(
                r#"(?i)src\s*=\s*["']([^"']*(?:{})[^"']*)["']"#,
                alternatives.join("|")
            );
            Some(Regex::new(&pattern).expect("escaped asset regex is valid"))
        };

        Self {
            og_property_first,
            og_content_first,
            asset_src,
        }
    }

    /// `<meta property="og:image" content="…">`, either attribute order.
    pub fn og_image(&self, html: &str, page_url: &str) -> Option<String> {
        self.og_property_first
            .captures(html)
            .or_else(|| self.og_content_first.captures(html))
            .and_then(|cap| cap.get(1))
            .map(|m| resolve_url(m.as_str(), page_url))
    }

    /// First `src` attribute pointing at a known asset host or upload path.
    pub fn asset_image(&self, html: &str, page_url: &str) -> Option<String> {
        self.asset_src
            .as_ref()?
            .captures(html)
            .and_then(|cap| cap.get(1))
            .map(|m| resolve_url(m.as_str(), page_url))
    }
}

impl ImageExtractor for PatternExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Option<String> {
        self.og_image(html, page_url)
            .or_else(|| self.asset_image(html, page_url))
    }
}

/// Resolve an attribute value against `base`.
///
/// Handles absolute, protocol-relative and relative values. Returns the raw
/// value when either side cannot be parsed.
pub fn resolve_url(raw: &str, base: &str) -> String {
    let raw = raw.trim().replace("&amp;", "&");
    match url::Url::parse(base).and_then(|b| b.join(&raw)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => raw,
    }
}

/// Fetches product pages and runs the extractor over them.
pub struct PageInspector {
    client: FetchClient,
    timeout: Duration,
    extractor: Arc<dyn ImageExtractor>,
}

impl PageInspector {
    pub fn new(client: FetchClient, config: &ResolverConfig) -> Self {
        Self::with_extractor(
            client,
            config.page_timeout(),
            Arc::new(PatternExtractor::new(&config.asset_patterns)),
        )
    }

    pub fn with_extractor(
        client: FetchClient,
        timeout: Duration,
        extractor: Arc<dyn ImageExtractor>,
    ) -> Self {
        Self {
            client,
            timeout,
            extractor,
        }
    }

    /// `Ok(None)` when the page has no recognisable image; `Err` when it could not be fetched.
    pub async fn find_representative_image(&self, page_url: &str) -> ResolveResult<Option<String>> {
        let html = self.client.get_text(page_url, self.timeout).await?;
        let image = self.extractor.extract(&html, page_url);
        debug!("image for {page_url}: {image:?}");
        Ok(image)
    }
}
