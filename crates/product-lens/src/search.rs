//! Fallback lookup through the manufacturer site's own search page.

use crate::config::ResolverConfig;
use crate::fetch::FetchClient;
use crate::inspector::resolve_url;
use crate::types::{ResolveError, ResolveResult};
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SiteSearch {
    client: FetchClient,
    origin: String,
    search_path: String,
    product_marker: String,
    timeout: Duration,
}

impl SiteSearch {
    pub fn new(client: FetchClient, config: &ResolverConfig) -> Self {
        Self {
            client,
            origin: config.origin.clone(),
            search_path: config.search_path.clone(),
            product_marker: config.product_marker.clone(),
            timeout: config.page_timeout(),
        }
    }

    /// `{origin}{search_path}?q=<sku>`, with spaces encoded as `%20` rather than `+`.
    pub fn search_url(&self, sku: &str) -> ResolveResult<String> {
        let mut url = url::Url::parse(&self.origin)
            .and_then(|origin| origin.join(&self.search_path))
            .map_err(|e| ResolveError::InvalidInput(format!("bad search origin: {e}")))?;
        // Form encoding escapes a literal '+' as %2B, so every '+' left is a space.
        let term = url::form_urlencoded::byte_serialize(sku.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        url.set_query(Some(&format!("q={term}")));
        Ok(url.to_string())
    }

    /// First product-page link in the search results, or `None` on any failure.
    pub async fn search_site_for(&self, sku: &str) -> Option<String> {
        match self.try_search(sku).await {
            Ok(found) => found,
            Err(e) => {
                warn!("site search for {sku} failed: {e}");
                None
            }
        }
    }

    /// Like [`search_site_for`](Self::search_site_for) but keeps the failure.
    pub async fn try_search(&self, sku: &str) -> ResolveResult<Option<String>> {
        let url = self.search_url(sku)?;
        let html = self.client.get_text(&url, self.timeout).await?;
        let found = first_product_link(&html, &self.product_marker, &self.origin);
        debug!("site search for {sku}: {found:?}");
        Ok(found)
    }
}

/// First `href` whose value contains `product_marker`, resolved against `origin`.
pub fn first_product_link(html: &str, product_marker: &str, origin: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)href\s*=\s*["']([^"']*{}[^"']+)["']"#,
        regex::escape(product_marker)
    );
    let re = Regex::new(&pattern).expect("escaped product link regex is valid");
    re.captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| resolve_url(m.as_str(), origin))
}
