//! The fallback cascade: override → sitemap → site search → none.
//!
//! Each stage runs only when the previous one found nothing. Stage failures
//! never escape; they turn into "no result" for that stage and, with debug
//! enabled, a line in the trace.

use crate::config::ResolverConfig;
use crate::fetch::FetchClient;
use crate::index::SitemapIndex;
use crate::inspector::PageInspector;
use crate::overrides::OverrideStore;
use crate::search::SiteSearch;
use crate::types::{ResolutionResult, ResolveError, ResolveResult, Source};
use tracing::{info, warn};

pub struct Resolver {
    config: ResolverConfig,
    overrides: OverrideStore,
    index: SitemapIndex,
    inspector: PageInspector,
    search: SiteSearch,
}

impl Resolver {
    /// A resolver talking to the network through [`HttpFetcher`](crate::fetch::HttpFetcher).
    pub fn new(config: ResolverConfig) -> Self {
        let client = FetchClient::from_config(&config);
        Self::with_client(config, client)
    }

    /// A resolver with every component sharing `client`.
    pub fn with_client(config: ResolverConfig, client: FetchClient) -> Self {
        Self {
            overrides: OverrideStore::new(
                config.overrides.clone(),
                client.clone(),
                config.page_timeout(),
            ),
            index: SitemapIndex::new(client.clone(), config.clone()),
            inspector: PageInspector::new(client.clone(), &config),
            search: SiteSearch::new(client, &config),
            config,
        }
    }

    /// Replace the override store, e.g. with a preloaded table.
    pub fn with_overrides(mut self, overrides: OverrideStore) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the page inspector, e.g. one with a different extractor.
    pub fn with_inspector(mut self, inspector: PageInspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    pub fn index(&self) -> &SitemapIndex {
        &self.index
    }

    /// Resolve `sku` to an image and datasheet page.
    ///
    /// Fails only with [`ResolveError::InvalidInput`] for a blank SKU, before
    /// any network traffic. "Nothing found" is `Ok` with [`Source::None`].
    pub async fn resolve(&self, sku: &str, debug: bool) -> ResolveResult<ResolutionResult> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(ResolveError::InvalidInput("missing sku".to_string()));
        }

        let mut trace = Vec::new();

        // 1) overrides
        if let Some(entry) = self.overrides.lookup(sku).await.filter(|e| !e.is_empty()) {
            trace.push("override hit".to_string());
            let datasheet = entry.page().map(str::to_string);
            let image = match (entry.image(), entry.page()) {
                (Some(image), _) => Some(image.to_string()),
                (None, Some(page)) => self.image_from(page, &mut trace).await,
                (None, None) => None,
            };
            return Ok(finish(sku, image, datasheet, Source::Override, trace, debug));
        }
        trace.push("no override".to_string());

        // 2) sitemap index
        let report = self.index.ensure().await;
        trace.push(format!(
            "sitemap index: {} product urls from {} sitemaps",
            report.product_urls.len(),
            report.sitemaps_fetched
        ));
        if let Some(page) = self.index.query(sku) {
            trace.push(format!("sitemap hit: {page}"));
            let image = self.image_from(&page, &mut trace).await;
            return Ok(finish(sku, image, Some(page), Source::Sitemap, trace, debug));
        }
        trace.push("not in sitemap".to_string());

        // 3) site search
        match self.search.try_search(sku).await {
            Ok(Some(page)) => {
                trace.push(format!("site-search hit: {page}"));
                let image = self.image_from(&page, &mut trace).await;
                return Ok(finish(sku, image, Some(page), Source::SiteSearch, trace, debug));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("site search for {sku} failed: {e}");
                trace.push(format!("site-search failed: {e}"));
            }
        }
        trace.push("not in site-search".to_string());

        Ok(finish(sku, None, None, Source::None, trace, debug))
    }

    async fn image_from(&self, page: &str, trace: &mut Vec<String>) -> Option<String> {
        match self.inspector.find_representative_image(page).await {
            Ok(Some(image)) => {
                trace.push(format!("image from page: {image}"));
                Some(image)
            }
            Ok(None) => {
                trace.push("no image markup on page".to_string());
                None
            }
            Err(e) => {
                warn!("could not inspect {page}: {e}");
                trace.push(format!("page inspection failed: {e}"));
                None
            }
        }
    }
}

fn finish(
    sku: &str,
    image: Option<String>,
    datasheet: Option<String>,
    source: Source,
    trace: Vec<String>,
    debug: bool,
) -> ResolutionResult {
    info!("resolved {sku} via {source} (image: {})", image.is_some());
    ResolutionResult {
        sku: sku.to_string(),
        image,
        datasheet,
        source,
        trace: debug.then_some(trace),
    }
}
