//! Process-lifetime product URL index built from one sitemap crawl.
//!
//! The build is single-flight: concurrent callers of [`SitemapIndex::ensure`]
//! share one crawl and all observe its outcome. Once built the index is never
//! refreshed; a crawl that stopped early or lost nodes still counts as built.

use crate::config::ResolverConfig;
use crate::fetch::FetchClient;
use crate::sitemap::{self, CrawlReport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// A finished crawl plus its product URLs lower-cased once for matching.
struct Built {
    report: Arc<CrawlReport>,
    lowered: Vec<String>,
}

pub struct SitemapIndex {
    client: FetchClient,
    config: ResolverConfig,
    cell: OnceCell<Built>,
    builds: AtomicUsize,
}

impl SitemapIndex {
    pub fn new(client: FetchClient, config: ResolverConfig) -> Self {
        Self {
            client,
            config,
            cell: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Build the index unless it is built or being built, then return it.
    pub async fn ensure(&self) -> Arc<CrawlReport> {
        let built = self
            .cell
            .get_or_init(|| async {
                self.builds.fetch_add(1, Ordering::SeqCst);
                info!(
                    "building sitemap index from {} root(s)",
                    self.config.root_sitemaps.len()
                );
                let report = sitemap::crawl(&self.client, &self.config).await;
                Built {
                    lowered: lowercase_all(&report.product_urls),
                    report: Arc::new(report),
                }
            })
            .await;
        Arc::clone(&built.report)
    }

    pub fn is_built(&self) -> bool {
        self.cell.initialized()
    }

    /// The finished crawl, if any.
    pub fn report(&self) -> Option<Arc<CrawlReport>> {
        self.cell.get().map(|built| Arc::clone(&built.report))
    }

    pub fn product_count(&self) -> usize {
        self.cell.get().map_or(0, |built| built.report.product_urls.len())
    }

    /// How many crawls this index has started.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Best product page for `sku`, or `None` when unbuilt or unmatched.
    pub fn query(&self, sku: &str) -> Option<String> {
        let built = self.cell.get()?;
        pick_shortest(&built.report.product_urls, &built.lowered, sku).map(str::to_string)
    }

    /// Forget the built index so the next `ensure` crawls again.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}

/// Lower-cased copies of `urls`, index-aligned with the originals.
pub fn lowercase_all(urls: &[String]) -> Vec<String> {
    urls.iter().map(|u| u.to_lowercase()).collect()
}

/// Case-insensitive substring match; the shortest URL wins, first seen on ties.
///
/// `lowered` is [`lowercase_all`] of `urls`. A SKU that is a prefix of another
/// ("XNP-1" vs "XNP-100") can still land on the wrong page when only the
/// longer one is in the index.
pub fn pick_shortest<'a>(urls: &'a [String], lowered: &[String], sku: &str) -> Option<&'a str> {
    let needle = sku.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    urls.iter()
        .zip(lowered)
        .filter(|(_, lower)| lower.contains(&needle))
        .min_by_key(|(url, _)| url.len())
        .map(|(url, _)| url.as_str())
}
