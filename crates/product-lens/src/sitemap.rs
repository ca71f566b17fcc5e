//! Breadth-first sitemap crawl collecting product-detail URLs.
//!
//! `<loc>` values are pulled out with a text scan instead of a full XML parse;
//! sitemap bodies in the wild are often malformed and the value is always the
//! first text node inside the tag. The crawl is strictly sequential and capped
//! three ways (sub-sitemaps fetched, queue depth, product URLs collected) so a
//! cyclic or endlessly fanning sitemap tree cannot run away with it.

use crate::config::ResolverConfig;
use crate::fetch::FetchClient;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    QueueExhausted,
    SitemapCap,
    ProductCap,
}

/// A sitemap node that was skipped because it could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub error: String,
}

/// Everything one crawl produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Discovery order, duplicates kept.
    pub product_urls: Vec<String>,
    /// Sitemaps fetched successfully. Unreachable nodes do not count toward the cap.
    pub sitemaps_fetched: usize,
    pub failures: Vec<CrawlFailure>,
    pub stop: StopReason,
}

/// Extract every `<loc>` value from a sitemap body.
pub fn extract_locs(xml: &str) -> Vec<String> {
    let re = Regex::new(r"(?i)<loc>([^<]+)</loc>").expect("loc regex is valid");
    re.captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Crawl the configured root sitemaps breadth-first.
///
/// Never fails: an unreachable node is recorded in
/// [`CrawlReport::failures`] and skipped.
pub async fn crawl(client: &FetchClient, config: &ResolverConfig) -> CrawlReport {
    let limits = &config.limits;
    let timeout = config.page_timeout();

    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = config.root_sitemaps.iter().cloned().collect();
    let mut product_urls = Vec::new();
    let mut failures = Vec::new();
    let mut sitemaps_fetched = 0usize;

    let stop = loop {
        if queue.is_empty() {
            break StopReason::QueueExhausted;
        }
        if sitemaps_fetched >= limits.max_sitemaps {
            break StopReason::SitemapCap;
        }
        let Some(url) = queue.pop_front() else {
            break StopReason::QueueExhausted;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let xml = match client.get_text(&url, timeout).await {
            Ok(xml) => {
                sitemaps_fetched += 1;
                xml
            }
            Err(e) => {
                warn!("skipping sitemap {url}: {e}");
                failures.push(CrawlFailure {
                    url,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let locs = extract_locs(&xml);
        debug!("sitemap {url}: {} locations", locs.len());

        for loc in locs {
            if loc.contains(&config.sitemap_marker)
                && !seen.contains(&loc)
                && queue.len() < limits.max_queue
            {
                queue.push_back(loc.clone());
            }
            if loc.contains(&config.product_marker) {
                product_urls.push(loc);
                if product_urls.len() >= limits.max_product_urls {
                    break;
                }
            }
        }

        if product_urls.len() >= limits.max_product_urls {
            break StopReason::ProductCap;
        }
    };

    info!(
        "sitemap crawl finished ({stop:?}): {} product urls from {sitemaps_fetched} sitemaps, {} skipped",
        product_urls.len(),
        failures.len()
    );

    CrawlReport {
        product_urls,
        sitemaps_fetched,
        failures,
        stop,
    }
}
