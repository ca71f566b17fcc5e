//! Direct lookup in the vendor's public product-information (PIM) blob container.
//!
//! The container lists blobs under a `<SKU>/` prefix; the best thumbnail is
//! picked by a fixed score so large renders win over small ones.

use crate::fetch::FetchClient;
use crate::types::{ResolveError, ResolveResult};
use regex::Regex;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PIM_BASE: &str = "https://hvsgmpprdstorage.blob.core.windows.net/pim";

pub struct PimLookup {
    client: FetchClient,
    base: String,
    timeout: Duration,
}

impl PimLookup {
    pub fn new(client: FetchClient, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Container listing URL for blobs under `<sku>/`.
    pub fn listing_url(&self, sku: &str) -> ResolveResult<String> {
        let mut url = url::Url::parse(&self.base)
            .map_err(|e| ResolveError::InvalidInput(format!("bad PIM base: {e}")))?;
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "list")
            .append_pair("prefix", &format!("{sku}/"));
        Ok(url.to_string())
    }

    /// Best image URL for `sku`, or `None` on any failure.
    pub async fn find_image(&self, sku: &str) -> Option<String> {
        match self.try_find_image(sku).await {
            Ok(found) => found,
            Err(e) => {
                warn!("PIM lookup for {sku} failed: {e}");
                None
            }
        }
    }

    pub async fn try_find_image(&self, sku: &str) -> ResolveResult<Option<String>> {
        let xml = self.client.get_text(&self.listing_url(sku)?, self.timeout).await?;
        let needle = sku.to_lowercase();
        let names: Vec<String> = blob_names(&xml)
            .into_iter()
            .filter(|n| n.to_lowercase().contains(&needle))
            .collect();
        debug!("PIM listing for {sku}: {} candidate blobs", names.len());
        Ok(pick_best(&names, sku).map(|best| format!("{}/{best}", self.base)))
    }
}

/// Every `<Name>` value in a container listing.
pub fn blob_names(xml: &str) -> Vec<String> {
    let re = Regex::new(r"<Name>([^<]+)</Name>").expect("blob name regex is valid");
    re.captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Preference score for one blob name.
pub fn score(name: &str, sku: &str) -> u32 {
    let lower = name.to_lowercase();
    let mut s = 0;
    if lower.contains("/thumbnails/large_08/") {
        s += 1000;
    }
    if lower.contains("/thumbnails/large_04/") {
        s += 800;
    }
    if lower.contains("/thumbnails/") {
        s += 500;
    }
    if lower.ends_with(".png") {
        s += 50;
    }
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        s += 40;
    }
    if lower.contains("-01") || lower.contains("_01") || lower.contains("main") {
        s += 10;
    }
    if lower.contains(&sku.to_lowercase()) {
        s += 5;
    }
    s
}

/// Highest-scoring name; the earliest listed wins a tie.
pub fn pick_best<'a>(names: &'a [String], sku: &str) -> Option<&'a str> {
    names
        .iter()
        .min_by_key(|n| Reverse(score(n, sku)))
        .map(String::as_str)
}
