//! One-off catalog pass that fills in missing product images.
//!
//! Strategy per product: override image → PIM container → local placeholder.
//! Products of other brands, with an image already, or without a model code
//! are left untouched. Unknown catalog fields survive the round trip.

use crate::overrides::OverrideStore;
use crate::pim::PimLookup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// One catalog row. Only the fields the pass reads or writes are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasheet: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    fn has(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct PopulateOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    /// Case-insensitive substring of `brand`.
    pub brand_filter: String,
    pub placeholder: String,
    /// Pause after each placeholder fallback.
    pub pause: Duration,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: None,
            brand_filter: "hanwha".to_string(),
            placeholder: "/brand/hanwha-placeholder.png".to_string(),
            pause: Duration::from_millis(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub examined: usize,
    pub from_overrides: usize,
    pub from_pim: usize,
    pub placeholders: usize,
    pub skipped: usize,
}

impl PopulateReport {
    pub fn updated(&self) -> usize {
        self.from_overrides + self.from_pim + self.placeholders
    }
}

/// Fill missing images in `products[offset..offset + limit]`.
pub async fn populate(
    products: &mut [Product],
    overrides: &OverrideStore,
    pim: &PimLookup,
    options: &PopulateOptions,
) -> PopulateReport {
    let total = products.len();
    let start = options.offset.min(total);
    let end = options
        .limit
        .map_or(total, |limit| start.saturating_add(limit).min(total));
    let brand_filter = options.brand_filter.to_lowercase();
    let table = overrides.table().await;

    info!("populating products {start}..{end} of {total}");
    let mut report = PopulateReport::default();

    for (i, product) in products[start..end].iter_mut().enumerate() {
        report.examined += 1;
        let brand = product.brand.as_deref().unwrap_or("").trim().to_lowercase();
        let sku = product.model.as_deref().unwrap_or("").trim().to_string();

        if sku.is_empty() || !brand.contains(&brand_filter) || Product::has(&product.image) {
            report.skipped += 1;
            continue;
        }
        debug!("[{}/{total}] {sku}", start + i + 1);

        let entry = table.lookup(&sku).cloned().unwrap_or_default();
        if !Product::has(&product.datasheet) {
            if let Some(page) = entry.page() {
                product.datasheet = Some(page.to_string());
            }
        }

        if let Some(image) = entry.image() {
            product.image = Some(image.to_string());
            report.from_overrides += 1;
            continue;
        }

        if let Some(image) = pim.find_image(&sku).await {
            product.image = Some(image);
            report.from_pim += 1;
            continue;
        }

        product.image = Some(options.placeholder.clone());
        report.placeholders += 1;
        if !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
    }

    info!(
        "populate done: {} updated ({} override, {} PIM, {} placeholder), {} skipped",
        report.updated(),
        report.from_overrides,
        report.from_pim,
        report.placeholders,
        report.skipped
    );
    report
}
