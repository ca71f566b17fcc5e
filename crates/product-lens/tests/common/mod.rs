//! Shared helpers for product-lens integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use product_lens::{FetchClient, FetchFailure, FetchedPage, Fetcher, ResolverConfig, RetryPolicy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ORIGIN: &str = "https://vendor.test";

/// In-memory upstream site. Unknown URLs answer 404; every request is counted.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, Result<String, FetchFailure>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(self, url: &str, failure: FetchFailure) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), Err(failure));
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch_once(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.pages.lock().unwrap().get(url).cloned();
        match reply {
            Some(Ok(body)) => Ok(FetchedPage {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                body,
            }),
            Some(Err(failure)) => Err(failure),
            None => Err(FetchFailure::Status(404)),
        }
    }
}

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub fn search_url(sku: &str) -> String {
    format!("{ORIGIN}/en/search/?q={sku}")
}

/// Single root sitemap at `/sitemap.xml`.
pub fn config() -> ResolverConfig {
    let mut config = ResolverConfig::for_origin(ORIGIN);
    config.root_sitemaps = vec![url("/sitemap.xml")];
    config
}

pub fn client(site: Arc<FakeSite>) -> FetchClient {
    FetchClient::new(
        site,
        RetryPolicy {
            max_retries: 0,
            backoff_step: Duration::ZERO,
        },
    )
}

pub fn urlset(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<url><loc>{loc}</loc></url>"))
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><urlset>{entries}</urlset>"#)
}

pub fn og_page(image: &str) -> String {
    format!(r#"<html><head><meta property="og:image" content="{image}"></head></html>"#)
}
