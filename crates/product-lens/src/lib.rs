//! product-lens: best-effort product image and datasheet resolution for manufacturer SKUs.
//!
//! A [`Resolver`] tries a cascade of increasingly expensive strategies:
//! hand-curated overrides, a lazily crawled sitemap index, then the
//! manufacturer's own site search. Every network call is bounded by a
//! timeout and a small retry budget, and no upstream failure is fatal.

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod index;
pub mod inspector;
pub mod overrides;
pub mod pim;
pub mod resolver;
pub mod search;
pub mod sitemap;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{populate, PopulateOptions, PopulateReport, Product};
pub use config::{CrawlLimits, OverrideSource, ResolverConfig};
pub use fetch::{fetch_with_retry, FetchClient, FetchedPage, Fetcher, HttpFetcher, RetryPolicy};
pub use index::SitemapIndex;
pub use inspector::{ImageExtractor, PageInspector, PatternExtractor};
pub use overrides::{OverrideStore, OverrideTable};
pub use pim::PimLookup;
pub use resolver::Resolver;
pub use search::SiteSearch;
pub use sitemap::{CrawlReport, StopReason};
pub use types::*;
