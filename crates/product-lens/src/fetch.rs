//! Async HTTP fetching wrapping reqwest.
//!
//! Not a browser, just GET requests. Every attempt carries its own timeout,
//! redirects are followed by the client before the status is checked, and
//! only a 2xx status counts as success. [`fetch_with_retry`] adds bounded
//! retry with linear backoff on top of a single [`Fetcher::fetch_once`].

use crate::config::ResolverConfig;
use crate::types::{FetchFailure, ResolveError, ResolveResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A successful (2xx) GET response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// One GET attempt. Implementations must not retry internally.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchFailure>;
}

/// Production fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher that sends `user_agent` on every request.
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(classify)?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Transport(e.to_string())
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts are `0..=max_retries`, so 2 means up to 3 requests.
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_step: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: `backoff_step × (attempt + 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }
}

/// Fetch `url`, retrying every failure until the policy is exhausted.
///
/// Sleeps only between attempts. On exhaustion the last observed failure is
/// returned inside [`ResolveError::UpstreamUnavailable`].
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
    policy: RetryPolicy,
) -> ResolveResult<FetchedPage> {
    let mut last = FetchFailure::Transport("no attempt made".to_string());

    for attempt in 0..=policy.max_retries {
        match fetcher.fetch_once(url, timeout).await {
            Ok(page) => {
                if attempt > 0 {
                    debug!("fetched {url} after {} attempts", attempt + 1);
                }
                return Ok(page);
            }
            Err(failure) => {
                debug!("attempt {} for {url} failed: {failure}", attempt + 1);
                last = failure;
            }
        }

        if attempt < policy.max_retries {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    warn!("giving up on {url}: {last}");
    Err(ResolveError::UpstreamUnavailable {
        url: url.to_string(),
        attempts: policy.max_retries + 1,
        last,
    })
}

/// A fetcher plus its retry policy, shared by every network-touching component.
#[derive(Clone)]
pub struct FetchClient {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Build an [`HttpFetcher`]-backed client from resolver settings.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            Arc::new(HttpFetcher::new(&config.user_agent)),
            RetryPolicy {
                max_retries: config.max_retries,
                backoff_step: config.backoff_step(),
            },
        )
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET with retry.
    pub async fn get(&self, url: &str, timeout: Duration) -> ResolveResult<FetchedPage> {
        fetch_with_retry(self.fetcher.as_ref(), url, timeout, self.policy).await
    }

    /// GET with retry, returning only the body.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> ResolveResult<String> {
        self.get(url, timeout).await.map(|page| page.body)
    }
}
