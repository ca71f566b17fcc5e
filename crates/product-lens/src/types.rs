//! Core data types and the error taxonomy for SKU resolution.

use serde::{Deserialize, Serialize};

/// Which stage of the cascade produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Override,
    Sitemap,
    SiteSearch,
    None,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Override => "override",
            Source::Sitemap => "sitemap",
            Source::SiteSearch => "site-search",
            Source::None => "none",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer for one SKU. Built once by the resolver and never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub sku: String,
    pub image: Option<String>,
    pub datasheet: Option<String>,
    pub source: Source,
    /// Only present when the caller asked for a debug trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

impl ResolutionResult {
    /// The successful-but-empty outcome.
    pub fn not_found(sku: &str) -> Self {
        Self {
            sku: sku.to_string(),
            image: None,
            datasheet: None,
            source: Source::None,
            trace: None,
        }
    }
}

/// A hand-curated image/page mapping for one SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OverrideEntry {
    /// An entry with neither field set does not count as an override.
    pub fn is_empty(&self) -> bool {
        blank(self.page.as_deref()) && blank(self.image.as_deref())
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn page(&self) -> Option<&str> {
        self.page.as_deref().filter(|s| !s.trim().is_empty())
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

/// Why a single fetch attempt failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// All errors the resolver can report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream unavailable after {attempts} attempt(s) for {url}: {last}")]
    UpstreamUnavailable {
        url: String,
        attempts: u32,
        last: FetchFailure,
    },

    #[error("Malformed {what}: {reason}")]
    MalformedResponse { what: String, reason: String },

    #[error("Internal failure: {0}")]
    InternalFailure(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ResolveError {
    /// HTTP-equivalent status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ResolveError::InvalidInput(_) => 400,
            ResolveError::UpstreamUnavailable { .. } => 502,
            ResolveError::MalformedResponse { .. }
            | ResolveError::InternalFailure(_)
            | ResolveError::Io(_) => 500,
        }
    }

    pub fn malformed(what: &str, reason: impl std::fmt::Display) -> Self {
        ResolveError::MalformedResponse {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(e: std::io::Error) -> Self {
        ResolveError::Io(e.to_string())
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
