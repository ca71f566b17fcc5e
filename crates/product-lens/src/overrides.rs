//! Hand-curated SKU → image/page overrides.
//!
//! The backing document is a JSON object keyed by SKU whose values are
//! `{ "page"?: url, "image"?: url }`. It is loaded once per process and never
//! re-read; a restart is the refresh mechanism. A failed load degrades to an
//! empty table because overrides are an optimisation, not a dependency.

use crate::config::OverrideSource;
use crate::fetch::FetchClient;
use crate::types::{OverrideEntry, ResolveError, ResolveResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Parsed override document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: HashMap<String, OverrideEntry>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, OverrideEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parse the override document. `null` is accepted as an empty table.
    pub fn from_json(text: &str) -> ResolveResult<Self> {
        let parsed: Option<HashMap<String, OverrideEntry>> = serde_json::from_str(text)
            .map_err(|e| ResolveError::malformed("override document", e))?;
        Ok(Self {
            entries: parsed.unwrap_or_default(),
        })
    }

    /// Load from the configured source. `OverrideSource::None` yields an empty table.
    pub async fn load(
        source: &OverrideSource,
        client: &FetchClient,
        timeout: Duration,
    ) -> ResolveResult<Self> {
        let text = match source {
            OverrideSource::None => return Ok(Self::empty()),
            OverrideSource::Url(url) => client.get_text(url, timeout).await?,
            OverrideSource::File(path) => tokio::fs::read_to_string(path).await?,
        };
        Self::from_json(&text)
    }

    /// Exact key, then upper-case, then lower-case. First hit wins.
    pub fn lookup(&self, sku: &str) -> Option<&OverrideEntry> {
        self.entries
            .get(sku)
            .or_else(|| self.entries.get(&sku.to_uppercase()))
            .or_else(|| self.entries.get(&sku.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Loaded {
    table: Arc<OverrideTable>,
    error: Option<ResolveError>,
}

/// Process-lifetime cache of the override table.
pub struct OverrideStore {
    source: OverrideSource,
    client: FetchClient,
    timeout: Duration,
    cell: OnceCell<Loaded>,
}

impl OverrideStore {
    /// A store that loads `source` lazily on first use.
    pub fn new(source: OverrideSource, client: FetchClient, timeout: Duration) -> Self {
        Self {
            source,
            client,
            timeout,
            cell: OnceCell::new(),
        }
    }

    /// A store that never touches the network.
    pub fn preloaded(table: OverrideTable, client: FetchClient) -> Self {
        Self {
            source: OverrideSource::None,
            client,
            timeout: Duration::ZERO,
            cell: OnceCell::new_with(Some(Loaded {
                table: Arc::new(table),
                error: None,
            })),
        }
    }

    /// The cached table, loading it on first call.
    pub async fn table(&self) -> Arc<OverrideTable> {
        let loaded = self
            .cell
            .get_or_init(|| async {
                match OverrideTable::load(&self.source, &self.client, self.timeout).await {
                    Ok(table) => {
                        info!("loaded {} override entries", table.len());
                        Loaded {
                            table: Arc::new(table),
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!("override table unavailable, continuing without it: {e}");
                        Loaded {
                            table: Arc::new(OverrideTable::empty()),
                            error: Some(e),
                        }
                    }
                }
            })
            .await;
        Arc::clone(&loaded.table)
    }

    pub async fn lookup(&self, sku: &str) -> Option<OverrideEntry> {
        self.table().await.lookup(sku).cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Why the load degraded to an empty table, if it did.
    pub fn load_error(&self) -> Option<ResolveError> {
        self.cell.get().and_then(|loaded| loaded.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RetryPolicy;
    use crate::test_support::ScriptedFetcher;
    use crate::types::FetchFailure;
    use std::io::Write;

    const DOC_URL: &str = "https://shop.example/overrides.json";

    fn client(fetcher: Arc<ScriptedFetcher>) -> FetchClient {
        FetchClient::new(
            fetcher,
            RetryPolicy {
                max_retries: 0,
                backoff_step: Duration::ZERO,
            },
        )
    }

    fn entry(page: Option<&str>, image: Option<&str>) -> OverrideEntry {
        OverrideEntry {
            page: page.map(str::to_string),
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_lookup_case_variants() {
        let table = OverrideTable::from_entries([
            ("XNP-C6403R", entry(None, Some("http://img/a.png"))),
            ("qnv-6012r", entry(Some("http://page/q"), None)),
        ]);

        assert!(table.lookup("XNP-C6403R").is_some());
        assert!(table.lookup("xnp-c6403r").is_some(), "upper-case fallback");
        assert!(table.lookup("QNV-6012R").is_some(), "lower-case fallback");
        assert!(table.lookup("Xnp-C6403r").is_some());
        assert!(table.lookup("XNP-C6403").is_none(), "no fuzzy matching");
    }

    #[test]
    fn test_exact_key_wins() {
        let table = OverrideTable::from_entries([
            ("Abc", entry(None, Some("exact"))),
            ("ABC", entry(None, Some("upper"))),
        ]);
        assert_eq!(table.lookup("Abc").unwrap().image(), Some("exact"));
        assert_eq!(table.lookup("abc").unwrap().image(), Some("upper"));
    }

    #[test]
    fn test_from_json() {
        let table = OverrideTable::from_json(
            r#"{"XNP-1": {"image": "http://img/1.png"}, "XNP-2": {"page": "http://p/2"}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(OverrideTable::from_json("null").unwrap().is_empty());

        let err = OverrideTable::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedResponse { .. }));
        assert!(OverrideTable::from_json("{not json").is_err());
    }

    #[tokio::test]
    async fn test_store_loads_once() {
        let fetcher =
            Arc::new(ScriptedFetcher::new().page(DOC_URL, r#"{"XNP-1": {"image": "http://i"}}"#));
        let store = OverrideStore::new(
            OverrideSource::Url(DOC_URL.into()),
            client(fetcher.clone()),
            Duration::from_secs(1),
        );

        assert!(!store.is_loaded());
        assert!(store.lookup("xnp-1").await.is_some());
        assert!(store.lookup("XNP-2").await.is_none());
        assert!(store.lookup("XNP-1").await.is_some());
        assert_eq!(fetcher.calls_to(DOC_URL), 1);
        assert!(store.load_error().is_none());
    }

    #[tokio::test]
    async fn test_store_degrades_on_fetch_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new().fail(DOC_URL, FetchFailure::Status(500)));
        let store = OverrideStore::new(
            OverrideSource::Url(DOC_URL.into()),
            client(fetcher.clone()),
            Duration::from_secs(1),
        );

        assert!(store.table().await.is_empty());
        assert!(matches!(
            store.load_error(),
            Some(ResolveError::UpstreamUnavailable { .. })
        ));
        // Stale forever: a failed load is not retried.
        store.table().await;
        assert_eq!(fetcher.calls_to(DOC_URL), 1);
    }

    #[tokio::test]
    async fn test_store_degrades_on_malformed_document() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(DOC_URL, "<html>oops</html>"));
        let store = OverrideStore::new(
            OverrideSource::Url(DOC_URL.into()),
            client(fetcher),
            Duration::from_secs(1),
        );
        assert!(store.table().await.is_empty());
        assert!(matches!(
            store.load_error(),
            Some(ResolveError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"SNO-1": {{"page": "http://p/sno-1"}}}}"#).unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        let table = OverrideTable::load(
            &OverrideSource::File(file.path().to_path_buf()),
            &client(fetcher.clone()),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(table.lookup("sno-1").unwrap().page(), Some("http://p/sno-1"));
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let err = OverrideTable::load(
            &OverrideSource::File("/definitely/not/here.json".into()),
            &client(fetcher),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolveError::Io(_)));
    }
}
