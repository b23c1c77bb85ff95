//! Community dataset catalog: loader, keyword index, and matcher.
//!
//! The catalog is a single unstructured JSON document hosted at a fixed
//! public URL.  [`CatalogService`] owns the HTTP client plus the memoized
//! catalog/vocabulary state: the first successful fetch is cached for the
//! process lifetime, while a failed fetch yields an empty catalog for that
//! call only and never poisons the cache.

pub mod keywords;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
pub use search::{DatasetSummary, SearchOutcome, MAX_RESULTS};

/// One dataset entry as found in the source document.
///
/// The source has no formal schema, so every field is optional.  A record
/// missing `id`, `title`, or `sample_code_url` stays in the catalog (its
/// text still feeds the vocabulary) but is excluded from search results.
#[derive(Debug, Clone, Default)]
pub struct CatalogRecord {
    /// Externally assigned unique identifier, treated as opaque.
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Link used as the dataset's page reference for enrichment.
    pub sample_code_url: Option<String>,
}

impl CatalogRecord {
    /// Extract the consumed fields from a raw catalog entry.
    ///
    /// Non-string values for a field are treated as absent rather than
    /// failing the whole catalog.
    fn from_value(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            id: field("id"),
            title: field("title"),
            description: field("description"),
            sample_code_url: field("sample_code_url"),
        }
    }
}

/// Memoized result of one successful catalog load.
struct CatalogState {
    records: Vec<CatalogRecord>,
    keywords: Vec<String>,
}

/// Owns the catalog HTTP client and the once-successful cache.
pub struct CatalogService {
    url: String,
    client: reqwest::Client,
    state: RwLock<Option<Arc<CatalogState>>>,
}

impl CatalogService {
    pub fn new(cfg: &CatalogConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            url: cfg.url.clone(),
            client,
            state: RwLock::new(None),
        }
    }

    /// Return the catalog, fetching it on first use.
    ///
    /// Transport and format failures yield an empty catalog for this call;
    /// the next call retries the fetch.
    pub async fn load(&self) -> Vec<CatalogRecord> {
        match self.ensure_loaded().await {
            Some(state) => state.records.clone(),
            None => Vec::new(),
        }
    }

    /// Return the cached keyword vocabulary, forcing a load if needed.
    ///
    /// `None` means the catalog has never been fetched successfully this
    /// process — "tried and failed", distinct from a loaded catalog that
    /// happens to produce zero tokens.
    pub async fn get_keywords(&self) -> Option<Vec<String>> {
        self.ensure_loaded().await.map(|s| s.keywords.clone())
    }

    /// Run a keyword search against the cached catalog.
    pub async fn search(&self, matched_keywords: &[String]) -> SearchOutcome {
        match self.ensure_loaded().await {
            Some(state) => search::search(&state.records, matched_keywords),
            None => {
                if matched_keywords.is_empty() {
                    SearchOutcome::NoValidKeywords
                } else {
                    SearchOutcome::CatalogUnavailable
                }
            }
        }
    }

    /// Whether a successful load is cached.
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Drop the cached catalog so the next call re-fetches.
    ///
    /// Unused by the request path today; kept so the cache lifetime is an
    /// explicit, testable hook rather than ambient state.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    async fn ensure_loaded(&self) -> Option<Arc<CatalogState>> {
        if let Some(state) = self.state.read().await.clone() {
            return Some(state);
        }
        match self.fetch_and_normalize().await {
            Ok(records) => {
                let keywords = keywords::build_keywords(&records);
                debug!(
                    records = records.len(),
                    keywords = keywords.len(),
                    "catalog loaded"
                );
                let fresh = Arc::new(CatalogState { records, keywords });
                let mut guard = self.state.write().await;
                // First successful load wins under concurrent cold start.
                if guard.is_none() {
                    *guard = Some(fresh);
                }
                guard.clone()
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "catalog fetch failed");
                None
            }
        }
    }

    /// Fetch the catalog document and flatten it into an ordered record
    /// sequence.  Accepted shapes: a top-level array, or an object whose
    /// `datasets` field is an array.
    async fn fetch_and_normalize(&self) -> anyhow::Result<Vec<CatalogRecord>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("catalog request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("catalog source returned {status}");
        }

        let doc: Value = resp
            .json()
            .await
            .context("catalog document is not valid JSON")?;

        let entries = match &doc {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => match map.get("datasets").and_then(Value::as_array) {
                Some(items) => items.as_slice(),
                None => anyhow::bail!(
                    "catalog document is an object without a `datasets` array"
                ),
            },
            _ => anyhow::bail!("unexpected catalog document shape"),
        };

        Ok(entries.iter().map(CatalogRecord::from_value).collect())
    }
}
