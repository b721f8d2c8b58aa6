//! Search capability: SearXNG client, snippet cleaning, and the on-disk
//! query cache.
//!
//! The aggregator and grounding engine talk to [`SearchClient`], which wraps
//! a `SearchProvider` trait object with a deterministic read-check /
//! write-through cache. Cache entries live until externally cleared.

use crate::error::SearchError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Query & result types
// ---------------------------------------------------------------------------

/// Topical category requested from the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    General,
    News,
}

impl SearchTopic {
    fn as_str(&self) -> &'static str {
        match self {
            SearchTopic::General => "general",
            SearchTopic::News => "news",
        }
    }
}

/// Recency window for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        }
    }

    /// Bucket a day count into the nearest backend window.
    pub fn from_days(days: u32) -> Self {
        match days {
            0..=1 => TimeRange::Day,
            2..=7 => TimeRange::Week,
            8..=30 => TimeRange::Month,
            _ => TimeRange::Year,
        }
    }
}

/// One search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub topic: SearchTopic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn general(text: impl Into<String>, max_results: usize) -> Self {
        Self {
            text: text.into(),
            topic: SearchTopic::General,
            time_range: None,
            max_results,
        }
    }

    pub fn news(text: impl Into<String>, range: TimeRange, max_results: usize) -> Self {
        Self {
            text: text.into(),
            topic: SearchTopic::News,
            time_range: Some(range),
            max_results,
        }
    }

    /// Deterministic cache key from the normalized query parameters.
    pub fn cache_key(&self) -> String {
        let range = self.time_range.map(|r| r.as_str()).unwrap_or("none");
        let raw = format!(
            "{}|{}|{}|{}",
            self.text.trim().to_lowercase(),
            self.topic.as_str(),
            range,
            self.max_results
        );
        let digest = Sha256::digest(raw.as_bytes());
        format!("{digest:x}")
    }
}

/// One search hit after snippet cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default)]
    pub score: f64,
}

/// Trait for the raw search capability.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError>;
}

// ---------------------------------------------------------------------------
// Snippet cleaning
// ---------------------------------------------------------------------------

static THEME_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(primary-color|pcsx-|varTheme|customTheme|themeOptions|font-family)")
        .expect("valid regex")
});

/// Remove JSON blobs, script noise, and theme data from extracted content.
pub fn clean_snippet(raw: &str) -> String {
    let mut cleaned = Vec::new();

    for line in raw.lines() {
        let stripped = line.trim();

        if stripped.is_empty() {
            continue;
        }
        // Lines that look like JSON/JS objects (theme configs, etc.)
        if stripped.starts_with('{') && stripped.contains("\":\"") {
            continue;
        }
        if THEME_NOISE.is_match(stripped) {
            continue;
        }
        // Mostly special characters
        let plain = stripped
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .count();
        if (plain as f64) < stripped.chars().count() as f64 * 0.4 {
            continue;
        }
        // Very short noise lines, but allow markdown headers & lists
        if stripped.chars().count() < 15 && !stripped.starts_with(['#', '-', '*', '>']) {
            continue;
        }

        cleaned.push(line);
    }
    cleaned.join("\n").trim().to_string()
}

// ---------------------------------------------------------------------------
// SearXNG client
// ---------------------------------------------------------------------------

/// Search provider backed by a self-hosted SearXNG instance.
pub struct SearxngClient {
    client: reqwest::Client,
    base_url: String,
}

impl SearxngClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::Request {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for SearxngClient {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.text.clone()),
            ("format", "json".to_string()),
            ("categories", query.topic.as_str().to_string()),
            ("pageno", "1".to_string()),
        ];
        if let Some(range) = query.time_range {
            params.push(("time_range", range.as_str().to_string()));
        }

        debug!(query = %query.text, topic = query.topic.as_str(), "SearXNG search");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Request {
                message: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamStatus {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let raw: serde_json::Value =
            response.json().await.map_err(|e| SearchError::BadResponse {
                message: format!("Invalid JSON: {e}"),
            })?;

        let items = raw
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let results: Vec<SearchResult> = items
            .iter()
            .take(query.max_results)
            .map(|r| {
                let content = r.get("content").and_then(|v| v.as_str()).unwrap_or("");
                SearchResult {
                    title: r
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    url: r
                        .get("url")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    snippet: clean_snippet(content),
                    score: r.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0),
                }
            })
            .collect();

        debug!(count = results.len(), "SearXNG returned results");
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// Search client combining a provider with an optional on-disk cache.
///
/// The cache is addressed by [`SearchQuery::cache_key`] and is
/// read-check/write-through with no invalidation. Cache IO failures are
/// logged and degrade to a live query; they never surface to callers.
pub struct SearchClient {
    provider: Arc<dyn SearchProvider>,
    cache_dir: Option<PathBuf>,
}

impl SearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            provider,
            cache_dir,
        }
    }

    /// Query through the cache: return a cached result set if present,
    /// otherwise hit the provider and store the result.
    pub async fn query_cached(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let key = query.cache_key();
        if let Some(cached) = self.load_cache(&key).await {
            info!(key = %key, "Search cache hit");
            return Ok(cached);
        }
        let results = self.provider.query(query).await?;
        self.save_cache(&key, &results).await;
        Ok(results)
    }

    /// Query the provider directly, never touching the cache. Follow-up
    /// grounding uses this so stale evidence is never reused across questions.
    pub async fn query_fresh(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.provider.query(query).await
    }

    fn cache_path(&self, key: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|d| d.join(format!("{key}.json")))
    }

    async fn load_cache(&self, key: &str) -> Option<Vec<SearchResult>> {
        let path = self.cache_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).ok(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    async fn save_cache(&self, key: &str, results: &[SearchResult]) {
        let Some(path) = self.cache_path(key) else {
            return;
        };
        if let Some(dir) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!(dir = %dir.display(), error = %e, "Failed to create search cache dir");
                return;
            }
        }
        match serde_json::to_string_pretty(results) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    warn!(path = %path.display(), error = %e, "Failed to write cache entry");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize cache entry"),
        }
    }
}
