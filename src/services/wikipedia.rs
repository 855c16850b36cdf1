//! Wikipedia page-summary lookup client.
//!
//! Fetches the REST v1 page summary for a landmark name, with a
//! read-through cache keyed by the outbound URL. Failures surface as
//! `LookupError` for the caller to absorb; they are never cached, so a
//! later request can retry the network.

use crate::services::cache::SummaryCache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fallback text used when no summary can be produced.
pub const NO_DESCRIPTION: &str = "No description available";

/// Error type for summary lookups.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Lookup timed out")]
    Timeout,

    #[error("Lookup returned status {0}")]
    Status(StatusCode),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

/// Summary of an encyclopedia page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Extract text describing the page subject.
    pub summary: String,

    /// Canonical desktop page URL. Empty when the API did not provide one.
    pub page: String,
}

impl PageSummary {
    /// Sentinel returned to callers when lookup fails entirely.
    pub fn unavailable() -> Self {
        Self {
            summary: NO_DESCRIPTION.to_string(),
            page: String::new(),
        }
    }
}

/// Wikipedia client configuration.
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    /// Base URL; the encoded landmark name is appended as one path segment.
    pub api_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// Client for the Wikipedia page-summary API.
pub struct WikipediaClient {
    config: WikipediaConfig,
    client: Client,
    cache: Arc<dyn SummaryCache>,
}

impl WikipediaClient {
    pub fn new(config: WikipediaConfig, cache: Arc<dyn SummaryCache>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            cache,
        }
    }

    /// Lookup URL for a landmark name, with the name percent-encoded as a
    /// single path segment. Doubles as the cache key.
    fn summary_url(&self, name: &str) -> String {
        format!("{}/{}", self.config.api_url, urlencoding::encode(name))
    }

    /// Fetch the page summary for a landmark name.
    ///
    /// Read-through: a cached summary within its expiry window answers
    /// without an outbound call, and only successful lookups are stored.
    /// Cache failures are logged and treated as misses.
    pub async fn lookup(&self, name: &str) -> Result<PageSummary, LookupError> {
        let url = self.summary_url(name);

        match self.cache.get(&url).await {
            Ok(Some(cached)) => {
                tracing::debug!(url = %url, "Summary cache hit");
                metrics::counter!("summary_cache_hits_total").increment(1);
                return Ok(cached);
            }
            Ok(None) => {
                metrics::counter!("summary_cache_misses_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Summary cache read failed");
            }
        }

        let summary = self.fetch(&url).await?;

        if let Err(e) = self.cache.put(&url, &summary).await {
            tracing::warn!(url = %url, error = %e, "Summary cache write failed");
        }

        Ok(summary)
    }

    async fn fetch(&self, url: &str) -> Result<PageSummary, LookupError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }

        let body: SummaryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::InvalidBody(e.to_string())
            }
        })?;

        Ok(to_page_summary(body))
    }
}

/// Apply per-field fallbacks: missing extract text becomes the sentinel,
/// missing page link becomes the empty string.
fn to_page_summary(body: SummaryResponse) -> PageSummary {
    PageSummary {
        summary: body.extract.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        page: body
            .content_urls
            .and_then(|c| c.desktop)
            .and_then(|d| d.page)
            .unwrap_or_default(),
    }
}

// ============================================================================
// Wikipedia REST v1 Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PlatformUrls>,
}

#[derive(Debug, Deserialize)]
struct PlatformUrls {
    #[serde(default)]
    page: Option<String>,
}
