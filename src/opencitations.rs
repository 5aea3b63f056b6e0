//! OpenCitations (COCI) index client.
//!
//! The metadata endpoint takes one or more DOIs joined with `__` as a path
//! parameter and returns one record per DOI, including the `; `-separated list
//! of DOIs citing that work.
//!
//! API: https://opencitations.net/index/coci/api/v1/metadata/{dois}
//! Access token: https://opencitations.net/accesstoken

use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// COCI API base URL
pub const COCI_API_BASE: &str = "https://opencitations.net/index/coci/api/v1";

/// Separator for batching several DOIs into one metadata lookup
const DOI_SEPARATOR: &str = "__";

/// Metadata record for a single work
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub doi: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Publication year as reported by the index (may be empty)
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: String,
    /// DOIs of citing works, `; `-separated (may be empty)
    #[serde(default, deserialize_with = "lenient_string")]
    pub citation: String,
}

/// Accept strings, numbers and `null` for fields the index is loose about.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// A citation index able to resolve metadata for a set of DOIs.
#[async_trait]
pub trait CitationIndex {
    /// Look up metadata for all `dois` in one call.
    ///
    /// A non-success answer is a `MetricsError::Api`, never an empty list.
    async fn metadata(&self, dois: &[String]) -> Result<Vec<WorkMetadata>>;
}

/// HTTP client for the COCI metadata endpoint
pub struct OpenCitationsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl OpenCitationsClient {
    /// Create a client for the public COCI API
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(COCI_API_BASE, token)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(base_url: &str, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("bidsmetrics/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MetricsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn metadata_url(&self, dois: &[String]) -> String {
        format!("{}/metadata/{}", self.base_url, dois.join(DOI_SEPARATOR))
    }
}

#[async_trait]
impl CitationIndex for OpenCitationsClient {
    async fn metadata(&self, dois: &[String]) -> Result<Vec<WorkMetadata>> {
        if dois.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.metadata_url(dois);
        debug!(url = %url, count = dois.len(), "Querying COCI metadata");

        let response = self
            .client
            .get(&url)
            .header("authorization", &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), count = dois.len(), "COCI metadata lookup failed");
            return Err(MetricsError::from_status(status, "OpenCitations"));
        }

        let records: Vec<WorkMetadata> = response.json().await.map_err(|e| {
            MetricsError::Parse(format!("Failed to parse COCI response: {}", e))
        })?;

        Ok(records)
    }
}
