//! OpenNeuro GraphQL client and dataset paginator.
//!
//! The `datasets` connection is walked with the cursor of the last edge of
//! each page. The API serves pages of 25 edges; a shorter page is taken as
//! the last one. If the API ever returned a short page that was not the last,
//! the remaining datasets would be silently missed.

use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenNeuro base URL
pub const OPENNEURO_BASE: &str = "https://openneuro.org";

/// Edges per full page
pub const PAGE_SIZE: usize = 25;

/// Fields requested for every dataset
const DATASET_FIELDS: &str = "{ edges { cursor, node { id, publishDate, latestSnapshot { tag, \
dataset { name, publishDate, metadata { trialCount, studyDesign, studyDomain, studyLongitudinal, \
dataProcessed, species, associatedPaperDOI, openneuroPaperDOI, dxStatus } }, \
description { SeniorAuthor }, \
summary { subjects, modalities, secondaryModalities, subjectMetadata { age }, tasks, dataProcessed } } } } }";

/// Treat an explicit `null` like a missing field
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEdge {
    #[serde(default)]
    pub cursor: Option<String>,
    pub node: DatasetNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetNode {
    pub id: String,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub latest_snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_default")]
    pub tag: String,
    #[serde(default)]
    pub dataset: Option<SnapshotDataset>,
    #[serde(default)]
    pub description: Option<Description>,
    #[serde(default)]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDataset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub metadata: Option<DatasetMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub trial_count: Option<serde_json::Number>,
    pub study_design: Option<String>,
    pub study_domain: Option<String>,
    pub study_longitudinal: Option<String>,
    pub data_processed: Option<bool>,
    pub species: Option<String>,
    #[serde(rename = "associatedPaperDOI")]
    pub associated_paper_doi: Option<String>,
    #[serde(rename = "openneuroPaperDOI")]
    pub openneuro_paper_doi: Option<String>,
    pub dx_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    #[serde(rename = "SeniorAuthor", default)]
    pub senior_author: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default, deserialize_with = "null_default")]
    pub subjects: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub modalities: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub secondary_modalities: Vec<String>,
    #[serde(default)]
    pub subject_metadata: Option<Vec<SubjectMetadata>>,
    #[serde(default, deserialize_with = "null_default")]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectMetadata {
    #[serde(default)]
    pub age: Option<f64>,
}

/// A source of dataset pages
#[async_trait]
pub trait DatasetPageSource {
    /// Fetch the page following cursor `after`, or the first page.
    async fn fetch_page(&self, after: Option<&str>) -> Result<Vec<DatasetEdge>>;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    datasets: DatasetConnection,
}

#[derive(Debug, Deserialize)]
struct DatasetConnection {
    #[serde(default)]
    edges: Vec<DatasetEdge>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Build the `datasets` query, starting after `after` if given
pub fn datasets_query(after: Option<&str>) -> String {
    let selector = match after {
        Some(cursor) => format!("datasets(after: {})", serde_json::Value::from(cursor)),
        None => "datasets".to_string(),
    };
    format!("query testq{{{} {}}}", selector, DATASET_FIELDS)
}

pub struct OpenNeuroClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenNeuroClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPENNEURO_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("bidsmetrics/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MetricsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DatasetPageSource for OpenNeuroClient {
    async fn fetch_page(&self, after: Option<&str>) -> Result<Vec<DatasetEdge>> {
        let url = format!("{}/crn/graphql", self.base_url);
        let body = serde_json::json!({ "query": datasets_query(after) });

        debug!(url = %url, after = ?after, "Fetching OpenNeuro page");
        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("Origin", OPENNEURO_BASE)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsError::from_status(status, "OpenNeuro"));
        }

        let response: GraphQlResponse = response.json().await.map_err(|e| {
            MetricsError::Parse(format!("Failed to parse OpenNeuro response: {}", e))
        })?;

        match response.data {
            Some(data) => Ok(data.datasets.edges),
            None => Err(MetricsError::Parse(format!(
                "OpenNeuro returned no data: {}",
                response
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            ))),
        }
    }
}

/// Walk all pages and key the datasets by accession number.
///
/// A dataset seen twice keeps its latest edge.
pub async fn collect_datasets<S>(source: &S) -> Result<BTreeMap<String, DatasetEdge>>
where
    S: DatasetPageSource + Sync + ?Sized,
{
    let mut datasets = BTreeMap::new();
    let mut after: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let edges = source.fetch_page(after.as_deref()).await?;
        pages += 1;
        let page_len = edges.len();
        let next = edges.last().and_then(|e| e.cursor.clone());

        for edge in edges {
            datasets.insert(edge.node.id.clone(), edge);
        }

        if page_len < PAGE_SIZE {
            debug!(page_len = page_len, "Short page, assuming it is the last");
            break;
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => {
                warn!(page = pages, "Full page without a cursor, stopping");
                break;
            }
        }
    }

    info!(pages = pages, datasets = datasets.len(), "Collected OpenNeuro datasets");
    Ok(datasets)
}
