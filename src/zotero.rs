//! Zotero group library client.
//!
//! Builds a [`PaperList`] from the top-level items of a public group library,
//! so the tracked papers can be curated in Zotero instead of a local file.

use crate::config::PaperList;
use crate::error::{MetricsError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Zotero web API base URL
pub const ZOTERO_API_BASE: &str = "https://api.zotero.org";

/// Items per page (Zotero maximum)
const PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct ZoteroItem {
    data: ZoteroItemData,
}

#[derive(Debug, Deserialize)]
struct ZoteroItemData {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "shortTitle", default)]
    short_title: Option<String>,
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

pub struct ZoteroClient {
    client: reqwest::Client,
    base_url: String,
}

impl ZoteroClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(ZOTERO_API_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("bidsmetrics/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MetricsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every top-level item of group `group_id` that carries a DOI.
    ///
    /// Items are named by their short title, falling back to the full title.
    pub async fn top_items(&self, group_id: &str) -> Result<PaperList> {
        let url = format!("{}/groups/{}/items/top", self.base_url, group_id);
        let mut papers = PaperList::default();
        let mut start = 0usize;

        loop {
            debug!(url = %url, start = start, "Fetching Zotero page");
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("format", "json".to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("start", start.to_string()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(MetricsError::from_status(status, "Zotero"));
            }

            let items: Vec<ZoteroItem> = response.json().await.map_err(|e| {
                MetricsError::Parse(format!("Failed to parse Zotero response: {}", e))
            })?;
            let page_len = items.len();

            for item in items {
                let name = item
                    .data
                    .short_title
                    .filter(|t| !t.trim().is_empty())
                    .or(item.data.title)
                    .unwrap_or_default();
                match item.data.doi.filter(|d| !d.trim().is_empty()) {
                    Some(doi) if !name.is_empty() => papers.push(name, doi)?,
                    _ => debug!(title = %name, "Skipping item without title or DOI"),
                }
            }

            if page_len < PAGE_LIMIT {
                break;
            }
            start += page_len;
        }

        info!(group = group_id, papers = papers.len(), "Loaded papers from Zotero");
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_top_items_names_and_skips() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/groups/5111637/items/top")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".to_string(), "json".to_string()),
                Matcher::UrlEncoded("start".to_string(), "0".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"key": "A", "data": {"title": "The brain imaging data structure", "shortTitle": "BIDS", "DOI": "10.1038/sdata.2016.44"}},
                    {"key": "B", "data": {"title": "MEG-BIDS, the brain imaging data structure extended to MEG", "shortTitle": "", "DOI": "10.1038/sdata.2018.110"}},
                    {"key": "C", "data": {"title": "A webpage", "DOI": ""}},
                    {"key": "D", "data": {"itemType": "note"}}
                ]"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = ZoteroClient::with_base_url(&server.url())?;
        let papers = client.top_items("5111637").await?;

        mock.assert_async().await;
        let names: Vec<&str> = papers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["BIDS", "MEG-BIDS, the brain imaging data structure extended to MEG"]
        );
        Ok(())
    }

    fn page_body(range: std::ops::Range<usize>) -> String {
        let items: Vec<serde_json::Value> = range
            .map(|i| {
                serde_json::json!({
                    "key": format!("K{}", i),
                    "data": {"title": format!("Paper {}", i), "DOI": format!("10.1000/p{}", i)}
                })
            })
            .collect();
        serde_json::Value::from(items).to_string()
    }

    #[tokio::test]
    async fn test_pages_until_short_page() -> Result<()> {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/groups/42/items/top")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".to_string(), "100".to_string()),
                Matcher::UrlEncoded("start".to_string(), "0".to_string()),
            ]))
            .with_status(200)
            .with_body(page_body(0..100))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/groups/42/items/top")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".to_string(), "100".to_string()),
                Matcher::UrlEncoded("start".to_string(), "100".to_string()),
            ]))
            .with_status(200)
            .with_body(page_body(100..103))
            .expect(1)
            .create_async()
            .await;

        let client = ZoteroClient::with_base_url(&server.url())?;
        let papers = client.top_items("42").await?;

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(papers.len(), 103);
        let names: Vec<&str> = papers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Paper 0"));
        assert_eq!(names.last(), Some(&"Paper 102"));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status() -> Result<()> {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/groups/1/items/top")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = ZoteroClient::with_base_url(&server.url())?;
        assert!(matches!(
            client.top_items("1").await,
            Err(MetricsError::Api { code: 403, .. })
        ));
        Ok(())
    }
}
