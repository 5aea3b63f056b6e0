//! Citation counts per year for a list of papers.
//!
//! For each paper the citing DOIs are resolved in one bulk metadata lookup.
//! If that lookup fails, each citing DOI is looked up on its own instead.

use crate::config::PaperList;
use crate::error::Result;
use crate::opencitations::CitationIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One cached row: citations received by a paper in one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRow {
    pub papers: String,
    pub years: i32,
    pub nb_citations: u32,
}

/// Which resolution tier produced a year count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// All citing DOIs resolved in a single lookup
    Bulk,
    /// Bulk lookup failed; citing DOIs resolved one at a time
    PerItem,
}

/// Citation counts per year, with the tier that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationYears {
    pub counts: BTreeMap<i32, u32>,
    pub strategy: ResolutionStrategy,
}

/// Split the index's `; `-separated citation field into DOIs.
pub fn split_citing_dois(field: &str) -> Vec<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|doi| !doi.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count occurrences of each year. Entries that are not a year are skipped.
pub fn count_by_year<'a, I>(years: I) -> BTreeMap<i32, u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for year in years {
        match year.trim().parse::<i32>() {
            Ok(year) => *counts.entry(year).or_insert(0) += 1,
            Err(_) => debug!(year = year, "Skipping citation without a usable year"),
        }
    }
    counts
}

/// Resolve the publication years of `citing` DOIs and count them per year.
pub async fn citations_per_year<I>(index: &I, citing: &[String]) -> CitationYears
where
    I: CitationIndex + Sync + ?Sized,
{
    match index.metadata(citing).await {
        Ok(records) => CitationYears {
            counts: count_by_year(records.iter().map(|r| r.year.as_str())),
            strategy: ResolutionStrategy::Bulk,
        },
        Err(e) => {
            warn!(count = citing.len(), error = %e, "Bulk lookup failed, querying papers one by one");

            let mut years = Vec::with_capacity(citing.len());
            for doi in citing {
                debug!(doi = %doi, "Querying citing paper");
                match index.metadata(std::slice::from_ref(doi)).await {
                    Ok(records) => match records.into_iter().next() {
                        Some(record) => years.push(record.year),
                        None => debug!(doi = %doi, "No metadata for citing paper"),
                    },
                    Err(e) => warn!(doi = %doi, error = %e, "Citing paper lookup failed"),
                }
            }

            CitationYears {
                counts: count_by_year(years.iter().map(String::as_str)),
                strategy: ResolutionStrategy::PerItem,
            }
        }
    }
}

/// Build per-year citation rows for every paper in `papers`.
///
/// A paper whose own lookup fails, or that has no recorded citations,
/// contributes no rows.
pub async fn query_papers<I>(index: &I, papers: &PaperList) -> Result<Vec<CitationRow>>
where
    I: CitationIndex + Sync + ?Sized,
{
    let mut rows = Vec::new();

    for paper in papers.iter() {
        info!(paper = %paper.name, doi = %paper.doi, "Querying citations");

        let records = match index.metadata(std::slice::from_ref(&paper.doi)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(paper = %paper.name, error = %e, "Paper lookup failed, skipping");
                continue;
            }
        };

        let citing = records
            .first()
            .map(|r| split_citing_dois(&r.citation))
            .unwrap_or_default();
        if citing.is_empty() {
            info!(paper = %paper.name, "No citations recorded");
            continue;
        }

        let years = citations_per_year(index, &citing).await;
        info!(
            paper = %paper.name,
            citing = citing.len(),
            years = years.counts.len(),
            strategy = ?years.strategy,
            "Counted citations"
        );

        rows.extend(years.counts.into_iter().map(|(year, count)| CitationRow {
            papers: paper.name.clone(),
            years: year,
            nb_citations: count,
        }));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::opencitations::WorkMetadata;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory index. Lookups of more than one DOI fail when `bulk_fails`.
    #[derive(Default)]
    struct FakeIndex {
        works: HashMap<String, WorkMetadata>,
        bulk_fails: bool,
        calls: Mutex<Vec<usize>>,
    }

    impl FakeIndex {
        fn with_work(mut self, doi: &str, year: &str, citation: &str) -> Self {
            self.works.insert(
                doi.to_string(),
                WorkMetadata {
                    doi: doi.to_string(),
                    year: year.to_string(),
                    citation: citation.to_string(),
                    ..Default::default()
                },
            );
            self
        }

        fn call_sizes(&self) -> Vec<usize> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CitationIndex for FakeIndex {
        async fn metadata(&self, dois: &[String]) -> Result<Vec<WorkMetadata>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(dois.len());
            }
            if self.bulk_fails && dois.len() > 1 {
                return Err(MetricsError::Api { code: 414, message: "URI too long".to_string() });
            }
            if dois.iter().any(|d| d == "10.9/broken") {
                return Err(MetricsError::Api { code: 500, message: "boom".to_string() });
            }
            Ok(dois.iter().filter_map(|d| self.works.get(d).cloned()).collect())
        }
    }

    fn dois(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_count_by_year() {
        let counts = count_by_year(["2019", "2019", "2020"]);
        assert_eq!(counts, BTreeMap::from([(2019, 2), (2020, 1)]));
    }

    #[test]
    fn test_count_by_year_skips_blank() {
        let counts = count_by_year(["", "2021", "n/a"]);
        assert_eq!(counts, BTreeMap::from([(2021, 1)]));
    }

    #[test]
    fn test_split_citing_dois() {
        assert_eq!(
            split_citing_dois("10.1/a; 10.1/b;10.1/c; "),
            dois(&["10.1/a", "10.1/b", "10.1/c"])
        );
        assert!(split_citing_dois("").is_empty());
    }

    #[tokio::test]
    async fn test_bulk_resolution() {
        let index = FakeIndex::default()
            .with_work("10.2/x", "2019", "")
            .with_work("10.2/y", "2019", "")
            .with_work("10.2/z", "2020", "");

        let years = citations_per_year(&index, &dois(&["10.2/x", "10.2/y", "10.2/z"])).await;

        assert_eq!(years.strategy, ResolutionStrategy::Bulk);
        assert_eq!(years.counts, BTreeMap::from([(2019, 2), (2020, 1)]));
        assert_eq!(index.call_sizes(), vec![3]);
    }

    #[tokio::test]
    async fn test_falls_back_to_per_item() {
        let index = FakeIndex {
            bulk_fails: true,
            ..Default::default()
        }
        .with_work("10.2/x", "2019", "")
        .with_work("10.2/y", "2020", "");

        let years =
            citations_per_year(&index, &dois(&["10.2/x", "10.9/broken", "10.2/y", "10.2/missing"])).await;

        assert_eq!(years.strategy, ResolutionStrategy::PerItem);
        assert_eq!(years.counts, BTreeMap::from([(2019, 1), (2020, 1)]));
        assert_eq!(index.call_sizes(), vec![4, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_query_papers_rows() -> Result<()> {
        let index = FakeIndex::default()
            .with_work("10.1/bids", "2016", "10.2/x; 10.2/y; 10.2/z")
            .with_work("10.1/quiet", "2022", "")
            .with_work("10.2/x", "2019", "")
            .with_work("10.2/y", "2019", "")
            .with_work("10.2/z", "2020", "");

        let mut papers = PaperList::default();
        papers.push("BIDS", "10.1/bids")?;
        papers.push("Quiet", "10.1/quiet")?;
        papers.push("Broken", "10.9/broken")?;

        let rows = query_papers(&index, &papers).await?;

        assert_eq!(
            rows,
            vec![
                CitationRow { papers: "BIDS".to_string(), years: 2019, nb_citations: 2 },
                CitationRow { papers: "BIDS".to_string(), years: 2020, nb_citations: 1 },
            ]
        );
        Ok(())
    }
}
