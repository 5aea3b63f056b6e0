//! Flat OpenNeuro dataset rows and the cumulative growth series drawn from them.

use crate::error::{MetricsError, OptionExt, Result};
use crate::normalize::{display_date, format_ages, format_modalities, format_name, parse_date};
use crate::openneuro::{DatasetEdge, DatasetMetadata};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use url::Url;

/// Root of the public dataset pages
const DATASET_PAGE_ROOT: &str = "https://openneuro.org/datasets/";

/// One dataset, with column names matching the OpenNeuro metadata spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(rename = "AccessionNumber")]
    pub accession_number: String,
    #[serde(rename = "Dataset URL")]
    pub dataset_url: String,
    #[serde(rename = "Dataset name")]
    pub dataset_name: String,
    #[serde(rename = "ReleaseDate")]
    pub release_date: String,
    #[serde(rename = "Most recent snapshot date (MM/DD/YYYY)")]
    pub most_recent_snapshot_date: String,
    #[serde(rename = "NSubjects")]
    pub n_subjects: String,
    #[serde(rename = "Modalities")]
    pub modalities: String,
    #[serde(rename = "DX status(es)")]
    pub dx_status: String,
    #[serde(rename = "Ages (range)")]
    pub ages: String,
    #[serde(rename = "Tasks completed?")]
    pub tasks: String,
    #[serde(rename = "# of trials (if applicable)")]
    pub trial_count: String,
    #[serde(rename = "Study design")]
    pub study_design: String,
    #[serde(rename = "Domain studied")]
    pub domain_studied: String,
    #[serde(rename = "Longitudinal?")]
    pub longitudinal: String,
    #[serde(rename = "Processed data?")]
    pub processed_data: String,
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "DOI of paper associated with DS (from submitter lab)")]
    pub associated_paper_doi: String,
    #[serde(rename = "DOI of paper because DS on OpenNeuro")]
    pub openneuro_paper_doi: String,
    #[serde(rename = "Senior Author (lab that collected data) Last, First")]
    pub senior_author: String,
}

fn yes_no(flag: bool) -> String {
    let answer = if flag { "Yes" } else { "No" };
    answer.to_string()
}

fn dataset_url(accession: &str, tag: &str) -> Result<String> {
    let mut url = Url::parse(DATASET_PAGE_ROOT)
        .map_err(|e| MetricsError::Parse(format!("invalid dataset root: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| MetricsError::Parse("dataset root cannot take a path".to_string()))?
        .pop_if_empty()
        .extend([accession, "versions", tag]);
    Ok(url.to_string())
}

impl DatasetRow {
    pub fn from_edge(accession: &str, edge: &DatasetEdge) -> Result<Self> {
        let node = &edge.node;
        let snapshot = node.latest_snapshot.as_ref().ok_or_parse("dataset has no snapshot")?;
        let dataset = snapshot.dataset.as_ref().ok_or_parse("snapshot has no dataset")?;

        let release = parse_date(node.publish_date.as_deref().ok_or_parse("dataset has no publish date")?)?;
        let snapshot_date =
            parse_date(dataset.publish_date.as_deref().ok_or_parse("snapshot has no publish date")?)?;

        let mut row = DatasetRow {
            accession_number: accession.to_string(),
            dataset_url: dataset_url(accession, &snapshot.tag)?,
            dataset_name: dataset.name.clone().unwrap_or_default(),
            release_date: display_date(release),
            most_recent_snapshot_date: display_date(snapshot_date),
            senior_author: snapshot
                .description
                .as_ref()
                .and_then(|d| d.senior_author.as_deref())
                .map(format_name)
                .unwrap_or_default(),
            ..Default::default()
        };

        if let Some(summary) = &snapshot.summary {
            row.n_subjects = summary.subjects.len().to_string();
            let modalities: Vec<&String> = summary
                .secondary_modalities
                .iter()
                .chain(summary.modalities.iter())
                .collect();
            row.modalities = format_modalities(&modalities);
            let ages: Vec<Option<f64>> = summary
                .subject_metadata
                .iter()
                .flatten()
                .map(|s| s.age)
                .collect();
            row.ages = format_ages(&ages);
            row.tasks = summary.tasks.join(", ");
        }

        if let Some(metadata) = &dataset.metadata {
            row.apply_metadata(metadata);
        }

        Ok(row)
    }

    fn apply_metadata(&mut self, metadata: &DatasetMetadata) {
        self.dx_status = metadata.dx_status.clone().unwrap_or_default();
        self.trial_count = metadata
            .trial_count
            .as_ref()
            .map(|n| n.to_string())
            .unwrap_or_default();
        self.study_design = metadata.study_design.clone().unwrap_or_default();
        self.domain_studied = metadata.study_domain.clone().unwrap_or_default();
        self.longitudinal = yes_no(metadata.study_longitudinal.as_deref() == Some("Longitudinal"));
        self.processed_data = yes_no(metadata.data_processed.unwrap_or(false));
        self.species = metadata.species.clone().unwrap_or_default();
        self.associated_paper_doi = metadata.associated_paper_doi.clone().unwrap_or_default();
        self.openneuro_paper_doi = metadata.openneuro_paper_doi.clone().unwrap_or_default();
    }

    /// Release date parsed back from its display form
    pub fn release_day(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.release_date, "%m/%d/%Y").map_err(|e| {
            MetricsError::Parse(format!("invalid release date '{}': {}", self.release_date, e))
        })
    }

    /// Subject count, 0 when unknown
    pub fn subject_count(&self) -> u64 {
        self.n_subjects.parse().unwrap_or(0)
    }
}

/// Build rows for every collected dataset. Datasets missing the fields needed
/// for a row are skipped with a warning.
pub fn build_rows(datasets: &BTreeMap<String, DatasetEdge>) -> Vec<DatasetRow> {
    datasets
        .iter()
        .filter_map(|(accession, edge)| match DatasetRow::from_edge(accession, edge) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(accession = %accession, error = %e, "Skipping dataset");
                None
            }
        })
        .collect()
}

/// Datasets and subjects released on one day, with running totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthPoint {
    pub date: NaiveDate,
    pub n_datasets: u64,
    pub n_subjects: u64,
    pub cumsum_datasets: u64,
    pub cumsum_subjects: u64,
}

/// Group rows by release date (ascending) and accumulate totals.
pub fn growth_series(rows: &[DatasetRow]) -> Result<Vec<GrowthPoint>> {
    let mut per_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let entry = per_day.entry(row.release_day()?).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += row.subject_count();
    }

    let mut cumsum_datasets = 0;
    let mut cumsum_subjects = 0;
    Ok(per_day
        .into_iter()
        .map(|(date, (n_datasets, n_subjects))| {
            cumsum_datasets += n_datasets;
            cumsum_subjects += n_subjects;
            GrowthPoint {
                date,
                n_datasets,
                n_subjects,
                cumsum_datasets,
                cumsum_subjects,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_edge(json: &str) -> Result<DatasetEdge> {
        Ok(serde_json::from_str(json)?)
    }

    const FULL_EDGE: &str = r#"{"cursor": "x", "node": {"id": "ds000001", "publishDate": "2018-04-11T21:35:23.000Z",
        "latestSnapshot": {"tag": "1.0.0",
            "dataset": {"name": "Balloon Analog Risk-taking Task", "publishDate": "2020-05-01T00:00:00.000Z",
                "metadata": {"trialCount": 90, "studyDesign": "Within-subject", "studyDomain": "Decision making",
                    "studyLongitudinal": "Longitudinal", "dataProcessed": true, "species": "Human",
                    "associatedPaperDOI": "10.1/abc", "openneuroPaperDOI": null, "dxStatus": "Healthy"}},
            "description": {"SeniorAuthor": "Russell A. Poldrack"},
            "summary": {"subjects": ["01", "02", "03"], "modalities": ["MRI"], "secondaryModalities": ["MRI_Anatomical", "MRI_Functional"],
                "subjectMetadata": [{"age": 24}, {"age": 71}], "tasks": ["balloon", "rest"]}}}}"#;

    #[test]
    fn test_row_from_full_edge() -> Result<()> {
        let row = DatasetRow::from_edge("ds000001", &parse_edge(FULL_EDGE)?)?;

        assert_eq!(row.dataset_url, "https://openneuro.org/datasets/ds000001/versions/1.0.0");
        assert_eq!(row.release_date, "4/11/2018");
        assert_eq!(row.most_recent_snapshot_date, "5/1/2020");
        assert_eq!(row.n_subjects, "3");
        assert_eq!(row.modalities, "MRI - anat, MRI - func");
        assert_eq!(row.ages, "18-25, 66+");
        assert_eq!(row.tasks, "balloon, rest");
        assert_eq!(row.trial_count, "90");
        assert_eq!(row.longitudinal, "Yes");
        assert_eq!(row.processed_data, "Yes");
        assert_eq!(row.openneuro_paper_doi, "");
        assert_eq!(row.senior_author, "Poldrack, Russell A.");
        Ok(())
    }

    #[test]
    fn test_row_without_summary_or_metadata() -> Result<()> {
        let edge = parse_edge(
            r#"{"cursor": "y", "node": {"id": "ds000002", "publishDate": "2019-01-02T00:00:00Z",
                "latestSnapshot": {"tag": "2.0.1", "dataset": {"name": "Empty", "publishDate": "2019-01-02", "metadata": null},
                    "description": {"SeniorAuthor": null}, "summary": null}}}"#,
        )?;
        let row = DatasetRow::from_edge("ds000002", &edge)?;

        assert_eq!(row.n_subjects, "");
        assert_eq!(row.modalities, "");
        assert_eq!(row.longitudinal, "");
        assert_eq!(row.senior_author, "");
        assert_eq!(row.subject_count(), 0);
        Ok(())
    }

    #[test]
    fn test_build_rows_skips_incomplete() -> Result<()> {
        let mut datasets = BTreeMap::new();
        datasets.insert("ds000001".to_string(), parse_edge(FULL_EDGE)?);
        datasets.insert(
            "ds000009".to_string(),
            parse_edge(r#"{"cursor": "z", "node": {"id": "ds000009", "publishDate": null, "latestSnapshot": null}}"#)?,
        );

        let rows = build_rows(&datasets);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].accession_number, "ds000001");
        Ok(())
    }

    fn row(release: &str, subjects: &str) -> DatasetRow {
        DatasetRow {
            release_date: release.to_string(),
            n_subjects: subjects.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_growth_series() -> Result<()> {
        let rows = vec![row("5/2/2019", "10"), row("1/15/2018", "4"), row("5/2/2019", ""), row("3/1/2020", "6")];
        let series = growth_series(&rows)?;

        let summary: Vec<(String, u64, u64, u64)> = series
            .iter()
            .map(|p| (p.date.to_string(), p.n_datasets, p.cumsum_datasets, p.cumsum_subjects))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("2018-01-15".to_string(), 1, 1, 4),
                ("2019-05-02".to_string(), 2, 3, 14),
                ("2020-03-01".to_string(), 1, 4, 20),
            ]
        );
        Ok(())
    }
}
