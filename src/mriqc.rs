//! MRIQC web API growth summary.
//!
//! The summary table is precomputed from the MRIQC web API dump and holds the
//! number of submitted results per data type and month.

use crate::error::{MetricsError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct MriqcRecord {
    pub datatype: String,
    pub month: String,
    pub nresults: f64,
}

/// Results over time for one data type
#[derive(Debug, Clone, PartialEq)]
pub struct MriqcSeries {
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Display label for a data type
pub fn datatype_label(datatype: &str) -> String {
    match datatype {
        "bold" => "BOLD".to_string(),
        "T1w" => "T1-weighted".to_string(),
        other => other.to_string(),
    }
}

/// Parse a month column value: `2017-06`, `2017-06-01` or a full timestamp.
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    let month = month.trim();
    let candidate = match month.len() {
        7 => format!("{}-01", month),
        _ => month.get(..10).unwrap_or(month).to_string(),
    };
    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .map_err(|e| MetricsError::Parse(format!("invalid month '{}': {}", month, e)))
}

/// Read the comma-separated summary table. Extra columns are ignored.
pub fn read_summary(path: &Path) -> Result<Vec<MriqcRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<MriqcRecord>, csv::Error>>()?;
    info!(path = %path.display(), rows = records.len(), "Loaded MRIQC summary");
    Ok(records)
}

/// One date-sorted series per data type, in order of first appearance.
pub fn series_by_datatype(records: &[MriqcRecord]) -> Result<Vec<MriqcSeries>> {
    let mut series: Vec<MriqcSeries> = Vec::new();

    for record in records {
        let label = datatype_label(&record.datatype);
        let point = (parse_month(&record.month)?, record.nresults);
        match series.iter_mut().find(|s| s.label == label) {
            Some(existing) => existing.points.push(point),
            None => series.push(MriqcSeries { label, points: vec![point] }),
        }
    }

    for s in &mut series {
        s.points.sort_by_key(|(date, _)| *date);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_month() -> Result<()> {
        assert_eq!(parse_month("2017-06")?.to_string(), "2017-06-01");
        assert_eq!(parse_month("2018-02-01 00:00:00")?.to_string(), "2018-02-01");
        assert!(parse_month("June").is_err());
        Ok(())
    }

    #[test]
    fn test_series_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            ",month,datatype,nresults\n0,2017-07,bold,120\n1,2017-06,bold,100\n2,2017-06,T1w,80\n3,2017-07,T1w,95.5\n"
        )?;

        let records = read_summary(file.path())?;
        let series = series_by_datatype(&records)?;

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "BOLD");
        assert_eq!(
            series[0].points.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
            vec![100.0, 120.0]
        );
        assert_eq!(series[1].label, "T1-weighted");
        assert_eq!(series[1].points[1].1, 95.5);
        Ok(())
    }
}
