//! Field normalization for OpenNeuro dataset metadata.

use crate::error::{MetricsError, Result};
use chrono::NaiveDate;

/// Coarse scan domain to BIDS datatype abbreviation
const SCAN_TYPES: &[(&str, &str)] = &[
    ("anatomical", "anat"),
    ("structural", "anat"),
    ("functional", "func"),
    ("behavioral", "beh"),
    ("diffusion", "dwi"),
    ("perfusion", "perf"),
];

/// Inclusive age ranges and their labels
const AGE_BUCKETS: &[(f64, f64, &str)] = &[
    (0.0, 10.0, "0-10"),
    (11.0, 17.0, "11-17"),
    (18.0, 25.0, "18-25"),
    (26.0, 34.0, "26-34"),
    (35.0, 50.0, "35-50"),
    (51.0, 65.0, "51-65"),
    (66.0, 1000.0, "66+"),
];

fn scan_type(subtype: &str) -> String {
    let subtype = subtype.to_lowercase();
    SCAN_TYPES
        .iter()
        .find(|(domain, _)| *domain == subtype)
        .map(|(_, abbrev)| abbrev.to_string())
        .unwrap_or(subtype)
}

/// Format a modality list for display.
///
/// When MRI subtypes (`MRI_<domain>`) are present, the bare `MRI` entry is
/// dropped and each subtype becomes `MRI - <abbrev>`.
pub fn format_modalities<S: AsRef<str>>(modalities: &[S]) -> String {
    let modalities: Vec<&str> = modalities.iter().map(AsRef::as_ref).collect();
    if !modalities.iter().any(|m| m.contains("MRI_")) {
        return modalities.join(", ");
    }

    modalities
        .iter()
        .filter(|m| **m != "MRI")
        .map(|m| match m.split_once("MRI_") {
            Some((_, subtype)) => format!("MRI - {}", scan_type(subtype)),
            None => m.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// List the age ranges covered by `ages`, in range order.
///
/// Missing and zero ages are ignored.
pub fn format_ages(ages: &[Option<f64>]) -> String {
    let ages: Vec<f64> = ages.iter().flatten().copied().filter(|a| *a != 0.0).collect();

    AGE_BUCKETS
        .iter()
        .filter(|(lo, hi, _)| ages.iter().any(|a| a >= lo && a <= hi))
        .map(|(_, _, label)| *label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrite "First Middle Last" as "Last, First Middle". Names that already
/// contain a comma are returned unchanged.
pub fn format_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.contains(',') {
        return name.to_string();
    }

    match name.rsplit_once(' ') {
        Some((first, last)) => format!("{}, {}", last, first.trim_end()),
        None => format!("{}, ", name),
    }
}

/// Parse the date part of an ISO timestamp ("2018-07-24T21:35:23.000Z").
pub fn parse_date(iso: &str) -> Result<NaiveDate> {
    let day = iso.get(..10).unwrap_or(iso);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| MetricsError::Parse(format!("invalid date '{}': {}", iso, e)))
}

/// Render a date as M/D/YYYY without zero padding
pub fn display_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_modalities() {
        assert_eq!(
            format_modalities(&["MRI_anatomical", "MRI_functional", "EEG"]),
            "MRI - anat, MRI - func, EEG"
        );
        assert_eq!(
            format_modalities(&["MRI_Diffusion", "MRI", "PET"]),
            "MRI - dwi, PET"
        );
        assert_eq!(format_modalities(&["MRI", "EEG"]), "MRI, EEG");
        assert_eq!(format_modalities(&["MRI_angiography"]), "MRI - angiography");
        assert_eq!(format_modalities::<&str>(&[]), "");
    }

    #[test]
    fn test_format_ages() {
        assert_eq!(format_ages(&[Some(5.0), Some(12.0), Some(70.0)]), "0-10, 11-17, 66+");
        assert_eq!(format_ages(&[Some(30.0), None, Some(0.0), Some(28.0)]), "26-34");
        assert_eq!(format_ages(&[]), "");
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("Russell A. Poldrack"), "Poldrack, Russell A.");
        assert_eq!(format_name("Poldrack, Russell"), "Poldrack, Russell");
        assert_eq!(format_name(""), "");
    }

    #[test]
    fn test_dates() -> Result<()> {
        let date = parse_date("2018-07-04T21:35:23.000Z")?;
        assert_eq!(display_date(date), "7/4/2018");
        assert!(parse_date("last week").is_err());
        Ok(())
    }
}
