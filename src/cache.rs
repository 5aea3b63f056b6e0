//! Tab-separated table cache.
//!
//! A cache file, once present, is authoritative: it is read in full and never
//! rewritten. A missing file means the table must be fetched.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use tracing::{debug, info};

/// Load a TSV table, returning an empty table if the file does not exist.
///
/// A malformed file is an error for the caller to deal with.
pub fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "Cache file not found");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    info!(path = %path.display(), rows = rows.len(), "Loaded cached table");
    Ok(rows)
}

/// Write `rows` as a TSV table if there is something to write and no file
/// exists at `path` yet. Returns whether the file was written.
pub fn save_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<bool> {
    if rows.is_empty() {
        debug!(path = %path.display(), "No rows to save");
        return Ok(false);
    }
    if path.exists() {
        debug!(path = %path.display(), "Cache file already present, not overwriting");
        return Ok(false);
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Saved table");
    Ok(true)
}

/// Return the cached table at `path`, or run `fetch` and persist its rows.
///
/// `fetch` is only awaited when the cache is missing or empty.
pub async fn load_or_fetch<T, F, Fut>(path: &Path, fetch: F) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let cached = load_table(path)?;
    if !cached.is_empty() {
        return Ok(cached);
    }

    let rows = fetch().await?;
    save_table(path, &rows)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        papers: String,
        years: i32,
        nb_citations: u32,
    }

    fn sample() -> Vec<Row> {
        vec![
            Row { papers: "BIDS".to_string(), years: 2019, nb_citations: 2 },
            Row { papers: "BIDS".to_string(), years: 2020, nb_citations: 1 },
        ]
    }

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let rows: Vec<Row> = load_table(&dir.path().join("absent.tsv"))?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_save_writes_tab_separated() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("count_citation.tsv");

        assert!(save_table(&path, &sample())?);
        let text = std::fs::read_to_string(&path)?;
        assert_eq!(text, "papers\tyears\tnb_citations\nBIDS\t2019\t2\nBIDS\t2020\t1\n");
        Ok(())
    }

    #[test]
    fn test_save_skips_empty_and_existing() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("table.tsv");

        assert!(!save_table::<Row>(&path, &[])?);
        assert!(!path.exists());

        std::fs::write(&path, "papers\tyears\tnb_citations\nOld\t2000\t9\n")?;
        assert!(!save_table(&path, &sample())?);
        let rows: Vec<Row> = load_table(&path)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].papers, "Old");
        Ok(())
    }

    #[test]
    fn test_malformed_cache_propagates() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "papers\tyears\tnb_citations\nBIDS\tnot-a-year\t1\n")?;

        assert!(load_table::<Row>(&path).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_cache_skips_fetch() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("table.tsv");
        save_table(&path, &sample())?;

        let calls = AtomicUsize::new(0);
        let rows: Vec<Row> = load_or_fetch(&path, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        })
        .await?;

        assert_eq!(rows, sample());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_run_is_offline() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("table.tsv");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let rows: Vec<Row> = load_or_fetch(&path, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample())
            })
            .await?;
            assert_eq!(rows, sample());
        }

        assert!(path.exists());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
