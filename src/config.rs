//! Run configuration: the list of papers to count citations for, and the
//! OpenCitations access token.

use crate::error::{MetricsError, Result};
use std::path::Path;
use tracing::info;

/// A paper to track, identified by a short display name and its DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub name: String,
    pub doi: String,
}

/// Ordered list of papers with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperList {
    papers: Vec<Paper>,
}

impl PaperList {
    /// Parse a YAML mapping of `name: doi` pairs, keeping file order.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)?;
        let mut list = PaperList::default();

        for (key, value) in mapping {
            let name = scalar_to_string(&key)
                .ok_or_else(|| MetricsError::Validation(format!("paper name is not a string: {:?}", key)))?;
            let doi = scalar_to_string(&value).unwrap_or_default();
            list.push(name, doi)?;
        }

        Ok(list)
    }

    /// Load the paper list from a YAML file
    pub fn from_yaml_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MetricsError::Config(format!("cannot read paper list {}: {}", path.display(), e)))?;
        let list = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), papers = list.len(), "Loaded paper list");
        Ok(list)
    }

    /// Append a paper. The DOI must be non-empty; a repeated name replaces the
    /// earlier DOI in place.
    pub fn push(&mut self, name: impl Into<String>, doi: impl Into<String>) -> Result<()> {
        let name = name.into();
        let doi = doi.into().trim().to_string();
        if doi.is_empty() {
            return Err(MetricsError::Validation(format!("paper '{}' has no DOI", name)));
        }

        match self.papers.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.doi = doi,
            None => self.papers.push(Paper { name, doi }),
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Paper> {
        self.papers.iter()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read the OpenCitations access token from a file
pub fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("cannot read token file {}: {}", path.display(), e)))?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(MetricsError::Config(format!("token file {} is empty", path.display())));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_paper_list_keeps_order() -> Result<()> {
        let list = PaperList::from_yaml_str(
            "BIDS: 10.1038/sdata.2016.44\nMEG-BIDS: 10.1038/sdata.2018.110\nEEG-BIDS: 10.1038/s41597-019-0104-8\n",
        )?;
        let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["BIDS", "MEG-BIDS", "EEG-BIDS"]);
        assert_eq!(list.iter().next().map(|p| p.doi.as_str()), Some("10.1038/sdata.2016.44"));
        Ok(())
    }

    #[test]
    fn test_paper_without_doi_is_rejected() {
        let err = PaperList::from_yaml_str("BIDS: \"\"\n");
        assert!(matches!(err, Err(MetricsError::Validation(_))));
    }

    #[test]
    fn test_push_replaces_same_name() -> Result<()> {
        let mut list = PaperList::default();
        list.push("BIDS", "10.1/a")?;
        list.push("BIDS", "10.1/b")?;
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().map(|p| p.doi.as_str()), Some("10.1/b"));
        Ok(())
    }

    #[test]
    fn test_read_token_trims() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "  abc-123  ")?;
        assert_eq!(read_token(file.path())?, "abc-123");
        Ok(())
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = read_token(Path::new("/nonexistent/token.txt"));
        assert!(matches!(err, Err(MetricsError::Config(_))));
    }
}
