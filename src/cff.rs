//! Reader for Citation File Format (CITATION.cff) author lists.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(rename = "given-names", default)]
    pub given_names: Option<String>,
    #[serde(rename = "family-names", default)]
    pub family_names: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CitationFile {
    #[serde(default)]
    pub authors: Vec<Author>,
}

impl CitationFile {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Distinct affiliation strings, sorted
    pub fn unique_affiliations(&self) -> Vec<String> {
        self.authors
            .iter()
            .filter_map(|a| a.affiliation.as_deref())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of authors listing an affiliation, duplicates included
    pub fn affiliation_count(&self) -> usize {
        self.authors.iter().filter(|a| a.affiliation.is_some()).count()
    }

    pub fn authors_without_affiliation(&self) -> usize {
        self.authors.len() - self.affiliation_count()
    }

    /// Given names of all authors that have one
    pub fn given_names(&self) -> Vec<&str> {
        self.authors
            .iter()
            .filter_map(|a| a.given_names.as_deref())
            .collect()
    }
}
