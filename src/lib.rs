//! # bidsmetrics
//!
//! Figures and statistics for the BIDS paper: citation counts, author
//! affiliation map, contributor gender tally and OpenNeuro growth.
//!
//! ## Modules
//!
//! - [`citations`] - Citation counts per year via [`opencitations`]
//! - [`affiliations`] - Affiliation geocoding chain via [`nominatim`]
//! - [`gender`] - Contributor gender tally
//! - [`openneuro`] - OpenNeuro GraphQL paginator, flattened by [`datasets`]
//! - [`cache`] - Tab-separated cache-or-fetch tables
//! - [`charts`] - Static figures
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bidsmetrics::{citations, config::PaperList, opencitations::OpenCitationsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let papers = PaperList::from_yaml_str("BIDS: 10.1038/sdata.2016.44")?;
//!     let index = OpenCitationsClient::new("my-token".to_string())?;
//!     let rows = citations::query_papers(&index, &papers).await?;
//!     println!("{} paper-year rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod affiliations;
pub mod cache;
pub mod cff;
pub mod charts;
pub mod citations;
pub mod config;
pub mod datasets;
pub mod error;
pub mod gender;
pub mod mriqc;
pub mod nominatim;
pub mod normalize;
pub mod opencitations;
pub mod openneuro;
pub mod zotero;

pub use error::{MetricsError, Result};
