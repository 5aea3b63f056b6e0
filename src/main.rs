//! bidsmetrics - figures and statistics for the BIDS paper
//!
//! Every task caches what it fetched in a tab-separated file next to its
//! outputs. A second run reads the cache and makes no network calls.
//!
//! ## Usage
//!
//! ```bash
//! bidsmetrics citations --papers papers.yaml
//! bidsmetrics citations --zotero-group 5111637
//! bidsmetrics affiliations --cff bids_spec_citation.cff
//! bidsmetrics genders
//! bidsmetrics openneuro
//! ```

use anyhow::{Context, Result};
use bidsmetrics::affiliations::{self, AffiliationRow, AffiliationSummary};
use bidsmetrics::cff::CitationFile;
use bidsmetrics::citations::{self, CitationRow};
use bidsmetrics::config::{read_token, PaperList};
use bidsmetrics::datasets::{self, DatasetRow};
use bidsmetrics::gender::{self, GenderGuess, GenderLexicon, NameDictionary};
use bidsmetrics::nominatim::NominatimClient;
use bidsmetrics::opencitations::OpenCitationsClient;
use bidsmetrics::openneuro::{self, OpenNeuroClient};
use bidsmetrics::zotero::ZoteroClient;
use bidsmetrics::{cache, charts, mriqc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Figures and statistics for the BIDS paper
#[derive(Parser)]
#[command(name = "bidsmetrics")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count citations per year for each paper and plot them
    Citations {
        /// YAML mapping of paper name to DOI
        #[arg(long, default_value = "papers.yaml")]
        papers: PathBuf,

        /// Take the paper list from this Zotero group library instead
        #[arg(long)]
        zotero_group: Option<String>,

        /// File holding the OpenCitations access token
        #[arg(long, default_value = "token.txt")]
        token: PathBuf,

        /// Cache table
        #[arg(short, long, default_value = "count_citation.tsv")]
        output: PathBuf,

        /// Figure path (.svg or .png)
        #[arg(long, default_value = "count_citation.svg")]
        figure: PathBuf,
    },

    /// Geocode author affiliations and plot them on a map
    Affiliations {
        /// Citation File Format file listing the authors
        #[arg(long, default_value = "bids_spec_citation.cff")]
        cff: PathBuf,

        /// Cache table
        #[arg(short, long, default_value = "affiliations.tsv")]
        output: PathBuf,

        /// Figure path (.png or .svg)
        #[arg(long, default_value = "affiliations.png")]
        figure: PathBuf,
    },

    /// Tally contributor genders guessed from given names
    Genders {
        /// Citation File Format file listing the authors
        #[arg(long, default_value = "bids_spec_citation.cff")]
        cff: PathBuf,

        /// Overrides for the name dictionary, one `name<TAB>gender` per line
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },

    /// Plot OpenNeuro dataset growth and MRIQC submission growth
    Openneuro {
        /// Cache table of OpenNeuro datasets
        #[arg(short, long, default_value = "openneuro_datasets.tsv")]
        output: PathBuf,

        /// Precomputed MRIQC web API summary
        #[arg(long, default_value = "mriqc_results_summary.csv")]
        mriqc: PathBuf,

        /// OpenNeuro growth figure
        #[arg(long, default_value = "figure2a.png")]
        figure_a: PathBuf,

        /// MRIQC growth figure
        #[arg(long, default_value = "figure2b.png")]
        figure_b: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Citations {
            papers,
            zotero_group,
            token,
            output,
            figure,
        } => run_citations(papers, zotero_group, token, output, figure).await,
        Commands::Affiliations { cff, output, figure } => run_affiliations(cff, output, figure).await,
        Commands::Genders { cff, lexicon } => run_genders(cff, lexicon),
        Commands::Openneuro {
            output,
            mriqc,
            figure_a,
            figure_b,
        } => run_openneuro(output, mriqc, figure_a, figure_b).await,
    }
}

// ============================================================================
// Citations
// ============================================================================

async fn run_citations(
    papers: PathBuf,
    zotero_group: Option<String>,
    token: PathBuf,
    output: PathBuf,
    figure: PathBuf,
) -> Result<()> {
    let rows = cache::load_or_fetch(&output, || {
        fetch_citations(&papers, zotero_group.as_deref(), &token)
    })
    .await
    .context("Failed to build citation table")?;

    println!("{} paper-year rows", rows.len());
    if rows.is_empty() {
        println!("No citations found, nothing to plot.");
        return Ok(());
    }

    charts::citation_bars(&rows, &figure).context("Failed to draw citation chart")?;
    println!("Saved: {}", figure.display());
    Ok(())
}

async fn fetch_citations(
    papers: &Path,
    zotero_group: Option<&str>,
    token: &Path,
) -> bidsmetrics::Result<Vec<CitationRow>> {
    let papers = match zotero_group {
        Some(group) => ZoteroClient::new()?.top_items(group).await?,
        None => PaperList::from_yaml_path(papers)?,
    };
    println!("Querying citations for {} papers", papers.len());

    let index = OpenCitationsClient::new(read_token(token)?)?;
    citations::query_papers(&index, &papers).await
}

// ============================================================================
// Affiliations
// ============================================================================

async fn run_affiliations(cff_path: PathBuf, output: PathBuf, figure: PathBuf) -> Result<()> {
    let cff = CitationFile::from_path(&cff_path)
        .with_context(|| format!("Failed to read {}", cff_path.display()))?;
    let unique = cff.unique_affiliations();

    let rows = cache::load_or_fetch(&output, || locate_affiliations(&unique))
        .await
        .context("Failed to build affiliation table")?;

    let summary = AffiliationSummary::new(&cff, &rows);
    println!("Number of affiliations: {}", summary.affiliations);
    println!("Number of countries: {}", summary.countries);
    println!("Number of authors without affiliation: {}", summary.authors_without_affiliation);
    println!("Number of unknown affiliations: {}", summary.unknown_affiliations);

    charts::affiliation_map(&rows, &figure).context("Failed to draw affiliation map")?;
    println!("Saved: {}", figure.display());
    Ok(())
}

async fn locate_affiliations(unique: &[String]) -> bidsmetrics::Result<Vec<AffiliationRow>> {
    let geocoder = NominatimClient::new()?;
    Ok(affiliations::locate_all(&geocoder, unique).await)
}

// ============================================================================
// Genders
// ============================================================================

fn run_genders(cff_path: PathBuf, lexicon_path: Option<PathBuf>) -> Result<()> {
    let cff = CitationFile::from_path(&cff_path)
        .with_context(|| format!("Failed to read {}", cff_path.display()))?;

    let mut dictionary = NameDictionary::new();
    if let Some(path) = lexicon_path {
        let overrides = GenderLexicon::from_tsv_path(&path)
            .with_context(|| format!("Failed to load lexicon {}", path.display()))?;
        dictionary = dictionary.with_overrides(overrides);
    }

    let names = cff.given_names();
    for name in &names {
        println!("{}: {}", name, dictionary.guess(name));
    }

    let tally = gender::tally(&dictionary, names.iter().copied());
    for (gender, count) in tally.entries() {
        println!("- {}: {}", gender, count);
    }
    Ok(())
}

// ============================================================================
// OpenNeuro
// ============================================================================

async fn run_openneuro(output: PathBuf, mriqc_path: PathBuf, figure_a: PathBuf, figure_b: PathBuf) -> Result<()> {
    let rows = cache::load_or_fetch(&output, fetch_dataset_rows)
        .await
        .context("Failed to build OpenNeuro dataset table")?;
    println!("{} datasets", rows.len());

    let series = datasets::growth_series(&rows).context("Invalid release dates in dataset table")?;
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("Earliest dataset: {}", first.date);
        println!("Latest dataset: {}", last.date);
        charts::growth_lines(&series, &figure_a).context("Failed to draw OpenNeuro growth")?;
        println!("Saved: {}", figure_a.display());
    } else {
        println!("No datasets, skipping {}", figure_a.display());
    }

    if !mriqc_path.exists() {
        warn!(path = %mriqc_path.display(), "MRIQC summary not found, skipping figure");
        return Ok(());
    }
    let records = mriqc::read_summary(&mriqc_path)
        .with_context(|| format!("Failed to read {}", mriqc_path.display()))?;
    let mriqc_series = mriqc::series_by_datatype(&records)?;
    charts::mriqc_lines(&mriqc_series, &figure_b).context("Failed to draw MRIQC growth")?;
    println!("Saved: {}", figure_b.display());
    Ok(())
}

async fn fetch_dataset_rows() -> bidsmetrics::Result<Vec<DatasetRow>> {
    let client = OpenNeuroClient::new()?;
    let collected = openneuro::collect_datasets(&client).await?;
    let rows = datasets::build_rows(&collected);
    info!(datasets = collected.len(), rows = rows.len(), "Flattened OpenNeuro datasets");
    Ok(rows)
}
