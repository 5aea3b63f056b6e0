//! Affiliation geocoding.
//!
//! Each affiliation is resolved through an ordered chain of strategies:
//! the full affiliation text first, then a city term extracted from its
//! comma-separated tail. Every attempt is recorded so the outcome of each
//! tier can be inspected.

use crate::cff::CitationFile;
use crate::nominatim::{Geocoder, Place};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Placeholder for every column of an affiliation that could not be located
pub const NOT_AVAILABLE: &str = "n/a";

static LEADING_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]").expect("valid leading digit pattern"));

/// Resolution tiers, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Geocode the affiliation string as is
    FullText,
    /// Geocode only the city parsed from the affiliation
    CityFallback,
}

impl Strategy {
    pub const CHAIN: [Strategy; 2] = [Strategy::FullText, Strategy::CityFallback];

    /// Query this strategy would send, if it applies to `affiliation`
    pub fn query(self, affiliation: &str) -> Option<String> {
        match self {
            Strategy::FullText => Some(affiliation.to_string()),
            Strategy::CityFallback => city_term(affiliation),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Found,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub query: String,
    pub outcome: AttemptOutcome,
}

/// Result of running the strategy chain for one affiliation
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub affiliation: String,
    pub attempts: Vec<Attempt>,
    /// Winning strategy and its place, if any tier succeeded
    pub resolved: Option<(Strategy, Place)>,
}

/// One cached row per affiliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliationRow {
    pub affiliation: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub longitude: String,
    pub latitude: String,
}

impl AffiliationRow {
    fn unresolved(affiliation: &str) -> Self {
        Self {
            affiliation: affiliation.to_string(),
            address: NOT_AVAILABLE.to_string(),
            city: NOT_AVAILABLE.to_string(),
            country: NOT_AVAILABLE.to_string(),
            longitude: NOT_AVAILABLE.to_string(),
            latitude: NOT_AVAILABLE.to_string(),
        }
    }

    fn from_place(affiliation: &str, place: Place) -> Self {
        Self {
            affiliation: affiliation.to_string(),
            address: place.address,
            city: place.city.unwrap_or_default(),
            country: place.country.unwrap_or_default(),
            longitude: place.longitude.to_string(),
            latitude: place.latitude.to_string(),
        }
    }

    pub fn is_located(&self) -> bool {
        self.address != NOT_AVAILABLE
    }

    /// `(longitude, latitude)` if both parse
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lon = self.longitude.parse::<f64>().ok()?;
        let lat = self.latitude.parse::<f64>().ok()?;
        Some((lon, lat))
    }
}

/// Counts reported after locating affiliations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliationSummary {
    /// Authors listing an affiliation, duplicates included
    pub affiliations: usize,
    pub countries: usize,
    pub authors_without_affiliation: usize,
    pub unknown_affiliations: usize,
}

impl AffiliationSummary {
    pub fn new(cff: &CitationFile, rows: &[AffiliationRow]) -> Self {
        let countries: BTreeSet<&str> = rows
            .iter()
            .filter(|r| r.is_located() && !r.country.is_empty())
            .map(|r| r.country.as_str())
            .collect();

        Self {
            affiliations: cff.affiliation_count(),
            countries: countries.len(),
            authors_without_affiliation: cff.authors_without_affiliation(),
            unknown_affiliations: rows.iter().filter(|r| !r.is_located()).count(),
        }
    }
}

/// All alphabetic characters uppercase, with at least one of them
fn is_upper_acronym(segment: &str) -> bool {
    segment.chars().any(char::is_alphabetic)
        && segment
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

/// Extract a city from a `..., city, [region or postal code,] country` affiliation.
///
/// The second-to-last segment is taken as the city, unless it looks like a
/// region acronym or postal code, in which case the segment before it is used.
pub fn city_term(affiliation: &str) -> Option<String> {
    if !affiliation.contains(',') {
        return None;
    }

    let segments: Vec<&str> = affiliation.split(',').map(str::trim).collect();
    let country = segments[segments.len() - 1];
    let mut city = segments[segments.len() - 2];

    if !city.is_empty()
        && segments.len() >= 3
        && (is_upper_acronym(city) || LEADING_DIGIT.is_match(city))
    {
        city = segments[segments.len() - 3];
    }

    if city.is_empty() {
        return None;
    }

    info!(city = city, country = country, "Using city fallback");
    Some(city.to_string())
}

/// Run the strategy chain for one affiliation.
pub async fn resolve<G>(geocoder: &G, affiliation: &str) -> Resolution
where
    G: Geocoder + Sync + ?Sized,
{
    let mut attempts = Vec::new();

    for strategy in Strategy::CHAIN {
        let Some(query) = strategy.query(affiliation) else {
            continue;
        };

        match geocoder.geocode(&query).await {
            Ok(Some(place)) => {
                attempts.push(Attempt { strategy, query, outcome: AttemptOutcome::Found });
                return Resolution {
                    affiliation: affiliation.to_string(),
                    attempts,
                    resolved: Some((strategy, place)),
                };
            }
            Ok(None) => {
                attempts.push(Attempt { strategy, query, outcome: AttemptOutcome::NotFound });
            }
            Err(e) => {
                warn!(strategy = ?strategy, query = %query, error = %e, "Geocoding failed");
                attempts.push(Attempt {
                    strategy,
                    query,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                });
            }
        }
    }

    Resolution {
        affiliation: affiliation.to_string(),
        attempts,
        resolved: None,
    }
}

/// Locate every affiliation, one row each, in input order.
pub async fn locate_all<G>(geocoder: &G, affiliations: &[String]) -> Vec<AffiliationRow>
where
    G: Geocoder + Sync + ?Sized,
{
    let mut rows = Vec::with_capacity(affiliations.len());

    for affiliation in affiliations {
        info!(affiliation = %affiliation, "Locating");
        let resolution = resolve(geocoder, affiliation).await;

        let row = match resolution.resolved {
            Some((strategy, place)) => {
                info!(address = %place.address, strategy = ?strategy, "Located");
                AffiliationRow::from_place(affiliation, place)
            }
            None => {
                warn!(affiliation = %affiliation, attempts = resolution.attempts.len(), "Could not locate");
                AffiliationRow::unresolved(affiliation)
            }
        };
        rows.push(row);
    }

    rows
}
