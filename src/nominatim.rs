//! Nominatim (OpenStreetMap) geocoding client.
//!
//! API: https://nominatim.openstreetmap.org/search
//! Usage policy requires an identifying User-Agent.

use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Nominatim API base URL
pub const NOMINATIM_API_BASE: &str = "https://nominatim.openstreetmap.org";

/// User agent sent with every geocoding request
const USER_AGENT: &str = "bidsmetrics/0.1 (affiliation map)";

/// A geocoded place
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Full display address
    pub address: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

/// Resolves free text to a place.
#[async_trait]
pub trait Geocoder {
    /// `Ok(None)` means the service answered but found nothing.
    async fn geocode(&self, query: &str) -> Result<Option<Place>>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(NOMINATIM_API_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MetricsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<Place>> {
        debug!(query = query, "Geocoding");

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("namedetails", "1"),
                ("accept-language", "en"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsError::from_status(status, "Nominatim"));
        }

        let places: Vec<NominatimPlace> = response.json().await.map_err(|e| {
            MetricsError::Parse(format!("Failed to parse Nominatim response: {}", e))
        })?;

        places.into_iter().next().map(parse_place).transpose()
    }
}

fn parse_place(place: NominatimPlace) -> Result<Place> {
    let longitude = place
        .lon
        .parse::<f64>()
        .map_err(|e| MetricsError::Parse(format!("invalid longitude '{}': {}", place.lon, e)))?;
    let latitude = place
        .lat
        .parse::<f64>()
        .map_err(|e| MetricsError::Parse(format!("invalid latitude '{}': {}", place.lat, e)))?;

    let (city, country) = match place.address {
        Some(a) => (a.city.or(a.town).or(a.village), a.country),
        None => (None, None),
    };

    Ok(Place {
        address: place.display_name,
        city,
        country,
        longitude,
        latitude,
    })
}
