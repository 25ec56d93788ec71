use std::env;
use std::time::Duration;

use crate::models::Coordinates;

/// Zürich main station, the fixed end point of every drive-time lookup.
pub const ZURICH_HB: Coordinates = Coordinates::new(47.378177, 8.540192);

pub const API_KEY_ENV: &str = "ORS_API_KEY";

const GEOCODE_URL: &str = "https://api.openrouteservice.org/geocode/search";
const DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";

/// Settings shared by the page fetcher and the OpenRouteService client.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// OpenRouteService credential. Without it no location lookups are made.
    pub api_key: Option<String>,
    pub geocode_url: String,
    pub directions_url: String,
    /// ISO country code passed as the geocoder's boundary filter.
    pub country_code: String,
    /// Appended to place names before geocoding.
    pub country_name: String,
    pub destination: Coordinates,
    pub page_timeout: Duration,
    pub geocode_timeout: Duration,
    pub route_timeout: Duration,
    pub user_agent: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geocode_url: GEOCODE_URL.to_string(),
            directions_url: DIRECTIONS_URL.to_string(),
            country_code: "CH".to_string(),
            country_name: "Switzerland".to_string(),
            destination: ZURICH_HB,
            page_timeout: Duration::from_secs(10),
            geocode_timeout: Duration::from_secs(10),
            route_timeout: Duration::from_secs(15),
            user_agent: "Gemeindefinder/1.0 (Property Tracker)".to_string(),
        }
    }
}

impl EnrichmentConfig {
    /// Defaults with the credential taken from `ORS_API_KEY`.
    pub fn from_env() -> Self {
        Self::default().with_api_key(env::var(API_KEY_ENV).ok())
    }

    /// Blank keys count as no key.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }
}
