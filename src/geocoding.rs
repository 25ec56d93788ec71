use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::models::Coordinates;

#[derive(Debug, Default, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    /// `[longitude, latitude]`
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    /// Seconds. Omitted by the service for zero-length routes.
    #[serde(default)]
    duration: Option<f64>,
}

/// The two external lookups behind drive-time enrichment.
pub trait LocationService {
    /// Top match for a place name, or `None` when nothing was found or the
    /// lookup failed.
    fn geocode(&self, place_name: &str) -> Option<Coordinates>;

    /// Driving duration in seconds between two points.
    fn route_duration(&self, origin: Coordinates, destination: Coordinates) -> Option<f64>;
}

/// OpenRouteService geocoding and directions client.
pub struct OpenRouteService {
    client: Client,
    config: EnrichmentConfig,
}

impl OpenRouteService {
    pub fn new(config: EnrichmentConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build OpenRouteService client")?;

        Ok(Self { client, config })
    }

    fn geocode_url(&self, api_key: &str, place_name: &str) -> String {
        let query = format!("{}, {}", place_name, self.config.country_name);

        format!(
            "{}?api_key={}&text={}&boundary.country={}&size=1",
            self.config.geocode_url,
            urlencoding::encode(api_key),
            urlencoding::encode(&query),
            self.config.country_code
        )
    }

    fn request_geocode(&self, api_key: &str, place_name: &str) -> Result<Option<Coordinates>> {
        let response = self
            .client
            .get(self.geocode_url(api_key, place_name))
            .timeout(self.config.geocode_timeout)
            .send()
            .context("Geocoding request failed")?
            .error_for_status()
            .context("Geocoding service returned an error status")?;

        let body: GeocodeResponse = response
            .json()
            .context("Failed to decode geocoding response")?;
        Ok(first_feature_coordinates(body))
    }

    fn request_route(
        &self,
        api_key: &str,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<f64>> {
        let body = json!({
            "coordinates": [origin.to_lon_lat(), destination.to_lon_lat()]
        });

        let response = self
            .client
            .post(&self.config.directions_url)
            .header("Authorization", api_key)
            .json(&body)
            .timeout(self.config.route_timeout)
            .send()
            .context("Directions request failed")?
            .error_for_status()
            .context("Directions service returned an error status")?;

        let body: DirectionsResponse = response
            .json()
            .context("Failed to decode directions response")?;
        Ok(first_route_duration(body))
    }
}

impl LocationService for OpenRouteService {
    fn geocode(&self, place_name: &str) -> Option<Coordinates> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("No OpenRouteService key configured, skipping geocoding");
            return None;
        };
        if place_name.trim().is_empty() {
            return None;
        }

        match self.request_geocode(api_key, place_name.trim()) {
            Ok(Some(coordinates)) => {
                debug!("Geocoded {} -> ({})", place_name, coordinates);
                Some(coordinates)
            }
            Ok(None) => {
                debug!("No geocoding results for {}", place_name);
                None
            }
            Err(e) => {
                warn!("Geocoding {} failed: {:#}", place_name, e);
                None
            }
        }
    }

    fn route_duration(&self, origin: Coordinates, destination: Coordinates) -> Option<f64> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("No OpenRouteService key configured, skipping routing");
            return None;
        };

        match self.request_route(api_key, origin, destination) {
            Ok(duration) => {
                debug!("Route ({}) -> ({}): {:?}s", origin, destination, duration);
                duration
            }
            Err(e) => {
                warn!("Routing from ({}) failed: {:#}", origin, e);
                None
            }
        }
    }
}

fn first_feature_coordinates(response: GeocodeResponse) -> Option<Coordinates> {
    let feature = response.features.into_iter().next()?;
    match feature.geometry.coordinates.as_slice() {
        [longitude, latitude, ..] => Some(Coordinates::new(*latitude, *longitude)),
        _ => None,
    }
}

fn first_route_duration(response: DirectionsResponse) -> Option<f64> {
    response
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.summary.duration)
}

/// Seconds to minutes, one decimal place.
pub fn seconds_to_minutes(seconds: f64) -> f64 {
    (seconds / 60.0 * 10.0).round() / 10.0
}

/// Result of enriching one place name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationEnrichment {
    pub coordinates: Option<Coordinates>,
    /// Minutes, one decimal place.
    pub driving_time: Option<f64>,
}

/// Geocodes a commune and measures the drive to a fixed destination.
pub struct LocationEnricher<S: LocationService> {
    service: S,
    destination: Coordinates,
}

impl LocationEnricher<OpenRouteService> {
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        let destination = config.destination;
        Ok(Self::new(OpenRouteService::new(config.clone())?, destination))
    }
}

impl<S: LocationService> LocationEnricher<S> {
    pub fn new(service: S, destination: Coordinates) -> Self {
        Self {
            service,
            destination,
        }
    }

    pub fn geocode(&self, place_name: &str) -> Option<Coordinates> {
        self.service.geocode(place_name)
    }

    /// Drive time from `origin` to the destination. Routing is only
    /// attempted when an origin is known.
    pub fn driving_time(&self, origin: Option<Coordinates>) -> Option<f64> {
        let origin = origin?;
        self.service
            .route_duration(origin, self.destination)
            .map(seconds_to_minutes)
    }

    pub fn enrich(&self, place_name: &str) -> LocationEnrichment {
        let coordinates = self.geocode(place_name);
        let driving_time = self.driving_time(coordinates);
        LocationEnrichment {
            coordinates,
            driving_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZURICH_HB;
    use crate::test_support::{closed_port_url, StubServer};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeService {
        origin: Option<Coordinates>,
        duration: Option<f64>,
        geocode_calls: Cell<usize>,
        routes_requested: RefCell<Vec<(Coordinates, Coordinates)>>,
    }

    impl LocationService for FakeService {
        fn geocode(&self, _place_name: &str) -> Option<Coordinates> {
            self.geocode_calls.set(self.geocode_calls.get() + 1);
            self.origin
        }

        fn route_duration(&self, origin: Coordinates, destination: Coordinates) -> Option<f64> {
            self.routes_requested.borrow_mut().push((origin, destination));
            self.duration
        }
    }

    #[test]
    fn test_enrich_converts_seconds_to_minutes() {
        let uster = Coordinates::new(47.3471, 8.7209);
        let service = FakeService {
            origin: Some(uster),
            duration: Some(1234.0),
            ..Default::default()
        };
        let enricher = LocationEnricher::new(service, ZURICH_HB);
        let result = enricher.enrich("Uster");

        assert_eq!(result.coordinates, Some(uster));
        assert_eq!(result.driving_time, Some(20.6));
        assert_eq!(
            *enricher.service.routes_requested.borrow(),
            vec![(uster, ZURICH_HB)]
        );
    }

    #[test]
    fn test_no_geocode_result_skips_routing() {
        let service = FakeService {
            origin: None,
            duration: Some(600.0),
            ..Default::default()
        };
        let enricher = LocationEnricher::new(service, ZURICH_HB);
        let result = enricher.enrich("Atlantis");

        assert_eq!(result, LocationEnrichment::default());
        assert_eq!(enricher.service.geocode_calls.get(), 1);
        assert!(enricher.service.routes_requested.borrow().is_empty());
    }

    #[test]
    fn test_absent_origin_is_instant_none() {
        let enricher = LocationEnricher::new(FakeService::default(), ZURICH_HB);
        assert_eq!(enricher.driving_time(None), None);
        assert!(enricher.service.routes_requested.borrow().is_empty());
    }

    #[test]
    fn test_no_route_gives_no_time() {
        let service = FakeService {
            origin: Some(Coordinates::new(46.0, 7.0)),
            duration: None,
            ..Default::default()
        };
        let enricher = LocationEnricher::new(service, ZURICH_HB);
        let result = enricher.enrich("Somewhere");
        assert!(result.coordinates.is_some());
        assert_eq!(result.driving_time, None);
    }

    #[test]
    fn test_parse_geocode_response() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[8.7209,47.3471]},
                 "properties":{"label":"Uster, ZH, Switzerland"}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            first_feature_coordinates(body),
            Some(Coordinates::new(47.3471, 8.7209))
        );

        let empty: GeocodeResponse = serde_json::from_str(r#"{"features":[]}"#).unwrap();
        assert_eq!(first_feature_coordinates(empty), None);

        let missing: GeocodeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(first_feature_coordinates(missing), None);
    }

    #[test]
    fn test_parse_directions_response() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{"routes":[{"summary":{"distance":24012.3,"duration":1500.4}}]}"#,
        )
        .unwrap();
        assert_eq!(first_route_duration(body), Some(1500.4));

        let zero_length: DirectionsResponse =
            serde_json::from_str(r#"{"routes":[{"summary":{}}]}"#).unwrap();
        assert_eq!(first_route_duration(zero_length), None);

        let none: DirectionsResponse = serde_json::from_str(r#"{"routes":[]}"#).unwrap();
        assert_eq!(first_route_duration(none), None);
    }

    #[test]
    fn test_seconds_to_minutes_rounding() {
        assert_eq!(seconds_to_minutes(1234.0), 20.6);
        assert_eq!(seconds_to_minutes(60.0), 1.0);
        assert_eq!(seconds_to_minutes(0.0), 0.0);
        assert_eq!(seconds_to_minutes(3330.0), 55.5);
    }

    #[test]
    fn test_missing_key_short_circuits() {
        let service = OpenRouteService::new(EnrichmentConfig::default()).unwrap();
        assert_eq!(service.geocode("Uster"), None);
        assert_eq!(
            service.route_duration(Coordinates::new(47.0, 8.0), ZURICH_HB),
            None
        );
    }

    #[test]
    fn test_geocode_url_always_appends_country() {
        let service = OpenRouteService::new(EnrichmentConfig::default()).unwrap();
        let url = service.geocode_url("key", "Küsnacht");
        assert!(url.starts_with("https://api.openrouteservice.org/geocode/search?api_key=key"));
        assert!(url.contains("text=K%C3%BCsnacht%2C%20Switzerland"));
        assert!(url.contains("boundary.country=CH"));
        assert!(url.ends_with("size=1"));

        let url = service.geocode_url("key", "Bern, Switzerland");
        assert!(url.contains("text=Bern%2C%20Switzerland%2C%20Switzerland&"));
    }

    fn service_at(base_url: &str) -> OpenRouteService {
        let config = EnrichmentConfig {
            geocode_url: format!("{}/geocode/search", base_url),
            directions_url: format!("{}/v2/directions/driving-car", base_url),
            ..EnrichmentConfig::default()
        }
        .with_api_key(Some("secret".to_string()));
        OpenRouteService::new(config).unwrap()
    }

    #[test]
    fn test_geocode_over_http() {
        let server = StubServer::respond(
            200,
            r#"{"features":[{"geometry":{"coordinates":[8.7209,47.3471]}}]}"#,
        );
        let service = service_at(&server.base_url);

        assert_eq!(service.geocode("Uster"), Some(Coordinates::new(47.3471, 8.7209)));
        let request = server.request();
        assert!(request.starts_with(
            "GET /geocode/search?api_key=secret&text=Uster%2C%20Switzerland&boundary.country=CH&size=1 "
        ));
    }

    #[test]
    fn test_geocode_error_status_is_none() {
        let server = StubServer::respond(403, r#"{"error":"Access to this API has been disallowed"}"#);
        let service = service_at(&server.base_url);

        assert_eq!(service.geocode("Uster"), None);
        server.request();
    }

    #[test]
    fn test_route_over_http() {
        let server = StubServer::respond(200, r#"{"routes":[{"summary":{"duration":1234.0}}]}"#);
        let service = service_at(&server.base_url);
        let uster = Coordinates::new(47.3471, 8.7209);

        assert_eq!(service.route_duration(uster, ZURICH_HB), Some(1234.0));
        let request = server.request();
        assert!(request.starts_with("POST /v2/directions/driving-car "));
        assert!(request.to_lowercase().contains("\r\nauthorization: secret\r\n"));
        assert!(request.ends_with(r#"{"coordinates":[[8.7209,47.3471],[8.540192,47.378177]]}"#));
    }

    #[test]
    fn test_route_error_status_is_none() {
        let server = StubServer::respond(500, "internal error");
        let service = service_at(&server.base_url);

        let enricher = LocationEnricher::new(service, ZURICH_HB);
        assert_eq!(enricher.driving_time(Some(Coordinates::new(47.3471, 8.7209))), None);
        server.request();
    }

    #[test]
    fn test_unreachable_service_is_none() {
        let service = service_at(&closed_port_url());
        assert_eq!(service.geocode("Uster"), None);
        assert_eq!(
            service.route_duration(Coordinates::new(47.3471, 8.7209), ZURICH_HB),
            None
        );
    }
}
