use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{Airport, ExtractScope, ExtractedLounge, LoungeSourcePort, SourceInfo};
use crate::constants::{GOOGLE_PLACES_SOURCE_NAME, PLACES_RADIUS_M};
use crate::domain::LoungeType;
use crate::error::{LoungeError, Result};

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<Place>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: String,
    geometry: Option<Geometry>,
    vicinity: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    business_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl Place {
    fn into_lounge(self, airport: &Airport) -> Option<ExtractedLounge> {
        let name = self.name.trim().to_string();
        if name.is_empty() || self.place_id.is_empty() {
            return None;
        }
        if self.business_status.as_deref() == Some("CLOSED_PERMANENTLY") {
            return None;
        }
        let lounge_type = LoungeType::infer(&name);
        Some(ExtractedLounge {
            id: format!("google_{}", self.place_id),
            source: GOOGLE_PLACES_SOURCE_NAME.to_string(),
            airport_code: Some(airport.iata_code.clone()),
            airport_name: Some(airport.name.clone()),
            city: airport.municipality.clone(),
            location: self.vicinity.filter(|v| !v.trim().is_empty()),
            latitude: self.geometry.as_ref().map(|g| g.location.lat),
            longitude: self.geometry.as_ref().map(|g| g.location.lng),
            lounge_type: Some(lounge_type.as_str().to_string()),
            rating: self.rating.filter(|r| *r > 0.0),
            review_count: self.user_ratings_total,
            google_place_id: Some(self.place_id),
            verification_source: Some("google_places".to_string()),
            name,
            ..Default::default()
        })
    }
}

/// `OK` and `ZERO_RESULTS` are answers; every other status is an error.
fn parse_response(body: NearbyResponse, airport: &Airport) -> Result<Vec<ExtractedLounge>> {
    match body.status.as_str() {
        "OK" => Ok(body
            .results
            .into_iter()
            .filter_map(|place| place.into_lounge(airport))
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => Err(LoungeError::Api {
            message: format!(
                "places search at {} returned {}: {}",
                airport.iata_code,
                status,
                body.error_message.unwrap_or_default()
            ),
        }),
    }
}

/// Nearby search for "airport lounge" around each airport's reference
/// point.
pub struct GooglePlacesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    info: SourceInfo,
}

impl GooglePlacesClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            info: SourceInfo {
                name: GOOGLE_PLACES_SOURCE_NAME.to_string(),
                license: "Google Maps Platform Terms of Service".to_string(),
                attribution: "Map data © Google".to_string(),
            },
        })
    }
}

#[async_trait]
impl LoungeSourcePort for GooglePlacesClient {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn scope(&self) -> ExtractScope {
        ExtractScope::PerAirport
    }

    async fn fetch(&self, airport: Option<&Airport>) -> Result<Vec<ExtractedLounge>> {
        let airport = airport.ok_or_else(|| LoungeError::Config("places search needs an airport".into()))?;
        let location = format!("{},{}", airport.latitude, airport.longitude);
        let radius = PLACES_RADIUS_M.to_string();
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("keyword", "airport lounge"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoungeError::Api {
                message: format!("places search at {} failed: {}", airport.iata_code, status),
            });
        }

        let body: NearbyResponse = resp.json().await?;
        debug!("{}: places status {} with {} results", airport.iata_code, body.status, body.results.len());
        parse_response(body, airport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dxb() -> Airport {
        Airport {
            iata_code: "DXB".into(),
            name: "Dubai International".into(),
            latitude: 25.2532,
            longitude: 55.3657,
            elevation_ft: None,
            municipality: Some("Dubai".into()),
            iso_country: Some("AE".into()),
            continent: Some("AS".into()),
            wikipedia: None,
        }
    }

    fn parse(body: &str) -> Result<Vec<ExtractedLounge>> {
        parse_response(serde_json::from_str(body).unwrap(), &dxb())
    }

    #[test]
    fn test_results_are_tied_to_the_queried_airport() {
        let lounges = parse(
            r#"{"status": "OK", "results": [
                {"place_id": "abc", "name": "Marhaba Lounge", "vicinity": "Terminal 3",
                 "geometry": {"location": {"lat": 25.25, "lng": 55.36}},
                 "rating": 4.2, "user_ratings_total": 310, "business_status": "OPERATIONAL"},
                {"place_id": "old", "name": "Closed Lounge", "business_status": "CLOSED_PERMANENTLY"},
                {"place_id": "", "name": "No id"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(lounges.len(), 1);
        let lounge = &lounges[0];
        assert_eq!(lounge.id, "google_abc");
        assert_eq!(lounge.airport_code.as_deref(), Some("DXB"));
        assert_eq!(lounge.city.as_deref(), Some("Dubai"));
        assert_eq!(lounge.location.as_deref(), Some("Terminal 3"));
        assert_eq!(lounge.rating, Some(4.2));
        assert_eq!(lounge.review_count, Some(310));
    }

    #[test]
    fn test_zero_results_is_empty_and_denied_is_error() {
        assert!(parse(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap().is_empty());
        let err = parse(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#).unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
    }
}
