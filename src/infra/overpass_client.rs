use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{Airport, ExtractScope, ExtractedLounge, LoungeSourcePort, SourceInfo};
use crate::constants::OSM_SOURCE_NAME;
use crate::domain::LoungeType;
use crate::error::{LoungeError, Result};

/// Every element tagged as an airport lounge. `out center` gives ways a
/// single reference point.
const LOUNGE_QUERY: &str = r#"[out:json][timeout:60];
(
  node["amenity"="lounge"]["aeroway"];
  way["amenity"="lounge"]["aeroway"];
  node["aeroway"="lounge"];
  way["aeroway"="lounge"];
);
out center tags;"#;

/// Facility tags mapped to amenity labels.
const AMENITY_TAGS: &[(&[&str], &str)] = &[
    (&["wifi", "internet_access"], "Wi-Fi"),
    (&["food"], "Food"),
    (&["bar"], "Bar"),
    (&["shower"], "Showers"),
];

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

impl Element {
    fn tag(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.tags.get(*k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn tag_is_yes(&self, keys: &[&str]) -> bool {
        keys.iter()
            .filter_map(|k| self.tags.get(*k))
            .any(|v| matches!(v.trim(), "yes" | "wlan" | "wifi"))
    }

    fn amenities(&self) -> Vec<String> {
        AMENITY_TAGS
            .iter()
            .filter(|(keys, _)| self.tag_is_yes(keys))
            .map(|(_, label)| label.to_string())
            .collect()
    }

    /// `None` for relations and for elements with neither a name nor an
    /// operator.
    fn into_lounge(self) -> Option<ExtractedLounge> {
        if self.kind != "node" && self.kind != "way" {
            return None;
        }
        let name = self.tag(&["name", "name:en", "operator"])?;
        let (latitude, longitude) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (Some(lat), Some(lon)),
            (_, _, Some(c)) => (Some(c.lat), Some(c.lon)),
            _ => (None, None),
        };
        let operator = self.tag(&["operator"]);
        let lounge_type = LoungeType::infer(operator.as_deref().unwrap_or(&name));

        Some(ExtractedLounge {
            id: format!("osm_{}", self.id),
            source: OSM_SOURCE_NAME.to_string(),
            airport_code: self.tag(&["iata", "ref:iata"]).map(|c| c.to_uppercase()),
            airport_name: self.tag(&["airport"]),
            terminal: self.tag(&["terminal", "level"]),
            location: self.tag(&["location"]),
            latitude,
            longitude,
            lounge_type: Some(lounge_type.as_str().to_string()),
            open_hours: self.tag(&["opening_hours"]),
            amenities: self.amenities(),
            website: self.tag(&["website", "contact:website"]),
            osm_id: Some(format!("{}/{}", self.kind, self.id)),
            verification_source: Some("osm_data".to_string()),
            operator,
            name,
            ..Default::default()
        })
    }
}

fn parse_response(body: OverpassResponse) -> Vec<ExtractedLounge> {
    body.elements.into_iter().filter_map(Element::into_lounge).collect()
}

/// Worldwide lounge query against an Overpass API interpreter.
pub struct OverpassClient {
    client: reqwest::Client,
    api_url: String,
    info: SourceInfo,
}

impl OverpassClient {
    pub fn new(api_url: impl Into<String>, user_agent: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            info: SourceInfo {
                name: OSM_SOURCE_NAME.to_string(),
                license: "ODbL".to_string(),
                attribution: "© OpenStreetMap contributors (openstreetmap.org/copyright)".to_string(),
            },
        })
    }
}

#[async_trait]
impl LoungeSourcePort for OverpassClient {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn scope(&self) -> ExtractScope {
        ExtractScope::Worldwide
    }

    async fn fetch(&self, _airport: Option<&Airport>) -> Result<Vec<ExtractedLounge>> {
        let resp = self
            .client
            .post(&self.api_url)
            .form(&[("data", LOUNGE_QUERY)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LoungeError::Api {
                message: format!("overpass query failed: {} - {}", status, body),
            });
        }

        let body: OverpassResponse = resp.json().await?;
        debug!("Overpass returned {} elements", body.elements.len());
        Ok(parse_response(body))
    }
}
