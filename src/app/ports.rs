use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Reference data for one airport, keyed by IATA code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub iata_code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_ft: Option<i32>,
    pub municipality: Option<String>,
    pub iso_country: Option<String>,
    pub continent: Option<String>,
    pub wikipedia: Option<String>,
}

/// Airport reference table lookups. Synchronous: the table is loaded into
/// memory before enrichment starts.
pub trait AirportLookup: Send + Sync {
    fn lookup(&self, iata_code: &str) -> Option<&Airport>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One candidate photo for a lounge, with attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    pub photographer: Option<String>,
    pub photographer_url: Option<String>,
    pub source_page: Option<String>,
}

/// Licence terms of a dataset the extract stage reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Provenance label written into every extracted row
    pub name: String,
    pub license: String,
    pub attribution: String,
}

/// One lounge as reported by an open dataset or places API, using the field
/// names the canonical normalizer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLounge {
    pub id: String,
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lounge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_source: Option<String>,
}

/// Whether a lounge source answers one worldwide query or one query per
/// airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractScope {
    Worldwide,
    PerAirport,
}

// Extraction-side ports
#[async_trait]
pub trait LoungeSourcePort: Send + Sync {
    fn info(&self) -> &SourceInfo;

    fn scope(&self) -> ExtractScope;

    /// Lounges near `airport`, or every lounge the dataset knows when
    /// `airport` is `None`.
    async fn fetch(&self, airport: Option<&Airport>) -> Result<Vec<ExtractedLounge>>;
}

// Enrichment-side ports
#[async_trait]
pub trait PhotoSearchPort: Send + Sync {
    /// Up to `per_page` photos for a free-text query. An empty result is not
    /// an error.
    async fn search(&self, query: &str, per_page: usize) -> Result<Vec<Photo>>;
}

// Publish-side ports
#[async_trait]
pub trait RecordSinkPort: Send + Sync {
    /// Upsert one batch of rows into `table`.
    async fn upsert_batch(&self, table: &str, rows: &[serde_json::Value]) -> Result<()>;
}
