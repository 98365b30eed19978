//! Canonical lounge record shared by every pipeline stage.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// Parse the `"lat,lng"` form used in tabular exports.
    pub fn parse_pair(value: &str) -> Option<Self> {
        let (lat, lng) = value.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        Self::new(lat, lng)
    }

    pub fn to_pair_string(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }

    /// Both axes differ by less than `tolerance` degrees.
    pub fn is_near(&self, other: &Coordinates, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() < tolerance && (self.lng - other.lng).abs() < tolerance
    }
}

/// Kind of lounge. The set is open: unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoungeType {
    Independent,
    Airline,
    Operator,
    Centurion,
    Partner,
    Other(String),
}

impl LoungeType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "independent" => LoungeType::Independent,
            "airline" => LoungeType::Airline,
            "operator" => LoungeType::Operator,
            "centurion" => LoungeType::Centurion,
            "partner" => LoungeType::Partner,
            other => LoungeType::Other(other.to_string()),
        }
    }

    /// Best guess from an operator or lounge name, used for datasets that
    /// carry no explicit type.
    pub fn infer(text: &str) -> Self {
        let text = text.to_lowercase();
        if ["centurion", "amex", "american express"].iter().any(|t| text.contains(t)) {
            LoungeType::Centurion
        } else if ["priority pass", "plaza premium"].iter().any(|t| text.contains(t)) {
            LoungeType::Operator
        } else if ["airline", "airways"].iter().any(|t| text.contains(t)) {
            LoungeType::Airline
        } else {
            LoungeType::Independent
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LoungeType::Independent => "independent",
            LoungeType::Airline => "airline",
            LoungeType::Operator => "operator",
            LoungeType::Centurion => "centurion",
            LoungeType::Partner => "partner",
            LoungeType::Other(label) => label,
        }
    }
}

impl fmt::Display for LoungeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for LoungeType {
    fn from(value: String) -> Self {
        LoungeType::parse(&value)
    }
}

impl From<LoungeType> for String {
    fn from(value: LoungeType) -> Self {
        value.as_str().to_string()
    }
}

/// Identifiers of the record in third-party datasets. A merged record may
/// carry several ids per dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, rename = "osm_ids")]
    pub osm: BTreeSet<String>,
    #[serde(default, rename = "wikidata_ids")]
    pub wikidata: BTreeSet<String>,
    #[serde(default, rename = "google_place_ids")]
    pub google_place: BTreeSet<String>,
}

impl ExternalIds {
    pub fn is_empty(&self) -> bool {
        self.osm.is_empty() && self.wikidata.is_empty() && self.google_place.is_empty()
    }

    pub fn union_with(&mut self, other: &ExternalIds) {
        self.osm.extend(other.osm.iter().cloned());
        self.wikidata.extend(other.wikidata.iter().cloned());
        self.google_place.extend(other.google_place.iter().cloned());
    }
}

/// One lounge, either as read from a single source or as the canonical
/// record produced by merging several sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoungeRecord {
    pub id: String,
    pub name: String,
    pub airport_code: Option<String>,
    pub airport_name: Option<String>,
    pub terminal: Option<String>,

    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub iso_country: Option<String>,
    pub location: Option<String>,
    /// Position of the lounge itself, as reported by a source
    pub coordinates: Option<Coordinates>,
    /// Reference point of the airport, filled by enrichment
    pub airport_coordinates: Option<Coordinates>,

    pub amenities: BTreeSet<String>,
    pub access_methods: BTreeSet<String>,
    pub lounge_type: Option<LoungeType>,
    pub description: Option<String>,
    pub open_hours: Option<String>,
    pub conditions: Option<String>,
    pub rating: f64,
    pub review_count: u32,
    pub images: Vec<String>,

    pub source: String,
    pub data_sources: BTreeSet<String>,
    #[serde(flatten)]
    pub external_ids: ExternalIds,
    pub verified: bool,
    pub verification_source: Option<String>,
    pub merge_count: u32,
}

impl LoungeRecord {
    /// A fresh single-source record with every optional attribute absent.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: id.into(),
            name: name.into(),
            airport_code: None,
            airport_name: None,
            terminal: None,
            city: None,
            country: None,
            continent: None,
            iso_country: None,
            location: None,
            coordinates: None,
            airport_coordinates: None,
            amenities: BTreeSet::new(),
            access_methods: BTreeSet::new(),
            lounge_type: None,
            description: None,
            open_hours: None,
            conditions: None,
            rating: 0.0,
            review_count: 0,
            images: Vec::new(),
            data_sources: BTreeSet::from([source.clone()]),
            source,
            external_ids: ExternalIds::default(),
            verified: false,
            verification_source: None,
            merge_count: 1,
        }
    }

    pub fn airport_code_or_empty(&self) -> &str {
        self.airport_code.as_deref().unwrap_or("")
    }

    /// Best known position: the lounge's own, else its airport's.
    pub fn position(&self) -> Option<Coordinates> {
        self.coordinates.or(self.airport_coordinates)
    }

    pub fn has_rating(&self) -> bool {
        self.rating > 0.0
    }
}
