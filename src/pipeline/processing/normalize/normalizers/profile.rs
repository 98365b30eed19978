use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::base::{NormalizerUtils as U, SourceNormalizer};
use crate::domain::{ExternalIds, LoungeRecord, LoungeType};
use crate::error::{LoungeError, Result};
use crate::pipeline::processing::normalize::{NormalizedRecord, RawRecord};

/// Column conventions and defaults of one provider export.
///
/// Every alias list is tried in order; the first non-empty value wins.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub source_id: &'static str,
    pub label: &'static str,
    pub display_name: &'static str,

    pub id_fields: &'static [&'static str],
    pub name_fields: &'static [&'static str],
    pub code_fields: &'static [&'static str],
    /// Values that are either an IATA code or an airport name
    pub airport_fields: &'static [&'static str],
    pub airport_name_fields: &'static [&'static str],
    pub terminal_fields: &'static [&'static str],
    pub city_fields: &'static [&'static str],
    pub country_fields: &'static [&'static str],
    pub location_fields: &'static [&'static str],
    pub hours_fields: &'static [&'static str],
    pub conditions_fields: &'static [&'static str],
    pub description_fields: &'static [&'static str],
    pub airline_fields: &'static [&'static str],

    pub lounge_type: Option<LoungeType>,
    pub access_methods: &'static [&'static str],
    pub amenities: &'static [&'static str],
    pub default_country: Option<&'static str>,
    /// Trust a `source` column on the row over `label`
    pub source_from_row: bool,
}

impl ProviderProfile {
    /// The pipeline's own master schema.
    pub fn canonical(source_id: &'static str, label: &'static str, display_name: &'static str) -> Self {
        Self {
            source_id,
            label,
            display_name,
            id_fields: &["id"],
            name_fields: &["name"],
            code_fields: &["airport_code", "iata_code", "iata"],
            airport_fields: &["airport"],
            airport_name_fields: &["airport_name"],
            terminal_fields: &["terminal"],
            city_fields: &["city"],
            country_fields: &["country"],
            location_fields: &["location"],
            hours_fields: &["open_hours", "opening_hours", "hours"],
            conditions_fields: &["conditions"],
            description_fields: &["description"],
            airline_fields: &[],
            lounge_type: None,
            access_methods: &[],
            amenities: &[],
            default_country: None,
            source_from_row: true,
        }
    }
}

/// Normalizer driven entirely by a [`ProviderProfile`].
pub struct ProfileNormalizer {
    profile: ProviderProfile,
}

impl ProfileNormalizer {
    pub fn new(profile: ProviderProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    fn source_label(&self, raw: &RawRecord, data: &Map<String, Value>) -> String {
        if let Some(label) = raw.source_label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.trim().to_string();
        }
        if self.profile.source_from_row {
            if let Some(source) = U::field(data, &["source"]) {
                return source;
            }
        }
        self.profile.label.to_string()
    }

    fn external_ids(data: &Map<String, Value>) -> ExternalIds {
        ExternalIds {
            osm: U::list_field(data, &["osm_ids", "osm_id"]).into_iter().collect(),
            wikidata: U::list_field(data, &["wikidata_ids", "wikidata_id"])
                .into_iter()
                .collect(),
            google_place: U::list_field(data, &["google_place_ids", "google_place_id", "place_id"])
                .into_iter()
                .collect(),
        }
    }
}

impl SourceNormalizer for ProfileNormalizer {
    fn normalize(&self, raw: &RawRecord) -> Result<Option<NormalizedRecord>> {
        let p = &self.profile;
        let data = raw.record.as_object().ok_or_else(|| LoungeError::Normalize {
            source_id: raw.source_id.clone(),
            row: raw.row_number,
            message: "expected an object of fields".to_string(),
        })?;

        let name = U::field(data, p.name_fields).unwrap_or_default();
        let (airport_code, airport_name) = U::resolve_airport(
            U::field(data, p.code_fields),
            U::field(data, p.airport_fields),
            U::field(data, p.airport_name_fields),
        );

        if name.is_empty() {
            return Ok(None);
        }

        let terminal = U::field(data, p.terminal_fields);
        let source = self.source_label(raw, data);

        let id = U::field(data, p.id_fields).unwrap_or_else(|| {
            U::generate_id(&name, airport_code.as_deref(), terminal.as_deref())
        });

        let mut record = LoungeRecord::new(id, name, source.clone());
        record.airport_code = airport_code;
        record.airport_name = airport_name;
        record.terminal = terminal;
        record.city = U::field(data, p.city_fields);

        let raw_country = U::field(data, p.country_fields)
            .or_else(|| p.default_country.map(str::to_string));
        record.iso_country = U::field(data, &["iso_country", "country_code"])
            .map(|c| c.to_uppercase())
            .or_else(|| {
                raw_country
                    .as_deref()
                    .filter(|c| c.len() == 2 && crate::constants::country_name_for_iso(c).is_some())
                    .map(|c| c.to_uppercase())
            });
        record.country = raw_country.map(U::normalize_country);
        record.continent = U::field(data, &["continent"]);

        record.location = U::field(data, p.location_fields);
        record.coordinates = U::parse_coordinates(data);
        record.airport_coordinates = U::coordinates_at(data, &["airport_coordinates"]);

        record.amenities = U::list_field(data, &["amenities"]).into_iter().collect();
        record.amenities.extend(p.amenities.iter().map(|a| a.to_string()));

        let mut access: BTreeSet<String> =
            U::list_field(data, &["access_methods", "access"]).into_iter().collect();
        access.extend(p.access_methods.iter().map(|a| a.to_string()));
        if let Some(airline) = U::field(data, p.airline_fields) {
            access.insert(format!("{} First/Business Class", airline));
        }
        record.access_methods = access;

        record.lounge_type = U::field(data, &["lounge_type", "type"])
            .map(|t| LoungeType::parse(&t))
            .or_else(|| p.lounge_type.clone());
        record.description = U::field(data, p.description_fields);
        record.open_hours = U::field(data, p.hours_fields);
        record.conditions = U::field(data, p.conditions_fields);

        record.rating = U::raw_field(data, &["rating"])
            .and_then(U::parse_f64)
            .filter(|r| *r > 0.0)
            .unwrap_or(0.0);
        record.review_count = U::raw_field(data, &["review_count", "reviews"])
            .and_then(U::parse_u32)
            .unwrap_or(0);

        let mut images = Vec::new();
        for image in U::list_field(data, &["images", "image_url"]) {
            if !images.contains(&image) {
                images.push(image);
            }
        }
        record.images = images;

        let listed_sources = U::list_field(data, &["data_sources"]);
        if !listed_sources.is_empty() {
            record.data_sources = listed_sources.into_iter().collect();
            record.data_sources.insert(source);
        }
        record.external_ids = Self::external_ids(data);
        record.verified = U::raw_field(data, &["verified"])
            .and_then(U::parse_bool)
            .unwrap_or(false);
        record.verification_source = U::field(data, &["verification_source"]);
        record.merge_count = U::raw_field(data, &["merge_count"])
            .and_then(U::parse_u32)
            .unwrap_or(1)
            .max(1);

        Ok(Some(NormalizedRecord::from_record(record)))
    }

    fn source_id(&self) -> &str {
        self.profile.source_id
    }

    fn name(&self) -> &str {
        self.profile.display_name
    }
}
