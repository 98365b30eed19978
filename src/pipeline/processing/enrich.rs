use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::ports::{Airport, AirportLookup};
use crate::constants::country_name_for_iso;
use crate::domain::{Coordinates, LoungeRecord};
use crate::observability::metrics::{emit_counter, MetricName};

/// What happened to one record during airport enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Code found in the airport table; missing fields were filled
    Matched,
    /// Code not present in the airport table
    UnknownAirport(String),
    /// Record has no airport code to look up
    NoAirportCode,
}

/// Summary of an enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub missing: usize,
    pub without_code: usize,
    /// Sorted codes that the airport table did not know
    pub missing_codes: BTreeSet<String>,
}

/// Trait for filling location attributes from reference data
pub trait Enricher {
    fn enrich(&self, record: &mut LoungeRecord) -> EnrichmentOutcome;

    fn enrich_all(&self, records: &mut [LoungeRecord]) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        for record in records.iter_mut() {
            match self.enrich(record) {
                EnrichmentOutcome::Matched => report.enriched += 1,
                EnrichmentOutcome::UnknownAirport(code) => {
                    report.missing += 1;
                    report.missing_codes.insert(code);
                }
                EnrichmentOutcome::NoAirportCode => report.without_code += 1,
            }
        }
        report
    }
}

/// Enricher backed by an airport reference table
pub struct DefaultEnricher {
    airports: Arc<dyn AirportLookup>,
}

impl DefaultEnricher {
    pub fn new(airports: Arc<dyn AirportLookup>) -> Self {
        Self { airports }
    }

    fn fill(target: &mut Option<String>, value: Option<&str>) {
        if target.is_none() {
            *target = value.filter(|v| !v.trim().is_empty()).map(str::to_string);
        }
    }

    fn apply(record: &mut LoungeRecord, airport: &Airport) {
        if record.airport_coordinates.is_none() {
            record.airport_coordinates = Coordinates::new(airport.latitude, airport.longitude);
        }
        Self::fill(&mut record.airport_name, Some(airport.name.as_str()));
        Self::fill(&mut record.city, airport.municipality.as_deref());
        Self::fill(&mut record.iso_country, airport.iso_country.as_deref());
        Self::fill(&mut record.continent, airport.continent.as_deref());
        if record.country.is_none() {
            record.country = airport
                .iso_country
                .as_deref()
                .and_then(country_name_for_iso)
                .map(str::to_string);
        }
    }
}

impl Enricher for DefaultEnricher {
    fn enrich(&self, record: &mut LoungeRecord) -> EnrichmentOutcome {
        let code = match record.airport_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_uppercase(),
            _ => return EnrichmentOutcome::NoAirportCode,
        };

        match self.airports.lookup(&code) {
            Some(airport) => {
                Self::apply(record, airport);
                emit_counter(MetricName::EnrichAirportHits, 1);
                EnrichmentOutcome::Matched
            }
            None => {
                emit_counter(MetricName::EnrichAirportMisses, 1);
                EnrichmentOutcome::UnknownAirport(code)
            }
        }
    }
}
