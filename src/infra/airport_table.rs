use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::app::ports::{Airport, AirportLookup};
use crate::error::{LoungeError, Result};

/// One row of an OurAirports-style `airports.csv`. Everything is read as
/// text so that a bad cell only skips its row.
#[derive(Debug, Deserialize)]
struct AirportRow {
    #[serde(default)]
    iata_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    latitude_deg: Option<String>,
    #[serde(default)]
    longitude_deg: Option<String>,
    #[serde(default)]
    elevation_ft: Option<String>,
    #[serde(default)]
    municipality: Option<String>,
    #[serde(default)]
    iso_country: Option<String>,
    #[serde(default)]
    continent: Option<String>,
    #[serde(default)]
    wikipedia_link: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AirportRow {
    fn into_airport(self) -> Option<Airport> {
        let iata_code = non_empty(self.iata_code)?.to_uppercase();
        let latitude = self.latitude_deg.as_deref()?.trim().parse::<f64>().ok()?;
        let longitude = self.longitude_deg.as_deref()?.trim().parse::<f64>().ok()?;
        Some(Airport {
            name: non_empty(self.name).unwrap_or_else(|| iata_code.clone()),
            iata_code,
            latitude,
            longitude,
            elevation_ft: self
                .elevation_ft
                .as_deref()
                .and_then(|e| e.trim().parse::<f64>().ok())
                .map(|e| e.round() as i32),
            municipality: non_empty(self.municipality),
            iso_country: non_empty(self.iso_country).map(|c| c.to_uppercase()),
            continent: non_empty(self.continent).map(|c| c.to_uppercase()),
            wikipedia: non_empty(self.wikipedia_link),
        })
    }
}

/// In-memory airport table keyed by IATA code.
#[derive(Debug, Default)]
pub struct AirportTable {
    airports: HashMap<String, Airport>,
}

impl AirportTable {
    pub fn from_airports(airports: impl IntoIterator<Item = Airport>) -> Self {
        Self {
            airports: airports
                .into_iter()
                .map(|a| (a.iata_code.clone(), a))
                .collect(),
        }
    }

    /// Load the table. Rows without an IATA code or with unparseable
    /// coordinates are skipped; the first row for a code wins.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LoungeError::MissingInput(path.to_path_buf()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut airports = HashMap::new();
        let mut skipped = 0usize;
        for result in reader.deserialize::<AirportRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping malformed airport row: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            match row.into_airport() {
                Some(airport) => {
                    airports.entry(airport.iata_code.clone()).or_insert(airport);
                }
                None => skipped += 1,
            }
        }

        info!(
            "Loaded {} airports from {} ({} rows skipped)",
            airports.len(),
            path.display(),
            skipped
        );
        Ok(Self { airports })
    }

    /// Distinct airports in code order.
    pub fn airports(&self) -> Vec<&Airport> {
        let mut all: Vec<&Airport> = self.airports.values().collect();
        all.sort_by(|a, b| a.iata_code.cmp(&b.iata_code));
        all
    }
}

impl AirportLookup for AirportTable {
    fn lookup(&self, iata_code: &str) -> Option<&Airport> {
        self.airports.get(&iata_code.trim().to_uppercase())
    }

    fn len(&self) -> usize {
        self.airports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_skips_rows_without_code_or_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("airports.csv");
        fs::write(
            &path,
            "id,ident,type,name,latitude_deg,longitude_deg,elevation_ft,continent,iso_country,municipality,iata_code,wikipedia_link\n\
             1,LTFM,large_airport,Istanbul Airport,41.2753,28.7519,325,EU,TR,Istanbul,IST,https://en.wikipedia.org/wiki/Istanbul_Airport\n\
             2,XXXX,heliport,Pad,10,10,,EU,TR,Nowhere,,\n\
             3,YYYY,small_airport,Broken,north,10,,EU,TR,Nowhere,BRK,\n",
        )
        .unwrap();

        let table = AirportTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
        let ist = table.lookup("ist").unwrap();
        assert_eq!(ist.name, "Istanbul Airport");
        assert_eq!(ist.elevation_ft, Some(325));
        assert_eq!(ist.municipality.as_deref(), Some("Istanbul"));
        assert!(table.lookup("BRK").is_none());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AirportTable::load(&dir.path().join("nope.csv")).is_err());
    }
}
