use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use lounge_merge::app::merge_use_case::{run_dedupe, run_merge};
use lounge_merge::app::ports::{Airport, AirportLookup};
use lounge_merge::config::{Config, SourceConfig};
use lounge_merge::infra::{json_export, master_csv, AirportTable};
use serde_json::Value;
use tempfile::tempdir;

fn write(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
}

fn source(id: &str, path: &Path, required: bool) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        path: path.to_path_buf(),
        format: None,
        label: None,
        required,
    }
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.merge.master_csv = dir.join("out/master_lounges.csv");
    config.merge.master_json = dir.join("out/master_lounges.json");
    config
}

#[test]
fn test_merge_sources_into_master_files() -> Result<()> {
    let dir = tempdir()?;
    let pp = dir.path().join("prioritypass_lounges.csv");
    write(
        &pp,
        "Lounge Name,Airport (IATA),Airport Full,Terminal,City,Country,Hours\n\
         Priority Pass Lounge,IST,Istanbul Airport,International,Istanbul,Turkey,24 hours\n\
         Priority Pass Lounge,IST,Istanbul Airport,Domestic,Istanbul,Turkey,06:00-22:00\n\
         SkyClub,ATL,Hartsfield-Jackson,,Atlanta,USA,\n\
         ,,,,,,\n",
    );
    let supabase = dir.path().join("supabase_lounges.csv");
    write(
        &supabase,
        "name,airport,city,country,rating,review_count,amenities\n\
         Delta SkyClub,ATL,Atlanta,United States,4.5,120,\"[\"\"Wi-Fi\"\", \"\"Showers\"\"]\"\n",
    );
    let mut config = config_in(dir.path());
    config.sources = vec![
        source("priority_pass", &pp, true),
        source("supabase", &supabase, true),
        source("amex", &dir.path().join("missing_amex.csv"), false),
    ];

    let outcome = run_merge(&config, None)?;
    assert_eq!(outcome.stats.input, 5);
    assert_eq!(outcome.stats.dropped, 1);
    assert_eq!(outcome.stats.duplicates_merged, 1);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.sources, vec!["priority_pass", "supabase"]);

    let atl = outcome
        .records
        .iter()
        .find(|r| r.airport_code.as_deref() == Some("ATL"))
        .unwrap();
    assert_eq!(atl.rating, 4.5);
    assert_eq!(atl.review_count, 120);
    assert!(atl.amenities.contains("Wi-Fi"));
    assert!(atl.access_methods.contains("Priority Pass"));
    assert_eq!(atl.data_sources.len(), 2);

    let reread = master_csv::read_master_csv(&config.merge.master_csv)?;
    assert_eq!(reread, outcome.records);

    let json: Value = serde_json::from_str(&fs::read_to_string(&config.merge.master_json)?)?;
    assert_eq!(json["metadata"]["total_lounges"], 3);
    assert_eq!(json["metadata"]["duplicates_merged"], 1);
    assert_eq!(json["lounges"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[test]
fn test_missing_required_source_writes_nothing() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.sources = vec![source("priority_pass", &dir.path().join("nope.csv"), true)];

    assert!(run_merge(&config, None).is_err());
    assert!(!config.merge.master_csv.exists());
}

#[test]
fn test_dedupe_is_stable_on_its_own_output() -> Result<()> {
    let dir = tempdir()?;
    let canonical = dir.path().join("lounges_osm.json");
    write(
        &canonical,
        r#"{"lounges": [
            {"name": "Plaza Premium Lounge", "airport_code": "LHR", "terminal": "T2", "source": "OpenStreetMap", "osm_id": "node/1"},
            {"name": "Plaza Premium Lounge", "airport_code": "LHR", "terminal": "T2", "source": "Wikidata", "wikidata_id": "Q1"},
            {"name": "Plaza Premium Lounge", "airport_code": "HKG", "source": "OpenStreetMap"}
        ]}"#,
    );
    let mut config = config_in(dir.path());
    config.sources = vec![source("canonical", &canonical, true)];

    let merged = run_merge(&config, None)?;
    assert_eq!(merged.records.len(), 2);
    let lhr = &merged.records[0];
    assert!(lhr.external_ids.osm.contains("node/1"));
    assert!(lhr.external_ids.wikidata.contains("Q1"));
    assert!(lhr.data_sources.contains("OpenStreetMap") && lhr.data_sources.contains("Wikidata"));

    let deduped = run_dedupe(&config)?;
    assert_eq!(deduped.stats.duplicates_merged, 0);
    assert_eq!(deduped.records.len(), 2);
    assert_eq!(deduped.records[0].id, merged.records[0].id);
    Ok(())
}

#[test]
fn test_enrichment_fills_location_from_airport_table() -> Result<()> {
    let dir = tempdir()?;
    let airports_csv = dir.path().join("airports.csv");
    write(
        &airports_csv,
        "ident,name,latitude_deg,longitude_deg,elevation_ft,continent,iso_country,municipality,iata_code,wikipedia_link\n\
         LTFM,Istanbul Airport,41.2753,28.7519,325,EU,TR,Istanbul,IST,\n",
    );
    let pp = dir.path().join("pp.csv");
    write(
        &pp,
        "Lounge Name,Airport (IATA)\nIGA Lounge,IST\nMystery Lounge,XXX\n",
    );
    let mut config = config_in(dir.path());
    config.sources = vec![source("priority_pass", &pp, true)];

    let table: Arc<dyn AirportLookup> = Arc::new(AirportTable::load(&airports_csv)?);
    let outcome = run_merge(&config, Some(table))?;

    let report = outcome.enrichment.clone().unwrap();
    assert_eq!(report.enriched, 1);
    assert_eq!(report.missing, 1);
    assert!(report.missing_codes.contains("XXX"));

    let ist = &outcome.records[0];
    assert_eq!(ist.country.as_deref(), Some("Turkey"));
    assert_eq!(ist.city.as_deref(), Some("Istanbul"));
    assert_eq!(ist.continent.as_deref(), Some("EU"));
    assert!(ist.coordinates.is_none());
    assert!(ist.airport_coordinates.is_some());

    let airports = json_export::build_web_airports(&outcome.records, false);
    assert_eq!(airports.len(), 2);
    Ok(())
}

#[test]
fn test_dedupe_of_enriched_master_keeps_every_lounge() -> Result<()> {
    let dir = tempdir()?;
    let airports_csv = dir.path().join("airports.csv");
    write(
        &airports_csv,
        "ident,name,latitude_deg,longitude_deg,elevation_ft,continent,iso_country,municipality,iata_code,wikipedia_link\n\
         OMDB,Dubai International Airport,25.2528,55.3644,62,AS,AE,Dubai,DXB,\n",
    );
    let pp = dir.path().join("pp.csv");
    write(
        &pp,
        "Lounge Name,Airport (IATA)\n\
         Emirates First Class Lounge,DXB\n\
         Emirates Business Class Lounge,DXB\n",
    );
    let mut config = config_in(dir.path());
    config.sources = vec![source("priority_pass", &pp, true)];

    let table: Arc<dyn AirportLookup> = Arc::new(AirportTable::load(&airports_csv)?);
    let merged = run_merge(&config, Some(table))?;
    assert_eq!(merged.records.len(), 2);
    assert!(merged.records.iter().all(|r| r.airport_coordinates.is_some()));

    let deduped = run_dedupe(&config)?;
    assert_eq!(deduped.records.len(), merged.records.len());
    assert_eq!(deduped.stats.duplicates_merged, 0);
    Ok(())
}

#[test]
fn test_airport_table_from_memory() {
    let table = AirportTable::from_airports(vec![Airport {
        iata_code: "ATL".into(),
        name: "Hartsfield-Jackson".into(),
        latitude: 33.6367,
        longitude: -84.4281,
        elevation_ft: None,
        municipality: Some("Atlanta".into()),
        iso_country: Some("US".into()),
        continent: Some("NA".into()),
        wikipedia: None,
    }]);
    assert_eq!(table.len(), 1);
    assert!(table.lookup("atl").is_some());
}
