use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use crate::constants::region_for_continent;
use crate::domain::LoungeRecord;
use crate::error::Result;

use super::json_export::display_country;

/// Columns of every partitioned CSV file.
pub const EXPORT_HEADERS: &[&str] = &[
    "id",
    "name",
    "airport_code",
    "airport_name",
    "city",
    "country",
    "continent",
    "iso_country",
    "region",
    "terminal",
    "location",
    "latitude",
    "longitude",
    "open_hours",
    "amenities",
    "access_methods",
    "lounge_type",
    "description",
    "conditions",
    "rating",
    "review_count",
    "verified",
    "verification_source",
    "data_sources",
    "image_1",
    "image_2",
    "image_3",
    "osm_id",
    "osm_url",
    "wikidata_id",
    "wikidata_url",
    "google_place_id",
];

const SUMMARY_HEADERS: &[&str] = &[
    "airport_code",
    "airport_name",
    "city",
    "country",
    "continent",
    "lounge_count",
    "verified_count",
    "with_priority_pass",
    "avg_rating",
    "data_sources",
];

const UNKNOWN_REGION: &str = "Unknown";

/// File counts of one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvExportSummary {
    pub lounges: usize,
    pub regions: usize,
    pub countries: usize,
    pub cities: usize,
    pub airports: usize,
}

/// Region label of a record, "Unknown" when it has no continent.
pub fn region_of(record: &LoungeRecord) -> String {
    match record.continent.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(continent) => region_for_continent(continent).to_string(),
        None => UNKNOWN_REGION.to_string(),
    }
}

fn file_safe(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

fn joined<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items.into_iter().map(String::as_str).collect::<Vec<_>>().join("; ")
}

fn to_row(record: &LoungeRecord, uppercase_countries: bool) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let image = |i: usize| record.images.get(i).cloned().unwrap_or_default();
    let osm_id = joined(&record.external_ids.osm);
    let wikidata_id = joined(&record.external_ids.wikidata);

    vec![
        record.id.clone(),
        record.name.clone(),
        text(&record.airport_code),
        text(&record.airport_name),
        text(&record.city),
        display_country(&record.country, uppercase_countries),
        text(&record.continent),
        text(&record.iso_country),
        region_of(record),
        text(&record.terminal),
        text(&record.location),
        record.position().map(|c| c.lat.to_string()).unwrap_or_default(),
        record.position().map(|c| c.lng.to_string()).unwrap_or_default(),
        text(&record.open_hours),
        joined(&record.amenities),
        joined(&record.access_methods),
        record
            .lounge_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        text(&record.description),
        text(&record.conditions),
        record.rating.to_string(),
        record.review_count.to_string(),
        record.verified.to_string(),
        text(&record.verification_source),
        joined(&record.data_sources),
        image(0),
        image(1),
        image(2),
        osm_id,
        record
            .external_ids
            .osm
            .iter()
            .map(|id| format!("https://www.openstreetmap.org/{}", id))
            .collect::<Vec<_>>()
            .join("; "),
        wikidata_id,
        record
            .external_ids
            .wikidata
            .iter()
            .map(|id| format!("https://www.wikidata.org/wiki/{}", id))
            .collect::<Vec<_>>()
            .join("; "),
        joined(&record.external_ids.google_place),
    ]
}

fn write_lounges(path: &Path, records: &[&LoungeRecord], uppercase_countries: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        writer.write_record(to_row(record, uppercase_countries))?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

fn write_groups(
    dir: &Path,
    groups: &BTreeMap<String, Vec<&LoungeRecord>>,
    uppercase_countries: bool,
) -> Result<usize> {
    for (file_stem, members) in groups {
        write_lounges(&dir.join(format!("{}.csv", file_stem)), members, uppercase_countries)?;
    }
    Ok(groups.len())
}

fn by_region(records: &[LoungeRecord]) -> BTreeMap<String, Vec<&LoungeRecord>> {
    let mut groups: BTreeMap<String, Vec<&LoungeRecord>> = BTreeMap::new();
    for record in records {
        let stem = region_of(record).to_lowercase().replace(' ', "_");
        groups.entry(stem).or_default().push(record);
    }
    groups
}

fn by_country(records: &[LoungeRecord]) -> BTreeMap<String, Vec<&LoungeRecord>> {
    let mut groups: BTreeMap<String, Vec<&LoungeRecord>> = BTreeMap::new();
    for record in records {
        if let Some(country) = record.country.as_deref().filter(|c| !c.is_empty()) {
            groups.entry(file_safe(country)).or_default().push(record);
        }
    }
    groups
}

/// Cities keyed "City, Country"; only cities with two or more lounges get a file.
fn by_city(records: &[LoungeRecord]) -> BTreeMap<String, Vec<&LoungeRecord>> {
    let mut groups: BTreeMap<String, Vec<&LoungeRecord>> = BTreeMap::new();
    for record in records {
        let Some(city) = record.city.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let key = match record.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {}", city, country),
            None => city.to_string(),
        };
        groups.entry(key).or_default().push(record);
    }
    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, members)| (file_safe(&key).replace(", ", "_"), members))
        .collect()
}

fn by_airport(records: &[LoungeRecord]) -> BTreeMap<String, Vec<&LoungeRecord>> {
    let mut groups: BTreeMap<String, Vec<&LoungeRecord>> = BTreeMap::new();
    for record in records {
        if let Some(code) = record.airport_code.as_deref().filter(|c| !c.is_empty()) {
            groups.entry(file_safe(&code.to_uppercase())).or_default().push(record);
        }
    }
    groups
}

#[derive(Default)]
struct AirportSummary {
    airport_name: String,
    city: String,
    country: String,
    continent: String,
    lounge_count: usize,
    verified_count: usize,
    with_priority_pass: usize,
    rating_sum: f64,
    rated: usize,
    data_sources: BTreeSet<String>,
}

fn fill(slot: &mut String, value: &Option<String>) {
    if slot.is_empty() {
        if let Some(v) = value {
            slot.clone_from(v);
        }
    }
}

fn write_summary(path: &Path, records: &[LoungeRecord], uppercase_countries: bool) -> Result<()> {
    let mut airports: BTreeMap<String, AirportSummary> = BTreeMap::new();
    for record in records {
        let Some(code) = record.airport_code.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let summary = airports.entry(code.to_uppercase()).or_default();
        fill(&mut summary.airport_name, &record.airport_name);
        fill(&mut summary.city, &record.city);
        fill(&mut summary.country, &record.country);
        fill(&mut summary.continent, &record.continent);
        summary.lounge_count += 1;
        if record.verified {
            summary.verified_count += 1;
        }
        if record.access_methods.contains("Priority Pass") {
            summary.with_priority_pass += 1;
        }
        if record.has_rating() {
            summary.rating_sum += record.rating;
            summary.rated += 1;
        }
        summary.data_sources.extend(record.data_sources.iter().cloned());
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SUMMARY_HEADERS)?;
    for (code, summary) in &airports {
        let avg_rating = if summary.rated == 0 {
            0.0
        } else {
            (summary.rating_sum / summary.rated as f64 * 100.0).round() / 100.0
        };
        let country = if uppercase_countries {
            summary.country.to_uppercase()
        } else {
            summary.country.clone()
        };
        writer.write_record([
            code.clone(),
            summary.airport_name.clone(),
            summary.city.clone(),
            country,
            summary.continent.clone(),
            summary.lounge_count.to_string(),
            summary.verified_count.to_string(),
            summary.with_priority_pass.to_string(),
            avg_rating.to_string(),
            joined(&summary.data_sources),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn readme(summary: &CsvExportSummary) -> String {
    format!(
        "Lounge Database Export\n\
         Generated: {}\n\
         Total Lounges: {}\n\
         \n\
         DIRECTORY STRUCTURE:\n\
         all_lounges.csv            Complete database\n\
         summary_by_airport.csv     Airport-level statistics ({} airports)\n\
         by_region/                 Lounges grouped by continent ({} files)\n\
         by_country/                Lounges grouped by country ({} files)\n\
         by_city/                   Lounges grouped by city, 2+ lounges ({} files)\n\
         by_airport/                Lounges grouped by airport code ({} files)\n\
         \n\
         List columns (amenities, access_methods, data_sources, ids) are joined with \"; \".\n\
         \n\
         ATTRIBUTION:\n\
         OpenStreetMap data (c) OpenStreetMap contributors, ODbL.\n\
         Wikidata content is CC0.\n\
         \n\
         All lounge information should be verified with the operator before visiting.\n",
        Utc::now().format("%Y-%m-%d"),
        summary.lounges,
        summary.airports,
        summary.regions,
        summary.countries,
        summary.cities,
        summary.airports,
    )
}

/// Write the full partitioned export under `dir`.
pub fn export_partitioned(dir: &Path, records: &[LoungeRecord], uppercase_countries: bool) -> Result<CsvExportSummary> {
    fs::create_dir_all(dir)?;

    let all: Vec<&LoungeRecord> = records.iter().collect();
    write_lounges(&dir.join("all_lounges.csv"), &all, uppercase_countries)?;

    let summary = CsvExportSummary {
        lounges: records.len(),
        regions: write_groups(&dir.join("by_region"), &by_region(records), uppercase_countries)?,
        countries: write_groups(&dir.join("by_country"), &by_country(records), uppercase_countries)?,
        cities: write_groups(&dir.join("by_city"), &by_city(records), uppercase_countries)?,
        airports: write_groups(&dir.join("by_airport"), &by_airport(records), uppercase_countries)?,
    };

    write_summary(&dir.join("summary_by_airport.csv"), records, uppercase_countries)?;
    fs::write(dir.join("README.txt"), readme(&summary))?;

    info!(
        "CSV export to {}: {} lounges, {} regions, {} countries, {} cities, {} airports",
        dir.display(),
        summary.lounges,
        summary.regions,
        summary.countries,
        summary.cities,
        summary.airports
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lounge(id: &str, code: &str, city: &str, country: &str, continent: &str) -> LoungeRecord {
        let mut record = LoungeRecord::new(id, id, "PriorityPass");
        record.airport_code = Some(code.into());
        record.city = Some(city.into());
        record.country = Some(country.into());
        record.continent = Some(continent.into());
        record
    }

    #[test]
    fn test_partitions_and_summary() {
        let mut records = vec![
            lounge("a", "IST", "Istanbul", "Turkey", "EU"),
            lounge("b", "SAW", "Istanbul", "Turkey", "EU"),
            lounge("c", "JFK", "New York", "United States", "NA"),
            lounge("d", "TPE", "Taipei", "Taiwan/ROC", "AS"),
        ];
        records[0].access_methods.insert("Priority Pass".into());
        records[0].rating = 4.0;
        records[0].verified = true;

        let dir = TempDir::new().unwrap();
        let summary = export_partitioned(dir.path(), &records, false).unwrap();
        assert_eq!(
            summary,
            CsvExportSummary { lounges: 4, regions: 3, countries: 3, cities: 1, airports: 4 }
        );

        assert!(dir.path().join("by_region/north_america.csv").is_file());
        assert!(dir.path().join("by_country/Taiwan_ROC.csv").is_file());
        assert!(dir.path().join("by_city/Istanbul_Turkey.csv").is_file());
        assert!(!dir.path().join("by_city/Taipei_Taiwan_ROC.csv").exists());
        assert!(dir.path().join("by_airport/IST.csv").is_file());
        assert!(dir.path().join("README.txt").is_file());

        let mut reader = csv::Reader::from_path(dir.path().join("summary_by_airport.csv")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        let ist = rows.iter().find(|r| &r[0] == "IST").unwrap();
        assert_eq!(&ist[5], "1");
        assert_eq!(&ist[6], "1");
        assert_eq!(&ist[7], "1");
        assert_eq!(&ist[8], "4");
        assert_eq!(&ist[9], "PriorityPass");
    }

    #[test]
    fn test_rows_split_images_and_coordinates() {
        let mut record = lounge("a", "IST", "Istanbul", "Turkey", "EU");
        record.images = vec!["1.jpg".into(), "2.jpg".into()];
        record.coordinates = crate::domain::Coordinates::new(41.5, 28.75);
        record.external_ids.osm.insert("node/7".into());

        let row = to_row(&record, true);
        let col = |name: &str| {
            let idx = EXPORT_HEADERS.iter().position(|h| *h == name).unwrap();
            row[idx].clone()
        };
        assert_eq!(col("country"), "TURKEY");
        assert_eq!(col("region"), "Europe");
        assert_eq!(col("latitude"), "41.5");
        assert_eq!(col("image_2"), "2.jpg");
        assert_eq!(col("image_3"), "");
        assert_eq!(col("osm_url"), "https://www.openstreetmap.org/node/7");
    }
}
