use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::LoungeRecord;
use crate::error::Result;
use crate::pipeline::processing::normalize::normalizers::{providers, ProfileNormalizer, SourceNormalizer};

use super::source_reader::read_csv_rows;

/// Column order of the master CSV.
pub const MASTER_HEADERS: &[&str] = &[
    "id",
    "name",
    "airport_code",
    "airport_name",
    "terminal",
    "city",
    "country",
    "continent",
    "iso_country",
    "location",
    "coordinates",
    "airport_coordinates",
    "amenities",
    "access_methods",
    "lounge_type",
    "description",
    "open_hours",
    "conditions",
    "rating",
    "review_count",
    "images",
    "source",
    "data_sources",
    "osm_ids",
    "wikidata_ids",
    "google_place_ids",
    "verified",
    "verification_source",
    "merge_count",
];

fn json_list<'a>(items: impl IntoIterator<Item = &'a String>) -> Result<String> {
    Ok(serde_json::to_string(&items.into_iter().collect::<Vec<_>>())?)
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn to_row(record: &LoungeRecord) -> Result<Vec<String>> {
    Ok(vec![
        record.id.clone(),
        record.name.clone(),
        text(&record.airport_code),
        text(&record.airport_name),
        text(&record.terminal),
        text(&record.city),
        text(&record.country),
        text(&record.continent),
        text(&record.iso_country),
        text(&record.location),
        record.coordinates.map(|c| c.to_pair_string()).unwrap_or_default(),
        record
            .airport_coordinates
            .map(|c| c.to_pair_string())
            .unwrap_or_default(),
        json_list(&record.amenities)?,
        json_list(&record.access_methods)?,
        record
            .lounge_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        text(&record.description),
        text(&record.open_hours),
        text(&record.conditions),
        record.rating.to_string(),
        record.review_count.to_string(),
        json_list(&record.images)?,
        record.source.clone(),
        json_list(&record.data_sources)?,
        json_list(&record.external_ids.osm)?,
        json_list(&record.external_ids.wikidata)?,
        json_list(&record.external_ids.google_place)?,
        record.verified.to_string(),
        text(&record.verification_source),
        record.merge_count.to_string(),
    ])
}

/// Write records in the given order, creating parent directories.
pub fn write_master_csv(path: &Path, records: &[LoungeRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(MASTER_HEADERS)?;
    for record in records {
        writer.write_record(to_row(record)?)?;
    }
    writer.flush()?;
    info!("Wrote {} lounges to {}", records.len(), path.display());
    Ok(())
}

/// Read a master CSV back through the canonical normalizer.
pub fn read_master_csv(path: &Path) -> Result<Vec<LoungeRecord>> {
    let normalizer = ProfileNormalizer::new(providers::canonical());
    let rows = read_csv_rows(path, normalizer.source_id())?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match normalizer.normalize(row)? {
            Some(normalized) => records.push(normalized.record),
            None => warn!(
                "Skipping master row {} in {}: no name or airport",
                row.row_number,
                path.display()
            ),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, LoungeType};
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_preserves_every_field() {
        let mut record = LoungeRecord::new("ist_sky_lounge", "Sky Lounge, \"Gold\"", "PriorityPass");
        record.airport_code = Some("IST".into());
        record.airport_name = Some("Istanbul Airport".into());
        record.terminal = Some("International".into());
        record.city = Some("Istanbul".into());
        record.country = Some("Turkey".into());
        record.continent = Some("EU".into());
        record.iso_country = Some("TR".into());
        record.location = Some("Airside,\nlevel 2".into());
        record.coordinates = Coordinates::new(41.26, 28.74);
        record.airport_coordinates = Coordinates::new(41.2753, 28.7519);
        record.amenities.extend(["Wi-Fi".to_string(), "Bar, lounge".to_string()]);
        record.access_methods.insert("Priority Pass".into());
        record.lounge_type = Some(LoungeType::Other("bank".into()));
        record.description = Some("Quiet".into());
        record.open_hours = Some("24 hours".into());
        record.conditions = Some("3 hours max".into());
        record.rating = 4.3;
        record.review_count = 17;
        record.images = vec!["b.jpg".into(), "a.jpg".into()];
        record.data_sources.insert("OpenStreetMap".into());
        record.external_ids.osm.insert("node/1".into());
        record.external_ids.wikidata.insert("Q42".into());
        record.verified = true;
        record.verification_source = Some("OpenStreetMap".into());
        record.merge_count = 3;

        let mut minimal = LoungeRecord::new("unknown_x", "X", "Amex");
        minimal.airport_name = Some("Hong Kong International".into());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("master.csv");
        write_master_csv(&path, &[record.clone(), minimal.clone()]).unwrap();

        let read = read_master_csv(&path).unwrap();
        assert_eq!(read, vec![record, minimal]);
    }
}
