use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::app::ports::{ExtractedLounge, SourceInfo};
use crate::constants::PLACEHOLDER_IMAGE_BASE;
use crate::domain::{Coordinates, LoungeRecord};
use crate::error::Result;
use crate::pipeline::processing::MergeStats;

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct MasterMetadata<'a> {
    total_lounges: usize,
    sources: &'a [String],
    generated_at: String,
    duplicates_merged: usize,
    dropped: usize,
}

#[derive(Debug, Serialize)]
struct MasterDocument<'a> {
    metadata: MasterMetadata<'a>,
    lounges: &'a [LoungeRecord],
}

/// `{metadata, lounges}` document of the full canonical records.
pub fn write_master_json(
    path: &Path,
    records: &[LoungeRecord],
    stats: &MergeStats,
    sources: &[String],
) -> Result<()> {
    let document = MasterDocument {
        metadata: MasterMetadata {
            total_lounges: records.len(),
            sources,
            generated_at: Utc::now().to_rfc3339(),
            duplicates_merged: stats.duplicates_merged,
            dropped: stats.dropped,
        },
        lounges: records,
    };
    write_json(path, &document)?;
    info!("Wrote master JSON with {} lounges to {}", records.len(), path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct ExtractDocument<'a> {
    total: usize,
    source: &'a str,
    license: &'a str,
    attribution: &'a str,
    extracted_at: String,
    api_requests: usize,
    lounges: &'a [ExtractedLounge],
}

/// `{total, source, license, attribution, extracted_at, api_requests,
/// lounges}`; the `lounges` array is read back by the `canonical` source.
pub fn write_extracted_json(
    path: &Path,
    info: &SourceInfo,
    lounges: &[ExtractedLounge],
    api_requests: usize,
) -> Result<()> {
    let document = ExtractDocument {
        total: lounges.len(),
        source: &info.name,
        license: &info.license,
        attribution: &info.attribution,
        extracted_at: Utc::now().to_rfc3339(),
        api_requests,
        lounges,
    };
    write_json(path, &document)?;
    info!("Wrote {} {} lounges to {}", lounges.len(), info.name, path.display());
    Ok(())
}

/// Country as shown on the site.
pub fn display_country(country: &Option<String>, uppercase: bool) -> String {
    let country = country.clone().unwrap_or_default();
    if uppercase {
        country.to_uppercase()
    } else {
        country
    }
}

/// Record images, or two seeded placeholders when there are none.
pub fn images_or_placeholder(record: &LoungeRecord) -> Vec<String> {
    if !record.images.is_empty() {
        return record.images.clone();
    }
    vec![
        format!("{}/{}/800/600", PLACEHOLDER_IMAGE_BASE, record.id),
        format!("{}/{}2/800/600", PLACEHOLDER_IMAGE_BASE, record.id),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct WebLounge {
    pub id: String,
    pub name: String,
    pub airport_code: String,
    pub airport_name: String,
    pub city: String,
    pub country: String,
    pub terminal: String,
    pub location: String,
    pub open_hours: String,
    pub amenities: Vec<String>,
    pub access_methods: Vec<String>,
    pub lounge_type: String,
    pub description: String,
    pub conditions: String,
    pub rating: f64,
    pub review_count: u32,
    pub coordinates: Option<Coordinates>,
    pub continent: String,
    pub iso_country: String,
    pub images: Vec<String>,
    pub data_sources: Vec<String>,
    pub verified: bool,
}

impl WebLounge {
    pub fn from_record(record: &LoungeRecord, uppercase_countries: bool) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            airport_code: text(&record.airport_code),
            airport_name: text(&record.airport_name),
            city: text(&record.city),
            country: display_country(&record.country, uppercase_countries),
            terminal: text(&record.terminal),
            location: text(&record.location),
            open_hours: text(&record.open_hours),
            amenities: record.amenities.iter().cloned().collect(),
            access_methods: record.access_methods.iter().cloned().collect(),
            lounge_type: record
                .lounge_type
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "independent".to_string()),
            description: text(&record.description),
            conditions: text(&record.conditions),
            rating: record.rating,
            review_count: record.review_count,
            coordinates: record.position(),
            continent: text(&record.continent),
            iso_country: text(&record.iso_country),
            images: images_or_placeholder(record),
            data_sources: record.data_sources.iter().cloned().collect(),
            verified: record.verified,
        }
    }
}

#[derive(Debug, Serialize)]
struct WebLounges {
    total: usize,
    lounges: Vec<WebLounge>,
}

/// `lounges.json` for the web front end.
pub fn write_web_lounges(path: &Path, records: &[LoungeRecord], uppercase_countries: bool) -> Result<usize> {
    let lounges: Vec<WebLounge> = records
        .iter()
        .map(|r| WebLounge::from_record(r, uppercase_countries))
        .collect();
    let total = lounges.len();
    write_json(path, &WebLounges { total, lounges })?;
    info!("Wrote {} web lounges to {}", total, path.display());
    Ok(total)
}

#[derive(Debug, Clone, Serialize)]
pub struct WebAirport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub continent: String,
    pub iso_country: String,
    pub coordinates: Option<Coordinates>,
    pub lounge_count: usize,
    pub avg_rating: f64,
    pub terminals: BTreeMap<String, Vec<WebLounge>>,
    pub lounges: Vec<WebLounge>,
    pub available_access_methods: Vec<String>,
    pub common_amenities: Vec<String>,
}

/// First non-empty value among an airport's lounges.
fn first_text(members: &[&LoungeRecord], pick: impl Fn(&LoungeRecord) -> Option<String>) -> String {
    members.iter().find_map(|m| pick(m)).unwrap_or_default()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Group lounges by airport code. Records without a code are left out.
pub fn build_web_airports(records: &[LoungeRecord], uppercase_countries: bool) -> Vec<WebAirport> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&LoungeRecord>> = HashMap::new();
    for record in records {
        let Some(code) = record.airport_code.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let code = code.to_uppercase();
        if !groups.contains_key(&code) {
            order.push(code.clone());
        }
        groups.entry(code).or_default().push(record);
    }

    let mut airports: Vec<WebAirport> = order
        .into_iter()
        .filter_map(|code| groups.remove(&code).map(|members| (code, members)))
        .map(|(code, members)| {
            let rated: Vec<f64> = members.iter().filter(|m| m.has_rating()).map(|m| m.rating).collect();
            let avg_rating = if rated.is_empty() {
                0.0
            } else {
                round1(rated.iter().sum::<f64>() / rated.len() as f64)
            };

            let mut lounges: Vec<WebLounge> = members
                .iter()
                .map(|m| WebLounge::from_record(m, uppercase_countries))
                .collect();
            lounges.sort_by(|a, b| {
                let ta = if a.terminal.is_empty() { "ZZZ" } else { a.terminal.as_str() };
                let tb = if b.terminal.is_empty() { "ZZZ" } else { b.terminal.as_str() };
                ta.cmp(tb).then_with(|| a.name.cmp(&b.name))
            });

            let mut terminals: BTreeMap<String, Vec<WebLounge>> = BTreeMap::new();
            for lounge in &lounges {
                let terminal = if lounge.terminal.is_empty() {
                    "Unknown".to_string()
                } else {
                    lounge.terminal.clone()
                };
                terminals.entry(terminal).or_default().push(lounge.clone());
            }

            let access: BTreeSet<String> = members
                .iter()
                .flat_map(|m| m.access_methods.iter().cloned())
                .collect();

            let mut amenity_counts: HashMap<&str, usize> = HashMap::new();
            for amenity in members.iter().flat_map(|m| m.amenities.iter()) {
                *amenity_counts.entry(amenity.as_str()).or_default() += 1;
            }
            let mut amenities: Vec<(&str, usize)> = amenity_counts.into_iter().collect();
            amenities.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

            WebAirport {
                name: first_text(&members, |m| m.airport_name.clone()),
                city: first_text(&members, |m| m.city.clone()),
                country: display_country(
                    &members.iter().find_map(|m| m.country.clone()),
                    uppercase_countries,
                ),
                continent: first_text(&members, |m| m.continent.clone()),
                iso_country: first_text(&members, |m| m.iso_country.clone()),
                coordinates: members.iter().find_map(|m| m.position()),
                lounge_count: members.len(),
                avg_rating,
                terminals,
                lounges,
                available_access_methods: access.into_iter().collect(),
                common_amenities: amenities.into_iter().take(10).map(|(a, _)| a.to_string()).collect(),
                code,
            }
        })
        .collect();

    airports.sort_by(|a, b| b.lounge_count.cmp(&a.lounge_count).then_with(|| a.name.cmp(&b.name)));
    airports
}

#[derive(Debug, Serialize)]
struct WebAirports {
    total: usize,
    airports: Vec<WebAirport>,
}

/// `airports.json` for the web front end.
pub fn write_web_airports(path: &Path, records: &[LoungeRecord], uppercase_countries: bool) -> Result<usize> {
    let airports = build_web_airports(records, uppercase_countries);
    let total = airports.len();
    write_json(path, &WebAirports { total, airports })?;
    info!("Wrote {} web airports to {}", total, path.display());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lounge(id: &str, name: &str, code: Option<&str>, terminal: Option<&str>, rating: f64) -> LoungeRecord {
        let mut record = LoungeRecord::new(id, name, "test");
        record.airport_code = code.map(str::to_string);
        record.terminal = terminal.map(str::to_string);
        record.rating = rating;
        record
    }

    #[test]
    fn test_placeholder_images_use_record_id() {
        let record = lounge("ist_sky", "Sky", Some("IST"), None, 0.0);
        assert_eq!(
            images_or_placeholder(&record),
            vec![
                "https://picsum.photos/seed/ist_sky/800/600",
                "https://picsum.photos/seed/ist_sky2/800/600"
            ]
        );
    }

    #[test]
    fn test_airports_grouping_and_ordering() {
        let mut records = vec![
            lounge("a", "Zeta", Some("IST"), None, 4.0),
            lounge("b", "Alpha", Some("IST"), Some("T1"), 4.55),
            lounge("c", "Beta", Some("IST"), None, 0.0),
            lounge("d", "Solo", Some("ATL"), None, 0.0),
            lounge("e", "Nowhere", None, None, 5.0),
        ];
        records[0].amenities.extend(["Wi-Fi".to_string(), "Bar".to_string()]);
        records[1].amenities.insert("Wi-Fi".into());
        records[0].country = Some("Turkey".into());

        let airports = build_web_airports(&records, true);
        assert_eq!(airports.len(), 2);
        let ist = &airports[0];
        assert_eq!(ist.code, "IST");
        assert_eq!(ist.lounge_count, 3);
        assert_eq!(ist.avg_rating, 4.3);
        assert_eq!(ist.country, "TURKEY");
        let names: Vec<&str> = ist.lounges.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Zeta"]);
        assert_eq!(ist.common_amenities, vec!["Wi-Fi", "Bar"]);
        assert_eq!(ist.terminals.get("Unknown").map(Vec::len), Some(2));
    }
}
