/// Lookup tables and fixed values shared across the pipeline.
///
/// The tables are built once per process on first use and are read-only
/// afterwards.
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

// Source ids (used in config `[[sources]]` entries and the normalizer registry)
pub const PRIORITY_PASS_SOURCE: &str = "priority_pass";
pub const SUPABASE_SOURCE: &str = "supabase";
pub const AMEX_SOURCE: &str = "amex";
pub const DREAMFOLKS_SOURCE: &str = "dreamfolks";
pub const PLAZA_PREMIUM_SOURCE: &str = "plaza_premium";
pub const TAV_SOURCE: &str = "tav";
pub const AIRLINE_LOUNGES_SOURCE: &str = "airline_lounges";
pub const CANONICAL_SOURCE: &str = "canonical";

/// Get all source ids with a built-in normalizer
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![
        PRIORITY_PASS_SOURCE,
        SUPABASE_SOURCE,
        AMEX_SOURCE,
        DREAMFOLKS_SOURCE,
        PLAZA_PREMIUM_SOURCE,
        TAV_SOURCE,
        AIRLINE_LOUNGES_SOURCE,
        CANONICAL_SOURCE,
    ]
}

// Extraction sources (`extract` subcommand)
pub const OSM_SOURCE_NAME: &str = "OpenStreetMap";
pub const WIKIDATA_SOURCE_NAME: &str = "Wikidata";
pub const GOOGLE_PLACES_SOURCE_NAME: &str = "Google Places API";

/// Search radius around an airport reference point for places queries.
pub const PLACES_RADIUS_M: u32 = 3000;

/// Airports queried per-airport when no airport table is configured:
/// `(iata, name, lat, lng)`.
pub const FALLBACK_AIRPORTS: &[(&str, &str, f64, f64)] = &[
    ("IST", "Istanbul Airport", 41.2753, 28.7519),
    ("DXB", "Dubai International", 25.2532, 55.3657),
    ("LHR", "London Heathrow", 51.4700, -0.4543),
    ("JFK", "New York JFK", 40.6413, -73.7781),
    ("CDG", "Paris Charles de Gaulle", 49.0097, 2.5479),
    ("SIN", "Singapore Changi", 1.3644, 103.9915),
    ("HKG", "Hong Kong Intl", 22.3080, 113.9185),
    ("AMS", "Amsterdam Schiphol", 52.3105, 4.7683),
    ("FRA", "Frankfurt", 50.0379, 8.5622),
    ("LAX", "Los Angeles", 33.9416, -118.4085),
    ("ORD", "Chicago O'Hare", 41.9742, -87.9073),
    ("DFW", "Dallas Fort Worth", 32.8998, -97.0403),
    ("ATL", "Atlanta", 33.6407, -84.4277),
    ("NRT", "Tokyo Narita", 35.7720, 140.3929),
    ("ICN", "Seoul Incheon", 37.4602, 126.4407),
];

pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.7;

/// Roughly one kilometre in degrees of latitude/longitude.
pub const COORDINATE_TOLERANCE_DEG: f64 = 0.01;

/// Longest generated lounge id.
pub const MAX_ID_LEN: usize = 100;

pub const MAX_IMAGES_PER_LOUNGE: usize = 3;

/// Queries tried in order when searching photos; `{name}`, `{airport}` and
/// `{city}` are substituted per record.
pub const PHOTO_QUERY_TEMPLATES: &[&str] = &[
    "{name} {airport}",
    "airport lounge {city}",
    "luxury airport lounge interior",
];

pub const PLACEHOLDER_IMAGE_BASE: &str = "https://picsum.photos/seed";

/// Name tokens dropped before building a dedup key.
pub static NAME_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "lounge",
        "vip",
        "the",
        "business",
        "class",
        "premium",
        "club",
        "first",
        "departure",
        "departures",
        "executive",
    ]
    .into_iter()
    .collect()
});

pub const DOMESTIC_TOKEN: &str = "domestic";
pub const INTERNATIONAL_TOKEN: &str = "international";

/// OurAirports continent code to region name.
pub static CONTINENT_REGIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AF", "Africa"),
        ("AS", "Asia"),
        ("EU", "Europe"),
        ("NA", "North America"),
        ("SA", "South America"),
        ("OC", "Oceania"),
        ("AN", "Antarctica"),
    ]
    .into_iter()
    .collect()
});

/// Region name for a continent code, falling back to the code itself.
pub fn region_for_continent(continent: &str) -> &str {
    CONTINENT_REGIONS
        .get(continent.trim().to_uppercase().as_str())
        .copied()
        .unwrap_or(continent)
}

/// ISO 3166-1 alpha-2 code to the country name used on the site.
pub static ISO_COUNTRIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AE", "United Arab Emirates"),
        ("AF", "Afghanistan"),
        ("AG", "Antigua and Barbuda"),
        ("AL", "Albania"),
        ("AM", "Armenia"),
        ("AO", "Angola"),
        ("AR", "Argentina"),
        ("AT", "Austria"),
        ("AU", "Australia"),
        ("AW", "Aruba"),
        ("AZ", "Azerbaijan"),
        ("BA", "Bosnia and Herzegovina"),
        ("BB", "Barbados"),
        ("BD", "Bangladesh"),
        ("BE", "Belgium"),
        ("BF", "Burkina Faso"),
        ("BG", "Bulgaria"),
        ("BH", "Bahrain"),
        ("BJ", "Benin"),
        ("BM", "Bermuda"),
        ("BN", "Brunei"),
        ("BO", "Bolivia"),
        ("BR", "Brazil"),
        ("BS", "Bahamas"),
        ("BW", "Botswana"),
        ("BY", "Belarus"),
        ("CA", "Canada"),
        ("CD", "Democratic Republic of Congo"),
        ("CG", "Congo"),
        ("CH", "Switzerland"),
        ("CI", "Ivory Coast"),
        ("CL", "Chile"),
        ("CM", "Cameroon"),
        ("CN", "China"),
        ("CO", "Colombia"),
        ("CR", "Costa Rica"),
        ("CV", "Cape Verde"),
        ("CW", "Curacao"),
        ("CY", "Cyprus"),
        ("CZ", "Czech Republic"),
        ("DE", "Germany"),
        ("DK", "Denmark"),
        ("DO", "Dominican Republic"),
        ("DZ", "Algeria"),
        ("EC", "Ecuador"),
        ("EE", "Estonia"),
        ("EG", "Egypt"),
        ("EH", "Western Sahara"),
        ("ES", "Spain"),
        ("ET", "Ethiopia"),
        ("FI", "Finland"),
        ("FJ", "Fiji"),
        ("FR", "France"),
        ("GA", "Gabon"),
        ("GB", "United Kingdom"),
        ("GD", "Grenada"),
        ("GE", "Georgia"),
        ("GH", "Ghana"),
        ("GI", "Gibraltar"),
        ("GM", "Gambia"),
        ("GN", "Guinea"),
        ("GP", "Guadeloupe"),
        ("GQ", "Equatorial Guinea"),
        ("GR", "Greece"),
        ("GT", "Guatemala"),
        ("GU", "Guam"),
        ("GW", "Guinea-Bissau"),
        ("GY", "Guyana"),
        ("HK", "Hong Kong"),
        ("HN", "Honduras"),
        ("HR", "Croatia"),
        ("HU", "Hungary"),
        ("ID", "Indonesia"),
        ("IE", "Ireland"),
        ("IL", "Israel"),
        ("IM", "Isle of Man"),
        ("IN", "India"),
        ("IQ", "Iraq"),
        ("IR", "Iran"),
        ("IS", "Iceland"),
        ("IT", "Italy"),
        ("JE", "Jersey"),
        ("JM", "Jamaica"),
        ("JO", "Jordan"),
        ("JP", "Japan"),
        ("KE", "Kenya"),
        ("KG", "Kyrgyzstan"),
        ("KH", "Cambodia"),
        ("KR", "South Korea"),
        ("KW", "Kuwait"),
        ("KZ", "Kazakhstan"),
        ("LA", "Laos"),
        ("LB", "Lebanon"),
        ("LC", "Saint Lucia"),
        ("LK", "Sri Lanka"),
        ("LR", "Liberia"),
        ("LS", "Lesotho"),
        ("LT", "Lithuania"),
        ("LU", "Luxembourg"),
        ("LV", "Latvia"),
        ("LY", "Libya"),
        ("MA", "Morocco"),
        ("ME", "Montenegro"),
        ("MG", "Madagascar"),
        ("MK", "North Macedonia"),
        ("ML", "Mali"),
        ("MM", "Myanmar"),
        ("MO", "Macau"),
        ("MP", "Northern Mariana Islands"),
        ("MR", "Mauritania"),
        ("MT", "Malta"),
        ("MU", "Mauritius"),
        ("MV", "Maldives"),
        ("MW", "Malawi"),
        ("MX", "Mexico"),
        ("MY", "Malaysia"),
        ("MZ", "Mozambique"),
        ("NA", "Namibia"),
        ("NE", "Niger"),
        ("NG", "Nigeria"),
        ("NL", "Netherlands"),
        ("NO", "Norway"),
        ("NP", "Nepal"),
        ("NZ", "New Zealand"),
        ("OM", "Oman"),
        ("PA", "Panama"),
        ("PE", "Peru"),
        ("PF", "French Polynesia"),
        ("PH", "Philippines"),
        ("PK", "Pakistan"),
        ("PL", "Poland"),
        ("PR", "Puerto Rico"),
        ("PT", "Portugal"),
        ("PY", "Paraguay"),
        ("QA", "Qatar"),
        ("RE", "Reunion"),
        ("RO", "Romania"),
        ("RS", "Serbia"),
        ("RU", "Russia"),
        ("RW", "Rwanda"),
        ("SA", "Saudi Arabia"),
        ("SC", "Seychelles"),
        ("SE", "Sweden"),
        ("SG", "Singapore"),
        ("SI", "Slovenia"),
        ("SK", "Slovakia"),
        ("SL", "Sierra Leone"),
        ("SN", "Senegal"),
        ("SV", "El Salvador"),
        ("SY", "Syria"),
        ("SZ", "Eswatini"),
        ("TG", "Togo"),
        ("TH", "Thailand"),
        ("TN", "Tunisia"),
        ("TR", "Turkey"),
        ("TT", "Trinidad and Tobago"),
        ("TW", "Taiwan"),
        ("TZ", "Tanzania"),
        ("UA", "Ukraine"),
        ("UG", "Uganda"),
        ("US", "United States"),
        ("UY", "Uruguay"),
        ("UZ", "Uzbekistan"),
        ("VE", "Venezuela"),
        ("VN", "Vietnam"),
        ("VU", "Vanuatu"),
        ("YE", "Yemen"),
        ("ZA", "South Africa"),
        ("ZM", "Zambia"),
        ("ZW", "Zimbabwe"),
    ]
    .into_iter()
    .collect()
});

/// Country name for a two-letter ISO code, if known.
pub fn country_name_for_iso(code: &str) -> Option<&'static str> {
    ISO_COUNTRIES.get(code.trim().to_uppercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_lookup_is_case_insensitive() {
        assert_eq!(country_name_for_iso("tr"), Some("Turkey"));
        assert_eq!(country_name_for_iso(" GB "), Some("United Kingdom"));
        assert_eq!(country_name_for_iso("XX"), None);
    }

    #[test]
    fn test_region_falls_back_to_code() {
        assert_eq!(region_for_continent("EU"), "Europe");
        assert_eq!(region_for_continent("ZZ"), "ZZ");
    }

    #[test]
    fn test_designation_tokens_are_not_stopwords() {
        assert!(!NAME_STOPWORDS.contains(DOMESTIC_TOKEN));
        assert!(!NAME_STOPWORDS.contains(INTERNATIONAL_TOKEN));
    }
}
