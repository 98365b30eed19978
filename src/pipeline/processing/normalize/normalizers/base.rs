use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::constants::{country_name_for_iso, MAX_ID_LEN};
use crate::domain::Coordinates;
use crate::error::Result;
use crate::pipeline::processing::normalize::{NormalizedRecord, RawRecord};

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern compiles"));

/// Base trait for source-specific normalizers
pub trait SourceNormalizer: Send + Sync {
    /// Map one raw row onto the canonical record. `Ok(None)` means the row
    /// carried no usable identity and was dropped.
    fn normalize(&self, record: &RawRecord) -> Result<Option<NormalizedRecord>>;

    /// Get the source ID this normalizer handles
    fn source_id(&self) -> &str;

    /// Get a human-readable name for this normalizer
    fn name(&self) -> &str;
}

/// Field extraction helpers shared by all normalizers
pub struct NormalizerUtils;

impl NormalizerUtils {
    /// Trimmed, BOM-free text; empty becomes `None`. Numbers and booleans
    /// are rendered as text, containers are ignored.
    pub fn clean_text(value: &Value) -> Option<String> {
        let text = match value {
            Value::String(s) => s.replace('\u{feff}', ""),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// First alias present with a non-null value.
    pub fn raw_field<'a>(data: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|alias| data.get(*alias))
            .find(|v| !v.is_null())
    }

    /// First alias whose cleaned text is non-empty.
    pub fn field(data: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| data.get(*alias))
            .find_map(Self::clean_text)
    }

    /// A JSON array (native or encoded as a string), or a comma/semicolon
    /// separated string.
    pub fn parse_list(value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().filter_map(Self::clean_text).collect(),
            Value::String(s) => {
                let s = s.replace('\u{feff}', "");
                let trimmed = s.trim();
                if trimmed.starts_with('[') {
                    if let Ok(items) = serde_json::from_str::<Vec<Value>>(trimmed) {
                        return items.iter().filter_map(Self::clean_text).collect();
                    }
                }
                trimmed
                    .split([',', ';'])
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            other => Self::clean_text(other).into_iter().collect(),
        }
    }

    /// Union of the lists found under every alias.
    pub fn list_field(data: &Map<String, Value>, aliases: &[&str]) -> Vec<String> {
        aliases
            .iter()
            .filter_map(|alias| data.get(*alias))
            .flat_map(Self::parse_list)
            .collect()
    }

    pub fn parse_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    pub fn parse_u32(value: &Value) -> Option<u32> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<u32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
            }
            _ => None,
        }
    }

    pub fn parse_bool(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Coordinates from a `"lat,lng"` string, a `{lat,lng}` /
    /// `{latitude,longitude}` object, or separate top-level fields.
    pub fn parse_coordinates(data: &Map<String, Value>) -> Option<Coordinates> {
        Self::coordinates_at(data, &["coordinates", "coords", "location_coordinates"])
            .or_else(|| Self::coordinates_from_fields(data))
    }

    /// Coordinates held in one of `keys`, in any of the accepted forms.
    pub fn coordinates_at(data: &Map<String, Value>, keys: &[&str]) -> Option<Coordinates> {
        match Self::raw_field(data, keys)? {
            Value::String(s) => Coordinates::parse_pair(s),
            Value::Object(obj) => Self::coordinates_from_fields(obj),
            Value::Array(items) if items.len() == 2 => {
                match (Self::parse_f64(&items[0]), Self::parse_f64(&items[1])) {
                    (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn coordinates_from_fields(obj: &Map<String, Value>) -> Option<Coordinates> {
        let lat = Self::raw_field(obj, &["lat", "latitude", "latitude_deg"]).and_then(Self::parse_f64)?;
        let lng = Self::raw_field(obj, &["lng", "lon", "longitude", "longitude_deg"])
            .and_then(Self::parse_f64)?;
        Coordinates::new(lat, lng)
    }

    /// Split airport identity into `(code, name)`.
    ///
    /// An explicit code wins. Otherwise a 3-letter alphabetic airport value is
    /// taken as the IATA code; anything else is kept as the airport name.
    pub fn resolve_airport(
        explicit_code: Option<String>,
        airport: Option<String>,
        airport_name: Option<String>,
    ) -> (Option<String>, Option<String>) {
        if let Some(code) = explicit_code {
            let airport = airport.filter(|a| !a.eq_ignore_ascii_case(&code));
            return (Some(code.to_uppercase()), airport_name.or(airport));
        }
        match airport {
            Some(value) if Self::looks_like_iata(&value) => {
                (Some(value.to_uppercase()), airport_name)
            }
            Some(value) => (None, airport_name.or(Some(value))),
            None => (None, airport_name),
        }
    }

    pub fn looks_like_iata(value: &str) -> bool {
        value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic())
    }

    /// Expand a two-letter ISO code to a country name; other values pass
    /// through unchanged.
    pub fn normalize_country(value: String) -> String {
        if value.len() == 2 {
            if let Some(name) = country_name_for_iso(&value) {
                return name.to_string();
            }
        }
        value
    }

    /// `{airport}_{name}[_{terminal}]` slug, truncated.
    pub fn generate_id(name: &str, airport_code: Option<&str>, terminal: Option<&str>) -> String {
        let slug = |s: &str| NON_SLUG_CHARS.replace_all(&s.to_lowercase(), "_").into_owned();
        let airport = airport_code.map(slug).unwrap_or_else(|| "unknown".to_string());

        let mut id = format!("{}_{}", airport, slug(name));
        if let Some(terminal) = terminal {
            id.push('_');
            id.push_str(&slug(terminal));
        }
        // Slugs are ASCII, so byte truncation stays on a char boundary
        id.truncate(MAX_ID_LEN);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(NormalizerUtils::clean_text(&json!("  \u{feff}Sky Lounge ")), Some("Sky Lounge".into()));
        assert_eq!(NormalizerUtils::clean_text(&json!("   ")), None);
        assert_eq!(NormalizerUtils::clean_text(&json!(3)), Some("3".into()));
        assert_eq!(NormalizerUtils::clean_text(&Value::Null), None);
    }

    #[test]
    fn test_field_skips_empty_aliases() {
        let data = obj(json!({"Lounge Name": "", "name": "Sky"}));
        assert_eq!(NormalizerUtils::field(&data, &["Lounge Name", "name"]), Some("Sky".into()));
    }

    #[test]
    fn test_parse_list_variants() {
        assert_eq!(
            NormalizerUtils::parse_list(&json!(r#"["Wi-Fi", "Showers"]"#)),
            vec!["Wi-Fi", "Showers"]
        );
        assert_eq!(
            NormalizerUtils::parse_list(&json!("Wi-Fi, Showers; Bar")),
            vec!["Wi-Fi", "Showers", "Bar"]
        );
        assert_eq!(NormalizerUtils::parse_list(&json!(["Spa", ""])), vec!["Spa"]);
        assert!(NormalizerUtils::parse_list(&json!("[]")).is_empty());
    }

    #[test]
    fn test_parse_coordinates_forms() {
        let pair = obj(json!({"coordinates": "41.27,28.75"}));
        assert_eq!(NormalizerUtils::parse_coordinates(&pair), Coordinates::new(41.27, 28.75));

        let nested = obj(json!({"coordinates": {"lat": 1.5, "lng": 2.5}}));
        assert_eq!(NormalizerUtils::parse_coordinates(&nested), Coordinates::new(1.5, 2.5));

        let split = obj(json!({"latitude": "33.64", "longitude": "-84.43"}));
        assert_eq!(NormalizerUtils::parse_coordinates(&split), Coordinates::new(33.64, -84.43));

        let invalid = obj(json!({"coordinates": "120,10"}));
        assert_eq!(NormalizerUtils::parse_coordinates(&invalid), None);
    }

    #[test]
    fn test_resolve_airport() {
        assert_eq!(
            NormalizerUtils::resolve_airport(Some("ist".into()), None, Some("Istanbul Airport".into())),
            (Some("IST".into()), Some("Istanbul Airport".into()))
        );
        assert_eq!(
            NormalizerUtils::resolve_airport(None, Some("jfk".into()), None),
            (Some("JFK".into()), None)
        );
        assert_eq!(
            NormalizerUtils::resolve_airport(None, Some("Dubai International".into()), None),
            (None, Some("Dubai International".into()))
        );
    }

    #[test]
    fn test_normalize_country() {
        assert_eq!(NormalizerUtils::normalize_country("TR".into()), "Turkey");
        assert_eq!(NormalizerUtils::normalize_country("Turkey".into()), "Turkey");
        assert_eq!(NormalizerUtils::normalize_country("XX".into()), "XX");
    }

    #[test]
    fn test_generate_id() {
        assert_eq!(
            NormalizerUtils::generate_id("Plaza Premium Lounge", Some("LHR"), Some("Terminal 2")),
            "lhr_plaza_premium_lounge_terminal_2"
        );
        assert_eq!(NormalizerUtils::generate_id("Sky", None, None), "unknown_sky");
        let long = "x".repeat(300);
        assert_eq!(NormalizerUtils::generate_id(&long, Some("AAA"), None).len(), MAX_ID_LEN);
    }
}
