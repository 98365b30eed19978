use serde::{Deserialize, Serialize};

use crate::constants::{DOMESTIC_TOKEN, INTERNATIONAL_TOKEN, NAME_STOPWORDS};
use crate::domain::LoungeRecord;

pub mod normalizers;
pub mod registry;

pub use registry::NormalizationRegistry;

/// One row of a provider export, before any interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Normalizer id the row is routed to
    pub source_id: String,
    /// 1-based position of the row within its file
    pub row_number: usize,
    /// Provenance label overriding the normalizer's default
    pub source_label: Option<String>,
    /// Field map. CSV rows hold strings only; JSON rows keep native types.
    pub record: serde_json::Value,
}

impl RawRecord {
    pub fn new(source_id: impl Into<String>, row_number: usize, record: serde_json::Value) -> Self {
        Self {
            source_id: source_id.into(),
            row_number,
            source_label: None,
            record,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.source_label = label;
        self
    }
}

/// A source row mapped onto the canonical record, plus its dedup key.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: LoungeRecord,
    pub key: String,
}

impl NormalizedRecord {
    pub fn from_record(record: LoungeRecord) -> Self {
        let key = dedup_key(&record);
        Self { record, key }
    }
}

/// Domestic/international marker carried by a lounge's name or terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Designation {
    Unspecified,
    Domestic,
    International,
    Both,
}

impl Designation {
    pub fn of(record: &LoungeRecord) -> Self {
        let mut domestic = false;
        let mut international = false;
        let texts = [Some(record.name.as_str()), record.terminal.as_deref()];
        for token in texts.into_iter().flatten().flat_map(tokens) {
            match token.as_str() {
                DOMESTIC_TOKEN => domestic = true,
                INTERNATIONAL_TOKEN => international = true,
                _ => {}
            }
        }
        match (domestic, international) {
            (true, true) => Designation::Both,
            (true, false) => Designation::Domestic,
            (false, true) => Designation::International,
            (false, false) => Designation::Unspecified,
        }
    }

    /// Only an explicit domestic/international pair conflicts.
    pub fn conflicts_with(self, other: Designation) -> bool {
        matches!(
            (self, other),
            (Designation::Domestic, Designation::International)
                | (Designation::International, Designation::Domestic)
        )
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Name with stopwords dropped. `domestic`/`international` are moved out of
/// the body and re-appended as suffixes so the two variants never collide.
pub fn normalize_name(name: &str) -> String {
    let mut body: Vec<String> = Vec::new();
    let mut domestic = false;
    let mut international = false;

    for token in tokens(name) {
        match token.as_str() {
            DOMESTIC_TOKEN => domestic = true,
            INTERNATIONAL_TOKEN => international = true,
            t if NAME_STOPWORDS.contains(t) => {}
            _ => body.push(token),
        }
    }

    let mut normalized = body.join("_");
    if domestic {
        normalized.push('_');
        normalized.push_str(DOMESTIC_TOKEN);
    }
    if international {
        normalized.push('_');
        normalized.push_str(INTERNATIONAL_TOKEN);
    }
    normalized
}

fn key_part(value: Option<&str>) -> String {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .unwrap_or_default()
}

/// `airport_code _ city _ normalized_name _ terminal`, lower-cased, missing
/// parts empty.
pub fn dedup_key(record: &LoungeRecord) -> String {
    format!(
        "{}_{}_{}_{}",
        key_part(record.airport_code.as_deref()),
        key_part(record.city.as_deref()),
        normalize_name(&record.name),
        key_part(record.terminal.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lounge(name: &str, code: &str, terminal: Option<&str>) -> LoungeRecord {
        let mut record = LoungeRecord::new("id", name, "test");
        record.airport_code = Some(code.to_string());
        record.terminal = terminal.map(str::to_string);
        record
    }

    #[test]
    fn test_normalize_name_drops_stopwords() {
        assert_eq!(normalize_name("The Centurion Lounge"), "centurion");
        assert_eq!(normalize_name("Plaza Premium Lounge (Departures)"), "plaza");
        assert_eq!(normalize_name("Emirates First Class Lounge"), "emirates");
    }

    #[test]
    fn test_normalize_name_keeps_designation_as_suffix() {
        assert_eq!(normalize_name("IGA Domestic Lounge"), "iga_domestic");
        assert_eq!(normalize_name("International VIP Lounge"), "_international");
        assert_ne!(
            normalize_name("Sky Lounge Domestic"),
            normalize_name("Sky Lounge International")
        );
    }

    #[test]
    fn test_stopwords_are_whole_tokens() {
        // "clubhouse" and "theatre" must survive intact
        assert_eq!(normalize_name("Clubhouse Theatre"), "clubhouse_theatre");
    }

    #[test]
    fn test_dedup_key_layout() {
        let mut record = lounge("Priority Pass Lounge", "IST", Some("International"));
        record.city = Some("Istanbul".into());
        assert_eq!(dedup_key(&record), "ist_istanbul_priority_pass_international");

        let bare = LoungeRecord::new("id", "Lounge One", "test");
        assert_eq!(dedup_key(&bare), "__one_");
    }

    #[test]
    fn test_designation_from_name_and_terminal() {
        assert_eq!(
            Designation::of(&lounge("Priority Pass Lounge", "IST", Some("Domestic"))),
            Designation::Domestic
        );
        assert_eq!(
            Designation::of(&lounge("International Lounge", "IST", None)),
            Designation::International
        );
        assert_eq!(
            Designation::of(&lounge("Sky Lounge", "IST", Some("T1"))),
            Designation::Unspecified
        );
        assert!(Designation::Domestic.conflicts_with(Designation::International));
        assert!(!Designation::Domestic.conflicts_with(Designation::Unspecified));
        assert!(!Designation::Both.conflicts_with(Designation::Domestic));
    }
}
