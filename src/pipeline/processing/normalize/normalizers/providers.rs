//! Built-in provider profiles. Column names follow each provider's export.

use super::profile::ProviderProfile;
use crate::constants::*;
use crate::domain::LoungeType;

/// Lower-case snake columns shared by the smaller partner exports.
const PARTNER_NAME: &[&str] = &["name", "Name", "Lounge Name"];
const PARTNER_AIRPORT: &[&str] = &["airport", "Airport"];
const PARTNER_TERMINAL: &[&str] = &["terminal", "Terminal"];
const PARTNER_CITY: &[&str] = &["city", "City"];
const PARTNER_COUNTRY: &[&str] = &["country", "Country"];
const PARTNER_LOCATION: &[&str] = &["location", "Location"];
const PARTNER_DESCRIPTION: &[&str] = &["description", "Description"];

fn partner(
    source_id: &'static str,
    label: &'static str,
    display_name: &'static str,
    lounge_type: LoungeType,
    access_methods: &'static [&'static str],
) -> ProviderProfile {
    ProviderProfile {
        id_fields: &[],
        name_fields: PARTNER_NAME,
        code_fields: &["airport_code", "iata"],
        airport_fields: PARTNER_AIRPORT,
        airport_name_fields: &["airport_name"],
        terminal_fields: PARTNER_TERMINAL,
        city_fields: PARTNER_CITY,
        country_fields: PARTNER_COUNTRY,
        location_fields: PARTNER_LOCATION,
        description_fields: PARTNER_DESCRIPTION,
        lounge_type: Some(lounge_type),
        access_methods,
        source_from_row: false,
        ..ProviderProfile::canonical(source_id, label, display_name)
    }
}

pub fn priority_pass() -> ProviderProfile {
    ProviderProfile {
        id_fields: &[],
        name_fields: &["Lounge Name", "name"],
        code_fields: &["Airport (IATA)", "airport_code"],
        airport_fields: &["Airport", "airport"],
        airport_name_fields: &["Airport Full", "airport_name"],
        terminal_fields: &["Terminal", "terminal"],
        city_fields: &["City", "city"],
        country_fields: &["Country", "country"],
        location_fields: &["Location", "location"],
        hours_fields: &["Hours", "open_hours"],
        conditions_fields: &["Conditions", "conditions"],
        description_fields: &["Description", "description"],
        lounge_type: Some(LoungeType::Independent),
        access_methods: &["Priority Pass"],
        source_from_row: false,
        ..ProviderProfile::canonical(PRIORITY_PASS_SOURCE, "PriorityPass", "Priority Pass Normalizer")
    }
}

/// Earlier hosted-database export; already in master shape with `airport`
/// holding the code.
pub fn supabase() -> ProviderProfile {
    ProviderProfile {
        lounge_type: Some(LoungeType::Independent),
        source_from_row: false,
        ..ProviderProfile::canonical(SUPABASE_SOURCE, "Supabase", "Supabase Export Normalizer")
    }
}

pub fn amex() -> ProviderProfile {
    ProviderProfile {
        amenities: &[
            "Premium Dining",
            "Spa Services",
            "Private Workspace",
            "Shower Facilities",
        ],
        ..partner(
            AMEX_SOURCE,
            "Amex",
            "Amex Centurion Normalizer",
            LoungeType::Centurion,
            &["American Express Platinum", "Centurion Card"],
        )
    }
}

pub fn dreamfolks() -> ProviderProfile {
    partner(
        DREAMFOLKS_SOURCE,
        "DreamFolks",
        "DreamFolks Normalizer",
        LoungeType::Partner,
        &["DreamFolks"],
    )
}

pub fn plaza_premium() -> ProviderProfile {
    partner(
        PLAZA_PREMIUM_SOURCE,
        "PlazaPremium",
        "Plaza Premium Normalizer",
        LoungeType::Operator,
        &["Plaza Premium", "Priority Pass"],
    )
}

/// TAV operates mostly Turkish airports; its export has no country for
/// most rows and keeps in-terminal directions under `Notes`.
pub fn tav() -> ProviderProfile {
    ProviderProfile {
        name_fields: &["Lounge Name", "name"],
        location_fields: &["Notes", "Location", "location"],
        default_country: Some("Turkey"),
        ..partner(
            TAV_SOURCE,
            "TAV",
            "TAV Lounges Normalizer",
            LoungeType::Operator,
            &["TAV Passport", "Priority Pass"],
        )
    }
}

pub fn airline_lounges() -> ProviderProfile {
    ProviderProfile {
        airline_fields: &["airline"],
        lounge_type: Some(LoungeType::Airline),
        source_from_row: false,
        ..ProviderProfile::canonical(
            AIRLINE_LOUNGES_SOURCE,
            "AirlineLounges",
            "Airline Lounges Normalizer",
        )
    }
}

pub fn canonical() -> ProviderProfile {
    ProviderProfile::canonical(CANONICAL_SOURCE, "Canonical", "Master Schema Normalizer")
}

/// Every built-in profile, in `get_supported_sources` order.
pub fn all() -> Vec<ProviderProfile> {
    vec![
        priority_pass(),
        supabase(),
        amex(),
        dreamfolks(),
        plaza_premium(),
        tav(),
        airline_lounges(),
        canonical(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::normalizers::{ProfileNormalizer, SourceNormalizer};
    use crate::pipeline::processing::normalize::RawRecord;
    use serde_json::json;

    fn run(profile: ProviderProfile, row: serde_json::Value) -> crate::domain::LoungeRecord {
        let source_id = profile.source_id;
        ProfileNormalizer::new(profile)
            .normalize(&RawRecord::new(source_id, 1, row))
            .unwrap()
            .unwrap()
            .record
    }

    #[test]
    fn test_profiles_cover_supported_sources() {
        let ids: Vec<&str> = all().iter().map(|p| p.source_id).collect();
        assert_eq!(ids, get_supported_sources());
    }

    #[test]
    fn test_priority_pass_columns() {
        let record = run(
            priority_pass(),
            json!({
                "Lounge Name": "Primeclass Lounge",
                "Airport (IATA)": "IST",
                "Airport Full": "Istanbul Airport",
                "City": "Istanbul",
                "Country": "Turkey",
                "Terminal": "International",
                "Hours": "24 hours",
                "Conditions": "2 hours max"
            }),
        );
        assert_eq!(record.airport_code.as_deref(), Some("IST"));
        assert_eq!(record.airport_name.as_deref(), Some("Istanbul Airport"));
        assert_eq!(record.open_hours.as_deref(), Some("24 hours"));
        assert_eq!(record.lounge_type, Some(LoungeType::Independent));
        assert!(record.access_methods.contains("Priority Pass"));
        assert_eq!(record.source, "PriorityPass");
        assert_eq!(record.id, "ist_primeclass_lounge_international");
    }

    #[test]
    fn test_amex_keeps_airport_name_without_placeholder_code() {
        let record = run(
            amex(),
            json!({"name": "The Centurion Lounge", "airport": "Hong Kong International"}),
        );
        assert_eq!(record.airport_code, None);
        assert_eq!(record.airport_name.as_deref(), Some("Hong Kong International"));
        assert_eq!(record.lounge_type, Some(LoungeType::Centurion));
        assert!(record.access_methods.contains("Centurion Card"));
        assert!(record.amenities.contains("Spa Services"));
    }

    #[test]
    fn test_tav_defaults_country_and_reads_notes() {
        let record = run(
            tav(),
            json!({"Lounge Name": "TAV Primeclass", "Airport": "ESB", "City": "Ankara", "Notes": "Airside, level 2"}),
        );
        assert_eq!(record.airport_code.as_deref(), Some("ESB"));
        assert_eq!(record.country.as_deref(), Some("Turkey"));
        assert_eq!(record.location.as_deref(), Some("Airside, level 2"));
    }

    #[test]
    fn test_airline_access_from_airline_column() {
        let record = run(
            airline_lounges(),
            json!({"name": "Delta Sky Club", "airport_code": "ATL", "airline": "Delta"}),
        );
        assert_eq!(record.lounge_type, Some(LoungeType::Airline));
        assert!(record.access_methods.contains("Delta First/Business Class"));
    }

    #[test]
    fn test_supabase_airport_column_is_code() {
        let record = run(
            supabase(),
            json!({"id": "lhr_plaza", "name": "Plaza Premium", "airport": "LHR", "lounge_type": "operator"}),
        );
        assert_eq!(record.id, "lhr_plaza");
        assert_eq!(record.airport_code.as_deref(), Some("LHR"));
        assert_eq!(record.lounge_type, Some(LoungeType::Operator));
        assert_eq!(record.source, "Supabase");
    }
}
