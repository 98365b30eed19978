use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::LoungeRecord;

/// Dataset-level counts reported after every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total: usize,
    pub countries: usize,
    pub cities: usize,
    pub airports: usize,
    pub by_lounge_type: BTreeMap<String, usize>,
    pub by_access_method: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub multi_source: usize,
    pub with_coordinates: usize,
    pub with_rating: usize,
    pub verified: usize,
}

impl DatasetStats {
    pub fn compute(records: &[LoungeRecord]) -> Self {
        let mut stats = DatasetStats {
            total: records.len(),
            ..Default::default()
        };
        let mut countries = BTreeSet::new();
        let mut cities = BTreeSet::new();
        let mut airports = BTreeSet::new();

        for record in records {
            if let Some(country) = &record.country {
                countries.insert(country.to_lowercase());
            }
            if let Some(city) = &record.city {
                cities.insert(city.to_lowercase());
            }
            if let Some(code) = &record.airport_code {
                airports.insert(code.to_uppercase());
            }

            let lounge_type = record
                .lounge_type
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            *stats.by_lounge_type.entry(lounge_type).or_default() += 1;
            for method in &record.access_methods {
                *stats.by_access_method.entry(method.clone()).or_default() += 1;
            }
            for source in &record.data_sources {
                *stats.by_source.entry(source.clone()).or_default() += 1;
            }

            if record.data_sources.len() > 1 {
                stats.multi_source += 1;
            }
            if record.position().is_some() {
                stats.with_coordinates += 1;
            }
            if record.has_rating() {
                stats.with_rating += 1;
            }
            if record.verified {
                stats.verified += 1;
            }
        }

        stats.countries = countries.len();
        stats.cities = cities.len();
        stats.airports = airports.len();
        stats
    }

    fn top(map: &BTreeMap<String, usize>, n: usize) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Total lounges: {}", self.total)?;
        writeln!(
            f,
            "   Countries: {}  Cities: {}  Airports: {}",
            self.countries, self.cities, self.airports
        )?;
        writeln!(
            f,
            "   Multi-source: {}  With coordinates: {}  Rated: {}  Verified: {}",
            self.multi_source, self.with_coordinates, self.with_rating, self.verified
        )?;
        writeln!(f, "   Lounge types:")?;
        for (name, count) in Self::top(&self.by_lounge_type, usize::MAX) {
            writeln!(f, "      {}: {}", name, count)?;
        }
        writeln!(f, "   Top access methods:")?;
        for (name, count) in Self::top(&self.by_access_method, 10) {
            writeln!(f, "      {}: {}", name, count)?;
        }
        writeln!(f, "   Sources:")?;
        for (name, count) in Self::top(&self.by_source, usize::MAX) {
            writeln!(f, "      {}: {}", name, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LoungeType;

    #[test]
    fn test_counts() {
        let mut a = LoungeRecord::new("a", "A", "PriorityPass");
        a.country = Some("Turkey".into());
        a.city = Some("Istanbul".into());
        a.airport_code = Some("IST".into());
        a.lounge_type = Some(LoungeType::Independent);
        a.access_methods.insert("Priority Pass".into());
        a.data_sources.insert("TAV".into());
        a.rating = 4.0;

        let mut b = LoungeRecord::new("b", "B", "Amex");
        b.country = Some("turkey".into());
        b.airport_code = Some("SAW".into());
        b.verified = true;

        let stats = DatasetStats::compute(&[a, b]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.countries, 1);
        assert_eq!(stats.cities, 1);
        assert_eq!(stats.airports, 2);
        assert_eq!(stats.by_lounge_type.get("unknown"), Some(&1));
        assert_eq!(stats.by_source.get("TAV"), Some(&1));
        assert_eq!(stats.multi_source, 1);
        assert_eq!(stats.with_rating, 1);
        assert_eq!(stats.verified, 1);
        assert!(stats.to_string().contains("Total lounges: 2"));
    }
}
