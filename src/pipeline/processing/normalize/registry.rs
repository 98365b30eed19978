use std::collections::HashMap;

use super::normalizers::{providers, ProfileNormalizer, SourceNormalizer};
use super::{NormalizedRecord, RawRecord};
use crate::error::{LoungeError, Result};

/// Registry for source-specific normalization strategies
pub struct NormalizationRegistry {
    normalizers: HashMap<String, Box<dyn SourceNormalizer>>,
}

impl NormalizationRegistry {
    /// Create a new normalization registry with the built-in provider normalizers
    pub fn new() -> Self {
        let mut registry = Self {
            normalizers: HashMap::new(),
        };
        for profile in providers::all() {
            let source_id = profile.source_id.to_string();
            registry.register(source_id, Box::new(ProfileNormalizer::new(profile)));
        }
        registry
    }

    /// Register a normalizer for a specific source
    pub fn register(&mut self, source_id: String, normalizer: Box<dyn SourceNormalizer>) {
        self.normalizers.insert(source_id, normalizer);
    }

    /// Get the appropriate normalizer for a source
    pub fn get_normalizer(&self, source_id: &str) -> Option<&dyn SourceNormalizer> {
        self.normalizers.get(source_id).map(|n| n.as_ref())
    }

    /// Normalize a record using the appropriate source-specific normalizer
    pub fn normalize(&self, record: &RawRecord) -> Result<Option<NormalizedRecord>> {
        match self.get_normalizer(&record.source_id) {
            Some(normalizer) => normalizer.normalize(record),
            None => Err(LoungeError::Config(format!(
                "No normalizer registered for source: {}",
                record.source_id
            ))),
        }
    }

    /// List all registered source IDs
    pub fn list_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.normalizers.keys().map(|k| k.as_str()).collect();
        sources.sort_unstable();
        sources
    }
}

impl Default for NormalizationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_has_built_in_normalizers() {
        let registry = NormalizationRegistry::new();

        let sources = registry.list_sources();
        assert!(sources.contains(&"priority_pass"));
        assert!(sources.contains(&"amex"));
        assert!(sources.contains(&"canonical"));
        assert_eq!(sources.len(), crate::constants::get_supported_sources().len());
    }

    #[test]
    fn test_registry_returns_error_for_unknown_source() {
        let registry = NormalizationRegistry::new();
        let record = RawRecord::new("unknown_source", 1, json!({"name": "Sky"}));

        // Should return an error for unknown sources
        assert!(registry.normalize(&record).is_err());
    }

    #[test]
    fn test_registry_routes_by_source_id() {
        let registry = NormalizationRegistry::new();
        let record = RawRecord::new("dreamfolks", 1, json!({"name": "Sky", "airport": "BLR"}));

        let normalized = registry.normalize(&record).unwrap().unwrap();
        assert_eq!(normalized.record.source, "DreamFolks");
        assert_eq!(
            registry.get_normalizer("dreamfolks").map(|n| n.name()),
            Some("DreamFolks Normalizer")
        );
    }
}
