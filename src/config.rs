use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{self, DEFAULT_MERGE_THRESHOLD};
use crate::error::{LoungeError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "lounge_merge.toml";

/// Top-level pipeline configuration, read from `lounge_merge.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub airports: AirportsConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Similarity above which two records sharing a key are merged.
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_master_csv")]
    pub master_csv: PathBuf,
    #[serde(default = "default_master_json")]
    pub master_json: PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            master_csv: default_master_csv(),
            master_json: default_master_json(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Normalizer id, see `constants::get_supported_sources`.
    pub id: String,
    pub path: PathBuf,
    /// Defaults from the file extension.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// Provenance label; defaults to the normalizer's label.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl SourceConfig {
    pub fn resolved_format(&self) -> SourceFormat {
        self.format.unwrap_or_else(|| {
            match self.path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Json,
                _ => SourceFormat::Csv,
            }
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirportsConfig {
    /// OurAirports-style CSV; enrichment is skipped when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_web_dir")]
    pub web_data_dir: PathBuf,
    #[serde(default = "default_csv_dir")]
    pub csv_export_dir: PathBuf,
    #[serde(default)]
    pub uppercase_countries: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            web_data_dir: default_web_dir(),
            csv_export_dir: default_csv_dir(),
            uppercase_countries: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_photo_api_url")]
    pub api_url: String,
    #[serde(default = "default_requests_per_min")]
    pub requests_per_min: u64,
    #[serde(default = "default_workers")]
    pub workers: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Web paths rotated onto lounges that end up without photos.
    #[serde(default)]
    pub generic_images: Vec<String>,
    #[serde(default = "default_attributions")]
    pub attributions_file: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            api_url: default_photo_api_url(),
            requests_per_min: default_requests_per_min(),
            workers: default_workers(),
            timeout_seconds: default_timeout_seconds(),
            generic_images: Vec::new(),
            attributions_file: default_attributions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_lounges_table")]
    pub lounges_table: String,
    #[serde(default = "default_airports_table")]
    pub airports_table: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            lounges_table: default_lounges_table(),
            airports_table: default_airports_table(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// `[extract]`: endpoints and pacing of the dataset extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// `lounges_osm.json`, `lounges_wikidata.json` and `lounges_google.json`
    /// are written here
    #[serde(default = "default_extract_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_wikidata_url")]
    pub wikidata_url: String,
    #[serde(default = "default_places_url")]
    pub places_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_extract_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_extract_rpm")]
    pub requests_per_min: u64,
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Cap on airports queried by per-airport sources
    #[serde(default)]
    pub airport_limit: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: default_extract_dir(),
            overpass_url: default_overpass_url(),
            wikidata_url: default_wikidata_url(),
            places_url: default_places_url(),
            user_agent: default_user_agent(),
            timeout_seconds: default_extract_timeout(),
            requests_per_min: default_extract_rpm(),
            workers: default_workers(),
            airport_limit: None,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_MERGE_THRESHOLD
}
fn default_master_csv() -> PathBuf {
    PathBuf::from("output/master_lounges.csv")
}
fn default_master_json() -> PathBuf {
    PathBuf::from("output/master_lounges.json")
}
fn default_true() -> bool {
    true
}
fn default_web_dir() -> PathBuf {
    PathBuf::from("web/src/data")
}
fn default_csv_dir() -> PathBuf {
    PathBuf::from("output/lounge_exports")
}
fn default_photo_api_url() -> String {
    "https://api.pexels.com/v1/search".to_string()
}
fn default_requests_per_min() -> u64 {
    // 200 requests per hour on the free photo-search tier
    3
}
fn default_workers() -> u32 {
    2
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_attributions() -> PathBuf {
    PathBuf::from("web/src/data/photo_attributions.json")
}
fn default_extract_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}
fn default_wikidata_url() -> String {
    "https://query.wikidata.org/sparql".to_string()
}
fn default_places_url() -> String {
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json".to_string()
}
fn default_user_agent() -> String {
    concat!("lounge_merge/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_extract_timeout() -> u64 {
    // worldwide Overpass queries run long
    90
}
fn default_extract_rpm() -> u64 {
    30
}
fn default_batch_size() -> usize {
    100
}
fn default_lounges_table() -> String {
    "lounges".to_string()
}
fn default_airports_table() -> String {
    "airports".to_string()
}

impl Config {
    /// Load the config file. A missing file at the default path yields the
    /// built-in defaults; a missing file anywhere else is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if path == Path::new(DEFAULT_CONFIG_PATH) {
                info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                return Ok(Self::default());
            }
            return Err(LoungeError::Config(format!(
                "Failed to read config file '{}': not found",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LoungeError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.merge.similarity_threshold) {
            return Err(LoungeError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.merge.similarity_threshold
            )));
        }
        if self.upload.batch_size == 0 {
            return Err(LoungeError::Config("upload.batch_size must be positive".into()));
        }
        if self.images.workers == 0 {
            return Err(LoungeError::Config("images.workers must be positive".into()));
        }
        if self.extract.workers == 0 {
            return Err(LoungeError::Config("extract.workers must be positive".into()));
        }
        let supported = constants::get_supported_sources();
        for source in &self.sources {
            if !supported.contains(&source.id.as_str()) {
                return Err(LoungeError::Config(format!(
                    "Unknown source id '{}' (supported: {})",
                    source.id,
                    supported.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Credentials pulled from the environment (`.env` is loaded at startup).
pub fn env_secret(name: &str) -> Result<String> {
    let value = std::env::var(name)?;
    if value.trim().is_empty() {
        return Err(LoungeError::Config(format!("{} is set but empty", name)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.merge.similarity_threshold, 0.7);
        assert_eq!(config.upload.batch_size, 100);
        assert!(config.sources.is_empty());
        assert_eq!(config.extract.output_dir, PathBuf::from("data"));
        assert!(config.extract.airport_limit.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extract_section_overrides() {
        let config: Config = toml::from_str(
            r#"
            [extract]
            output_dir = "raw"
            airport_limit = 5
            workers = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.extract.output_dir, PathBuf::from("raw"));
        assert_eq!(config.extract.airport_limit, Some(5));
        assert!(config.extract.overpass_url.contains("overpass"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sources_parse_and_infer_format() {
        let config: Config = toml::from_str(
            r#"
            [merge]
            similarity_threshold = 0.8

            [[sources]]
            id = "priority_pass"
            path = "data/prioritypass_lounges.csv"

            [[sources]]
            id = "canonical"
            path = "data/lounges_osm.json"
            label = "OpenStreetMap"
            required = false
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].resolved_format(), SourceFormat::Csv);
        assert!(config.sources[0].required);
        assert_eq!(config.sources[1].resolved_format(), SourceFormat::Json);
        assert!(!config.sources[1].required);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_source_and_bad_threshold() {
        let mut config = Config::default();
        config.sources.push(SourceConfig {
            id: "nope".into(),
            path: "x.csv".into(),
            format: None,
            label: None,
            required: true,
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.merge.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
