use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, warn};

use crate::app::ports::AirportLookup;
use crate::config::{Config, SourceConfig};
use crate::domain::LoungeRecord;
use crate::error::LoungeError;
use crate::infra::{json_export, master_csv, source_reader};
use crate::observability::metrics::{emit_counter, MetricName};
use crate::pipeline::processing::enrich::{DefaultEnricher, EnrichmentReport, Enricher};
use crate::pipeline::processing::normalize::registry::NormalizationRegistry;
use crate::pipeline::processing::normalize::{NormalizedRecord, RawRecord};
use crate::pipeline::processing::{Conflator, DefaultConflator, MergeStats};

/// Result of one merge or dedupe run.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub records: Vec<LoungeRecord>,
    pub stats: MergeStats,
    /// Present when an airport table was supplied
    pub enrichment: Option<EnrichmentReport>,
    /// Provenance labels of the sources that were read
    pub sources: Vec<String>,
}

/// Raw rows of every readable source plus the labels of those sources.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub rows: Vec<RawRecord>,
    pub labels: Vec<String>,
}

/// Read all configured sources. A missing required source aborts before
/// anything is read; a missing optional one is skipped with a warning.
pub fn load_sources(sources: &[SourceConfig]) -> Result<LoadedSources> {
    for source in sources.iter().filter(|s| s.required) {
        if !source.path.is_file() {
            return Err(LoungeError::MissingInput(source.path.clone()))
                .with_context(|| format!("required source '{}' is missing", source.id));
        }
    }

    let mut loaded = LoadedSources::default();
    for source in sources {
        let rows = match source_reader::read_source(source) {
            Ok(rows) => rows,
            Err(LoungeError::MissingInput(path)) if !source.required => {
                warn!("Optional source '{}' not found at {}, skipping", source.id, path.display());
                emit_counter(MetricName::IngestSourcesMissing, 1);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read source '{}' from {}", source.id, source.path.display())
                })
            }
        };
        info!("Loaded {} rows from {} ({})", rows.len(), source.path.display(), source.id);
        loaded
            .labels
            .push(source.label.clone().unwrap_or_else(|| source.id.clone()));
        loaded.rows.extend(rows);
    }
    Ok(loaded)
}

/// Normalize, deduplicate and optionally enrich lounge records.
pub struct MergeUseCase {
    registry: NormalizationRegistry,
    threshold: f64,
    airports: Option<Arc<dyn AirportLookup>>,
}

impl MergeUseCase {
    pub fn new(threshold: f64) -> Self {
        Self {
            registry: NormalizationRegistry::new(),
            threshold,
            airports: None,
        }
    }

    /// Fill location fields from this table after deduplication
    pub fn with_airports(mut self, airports: Arc<dyn AirportLookup>) -> Self {
        self.airports = Some(airports);
        self
    }

    /// Merge raw source rows. Rows that fail normalization or carry no
    /// identity are counted as dropped.
    pub fn merge(&self, rows: &[RawRecord], sources: Vec<String>) -> Result<MergeOutcome> {
        let _span = info_span!("merge", rows = rows.len(), threshold = self.threshold).entered();
        let mut conflator = DefaultConflator::with_threshold(self.threshold);

        for row in rows {
            match self.registry.normalize(row) {
                Ok(Some(normalized)) => {
                    emit_counter(MetricName::NormalizeRecordsProduced, 1);
                    conflator.conflate(normalized);
                }
                Ok(None) => {
                    debug!("Dropped {}#{}: no lounge name", row.source_id, row.row_number);
                    emit_counter(MetricName::NormalizeRecordsDropped, 1);
                    conflator.record_dropped();
                }
                Err(e @ LoungeError::Normalize { .. }) => {
                    warn!("{}", e);
                    emit_counter(MetricName::NormalizeRecordsDropped, 1);
                    conflator.record_dropped();
                }
                Err(e) => return Err(e).context("normalization failed"),
            }
        }

        Ok(self.finish(conflator, sources))
    }

    /// Re-deduplicate already canonical records, e.g. a master CSV.
    pub fn dedupe(&self, records: Vec<LoungeRecord>) -> MergeOutcome {
        let _span = info_span!("dedupe", records = records.len(), threshold = self.threshold).entered();
        let mut sources: Vec<String> = records
            .iter()
            .flat_map(|r| r.data_sources.iter().cloned())
            .collect();
        sources.sort();
        sources.dedup();

        let mut conflator = DefaultConflator::with_threshold(self.threshold);
        for record in records {
            conflator.conflate(NormalizedRecord::from_record(record));
        }
        self.finish(conflator, sources)
    }

    fn finish(&self, conflator: DefaultConflator, sources: Vec<String>) -> MergeOutcome {
        let mut output = conflator.finish();
        info!(
            "Deduplicated {} rows into {} lounges ({} merged, {} distinct collisions, {} dropped)",
            output.stats.input,
            output.stats.unique,
            output.stats.duplicates_merged,
            output.stats.distinct_collisions,
            output.stats.dropped
        );

        let enrichment = self.airports.as_ref().map(|airports| {
            let report = DefaultEnricher::new(Arc::clone(airports)).enrich_all(&mut output.records);
            log_enrichment(&report);
            report
        });

        MergeOutcome {
            records: output.records,
            stats: output.stats,
            enrichment,
            sources,
        }
    }
}

pub fn log_enrichment(report: &EnrichmentReport) {
    info!(
        "Enriched {} lounges from airport table ({} unknown codes, {} without code)",
        report.enriched, report.missing, report.without_code
    );
    if !report.missing_codes.is_empty() {
        let codes: Vec<&str> = report.missing_codes.iter().map(String::as_str).collect();
        warn!("Airport codes not in table: {}", codes.join(", "));
    }
}

/// Write the master CSV and JSON for a finished run.
pub fn write_master(config: &Config, outcome: &MergeOutcome) -> Result<()> {
    master_csv::write_master_csv(&config.merge.master_csv, &outcome.records)
        .with_context(|| format!("failed to write {}", config.merge.master_csv.display()))?;
    json_export::write_master_json(
        &config.merge.master_json,
        &outcome.records,
        &outcome.stats,
        &outcome.sources,
    )
    .with_context(|| format!("failed to write {}", config.merge.master_json.display()))?;
    Ok(())
}

/// `merge` stage: sources in, master CSV/JSON out.
pub fn run_merge(config: &Config, airports: Option<Arc<dyn AirportLookup>>) -> Result<MergeOutcome> {
    if config.sources.is_empty() {
        warn!("No [[sources]] configured; the master file will be empty");
    }
    let loaded = load_sources(&config.sources)?;

    let mut use_case = MergeUseCase::new(config.merge.similarity_threshold);
    if let Some(airports) = airports {
        use_case = use_case.with_airports(airports);
    }
    let outcome = use_case.merge(&loaded.rows, loaded.labels)?;
    write_master(config, &outcome)?;
    Ok(outcome)
}

/// `dedupe` stage: master CSV in, deduplicated master CSV/JSON out.
pub fn run_dedupe(config: &Config) -> Result<MergeOutcome> {
    let path = &config.merge.master_csv;
    let records = master_csv::read_master_csv(path)
        .with_context(|| format!("failed to read master CSV {}", path.display()))?;
    let outcome = MergeUseCase::new(config.merge.similarity_threshold).dedupe(records);
    write_master(config, &outcome)?;
    Ok(outcome)
}
