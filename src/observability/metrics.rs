//! Metric catalog and recording helpers for the lounge pipeline.
//!
//! Recording goes through the `metrics` facade. Nothing is exported unless a
//! recorder is installed by the embedding process, so these calls are cheap
//! no-ops in plain CLI runs.

use std::fmt;

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion metrics
    IngestRowsRead,
    IngestRowsSkipped,
    IngestSourcesMissing,

    // Extraction metrics
    ExtractRequests,
    ExtractRequestsFailed,
    ExtractLoungesFound,

    // Normalize metrics
    NormalizeRecordsProduced,
    NormalizeRecordsDropped,

    // Conflation metrics
    ConflationRecordsProcessed,
    ConflationNewEntities,
    ConflationDuplicatesMerged,
    ConflationDistinctCollisions,
    ConflationSimilarityScore,
    ConflationUniqueRecords,

    // Enrichment metrics
    EnrichAirportHits,
    EnrichAirportMisses,

    // Image metrics
    ImagesSearchRequests,
    ImagesSearchFailures,
    ImagesGenericApplied,

    // Upload metrics
    UploadBatchesSuccess,
    UploadBatchesFailed,
    UploadRowsSent,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestRowsRead => "lounge_ingest_rows_read_total",
            MetricName::IngestRowsSkipped => "lounge_ingest_rows_skipped_total",
            MetricName::IngestSourcesMissing => "lounge_ingest_sources_missing_total",

            MetricName::ExtractRequests => "lounge_extract_requests_total",
            MetricName::ExtractRequestsFailed => "lounge_extract_requests_failed_total",
            MetricName::ExtractLoungesFound => "lounge_extract_lounges_found_total",

            MetricName::NormalizeRecordsProduced => "lounge_normalize_records_produced_total",
            MetricName::NormalizeRecordsDropped => "lounge_normalize_records_dropped_total",

            MetricName::ConflationRecordsProcessed => "lounge_conflation_records_processed_total",
            MetricName::ConflationNewEntities => "lounge_conflation_new_entities_total",
            MetricName::ConflationDuplicatesMerged => "lounge_conflation_duplicates_merged_total",
            MetricName::ConflationDistinctCollisions => {
                "lounge_conflation_distinct_collisions_total"
            }
            MetricName::ConflationSimilarityScore => "lounge_conflation_similarity_score",
            MetricName::ConflationUniqueRecords => "lounge_conflation_unique_records",

            MetricName::EnrichAirportHits => "lounge_enrich_airport_hits_total",
            MetricName::EnrichAirportMisses => "lounge_enrich_airport_misses_total",

            MetricName::ImagesSearchRequests => "lounge_images_search_requests_total",
            MetricName::ImagesSearchFailures => "lounge_images_search_failures_total",
            MetricName::ImagesGenericApplied => "lounge_images_generic_applied_total",

            MetricName::UploadBatchesSuccess => "lounge_upload_batches_success_total",
            MetricName::UploadBatchesFailed => "lounge_upload_batches_failed_total",
            MetricName::UploadRowsSent => "lounge_upload_rows_sent_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn emit_counter(name: MetricName, value: u64) {
    ::metrics::counter!(name.as_str()).increment(value);
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

pub fn emit_histogram(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}

pub mod extract {
    use super::*;

    pub fn request_success(lounges: usize) {
        emit_counter(MetricName::ExtractRequests, 1);
        emit_counter(MetricName::ExtractLoungesFound, lounges as u64);
    }

    pub fn request_error() {
        emit_counter(MetricName::ExtractRequests, 1);
        emit_counter(MetricName::ExtractRequestsFailed, 1);
    }
}

pub mod conflation {
    use super::*;

    pub fn record_processed() {
        emit_counter(MetricName::ConflationRecordsProcessed, 1);
    }

    pub fn new_entity() {
        emit_counter(MetricName::ConflationNewEntities, 1);
    }

    pub fn duplicate_merged(score: f64) {
        emit_counter(MetricName::ConflationDuplicatesMerged, 1);
        emit_histogram(MetricName::ConflationSimilarityScore, score);
    }

    pub fn distinct_collision(score: f64) {
        emit_counter(MetricName::ConflationDistinctCollisions, 1);
        emit_histogram(MetricName::ConflationSimilarityScore, score);
    }

    pub fn unique_records(count: usize) {
        emit_gauge(MetricName::ConflationUniqueRecords, count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            MetricName::IngestRowsRead,
            MetricName::ConflationDuplicatesMerged,
            MetricName::UploadRowsSent,
        ] {
            assert!(name.as_str().starts_with("lounge_"));
            assert_eq!(name.to_string(), name.as_str());
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        emit_counter(MetricName::IngestRowsRead, 3);
        emit_gauge(MetricName::ConflationUniqueRecords, 2.0);
        conflation::duplicate_merged(0.9);
    }
}
