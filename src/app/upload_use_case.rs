use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::app::ports::RecordSinkPort;
use crate::domain::LoungeRecord;
use crate::observability::metrics::{emit_counter, MetricName};

/// Batch outcome for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableUploadReport {
    pub rows: usize,
    pub rows_sent: usize,
    pub batches_ok: usize,
    pub batches_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub airports: TableUploadReport,
    pub lounges: TableUploadReport,
}

impl UploadReport {
    pub fn failed_batches(&self) -> usize {
        self.airports.batches_failed + self.lounges.batches_failed
    }
}

/// Row shape of the `lounges` table.
pub fn lounge_row(record: &LoungeRecord) -> Value {
    json!({
        "id": record.id,
        "name": record.name,
        "airport_code": record.airport_code,
        "airport_name": record.airport_name,
        "city": record.city,
        "country": record.country,
        "terminal": record.terminal,
        "location": record.location,
        "open_hours": record.open_hours,
        "amenities": record.amenities,
        "access_methods": record.access_methods,
        "lounge_type": record
            .lounge_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "independent".to_string()),
        "description": record.description,
        "conditions": record.conditions,
        "rating": record.rating,
        "review_count": record.review_count,
        "coordinates": record.position().map(|c| c.to_pair_string()),
        "images": record.images,
        "source": record.source,
        "data_sources": record.data_sources,
        "verified": record.verified,
        "is_active": true,
    })
}

/// One row per distinct airport code, in first-seen order.
pub fn airport_rows(records: &[LoungeRecord]) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in records {
        let Some(code) = record.airport_code.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let code = code.to_uppercase();
        if !seen.insert(code.clone()) {
            continue;
        }
        let total = records
            .iter()
            .filter(|r| r.airport_code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(&code)))
            .count();
        rows.push(json!({
            "airport_code": code,
            "airport_name": record.airport_name.clone().unwrap_or_else(|| format!("Airport {}", code)),
            "city": record.city.clone().unwrap_or_else(|| "Unknown".to_string()),
            "country": record.country.clone().unwrap_or_else(|| "Unknown".to_string()),
            "coordinates": record.position().map(|c| c.to_pair_string()),
            "total_lounges": total,
        }));
    }
    rows
}

/// Pushes airports, then lounges, to a record sink in fixed-size batches.
pub struct UploadUseCase {
    sink: Arc<dyn RecordSinkPort>,
    batch_size: usize,
}

impl UploadUseCase {
    pub fn new(sink: Arc<dyn RecordSinkPort>, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// A failed batch is logged and counted; the remaining batches still run.
    pub async fn upload_table(&self, table: &str, rows: &[Value]) -> TableUploadReport {
        let mut report = TableUploadReport {
            rows: rows.len(),
            ..Default::default()
        };
        for (n, batch) in rows.chunks(self.batch_size).enumerate() {
            let first = n * self.batch_size + 1;
            let last = first + batch.len() - 1;
            match self.sink.upsert_batch(table, batch).await {
                Ok(()) => {
                    info!("Upserted {} rows {}-{}", table, first, last);
                    report.batches_ok += 1;
                    report.rows_sent += batch.len();
                    emit_counter(MetricName::UploadBatchesSuccess, 1);
                    emit_counter(MetricName::UploadRowsSent, batch.len() as u64);
                }
                Err(e) => {
                    error!("Failed to upsert {} rows {}-{}: {}", table, first, last, e);
                    report.batches_failed += 1;
                    emit_counter(MetricName::UploadBatchesFailed, 1);
                }
            }
        }
        report
    }

    pub async fn run(&self, records: &[LoungeRecord], airports_table: &str, lounges_table: &str) -> UploadReport {
        let airports = airport_rows(records);
        info!("Uploading {} airports to {}", airports.len(), airports_table);
        let airports = self.upload_table(airports_table, &airports).await;

        let lounges: Vec<Value> = records.iter().map(lounge_row).collect();
        info!("Uploading {} lounges to {}", lounges.len(), lounges_table);
        let lounges = self.upload_table(lounges_table, &lounges).await;

        UploadReport { airports, lounges }
    }
}
