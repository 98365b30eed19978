use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{SourceConfig, SourceFormat};
use crate::error::{LoungeError, Result};
use crate::observability::metrics::{emit_counter, MetricName};
use crate::pipeline::processing::normalize::RawRecord;

/// Read every row of a configured source into raw records.
pub fn read_source(source: &SourceConfig) -> Result<Vec<RawRecord>> {
    let rows = match source.resolved_format() {
        SourceFormat::Csv => read_csv_rows(&source.path, &source.id)?,
        SourceFormat::Json => read_json_rows(&source.path, &source.id)?,
    };
    Ok(rows
        .into_iter()
        .map(|row| row.with_label(source.label.clone()))
        .collect())
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoungeError::MissingInput(path.to_path_buf()))
    }
}

/// Header-keyed CSV rows as JSON objects of strings. Malformed lines are
/// skipped with a warning.
pub fn read_csv_rows(path: &Path, source_id: &str) -> Result<Vec<RawRecord>> {
    ensure_exists(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.replace('\u{feff}', "").trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row_number = idx + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed CSV row {} in {}: {}", row_number, path.display(), e);
                emit_counter(MetricName::IngestRowsSkipped, 1);
                continue;
            }
        };

        let mut fields = Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if !header.is_empty() {
                fields.insert(header.clone(), Value::String(value.to_string()));
            }
        }
        rows.push(RawRecord::new(source_id, row_number, Value::Object(fields)));
    }

    emit_counter(MetricName::IngestRowsRead, rows.len() as u64);
    debug!("Read {} CSV rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// JSON sources are either a bare array of objects or `{"lounges": [...]}`.
pub fn read_json_rows(path: &Path, source_id: &str) -> Result<Vec<RawRecord>> {
    ensure_exists(path)?;
    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(content.trim_start_matches('\u{feff}'))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("lounges") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LoungeError::Normalize {
                    source_id: source_id.to_string(),
                    row: 0,
                    message: format!("{} has no 'lounges' array", path.display()),
                })
            }
        },
        _ => {
            return Err(LoungeError::Normalize {
                source_id: source_id.to_string(),
                row: 0,
                message: format!("{} is not an array or object", path.display()),
            })
        }
    };

    let rows: Vec<RawRecord> = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| RawRecord::new(source_id, idx + 1, item))
        .collect();

    emit_counter(MetricName::IngestRowsRead, rows.len() as u64);
    debug!("Read {} JSON rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_csv_rows_strip_bom_from_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pp.csv");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "\u{feff}Lounge Name,Airport (IATA)\nSky,IST\nOther,SAW,extra\n").unwrap();

        let rows = read_csv_rows(&path, "priority_pass").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record["Lounge Name"], "Sky");
        assert_eq!(rows[1].row_number, 2);
    }

    #[test]
    fn test_json_accepts_wrapped_and_bare_arrays() {
        let dir = TempDir::new().unwrap();
        let wrapped = dir.path().join("osm.json");
        fs::write(&wrapped, r#"{"metadata": {}, "lounges": [{"name": "A"}, {"name": "B"}]}"#).unwrap();
        let bare = dir.path().join("bare.json");
        fs::write(&bare, r#"[{"name": "C"}]"#).unwrap();

        assert_eq!(read_json_rows(&wrapped, "canonical").unwrap().len(), 2);
        assert_eq!(read_json_rows(&bare, "canonical").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_csv_rows(&dir.path().join("nope.csv"), "amex").unwrap_err();
        assert!(matches!(err, LoungeError::MissingInput(_)));
    }

    #[test]
    fn test_label_is_attached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wd.json");
        fs::write(&path, r#"[{"name": "A"}]"#).unwrap();
        let source = SourceConfig {
            id: "canonical".into(),
            path,
            format: None,
            label: Some("Wikidata".into()),
            required: true,
        };
        let rows = read_source(&source).unwrap();
        assert_eq!(rows[0].source_label.as_deref(), Some("Wikidata"));
    }
}
