// Data processing pipeline: ingestion helpers and record processing

pub mod ingestion;
pub mod processing;
