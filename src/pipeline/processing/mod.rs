// Pipeline processing: normalization, deduplication, and enrichment

pub mod normalize;
pub mod similarity;
pub mod merge;
pub mod conflation;
pub mod enrich;
pub mod stats;

pub use conflation::{deduplicate, ConflationOutput, Conflator, DefaultConflator, MergeStats};
pub use merge::merge_records;
pub use similarity::SimilarityScorer;
pub use stats::DatasetStats;
