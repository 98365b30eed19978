use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::LoungeRecord;
use crate::observability::metrics;
use crate::pipeline::processing::merge::merge_records;
use crate::pipeline::processing::normalize::NormalizedRecord;
use crate::pipeline::processing::similarity::{DistinctReason, MatchDecision, SimilarityScorer};

/// Counters produced by one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Rows offered, including dropped ones
    pub input: usize,
    /// Rows without a name, or not shaped like a record
    pub dropped: usize,
    pub duplicates_merged: usize,
    /// Records that shared a key with an existing record but were kept apart
    pub distinct_collisions: usize,
    pub unique: usize,
}

/// The decision made for one incoming record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionDecision {
    /// First record seen for this key
    NewEntity { key: String },
    /// Folded into the canonical record stored under `key`
    Merged { key: String, score: f64 },
    /// Collided with an existing key and was stored under a suffixed one
    Distinct {
        key: String,
        score: f64,
        reason: DistinctReason,
    },
}

/// Final canonical records in first-seen order.
#[derive(Debug, Clone)]
pub struct ConflationOutput {
    pub records: Vec<LoungeRecord>,
    pub stats: MergeStats,
}

/// Trait for resolving incoming records against the canonical set
pub trait Conflator {
    /// Resolve one normalized record, merging it or storing it as new
    fn conflate(&mut self, record: NormalizedRecord) -> ResolutionDecision;

    /// Count a row that normalization dropped
    fn record_dropped(&mut self);

    /// Counters so far
    fn stats(&self) -> MergeStats;
}

struct Slot {
    key: String,
    record: LoungeRecord,
}

/// Single-pass, insertion-ordered deduplicator.
///
/// Candidates for a merge are, in order: the slot stored under the record's
/// key, its suffixed siblings (`key_1`, `key_2`, ...), then records at the same
/// airport whose names contain one another and whose terminals do not
/// disagree.
pub struct DefaultConflator {
    scorer: SimilarityScorer,
    slots: Vec<Slot>,
    key_index: HashMap<String, usize>,
    airport_index: HashMap<String, Vec<usize>>,
    used_ids: HashSet<String>,
    stats: MergeStats,
}

impl Default for DefaultConflator {
    fn default() -> Self {
        Self::new(SimilarityScorer::default())
    }
}

impl DefaultConflator {
    pub fn new(scorer: SimilarityScorer) -> Self {
        Self {
            scorer,
            slots: Vec::new(),
            key_index: HashMap::new(),
            airport_index: HashMap::new(),
            used_ids: HashSet::new(),
            stats: MergeStats::default(),
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(SimilarityScorer::new(threshold))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots stored under `key` and its numeric suffixes, in suffix order.
    fn key_family(&self, key: &str) -> Vec<usize> {
        let mut family = Vec::new();
        if let Some(&idx) = self.key_index.get(key) {
            family.push(idx);
            let mut n = 1;
            while let Some(&idx) = self.key_index.get(&format!("{}_{}", key, n)) {
                family.push(idx);
                n += 1;
            }
        }
        family
    }

    fn free_suffixed_key(&self, key: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", key, n);
            if !self.key_index.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn airport_key(record: &LoungeRecord) -> Option<String> {
        record
            .airport_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
    }

    /// Same-airport records that look like a differently keyed name for the
    /// same lounge.
    fn cross_key_candidates(&self, record: &LoungeRecord, exclude: &[usize]) -> Vec<usize> {
        let Some(airport) = Self::airport_key(record) else {
            return Vec::new();
        };
        let name = record.name.trim().to_lowercase();
        if name.is_empty() {
            return Vec::new();
        }

        self.airport_index
            .get(&airport)
            .into_iter()
            .flatten()
            .copied()
            .filter(|idx| !exclude.contains(idx))
            .filter(|&idx| {
                let other = &self.slots[idx].record;
                let other_name = other.name.trim().to_lowercase();
                let names_overlap = !other_name.is_empty()
                    && (other_name.contains(&name) || name.contains(&other_name));
                let terminals_agree = match (record.terminal.as_deref(), other.terminal.as_deref()) {
                    (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
                    _ => true,
                };
                names_overlap && terminals_agree
            })
            .collect()
    }

    fn first_merge(&self, candidates: &[usize], record: &LoungeRecord) -> Option<(usize, f64)> {
        candidates.iter().find_map(|&idx| {
            match self.scorer.decide(&self.slots[idx].record, record) {
                MatchDecision::Merge { score } => Some((idx, score)),
                MatchDecision::Distinct { .. } => None,
            }
        })
    }

    fn unique_id(&mut self, id: &str) -> String {
        if self.used_ids.insert(id.to_string()) {
            return id.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", id, n);
            if self.used_ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn insert(&mut self, key: String, mut record: LoungeRecord) {
        record.id = self.unique_id(&record.id);
        let idx = self.slots.len();
        if let Some(airport) = Self::airport_key(&record) {
            self.airport_index.entry(airport).or_default().push(idx);
        }
        self.key_index.insert(key.clone(), idx);
        self.slots.push(Slot { key, record });
    }

    fn merge_into(&mut self, idx: usize, incoming: &LoungeRecord, score: f64) -> ResolutionDecision {
        let slot = &mut self.slots[idx];
        slot.record = merge_records(&slot.record, incoming);
        self.stats.duplicates_merged += 1;
        metrics::conflation::duplicate_merged(score);
        debug!(
            "Merged '{}' into '{}' under key {} (score {:.2})",
            incoming.name, slot.record.name, slot.key, score
        );
        ResolutionDecision::Merged {
            key: slot.key.clone(),
            score,
        }
    }

    /// Consume the conflator, yielding canonical records in first-seen order
    pub fn finish(mut self) -> ConflationOutput {
        self.stats.unique = self.slots.len();
        metrics::conflation::unique_records(self.stats.unique);
        ConflationOutput {
            records: self.slots.into_iter().map(|slot| slot.record).collect(),
            stats: self.stats,
        }
    }
}

impl Conflator for DefaultConflator {
    fn conflate(&mut self, normalized: NormalizedRecord) -> ResolutionDecision {
        let NormalizedRecord { record, key } = normalized;
        self.stats.input += 1;
        metrics::conflation::record_processed();

        let family = self.key_family(&key);
        if let Some((idx, score)) = self.first_merge(&family, &record) {
            return self.merge_into(idx, &record, score);
        }

        let cross = self.cross_key_candidates(&record, &family);
        if let Some((idx, score)) = self.first_merge(&cross, &record) {
            return self.merge_into(idx, &record, score);
        }

        match family.first() {
            Some(&idx) => {
                let (score, reason) = match self.scorer.decide(&self.slots[idx].record, &record) {
                    MatchDecision::Distinct { score, reason } => (score, reason),
                    MatchDecision::Merge { score } => (score, DistinctReason::BelowThreshold),
                };
                let suffixed = self.free_suffixed_key(&key);
                debug!(
                    "Kept '{}' distinct from key {} ({:?}, score {:.2}); stored as {}",
                    record.name, key, reason, score, suffixed
                );
                self.stats.distinct_collisions += 1;
                metrics::conflation::distinct_collision(score);
                self.insert(suffixed.clone(), record);
                ResolutionDecision::Distinct {
                    key: suffixed,
                    score,
                    reason,
                }
            }
            None => {
                metrics::conflation::new_entity();
                self.insert(key.clone(), record);
                ResolutionDecision::NewEntity { key }
            }
        }
    }

    fn record_dropped(&mut self) {
        self.stats.input += 1;
        self.stats.dropped += 1;
    }

    fn stats(&self) -> MergeStats {
        MergeStats {
            unique: self.slots.len(),
            ..self.stats.clone()
        }
    }
}

/// Deduplicate a batch of normalized records in one pass.
pub fn deduplicate(
    records: impl IntoIterator<Item = NormalizedRecord>,
    threshold: f64,
) -> ConflationOutput {
    let mut conflator = DefaultConflator::with_threshold(threshold);
    for record in records {
        conflator.conflate(record);
    }
    conflator.finish()
}
