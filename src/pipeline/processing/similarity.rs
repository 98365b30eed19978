use serde::{Deserialize, Serialize};

use crate::constants::{COORDINATE_TOLERANCE_DEG, DEFAULT_MERGE_THRESHOLD};
use crate::domain::LoungeRecord;
use crate::pipeline::processing::normalize::Designation;

const NAME_WEIGHT: f64 = 1.0;
const AIRPORT_WEIGHT: f64 = 2.0;
const TERMINAL_WEIGHT: f64 = 0.5;
const PROXIMITY_WEIGHT: f64 = 0.5;

/// Per-signal contributions behind a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    /// 1.0 exact, 0.5 containment, 0.0 otherwise
    pub name: f64,
    pub airport: bool,
    /// `None` when either side has no terminal
    pub terminal: Option<bool>,
    /// `None` when either side has no lounge-level coordinates
    pub proximity: Option<bool>,
    pub score: f64,
}

/// Why two records sharing a candidate slot were kept apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DistinctReason {
    AirportMismatch,
    DesignationConflict,
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchDecision {
    Merge { score: f64 },
    Distinct { score: f64, reason: DistinctReason },
}

impl MatchDecision {
    pub fn is_merge(&self) -> bool {
        matches!(self, MatchDecision::Merge { .. })
    }

    pub fn score(&self) -> f64 {
        match self {
            MatchDecision::Merge { score } | MatchDecision::Distinct { score, .. } => *score,
        }
    }
}

/// Weighted similarity between two lounge records.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    threshold: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_THRESHOLD)
    }
}

impl SimilarityScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score in [0, 1], normalized by the weights of the signals that apply
    /// to this pair.
    pub fn score(&self, a: &LoungeRecord, b: &LoungeRecord) -> SimilarityBreakdown {
        let mut earned = 0.0;
        let mut total = 0.0;

        let name = name_similarity(&a.name, &b.name);
        earned += name * NAME_WEIGHT;
        total += NAME_WEIGHT;

        let airport = same_airport(a, b);
        if airport {
            earned += AIRPORT_WEIGHT;
        }
        total += AIRPORT_WEIGHT;

        let terminal = match (non_empty(&a.terminal), non_empty(&b.terminal)) {
            (Some(ta), Some(tb)) => {
                let matched = ta.eq_ignore_ascii_case(tb);
                if matched {
                    earned += TERMINAL_WEIGHT;
                }
                total += TERMINAL_WEIGHT;
                Some(matched)
            }
            _ => None,
        };

        let proximity = match (&a.coordinates, &b.coordinates) {
            (Some(ca), Some(cb)) => {
                let near = ca.is_near(cb, COORDINATE_TOLERANCE_DEG);
                if near {
                    earned += PROXIMITY_WEIGHT;
                }
                total += PROXIMITY_WEIGHT;
                Some(near)
            }
            _ => None,
        };

        SimilarityBreakdown {
            name,
            airport,
            terminal,
            proximity,
            score: if total > 0.0 { earned / total } else { 0.0 },
        }
    }

    /// Merge only above the threshold, at the same airport, and when the
    /// domestic/international designations agree.
    pub fn decide(&self, existing: &LoungeRecord, incoming: &LoungeRecord) -> MatchDecision {
        let breakdown = self.score(existing, incoming);
        let score = breakdown.score;

        if !breakdown.airport {
            return MatchDecision::Distinct {
                score,
                reason: DistinctReason::AirportMismatch,
            };
        }
        if Designation::of(existing).conflicts_with(Designation::of(incoming)) {
            return MatchDecision::Distinct {
                score,
                reason: DistinctReason::DesignationConflict,
            };
        }
        if score > self.threshold {
            MatchDecision::Merge { score }
        } else {
            MatchDecision::Distinct {
                score,
                reason: DistinctReason::BelowThreshold,
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Airport codes equal ignoring case. Two records without a code only
/// count as the same airport when their airport names agree.
fn same_airport(a: &LoungeRecord, b: &LoungeRecord) -> bool {
    match (non_empty(&a.airport_code), non_empty(&b.airport_code)) {
        (Some(ca), Some(cb)) => ca.eq_ignore_ascii_case(cb),
        (None, None) => match (non_empty(&a.airport_name), non_empty(&b.airport_name)) {
            (Some(na), Some(nb)) => na.to_lowercase() == nb.to_lowercase(),
            _ => false,
        },
        _ => false,
    }
}

fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        1.0
    } else if a.contains(&b) || b.contains(&a) {
        0.5
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;

    fn lounge(name: &str, code: &str) -> LoungeRecord {
        let mut record = LoungeRecord::new("id", name, "test");
        record.airport_code = Some(code.to_string());
        record
    }

    #[test]
    fn test_exact_match_scores_one() {
        let scorer = SimilarityScorer::default();
        let a = lounge("Sky Lounge", "IST");
        let b = lounge("sky lounge", "ist");
        assert_eq!(scorer.score(&a, &b).score, 1.0);
    }

    #[test]
    fn test_substring_name_at_same_airport_merges() {
        let scorer = SimilarityScorer::default();
        let a = lounge("SkyClub", "ATL");
        let b = lounge("Delta SkyClub", "ATL");
        let breakdown = scorer.score(&a, &b);
        assert_eq!(breakdown.name, 0.5);
        assert!((breakdown.score - 2.5 / 3.0).abs() < 1e-9);
        assert!(scorer.decide(&a, &b).is_merge());
    }

    #[test]
    fn test_different_airports_never_merge() {
        let scorer = SimilarityScorer::new(0.0);
        let mut a = lounge("Plaza Premium Lounge", "LHR");
        let mut b = lounge("Plaza Premium Lounge", "LGW");
        a.terminal = Some("T1".into());
        b.terminal = Some("T1".into());
        a.coordinates = Coordinates::new(51.47, -0.45);
        b.coordinates = a.coordinates;

        let decision = scorer.decide(&a, &b);
        assert_eq!(
            decision,
            MatchDecision::Distinct {
                score: decision.score(),
                reason: DistinctReason::AirportMismatch
            }
        );
        assert!(decision.score() < 0.7);
    }

    #[test]
    fn test_terminal_and_proximity_only_count_when_both_present() {
        let scorer = SimilarityScorer::default();
        let mut a = lounge("Sky", "IST");
        let b = lounge("Sky", "IST");
        a.terminal = Some("T1".into());
        let breakdown = scorer.score(&a, &b);
        assert_eq!(breakdown.terminal, None);
        assert_eq!(breakdown.proximity, None);
        assert_eq!(breakdown.score, 1.0);
    }

    #[test]
    fn test_distant_coordinates_lower_score() {
        let scorer = SimilarityScorer::default();
        let mut a = lounge("Sky", "IST");
        let mut b = lounge("Sky", "IST");
        a.coordinates = Coordinates::new(41.27, 28.75);
        b.coordinates = Coordinates::new(41.30, 28.75);
        let breakdown = scorer.score(&a, &b);
        assert_eq!(breakdown.proximity, Some(false));
        assert!((breakdown.score - 3.0 / 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_airport_reference_point_is_not_proximity() {
        let scorer = SimilarityScorer::default();
        let mut a = lounge("Emirates First Class Lounge", "DXB");
        let mut b = lounge("Emirates Business Class Lounge", "DXB");
        a.airport_coordinates = Coordinates::new(25.2528, 55.3644);
        b.airport_coordinates = a.airport_coordinates;

        let breakdown = scorer.score(&a, &b);
        assert_eq!(breakdown.proximity, None);
        assert!((breakdown.score - 2.0 / 3.0).abs() < 1e-9);
        assert!(!scorer.decide(&a, &b).is_merge());
    }

    #[test]
    fn test_designation_conflict_blocks_merge() {
        let scorer = SimilarityScorer::new(0.0);
        let mut a = lounge("Priority Pass Lounge", "IST");
        let mut b = lounge("Priority Pass Lounge", "IST");
        a.terminal = Some("International".into());
        b.terminal = Some("Domestic".into());
        assert!(matches!(
            scorer.decide(&a, &b),
            MatchDecision::Distinct {
                reason: DistinctReason::DesignationConflict,
                ..
            }
        ));
    }

    #[test]
    fn test_score_equal_to_threshold_does_not_merge() {
        let scorer = SimilarityScorer::new(2.0 / 3.0);
        let a = lounge("Alpha", "IST");
        let b = lounge("Beta", "IST");
        assert!(!scorer.decide(&a, &b).is_merge());
    }
}
