//! Analysis records — persisted conflict scores.
//!
//! A record is keyed by `(target, model_used, analysis_version)`. Re-scoring
//! with the same model and version updates the record in place; a new model
//! or version gets a new record and leaves older ones untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, trade::TradeId};

// ─── Score ───────────────────────────────────────────────────────────────────

/// A conflict-of-interest score in `[0.0, 1.0]`.
///
/// `0.0` is a real result ("no conflict"). A failed analysis is represented by
/// the absence of a score, never by zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConflictScore(f64);

impl ConflictScore {
  pub fn new(value: f64) -> Result<Self> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
      Ok(Self(value))
    } else {
      Err(Error::ScoreOutOfRange(value))
    }
  }

  pub fn value(self) -> f64 { self.0 }
}

impl TryFrom<f64> for ConflictScore {
  type Error = Error;

  fn try_from(value: f64) -> Result<Self> { Self::new(value) }
}

impl From<ConflictScore> for f64 {
  fn from(s: ConflictScore) -> f64 { s.0 }
}

// ─── Target ──────────────────────────────────────────────────────────────────

/// What an analysis record is about. Both variants are weak references: the
/// referenced row may disappear, and the record then becomes an orphan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AnalysisTarget {
  Trade(TradeId),
  Session(Uuid),
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
  pub analysis_id:      i64,
  pub target:           AnalysisTarget,
  /// `None` only after the operator repair pass has nulled a fabricated zero.
  pub conflict_score:   Option<ConflictScore>,
  pub confidence:       Option<f64>,
  pub reasoning:        String,
  pub model_used:       String,
  pub analysis_version: String,
  /// Set when upstream context changed after this record was written.
  pub needs_rescore:    bool,
  pub analyzed_at:      DateTime<Utc>,
}

/// Input to [`crate::store::AnalysisStore::upsert_analysis`]. Always carries a
/// score; failures are never persisted.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
  pub target:           AnalysisTarget,
  pub conflict_score:   ConflictScore,
  pub confidence:       Option<f64>,
  pub reasoning:        String,
  pub model_used:       String,
  pub analysis_version: String,
}

// ─── Reasoning markers ───────────────────────────────────────────────────────

/// Phrases in prior reasoning showing the model had no committee data to work
/// with. Matched case-insensitively.
pub const NO_COMMITTEE_MARKERS: &[&str] = &[
  "no committee data",
  "no committee assignments",
  "no committee information",
  "committee assignments are unknown",
  "committee information unavailable",
  "could not be matched to a known member",
];

/// Phrases showing a stored `0.0` was written in place of a failed analysis.
pub const FAILURE_MARKERS: &[&str] = &[
  "analysis failed",
  "failed to parse",
  "could not parse",
  "parse error",
  "error:",
  "timed out",
  "timeout",
  "unable to analyze",
  "could not analyze",
  "no response",
];

fn contains_any(text: &str, markers: &[&str]) -> bool {
  let lower = text.to_lowercase();
  markers.iter().any(|m| lower.contains(m))
}

/// Whether `reasoning` says committee data was missing at analysis time.
pub fn mentions_missing_committees(reasoning: &str) -> bool {
  contains_any(reasoning, NO_COMMITTEE_MARKERS)
}

impl AnalysisRecord {
  /// A stored `0.0` whose reasoning shows the analysis actually failed.
  pub fn is_fabricated_zero(&self) -> bool {
    self.conflict_score.is_some_and(|s| s.value() == 0.0)
      && contains_any(&self.reasoning, FAILURE_MARKERS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(score: Option<f64>, reasoning: &str) -> AnalysisRecord {
    AnalysisRecord {
      analysis_id:      1,
      target:           AnalysisTarget::Trade(1),
      conflict_score:   score.map(|s| ConflictScore::new(s).unwrap()),
      confidence:       None,
      reasoning:        reasoning.into(),
      model_used:       "m".into(),
      analysis_version: "v1".into(),
      needs_rescore:    false,
      analyzed_at:      Utc::now(),
    }
  }

  #[test]
  fn score_bounds_are_inclusive() {
    assert!(ConflictScore::new(0.0).is_ok());
    assert!(ConflictScore::new(1.0).is_ok());
    assert!(ConflictScore::new(1.01).is_err());
    assert!(ConflictScore::new(-0.1).is_err());
    assert!(ConflictScore::new(f64::NAN).is_err());
  }

  #[test]
  fn score_deserialisation_rejects_out_of_range() {
    assert!(serde_json::from_str::<ConflictScore>("0.4").is_ok());
    assert!(serde_json::from_str::<ConflictScore>("4").is_err());
  }

  #[test]
  fn genuine_zero_is_not_fabricated() {
    let r = record(Some(0.0), "Index fund purchase with no committee overlap.");
    assert!(!r.is_fabricated_zero());
  }

  #[test]
  fn zero_with_failure_note_is_fabricated() {
    let r = record(Some(0.0), "Analysis failed: model returned garbage");
    assert!(r.is_fabricated_zero());
  }

  #[test]
  fn nonzero_with_failure_note_is_left_alone() {
    let r = record(Some(0.3), "partial parse error but scored");
    assert!(!r.is_fabricated_zero());
  }

  #[test]
  fn missing_committee_marker_is_case_insensitive() {
    assert!(mentions_missing_committees("NO COMMITTEE DATA was available"));
    assert!(!mentions_missing_committees("Sits on Armed Services."));
  }
}
