//! Sessions — contiguous runs of one politician's trades.
//!
//! Sessions are derived entirely from trades. They are created or extended as
//! trades arrive, never split. Any change to a session re-opens it for
//! analysis.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::ConflictScore;

/// The outcome of the last successful analysis of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
  pub score:       ConflictScore,
  pub confidence:  Option<f64>,
  pub summary:     String,
  pub model:       String,
  pub analyzed_at: DateTime<Utc>,
}

/// A persisted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id:       Uuid,
  pub politician_name:  String,
  pub start_date:       NaiveDate,
  pub end_date:         NaiveDate,
  pub trade_count:      u32,
  pub needs_reanalysis: bool,
  pub analysis:         Option<SessionAnalysis>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// What the incremental store should do with an arriving trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
  /// Extend the given session to cover the trade.
  Extend(Uuid),
  /// Open a new session starting at the trade.
  Create,
}

/// Decide how a trade dated `trade_date` relates to the politician's most
/// recent session, given as `(session_id, end_date)`.
///
/// Only a gap in `0..=gap_days` extends. A trade dated before the latest
/// session's end (a backdated arrival) opens a new session; arrivals are not
/// re-sorted.
pub fn assignment_for(
  latest: Option<(Uuid, NaiveDate)>,
  trade_date: NaiveDate,
  gap_days: u32,
) -> Assignment {
  match latest {
    Some((session_id, end_date)) => {
      let gap = (trade_date - end_date).num_days();
      if (0..=i64::from(gap_days)).contains(&gap) {
        Assignment::Extend(session_id)
      } else {
        Assignment::Create
      }
    }
    None => Assignment::Create,
  }
}
