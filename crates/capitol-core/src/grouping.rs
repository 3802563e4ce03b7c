//! Temporal session grouping over a batch of trades.
//!
//! The batch grouper sorts before splitting, unlike the incremental store
//! (see [`crate::session::assignment_for`]), which processes trades in arrival
//! order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::trade::{ByPolitician, Dated};

/// Parameters controlling where one session ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingParams {
  /// Largest gap, in whole calendar days, between consecutive trades of the
  /// same session. Inclusive.
  pub gap_days:       u32,
  /// Maximum number of trades per session; `0` means unlimited.
  pub max_group_size: usize,
}

impl Default for GroupingParams {
  fn default() -> Self { Self { gap_days: 7, max_group_size: 0 } }
}

/// Partition `items` into chronologically ordered sessions.
///
/// Items are stable-sorted ascending by date, so same-day items keep their
/// input order. A new session starts when the gap to the previous item exceeds
/// `gap_days`, or when the current session already holds `max_group_size`
/// items.
pub fn group_by_gap<T: Dated>(mut items: Vec<T>, params: &GroupingParams) -> Vec<Vec<T>> {
  items.sort_by_key(|t| t.date());

  let mut sessions: Vec<Vec<T>> = Vec::new();
  let mut current: Vec<T> = Vec::new();

  for item in items {
    if let Some(prev) = current.last() {
      let gap = (item.date() - prev.date()).num_days();
      let too_far = gap > i64::from(params.gap_days);
      let full = params.max_group_size > 0 && current.len() >= params.max_group_size;
      if too_far || full {
        sessions.push(std::mem::take(&mut current));
      }
    }
    current.push(item);
  }

  if !current.is_empty() {
    sessions.push(current);
  }
  sessions
}

/// The sessions computed for one politician.
#[derive(Debug, Clone)]
pub struct PoliticianSessions<T> {
  pub politician_name: String,
  pub sessions:        Vec<Vec<T>>,
}

/// Partition a mixed-politician stream by politician (in first-seen order),
/// then group each politician's items independently.
pub fn group_by_politician<T>(items: Vec<T>, params: &GroupingParams) -> Vec<PoliticianSessions<T>>
where
  T: Dated + ByPolitician,
{
  let mut order: Vec<(String, Vec<T>)> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for item in items {
    let name = item.politician().to_owned();
    let slot = *index.entry(name.clone()).or_insert_with(|| {
      order.push((name, Vec::new()));
      order.len() - 1
    });
    order[slot].1.push(item);
  }

  order
    .into_iter()
    .map(|(politician_name, items)| PoliticianSessions {
      politician_name,
      sessions: group_by_gap(items, params),
    })
    .collect()
}
