//! Session assignment for newly arrived trades.

use std::collections::HashSet;

use capitol_core::store::{SessionStore, TradeStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignReport {
  pub assigned:         usize,
  /// Distinct sessions created or extended by this run.
  pub sessions_touched: usize,
  pub failed:           usize,
}

/// Assign up to `limit` unassigned trades to sessions, in arrival order.
///
/// Arrivals are not re-sorted by date: a trade dated before its politician's
/// latest session opens a session of its own. A failed assignment leaves the
/// trade unassigned for the next run.
pub async fn assign_pending_sessions<S>(store: &S, gap_days: u32, limit: usize) -> Result<AssignReport>
where
  S: TradeStore + SessionStore,
{
  let trades = store.trades_without_session(limit).await.map_err(Error::store)?;
  let mut report = AssignReport::default();
  let mut touched = HashSet::new();

  for trade in trades {
    let politician = trade.data.politician_name.clone();
    match store
      .assign_trade(trade.id, politician.clone(), trade.data.transaction_date, gap_days)
      .await
    {
      Ok(session_id) => {
        report.assigned += 1;
        touched.insert(session_id);
      }
      Err(e) => {
        report.failed += 1;
        warn!(
          trade_id = trade.id,
          %politician,
          ticker = %trade.data.ticker,
          error = %e,
          "session assignment failed"
        );
      }
    }
  }

  report.sessions_touched = touched.len();
  info!(
    assigned = report.assigned,
    sessions = report.sessions_touched,
    failed = report.failed,
    "session assignment finished"
  );
  Ok(report)
}
