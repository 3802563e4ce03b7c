//! Operator-invoked repair of historical fabricated zero scores.
//!
//! Older runs wrote `0.0` when an analysis failed. Those rows are
//! indistinguishable from a genuine "no conflict" by score alone, so the
//! repair keys on failure wording in the reasoning. Never part of routine
//! scoring.

use capitol_core::store::AnalysisStore;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Error, Mode, Result};

const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
  /// Tags every audit row this run wrote.
  pub run_id:     Uuid,
  pub candidates: Vec<i64>,
  pub repaired:   usize,
}

/// Find fabricated zeros and, in [`Mode::Execute`], null them with an audit
/// row each.
pub async fn repair_fabricated_zeros<S: AnalysisStore>(store: &S, mode: Mode) -> Result<RepairReport> {
  let mut candidates = Vec::new();
  let mut offset = 0;
  loop {
    let page = store.list_analyses_page(offset, PAGE_SIZE).await.map_err(Error::store)?;
    offset += page.len();
    let short = page.len() < PAGE_SIZE;

    for record in page.iter().filter(|r| r.is_fabricated_zero()) {
      info!(
        analysis_id = record.analysis_id,
        target = ?record.target,
        reasoning = %record.reasoning,
        "fabricated zero"
      );
      candidates.push(record.analysis_id);
    }

    if short {
      break;
    }
  }

  let run_id = Uuid::new_v4();
  let repaired = match mode {
    Mode::DryRun => 0,
    Mode::Execute if candidates.is_empty() => 0,
    Mode::Execute => {
      let n = store
        .null_fabricated_scores(run_id, candidates.clone())
        .await
        .map_err(Error::store)?;
      warn!(%run_id, repaired = n, "nulled fabricated zero scores");
      n
    }
  };

  Ok(RepairReport { run_id, candidates, repaired })
}
