//! Re-queueing analyses that ran without committee data.
//!
//! When the directory is corrected after a politician was analysed as
//! unresolved or assignment-less, their old verdicts were reached blind. Those
//! verdicts are found by scanning reasoning text for the markers the prompt
//! asks the model to echo. Only the latest record per target counts: a blind
//! verdict already superseded by a newer model or version is history, not a
//! reason to score again.

use std::collections::{BTreeSet, HashMap, hash_map::Entry};

use capitol_core::{
  analysis::{AnalysisRecord, AnalysisTarget, mentions_missing_committees},
  store::{AnalysisStore, DirectoryStore, SessionStore, TradeStore},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Result};

const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequeueReport {
  /// Targets whose latest, not yet flagged record mentions missing committee
  /// data.
  pub blind_records:         usize,
  /// Politicians behind those records who now have assignments.
  pub politicians_corrected: Vec<String>,
  pub sessions_requeued:     usize,
  pub trade_records_flagged: usize,
}

fn supersedes(candidate: &AnalysisRecord, current: &AnalysisRecord) -> bool {
  (candidate.analyzed_at, candidate.analysis_id) > (current.analyzed_at, current.analysis_id)
}

/// The latest record of every target that is still blind and not already
/// waiting for a re-score, ascending by id.
async fn still_blind<S: AnalysisStore>(store: &S) -> Result<Vec<AnalysisRecord>> {
  let mut latest: HashMap<AnalysisTarget, AnalysisRecord> = HashMap::new();
  let mut offset = 0;
  loop {
    let page = store.list_analyses_page(offset, PAGE_SIZE).await.map_err(Error::store)?;
    offset += page.len();
    let short = page.len() < PAGE_SIZE;

    for record in page {
      match latest.entry(record.target) {
        Entry::Occupied(mut e) => {
          if supersedes(&record, e.get()) {
            e.insert(record);
          }
        }
        Entry::Vacant(e) => {
          e.insert(record);
        }
      }
    }

    if short {
      break;
    }
  }

  let mut blind: Vec<AnalysisRecord> = latest
    .into_values()
    .filter(|r| !r.needs_rescore && mentions_missing_committees(&r.reasoning))
    .collect();
  blind.sort_by_key(|r| r.analysis_id);
  Ok(blind)
}

/// Flag the blind records of every politician who now has assignments on
/// file, re-opening the sessions among them. With `dry_run` nothing is written
/// and the write counts stay zero.
pub async fn requeue_committee_corrections<S>(store: &S, dry_run: bool) -> Result<RequeueReport>
where
  S: TradeStore + SessionStore + AnalysisStore + DirectoryStore,
{
  let blind = still_blind(store).await?;
  let mut report = RequeueReport { blind_records: blind.len(), ..Default::default() };

  let mut corrected: HashMap<String, bool> = HashMap::new();
  let mut names = BTreeSet::new();
  let mut to_flag = Vec::new();
  let (mut sessions, mut trades) = (0, 0);

  for record in &blind {
    let politician = match record.target {
      AnalysisTarget::Trade(id) => {
        store.get_trade(id).await.map_err(Error::store)?.map(|t| t.data.politician_name)
      }
      AnalysisTarget::Session(id) => {
        store.get_session(id).await.map_err(Error::store)?.map(|s| s.politician_name)
      }
    };
    let Some(name) = politician else {
      debug!(analysis_id = record.analysis_id, "blind record has no live target");
      continue;
    };

    let has_seats = match corrected.get(&name) {
      Some(known) => *known,
      None => {
        let seats = has_assignments(store, &name).await?;
        corrected.insert(name.clone(), seats);
        seats
      }
    };
    if !has_seats {
      continue;
    }

    to_flag.push(record.analysis_id);
    match record.target {
      AnalysisTarget::Trade(_) => trades += 1,
      AnalysisTarget::Session(_) => sessions += 1,
    }
    names.insert(name);
  }

  for name in &names {
    info!(politician = %name, dry_run, "committee data corrected; re-queueing");
  }
  if !dry_run && !to_flag.is_empty() {
    store.flag_for_rescore(to_flag).await.map_err(Error::store)?;
    report.sessions_requeued = sessions;
    report.trade_records_flagged = trades;
  }
  report.politicians_corrected = names.into_iter().collect();

  Ok(report)
}

async fn has_assignments<S: DirectoryStore>(store: &S, name: &str) -> Result<bool> {
  let Some(politician) = store.resolve_politician(name.to_owned()).await.map_err(Error::store)? else {
    return Ok(false);
  };
  let assignments = store
    .committee_assignments(politician.politician_id)
    .await
    .map_err(Error::store)?;
  Ok(!assignments.is_empty())
}
