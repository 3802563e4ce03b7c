//! Planning for staging → production promotion.
//!
//! Everything here is pure: given the pending staging rows, the current
//! production trades and the analysis rows that reference them, compute what a
//! promotion would do. The store applies a plan; the pipeline decides whether
//! it may.
//!
//! Two strategies exist:
//!
//! - **merge** patches production in place. A staging row whose business key
//!   already exists updates that trade's non-key fields and keeps its id, so
//!   analysis references stay valid.
//! - **replace** truncates production and reloads it from staging, using each
//!   staging id as the new production id. Analysis references are rewritten
//!   through an old-id → new-id map; production rows with no staging match
//!   leave their analysis rows orphaned.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  fmt,
};

use serde::Serialize;
use uuid::Uuid;

use crate::trade::{BusinessKey, StagedTrade, Trade, TradeData, TradeId};

/// An analysis row's reference to a production trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRef {
  pub analysis_id: i64,
  pub trade_id:    TradeId,
}

// ─── Dedupe ──────────────────────────────────────────────────────────────────

/// Staging rows split into one keeper per business key and the discards.
#[derive(Debug, Clone, Default)]
pub struct Dedupe {
  /// Lowest `staging_id` per business key, ascending by `staging_id`.
  pub kept:       Vec<StagedTrade>,
  pub duplicates: Vec<StagedTrade>,
}

pub fn dedupe_staging(mut staged: Vec<StagedTrade>) -> Dedupe {
  staged.sort_by_key(|s| s.staging_id);
  let mut seen: HashSet<BusinessKey> = HashSet::new();
  let mut out = Dedupe::default();
  for row in staged {
    if seen.insert(row.data.business_key()) {
      out.kept.push(row);
    } else {
      out.duplicates.push(row);
    }
  }
  out
}

// ─── Production index ────────────────────────────────────────────────────────

/// Production trades by business key. If production already violates the
/// uniqueness invariant, the lowest id wins and the rest are counted.
struct ProductionIndex<'a> {
  by_key:     HashMap<BusinessKey, &'a Trade>,
  duplicates: usize,
}

impl<'a> ProductionIndex<'a> {
  fn new(production: &'a [Trade]) -> Self {
    let mut by_key: HashMap<BusinessKey, &'a Trade> = HashMap::new();
    let mut duplicates = 0;
    for trade in production {
      match by_key.get(&trade.business_key()) {
        Some(existing) if existing.id <= trade.id => duplicates += 1,
        Some(_) => {
          duplicates += 1;
          by_key.insert(trade.business_key(), trade);
        }
        None => {
          by_key.insert(trade.business_key(), trade);
        }
      }
    }
    Self { by_key, duplicates }
  }

  fn get(&self, key: &BusinessKey) -> Option<&'a Trade> { self.by_key.get(key).copied() }
}

/// Whether two records agree on every field outside the business key.
fn same_details(a: &TradeData, b: &TradeData) -> bool {
  a.chamber == b.chamber
    && a.party == b.party
    && a.state == b.state
    && a.disclosure_date == b.disclosure_date
    && a.price == b.price
    && a.asset_type == b.asset_type
    && a.notes == b.notes
}

// ─── Preflight report ────────────────────────────────────────────────────────

/// What a plan would do, reported before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
  pub to_update:                 usize,
  pub to_insert:                 usize,
  pub unchanged:                 usize,
  pub duplicates_discarded:      usize,
  /// Pre-existing business-key duplicates found in production.
  pub production_duplicates:     usize,
  /// Production trades that disappear (replace only).
  pub to_delete:                 usize,
  /// Analysis rows whose trade keeps its id.
  pub analysis_preserved:        usize,
  /// Analysis rows whose trade id is rewritten (replace only).
  pub analysis_remapped:         usize,
  /// Analysis rows that will reference a trade that no longer exists.
  pub analysis_orphaned:         usize,
  /// Analysis rows already pointing at a missing trade before this run.
  pub analysis_already_orphaned: usize,
}

impl PreflightReport {
  /// Whether the plan touches no rows at all, staging markers included.
  pub fn is_noop(&self) -> bool {
    self.to_update == 0
      && self.to_insert == 0
      && self.to_delete == 0
      && self.unchanged == 0
      && self.duplicates_discarded == 0
  }
}

impl fmt::Display for PreflightReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "update {} / insert {} / unchanged {} / delete {} / discard {} duplicate(s) \
       ({} already in production); analysis rows: {} preserved, {} remapped, {} orphaned \
       ({} already orphaned)",
      self.to_update,
      self.to_insert,
      self.unchanged,
      self.to_delete,
      self.duplicates_discarded,
      self.production_duplicates,
      self.analysis_preserved,
      self.analysis_remapped,
      self.analysis_orphaned,
      self.analysis_already_orphaned,
    )
  }
}

fn already_orphaned(production: &[Trade], refs: &[AnalysisRef]) -> usize {
  let ids: HashSet<TradeId> = production.iter().map(|t| t.id).collect();
  refs.iter().filter(|r| !ids.contains(&r.trade_id)).count()
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Overwrite the non-key fields of an existing production trade.
#[derive(Debug, Clone)]
pub struct TradeUpdate {
  pub trade_id:   TradeId,
  pub staging_id: i64,
  pub data:       TradeData,
}

/// Create a new production trade; the store assigns the id.
#[derive(Debug, Clone)]
pub struct TradeInsert {
  pub staging_id: i64,
  pub data:       TradeData,
}

#[derive(Debug, Clone, Default)]
pub struct MergePlan {
  pub updates:    Vec<TradeUpdate>,
  pub inserts:    Vec<TradeInsert>,
  /// Staging rows identical to production; marked promoted, nothing written.
  pub unchanged:  Vec<i64>,
  /// Staging ids discarded by dedupe.
  pub duplicates: Vec<i64>,
  pub report:     PreflightReport,
}

pub fn plan_merge(dedupe: Dedupe, production: &[Trade], refs: &[AnalysisRef]) -> MergePlan {
  let index = ProductionIndex::new(production);
  let mut plan = MergePlan {
    duplicates: dedupe.duplicates.iter().map(|d| d.staging_id).collect(),
    ..Default::default()
  };

  for row in dedupe.kept {
    match index.get(&row.data.business_key()) {
      Some(existing) if same_details(&existing.data, &row.data) => {
        plan.unchanged.push(row.staging_id);
      }
      Some(existing) => plan.updates.push(TradeUpdate {
        trade_id:   existing.id,
        staging_id: row.staging_id,
        data:       row.data,
      }),
      None => plan.inserts.push(TradeInsert { staging_id: row.staging_id, data: row.data }),
    }
  }

  let updated: HashSet<TradeId> = plan.updates.iter().map(|u| u.trade_id).collect();
  plan.report = PreflightReport {
    to_update: plan.updates.len(),
    to_insert: plan.inserts.len(),
    unchanged: plan.unchanged.len(),
    duplicates_discarded: plan.duplicates.len(),
    production_duplicates: index.duplicates,
    analysis_preserved: refs.iter().filter(|r| updated.contains(&r.trade_id)).count(),
    analysis_already_orphaned: already_orphaned(production, refs),
    ..Default::default()
  };
  plan
}

// ─── Replace ─────────────────────────────────────────────────────────────────

/// One row of the reloaded production table.
#[derive(Debug, Clone)]
pub struct ReplacementRow {
  /// The staging id, reused as the production id.
  pub trade_id:   TradeId,
  pub data:       TradeData,
  /// Session link carried over from the matched production trade.
  pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplacementPlan {
  pub rows:                 Vec<ReplacementRow>,
  pub duplicates:           Vec<i64>,
  /// Old production id → new production id for every business-key match.
  pub id_map:               BTreeMap<TradeId, TradeId>,
  /// Production ids with no staging match.
  pub unmatched_production: Vec<TradeId>,
  /// Analysis ids that will be left pointing at a deleted trade.
  pub orphaned_analysis:    Vec<i64>,
  pub report:               PreflightReport,
}

pub fn plan_replacement(dedupe: Dedupe, production: &[Trade], refs: &[AnalysisRef]) -> ReplacementPlan {
  let index = ProductionIndex::new(production);
  let mut plan = ReplacementPlan {
    duplicates: dedupe.duplicates.iter().map(|d| d.staging_id).collect(),
    ..Default::default()
  };

  let mut matched: HashSet<TradeId> = HashSet::new();
  let mut inserts = 0;
  let mut updates = 0;
  for row in dedupe.kept {
    let existing = index.get(&row.data.business_key());
    match existing {
      Some(t) => {
        plan.id_map.insert(t.id, row.staging_id);
        matched.insert(t.id);
        updates += 1;
      }
      None => inserts += 1,
    }
    plan.rows.push(ReplacementRow {
      trade_id:   row.staging_id,
      data:       row.data,
      session_id: existing.and_then(|t| t.session_id),
    });
  }

  // Production duplicates that lost the index tie-break have no mapping and
  // are deleted along with genuinely unmatched rows.
  plan.unmatched_production =
    production.iter().map(|t| t.id).filter(|id| !matched.contains(id)).collect();
  let unmatched: HashSet<TradeId> = plan.unmatched_production.iter().copied().collect();

  let mut remapped = 0;
  for r in refs {
    if plan.id_map.contains_key(&r.trade_id) {
      remapped += 1;
    } else if unmatched.contains(&r.trade_id) {
      plan.orphaned_analysis.push(r.analysis_id);
    }
  }

  plan.report = PreflightReport {
    to_update: updates,
    to_insert: inserts,
    duplicates_discarded: plan.duplicates.len(),
    production_duplicates: index.duplicates,
    to_delete: plan.unmatched_production.len(),
    analysis_remapped: remapped,
    analysis_orphaned: plan.orphaned_analysis.len(),
    analysis_already_orphaned: already_orphaned(production, refs),
    ..Default::default()
  };
  plan
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::trade::{Owner, StagingStatus, TransactionType};

  fn data(ticker: &str, day: u32) -> TradeData {
    TradeData {
      politician_name:  "Jane Doe".into(),
      ticker:           ticker.into(),
      transaction_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
      transaction_type: TransactionType::Purchase,
      amount_range:     "$1,001 - $15,000".into(),
      owner:            Owner::SelfOwned,
      chamber:          None,
      party:            None,
      state:            None,
      disclosure_date:  None,
      price:            None,
      asset_type:       None,
      notes:            None,
    }
  }

  fn staged(staging_id: i64, data: TradeData) -> StagedTrade {
    StagedTrade { staging_id, data, status: StagingStatus::Pending }
  }

  fn trade(id: TradeId, data: TradeData) -> Trade { Trade { id, data, session_id: None } }

  #[test]
  fn dedupe_keeps_lowest_staging_id() {
    let out = dedupe_staging(vec![
      staged(9, data("AAPL", 1)),
      staged(3, data("AAPL", 1)),
      staged(5, data("MSFT", 2)),
    ]);
    let kept: Vec<_> = out.kept.iter().map(|s| s.staging_id).collect();
    let dup: Vec<_> = out.duplicates.iter().map(|s| s.staging_id).collect();
    assert_eq!(kept, vec![3, 5]);
    assert_eq!(dup, vec![9]);
  }

  #[test]
  fn merge_keeps_production_id_on_match() {
    let mut changed = data("AAPL", 1);
    changed.notes = Some("amended filing".into());
    let plan = plan_merge(
      dedupe_staging(vec![staged(100, changed), staged(101, data("NVDA", 3))]),
      &[trade(7, data("AAPL", 1))],
      &[AnalysisRef { analysis_id: 1, trade_id: 7 }],
    );
    assert_eq!(plan.updates.len(), 1);
    assert_eq!(plan.updates[0].trade_id, 7);
    assert_eq!(plan.inserts.len(), 1);
    assert_eq!(plan.inserts[0].staging_id, 101);
    assert_eq!(plan.report.analysis_preserved, 1);
    assert_eq!(plan.report.analysis_orphaned, 0);
  }

  #[test]
  fn merge_skips_identical_rows() {
    let plan = plan_merge(
      dedupe_staging(vec![staged(100, data("AAPL", 1))]),
      &[trade(7, data("AAPL", 1))],
      &[],
    );
    assert!(plan.updates.is_empty());
    assert!(plan.inserts.is_empty());
    assert_eq!(plan.unchanged, vec![100]);
  }

  #[test]
  fn empty_staging_is_noop() {
    let plan = plan_merge(Dedupe::default(), &[trade(7, data("AAPL", 1))], &[]);
    assert!(plan.report.is_noop());
  }

  #[test]
  fn replacement_maps_matches_and_counts_orphans() {
    let plan = plan_replacement(
      dedupe_staging(vec![staged(50, data("AAPL", 1)), staged(51, data("NVDA", 3))]),
      &[trade(7, data("AAPL", 1)), trade(8, data("TSLA", 2))],
      &[
        AnalysisRef { analysis_id: 1, trade_id: 7 },
        AnalysisRef { analysis_id: 2, trade_id: 8 },
        AnalysisRef { analysis_id: 3, trade_id: 999 },
      ],
    );
    assert_eq!(plan.id_map.get(&7), Some(&50));
    assert_eq!(plan.unmatched_production, vec![8]);
    assert_eq!(plan.orphaned_analysis, vec![2]);
    assert_eq!(plan.report.analysis_remapped, 1);
    assert_eq!(plan.report.analysis_orphaned, 1);
    assert_eq!(plan.report.analysis_already_orphaned, 1);
    assert_eq!(plan.report.to_insert, 1);
    assert_eq!(plan.report.to_delete, 1);
  }

  #[test]
  fn replacement_carries_session_link() {
    let session = Uuid::new_v4();
    let mut existing = trade(7, data("AAPL", 1));
    existing.session_id = Some(session);
    let plan = plan_replacement(dedupe_staging(vec![staged(50, data("AAPL", 1))]), &[existing], &[]);
    assert_eq!(plan.rows[0].trade_id, 50);
    assert_eq!(plan.rows[0].session_id, Some(session));
  }
}
