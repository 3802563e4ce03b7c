use std::cell::Cell;

use capitol_core::{
  analysis::{AnalysisTarget, ConflictScore, NewAnalysis},
  reconcile::PreflightReport,
  store::{AnalysisStore, StagingStore, TradeStore},
};
use capitol_store_sqlite::SqliteStore;

use super::{d, store, trade};
use crate::{
  Error, Mode,
  reconcile::{ConfirmationGate, ReconcileConfig, Reconciler},
};

/// Answers every prompt the same way and remembers being asked.
struct Gate {
  answer: bool,
  asked:  Cell<usize>,
}

impl Gate {
  fn yes() -> Self { Self { answer: true, asked: Cell::new(0) } }

  fn no() -> Self { Self { answer: false, asked: Cell::new(0) } }
}

impl ConfirmationGate for Gate {
  fn confirm(&self, _action: &str, _report: &PreflightReport) -> bool {
    self.asked.set(self.asked.get() + 1);
    self.answer
  }
}

fn reconciler(s: &SqliteStore) -> Reconciler<SqliteStore> {
  Reconciler::new(s.clone(), ReconcileConfig::default())
}

async fn analyse(s: &SqliteStore, trade_id: i64) {
  s.upsert_analysis(NewAnalysis {
    target:           AnalysisTarget::Trade(trade_id),
    conflict_score:   ConflictScore::new(0.5).unwrap(),
    confidence:       None,
    reasoning:        "r".into(),
    model_used:       "m1".into(),
    analysis_version: "v1".into(),
  })
  .await
  .unwrap();
}

#[tokio::test]
async fn second_promotion_is_a_noop() {
  let s = store().await;
  let existing = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  analyse(&s, existing.id).await;
  s.stage_trades(vec![
    trade("Jane Doe", "AAPL", d(2024, 1, 1)),
    trade("Jane Doe", "MSFT", d(2024, 1, 2)),
    trade("Jane Doe", "MSFT", d(2024, 1, 2)),
  ])
  .await
  .unwrap();
  let r = reconciler(&s);
  let gate = Gate::yes();

  let first = r.promote(Mode::Execute, &gate).await.unwrap();
  assert_eq!(first.to_insert, 1);
  assert_eq!(first.unchanged, 1);
  assert_eq!(first.duplicates_discarded, 1);
  let orphans_before = s.count_orphaned_analyses().await.unwrap();

  let second = r.promote(Mode::Execute, &gate).await.unwrap();
  assert!(second.is_noop());
  assert_eq!(second.to_insert + second.to_update, 0);
  assert_eq!(gate.asked.get(), 1);
  assert_eq!(s.list_trades_page(0, 100).await.unwrap().len(), 2);
  assert_eq!(s.count_orphaned_analyses().await.unwrap(), orphans_before);
}

#[tokio::test]
async fn update_in_place_keeps_the_analysed_id() {
  let s = store().await;
  let existing = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  analyse(&s, existing.id).await;

  let mut corrected = trade("Jane Doe", "AAPL", d(2024, 1, 1));
  corrected.notes = Some("amended filing".into());
  s.stage_trades(vec![corrected]).await.unwrap();

  let report = reconciler(&s).promote(Mode::Execute, &Gate::yes()).await.unwrap();
  assert_eq!(report.to_update, 1);
  assert_eq!(report.analysis_preserved, 1);

  let after = s.get_trade(existing.id).await.unwrap().unwrap();
  assert_eq!(after.data.notes.as_deref(), Some("amended filing"));
  let refs = s.analysis_trade_refs().await.unwrap();
  assert_eq!(refs[0].trade_id, existing.id);
  assert!(s.get_trade(refs[0].trade_id).await.unwrap().is_some());
}

#[tokio::test]
async fn dry_run_and_declined_gate_write_nothing() {
  let s = store().await;
  s.stage_trades(vec![trade("Jane Doe", "AAPL", d(2024, 1, 1))]).await.unwrap();
  let r = reconciler(&s);

  let gate = Gate::yes();
  let report = r.promote(Mode::DryRun, &gate).await.unwrap();
  assert_eq!(report.to_insert, 1);
  assert_eq!(gate.asked.get(), 0);

  let declined = r.promote(Mode::Execute, &Gate::no()).await;
  assert!(matches!(declined, Err(Error::NotConfirmed(_))));

  assert!(s.list_trades_page(0, 10).await.unwrap().is_empty());
  assert_eq!(r.load_pending_staging().await.unwrap().len(), 1);
}

#[tokio::test]
async fn replacement_reports_orphans_before_confirming() {
  let s = store().await;
  let kept = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let dropped = s.insert_trade(trade("Jane Doe", "TSLA", d(2024, 1, 2))).await.unwrap();
  analyse(&s, kept.id).await;
  analyse(&s, dropped.id).await;
  s.stage_trades(vec![trade("Jane Doe", "AAPL", d(2024, 1, 1))]).await.unwrap();
  let r = reconciler(&s);

  let preview = r.replace(Mode::DryRun, &Gate::no()).await.unwrap();
  assert_eq!(preview.analysis_remapped, 1);
  assert_eq!(preview.analysis_orphaned, 1);
  assert_eq!(preview.to_delete, 1);
  assert_eq!(s.list_trades_page(0, 10).await.unwrap().len(), 2);

  let applied = r.replace(Mode::Execute, &Gate::yes()).await.unwrap();
  assert_eq!(applied, preview);
  assert_eq!(s.list_trades_page(0, 10).await.unwrap().len(), 1);
  assert_eq!(s.count_orphaned_analyses().await.unwrap(), 1);
}

#[tokio::test]
async fn replacement_refuses_an_empty_staging_area() {
  let s = store().await;
  s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();

  let result = reconciler(&s).replace(Mode::Execute, &Gate::yes()).await;
  assert!(matches!(result, Err(Error::EmptyStaging)));
  assert_eq!(s.list_trades_page(0, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn paging_loads_everything_and_honours_the_cap() {
  let s = store().await;
  for day in 1..=5 {
    s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, day))).await.unwrap();
  }

  let paged = Reconciler::new(s.clone(), ReconcileConfig { page_size: 2, max_rows: 100 });
  assert_eq!(paged.load_production().await.unwrap().len(), 5);

  // Exactly one full page still needs a confirming short read.
  let exact = Reconciler::new(s.clone(), ReconcileConfig { page_size: 5, max_rows: 100 });
  assert_eq!(exact.load_production().await.unwrap().len(), 5);

  let capped = Reconciler::new(s.clone(), ReconcileConfig { page_size: 2, max_rows: 3 });
  assert!(matches!(
    capped.load_production().await,
    Err(Error::PaginationCapExceeded { what: "production", cap: 3 })
  ));
}
