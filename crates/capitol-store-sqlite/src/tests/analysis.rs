use capitol_core::{
  analysis::{AnalysisTarget, ConflictScore, NewAnalysis},
  store::{AnalysisStore, SessionStore, TradeStore},
};
use uuid::Uuid;

use super::{d, store, trade};

fn scored(target: AnalysisTarget, score: f64, reasoning: &str) -> NewAnalysis {
  NewAnalysis {
    target,
    conflict_score: ConflictScore::new(score).unwrap(),
    confidence: Some(0.5),
    reasoning: reasoning.into(),
    model_used: "m1".into(),
    analysis_version: "v1".into(),
  }
}

#[tokio::test]
async fn upsert_keeps_one_row_per_target_model_version() {
  let s = store().await;
  let t = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let target = AnalysisTarget::Trade(t.id);

  let first = s.upsert_analysis(scored(target, 0.2, "first")).await.unwrap();
  let second = s.upsert_analysis(scored(target, 0.9, "second")).await.unwrap();
  assert_eq!(first.analysis_id, second.analysis_id);
  assert_eq!(second.conflict_score.unwrap().value(), 0.9);
  assert_eq!(second.reasoning, "second");

  let mut v2 = scored(target, 0.4, "other version");
  v2.analysis_version = "v2".into();
  let third = s.upsert_analysis(v2).await.unwrap();
  assert_ne!(third.analysis_id, first.analysis_id);

  assert_eq!(s.list_analyses_page(0, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn session_targets_are_keyed_separately() {
  let s = store().await;
  let t = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let session = s.assign_trade(t.id, "Jane Doe".into(), d(2024, 1, 1), 7).await.unwrap();

  s.upsert_analysis(scored(AnalysisTarget::Session(session), 0.3, "s")).await.unwrap();
  s.upsert_analysis(scored(AnalysisTarget::Trade(t.id), 0.4, "t")).await.unwrap();

  let fetched = s
    .get_analysis(AnalysisTarget::Session(session), "m1".into(), "v1".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.target, AnalysisTarget::Session(session));
  assert_eq!(fetched.reasoning, "s");

  // Only trade references count for reconciliation.
  let refs = s.analysis_trade_refs().await.unwrap();
  assert_eq!(refs.len(), 1);
  assert_eq!(refs[0].trade_id, t.id);
}

#[tokio::test]
async fn upsert_clears_rescore_flag() {
  let s = store().await;
  let t = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let target = AnalysisTarget::Trade(t.id);
  let first = s.upsert_analysis(scored(target, 0.2, "first")).await.unwrap();

  assert_eq!(s.flag_for_rescore(vec![first.analysis_id]).await.unwrap(), 1);
  // Already flagged.
  assert_eq!(s.flag_for_rescore(vec![first.analysis_id]).await.unwrap(), 0);
  let flagged = s.get_analysis(target, "m1".into(), "v1".into()).await.unwrap().unwrap();
  assert!(flagged.needs_rescore);

  let rescored = s.upsert_analysis(scored(target, 0.6, "again")).await.unwrap();
  assert!(!rescored.needs_rescore);
}

#[tokio::test]
async fn missing_trades_are_counted_as_orphans() {
  let s = store().await;
  let t = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  s.upsert_analysis(scored(AnalysisTarget::Trade(t.id), 0.2, "real")).await.unwrap();
  s.upsert_analysis(scored(AnalysisTarget::Trade(9_999), 0.2, "ghost")).await.unwrap();

  assert_eq!(s.count_orphaned_analyses().await.unwrap(), 1);
}

#[tokio::test]
async fn nulling_scores_writes_audit_and_requeues() {
  let s = store().await;
  let t = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let record = s
    .upsert_analysis(scored(AnalysisTarget::Trade(t.id), 0.0, "Analysis failed: timeout"))
    .await
    .unwrap();

  let run = Uuid::new_v4();
  assert_eq!(s.null_fabricated_scores(run, vec![record.analysis_id, 12_345]).await.unwrap(), 1);

  let after = s
    .get_analysis(AnalysisTarget::Trade(t.id), "m1".into(), "v1".into())
    .await
    .unwrap()
    .unwrap();
  assert!(after.conflict_score.is_none());
  assert_eq!(s.unscored_trades("m1".into(), "v1".into(), 10).await.unwrap().len(), 1);

  // Already-null rows are not audited twice.
  assert_eq!(s.null_fabricated_scores(run, vec![record.analysis_id]).await.unwrap(), 0);

  let audited: i64 = s
    .conn
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM repair_audit WHERE run_id = ?1",
        rusqlite::params![run.hyphenated().to_string()],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(audited, 1);
}
