use capitol_core::{
  analysis::{AnalysisTarget, ConflictScore, NewAnalysis},
  store::{AnalysisStore, TradeStore},
};

use super::{d, store, trade};

#[tokio::test]
async fn insert_normalises_business_key_columns() {
  let s = store().await;
  let t = s.insert_trade(trade("  Jane Doe ", "nvda ", d(2024, 3, 1))).await.unwrap();
  assert_eq!(t.data.politician_name, "Jane Doe");
  assert_eq!(t.data.ticker, "NVDA");
  assert!(t.session_id.is_none());

  let fetched = s.get_trade(t.id).await.unwrap().unwrap();
  assert_eq!(fetched.data, t.data);
}

#[tokio::test]
async fn duplicate_business_key_is_rejected() {
  let s = store().await;
  s.insert_trade(trade("Jane Doe", "NVDA", d(2024, 3, 1))).await.unwrap();
  let err = s.insert_trade(trade("Jane Doe", "nvda", d(2024, 3, 1))).await;
  assert!(err.is_err());

  // A different owner is a different trade.
  let mut spouse = trade("Jane Doe", "NVDA", d(2024, 3, 1));
  spouse.owner = capitol_core::trade::Owner::Spouse;
  s.insert_trade(spouse).await.unwrap();
}

#[tokio::test]
async fn get_trade_missing_returns_none() {
  let s = store().await;
  assert!(s.get_trade(42).await.unwrap().is_none());
}

#[tokio::test]
async fn pages_are_ordered_by_id() {
  let s = store().await;
  for day in 1..=5 {
    s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, day))).await.unwrap();
  }
  let first = s.list_trades_page(0, 2).await.unwrap();
  let rest = s.list_trades_page(2, 10).await.unwrap();
  assert_eq!(first.len(), 2);
  assert_eq!(rest.len(), 3);
  assert!(first[1].id < rest[0].id);
}

#[tokio::test]
async fn unscored_trades_respects_model_version_and_flags() {
  let s = store().await;
  let a = s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  let b = s.insert_trade(trade("Jane Doe", "MSFT", d(2024, 1, 2))).await.unwrap();

  let scored = s.upsert_analysis(NewAnalysis {
    target:           AnalysisTarget::Trade(a.id),
    conflict_score:   ConflictScore::new(0.3).unwrap(),
    confidence:       None,
    reasoning:        "weak link".into(),
    model_used:       "m1".into(),
    analysis_version: "v1".into(),
  })
  .await
  .unwrap();

  let pending = s.unscored_trades("m1".into(), "v1".into(), 10).await.unwrap();
  assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b.id]);

  // Another version has scored nothing yet.
  let other = s.unscored_trades("m1".into(), "v2".into(), 10).await.unwrap();
  assert_eq!(other.len(), 2);

  s.flag_for_rescore(vec![scored.analysis_id]).await.unwrap();
  let flagged = s.unscored_trades("m1".into(), "v1".into(), 10).await.unwrap();
  assert_eq!(flagged.len(), 2);
}
