use capitol_core::store::{SessionStore, TradeStore};

use super::{d, store, trade};
use crate::assign::assign_pending_sessions;

#[tokio::test]
async fn assigns_in_arrival_order_and_counts_sessions() {
  let s = store().await;
  s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 1))).await.unwrap();
  s.insert_trade(trade("Jane Doe", "MSFT", d(2024, 1, 5))).await.unwrap();
  s.insert_trade(trade("Jane Doe", "NVDA", d(2024, 3, 1))).await.unwrap();
  s.insert_trade(trade("John Roe", "AAPL", d(2024, 1, 1))).await.unwrap();

  let report = assign_pending_sessions(&s, 7, 100).await.unwrap();
  assert_eq!(report.assigned, 4);
  assert_eq!(report.sessions_touched, 3);
  assert_eq!(report.failed, 0);

  let jane = s.sessions_for_politician("Jane Doe".into()).await.unwrap();
  assert_eq!(jane.iter().map(|s| s.trade_count).collect::<Vec<_>>(), vec![2, 1]);

  // Nothing left to do.
  let again = assign_pending_sessions(&s, 7, 100).await.unwrap();
  assert_eq!(again.assigned, 0);
}

#[tokio::test]
async fn limit_makes_progress_resumable() {
  let s = store().await;
  for day in 1..=5 {
    s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, day))).await.unwrap();
  }

  assert_eq!(assign_pending_sessions(&s, 7, 2).await.unwrap().assigned, 2);
  assert_eq!(s.trades_without_session(100).await.unwrap().len(), 3);
  assert_eq!(assign_pending_sessions(&s, 7, 10).await.unwrap().assigned, 3);

  let sessions = s.sessions_for_politician("Jane Doe".into()).await.unwrap();
  assert_eq!(sessions.len(), 1);
  assert_eq!(sessions[0].trade_count, 5);
}

#[tokio::test]
async fn out_of_order_arrival_is_not_resorted() {
  let s = store().await;
  s.insert_trade(trade("Jane Doe", "AAPL", d(2024, 1, 10))).await.unwrap();
  s.insert_trade(trade("Jane Doe", "MSFT", d(2024, 1, 8))).await.unwrap();

  assign_pending_sessions(&s, 7, 100).await.unwrap();
  // The batch grouper would put these together; incremental assignment does not.
  assert_eq!(s.sessions_for_politician("Jane Doe".into()).await.unwrap().len(), 2);
}
