//! Pipeline tests against an in-memory SQLite store and a scripted scorer.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
  time::Duration,
};

use capitol_core::{
  relevance::RelevanceFilter,
  scoring::{ScoringCapability, ScoringRequest},
  trade::{Owner, TradeData, TransactionType},
};
use capitol_store_sqlite::SqliteStore;
use chrono::NaiveDate;

use crate::analyzer::{AnalyzerConfig, ConflictAnalyzer};

mod assign;
mod reconcile;

// ─── Scripted scorer ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("scripted transport failure")]
struct ScriptedError;

#[derive(Debug, Clone)]
enum Reply {
  Text(String),
  Fail,
  Hang,
}

/// Answers scoring requests from a queue and records every prompt. Clones
/// share state, so a test can keep a handle after moving one into an
/// analyzer.
#[derive(Clone)]
struct ScriptedScorer {
  model:   String,
  replies: Arc<Mutex<VecDeque<Reply>>>,
  prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedScorer {
  fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
    Self {
      model:   "scripted".into(),
      replies: Arc::new(Mutex::new(replies.into_iter().collect())),
      prompts: Arc::new(Mutex::new(Vec::new())),
    }
  }

  fn prompts(&self) -> Vec<String> { self.prompts.lock().unwrap().clone() }
}

impl ScoringCapability for ScriptedScorer {
  type Error = ScriptedError;

  fn model(&self) -> &str { &self.model }

  async fn score(&self, request: ScoringRequest) -> Result<String, ScriptedError> {
    self.prompts.lock().unwrap().push(request.prompt);
    let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Fail);
    match reply {
      Reply::Text(text) => Ok(text),
      Reply::Fail => Err(ScriptedError),
      Reply::Hang => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ScriptedError)
      }
    }
  }
}

fn verdict(score: f64, reasoning: &str) -> Reply {
  Reply::Text(format!(
    r#"{{"conflict_score": {score}, "confidence": 0.8, "reasoning": "{reasoning}"}}"#
  ))
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.expect("in-memory store") }

fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

fn trade(politician: &str, ticker: &str, date: NaiveDate) -> TradeData {
  TradeData {
    politician_name:  politician.into(),
    ticker:           ticker.into(),
    transaction_date: date,
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

fn analyzer(s: &SqliteStore, scorer: &ScriptedScorer) -> ConflictAnalyzer<SqliteStore, ScriptedScorer> {
  ConflictAnalyzer::new(
    s.clone(),
    scorer.clone(),
    RelevanceFilter::default(),
    AnalyzerConfig { timeout: Duration::from_millis(200), ..AnalyzerConfig::default() },
  )
}
