//! The Conflict Analyzer batch loop.
//!
//! For each dirty session (or unscored trade in single-trade mode) the
//! analyzer gathers directory context, asks the scoring capability for a
//! verdict, validates it and persists it. A failed call of any kind (timeout,
//! transport error or malformed response) writes nothing, so the item stays
//! eligible for the next run.

use std::{collections::HashMap, fmt, time::Duration};

use capitol_core::{
  analysis::{AnalysisRecord, AnalysisTarget, NewAnalysis},
  context::{AnalysisContext, CommitteeContext, PoliticianContext, TradeContext},
  directory::SecurityInfo,
  prompt::{SYSTEM_INSTRUCTION, build_prompt},
  relevance::RelevanceFilter,
  response::{ScoredResponse, parse_scoring_response},
  scoring::{ScoringCapability, ScoringRequest},
  session::{Session, SessionAnalysis},
  store::{AnalysisStore, DirectoryStore, SessionStore, TradeStore},
  trade::{Trade, TradeData},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
  /// Recorded on every analysis; bump it to re-score without overwriting.
  pub analysis_version: String,
  pub temperature:      f32,
  /// Upper bound on a single scoring call.
  pub timeout:          Duration,
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      analysis_version: "v1".to_owned(),
      temperature:      0.1,
      timeout:          Duration::from_secs(60),
    }
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// What happened to one item.
#[derive(Debug, Clone)]
pub enum Outcome {
  Scored(AnalysisRecord),
  /// Every trade was low-information; carries the filter's reason.
  SkippedLowRisk(String),
}

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub processed:           usize,
  pub scored:              usize,
  pub skipped_low_risk:    usize,
  pub failed_to_score:     usize,
  /// Analysis rows pointing at a trade that no longer exists, store-wide.
  pub orphaned_references: usize,
}

impl fmt::Display for BatchReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "processed {} / scored {} / skipped (low risk) {} / failed {} / orphaned references {}",
      self.processed,
      self.scored,
      self.skipped_low_risk,
      self.failed_to_score,
      self.orphaned_references,
    )
  }
}

// ─── Analyzer ────────────────────────────────────────────────────────────────

pub struct ConflictAnalyzer<S, L> {
  store:  S,
  scorer: L,
  filter: RelevanceFilter,
  config: AnalyzerConfig,
}

impl<S, L> ConflictAnalyzer<S, L>
where
  S: TradeStore + SessionStore + AnalysisStore + DirectoryStore,
  L: ScoringCapability,
{
  pub fn new(store: S, scorer: L, filter: RelevanceFilter, config: AnalyzerConfig) -> Self {
    Self { store, scorer, filter, config }
  }

  pub fn store(&self) -> &S { &self.store }

  /// Gather identity, committee and security context for `trades`.
  ///
  /// An unresolved politician or unknown ticker is not an error; the absence
  /// is carried into the context.
  pub async fn build_context(&self, politician: &str, trades: &[TradeData]) -> Result<AnalysisContext> {
    let resolved = self
      .store
      .resolve_politician(politician.to_owned())
      .await
      .map_err(Error::store)?;

    let assignments = match &resolved {
      Some(p) => self
        .store
        .committee_assignments(p.politician_id.clone())
        .await
        .map_err(Error::store)?,
      None => {
        debug!(politician, "politician not found in directory");
        Vec::new()
      }
    };

    let mut securities: HashMap<String, SecurityInfo> = HashMap::new();
    let mut contexts = Vec::with_capacity(trades.len());
    for trade in trades {
      let ticker = trade.ticker.trim().to_uppercase();
      let info = match securities.get(&ticker) {
        Some(info) => info.clone(),
        None => {
          let info = self
            .store
            .security(ticker.clone())
            .await
            .map_err(Error::store)?
            .unwrap_or_else(|| SecurityInfo::unknown(&ticker));
          securities.insert(ticker, info.clone());
          info
        }
      };
      contexts.push(TradeContext::new(trade, info));
    }

    Ok(AnalysisContext {
      politician: PoliticianContext::new(politician, resolved.as_ref(), trades.first()),
      committees: CommitteeContext::from_lookup(resolved.is_some(), assignments),
      trades:     contexts,
    })
  }

  async fn score(&self, ctx: &AnalysisContext) -> Result<ScoredResponse> {
    let request = ScoringRequest {
      system:      SYSTEM_INSTRUCTION.to_owned(),
      prompt:      build_prompt(ctx),
      temperature: self.config.temperature,
      json_only:   true,
    };

    let text = tokio::time::timeout(self.config.timeout, self.scorer.score(request))
      .await
      .map_err(|_| Error::Timeout(self.config.timeout))?
      .map_err(|e| Error::Scoring(Box::new(e)))?;

    Ok(parse_scoring_response(&text)?)
  }

  fn new_analysis(&self, target: AnalysisTarget, scored: &ScoredResponse) -> NewAnalysis {
    NewAnalysis {
      target,
      conflict_score: scored.conflict_score,
      confidence: scored.confidence,
      reasoning: scored.reasoning.clone(),
      model_used: self.scorer.model().to_owned(),
      analysis_version: self.config.analysis_version.clone(),
    }
  }

  /// Analyse one session. Low-information sessions have their dirty flag
  /// cleared and get no analysis record.
  pub async fn analyze_session(&self, session: &Session) -> Result<Outcome> {
    let trades = self
      .store
      .trades_for_session(session.session_id)
      .await
      .map_err(Error::store)?;
    let data: Vec<TradeData> = trades.into_iter().map(|t| t.data).collect();

    let decision = self.filter.should_skip(&data);
    if decision.skip {
      self.store.clear_dirty(session.session_id).await.map_err(Error::store)?;
      debug!(session_id = %session.session_id, reason = %decision.reason, "session skipped");
      return Ok(Outcome::SkippedLowRisk(decision.reason));
    }

    let ctx = self.build_context(&session.politician_name, &data).await?;
    let scored = self.score(&ctx).await?;

    let record = self
      .store
      .upsert_analysis(self.new_analysis(AnalysisTarget::Session(session.session_id), &scored))
      .await
      .map_err(Error::store)?;

    self
      .store
      .mark_analyzed(session.session_id, SessionAnalysis {
        score:       scored.conflict_score,
        confidence:  scored.confidence,
        summary:     scored.reasoning,
        model:       record.model_used.clone(),
        analyzed_at: record.analyzed_at,
      })
      .await
      .map_err(Error::store)?;

    Ok(Outcome::Scored(record))
  }

  /// Analyse one trade on its own. The relevance gate is session-level, so
  /// every trade is scored.
  pub async fn analyze_trade(&self, trade: &Trade) -> Result<Outcome> {
    let data = std::slice::from_ref(&trade.data);
    let ctx = self.build_context(&trade.data.politician_name, data).await?;
    let scored = self.score(&ctx).await?;

    let record = self
      .store
      .upsert_analysis(self.new_analysis(AnalysisTarget::Trade(trade.id), &scored))
      .await
      .map_err(Error::store)?;
    Ok(Outcome::Scored(record))
  }

  /// Analyse up to `limit` dirty sessions, most recently updated first.
  pub async fn run_sessions(&self, limit: usize) -> Result<BatchReport> {
    let sessions = self.store.list_dirty(limit).await.map_err(Error::store)?;
    let mut report = BatchReport::default();

    for session in &sessions {
      report.processed += 1;
      match self.analyze_session(session).await {
        Ok(Outcome::Scored(record)) => {
          report.scored += 1;
          info!(
            session_id = %session.session_id,
            politician = %session.politician_name,
            score = record.conflict_score.map(|s| s.value()),
            "session scored"
          );
        }
        Ok(Outcome::SkippedLowRisk(_)) => report.skipped_low_risk += 1,
        Err(e) => {
          report.failed_to_score += 1;
          warn!(
            session_id = %session.session_id,
            politician = %session.politician_name,
            trades = session.trade_count,
            error = %e,
            "session analysis failed"
          );
        }
      }
    }

    self.finish(report).await
  }

  /// Analyse up to `limit` trades lacking a usable score for the configured
  /// model and version.
  pub async fn run_trades(&self, limit: usize) -> Result<BatchReport> {
    let trades = self
      .store
      .unscored_trades(
        self.scorer.model().to_owned(),
        self.config.analysis_version.clone(),
        limit,
      )
      .await
      .map_err(Error::store)?;
    let mut report = BatchReport::default();

    for trade in &trades {
      report.processed += 1;
      match self.analyze_trade(trade).await {
        Ok(Outcome::Scored(record)) => {
          report.scored += 1;
          info!(
            trade_id = trade.id,
            politician = %trade.data.politician_name,
            ticker = %trade.data.ticker,
            score = record.conflict_score.map(|s| s.value()),
            "trade scored"
          );
        }
        Ok(Outcome::SkippedLowRisk(_)) => report.skipped_low_risk += 1,
        Err(e) => {
          report.failed_to_score += 1;
          warn!(
            trade_id = trade.id,
            politician = %trade.data.politician_name,
            ticker = %trade.data.ticker,
            error = %e,
            "trade analysis failed"
          );
        }
      }
    }

    self.finish(report).await
  }

  async fn finish(&self, mut report: BatchReport) -> Result<BatchReport> {
    report.orphaned_references = self.store.count_orphaned_analyses().await.map_err(Error::store)?;
    if report.orphaned_references > 0 {
      warn!(orphaned = report.orphaned_references, "analysis rows reference missing trades");
    }
    info!(%report, model = self.scorer.model(), version = %self.config.analysis_version, "analysis run finished");
    Ok(report)
  }
}
