//! Storage traits.
//!
//! Implemented by storage backends (e.g. `capitol-store-sqlite`). The pipeline
//! depends on these abstractions, not on any concrete backend. Every trait
//! shares the [`Backend`] error type so one store value can implement them all
//! and be passed around as a single handle.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  analysis::{AnalysisRecord, AnalysisTarget, NewAnalysis},
  directory::{CommitteeAssignment, Politician, SecurityInfo},
  reconcile::{AnalysisRef, MergePlan, ReplacementPlan},
  session::{Session, SessionAnalysis},
  trade::{StagedTrade, Trade, TradeData, TradeId},
};

/// Common error type for a storage backend.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Trades ──────────────────────────────────────────────────────────────────

/// The production trade table.
pub trait TradeStore: Backend {
  /// Insert a single trade directly into production. Fails if its business
  /// key already exists.
  fn insert_trade(
    &self,
    data: TradeData,
  ) -> impl Future<Output = Result<Trade, Self::Error>> + Send + '_;

  fn get_trade(
    &self,
    id: TradeId,
  ) -> impl Future<Output = Result<Option<Trade>, Self::Error>> + Send + '_;

  /// One page of production, ordered by id.
  fn list_trades_page(
    &self,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Trade>, Self::Error>> + Send + '_;

  /// Trades not yet assigned to a session, in arrival (id) order.
  fn trades_without_session(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Trade>, Self::Error>> + Send + '_;

  /// Trades of one session, ascending by date.
  fn trades_for_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Trade>, Self::Error>> + Send + '_;

  /// Trades lacking a usable analysis for `(model, version)`: no record, a
  /// null score, or a record flagged for re-scoring.
  fn unscored_trades(
    &self,
    model: String,
    version: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Trade>, Self::Error>> + Send + '_;
}

// ─── Staging ─────────────────────────────────────────────────────────────────

/// The staging area a scraped batch lands in, and promotion out of it.
pub trait StagingStore: Backend {
  fn stage_trades(
    &self,
    batch: Vec<TradeData>,
  ) -> impl Future<Output = Result<Vec<StagedTrade>, Self::Error>> + Send + '_;

  /// One page of pending staging rows, ordered by staging id.
  fn list_pending_staged_page(
    &self,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StagedTrade>, Self::Error>> + Send + '_;

  /// Apply a merge plan atomically and mark every staging row it names.
  fn apply_merge(
    &self,
    plan: MergePlan,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Truncate production, reload it from the plan, and rewrite analysis
  /// references through the plan's id map, atomically.
  fn apply_replacement(
    &self,
    plan: ReplacementPlan,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub trait SessionStore: Backend {
  /// Find-or-extend-or-create the session for a trade and link the trade to
  /// it, as one atomic read-modify-write. See
  /// [`crate::session::assignment_for`] for the extension rule.
  fn assign_trade(
    &self,
    trade_id: TradeId,
    politician: String,
    trade_date: NaiveDate,
    gap_days: u32,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// A politician's sessions in chronological order.
  fn sessions_for_politician(
    &self,
    politician: String,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  /// Up to `limit` sessions needing analysis, most recently updated first.
  fn list_dirty(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  /// Record an analysis and clear the dirty flag in one statement.
  fn mark_analyzed(
    &self,
    session_id: Uuid,
    analysis: SessionAnalysis,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the dirty flag without recording an analysis (low-risk skip).
  fn clear_dirty(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Re-open every session. Returns the number re-opened. `updated_at` tracks
  /// trade membership and is left untouched, as by every other re-queue path.
  fn mark_all_dirty(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Analysis ────────────────────────────────────────────────────────────────

pub trait AnalysisStore: Backend {
  /// Insert, or update the score/reasoning/timestamp of the existing record
  /// with the same `(target, model_used, analysis_version)`. Clears the
  /// re-score flag.
  fn upsert_analysis(
    &self,
    input: NewAnalysis,
  ) -> impl Future<Output = Result<AnalysisRecord, Self::Error>> + Send + '_;

  fn get_analysis(
    &self,
    target: AnalysisTarget,
    model: String,
    version: String,
  ) -> impl Future<Output = Result<Option<AnalysisRecord>, Self::Error>> + Send + '_;

  /// One page of analysis records, ordered by id.
  fn list_analyses_page(
    &self,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AnalysisRecord>, Self::Error>> + Send + '_;

  /// Every trade reference held by an analysis record.
  fn analysis_trade_refs(
    &self,
  ) -> impl Future<Output = Result<Vec<AnalysisRef>, Self::Error>> + Send + '_;

  /// Analysis records whose trade no longer exists, including those a
  /// replacement set aside. Set-aside records never re-attach to a trade.
  fn count_orphaned_analyses(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Flag exactly the given records for re-scoring and re-open any session
  /// they analyse, atomically. Returns the number of records newly flagged.
  fn flag_for_rescore(
    &self,
    analysis_ids: Vec<i64>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Null out the given scores and write one audit row per record under
  /// `run_id`, atomically. Returns the number of records changed.
  fn null_fabricated_scores(
    &self,
    run_id: Uuid,
    analysis_ids: Vec<i64>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Identity, committee and security reference data.
pub trait DirectoryStore: Backend {
  /// Best-effort resolution of a disclosed name. See [`crate::identity`].
  fn resolve_politician(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Politician>, Self::Error>> + Send + '_;

  fn committee_assignments(
    &self,
    politician_id: String,
  ) -> impl Future<Output = Result<Vec<CommitteeAssignment>, Self::Error>> + Send + '_;

  fn security(
    &self,
    ticker: String,
  ) -> impl Future<Output = Result<Option<SecurityInfo>, Self::Error>> + Send + '_;

  fn upsert_politician(
    &self,
    politician: Politician,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_alias(
    &self,
    alias: String,
    politician_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace a politician's full assignment list.
  fn replace_assignments(
    &self,
    politician_id: String,
    assignments: Vec<CommitteeAssignment>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_security(
    &self,
    security: SecurityInfo,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
