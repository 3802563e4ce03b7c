//! The Staging→Production Reconciler.
//!
//! Loads all pending staging rows and all of production (paged), plans with
//! [`capitol_core::reconcile`], reports, and applies only after the operator
//! confirms.

use std::future::Future;

use capitol_core::{
  reconcile::{PreflightReport, dedupe_staging, plan_merge, plan_replacement},
  store::{AnalysisStore, StagingStore, TradeStore},
  trade::{StagedTrade, Trade},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Mode, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
  /// Rows per paged read.
  pub page_size: usize,
  /// Hard ceiling on rows loaded by one paged scan.
  pub max_rows:  usize,
}

impl Default for ReconcileConfig {
  fn default() -> Self { Self { page_size: 1000, max_rows: 500_000 } }
}

/// Operator approval for a write the preflight report describes.
pub trait ConfirmationGate {
  fn confirm(&self, action: &str, report: &PreflightReport) -> bool;
}

/// Read pages until a short one comes back.
async fn load_paged<T, E, F, Fut>(what: &'static str, config: &ReconcileConfig, mut fetch: F) -> Result<Vec<T>>
where
  F: FnMut(usize, usize) -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let page_size = config.page_size.max(1);
  let mut rows = Vec::new();
  loop {
    let page = fetch(rows.len(), page_size).await.map_err(Error::store)?;
    let short = page.len() < page_size;
    rows.extend(page);
    if rows.len() > config.max_rows {
      return Err(Error::PaginationCapExceeded { what, cap: config.max_rows });
    }
    if short {
      return Ok(rows);
    }
  }
}

pub struct Reconciler<S> {
  store:  S,
  config: ReconcileConfig,
}

impl<S> Reconciler<S>
where
  S: TradeStore + StagingStore + AnalysisStore,
{
  pub fn new(store: S, config: ReconcileConfig) -> Self { Self { store, config } }

  pub async fn load_production(&self) -> Result<Vec<Trade>> {
    load_paged("production", &self.config, |offset, limit| {
      self.store.list_trades_page(offset, limit)
    })
    .await
  }

  pub async fn load_pending_staging(&self) -> Result<Vec<StagedTrade>> {
    load_paged("staging", &self.config, |offset, limit| {
      self.store.list_pending_staged_page(offset, limit)
    })
    .await
  }

  /// Merge pending staging rows into production, keeping production ids.
  pub async fn promote(&self, mode: Mode, gate: &impl ConfirmationGate) -> Result<PreflightReport> {
    let staged = self.load_pending_staging().await?;
    let production = self.load_production().await?;
    let refs = self.store.analysis_trade_refs().await.map_err(Error::store)?;

    let plan = plan_merge(dedupe_staging(staged), &production, &refs);
    let report = plan.report.clone();
    info!(%report, ?mode, "merge preflight");

    if report.is_noop() {
      info!("nothing pending in staging");
      return Ok(report);
    }
    if mode == Mode::DryRun {
      return Ok(report);
    }
    if !gate.confirm("merge staging into production", &report) {
      return Err(Error::NotConfirmed("merge staging into production"));
    }

    self.store.apply_merge(plan).await.map_err(Error::store)?;
    self.log_orphans(&report).await?;
    Ok(report)
  }

  /// Replace production wholesale with the pending staging rows.
  pub async fn replace(&self, mode: Mode, gate: &impl ConfirmationGate) -> Result<PreflightReport> {
    let staged = self.load_pending_staging().await?;
    if staged.is_empty() {
      return Err(Error::EmptyStaging);
    }
    let production = self.load_production().await?;
    let refs = self.store.analysis_trade_refs().await.map_err(Error::store)?;

    let plan = plan_replacement(dedupe_staging(staged), &production, &refs);
    let report = plan.report.clone();
    info!(%report, ?mode, "replacement preflight");
    if report.analysis_orphaned > 0 {
      warn!(
        orphaned = report.analysis_orphaned,
        "replacement would orphan analysis rows"
      );
    }

    if mode == Mode::DryRun {
      return Ok(report);
    }
    if !gate.confirm("replace production with staging", &report) {
      return Err(Error::NotConfirmed("replace production with staging"));
    }

    self.store.apply_replacement(plan).await.map_err(Error::store)?;
    self.log_orphans(&report).await?;
    Ok(report)
  }

  async fn log_orphans(&self, report: &PreflightReport) -> Result<()> {
    let total = self.store.count_orphaned_analyses().await.map_err(Error::store)?;
    if report.analysis_orphaned > 0 || total > 0 {
      warn!(
        orphaned_by_this_run = report.analysis_orphaned,
        orphaned_total = total,
        "analysis rows reference missing trades"
      );
    }
    info!(%report, "promotion applied");
    Ok(())
  }
}
