//! Batch jobs for Capitol.
//!
//! Everything here is generic over the storage traits in
//! [`capitol_core::store`] and the [`capitol_core::scoring::ScoringCapability`],
//! so handles are passed in explicitly and there is no ambient state. Each job
//! processes items strictly sequentially; a failing item is logged and
//! counted, never fatal to the batch.

pub mod analyzer;
pub mod assign;
pub mod error;
pub mod reconcile;
pub mod repair;
pub mod requeue;

pub use error::{Error, Result};

/// Whether a job may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Compute and report only.
  DryRun,
  Execute,
}

#[cfg(test)]
mod tests;
