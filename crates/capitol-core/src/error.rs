//! Error types for `capitol-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("conflict score {0} is outside [0.0, 1.0]")]
  ScoreOutOfRange(f64),

  #[error("unknown transaction type discriminant: {0:?}")]
  UnknownTransactionType(String),

  #[error("unknown owner discriminant: {0:?}")]
  UnknownOwner(String),

  #[error("unknown chamber discriminant: {0:?}")]
  UnknownChamber(String),

  #[error("unknown staging status discriminant: {0:?}")]
  UnknownStagingStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
