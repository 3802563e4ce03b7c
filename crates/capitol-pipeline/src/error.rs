//! Error type for `capitol-pipeline`.

use std::time::Duration;

use capitol_core::response::ResponseError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("scoring call failed: {0}")]
  Scoring(#[source] BoxError),

  #[error("scoring call timed out after {0:?}")]
  Timeout(Duration),

  #[error("malformed scoring response: {0}")]
  MalformedResponse(#[from] ResponseError),

  #[error("operator declined to {0}")]
  NotConfirmed(&'static str),

  #[error("{what} exceeds the {cap}-row pagination cap")]
  PaginationCapExceeded { what: &'static str, cap: usize },

  #[error("no pending staging rows; refusing to replace production with an empty table")]
  EmptyStaging,
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
