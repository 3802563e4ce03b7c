//! Error type for `capitol-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] capitol_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("session not found: {0}")]
  SessionNotFound(uuid::Uuid),

  #[error("analysis record vanished after upsert")]
  UpsertLost,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
