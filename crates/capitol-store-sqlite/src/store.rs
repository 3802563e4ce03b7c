//! [`SqliteStore`]: the SQLite implementation of the Capitol storage traits.
//!
//! The trade table lives here; staging, sessions, analysis and the directory
//! each get their own module.

use std::path::Path;

use capitol_core::{
  store::{Backend, TradeStore},
  trade::{Trade, TradeData, TradeId},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{EncodedTradeData, RawTrade, TRADE_DATA_COLUMNS, encode_uuid, trade_select},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Capitol store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT ... FROM trades` with one trailing clause and decode the
  /// rows.
  async fn query_trades(&self, tail: &'static str, params: TradeQuery) -> Result<Vec<Trade>> {
    let sql = format!("{} {tail}", trade_select());
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match params {
          TradeQuery::Limit(limit) => stmt.query_map(rusqlite::params![limit], RawTrade::read)?,
          TradeQuery::Page { limit, offset } => {
            stmt.query_map(rusqlite::params![limit, offset], RawTrade::read)?
          }
          TradeQuery::Session(id) => stmt.query_map(rusqlite::params![id], RawTrade::read)?,
          TradeQuery::Unscored { model, version, limit } => {
            stmt.query_map(rusqlite::params![model, version, limit], RawTrade::read)?
          }
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawTrade::into_trade).collect()
  }
}

/// Bind parameters for [`SqliteStore::query_trades`].
enum TradeQuery {
  Limit(usize),
  Page { limit: usize, offset: usize },
  Session(String),
  Unscored { model: String, version: String, limit: usize },
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── TradeStore impl ─────────────────────────────────────────────────────────

impl TradeStore for SqliteStore {
  async fn insert_trade(&self, data: TradeData) -> Result<Trade> {
    let encoded = EncodedTradeData::production(&data);
    let insert = format!(
      "INSERT INTO trades ({TRADE_DATA_COLUMNS}) \
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    );
    let select = format!("{} WHERE id = ?1", trade_select());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(&insert, encoded.params().as_slice())?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(&select, rusqlite::params![id], RawTrade::read)?)
      })
      .await?;
    raw.into_trade()
  }

  async fn get_trade(&self, id: TradeId) -> Result<Option<Trade>> {
    let select = format!("{} WHERE id = ?1", trade_select());
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&select, rusqlite::params![id], RawTrade::read).optional()?)
      })
      .await?;
    raw.map(RawTrade::into_trade).transpose()
  }

  async fn list_trades_page(&self, offset: usize, limit: usize) -> Result<Vec<Trade>> {
    self
      .query_trades("ORDER BY id LIMIT ?1 OFFSET ?2", TradeQuery::Page { limit, offset })
      .await
  }

  async fn trades_without_session(&self, limit: usize) -> Result<Vec<Trade>> {
    self
      .query_trades("WHERE session_id IS NULL ORDER BY id LIMIT ?1", TradeQuery::Limit(limit))
      .await
  }

  async fn trades_for_session(&self, session_id: Uuid) -> Result<Vec<Trade>> {
    self
      .query_trades(
        "WHERE session_id = ?1 ORDER BY transaction_date, id",
        TradeQuery::Session(encode_uuid(session_id)),
      )
      .await
  }

  async fn unscored_trades(&self, model: String, version: String, limit: usize) -> Result<Vec<Trade>> {
    self
      .query_trades(
        "WHERE NOT EXISTS (
           SELECT 1 FROM analysis a
           WHERE a.trade_id = trades.id
             AND a.model_used = ?1
             AND a.analysis_version = ?2
             AND a.conflict_score IS NOT NULL
             AND a.needs_rescore = 0
         )
         ORDER BY id LIMIT ?3",
        TradeQuery::Unscored { model, version, limit },
      )
      .await
  }
}
