//! Encoding and decoding helpers between Capitol domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Enums are stored by their discriminant. UUIDs are stored as
//! hyphenated lowercase strings.

use capitol_core::{
  analysis::{AnalysisRecord, AnalysisTarget, ConflictScore},
  directory::{CommitteeAssignment, Politician},
  session::{Session, SessionAnalysis},
  trade::{Chamber, Owner, StagedTrade, StagingStatus, Trade, TradeData, TransactionType},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Target sectors ──────────────────────────────────────────────────────────

pub fn encode_sectors(sectors: &[String]) -> Result<String> { Ok(serde_json::to_string(sectors)?) }

pub fn decode_sectors(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Trade columns ───────────────────────────────────────────────────────────

/// The thirteen data columns shared by `trades` and `staged_trades`, in the
/// order [`EncodedTradeData::params`] binds them.
pub const TRADE_DATA_COLUMNS: &str = "politician_name, ticker, transaction_date, \
  transaction_type, amount_range, owner, chamber, party, state, disclosure_date, price, \
  asset_type, notes";

/// Owned column values for one [`TradeData`], ready to bind.
pub struct EncodedTradeData {
  politician_name:  String,
  ticker:           String,
  transaction_date: String,
  transaction_type: &'static str,
  amount_range:     String,
  owner:            &'static str,
  chamber:          Option<&'static str>,
  party:            Option<String>,
  state:            Option<String>,
  disclosure_date:  Option<String>,
  price:            Option<f64>,
  asset_type:       Option<String>,
  notes:            Option<String>,
}

impl EncodedTradeData {
  /// Encode for the production table: business-key columns normalised.
  pub fn production(data: &TradeData) -> Self {
    let key = data.business_key();
    Self {
      politician_name: key.politician_name,
      ticker: key.ticker,
      amount_range: key.amount_range,
      ..Self::verbatim(data)
    }
  }

  /// Encode as scraped, for staging.
  pub fn verbatim(data: &TradeData) -> Self {
    Self {
      politician_name:  data.politician_name.clone(),
      ticker:           data.ticker.clone(),
      transaction_date: encode_date(data.transaction_date),
      transaction_type: data.transaction_type.discriminant(),
      amount_range:     data.amount_range.clone(),
      owner:            data.owner.discriminant(),
      chamber:          data.chamber.map(Chamber::discriminant),
      party:            data.party.clone(),
      state:            data.state.clone(),
      disclosure_date:  data.disclosure_date.map(encode_date),
      price:            data.price,
      asset_type:       data.asset_type.clone(),
      notes:            data.notes.clone(),
    }
  }

  pub fn params(&self) -> [&dyn ToSql; 13] {
    [
      &self.politician_name,
      &self.ticker,
      &self.transaction_date,
      &self.transaction_type,
      &self.amount_range,
      &self.owner,
      &self.chamber,
      &self.party,
      &self.state,
      &self.disclosure_date,
      &self.price,
      &self.asset_type,
      &self.notes,
    ]
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values of the [`TRADE_DATA_COLUMNS`].
pub struct RawTradeData {
  pub politician_name:  String,
  pub ticker:           String,
  pub transaction_date: String,
  pub transaction_type: String,
  pub amount_range:     String,
  pub owner:            String,
  pub chamber:          Option<String>,
  pub party:            Option<String>,
  pub state:            Option<String>,
  pub disclosure_date:  Option<String>,
  pub price:            Option<f64>,
  pub asset_type:       Option<String>,
  pub notes:            Option<String>,
}

impl RawTradeData {
  /// Read the data columns starting at column index `at`.
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      politician_name:  row.get(at)?,
      ticker:           row.get(at + 1)?,
      transaction_date: row.get(at + 2)?,
      transaction_type: row.get(at + 3)?,
      amount_range:     row.get(at + 4)?,
      owner:            row.get(at + 5)?,
      chamber:          row.get(at + 6)?,
      party:            row.get(at + 7)?,
      state:            row.get(at + 8)?,
      disclosure_date:  row.get(at + 9)?,
      price:            row.get(at + 10)?,
      asset_type:       row.get(at + 11)?,
      notes:            row.get(at + 12)?,
    })
  }

  pub fn into_data(self) -> Result<TradeData> {
    Ok(TradeData {
      politician_name:  self.politician_name,
      ticker:           self.ticker,
      transaction_date: decode_date(&self.transaction_date)?,
      transaction_type: TransactionType::from_discriminant(&self.transaction_type)?,
      amount_range:     self.amount_range,
      owner:            Owner::from_discriminant(&self.owner)?,
      chamber:          self.chamber.as_deref().map(Chamber::from_discriminant).transpose()?,
      party:            self.party,
      state:            self.state,
      disclosure_date:  self.disclosure_date.as_deref().map(decode_date).transpose()?,
      price:            self.price,
      asset_type:       self.asset_type,
      notes:            self.notes,
    })
  }
}

/// `SELECT id, <data columns>, session_id FROM trades`.
pub struct RawTrade {
  pub id:         i64,
  pub data:       RawTradeData,
  pub session_id: Option<String>,
}

pub fn trade_select() -> String { format!("SELECT id, {TRADE_DATA_COLUMNS}, session_id FROM trades") }

impl RawTrade {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, data: RawTradeData::read(row, 1)?, session_id: row.get(14)? })
  }

  pub fn into_trade(self) -> Result<Trade> {
    Ok(Trade {
      id:         self.id,
      data:       self.data.into_data()?,
      session_id: self.session_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// `SELECT staging_id, <data columns>, status FROM staged_trades`.
pub struct RawStaged {
  pub staging_id: i64,
  pub data:       RawTradeData,
  pub status:     String,
}

pub fn staged_select() -> String {
  format!("SELECT staging_id, {TRADE_DATA_COLUMNS}, status FROM staged_trades")
}

impl RawStaged {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { staging_id: row.get(0)?, data: RawTradeData::read(row, 1)?, status: row.get(14)? })
  }

  pub fn into_staged(self) -> Result<StagedTrade> {
    Ok(StagedTrade {
      staging_id: self.staging_id,
      data:       self.data.into_data()?,
      status:     StagingStatus::from_discriminant(&self.status)?,
    })
  }
}

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub session_id:       String,
  pub politician_name:  String,
  pub start_date:       String,
  pub end_date:         String,
  pub trade_count:      u32,
  pub needs_reanalysis: bool,
  pub score:            Option<f64>,
  pub confidence:       Option<f64>,
  pub summary:          Option<String>,
  pub model:            Option<String>,
  pub analyzed_at:      Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

pub const SESSION_SELECT: &str = "SELECT session_id, politician_name, start_date, end_date, \
  trade_count, needs_reanalysis, score, confidence, summary, model, analyzed_at, created_at, \
  updated_at FROM sessions";

impl RawSession {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:       row.get(0)?,
      politician_name:  row.get(1)?,
      start_date:       row.get(2)?,
      end_date:         row.get(3)?,
      trade_count:      row.get(4)?,
      needs_reanalysis: row.get(5)?,
      score:            row.get(6)?,
      confidence:       row.get(7)?,
      summary:          row.get(8)?,
      model:            row.get(9)?,
      analyzed_at:      row.get(10)?,
      created_at:       row.get(11)?,
      updated_at:       row.get(12)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    // An analysis is only present when all of its columns are.
    let analysis = match (self.score, self.summary, self.model, self.analyzed_at) {
      (Some(score), Some(summary), Some(model), Some(at)) => Some(SessionAnalysis {
        score: ConflictScore::new(score)?,
        confidence: self.confidence,
        summary,
        model,
        analyzed_at: decode_dt(&at)?,
      }),
      _ => None,
    };

    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      politician_name: self.politician_name,
      start_date: decode_date(&self.start_date)?,
      end_date: decode_date(&self.end_date)?,
      trade_count: self.trade_count,
      needs_reanalysis: self.needs_reanalysis,
      analysis,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `analysis` row.
pub struct RawAnalysis {
  pub analysis_id:      i64,
  pub trade_id:         Option<i64>,
  pub session_id:       Option<String>,
  pub conflict_score:   Option<f64>,
  pub confidence:       Option<f64>,
  pub reasoning:        String,
  pub model_used:       String,
  pub analysis_version: String,
  pub needs_rescore:    bool,
  pub analyzed_at:      String,
}

pub const ANALYSIS_SELECT: &str = "SELECT analysis_id, trade_id, session_id, conflict_score, \
  confidence, reasoning, model_used, analysis_version, needs_rescore, analyzed_at FROM analysis";

impl RawAnalysis {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      analysis_id:      row.get(0)?,
      trade_id:         row.get(1)?,
      session_id:       row.get(2)?,
      conflict_score:   row.get(3)?,
      confidence:       row.get(4)?,
      reasoning:        row.get(5)?,
      model_used:       row.get(6)?,
      analysis_version: row.get(7)?,
      needs_rescore:    row.get(8)?,
      analyzed_at:      row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<AnalysisRecord> {
    let target = match (self.trade_id, self.session_id) {
      (Some(id), _) => AnalysisTarget::Trade(id),
      (None, Some(s)) => AnalysisTarget::Session(decode_uuid(&s)?),
      // Ruled out by the table's CHECK constraint.
      (None, None) => return Err(Error::Corrupt("analysis row without a target".into())),
    };

    Ok(AnalysisRecord {
      analysis_id: self.analysis_id,
      target,
      conflict_score: self.conflict_score.map(ConflictScore::new).transpose()?,
      confidence: self.confidence,
      reasoning: self.reasoning,
      model_used: self.model_used,
      analysis_version: self.analysis_version,
      needs_rescore: self.needs_rescore,
      analyzed_at: decode_dt(&self.analyzed_at)?,
    })
  }
}

/// Raw values read directly from a `politicians` row.
pub struct RawPolitician {
  pub politician_id: String,
  pub full_name:     String,
  pub party:         Option<String>,
  pub state:         Option<String>,
  pub chamber:       Option<String>,
}

pub const POLITICIAN_SELECT: &str =
  "SELECT politician_id, full_name, party, state, chamber FROM politicians";

impl RawPolitician {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      politician_id: row.get(0)?,
      full_name:     row.get(1)?,
      party:         row.get(2)?,
      state:         row.get(3)?,
      chamber:       row.get(4)?,
    })
  }

  pub fn into_politician(self) -> Result<Politician> {
    Ok(Politician {
      politician_id: self.politician_id,
      full_name:     self.full_name,
      party:         self.party,
      state:         self.state,
      chamber:       self.chamber.as_deref().map(Chamber::from_discriminant).transpose()?,
    })
  }
}

/// Raw values read directly from a `committee_assignments` row.
pub struct RawAssignment {
  pub committee_name: String,
  pub title:          Option<String>,
  pub rank:           Option<u32>,
  pub jurisdiction:   String,
  pub target_sectors: String,
}

impl RawAssignment {
  pub fn into_assignment(self) -> Result<CommitteeAssignment> {
    Ok(CommitteeAssignment {
      committee_name: self.committee_name,
      title:          self.title,
      rank:           self.rank,
      jurisdiction:   self.jurisdiction,
      target_sectors: decode_sectors(&self.target_sectors)?,
    })
  }
}

/// Wrap a decode failure raised inside a connection closure.
pub fn in_call(e: Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(e)) }
