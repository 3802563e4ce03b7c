//! Trade disclosures — the raw input of the pipeline.
//!
//! A trade is identified in the real world by its [`BusinessKey`]. The numeric
//! [`TradeId`] is assigned by the store and is only stable for as long as the
//! store keeps it; analysis records reference trades by that surrogate id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Storage-assigned surrogate key of a production trade.
pub type TradeId = i64;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Direction of a disclosed transaction.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
  Purchase,
  Sale,
  PartialSale,
  /// Intra-account exchange of one holding for another; carries no
  /// directional signal.
  Exchange,
  Other,
}

impl TransactionType {
  /// The discriminant string stored in the `transaction_type` column.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Purchase => "purchase",
      Self::Sale => "sale",
      Self::PartialSale => "partial_sale",
      Self::Exchange => "exchange",
      Self::Other => "other",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "purchase" => Ok(Self::Purchase),
      "sale" => Ok(Self::Sale),
      "partial_sale" => Ok(Self::PartialSale),
      "exchange" => Ok(Self::Exchange),
      "other" => Ok(Self::Other),
      other => Err(Error::UnknownTransactionType(other.to_owned())),
    }
  }

  /// Human-readable label used in prompts.
  pub fn label(self) -> &'static str {
    match self {
      Self::Purchase => "Purchase",
      Self::Sale => "Sale (full)",
      Self::PartialSale => "Sale (partial)",
      Self::Exchange => "Exchange",
      Self::Other => "Other",
    }
  }
}

/// Who holds the asset, as stated on the disclosure.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
  #[serde(rename = "self")]
  SelfOwned,
  Spouse,
  Joint,
  Dependent,
  #[default]
  Unknown,
}

impl Owner {
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::SelfOwned => "self",
      Self::Spouse => "spouse",
      Self::Joint => "joint",
      Self::Dependent => "dependent",
      Self::Unknown => "unknown",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "self" => Ok(Self::SelfOwned),
      "spouse" => Ok(Self::Spouse),
      "joint" => Ok(Self::Joint),
      "dependent" => Ok(Self::Dependent),
      "unknown" => Ok(Self::Unknown),
      other => Err(Error::UnknownOwner(other.to_owned())),
    }
  }
}

/// The chamber of Congress a politician sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chamber {
  House,
  Senate,
}

impl Chamber {
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::House => "house",
      Self::Senate => "senate",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "house" => Ok(Self::House),
      "senate" => Ok(Self::Senate),
      other => Err(Error::UnknownChamber(other.to_owned())),
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::House => "House",
      Self::Senate => "Senate",
    }
  }
}

// ─── TradeData ───────────────────────────────────────────────────────────────

/// Everything a disclosure says about a trade, without any storage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
  pub politician_name:  String,
  pub ticker:           String,
  pub transaction_date: NaiveDate,
  pub transaction_type: TransactionType,
  /// Disclosed value band, e.g. "$1,001 - $15,000".
  pub amount_range:     String,
  #[serde(default)]
  pub owner:            Owner,
  #[serde(default)]
  pub chamber:          Option<Chamber>,
  #[serde(default)]
  pub party:            Option<String>,
  #[serde(default)]
  pub state:            Option<String>,
  #[serde(default)]
  pub disclosure_date:  Option<NaiveDate>,
  #[serde(default)]
  pub price:            Option<f64>,
  #[serde(default)]
  pub asset_type:       Option<String>,
  #[serde(default)]
  pub notes:            Option<String>,
}

impl TradeData {
  pub fn business_key(&self) -> BusinessKey { BusinessKey::from(self) }
}

// ─── Business key ────────────────────────────────────────────────────────────

/// The real-world identity of a trade. No two production trades may share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusinessKey {
  pub politician_name:  String,
  pub ticker:           String,
  pub transaction_date: NaiveDate,
  pub transaction_type: TransactionType,
  pub amount_range:     String,
  pub owner:            Owner,
}

impl From<&TradeData> for BusinessKey {
  fn from(t: &TradeData) -> Self {
    Self {
      politician_name:  t.politician_name.trim().to_owned(),
      ticker:           t.ticker.trim().to_uppercase(),
      transaction_date: t.transaction_date,
      transaction_type: t.transaction_type,
      amount_range:     t.amount_range.trim().to_owned(),
      owner:            t.owner,
    }
  }
}

// ─── Trade ───────────────────────────────────────────────────────────────────

/// A trade in the production store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
  pub id:         TradeId,
  #[serde(flatten)]
  pub data:       TradeData,
  /// The session this trade was assigned to, if assignment has run.
  pub session_id: Option<Uuid>,
}

impl Trade {
  pub fn business_key(&self) -> BusinessKey { self.data.business_key() }
}

// ─── Staging ─────────────────────────────────────────────────────────────────

/// Promotion state of a staging row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingStatus {
  /// Not yet considered by the reconciler.
  Pending,
  /// Merged into production.
  Promoted,
  /// Discarded as a duplicate of another staging row with the same key.
  Duplicate,
}

impl StagingStatus {
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Promoted => "promoted",
      Self::Duplicate => "duplicate",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "promoted" => Ok(Self::Promoted),
      "duplicate" => Ok(Self::Duplicate),
      other => Err(Error::UnknownStagingStatus(other.to_owned())),
    }
  }
}

/// A freshly scraped trade waiting in the staging area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTrade {
  pub staging_id: i64,
  pub data:       TradeData,
  pub status:     StagingStatus,
}

// ─── Accessor traits ─────────────────────────────────────────────────────────

/// Anything that carries a calendar date the grouper can order by.
pub trait Dated {
  fn date(&self) -> NaiveDate;
}

/// Anything attributable to a single politician.
pub trait ByPolitician {
  fn politician(&self) -> &str;
}

impl Dated for TradeData {
  fn date(&self) -> NaiveDate { self.transaction_date }
}

impl Dated for Trade {
  fn date(&self) -> NaiveDate { self.data.transaction_date }
}

impl Dated for StagedTrade {
  fn date(&self) -> NaiveDate { self.data.transaction_date }
}

impl ByPolitician for TradeData {
  fn politician(&self) -> &str { &self.politician_name }
}

impl ByPolitician for Trade {
  fn politician(&self) -> &str { &self.data.politician_name }
}

impl ByPolitician for StagedTrade {
  fn politician(&self) -> &str { &self.data.politician_name }
}

impl<T: Dated> Dated for &T {
  fn date(&self) -> NaiveDate { (*self).date() }
}

impl<T: ByPolitician> ByPolitician for &T {
  fn politician(&self) -> &str { (*self).politician() }
}
