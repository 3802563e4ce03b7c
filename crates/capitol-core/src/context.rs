//! The structured context handed to the scoring capability.
//!
//! Missing supporting data is represented explicitly so the model can reason
//! about the absence instead of silently seeing less.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  directory::{CommitteeAssignment, Politician, SecurityInfo},
  trade::{Chamber, Owner, TradeData, TransactionType},
};

/// Who made the trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliticianContext {
  pub name:          String,
  /// `None` when the name could not be resolved in the directory.
  pub politician_id: Option<String>,
  pub party:         Option<String>,
  pub state:         Option<String>,
  pub chamber:       Option<Chamber>,
}

impl PoliticianContext {
  /// Build from the disclosure, preferring directory data where present.
  pub fn new(name: &str, resolved: Option<&Politician>, disclosed: Option<&TradeData>) -> Self {
    let pick = |dir: Option<&String>, disc: Option<&String>| dir.or(disc).cloned();
    Self {
      name:          resolved.map_or_else(|| name.to_owned(), |p| p.full_name.clone()),
      politician_id: resolved.map(|p| p.politician_id.clone()),
      party:         pick(
        resolved.and_then(|p| p.party.as_ref()),
        disclosed.and_then(|t| t.party.as_ref()),
      ),
      state:         pick(
        resolved.and_then(|p| p.state.as_ref()),
        disclosed.and_then(|t| t.state.as_ref()),
      ),
      chamber:       resolved.and_then(|p| p.chamber).or(disclosed.and_then(|t| t.chamber)),
    }
  }
}

/// What is known about the politician's committee seats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "assignments", rename_all = "snake_case")]
pub enum CommitteeContext {
  /// The politician could not be matched to a directory record.
  Unresolved,
  /// Matched, but no assignments are on file.
  NoAssignments,
  Assigned(Vec<CommitteeAssignment>),
}

impl CommitteeContext {
  pub fn from_lookup(resolved: bool, assignments: Vec<CommitteeAssignment>) -> Self {
    match (resolved, assignments.is_empty()) {
      (false, _) => Self::Unresolved,
      (true, true) => Self::NoAssignments,
      (true, false) => Self::Assigned(assignments),
    }
  }
}

/// One trade, enriched with security metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeContext {
  pub ticker:           String,
  pub company_name:     String,
  pub sector:           String,
  pub transaction_date: NaiveDate,
  pub transaction_type: TransactionType,
  pub amount_range:     String,
  pub owner:            Owner,
}

impl TradeContext {
  pub fn new(trade: &TradeData, security: SecurityInfo) -> Self {
    Self {
      ticker:           trade.ticker.trim().to_uppercase(),
      company_name:     security.company_name,
      sector:           security.sector,
      transaction_date: trade.transaction_date,
      transaction_type: trade.transaction_type,
      amount_range:     trade.amount_range.clone(),
      owner:            trade.owner,
    }
  }
}

/// Everything the prompt is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
  pub politician: PoliticianContext,
  pub committees: CommitteeContext,
  pub trades:     Vec<TradeContext>,
}
