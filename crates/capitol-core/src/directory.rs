//! Supporting reference data: politicians, their committee assignments, and
//! security metadata.

use serde::{Deserialize, Serialize};

use crate::trade::Chamber;

/// A sitting or former member of Congress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Politician {
  /// Stable external identifier (e.g. a bioguide id).
  pub politician_id: String,
  pub full_name:     String,
  #[serde(default)]
  pub party:         Option<String>,
  #[serde(default)]
  pub state:         Option<String>,
  #[serde(default)]
  pub chamber:       Option<Chamber>,
}

/// One seat on one committee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeAssignment {
  pub committee_name: String,
  /// e.g. "Chair", "Ranking Member".
  #[serde(default)]
  pub title:          Option<String>,
  #[serde(default)]
  pub rank:           Option<u32>,
  /// What the committee oversees, in prose.
  pub jurisdiction:   String,
  #[serde(default)]
  pub target_sectors: Vec<String>,
}

/// Descriptive metadata for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityInfo {
  pub ticker:       String,
  pub company_name: String,
  pub sector:       String,
}

impl SecurityInfo {
  pub const UNKNOWN: &'static str = "Unknown";

  /// Placeholder for a ticker missing from the security store.
  pub fn unknown(ticker: &str) -> Self {
    Self {
      ticker:       ticker.to_owned(),
      company_name: Self::UNKNOWN.to_owned(),
      sector:       Self::UNKNOWN.to_owned(),
    }
  }
}
