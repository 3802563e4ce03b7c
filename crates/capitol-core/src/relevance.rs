//! Session-level relevance gate.
//!
//! Some instruments say nothing about a politician's private information:
//! broad index funds, currency vehicles, and intra-account exchanges. A session
//! made up only of those is not worth a scoring call. A single analyzable
//! trade is enough to send the whole session to the analyzer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::trade::{TradeData, TransactionType};

const DEFAULT_LOW_INFO_TICKERS: &[&str] = &[
  "SPY", "VOO", "IVV", "VTI", "ITOT", "SCHB", "QQQ", "QQQM", "DIA", "IWM",
  "IWB", "IWV", "VT", "VEA", "VWO", "VXUS", "EFA", "EEM", "RSP", "SPLG",
  "SCHX", "VV", "MDY", "IJH", "IJR", "AGG", "BND",
];

const DEFAULT_LOW_INFO_ASSET_TYPES: &[&str] = &[
  "currency", "forex", "foreign exchange", "fx", "cash", "money market",
];

/// Which instruments count as low-information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
  /// Broad index ETFs; compared against the upper-cased ticker.
  pub low_info_tickers:     Vec<String>,
  /// Substrings of `asset_type` marking pure currency vehicles; compared
  /// case-insensitively.
  pub low_info_asset_types: Vec<String>,
}

impl Default for RelevanceConfig {
  fn default() -> Self {
    Self {
      low_info_tickers:     DEFAULT_LOW_INFO_TICKERS.iter().map(|s| (*s).to_owned()).collect(),
      low_info_asset_types: DEFAULT_LOW_INFO_ASSET_TYPES
        .iter()
        .map(|s| (*s).to_owned())
        .collect(),
    }
  }
}

/// How one trade was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
  Analyzable,
  LowInformation(String),
}

/// The gate's verdict for a whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDecision {
  pub skip:   bool,
  pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
  tickers:     HashSet<String>,
  asset_types: Vec<String>,
}

impl Default for RelevanceFilter {
  fn default() -> Self { Self::new(&RelevanceConfig::default()) }
}

impl RelevanceFilter {
  pub fn new(config: &RelevanceConfig) -> Self {
    Self {
      tickers:     config.low_info_tickers.iter().map(|t| t.trim().to_uppercase()).collect(),
      asset_types: config.low_info_asset_types.iter().map(|a| a.to_lowercase()).collect(),
    }
  }

  pub fn classify(&self, trade: &TradeData) -> Classification {
    let ticker = trade.ticker.trim().to_uppercase();
    if self.tickers.contains(&ticker) {
      return Classification::LowInformation(format!("{ticker} is a broad index fund"));
    }

    if let Some(asset_type) = &trade.asset_type {
      let lower = asset_type.to_lowercase();
      let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
      // Markers of three letters or fewer must match a whole word.
      let hit = self.asset_types.iter().find(|marker| {
        if marker.contains(' ') || marker.len() > 3 {
          lower.contains(marker.as_str())
        } else {
          words.contains(&marker.as_str())
        }
      });
      if let Some(marker) = hit {
        return Classification::LowInformation(format!(
          "{ticker} is a {marker} vehicle ({asset_type})"
        ));
      }
    }

    if trade.transaction_type == TransactionType::Exchange {
      return Classification::LowInformation(format!(
        "{ticker} was an intra-account exchange"
      ));
    }

    Classification::Analyzable
  }

  /// Skip only when every trade is low-information.
  pub fn should_skip<'a, I>(&self, trades: I) -> SkipDecision
  where
    I: IntoIterator<Item = &'a TradeData>,
  {
    let mut reasons = Vec::new();
    for trade in trades {
      match self.classify(trade) {
        Classification::Analyzable => {
          return SkipDecision {
            skip:   false,
            reason: format!("{} is analyzable", trade.ticker.trim().to_uppercase()),
          };
        }
        Classification::LowInformation(reason) => reasons.push(reason),
      }
    }

    if reasons.is_empty() {
      return SkipDecision { skip: true, reason: "no trades".to_owned() };
    }
    SkipDecision { skip: true, reason: format!("all trades low-information: {}", reasons.join("; ")) }
  }
}
