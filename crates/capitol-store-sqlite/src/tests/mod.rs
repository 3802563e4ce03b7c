//! Integration tests for `SqliteStore` against an in-memory database.

use capitol_core::trade::{Owner, TradeData, TransactionType};
use chrono::NaiveDate;

use crate::SqliteStore;

mod analysis;
mod directory;
mod trades;

async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.expect("in-memory store") }

fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

fn trade(politician: &str, ticker: &str, date: NaiveDate) -> TradeData {
  TradeData {
    politician_name:  politician.into(),
    ticker:           ticker.into(),
    transaction_date: date,
    transaction_type: TransactionType::Purchase,
    amount_range:     "$1,001 - $15,000".into(),
    owner:            Owner::SelfOwned,
    chamber:          None,
    party:            None,
    state:            None,
    disclosure_date:  None,
    price:            None,
    asset_type:       None,
    notes:            None,
  }
}
