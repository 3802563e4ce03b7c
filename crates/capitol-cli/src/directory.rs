//! Loading reference data into the directory from a TOML file.
//!
//! ```toml
//! [[politicians]]
//! politician_id = "D000001"
//! full_name     = "Jane Doe"
//! party         = "D"
//! chamber       = "house"
//! aliases       = ["Doe, Jane A."]
//!
//! [[politicians.committees]]
//! committee_name = "Armed Services"
//! title          = "Ranking Member"
//! jurisdiction   = "Defense procurement and military policy"
//! target_sectors = ["Defense", "Aerospace"]
//!
//! [[securities]]
//! ticker       = "LMT"
//! company_name = "Lockheed Martin"
//! sector       = "Defense"
//! ```

use capitol_core::{
  directory::{CommitteeAssignment, Politician, SecurityInfo},
  store::DirectoryStore,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DirectoryFile {
  #[serde(default)]
  pub politicians: Vec<PoliticianEntry>,
  #[serde(default)]
  pub securities:  Vec<SecurityInfo>,
}

#[derive(Debug, Deserialize)]
pub struct PoliticianEntry {
  #[serde(flatten)]
  pub politician: Politician,
  #[serde(default)]
  pub aliases:    Vec<String>,
  /// Replaces the stored list. Omit to leave assignments untouched.
  #[serde(default)]
  pub committees: Option<Vec<CommitteeAssignment>>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub politicians: usize,
  pub aliases:     usize,
  pub assignments: usize,
  pub securities:  usize,
}

impl DirectoryFile {
  pub fn parse(raw: &str) -> Result<Self, toml::de::Error> { toml::from_str(raw) }

  /// Upsert everything in the file.
  pub async fn load_into<S: DirectoryStore>(self, store: &S) -> Result<LoadReport, S::Error> {
    let mut report = LoadReport::default();

    for entry in self.politicians {
      let id = entry.politician.politician_id.clone();
      store.upsert_politician(entry.politician).await?;
      report.politicians += 1;

      for alias in entry.aliases {
        store.add_alias(alias, id.clone()).await?;
        report.aliases += 1;
      }
      if let Some(committees) = entry.committees {
        report.assignments += committees.len();
        store.replace_assignments(id, committees).await?;
      }
    }

    for security in self.securities {
      store.upsert_security(security).await?;
      report.securities += 1;
    }

    info!(?report, "directory loaded");
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use capitol_store_sqlite::SqliteStore;

  use super::*;

  const SAMPLE: &str = r#"
    [[politicians]]
    politician_id = "D000001"
    full_name     = "Jane Doe"
    party         = "D"
    chamber       = "house"
    aliases       = ["Doe, Jane A."]

    [[politicians.committees]]
    committee_name = "Armed Services"
    rank           = 2
    jurisdiction   = "Defense procurement"
    target_sectors = ["Defense"]

    [[politicians]]
    politician_id = "R000002"
    full_name     = "John Roe"

    [[securities]]
    ticker       = "lmt"
    company_name = "Lockheed Martin"
    sector       = "Defense"
  "#;

  #[test]
  fn parses_nested_entries() {
    let file = DirectoryFile::parse(SAMPLE).unwrap();
    assert_eq!(file.politicians.len(), 2);
    assert_eq!(file.politicians[0].politician.party.as_deref(), Some("D"));
    assert_eq!(file.politicians[0].committees.as_ref().map(Vec::len), Some(1));
    assert!(file.politicians[1].committees.is_none());
    assert_eq!(file.securities[0].company_name, "Lockheed Martin");
  }

  #[tokio::test]
  async fn loads_into_store() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let report = DirectoryFile::parse(SAMPLE).unwrap().load_into(&store).await.unwrap();
    assert_eq!(report, LoadReport { politicians: 2, aliases: 1, assignments: 1, securities: 1 });

    let jane = store.resolve_politician("Doe, Jane A.".into()).await.unwrap().unwrap();
    assert_eq!(jane.politician_id, "D000001");
    let seats = store.committee_assignments("D000001".into()).await.unwrap();
    assert_eq!(seats[0].committee_name, "Armed Services");
    assert!(store.security("LMT".into()).await.unwrap().is_some());
  }
}
