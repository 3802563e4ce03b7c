//! Politician identities, committee assignments and security metadata.

use capitol_core::{
  directory::{CommitteeAssignment, Politician, SecurityInfo},
  identity::{best_fuzzy_match, normalize_name},
  store::DirectoryStore,
  trade::Chamber,
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Result, SqliteStore,
  encode::{POLITICIAN_SELECT, RawAssignment, RawPolitician, encode_sectors},
};

/// Outcome of the SQL half of name resolution.
enum Lookup {
  Hit(RawPolitician),
  Candidates(Vec<RawPolitician>),
}

impl DirectoryStore for SqliteStore {
  async fn resolve_politician(&self, name: String) -> Result<Option<Politician>> {
    let normalized = normalize_name(&name);
    if normalized.is_empty() {
      return Ok(None);
    }

    let exact = format!("{POLITICIAN_SELECT} WHERE normalized_name = ?1 ORDER BY politician_id LIMIT 1");
    let all = format!("{POLITICIAN_SELECT} ORDER BY politician_id");

    let lookup = self
      .conn
      .call(move |conn| {
        if let Some(hit) = conn
          .query_row(&exact, rusqlite::params![normalized], RawPolitician::read)
          .optional()?
        {
          return Ok(Lookup::Hit(hit));
        }

        if let Some(hit) = conn
          .query_row(
            "SELECT p.politician_id, p.full_name, p.party, p.state, p.chamber
             FROM politician_aliases a
             JOIN politicians p ON p.politician_id = a.politician_id
             WHERE a.alias = ?1",
            rusqlite::params![normalized],
            RawPolitician::read,
          )
          .optional()?
        {
          return Ok(Lookup::Hit(hit));
        }

        let mut stmt = conn.prepare(&all)?;
        let rows = stmt.query_map([], RawPolitician::read)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Lookup::Candidates(rows))
      })
      .await?;

    match lookup {
      Lookup::Hit(raw) => Ok(Some(raw.into_politician()?)),
      Lookup::Candidates(raws) => {
        let candidates = raws
          .into_iter()
          .map(RawPolitician::into_politician)
          .collect::<Result<Vec<_>>>()?;
        let found = best_fuzzy_match(&name, &candidates).cloned();
        if let Some(p) = &found {
          debug!(disclosed = %name, matched = %p.full_name, "fuzzy-matched politician");
        }
        Ok(found)
      }
    }
  }

  async fn committee_assignments(&self, politician_id: String) -> Result<Vec<CommitteeAssignment>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT committee_name, title, rank, jurisdiction, target_sectors
           FROM committee_assignments
           WHERE politician_id = ?1
           ORDER BY position",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![politician_id], |r| {
            Ok(RawAssignment {
              committee_name: r.get(0)?,
              title:          r.get(1)?,
              rank:           r.get(2)?,
              jurisdiction:   r.get(3)?,
              target_sectors: r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }

  async fn security(&self, ticker: String) -> Result<Option<SecurityInfo>> {
    let ticker = ticker.trim().to_uppercase();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT ticker, company_name, sector FROM securities WHERE ticker = ?1",
                rusqlite::params![ticker],
                |r| Ok(SecurityInfo { ticker: r.get(0)?, company_name: r.get(1)?, sector: r.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn upsert_politician(&self, politician: Politician) -> Result<()> {
    let normalized = normalize_name(&politician.full_name);
    let chamber = politician.chamber.map(Chamber::discriminant);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO politicians (politician_id, full_name, normalized_name, party, state, chamber)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(politician_id) DO UPDATE SET
             full_name       = excluded.full_name,
             normalized_name = excluded.normalized_name,
             party           = excluded.party,
             state           = excluded.state,
             chamber         = excluded.chamber",
          rusqlite::params![
            politician.politician_id,
            politician.full_name,
            normalized,
            politician.party,
            politician.state,
            chamber,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn add_alias(&self, alias: String, politician_id: String) -> Result<()> {
    let alias = normalize_name(&alias);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO politician_aliases (alias, politician_id) VALUES (?1, ?2)
           ON CONFLICT(alias) DO UPDATE SET politician_id = excluded.politician_id",
          rusqlite::params![alias, politician_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn replace_assignments(
    &self,
    politician_id: String,
    assignments: Vec<CommitteeAssignment>,
  ) -> Result<()> {
    let rows = assignments
      .into_iter()
      .map(|a| Ok((encode_sectors(&a.target_sectors)?, a)))
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM committee_assignments WHERE politician_id = ?1",
          rusqlite::params![politician_id],
        )?;
        {
          let mut insert = tx.prepare(
            "INSERT INTO committee_assignments (
               politician_id, position, committee_name, title, rank, jurisdiction, target_sectors
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for (position, (sectors, a)) in rows.iter().enumerate() {
            insert.execute(rusqlite::params![
              politician_id,
              position as i64,
              a.committee_name,
              a.title,
              a.rank,
              a.jurisdiction,
              sectors,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_security(&self, security: SecurityInfo) -> Result<()> {
    let ticker = security.ticker.trim().to_uppercase();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO securities (ticker, company_name, sector) VALUES (?1, ?2, ?3)
           ON CONFLICT(ticker) DO UPDATE SET
             company_name = excluded.company_name,
             sector       = excluded.sector",
          rusqlite::params![ticker, security.company_name, security.sector],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
