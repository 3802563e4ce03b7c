//! Incremental session store.

use capitol_core::{
  session::{Assignment, Session, SessionAnalysis, assignment_for},
  store::SessionStore,
  trade::TradeId,
};
use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result, SqliteStore,
  encode::{
    RawSession, SESSION_SELECT, decode_date, decode_uuid, encode_date, encode_dt, encode_uuid,
    in_call,
  },
};

impl SqliteStore {
  async fn query_sessions(&self, sql: String, param: Option<String>, limit: Option<usize>) -> Result<Vec<Session>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match (param, limit) {
          (Some(p), _) => stmt.query_map(rusqlite::params![p], RawSession::read)?,
          (None, Some(l)) => stmt.query_map(rusqlite::params![l], RawSession::read)?,
          (None, None) => stmt.query_map([], RawSession::read)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSession::into_session).collect()
  }
}

impl SessionStore for SqliteStore {
  async fn assign_trade(
    &self,
    trade_id: TradeId,
    politician: String,
    trade_date: NaiveDate,
    gap_days: u32,
  ) -> Result<Uuid> {
    let now = encode_dt(Utc::now());
    let date = encode_date(trade_date);
    let fresh = encode_uuid(Uuid::new_v4());

    let session_id = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the read, so two writers can
        // never both decide to extend (or create) from the same snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<(String, String)> = tx
          .query_row(
            "SELECT session_id, end_date FROM sessions
             WHERE politician_name = ?1
             ORDER BY end_date DESC, created_at DESC
             LIMIT 1",
            rusqlite::params![politician],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let latest = latest
          .map(|(id, end)| Ok::<_, Error>((decode_uuid(&id)?, decode_date(&end)?)))
          .transpose()
          .map_err(in_call)?;

        let session_id = match assignment_for(latest, trade_date, gap_days) {
          Assignment::Extend(id) => {
            let id = encode_uuid(id);
            tx.execute(
              "UPDATE sessions
               SET end_date = MAX(end_date, ?2), trade_count = trade_count + 1,
                   needs_reanalysis = 1, updated_at = ?3
               WHERE session_id = ?1",
              rusqlite::params![id, date, now],
            )?;
            id
          }
          Assignment::Create => {
            tx.execute(
              "INSERT INTO sessions (
                 session_id, politician_name, start_date, end_date,
                 trade_count, needs_reanalysis, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?3, 1, 1, ?4, ?4)",
              rusqlite::params![fresh, politician, date, now],
            )?;
            fresh
          }
        };

        tx.execute(
          "UPDATE trades SET session_id = ?1 WHERE id = ?2",
          rusqlite::params![session_id, trade_id],
        )?;
        tx.commit()?;
        Ok(session_id)
      })
      .await?;

    decode_uuid(&session_id)
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>> {
    let sql = format!("{SESSION_SELECT} WHERE session_id = ?1");
    let mut found = self.query_sessions(sql, Some(encode_uuid(session_id)), None).await?;
    Ok(found.pop())
  }

  async fn sessions_for_politician(&self, politician: String) -> Result<Vec<Session>> {
    let sql = format!("{SESSION_SELECT} WHERE politician_name = ?1 ORDER BY start_date, created_at");
    self.query_sessions(sql, Some(politician.trim().to_owned()), None).await
  }

  async fn list_dirty(&self, limit: usize) -> Result<Vec<Session>> {
    let sql = format!(
      "{SESSION_SELECT} WHERE needs_reanalysis = 1 ORDER BY updated_at DESC, session_id LIMIT ?1"
    );
    self.query_sessions(sql, None, Some(limit)).await
  }

  async fn mark_analyzed(&self, session_id: Uuid, analysis: SessionAnalysis) -> Result<()> {
    let id = encode_uuid(session_id);
    let at = encode_dt(analysis.analyzed_at);
    let score = analysis.score.value();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions
           SET score = ?2, confidence = ?3, summary = ?4, model = ?5, analyzed_at = ?6,
               needs_reanalysis = 0
           WHERE session_id = ?1",
          rusqlite::params![id, score, analysis.confidence, analysis.summary, analysis.model, at],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SessionNotFound(session_id));
    }
    Ok(())
  }

  async fn clear_dirty(&self, session_id: Uuid) -> Result<()> {
    let id = encode_uuid(session_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET needs_reanalysis = 0 WHERE session_id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SessionNotFound(session_id));
    }
    Ok(())
  }

  async fn mark_all_dirty(&self) -> Result<usize> {
    Ok(
      self
        .conn
        .call(|conn| Ok(conn.execute("UPDATE sessions SET needs_reanalysis = 1", [])?))
        .await?,
    )
  }
}
