//! Analysis records and the repair audit trail.

use capitol_core::{
  analysis::{AnalysisRecord, AnalysisTarget, NewAnalysis},
  reconcile::AnalysisRef,
  store::AnalysisStore,
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result, SqliteStore,
  encode::{ANALYSIS_SELECT, RawAnalysis, encode_dt, encode_uuid},
};

/// SQL column and bind value selecting one target.
fn target_column(target: AnalysisTarget) -> (&'static str, rusqlite::types::Value) {
  match target {
    AnalysisTarget::Trade(id) => ("trade_id", id.into()),
    AnalysisTarget::Session(id) => ("session_id", encode_uuid(id).into()),
  }
}

impl AnalysisStore for SqliteStore {
  async fn upsert_analysis(&self, input: NewAnalysis) -> Result<AnalysisRecord> {
    let (column, target) = target_column(input.target);
    let (trade_id, session_id) = match input.target {
      AnalysisTarget::Trade(id) => (Some(id), None),
      AnalysisTarget::Session(id) => (None, Some(encode_uuid(id))),
    };
    let score = input.conflict_score.value();
    let at = encode_dt(Utc::now());

    let upsert = format!(
      "INSERT INTO analysis (
         trade_id, session_id, conflict_score, confidence, reasoning,
         model_used, analysis_version, needs_rescore, analyzed_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
       ON CONFLICT({column}, model_used, analysis_version) DO UPDATE SET
         conflict_score = excluded.conflict_score,
         confidence     = excluded.confidence,
         reasoning      = excluded.reasoning,
         needs_rescore  = 0,
         analyzed_at    = excluded.analyzed_at"
    );
    let select = format!(
      "{ANALYSIS_SELECT} WHERE {column} = ?1 AND model_used = ?2 AND analysis_version = ?3"
    );

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          &upsert,
          rusqlite::params![
            trade_id,
            session_id,
            score,
            input.confidence,
            input.reasoning,
            input.model_used,
            input.analysis_version,
            at,
          ],
        )?;
        Ok(
          conn
            .query_row(
              &select,
              rusqlite::params![target, input.model_used, input.analysis_version],
              RawAnalysis::read,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::UpsertLost)?.into_record()
  }

  async fn get_analysis(
    &self,
    target: AnalysisTarget,
    model: String,
    version: String,
  ) -> Result<Option<AnalysisRecord>> {
    let (column, target) = target_column(target);
    let select = format!(
      "{ANALYSIS_SELECT} WHERE {column} = ?1 AND model_used = ?2 AND analysis_version = ?3"
    );
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&select, rusqlite::params![target, model, version], RawAnalysis::read)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAnalysis::into_record).transpose()
  }

  async fn list_analyses_page(&self, offset: usize, limit: usize) -> Result<Vec<AnalysisRecord>> {
    let sql = format!("{ANALYSIS_SELECT} ORDER BY analysis_id LIMIT ?1 OFFSET ?2");
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawAnalysis::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAnalysis::into_record).collect()
  }

  async fn analysis_trade_refs(&self) -> Result<Vec<AnalysisRef>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT analysis_id, trade_id FROM analysis
             WHERE trade_id IS NOT NULL
             ORDER BY analysis_id",
          )?;
          let refs = stmt
            .query_map([], |r| Ok(AnalysisRef { analysis_id: r.get(0)?, trade_id: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(refs)
        })
        .await?,
    )
  }

  async fn count_orphaned_analyses(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT (SELECT COUNT(*) FROM orphaned_analysis)
                + (SELECT COUNT(*) FROM analysis a
                   WHERE a.trade_id IS NOT NULL
                     AND NOT EXISTS (SELECT 1 FROM trades t WHERE t.id = a.trade_id))",
          [],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as usize)
  }

  async fn flag_for_rescore(&self, analysis_ids: Vec<i64>) -> Result<usize> {
    let flagged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut flagged = 0;
        {
          let mut flag = tx.prepare(
            "UPDATE analysis SET needs_rescore = 1 WHERE analysis_id = ?1 AND needs_rescore = 0",
          )?;
          let mut reopen = tx.prepare(
            "UPDATE sessions SET needs_reanalysis = 1
             WHERE session_id = (SELECT session_id FROM analysis WHERE analysis_id = ?1)",
          )?;
          for id in &analysis_ids {
            flagged += flag.execute(rusqlite::params![id])?;
            reopen.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(flagged)
      })
      .await?;

    debug!(flagged, "flagged analyses for re-scoring");
    Ok(flagged)
  }

  async fn null_fabricated_scores(&self, run_id: Uuid, analysis_ids: Vec<i64>) -> Result<usize> {
    let run = encode_uuid(run_id);
    let at = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut read = tx.prepare(
            "SELECT conflict_score, reasoning FROM analysis
             WHERE analysis_id = ?1 AND conflict_score IS NOT NULL",
          )?;
          let mut audit = tx.prepare(
            "INSERT INTO repair_audit (run_id, analysis_id, previous_score, reasoning, repaired_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          let mut null = tx.prepare(
            "UPDATE analysis SET conflict_score = NULL, needs_rescore = 1 WHERE analysis_id = ?1",
          )?;
          let mut reopen = tx.prepare(
            "UPDATE sessions SET needs_reanalysis = 1
             WHERE session_id = (SELECT session_id FROM analysis WHERE analysis_id = ?1)",
          )?;

          for id in &analysis_ids {
            let Some((score, reasoning)) = read
              .query_row(rusqlite::params![id], |r| {
                Ok((r.get::<_, f64>(0)?, r.get::<_, String>(1)?))
              })
              .optional()?
            else {
              continue;
            };
            audit.execute(rusqlite::params![run, id, score, reasoning, at])?;
            null.execute(rusqlite::params![id])?;
            reopen.execute(rusqlite::params![id])?;
            changed += 1;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    debug!(%run_id, changed, "nulled fabricated scores");
    Ok(changed)
  }
}
