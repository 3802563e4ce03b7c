//! Staging area and the two promotion strategies.

use capitol_core::{
  reconcile::{MergePlan, ReplacementPlan},
  store::StagingStore,
  trade::{StagedTrade, StagingStatus, TradeData},
};
use chrono::Utc;
use rusqlite::{ToSql, Transaction};
use tracing::debug;

use crate::{
  Result, SqliteStore,
  encode::{EncodedTradeData, RawStaged, TRADE_DATA_COLUMNS, encode_dt, encode_uuid, staged_select},
};

/// Set the final status of the named staging rows.
fn resolve_staged(
  tx: &Transaction<'_>,
  ids: impl IntoIterator<Item = i64>,
  status: StagingStatus,
  at: &str,
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "UPDATE staged_trades SET status = ?2, resolved_at = ?3 WHERE staging_id = ?1",
  )?;
  for id in ids {
    stmt.execute(rusqlite::params![id, status.discriminant(), at])?;
  }
  Ok(())
}

impl StagingStore for SqliteStore {
  async fn stage_trades(&self, batch: Vec<TradeData>) -> Result<Vec<StagedTrade>> {
    let now = encode_dt(Utc::now());
    let encoded: Vec<EncodedTradeData> = batch.iter().map(EncodedTradeData::verbatim).collect();
    let insert = format!(
      "INSERT INTO staged_trades ({TRADE_DATA_COLUMNS}, status, staged_at) \
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 'pending', ?14)"
    );

    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(encoded.len());
        {
          let mut stmt = tx.prepare(&insert)?;
          for row in &encoded {
            let mut params: Vec<&dyn ToSql> = row.params().to_vec();
            params.push(&now);
            stmt.execute(params.as_slice())?;
            ids.push(tx.last_insert_rowid());
          }
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    Ok(
      ids
        .into_iter()
        .zip(batch)
        .map(|(staging_id, data)| StagedTrade { staging_id, data, status: StagingStatus::Pending })
        .collect(),
    )
  }

  async fn list_pending_staged_page(&self, offset: usize, limit: usize) -> Result<Vec<StagedTrade>> {
    let sql = format!(
      "{} WHERE status = 'pending' ORDER BY staging_id LIMIT ?1 OFFSET ?2",
      staged_select()
    );
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawStaged::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawStaged::into_staged).collect()
  }

  async fn apply_merge(&self, plan: MergePlan) -> Result<()> {
    let now = encode_dt(Utc::now());
    let updates: Vec<(i64, i64, EncodedTradeData)> = plan
      .updates
      .iter()
      .map(|u| (u.trade_id, u.staging_id, EncodedTradeData::production(&u.data)))
      .collect();
    let inserts: Vec<(i64, EncodedTradeData)> = plan
      .inserts
      .iter()
      .map(|i| (i.staging_id, EncodedTradeData::production(&i.data)))
      .collect();
    let unchanged = plan.unchanged;
    let duplicates = plan.duplicates;
    let insert = format!(
      "INSERT INTO trades ({TRADE_DATA_COLUMNS}) \
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    );

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          // Key columns (?1-?6) are equal by construction; only details move.
          let mut update = tx.prepare(
            "UPDATE trades SET chamber = ?7, party = ?8, state = ?9, disclosure_date = ?10,
                    price = ?11, asset_type = ?12, notes = ?13
             WHERE id = ?14
               AND politician_name = ?1 AND ticker = ?2 AND transaction_date = ?3
               AND transaction_type = ?4 AND amount_range = ?5 AND owner = ?6",
          )?;
          for (trade_id, _, row) in &updates {
            let mut params: Vec<&dyn ToSql> = row.params().to_vec();
            params.push(trade_id);
            update.execute(params.as_slice())?;
          }

          let mut insert = tx.prepare(&insert)?;
          for (_, row) in &inserts {
            insert.execute(row.params().as_slice())?;
          }
        }

        let promoted = updates
          .iter()
          .map(|(_, staging_id, _)| *staging_id)
          .chain(inserts.iter().map(|(staging_id, _)| *staging_id))
          .chain(unchanged.iter().copied());
        resolve_staged(&tx, promoted, StagingStatus::Promoted, &now)?;
        resolve_staged(&tx, duplicates.iter().copied(), StagingStatus::Duplicate, &now)?;

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn apply_replacement(&self, plan: ReplacementPlan) -> Result<()> {
    let now = encode_dt(Utc::now());
    let rows: Vec<(i64, EncodedTradeData, Option<String>)> = plan
      .rows
      .iter()
      .map(|r| (r.trade_id, EncodedTradeData::production(&r.data), r.session_id.map(encode_uuid)))
      .collect();
    let id_map: Vec<(i64, i64)> = plan.id_map.into_iter().collect();
    let duplicates = plan.duplicates;
    let insert = format!(
      "INSERT INTO trades (id, {TRADE_DATA_COLUMNS}, session_id) \
       VALUES (?14, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?15)"
    );

    let orphaned = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM trades", [])?;

        tx.execute_batch(
          "CREATE TEMP TABLE IF NOT EXISTS trade_id_map (
             old_id INTEGER PRIMARY KEY,
             new_id INTEGER NOT NULL
           );
           DELETE FROM temp.trade_id_map;",
        )?;

        {
          let mut insert = tx.prepare(&insert)?;
          for (id, row, session_id) in &rows {
            let mut params: Vec<&dyn ToSql> = row.params().to_vec();
            params.push(id);
            params.push(session_id);
            insert.execute(params.as_slice())?;
          }

          let mut map = tx.prepare("INSERT INTO temp.trade_id_map (old_id, new_id) VALUES (?1, ?2)")?;
          for (old, new) in &id_map {
            map.execute(rusqlite::params![old, new])?;
          }
        }

        // The reloaded table reuses staging ids, so a record whose trade has
        // no mapping moves out before the remap or it would attach to
        // whichever new trade took its old id.
        tx.execute(
          "INSERT INTO orphaned_analysis
             (analysis_id, former_trade_id, conflict_score, confidence, reasoning,
              model_used, analysis_version, analyzed_at, orphaned_at)
           SELECT analysis_id, trade_id, conflict_score, confidence, reasoning,
                  model_used, analysis_version, analyzed_at, ?1
           FROM analysis
           WHERE trade_id IS NOT NULL
             AND trade_id NOT IN (SELECT old_id FROM temp.trade_id_map)",
          [&now],
        )?;
        let orphaned = tx.execute(
          "DELETE FROM analysis
           WHERE trade_id IS NOT NULL
             AND trade_id NOT IN (SELECT old_id FROM temp.trade_id_map)",
          [],
        )?;

        // One statement, so an old id that is also some other row's new id is
        // never rewritten twice.
        tx.execute(
          "UPDATE analysis
           SET trade_id = (SELECT new_id FROM temp.trade_id_map WHERE old_id = analysis.trade_id)
           WHERE trade_id IS NOT NULL",
          [],
        )?;
        tx.execute("DROP TABLE temp.trade_id_map", [])?;

        tx.execute(
          "UPDATE sessions SET trade_count =
             (SELECT COUNT(*) FROM trades WHERE trades.session_id = sessions.session_id)",
          [],
        )?;

        resolve_staged(&tx, rows.iter().map(|(id, _, _)| *id), StagingStatus::Promoted, &now)?;
        resolve_staged(&tx, duplicates.iter().copied(), StagingStatus::Duplicate, &now)?;

        tx.commit()?;
        Ok(orphaned)
      })
      .await?;
    if orphaned > 0 {
      debug!(orphaned, "moved analyses of deleted trades to orphaned_analysis");
    }
    Ok(())
  }
}
