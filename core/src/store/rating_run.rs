use super::RatingStore;
use crate::{
    error::RatingResult,
    run::{RatingRun, RunStatus},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, OptionalExtension, Row};

const RUN_COLUMNS: &str = "id, run_id, scenario_id, user_id, product_type, rate_table_version,
     engine_version, input_hash, input_snapshot, output_snapshot,
     final_premium_annual, final_premium_monthly, status, error_message,
     duration_ms, created_at";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RatingRun> {
    let status: String = row.get(12)?;
    let created_at: String = row.get(15)?;
    Ok(RatingRun {
        id:                    Some(row.get(0)?),
        run_id:                row.get(1)?,
        scenario_id:           row.get(2)?,
        user_id:               row.get(3)?,
        product_type:          row.get(4)?,
        rate_table_version:    row.get(5)?,
        engine_version:        row.get(6)?,
        input_hash:            row.get(7)?,
        input_snapshot:        row.get(8)?,
        output_snapshot:       row.get(9)?,
        final_premium_annual:  row.get(10)?,
        final_premium_monthly: row.get(11)?,
        status: status
            .parse::<RunStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, e.into()))?,
        error_message:         row.get(13)?,
        duration_ms:           row.get::<_, i64>(14)? as u64,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))?,
    })
}

impl RatingStore {
    // ── Rating run ledger ──────────────────────────────────────

    /// Append one run. Returns the new row id.
    pub fn append_rating_run(&self, run: &RatingRun) -> RatingResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO rating_run (
                run_id, scenario_id, user_id, product_type, rate_table_version,
                engine_version, input_hash, input_snapshot, output_snapshot,
                final_premium_annual, final_premium_monthly, status, error_message,
                duration_ms, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                run.run_id,
                run.scenario_id,
                run.user_id,
                run.product_type,
                run.rate_table_version,
                run.engine_version,
                run.input_hash,
                run.input_snapshot,
                run.output_snapshot,
                run.final_premium_annual,
                run.final_premium_monthly,
                run.status.as_str(),
                run.error_message,
                run.duration_ms as i64,
                run.created_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn rating_run(&self, run_id: &str) -> RatingResult<Option<RatingRun>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM rating_run WHERE run_id = ?1"),
                params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// All runs for a scenario, oldest first.
    pub fn runs_for_scenario(&self, scenario_id: &str) -> RatingResult<Vec<RatingRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM rating_run WHERE scenario_id = ?1 ORDER BY id ASC"
        ))?;
        let runs = stmt
            .query_map(params![scenario_id], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    pub fn run_count(&self) -> RatingResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM rating_run", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn run_count_by_status(&self, status: RunStatus) -> RatingResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM rating_run WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
