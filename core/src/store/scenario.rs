use super::RatingStore;
use crate::{
    error::RatingResult,
    scenario::{Scenario, ScenarioSummary},
};
use rusqlite::{params, OptionalExtension};

impl RatingStore {
    // ── Scenario ───────────────────────────────────────────────

    /// Insert or refresh a scenario's body. Summary fields are seeded from
    /// the aggregate on first insert and left alone afterwards.
    pub fn upsert_scenario(&self, scenario: &Scenario) -> RatingResult<()> {
        let json = serde_json::to_string(scenario)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scenario (
                scenario_id, product_type, scenario_json,
                best_quoted_premium, total_quotes_received
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(scenario_id) DO UPDATE SET
                product_type  = excluded.product_type,
                scenario_json = excluded.scenario_json",
            params![
                scenario.scenario_id,
                scenario.product_type,
                json,
                scenario.best_quoted_premium,
                scenario.total_quotes_received as i64,
            ],
        )?;
        Ok(())
    }

    /// Make sure a summary row exists, seeded from the aggregate.
    /// An existing row is never touched.
    pub fn ensure_scenario(&self, scenario: &Scenario) -> RatingResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scenario (
                scenario_id, product_type, best_quoted_premium, total_quotes_received
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(scenario_id) DO NOTHING",
            params![
                scenario.scenario_id,
                scenario.product_type,
                scenario.best_quoted_premium,
                scenario.total_quotes_received as i64,
            ],
        )?;
        Ok(())
    }

    /// The stored scenario with its current summary fields.
    pub fn load_scenario(&self, scenario_id: &str) -> RatingResult<Option<Scenario>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT scenario_json, best_quoted_premium, total_quotes_received
                 FROM scenario WHERE scenario_id = ?1",
                params![scenario_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((Some(json), best, total)) = row else {
            return Ok(None);
        };
        let mut scenario: Scenario = serde_json::from_str(&json)?;
        scenario.best_quoted_premium = best;
        scenario.total_quotes_received = total as u32;
        Ok(Some(scenario))
    }

    /// Record one successful quote: keep the lower best premium and count it.
    /// A single statement, so concurrent writers cannot interleave halves.
    pub fn apply_rating_result(
        &self,
        scenario_id: &str,
        monthly_premium: f64,
    ) -> RatingResult<ScenarioSummary> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scenario (scenario_id, best_quoted_premium, total_quotes_received)
             VALUES (?1, ?2, 1)
             ON CONFLICT(scenario_id) DO UPDATE SET
                best_quoted_premium = CASE
                    WHEN best_quoted_premium IS NULL
                      OR excluded.best_quoted_premium < best_quoted_premium
                    THEN excluded.best_quoted_premium
                    ELSE best_quoted_premium
                END,
                total_quotes_received = total_quotes_received + 1",
            params![scenario_id, monthly_premium],
        )?;
        let summary = conn.query_row(
            "SELECT scenario_id, best_quoted_premium, total_quotes_received
             FROM scenario WHERE scenario_id = ?1",
            params![scenario_id],
            |row| {
                Ok(ScenarioSummary {
                    scenario_id:           row.get(0)?,
                    best_quoted_premium:   row.get(1)?,
                    total_quotes_received: row.get::<_, i64>(2)? as u32,
                })
            },
        )?;
        Ok(summary)
    }

    pub fn scenario_summary(&self, scenario_id: &str) -> RatingResult<Option<ScenarioSummary>> {
        let conn = self.conn()?;
        let summary = conn
            .query_row(
                "SELECT scenario_id, best_quoted_premium, total_quotes_received
                 FROM scenario WHERE scenario_id = ?1",
                params![scenario_id],
                |row| {
                    Ok(ScenarioSummary {
                        scenario_id:           row.get(0)?,
                        best_quoted_premium:   row.get(1)?,
                        total_quotes_received: row.get::<_, i64>(2)? as u32,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }
}
