//! Store methods for simulation results and the per-attack loss log.

use crate::{
    engine::CompanyOutcome,
    error::SimResult,
    event::EventLogEntry,
    metrics::SimulationMetrics,
    revenue::MIN_REVENUE,
    simulator::LossRecord,
    types::{CompanyId, Industry, RevenueBand},
};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{insert_event_row, now_rfc3339, SimStore};

/// One persisted simulation_result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResultRow {
    pub run_id:     String,
    pub company_id: CompanyId,
    pub metrics:    SimulationMetrics,
    pub created_at: String,
}

impl SimStore {
    pub fn insert_result(
        &self,
        run_id:     &str,
        company_id: CompanyId,
        metrics:    &SimulationMetrics,
    ) -> SimResult<()> {
        insert_result_row(&self.conn, run_id, company_id, metrics)
    }

    /// Persist a batch of company outcomes and the events describing them
    /// as one transaction: either all of it lands or none of it does.
    pub fn commit_outcomes(
        &mut self,
        run_id:   &str,
        outcomes: &[CompanyOutcome],
        events:   &[EventLogEntry],
    ) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        for outcome in outcomes {
            insert_result_row(&tx, run_id, outcome.company_id, &outcome.metrics)?;
            if let Some(loss_log) = &outcome.loss_log {
                insert_loss_rows(&tx, run_id, outcome.company_id, loss_log)?;
            }
        }
        for entry in events {
            insert_event_row(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn results(&self, run_id: &str) -> SimResult<Vec<SimulationResultRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, company_id, total_loss, mean_loss, median_loss, std_dev_loss,
                    min_loss, max_loss, percentile_95_loss, created_at
             FROM simulation_result WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(SimulationResultRow {
                    run_id:     row.get(0)?,
                    company_id: row.get::<_, i64>(1)? as u64,
                    metrics: SimulationMetrics {
                        total_loss:         row.get(2)?,
                        mean_loss:          row.get(3)?,
                        median_loss:        row.get(4)?,
                        std_dev_loss:       row.get(5)?,
                        min_loss:           row.get(6)?,
                        max_loss:           row.get(7)?,
                        percentile_95_loss: row.get(8)?,
                    },
                    created_at: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn result_count(&self, run_id: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM simulation_result WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mean loss of the first stored simulation for a company.
    /// None when the company has no result in this run.
    pub fn mean_loss_for_company(&self, run_id: &str, company_id: CompanyId) -> SimResult<Option<f64>> {
        log::debug!("executing query for company_id={company_id}");
        let mean = self
            .conn
            .query_row(
                "SELECT mean_loss FROM simulation_result
                 WHERE run_id = ?1 AND company_id = ?2
                 ORDER BY id ASC LIMIT 1",
                params![run_id, company_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(mean)
    }

    /// Average mean loss over companies whose industry is listed and whose
    /// revenue falls in any listed band. None when no company matches.
    pub fn average_mean_loss_by_segmentation(
        &self,
        run_id:     &str,
        bands:      &[RevenueBand],
        industries: &[Industry],
    ) -> SimResult<Option<f64>> {
        if bands.is_empty() || industries.is_empty() {
            return Ok(None);
        }

        let mut values: Vec<Value> = vec![Value::Text(run_id.to_string()), Value::Text(run_id.to_string())];

        let industry_marks = vec!["?"; industries.len()].join(", ");
        values.extend(industries.iter().map(|i| Value::Text(i.as_str().to_string())));

        let band_clauses: Vec<&str> = bands
            .iter()
            .map(|band| {
                let (lower, upper) = band.bounds();
                values.push(Value::Real(lower));
                values.push(Value::Real(upper));
                // The first band owns its lower edge (revenue 0).
                if lower == MIN_REVENUE {
                    "(revenue_usd >= ? AND revenue_usd <= ?)"
                } else {
                    "(revenue_usd > ? AND revenue_usd <= ?)"
                }
            })
            .collect();

        let query = format!(
            "SELECT AVG(mean_loss) FROM simulation_result
             WHERE run_id = ? AND company_id IN (
                 SELECT company_id FROM company
                 WHERE run_id = ? AND industry IN ({industry_marks})
                   AND ({})
             )",
            band_clauses.join(" OR ")
        );
        log::debug!("full query for results by segmentation: {query}");

        let avg: Option<f64> = self
            .conn
            .query_row(&query, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(avg)
    }

    // ── Loss log ───────────────────────────────────────────────

    pub fn insert_loss_events(
        &mut self,
        run_id:     &str,
        company_id: CompanyId,
        records:    &[LossRecord],
    ) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        insert_loss_rows(&tx, run_id, company_id, records)?;
        tx.commit()?;
        Ok(())
    }

    pub fn loss_events(&self, run_id: &str, company_id: CompanyId) -> SimResult<Vec<LossRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT sim_run, attack_id, cost FROM loss_event
             WHERE run_id = ?1 AND company_id = ?2
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, company_id as i64], |row| {
                Ok(LossRecord {
                    run_id:    row.get::<_, i64>(0)? as u64,
                    attack_id: row.get::<_, i64>(1)? as u64,
                    cost:      row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn loss_event_count(&self, run_id: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM loss_event WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn insert_result_row(
    conn:       &Connection,
    run_id:     &str,
    company_id: CompanyId,
    metrics:    &SimulationMetrics,
) -> SimResult<()> {
    conn.execute(
        "INSERT INTO simulation_result
           (run_id, company_id, total_loss, mean_loss, median_loss, std_dev_loss,
            min_loss, max_loss, percentile_95_loss, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            run_id,
            company_id as i64,
            metrics.total_loss,
            metrics.mean_loss,
            metrics.median_loss,
            metrics.std_dev_loss,
            metrics.min_loss,
            metrics.max_loss,
            metrics.percentile_95_loss,
            now_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_loss_rows(
    conn:       &Connection,
    run_id:     &str,
    company_id: CompanyId,
    records:    &[LossRecord],
) -> SimResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO loss_event (run_id, company_id, sim_run, attack_id, cost)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for r in records {
        stmt.execute(params![
            run_id,
            company_id as i64,
            r.run_id as i64,
            r.attack_id as i64,
            r.cost,
        ])?;
    }
    Ok(())
}
