//! Store methods for the synthetic company population.

use crate::{
    company::CompanyRecord,
    error::{SimError, SimResult},
    types::Industry,
};
use rusqlite::params;

use super::SimStore;

impl SimStore {
    /// Replace the run's company population in one transaction.
    pub fn replace_companies(&mut self, run_id: &str, companies: &[CompanyRecord]) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM company WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO company (run_id, company_id, revenue_usd, industry, revenue_band)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for c in companies {
                let band = c.revenue_band().ok().map(|b| b.label());
                stmt.execute(params![
                    run_id,
                    c.company_id as i64,
                    c.revenue_usd,
                    c.industry.as_str(),
                    band,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn companies(&self, run_id: &str) -> SimResult<Vec<CompanyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT company_id, revenue_usd, industry
             FROM company WHERE run_id = ?1
             ORDER BY company_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, revenue_usd, industry)| {
                Ok(CompanyRecord {
                    company_id: id as u64,
                    revenue_usd,
                    industry: industry.parse::<Industry>()?,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()
    }

    pub fn company_count(&self, run_id: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM company WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
