//! Store methods for the name enrichment phase.

use super::EarningsStore;
use crate::{error::PipelineResult, record::Resolution, types::CreatorId};
use rusqlite::params;

impl EarningsStore {
    /// Distinct creators whose name is still the sentinel.
    pub fn unresolved_count(&self, sentinel_name: &str) -> PipelineResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT creator_id) FROM earnings WHERE display_name = ?1",
            params![sentinel_name],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Up to `limit` unresolved creator ids, lowest id first.
    pub fn load_unresolved(
        &self,
        sentinel_name: &str,
        limit: usize,
    ) -> PipelineResult<Vec<CreatorId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT creator_id FROM earnings
             WHERE display_name = ?1
             ORDER BY creator_id
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let ids = stmt.query_map(params![sentinel_name, limit], |row| row.get(0))?;
        ids.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Write names and view counts onto every record of each creator.
    /// Returns the number of records touched. Callers wrap this in a transaction.
    pub fn write_back_resolutions(&self, resolutions: &[Resolution]) -> PipelineResult<usize> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE earnings SET display_name = ?1, view_count = ?2 WHERE creator_id = ?3",
        )?;
        let mut touched = 0;
        for r in resolutions {
            touched += stmt.execute(params![r.display_name, r.view_count, r.creator_id])?;
        }
        Ok(touched)
    }
}
