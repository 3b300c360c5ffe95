use super::{record_from_row, EarningsStore, RECORD_COLUMNS};
use crate::{
    error::PipelineResult,
    record::{EarningsRecord, RevenueShares},
    types::{CreatorId, Period},
};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl EarningsStore {
    // ── Accumulation ──────────────────────────────────────────────

    pub fn record_exists(&self, creator_id: CreatorId, period: Period) -> PipelineResult<bool> {
        let found = self
            .conn
            .prepare_cached(
                "SELECT 1 FROM earnings WHERE creator_id = ?1 AND month = ?2 AND year = ?3",
            )?
            .query_row(params![creator_id, period.month, period.year], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a new record seeded with `shares`, or add `shares` onto the
    /// existing one. `gross` goes to total_gross either way.
    pub fn upsert_earnings(
        &self,
        creator_id: CreatorId,
        period: Period,
        shares: &RevenueShares,
        gross: f64,
        sentinel_name: &str,
    ) -> PipelineResult<UpsertOutcome> {
        if self.record_exists(creator_id, period)? {
            self.conn
                .prepare_cached(
                    "UPDATE earnings SET
                        ad_share            = ad_share + ?1,
                        sub_share           = sub_share + ?2,
                        bit_share           = bit_share + ?3,
                        bit_developer_share = bit_developer_share + ?4,
                        bit_extension_share = bit_extension_share + ?5,
                        prime_sub_share     = prime_sub_share + ?6,
                        bit_share_ad        = bit_share_ad + ?7,
                        fuel_revenue        = fuel_revenue + ?8,
                        bb_revenue          = bb_revenue + ?9,
                        total_gross         = total_gross + ?10
                     WHERE creator_id = ?11 AND month = ?12 AND year = ?13",
                )?
                .execute(params![
                    shares.ad_share,
                    shares.sub_share,
                    shares.bit_share,
                    shares.bit_developer_share,
                    shares.bit_extension_share,
                    shares.prime_sub_share,
                    shares.bit_share_ad,
                    shares.fuel_revenue,
                    shares.bb_revenue,
                    gross,
                    creator_id,
                    period.month,
                    period.year,
                ])?;
            Ok(UpsertOutcome::Updated)
        } else {
            self.conn
                .prepare_cached(
                    "INSERT INTO earnings (
                        creator_id, display_name, month, year,
                        ad_share, sub_share, bit_share, bit_developer_share, bit_extension_share,
                        prime_sub_share, bit_share_ad, fuel_revenue, bb_revenue, total_gross
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                )?
                .execute(params![
                    creator_id,
                    sentinel_name,
                    period.month,
                    period.year,
                    shares.ad_share,
                    shares.sub_share,
                    shares.bit_share,
                    shares.bit_developer_share,
                    shares.bit_extension_share,
                    shares.prime_sub_share,
                    shares.bit_share_ad,
                    shares.fuel_revenue,
                    shares.bb_revenue,
                    gross,
                ])?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn earnings_record(
        &self,
        creator_id: CreatorId,
        period: Period,
    ) -> PipelineResult<Option<EarningsRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM earnings
             WHERE creator_id = ?1 AND month = ?2 AND year = ?3"
        );
        let record = self
            .conn
            .query_row(&sql, params![creator_id, period.month, period.year], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// Every record of one creator, oldest period first.
    pub fn creator_records(&self, creator_id: CreatorId) -> PipelineResult<Vec<EarningsRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM earnings
             WHERE creator_id = ?1 ORDER BY year, month"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![creator_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Number of records persisted (for tests and summaries).
    pub fn record_count(&self) -> PipelineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM earnings", [], |row| row.get(0))?;
        Ok(count)
    }
}
