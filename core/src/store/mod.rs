//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The aggregator and the enricher call store methods and never execute SQL directly.

use crate::{
    error::PipelineResult,
    record::{EarningsRecord, RevenueShares},
    types::Period,
};
use rusqlite::{Connection, Row};

mod earnings;
mod enrichment;
mod search;

pub use earnings::UpsertOutcome;

pub struct EarningsStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// Column list matching `record_from_row`.
const RECORD_COLUMNS: &str = "creator_id, display_name, month, year,
    ad_share, sub_share, bit_share, bit_developer_share, bit_extension_share,
    prime_sub_share, bit_share_ad, fuel_revenue, bb_revenue, total_gross, view_count";

impl EarningsStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Drop and recreate the earnings table. Destroys every stored record.
    pub fn reset_schema(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_earnings.sql"))?;
        log::info!(
            "earnings schema reset ({})",
            self.path.as_deref().unwrap_or(":memory:")
        );
        Ok(())
    }

    /// Run `f` inside one transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn in_transaction<T, F>(&self, f: F) -> PipelineResult<T>
    where
        F: FnOnce() -> PipelineResult<T>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK;") {
                    log::warn!("rollback after failure also failed: {rollback}");
                }
                Err(err)
            }
        }
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<EarningsRecord> {
    Ok(EarningsRecord {
        creator_id: row.get(0)?,
        display_name: row.get(1)?,
        period: Period::new(row.get(2)?, row.get(3)?),
        shares: RevenueShares {
            ad_share: row.get(4)?,
            sub_share: row.get(5)?,
            bit_share: row.get(6)?,
            bit_developer_share: row.get(7)?,
            bit_extension_share: row.get(8)?,
            prime_sub_share: row.get(9)?,
            bit_share_ad: row.get(10)?,
            fuel_revenue: row.get(11)?,
            bb_revenue: row.get(12)?,
        },
        total_gross: row.get(13)?,
        view_count: row.get(14)?,
    })
}
