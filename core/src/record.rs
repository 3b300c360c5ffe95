//! Revenue rows as read from archives and the aggregated records they fold into.

use crate::types::{
    CreatorId, Period, CREATOR_ID_COLUMN, DATE_COLUMN, FIRST_REVENUE_COLUMN, MIN_COLUMNS,
    REVENUE_COLUMN_COUNT,
};
use csv::ByteRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single archive row was skipped. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowRejection {
    #[error("only {0} columns, date column missing")]
    TooFewColumns(usize),

    #[error("date column is empty")]
    EmptyDate,

    #[error("column {0} is not valid UTF-8")]
    NotUtf8(usize),

    #[error("no period resolved for this file")]
    NoPeriod,

    #[error("creator id {0:?} is not an integer")]
    BadCreatorId(String),

    #[error("column {column} holds non-numeric amount {value:?}")]
    BadAmount { column: usize, value: String },

    #[error("zero gross revenue")]
    ZeroGross,
}

/// The nine monetary share columns, in archive order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueShares {
    pub ad_share: f64,
    pub sub_share: f64,
    pub bit_share: f64,
    pub bit_developer_share: f64,
    pub bit_extension_share: f64,
    pub prime_sub_share: f64,
    pub bit_share_ad: f64,
    pub fuel_revenue: f64,
    pub bb_revenue: f64,
}

impl RevenueShares {
    pub fn from_array(v: [f64; REVENUE_COLUMN_COUNT]) -> Self {
        Self {
            ad_share: v[0],
            sub_share: v[1],
            bit_share: v[2],
            bit_developer_share: v[3],
            bit_extension_share: v[4],
            prime_sub_share: v[5],
            bit_share_ad: v[6],
            fuel_revenue: v[7],
            bb_revenue: v[8],
        }
    }

    pub fn to_array(&self) -> [f64; REVENUE_COLUMN_COUNT] {
        [
            self.ad_share,
            self.sub_share,
            self.bit_share,
            self.bit_developer_share,
            self.bit_extension_share,
            self.prime_sub_share,
            self.bit_share_ad,
            self.fuel_revenue,
            self.bb_revenue,
        ]
    }

    /// Sum of all nine shares.
    pub fn gross(&self) -> f64 {
        self.to_array().iter().sum()
    }
}

/// Trimmed text of one column. Columns the pipeline never reads are not
/// decoded, so bad bytes there cannot reject the row.
fn field(record: &ByteRecord, column: usize) -> Result<&str, RowRejection> {
    let bytes = record
        .get(column)
        .ok_or(RowRejection::TooFewColumns(record.len()))?;
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|_| RowRejection::NotUtf8(column))
}

/// Shape check shared by every row: enough columns and a non-empty date.
/// Returns the raw date field on success.
pub fn check_shape(record: &ByteRecord) -> Result<&str, RowRejection> {
    if record.len() < MIN_COLUMNS {
        return Err(RowRejection::TooFewColumns(record.len()));
    }
    match field(record, DATE_COLUMN)? {
        "" => Err(RowRejection::EmptyDate),
        date => Ok(date),
    }
}

/// One parsed archive line. Lives only while its file is being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRevenueRow {
    pub creator_id: CreatorId,
    pub shares: RevenueShares,
}

impl RawRevenueRow {
    /// Parse the id and amount columns of a row that already passed `check_shape`.
    pub fn parse(record: &ByteRecord) -> Result<Self, RowRejection> {
        let id_field = field(record, CREATOR_ID_COLUMN)?;
        let creator_id = id_field
            .parse::<CreatorId>()
            .map_err(|_| RowRejection::BadCreatorId(id_field.to_string()))?;

        let mut amounts = [0.0f64; REVENUE_COLUMN_COUNT];
        for (offset, slot) in amounts.iter_mut().enumerate() {
            let column = FIRST_REVENUE_COLUMN + offset;
            let value = field(record, column)?;
            *slot = value.parse::<f64>().map_err(|_| RowRejection::BadAmount {
                column,
                value: value.to_string(),
            })?;
        }

        Ok(Self {
            creator_id,
            shares: RevenueShares::from_array(amounts),
        })
    }

    pub fn gross(&self) -> f64 {
        self.shares.gross()
    }
}

/// One persisted aggregate: a creator's earnings for a single month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsRecord {
    pub creator_id: CreatorId,
    pub display_name: String,
    pub period: Period,
    pub shares: RevenueShares,
    pub total_gross: f64,
    pub view_count: Option<i64>,
}

/// A directory answer ready to be written back to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub creator_id: CreatorId,
    pub display_name: String,
    pub view_count: Option<i64>,
}
