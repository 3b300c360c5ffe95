//! Shared primitive types and fixed constants of the archive format.

use serde::{Deserialize, Serialize};

/// Numeric identifier of a revenue-earning creator account.
pub type CreatorId = i64;

/// Placeholder display name for records not yet enriched.
pub const SENTINEL_NAME: &str = "...";

/// Maximum ids the directory service accepts per call.
pub const LOOKUP_CAP: usize = 100;

pub const ARCHIVE_SUFFIX: &str = ".csv.gz";

// ── Archive column layout ─────────────────────────────────────

pub const CREATOR_ID_COLUMN: usize = 0;
pub const FIRST_REVENUE_COLUMN: usize = 2;
pub const REVENUE_COLUMN_COUNT: usize = 9;
pub const DATE_COLUMN: usize = 11;
/// Rows shorter than this are rejected before anything else is read.
pub const MIN_COLUMNS: usize = DATE_COLUMN + 1;

/// The month/year an archive row is accounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Self {
        Self { year, month }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
