//! Creator earnings: merges monthly revenue archives into a SQLite store and
//! enriches the stored creators with directory display names.

pub mod aggregator;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod locator;
pub mod lookup;
pub mod period;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod store;
pub mod types;
