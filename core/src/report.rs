//! Display view over search results: every monetary figure rounded to cents,
//! plus totals across the matched records.

use crate::{
    record::EarningsRecord,
    types::CreatorId,
};
use serde::Serialize;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRow {
    pub creator_id: CreatorId,
    pub display_name: String,
    pub month: u32,
    pub year: i32,
    pub ad_share: f64,
    pub sub_share: f64,
    pub bit_share: f64,
    pub bit_developer_share: f64,
    pub bit_extension_share: f64,
    pub prime_sub_share: f64,
    pub bit_share_ad: f64,
    pub fuel_revenue: f64,
    pub bb_revenue: f64,
    pub total_gross: f64,
    pub view_count: Option<i64>,
}

impl From<&EarningsRecord> for SearchRow {
    fn from(r: &EarningsRecord) -> Self {
        let s = &r.shares;
        Self {
            creator_id: r.creator_id,
            display_name: r.display_name.clone(),
            month: r.period.month,
            year: r.period.year,
            ad_share: round2(s.ad_share),
            sub_share: round2(s.sub_share),
            bit_share: round2(s.bit_share),
            bit_developer_share: round2(s.bit_developer_share),
            bit_extension_share: round2(s.bit_extension_share),
            prime_sub_share: round2(s.prime_sub_share),
            bit_share_ad: round2(s.bit_share_ad),
            fuel_revenue: round2(s.fuel_revenue),
            bb_revenue: round2(s.bb_revenue),
            total_gross: round2(r.total_gross),
            view_count: r.view_count,
        }
    }
}

/// Totals are summed from unrounded values and rounded once at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchTotals {
    pub ad_share: f64,
    pub sub_share: f64,
    pub bit_share: f64,
    pub prime_sub_share: f64,
    pub total_gross: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub rows: Vec<SearchRow>,
    pub totals: SearchTotals,
}

impl SearchReport {
    pub fn from_records(query: &str, records: &[EarningsRecord]) -> Self {
        let mut totals = SearchTotals::default();
        for r in records {
            totals.ad_share += r.shares.ad_share;
            totals.sub_share += r.shares.sub_share;
            totals.bit_share += r.shares.bit_share;
            totals.prime_sub_share += r.shares.prime_sub_share;
            totals.total_gross += r.total_gross;
        }
        Self {
            query: query.to_string(),
            rows: records.iter().map(SearchRow::from).collect(),
            totals: SearchTotals {
                ad_share: round2(totals.ad_share),
                sub_share: round2(totals.sub_share),
                bit_share: round2(totals.bit_share),
                prime_sub_share: round2(totals.prime_sub_share),
                total_gross: round2(totals.total_gross),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(7.0), 7.0);
        assert_eq!(round2(-0.004), -0.0);
    }
}
