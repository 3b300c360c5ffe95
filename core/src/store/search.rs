use super::{record_from_row, EarningsStore, RECORD_COLUMNS};
use crate::{error::PipelineResult, record::EarningsRecord};
use rusqlite::params;

impl EarningsStore {
    /// Records whose display name contains `fragment` (ASCII case-insensitive),
    /// ordered by year then month. `%` and `_` in the fragment match literally.
    pub fn search_by_name(&self, fragment: &str) -> PipelineResult<Vec<EarningsRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM earnings
             WHERE display_name LIKE ?1 ESCAPE '\\'
             ORDER BY year, month, creator_id"
        );
        let pattern = format!("%{}%", escape_like(fragment));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(escape_like("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_like("plain"), "plain");
    }
}
