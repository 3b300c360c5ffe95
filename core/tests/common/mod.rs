//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use earnings_core::{
    lookup::{DirectoryEntry, DirectoryLookup, LookupError},
    store::EarningsStore,
    types::CreatorId,
};
use flate2::{write::GzEncoder, Compression};
use std::{
    cell::RefCell,
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

pub const HEADER: &str = "user_id,login,ad_share,sub_share,bit_share,bit_developer_share,\
bit_extension_share,prime_sub_share,bit_share_ad,fuel_rev,bb_rev,report_date,experimental";

pub fn store() -> EarningsStore {
    let store = EarningsStore::in_memory().expect("in-memory store");
    store.reset_schema().expect("schema");
    store
}

/// One archive line: id, login, nine amounts, date at index 11, one trailing column.
pub fn row(creator_id: CreatorId, amounts: [f64; 9], date: &str) -> String {
    let amounts: Vec<String> = amounts.iter().map(|a| format!("{a:.2}")).collect();
    format!("{creator_id},login{creator_id},{},{date},0", amounts.join(","))
}

pub fn csv_body(rows: &[String]) -> String {
    let mut body = String::from(HEADER);
    body.push('\n');
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    body
}

/// Write `rows` (after the header) as a gzip archive at `path`, creating parents.
pub fn write_archive(path: &Path, rows: &[String]) -> PathBuf {
    std::fs::create_dir_all(path.parent().expect("archive parent")).expect("mkdir");
    let file = std::fs::File::create(path).expect("create archive");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(csv_body(rows).as_bytes())
        .expect("write archive");
    encoder.finish().expect("finish gzip");
    path.to_path_buf()
}

/// Minimal valid data root: `2019/08/28/all_revenues.csv.gz` with `rows`.
pub fn data_root(root: &Path, rows: &[String]) -> PathBuf {
    write_archive(&root.join("2019/08/28/all_revenues.csv.gz"), rows)
}

/// Directory double. Records every call; answers from a fixed table.
#[derive(Default)]
pub struct FakeDirectory {
    pub users: HashMap<CreatorId, (Option<String>, Option<i64>)>,
    pub calls: RefCell<Vec<Vec<CreatorId>>>,
    /// 1-based call number that fails with a request error.
    pub fail_on_call: Option<usize>,
}

impl FakeDirectory {
    pub fn knowing(ids: impl IntoIterator<Item = CreatorId>) -> Self {
        Self {
            users: ids
                .into_iter()
                .map(|id| (id, (Some(format!("creator_{id}")), Some(id * 10))))
                .collect(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl DirectoryLookup for FakeDirectory {
    fn resolve(&self, ids: &[CreatorId]) -> Result<Vec<DirectoryEntry>, LookupError> {
        self.calls.borrow_mut().push(ids.to_vec());
        if self.fail_on_call == Some(self.call_count()) {
            return Err(LookupError::Request("HTTP 503".into()));
        }
        // Reverse order: callers must not depend on response order.
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| {
                self.users.get(id).map(|(name, views)| DirectoryEntry {
                    id: *id,
                    display_name: name.clone(),
                    view_count: *views,
                })
            })
            .collect())
    }
}
