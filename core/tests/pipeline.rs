//! End-to-end merge, enrichment and search over a real database file.
//!
//! Tests cover: layout validation, archive discovery, one-shot merge,
//! truncation, partial runs, and the search view.

mod common;

use common::{data_root, row, write_archive, FakeDirectory};
use earnings_core::{
    config::{LayoutConfig, MergeConfig, PipelineConfig},
    enrichment::EnrichmentStatus,
    error::PipelineError,
    locator::ArchiveLocator,
    pipeline::{self, MergeOutcome},
    store::EarningsStore,
    types::{Period, ARCHIVE_SUFFIX, SENTINEL_NAME},
};
use std::path::Path;

fn merge(data: &Path, db: &Path, config: &MergeConfig) -> Result<MergeOutcome, PipelineError> {
    pipeline::run_merge(data, db, config, SENTINEL_NAME)
}

fn amounts(ad: f64) -> [f64; 9] {
    [ad, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
}

#[test]
fn locator_finds_only_archives_in_walk_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_archive(&root.join("2019/08/28/all_revenues.csv.gz"), &[]);
    write_archive(&root.join("2019/09/01/all_revenues.csv.gz"), &[]);
    write_archive(&root.join("2020/01/02/extra.csv.gz"), &[]);
    std::fs::write(root.join("2019/08/28/notes.csv"), "x").unwrap();
    std::fs::write(root.join("2019/readme.gz"), "x").unwrap();

    let layout = LayoutConfig::default();
    let locator = ArchiveLocator::new(&layout, ARCHIVE_SUFFIX);
    let found: Vec<String> = locator
        .find_archives(root)
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();

    assert_eq!(
        found,
        vec![
            "2019/08/28/all_revenues.csv.gz",
            "2019/09/01/all_revenues.csv.gz",
            "2020/01/02/extra.csv.gz",
        ]
    );
}

#[test]
fn layout_check_requires_year_and_sample_path() {
    let dir = tempfile::tempdir().unwrap();
    let layout = LayoutConfig::default();
    let locator = ArchiveLocator::new(&layout, ARCHIVE_SUFFIX);

    assert!(matches!(
        locator.check_layout(dir.path()),
        Err(PipelineError::InvalidLayout { .. })
    ));
    std::fs::create_dir_all(dir.path().join("2019/08")).unwrap();
    assert!(locator.check_layout(dir.path()).is_err());
    std::fs::create_dir_all(dir.path().join("2019/08/28")).unwrap();
    assert!(locator.check_layout(dir.path()).is_ok());
}

#[test]
fn invalid_layout_aborts_before_database_exists() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(&dir.path().join("data/2018/01/01/all_revenues.csv.gz"), &[]);
    let db = dir.path().join("out.db");

    let err = merge(&dir.path().join("data"), &db, &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidLayout { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!db.exists());
}

#[test]
fn no_archives_is_a_hard_stop() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("data/2019/08/28")).unwrap();
    let db = dir.path().join("out.db");

    let err = merge(&dir.path().join("data"), &db, &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::NoArchives { .. }));
    assert!(!db.exists());
}

#[test]
fn merge_is_one_shot_unless_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    data_root(&data, &[row(1, amounts(2.5), "8/28/2019"), row(2, amounts(1.0), "8/28/2019")]);
    write_archive(
        &data.join("2019/09/28/all_revenues.csv.gz"),
        &[row(1, amounts(4.0), "9/28/2019")],
    );
    let db = dir.path().join("out.db");

    let summary = match merge(&data, &db, &MergeConfig::default()).unwrap() {
        MergeOutcome::Merged(summary) => summary,
        other => panic!("expected a merge, got {other:?}"),
    };
    assert_eq!(summary.files, 2);
    assert_eq!(summary.inserted, 3);

    // Second run sees the database and does nothing.
    assert_eq!(
        merge(&data, &db, &MergeConfig::default()).unwrap(),
        MergeOutcome::AlreadyMerged
    );
    let store = EarningsStore::open(&db.to_string_lossy()).unwrap();
    let record = store.earnings_record(1, Period::new(8, 2019)).unwrap().unwrap();
    assert!((record.total_gross - 2.5).abs() < 1e-9);
    drop(store);

    // Truncation rebuilds from scratch rather than accumulating on top.
    let truncating = MergeConfig {
        truncate: true,
        ..MergeConfig::default()
    };
    assert!(matches!(merge(&data, &db, &truncating).unwrap(), MergeOutcome::Merged(_)));
    let store = EarningsStore::open(&db.to_string_lossy()).unwrap();
    let record = store.earnings_record(1, Period::new(8, 2019)).unwrap().unwrap();
    assert!((record.total_gross - 2.5).abs() < 1e-9);
    assert_eq!(store.record_count().unwrap(), 3);
}

/// A later corrupt archive ends the run, but files already folded in stay
/// committed.
#[test]
fn failure_on_a_later_file_keeps_earlier_files() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    data_root(&data, &[row(1, amounts(2.5), "8/28/2019")]);
    std::fs::create_dir_all(data.join("2019/09")).unwrap();
    std::fs::write(data.join("2019/09/bad.csv.gz"), b"not gzip at all").unwrap();
    let db = dir.path().join("out.db");

    let err = merge(&data, &db, &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::ArchiveRead { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 6);

    let store = EarningsStore::open(&db.to_string_lossy()).unwrap();
    assert_eq!(store.record_count().unwrap(), 1);
    let record = store.earnings_record(1, Period::new(8, 2019)).unwrap().unwrap();
    assert!((record.total_gross - 2.5).abs() < 1e-9);
}

#[test]
fn merge_enrich_search_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    data_root(
        &data,
        &[
            row(1001, [1.25, 0.5, 2.0, 0.0, 0.0, 3.33, 0.0, 0.0, 0.0], "8/28/2019"),
            row(2002, amounts(9.0), "8/28/2019"),
        ],
    );
    write_archive(
        &data.join("2019/07/28/all_revenues.csv.gz"),
        &[row(1001, amounts(1.0), "7/28/2019")],
    );
    let db = dir.path().join("out.db");
    merge(&data, &db, &MergeConfig::default()).unwrap();

    let mut directory = FakeDirectory::default();
    directory.users.insert(1001, (Some("xxabcxx".into()), Some(77)));
    directory.users.insert(2002, (Some("other".into()), Some(5)));
    let config = PipelineConfig::default_test();
    let report = pipeline::run_enrichment(&db, &directory, &config.enrichment).unwrap();
    assert_eq!(report.status, EnrichmentStatus::Completed);
    assert_eq!(report.updated_records, 3);

    let found = pipeline::search(&db, "abc").unwrap();
    assert_eq!(found.rows.len(), 2);
    assert!(found.rows.iter().all(|r| r.creator_id == 1001));
    assert_eq!((found.rows[0].year, found.rows[0].month), (2019, 7));
    assert_eq!((found.rows[1].year, found.rows[1].month), (2019, 8));
    assert_eq!(found.rows[1].ad_share, 1.25);
    assert_eq!(found.rows[1].prime_sub_share, 3.33);
    assert_eq!(found.rows[1].total_gross, 7.08);
    assert_eq!(found.rows[1].view_count, Some(77));
    assert_eq!(found.totals.ad_share, 2.25);
    assert_eq!(found.totals.prime_sub_share, 3.33);
    assert_eq!(found.totals.total_gross, 8.08);

    // Case-insensitive substring, blank query matches nothing.
    assert_eq!(pipeline::search(&db, "ABC").unwrap().rows.len(), 2);
    assert!(pipeline::search(&db, "   ").unwrap().is_empty());
    assert!(pipeline::search(&db, "zzz").unwrap().is_empty());
}
