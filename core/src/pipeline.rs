//! The two phases, wired end to end.
//!
//! ORDER (fixed):
//!   merge       : locate archives, reset the store, fold every file in
//!   enrichment  : resolve sentinel names against the directory
//!
//! The phases never overlap. Merge is one-shot: an existing output database
//! short-circuits it unless truncation was asked for.

use crate::{
    aggregator::{Aggregator, FileSummary},
    config::{EnrichmentConfig, MergeConfig},
    enrichment::{Enricher, EnrichmentReport},
    error::{PipelineError, PipelineResult},
    locator::ArchiveLocator,
    lookup::DirectoryLookup,
    report::SearchReport,
    store::EarningsStore,
};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub files: usize,
    pub rows_read: usize,
    pub skipped_malformed: usize,
    pub skipped_no_period: usize,
    pub skipped_zero_gross: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl MergeSummary {
    fn absorb(&mut self, file: &FileSummary) {
        self.files += 1;
        self.rows_read += file.rows_read;
        self.skipped_malformed += file.skipped_malformed;
        self.skipped_no_period += file.skipped_no_period;
        self.skipped_zero_gross += file.skipped_zero_gross;
        self.inserted += file.inserted;
        self.updated += file.updated;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    AlreadyMerged,
    Merged(MergeSummary),
}

/// Build the output database from every archive under `data_path`.
pub fn run_merge(
    data_path: &Path,
    output_db: &Path,
    config: &MergeConfig,
    sentinel_name: &str,
) -> PipelineResult<MergeOutcome> {
    if config.truncate && output_db.exists() {
        log::info!("truncate: removing {}", output_db.display());
        std::fs::remove_file(output_db).map_err(|source| PipelineError::Truncate {
            path: output_db.to_path_buf(),
            source,
        })?;
    }
    if output_db.exists() {
        log::info!("Database already exists: {}", output_db.display());
        return Ok(MergeOutcome::AlreadyMerged);
    }

    // Everything up to here is read-only; the database file is only created
    // once the input is known to be usable.
    let locator = ArchiveLocator::new(&config.layout, &config.archive_suffix);
    locator.check_layout(data_path)?;
    let archives = locator.find_archives(data_path);
    if archives.is_empty() {
        return Err(PipelineError::NoArchives {
            root: data_path.to_path_buf(),
        });
    }

    let store = EarningsStore::open(&output_db.to_string_lossy())?;
    store.reset_schema()?;

    let aggregator = Aggregator::new(&store, sentinel_name, config.period_mode);
    let total = archives.len();
    let mut summary = MergeSummary::default();
    for (index, archive) in archives.iter().enumerate() {
        log::info!("Processing archive file: [{index}] {}", archive.display());
        let file = aggregator.process(archive)?;
        summary.absorb(&file);
        log::info!(
            "Processed {}/{total} files ({} rows, {} accepted)",
            index + 1,
            file.rows_read,
            file.accepted()
        );
    }

    log::info!(
        "merge done: {} records from {} files",
        store.record_count()?,
        summary.files
    );
    Ok(MergeOutcome::Merged(summary))
}

/// Resolve sentinel names in an existing output database.
pub fn run_enrichment<L: DirectoryLookup + ?Sized>(
    output_db: &Path,
    lookup: &L,
    config: &EnrichmentConfig,
) -> PipelineResult<EnrichmentReport> {
    if !output_db.exists() {
        return Err(anyhow::anyhow!("no output database at {}", output_db.display()).into());
    }
    let store = EarningsStore::open(&output_db.to_string_lossy())?;
    Enricher::new(&store, lookup, config).run()
}

/// Name search over an existing output database. A blank query matches nothing.
pub fn search(output_db: &Path, query: &str) -> PipelineResult<SearchReport> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchReport::from_records(query, &[]));
    }
    if !output_db.exists() {
        return Err(anyhow::anyhow!("no output database at {}", output_db.display()).into());
    }
    let store = EarningsStore::open(&output_db.to_string_lossy())?;
    let records = store.search_by_name(query)?;
    log::info!("Found {} rows for {query:?}", records.len());
    Ok(SearchReport::from_records(query, &records))
}
