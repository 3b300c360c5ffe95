//! Aggregator: folds archive rows into per-creator monthly records.
//!
//! Per file:
//!   1. gunzip + CSV, first line discarded
//!   2. shape check (≥ 12 columns, non-empty UTF-8 date), failures skipped
//!   3. period from the file's period resolver, unresolved rows skipped
//!   4. gross of columns 2..=10, zero-gross rows skipped
//!   5. upsert on (creator_id, month, year)
//!   6. commit once the whole file is consumed
//!
//! Only the id, amount and date columns are decoded. Any I/O or database
//! failure is returned as-is and ends the run.

use crate::{
    error::{PipelineError, PipelineResult},
    period::PeriodMode,
    record::{check_shape, RawRevenueRow, RowRejection},
    store::{EarningsStore, UpsertOutcome},
};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

/// Row counts for one processed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    /// Data rows seen, header excluded.
    pub rows_read: usize,
    pub skipped_malformed: usize,
    pub skipped_no_period: usize,
    pub skipped_zero_gross: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl FileSummary {
    pub fn accepted(&self) -> usize {
        self.inserted + self.updated
    }

    fn reject(&mut self, rejection: &RowRejection) {
        match rejection {
            RowRejection::NoPeriod => self.skipped_no_period += 1,
            RowRejection::ZeroGross => self.skipped_zero_gross += 1,
            _ => self.skipped_malformed += 1,
        }
    }
}

pub struct Aggregator<'a> {
    store: &'a EarningsStore,
    sentinel_name: &'a str,
    period_mode: PeriodMode,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a EarningsStore, sentinel_name: &'a str, period_mode: PeriodMode) -> Self {
        Self {
            store,
            sentinel_name,
            period_mode,
        }
    }

    /// Open a gzip archive and fold it into the store as one transaction.
    pub fn process(&self, path: &Path) -> PipelineResult<FileSummary> {
        let file = File::open(path).map_err(|source| PipelineError::ArchiveOpen {
            path: path.to_path_buf(),
            source,
        })?;
        self.process_reader(path, GzDecoder::new(BufReader::new(file)))
    }

    /// Same as `process` over already-decompressed CSV bytes. `path` only
    /// labels errors and the summary.
    pub fn process_reader<R: Read>(&self, path: &Path, reader: R) -> PipelineResult<FileSummary> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let read_error = |source: csv::Error| PipelineError::ArchiveRead {
            path: path.to_path_buf(),
            source,
        };

        let mut summary = FileSummary {
            path: path.to_path_buf(),
            ..FileSummary::default()
        };
        let mut resolver = self.period_mode.resolver();

        self.store.in_transaction(|| {
            let mut records = csv.byte_records();

            // Header line, discarded unconditionally.
            if let Some(header) = records.next() {
                header.map_err(read_error)?;
            }

            for result in records {
                let record = result.map_err(read_error)?;
                summary.rows_read += 1;

                let accepted = check_shape(&record).and_then(|date| {
                    let period = resolver.resolve(date).ok_or(RowRejection::NoPeriod)?;
                    let row = RawRevenueRow::parse(&record)?;
                    let gross = row.gross();
                    if gross == 0.0 {
                        return Err(RowRejection::ZeroGross);
                    }
                    Ok((row, period, gross))
                });

                let (row, period, gross) = match accepted {
                    Ok(accepted) => accepted,
                    Err(rejection) => {
                        match rejection {
                            RowRejection::NoPeriod | RowRejection::ZeroGross => {
                                log::debug!("row {} skipped: {rejection}", summary.rows_read)
                            }
                            _ => log::warn!(
                                "Invalid row {} in {}: {rejection}: {:?}",
                                summary.rows_read,
                                path.display(),
                                record
                            ),
                        }
                        summary.reject(&rejection);
                        continue;
                    }
                };

                match self.store.upsert_earnings(
                    row.creator_id,
                    period,
                    &row.shares,
                    gross,
                    self.sentinel_name,
                )? {
                    UpsertOutcome::Inserted => summary.inserted += 1,
                    UpsertOutcome::Updated => summary.updated += 1,
                }
            }
            Ok(())
        })?;

        if summary.skipped_no_period == summary.rows_read && summary.rows_read > 0 {
            log::warn!("{}: no period could be resolved, every row skipped", path.display());
        }
        Ok(summary)
    }
}
