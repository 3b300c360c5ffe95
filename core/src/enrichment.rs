//! Enrichment: fills in display names and view counts for creators the merge
//! left with the sentinel name.
//!
//! One step: load a slice of unresolved ids → partition into buckets no larger
//! than the directory cap → resolve every bucket → write everything back in
//! one transaction. A pass is all-or-nothing: the first failed bucket aborts
//! it and nothing from that pass reaches the store.
//!
//! Steps repeat while more than one step's worth of creators is still
//! unresolved.

use crate::{
    config::EnrichmentConfig,
    error::PipelineResult,
    lookup::DirectoryLookup,
    record::Resolution,
    store::EarningsStore,
    types::CreatorId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketStrategy {
    /// `(U / cap) + 1` buckets when `U > cap`, else 1, plus one more;
    /// ids dealt round-robin.
    #[default]
    RoundRobin,
    /// `ceil(U / cap)` consecutive full-size buckets.
    Tiled,
}

/// Number of buckets the round-robin strategy deals `unresolved` ids into.
/// A zero cap is treated as a cap of one.
pub fn round_robin_bucket_count(unresolved: usize, cap: usize) -> usize {
    let cap = cap.max(1);
    let base = if unresolved > cap { unresolved / cap + 1 } else { 1 };
    base + 1
}

pub fn partition(ids: &[CreatorId], cap: usize, strategy: BucketStrategy) -> Vec<Vec<CreatorId>> {
    match strategy {
        BucketStrategy::RoundRobin => {
            let count = round_robin_bucket_count(ids.len(), cap);
            let mut buckets = vec![Vec::new(); count];
            for (position, id) in ids.iter().enumerate() {
                buckets[position % count].push(*id);
            }
            buckets
        }
        BucketStrategy::Tiled => ids.chunks(cap.max(1)).map(<[_]>::to_vec).collect(),
    }
}

/// The ids one step is working on, and what the directory has said about them
/// so far.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pending: Vec<CreatorId>,
    resolved: BTreeMap<CreatorId, Resolution>,
}

impl WorkingSet {
    pub fn new(pending: Vec<CreatorId>) -> Self {
        Self {
            pending,
            resolved: BTreeMap::new(),
        }
    }

    pub fn pending(&self) -> &[CreatorId] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_resolutions(self) -> Vec<Resolution> {
        self.resolved.into_values().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every bucket answered. Ids the directory did not return stay unresolved.
    Resolved(Vec<Resolution>),
    Aborted { bucket: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing left to load.
    Idle,
    Written { resolved: usize, updated: usize },
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    NothingToDo,
    Completed,
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    pub status: EnrichmentStatus,
    pub steps: usize,
    /// Creators whose name was written back.
    pub resolved_creators: usize,
    /// Records touched by write-back (one creator spans many months).
    pub updated_records: usize,
    pub remaining_unresolved: usize,
}

impl EnrichmentReport {
    pub fn succeeded(&self) -> bool {
        !matches!(self.status, EnrichmentStatus::Aborted { .. })
    }
}

pub struct Enricher<'a, L: DirectoryLookup + ?Sized> {
    store: &'a EarningsStore,
    lookup: &'a L,
    config: &'a EnrichmentConfig,
}

impl<'a, L: DirectoryLookup + ?Sized> Enricher<'a, L> {
    pub fn new(store: &'a EarningsStore, lookup: &'a L, config: &'a EnrichmentConfig) -> Self {
        Self { store, lookup, config }
    }

    /// Resolve every bucket of `working`. Stops at the first bucket that
    /// fails, comes back empty, or carries an entry without a display name.
    pub fn resolve_pass(&self, mut working: WorkingSet) -> PassOutcome {
        let buckets = partition(
            &working.pending,
            self.config.lookup_cap,
            self.config.bucket_strategy,
        );
        log::info!(
            "resolving {} ids in {} buckets",
            working.pending.len(),
            buckets.len()
        );

        for (index, bucket) in buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let bucket_no = index + 1;
            log::debug!("bucket {bucket_no}: {} ids", bucket.len());

            let entries = match self.lookup.resolve(bucket) {
                Ok(entries) if entries.is_empty() => {
                    return PassOutcome::Aborted {
                        bucket: bucket_no,
                        reason: format!("directory returned no users for bucket {bucket_no}"),
                    };
                }
                Ok(entries) => entries,
                Err(e) => {
                    return PassOutcome::Aborted {
                        bucket: bucket_no,
                        reason: format!("bucket {bucket_no}: {e}"),
                    };
                }
            };

            for entry in entries {
                let Some(display_name) = entry.display_name else {
                    return PassOutcome::Aborted {
                        bucket: bucket_no,
                        reason: format!("user {} has no display name", entry.id),
                    };
                };
                if !bucket.contains(&entry.id) {
                    log::warn!("directory returned unrequested id {}, ignored", entry.id);
                    continue;
                }
                working.resolved.insert(
                    entry.id,
                    Resolution {
                        creator_id: entry.id,
                        display_name,
                        view_count: entry.view_count,
                    },
                );
            }
        }

        PassOutcome::Resolved(working.into_resolutions())
    }

    /// One load → resolve → write-back cycle over at most `step_size` creators.
    pub fn run_step(&self) -> PipelineResult<StepOutcome> {
        let ids = self
            .store
            .load_unresolved(&self.config.sentinel_name, self.config.step_size)?;
        let working = WorkingSet::new(ids);
        if working.is_empty() {
            return Ok(StepOutcome::Idle);
        }

        match self.resolve_pass(working) {
            PassOutcome::Aborted { reason, .. } => Ok(StepOutcome::Aborted(reason)),
            PassOutcome::Resolved(resolutions) => {
                let updated = self
                    .store
                    .in_transaction(|| self.store.write_back_resolutions(&resolutions))?;
                log::info!(
                    "wrote back {} names ({updated} records)",
                    resolutions.len()
                );
                Ok(StepOutcome::Written {
                    resolved: resolutions.len(),
                    updated,
                })
            }
        }
    }

    pub fn run(&self) -> PipelineResult<EnrichmentReport> {
        let sentinel = self.config.sentinel_name.as_str();
        let mut remaining = self.store.unresolved_count(sentinel)?;
        let mut report = EnrichmentReport {
            status: EnrichmentStatus::NothingToDo,
            steps: 0,
            resolved_creators: 0,
            updated_records: 0,
            remaining_unresolved: remaining,
        };
        if remaining == 0 {
            log::info!("no unresolved creators, nothing to do");
            return Ok(report);
        }
        log::info!(
            "{remaining} unresolved creators, step size {}",
            self.config.step_size
        );

        loop {
            report.steps += 1;
            log::info!("enrichment step {}", report.steps);
            match self.run_step()? {
                StepOutcome::Aborted(reason) => {
                    log::warn!("enrichment pass aborted: {reason}");
                    report.status = EnrichmentStatus::Aborted { reason };
                    report.remaining_unresolved = self.store.unresolved_count(sentinel)?;
                    return Ok(report);
                }
                StepOutcome::Idle => {
                    remaining = self.store.unresolved_count(sentinel)?;
                    break;
                }
                StepOutcome::Written { resolved, updated } => {
                    report.resolved_creators += resolved;
                    report.updated_records += updated;
                    remaining = self.store.unresolved_count(sentinel)?;
                    if resolved == 0 {
                        log::warn!("step resolved nothing, {remaining} creators left unresolved");
                        break;
                    }
                }
            }
            if remaining <= self.config.step_size {
                break;
            }
        }

        report.status = EnrichmentStatus::Completed;
        report.remaining_unresolved = remaining;
        Ok(report)
    }
}
