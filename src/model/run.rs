//! Per-run bookkeeping types shared by the orchestrator and its callers

use crate::model::{JobPosting, Tombstone};
use std::collections::HashSet;

/// A batch handed to the persistence callback
///
/// Full records and deactivation markers never share a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBatch {
    Upsert(Vec<JobPosting>),
    Deactivate(Vec<Tombstone>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            Self::Upsert(records) => records.len(),
            Self::Deactivate(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cumulative counts reported while a run is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlProgress {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub deleted: usize,
}

/// Summary of one orchestrator run
///
/// `all_source_ids` holds every id the sitemap listed in this pass, including
/// entries skipped by the incremental filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlRunResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub deleted: usize,
    pub all_source_ids: HashSet<String>,
}

impl CrawlRunResult {
    /// Every examined entry ends up in exactly one bucket
    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.failed + self.deleted == self.total
    }
}
