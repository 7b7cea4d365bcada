//! Post-crawl reconciliation
//!
//! Brings the store in line with what the source publishes after a crawl:
//! postings no longer listed in any sitemap and postings past their deadline
//! are deactivated.

use crate::model::CrawlRunResult;
use crate::storage::{PostingStore, StorageResult};
use chrono::NaiveDate;

/// How many postings each reconciliation step deactivated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub missing: usize,
    pub expired: usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.missing + self.expired
    }
}

/// Deactivates unlisted and expired postings
///
/// An empty id set means discovery produced nothing usable, so the missing
/// step is skipped rather than deactivating the whole store.
pub fn reconcile<S: PostingStore + ?Sized>(
    store: &mut S,
    result: &CrawlRunResult,
    today: NaiveDate,
) -> StorageResult<ReconcileReport> {
    let missing = if result.all_source_ids.is_empty() {
        tracing::warn!("Sitemaps listed no postings; skipping deactivation of missing ids");
        0
    } else {
        store.deactivate_missing(&result.all_source_ids)?
    };

    let expired = store.deactivate_expired(today)?;

    tracing::info!(
        "Reconciled: {} no longer listed, {} past deadline",
        missing,
        expired
    );

    Ok(ReconcileReport { missing, expired })
}
