//! Education backfill
//!
//! Re-fetches active postings that have no education value, a few at a time,
//! and writes whatever the extractor finds. All fetches finish before any
//! write happens; writes are sequential.

use crate::config::Config;
use crate::crawler::build_http_client;
use crate::crawler::detail::DetailFetcher;
use crate::crawler::governor::DelayGovernor;
use crate::extract::ExtractSettings;
use crate::model::SitemapEntry;
use crate::state::DetailOutcome;
use crate::storage::PostingStore;
use crate::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Counts from one backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Postings selected for re-fetch
    pub candidates: usize,
    /// Postings that received an education value
    pub updated: usize,
    /// Re-fetched but still without education
    pub unchanged: usize,
    /// Postings that answered 404 and were deactivated
    pub deactivated: usize,
    pub failed: usize,
}

/// Re-fetches postings with bounded concurrency
pub struct EducationBackfill {
    fetcher: DetailFetcher,
    base_url: String,
    concurrency: usize,
}

impl EducationBackfill {
    /// Uses its own governor with the backfill delay
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config)?;
        let governor = Arc::new(DelayGovernor::new(config.crawler.backfill_delay()));

        Ok(Self {
            fetcher: DetailFetcher::new(
                client,
                governor,
                ExtractSettings::from_source(&config.source),
            ),
            base_url: config.source.base_url.clone(),
            concurrency: config.crawler.backfill_concurrency.max(1),
        })
    }

    pub async fn run<S: PostingStore + ?Sized>(&self, store: &mut S) -> Result<BackfillReport> {
        let ids = store.ids_missing_education()?;
        let mut report = BackfillReport {
            candidates: ids.len(),
            ..BackfillReport::default()
        };

        if ids.is_empty() {
            tracing::info!("No active postings are missing education");
            return Ok(report);
        }

        tracing::info!(
            "Re-fetching {} postings without education ({} at a time)",
            ids.len(),
            self.concurrency
        );

        let fetcher = &self.fetcher;
        let outcomes: Vec<DetailOutcome> = stream::iter(
            ids.iter()
                .map(|id| SitemapEntry::from_id(&self.base_url, id)),
        )
        .map(|entry| async move { fetcher.fetch(&entry).await })
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        for outcome in outcomes {
            match outcome {
                DetailOutcome::Posting(posting) => match posting.education.as_deref() {
                    Some(education) => {
                        store.update_education(&posting.id, education)?;
                        report.updated += 1;
                    }
                    None => report.unchanged += 1,
                },
                DetailOutcome::Removed(tombstone) => {
                    report.deactivated += store.deactivate_ids(&[tombstone.id])?;
                }
                DetailOutcome::Failed { .. } => report.failed += 1,
            }
        }

        tracing::info!(
            "Backfill finished: {} updated, {} unchanged, {} deactivated, {} failed",
            report.updated,
            report.unchanged,
            report.deactivated,
            report.failed
        );

        Ok(report)
    }
}
