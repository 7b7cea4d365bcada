//! Crawl orchestration
//!
//! One run walks the sitemaps, fetches every selected detail page in order
//! and hands the results to a `BatchSink` in batches:
//!
//! - `Discover`: collect every sitemap entry and the set of live ids
//! - `DetailFetchLoop`: one outcome per entry, buffered by kind
//! - `FinalFlush`: hand over whatever is still buffered
//! - `Done`
//!
//! Postings and tombstones are buffered separately and never share a batch.

use crate::config::Config;
use crate::crawler::detail::DetailFetcher;
use crate::crawler::governor::DelayGovernor;
use crate::crawler::sitemap::{filter_since, SitemapWalker};
use crate::crawler::build_http_client;
use crate::extract::ExtractSettings;
use crate::model::{CrawlProgress, CrawlRunResult, JobPosting, RecordBatch, SitemapEntry, Tombstone};
use crate::state::{DetailOutcome, OutcomeKind, RunPhase};
use crate::{Result, SyncError};
use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::{pin_mut, Stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Receives batches and progress from a running crawl
///
/// Calls are made synchronously from the crawl loop; the loop waits for each
/// call to return. An error aborts the run. Batches already accepted are not
/// rolled back.
pub trait BatchSink {
    fn on_batch(&mut self, batch: RecordBatch) -> Result<()>;

    fn on_progress(&mut self, _progress: &CrawlProgress) {}
}

/// Batch size and progress cadence
#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub progress_every: usize,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.crawler.batch_size.max(1),
            progress_every: config.crawler.progress_every.max(1),
        }
    }
}

/// Drives one crawl of the source
pub struct CrawlOrchestrator {
    walker: SitemapWalker,
    details: DetailFetcher,
    base_url: String,
    settings: BatchSettings,
}

impl CrawlOrchestrator {
    /// Builds the HTTP client and a governor shared by discovery and detail fetches
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config)?;
        let governor = Arc::new(DelayGovernor::new(config.crawler.request_delay()));

        Ok(Self {
            walker: SitemapWalker::new(&config.source, client.clone(), Arc::clone(&governor)),
            details: DetailFetcher::new(
                client,
                governor,
                ExtractSettings::from_source(&config.source),
            ),
            base_url: config.source.base_url.clone(),
            settings: BatchSettings::from_config(config),
        })
    }

    /// One outcome per entry, fetched strictly one after another
    pub fn detail_outcomes(
        &self,
        entries: Vec<SitemapEntry>,
    ) -> impl Stream<Item = DetailOutcome> + '_ {
        stream! {
            for entry in entries {
                yield self.details.fetch(&entry).await;
            }
        }
    }

    /// Runs a full or incremental crawl
    ///
    /// With `since`, only entries modified after it are fetched, but
    /// `all_source_ids` still covers every id the sitemaps list.
    pub async fn run<S: BatchSink>(
        &self,
        since: Option<DateTime<Utc>>,
        sink: &mut S,
    ) -> Result<CrawlRunResult> {
        let mut phase = RunPhase::Discover;
        match since {
            Some(cutoff) => tracing::info!("Starting incremental crawl (modified after {})", cutoff),
            None => tracing::info!("Starting full crawl"),
        }

        let all_entries = self.walker.fetch_all(None).await?;
        let all_source_ids: HashSet<String> = all_entries.iter().map(|e| e.id.clone()).collect();
        let work = filter_since(all_entries, since);
        let total = work.len();

        if total == 0 {
            advance(&mut phase, RunPhase::Done)?;
            tracing::info!("No postings to fetch");
            return Ok(CrawlRunResult {
                all_source_ids,
                ..CrawlRunResult::default()
            });
        }

        advance(&mut phase, RunPhase::DetailFetchLoop)?;
        tracing::info!(
            "Fetching {} of {} listed postings",
            total,
            all_source_ids.len()
        );

        let mut buffers = BatchBuffers::new(self.settings.batch_size);
        let progress = drain_outcomes(
            self.detail_outcomes(work),
            total,
            self.settings,
            &mut buffers,
            sink,
        )
        .await?;

        advance(&mut phase, RunPhase::FinalFlush)?;
        buffers.flush(sink)?;

        advance(&mut phase, RunPhase::Done)?;
        let result = CrawlRunResult {
            total,
            succeeded: progress.succeeded,
            failed: progress.failed,
            deleted: progress.deleted,
            all_source_ids,
        };
        tracing::info!(
            "Crawl finished: {} succeeded, {} failed, {} deleted",
            result.succeeded,
            result.failed,
            result.deleted
        );

        Ok(result)
    }

    /// Fetches a single posting by id, for inspection
    pub async fn crawl_single(&self, id: &str) -> DetailOutcome {
        let entry = SitemapEntry::from_id(&self.base_url, id);
        self.details.fetch(&entry).await
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) -> Result<()> {
    if !phase.can_transition_to(next) {
        return Err(SyncError::InvalidTransition {
            from: *phase,
            to: next,
        });
    }
    tracing::debug!("Run phase {} -> {}", phase, next);
    *phase = next;
    Ok(())
}

/// Separate buffers for full records and deactivation markers
struct BatchBuffers {
    batch_size: usize,
    upserts: Vec<JobPosting>,
    tombstones: Vec<Tombstone>,
}

impl BatchBuffers {
    fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            upserts: Vec::with_capacity(batch_size),
            tombstones: Vec::new(),
        }
    }

    fn push<S: BatchSink>(&mut self, outcome: DetailOutcome, sink: &mut S) -> Result<()> {
        match outcome {
            DetailOutcome::Posting(posting) => {
                self.upserts.push(*posting);
                if self.upserts.len() >= self.batch_size {
                    sink.on_batch(RecordBatch::Upsert(std::mem::take(&mut self.upserts)))?;
                }
            }
            DetailOutcome::Removed(tombstone) => {
                self.tombstones.push(tombstone);
                if self.tombstones.len() >= self.batch_size {
                    sink.on_batch(RecordBatch::Deactivate(std::mem::take(
                        &mut self.tombstones,
                    )))?;
                }
            }
            DetailOutcome::Failed { .. } => {}
        }
        Ok(())
    }

    fn flush<S: BatchSink>(&mut self, sink: &mut S) -> Result<()> {
        if !self.upserts.is_empty() {
            sink.on_batch(RecordBatch::Upsert(std::mem::take(&mut self.upserts)))?;
        }
        if !self.tombstones.is_empty() {
            sink.on_batch(RecordBatch::Deactivate(std::mem::take(&mut self.tombstones)))?;
        }
        Ok(())
    }
}

/// Consumes an outcome stream, counting, batching and reporting progress
///
/// Progress goes out every `progress_every` entries and after the last one,
/// at most once per entry.
async fn drain_outcomes<St, S>(
    outcomes: St,
    total: usize,
    settings: BatchSettings,
    buffers: &mut BatchBuffers,
    sink: &mut S,
) -> Result<CrawlProgress>
where
    St: Stream<Item = DetailOutcome>,
    S: BatchSink,
{
    pin_mut!(outcomes);

    let mut progress = CrawlProgress {
        total,
        ..CrawlProgress::default()
    };

    while let Some(outcome) = outcomes.next().await {
        match outcome.kind() {
            OutcomeKind::Succeeded => progress.succeeded += 1,
            OutcomeKind::Deleted => progress.deleted += 1,
            OutcomeKind::Failed => progress.failed += 1,
        }
        progress.processed += 1;

        buffers.push(outcome, sink)?;

        if progress.processed % settings.progress_every == 0 || progress.processed == total {
            tracing::info!(
                "Progress: {}/{} ({} ok, {} failed, {} deleted)",
                progress.processed,
                progress.total,
                progress.succeeded,
                progress.failed,
                progress.deleted
            );
            sink.on_progress(&progress);
        }
    }

    Ok(progress)
}
