//! Crawler module for sitemap discovery and detail fetching
//!
//! This module contains the network side of the sync:
//! - HTTP fetching and request pacing
//! - Sitemap index and category sitemap walking
//! - Detail page fetching and the crawl loop
//! - Reconciliation and the education backfill
//! - The sync driver tying them to a store

mod backfill;
mod coordinator;
mod detail;
mod fetcher;
mod governor;
mod reconcile;
mod sitemap;

pub use backfill::{BackfillReport, EducationBackfill};
pub use coordinator::{BatchSettings, BatchSink, CrawlOrchestrator};
pub use detail::DetailFetcher;
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use governor::DelayGovernor;
pub use reconcile::{reconcile, ReconcileReport};
pub use sitemap::{filter_since, parse_sitemap_index, parse_url_set, SitemapWalker};

use crate::config::Config;
use crate::extract::today_kst;
use crate::model::{CrawlRunResult, RecordBatch, SitemapEntry};
use crate::storage::{open_storage, PostingStore, RunMode, RunStats};
use crate::{Result, SyncError};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

/// Writes batches straight into a store
pub struct StoreSink<'a, S: PostingStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: PostingStore + ?Sized> StoreSink<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }
}

impl<S: PostingStore + ?Sized> BatchSink for StoreSink<'_, S> {
    fn on_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        tracing::debug!("Writing batch of {} record(s)", batch.len());

        match batch {
            RecordBatch::Upsert(postings) => {
                self.store.upsert_postings(&postings)?;
            }
            RecordBatch::Deactivate(tombstones) => {
                let ids: Vec<String> = tombstones.into_iter().map(|t| t.id).collect();
                self.store.deactivate_ids(&ids)?;
            }
        }
        Ok(())
    }
}

/// Summary of one sync invocation
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub run_id: i64,
    pub crawl: Option<CrawlRunResult>,
    pub reconcile: Option<ReconcileReport>,
    pub backfill: Option<BackfillReport>,
}

impl SyncReport {
    fn run_stats(&self) -> RunStats {
        let mut stats = RunStats::default();
        if let Some(crawl) = &self.crawl {
            stats.total = crawl.total as u64;
            stats.succeeded = crawl.succeeded as u64;
            stats.failed = crawl.failed as u64;
            stats.deleted = crawl.deleted as u64;
        }
        if let Some(reconcile) = &self.reconcile {
            stats.deactivated = reconcile.total() as u64;
        }
        if let Some(backfill) = &self.backfill {
            stats.total = backfill.candidates as u64;
            stats.succeeded = backfill.updated as u64;
            stats.failed = backfill.failed as u64;
            stats.deleted = backfill.deactivated as u64;
        }
        stats
    }
}

/// Runs one sync against the configured database
///
/// Records the run, crawls (or backfills), reconciles and marks the run
/// completed. Any error marks the run failed and is returned.
pub async fn run_sync(config: &Config, config_hash: &str, mode: RunMode) -> Result<SyncReport> {
    let mut store = open_storage(Path::new(&config.output.database_path))?;
    run_sync_with_store(&mut store, config, config_hash, mode).await
}

/// `run_sync` against an already opened store
pub async fn run_sync_with_store<S: PostingStore + ?Sized>(
    store: &mut S,
    config: &Config,
    config_hash: &str,
    mode: RunMode,
) -> Result<SyncReport> {
    let since = match mode {
        RunMode::Incremental => {
            let last = store.last_successful_crawl()?;
            if last.is_none() {
                tracing::info!("No completed crawl on record; fetching everything");
            }
            last
        }
        _ => None,
    };

    let run_id = store.begin_run(mode, config_hash)?;
    tracing::info!("Run {} started ({})", run_id, mode.to_db_string());

    let outcome = match mode {
        RunMode::Backfill => backfill_pass(store, config).await,
        RunMode::Full | RunMode::Incremental => crawl_pass(store, config, since).await,
    };

    match outcome {
        Ok(mut report) => {
            report.run_id = run_id;
            store.complete_run(run_id, &report.run_stats())?;
            tracing::info!("Run {} completed", run_id);
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            if let Err(record_err) = store.fail_run(run_id, &e.to_string()) {
                tracing::warn!("Could not record failure of run {}: {}", run_id, record_err);
            }
            Err(e)
        }
    }
}

async fn crawl_pass<S: PostingStore + ?Sized>(
    store: &mut S,
    config: &Config,
    since: Option<chrono::DateTime<Utc>>,
) -> Result<SyncReport> {
    let orchestrator = CrawlOrchestrator::new(config)?;

    let result = {
        let mut sink = StoreSink::new(&mut *store);
        orchestrator.run(since, &mut sink).await?
    };

    check_counts(&result)?;
    let report = reconcile(store, &result, today_kst())?;

    Ok(SyncReport {
        crawl: Some(result),
        reconcile: Some(report),
        ..SyncReport::default()
    })
}

/// Rejects a crawl whose outcome counts do not cover every selected entry
fn check_counts(result: &CrawlRunResult) -> Result<()> {
    if result.is_consistent() {
        Ok(())
    } else {
        Err(SyncError::InconsistentCounts {
            total: result.total,
            succeeded: result.succeeded,
            failed: result.failed,
            deleted: result.deleted,
        })
    }
}

async fn backfill_pass<S: PostingStore + ?Sized>(
    store: &mut S,
    config: &Config,
) -> Result<SyncReport> {
    let backfill = EducationBackfill::new(config)?;
    let report = backfill.run(store).await?;

    Ok(SyncReport {
        backfill: Some(report),
        ..SyncReport::default()
    })
}

/// Walks the sitemaps without fetching details or touching the database
pub async fn run_dry(config: &Config) -> Result<Vec<SitemapEntry>> {
    let client = build_http_client(config)?;
    let governor = Arc::new(DelayGovernor::new(config.crawler.request_delay()));
    SitemapWalker::new(&config.source, client, governor)
        .fetch_all(None)
        .await
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    use crate::config::{CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};

    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            sitemap_index_path: "/sitemap.xml".to_string(),
            category_marker: "recruitment".to_string(),
            embedded_anchor_key: "employeeTypes".to_string(),
            source_tag: "zighang".to_string(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        },
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            backfill_delay_ms: 0,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) fn test_posting(id: &str) -> crate::model::JobPosting {
    use crate::model::{DetailSections, ExtractionPath, JobPosting};

    JobPosting {
        id: id.to_string(),
        source: "zighang".to_string(),
        url: format!("https://zighang.com/recruitment/{}", id),
        company_name: "직행컴퍼니".to_string(),
        company_logo: None,
        title: "기존 공고".to_string(),
        regions: vec![],
        location: None,
        career_min: None,
        career_max: None,
        employment_types: vec![],
        depth_ones: vec![],
        depth_twos: vec![],
        keywords: vec![],
        view_count: None,
        sections: DetailSections::default(),
        education: None,
        posted_at: None,
        last_modified: None,
        deadline: None,
        deadline_type: None,
        crawled_at: Utc::now(),
        extraction: ExtractionPath::Embedded,
        is_active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tombstone;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_store_sink_writes_batches() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        store
            .upsert_postings(&[test_posting("keep-1"), test_posting("gone-1")])
            .unwrap();

        {
            let mut sink = StoreSink::new(&mut store);
            sink.on_batch(RecordBatch::Upsert(vec![test_posting("new-1")]))
                .unwrap();
            sink.on_batch(RecordBatch::Deactivate(vec![
                Tombstone::new("gone-1"),
                Tombstone::new("unknown"),
            ]))
            .unwrap();
            sink.on_batch(RecordBatch::Upsert(vec![])).unwrap();
        }

        assert!(store.get_posting("new-1").unwrap().unwrap().is_active);
        assert!(store.get_posting("keep-1").unwrap().unwrap().is_active);
        assert!(!store.get_posting("gone-1").unwrap().unwrap().is_active);
        assert!(store.get_posting("unknown").unwrap().is_none());
    }

    #[test]
    fn test_check_counts() {
        let mut result = CrawlRunResult {
            total: 3,
            succeeded: 1,
            failed: 1,
            deleted: 1,
            ..CrawlRunResult::default()
        };
        assert!(check_counts(&result).is_ok());

        result.failed = 0;
        let err = check_counts(&result).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InconsistentCounts {
                total: 3,
                succeeded: 1,
                failed: 0,
                deleted: 1
            }
        ));
        assert!(err.to_string().contains("1 + 0 + 1 != 3"));
    }

    #[tokio::test]
    async fn test_failed_discovery_marks_run_failed() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        // Nothing listens on port 1
        let config = test_config("http://127.0.0.1:1");

        let result = run_sync_with_store(&mut store, &config, "hash", RunMode::Full).await;
        assert!(result.is_err());

        let runs = store.recent_runs(1).unwrap();
        assert_eq!(runs[0].status, crate::storage::RunStatus::Failed);
        assert!(runs[0].error_message.is_some());
        assert_eq!(store.last_successful_crawl().unwrap(), None);
    }
}
