//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{ExtractionPath, JobPosting};
use crate::storage::{PostingCounts, RunMode, RunRecord, RunStats};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for posting store implementations
///
/// Postings are keyed by their source id. Nothing here hard-deletes a
/// posting; removal is always `is_active = false`.
pub trait PostingStore {
    // ===== Run Management =====

    /// Records the start of a run and returns its id
    fn begin_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with its counts
    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()>;

    /// Marks a run as failed with an error message
    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Start time of the latest completed crawl run
    ///
    /// Backfill runs are ignored. Starting from the run's start time means
    /// postings changed while that run was going are picked up next time.
    fn last_successful_crawl(&self) -> StorageResult<Option<DateTime<Utc>>>;

    // ===== Postings =====

    /// Inserts or overwrites postings and marks them active
    ///
    /// Returns the number of postings written.
    fn upsert_postings(&mut self, postings: &[JobPosting]) -> StorageResult<usize>;

    /// Deactivates the given ids; returns how many were active before
    fn deactivate_ids(&mut self, ids: &[String]) -> StorageResult<usize>;

    /// Deactivates every active posting whose id is not in `live_ids`
    fn deactivate_missing(&mut self, live_ids: &HashSet<String>) -> StorageResult<usize>;

    /// Deactivates active postings whose deadline is before `today`
    fn deactivate_expired(&mut self, today: NaiveDate) -> StorageResult<usize>;

    /// Gets a posting by id
    fn get_posting(&self, id: &str) -> StorageResult<Option<JobPosting>>;

    // ===== Backfill =====

    /// Active postings with no education value
    fn ids_missing_education(&self) -> StorageResult<Vec<String>>;

    /// Sets the education of one posting; returns false if the id is unknown
    fn update_education(&mut self, id: &str, education: &str) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Totals across all postings
    fn count_postings(&self) -> StorageResult<PostingCounts>;

    /// Active postings per extraction strategy
    fn count_by_extraction(&self) -> StorageResult<Vec<(ExtractionPath, u64)>>;

    /// Most common first-level categories among active postings
    fn top_categories(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
