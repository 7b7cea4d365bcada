//! Storage module for persisting postings and run history
//!
//! This module handles all database operations for the sync, including:
//! - SQLite database initialization and schema management
//! - Posting upserts and soft deactivation
//! - Run tracking (mode, config hash, counts, outcome)
//! - Queries for the education backfill and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PostingStore, StorageError, StorageResult};

use crate::SyncError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SyncError> {
    SqliteStorage::new(path)
}

/// Represents a sync run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub mode: RunMode,
    pub config_hash: String,
    pub status: RunStatus,
    pub stats: RunStats,
    pub error_message: Option<String>,
}

/// Counts recorded when a run completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries examined by the detail loop
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Entries that answered 404
    pub deleted: u64,
    /// Postings deactivated by reconciliation
    pub deactivated: u64,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Every listed posting is fetched
    Full,
    /// Only postings modified since the last completed crawl are fetched
    Incremental,
    /// Education re-fetch for postings that lack it
    Backfill,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Backfill => "backfill",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "incremental" => Some(Self::Incremental),
            "backfill" => Some(Self::Backfill),
            _ => None,
        }
    }
}

/// Posting totals for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostingCounts {
    pub total: u64,
    pub active: u64,
    pub missing_education: u64,
}

impl PostingCounts {
    pub fn inactive(&self) -> u64 {
        self.total.saturating_sub(self.active)
    }
}
