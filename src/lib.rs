//! Zighang-Sync: a job-posting mirror for zighang.com
//!
//! This crate walks the source's sitemaps, extracts postings from detail pages
//! (embedded streaming payload first, linked-data metadata as fallback),
//! normalizes them into a canonical schema and keeps a local store in step with
//! the set of postings the source currently publishes.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Zighang-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request failed for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected HTTP status {status_code} for {url}")]
    HttpStatus { url: String, status_code: u16 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Sitemap parse error for {url}: {message}")]
    SitemapParse { url: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid run phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crawl counts do not add up: {succeeded} + {failed} + {deleted} != {total}")]
    InconsistentCounts {
        total: usize,
        succeeded: usize,
        failed: usize,
        deleted: usize,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Zighang-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CrawlRunResult, DetailSections, JobPosting, SitemapEntry};
pub use state::RunPhase;
