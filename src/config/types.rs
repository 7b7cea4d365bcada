use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Zighang-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Where and what to crawl on the source site
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Site root, e.g. `https://zighang.com`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the sitemap index relative to the base URL
    #[serde(rename = "sitemap-index-path", default = "default_sitemap_index_path")]
    pub sitemap_index_path: String,

    /// Only category sitemaps whose URL path contains this marker are walked
    #[serde(rename = "category-marker", default = "default_category_marker")]
    pub category_marker: String,

    /// Key whose enclosing object is carved out of the embedded payload
    #[serde(rename = "embedded-anchor-key", default = "default_anchor_key")]
    pub embedded_anchor_key: String,

    /// Value written to `JobPosting::source`
    #[serde(rename = "source-tag", default = "default_source_tag")]
    pub source_tag: String,
}

impl SourceConfig {
    /// Full URL of the sitemap index
    pub fn sitemap_index_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.sitemap_index_path
        )
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Crawl pacing and batching
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum spacing between requests to the source (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Timeout applied to every request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Records buffered before the batch callback is invoked
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Progress is reported every N processed entries
    #[serde(rename = "progress-every", default = "default_progress_every")]
    pub progress_every: usize,

    /// Parallel detail fetches during the education backfill
    #[serde(rename = "backfill-concurrency", default = "default_backfill_concurrency")]
    pub backfill_concurrency: usize,

    /// Request spacing used by the education backfill (milliseconds)
    #[serde(rename = "backfill-delay-ms", default = "default_backfill_delay_ms")]
    pub backfill_delay_ms: u64,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backfill_delay(&self) -> Duration {
        Duration::from_millis(self.backfill_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_size: default_batch_size(),
            progress_every: default_progress_every(),
            backfill_concurrency: default_backfill_concurrency(),
            backfill_delay_ms: default_backfill_delay_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_sitemap_index_path() -> String {
    "/sitemap.xml".to_string()
}

fn default_category_marker() -> String {
    "recruitment".to_string()
}

fn default_anchor_key() -> String {
    "employeeTypes".to_string()
}

fn default_source_tag() -> String {
    "zighang".to_string()
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_batch_size() -> usize {
    50
}

fn default_progress_every() -> usize {
    100
}

fn default_backfill_concurrency() -> usize {
    5
}

fn default_backfill_delay_ms() -> u64 {
    100
}
