//! Data model shared by the extraction, crawl and storage layers

mod posting;
mod run;
mod sitemap;

pub use posting::{DetailSections, ExtractionPath, JobPosting, Tombstone};
pub use run::{CrawlProgress, CrawlRunResult, RecordBatch};
pub use sitemap::{posting_id_from_url, SitemapEntry, POSTING_PATH_SEGMENT};
