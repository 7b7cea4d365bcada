//! Output module for console reports
//!
//! This module handles:
//! - Store statistics for `--stats`
//! - Run summaries printed after a sync
//! - Single posting dumps for `--inspect`

pub mod stats;

pub use stats::{load_statistics, print_statistics, PostingStatistics};

use crate::crawler::SyncReport;
use crate::model::{CrawlRunResult, JobPosting};
use crate::SyncError;
use std::io::{self, Write};

/// Prints the outcome of a sync run
pub fn print_sync_report(report: &SyncReport) -> Result<(), SyncError> {
    let stdout = io::stdout();
    write_sync_report(&mut stdout.lock(), report)?;
    Ok(())
}

/// Writes the sync summary, one section per pass that ran
pub fn write_sync_report<W: Write>(out: &mut W, report: &SyncReport) -> io::Result<()> {
    writeln!(out, "=== Sync Run #{} ===\n", report.run_id)?;

    if let Some(crawl) = &report.crawl {
        write_crawl_result(out, crawl)?;
    }

    if let Some(reconcile) = &report.reconcile {
        writeln!(out, "Reconciliation:")?;
        writeln!(out, "  No longer listed: {}", reconcile.missing)?;
        writeln!(out, "  Past deadline: {}", reconcile.expired)?;
        writeln!(out)?;
    }

    if let Some(backfill) = &report.backfill {
        writeln!(out, "Education Backfill:")?;
        writeln!(out, "  Candidates: {}", backfill.candidates)?;
        writeln!(out, "  Updated: {}", backfill.updated)?;
        writeln!(out, "  Still missing: {}", backfill.unchanged)?;
        writeln!(out, "  Deactivated: {}", backfill.deactivated)?;
        writeln!(out, "  Failed: {}", backfill.failed)?;
        writeln!(out)?;
    }

    Ok(())
}

/// Writes detail-loop counts
fn write_crawl_result<W: Write>(out: &mut W, result: &CrawlRunResult) -> io::Result<()> {
    writeln!(out, "Crawl:")?;
    writeln!(out, "  Listed in sitemaps: {}", result.all_source_ids.len())?;
    writeln!(out, "  Examined: {}", result.total)?;
    writeln!(out, "  Succeeded: {}", result.succeeded)?;
    writeln!(out, "  Failed: {}", result.failed)?;
    writeln!(out, "  Removed (404): {}", result.deleted)?;
    writeln!(out)
}

/// Prints a posting as pretty JSON
pub fn print_posting(posting: &JobPosting) -> Result<(), SyncError> {
    println!("{}", serde_json::to_string_pretty(posting)?);
    Ok(())
}
