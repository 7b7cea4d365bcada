//! Statistics generation from the posting database
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::model::ExtractionPath;
use crate::storage::{PostingCounts, PostingStore, RunRecord};
use crate::SyncError;

/// Categories listed in the statistics report
pub const TOP_CATEGORY_LIMIT: usize = 10;

/// Runs listed in the statistics report
pub const RECENT_RUN_LIMIT: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct PostingStatistics {
    /// Total, active and missing-education counts
    pub counts: PostingCounts,

    /// Active postings by extraction path
    pub by_extraction: Vec<(ExtractionPath, u64)>,

    /// Most common first-level categories among active postings
    pub top_categories: Vec<(String, u64)>,

    /// Latest runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn PostingStore) -> Result<PostingStatistics, SyncError> {
    Ok(PostingStatistics {
        counts: storage.count_postings()?,
        by_extraction: storage.count_by_extraction()?,
        top_categories: storage.top_categories(TOP_CATEGORY_LIMIT)?,
        recent_runs: storage.recent_runs(RECENT_RUN_LIMIT)?,
    })
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &PostingStatistics) {
    let counts = &stats.counts;

    println!("=== Posting Statistics ===\n");

    println!("Overview:");
    println!("  Total postings: {}", counts.total);
    println!(
        "  Active: {} ({:.1}%)",
        counts.active,
        percentage(counts.active, counts.total)
    );
    println!("  Inactive: {}", counts.inactive());
    println!(
        "  Active without education: {} ({:.1}%)",
        counts.missing_education,
        percentage(counts.missing_education, counts.active)
    );
    println!();

    if !stats.by_extraction.is_empty() {
        println!("Extraction Paths:");
        for (path, count) in &stats.by_extraction {
            println!(
                "  {}: {} ({:.1}%)",
                path.to_db_string(),
                count,
                percentage(*count, counts.active)
            );
        }
        println!();
    }

    if !stats.top_categories.is_empty() {
        println!("Top Categories ({}):", stats.top_categories.len());
        for (category, count) in &stats.top_categories {
            println!("  - {}: {}", category, count);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} {} started {} ({} ok, {} failed, {} deleted, {} deactivated)",
                run.id,
                run.mode.to_db_string(),
                run.status.to_db_string(),
                run.started_at,
                run.stats.succeeded,
                run.stats.failed,
                run.stats.deleted,
                run.stats.deactivated
            );
            if let Some(message) = &run.error_message {
                println!("      error: {}", message);
            }
        }
    }
}
