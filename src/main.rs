//! Zighang-Sync main entry point
//!
//! This is the command-line interface for the zighang.com posting mirror.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zighang_sync::config::{load_config_with_hash, Config};
use zighang_sync::crawler::{run_dry, run_sync, CrawlOrchestrator};
use zighang_sync::output::{load_statistics, print_posting, print_statistics, print_sync_report};
use zighang_sync::state::DetailOutcome;
use zighang_sync::storage::{open_storage, RunMode};

/// Zighang-Sync: keeps a local copy of zighang.com job postings
///
/// Walks the recruitment sitemaps, extracts each posting and upserts it into
/// SQLite. Postings the site stops listing, or whose deadline has passed,
/// are deactivated.
#[derive(Parser, Debug)]
#[command(name = "zighang-sync")]
#[command(version = "1.0.0")]
#[command(about = "Sitemap-driven job posting sync for zighang.com", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Fetch every listed posting instead of only those modified since the last crawl
    #[arg(long)]
    full: bool,

    /// Walk the sitemaps and report what would be fetched, without writing
    #[arg(long, conflicts_with_all = ["stats", "backfill_education", "inspect"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "backfill_education", "inspect"])]
    stats: bool,

    /// Re-fetch active postings that have no education value
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "inspect"])]
    backfill_education: bool,

    /// Fetch and print one posting by id without storing it
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "stats", "backfill_education"])]
    inspect: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config).await
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(id) = cli.inspect.as_deref() {
        handle_inspect(&config, id).await
    } else {
        let mode = if cli.backfill_education {
            RunMode::Backfill
        } else if cli.full {
            RunMode::Full
        } else {
            RunMode::Incremental
        };
        handle_sync(&config, &config_hash, mode).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("zighang_sync=info,warn"),
            1 => EnvFilter::new("zighang_sync=debug,info"),
            2 => EnvFilter::new("zighang_sync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: prints the configuration and the discovered entries
async fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Zighang-Sync Dry Run ===\n");

    println!("Source:");
    println!("  Sitemap index: {}", config.source.sitemap_index_url());
    println!("  Category marker: {}", config.source.category_marker);
    println!("  Anchor key: {}", config.source.embedded_anchor_key);

    println!("\nCrawler:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Batch size: {}", config.crawler.batch_size);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Database: {}\n", config.output.database_path);

    let entries = run_dry(config).await.context("sitemap discovery failed")?;
    let dated = entries.iter().filter(|e| e.last_modified.is_some()).count();

    println!("✓ Configuration is valid");
    println!(
        "✓ Sitemaps list {} postings ({} with a last-modified date)",
        entries.len(),
        dated
    );

    Ok(())
}

/// Handles --stats: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles --inspect: fetches one posting and prints it
async fn handle_inspect(config: &Config, id: &str) -> anyhow::Result<()> {
    let orchestrator = CrawlOrchestrator::new(config)?;

    match orchestrator.crawl_single(id).await {
        DetailOutcome::Posting(posting) => {
            print_posting(&posting)?;
            Ok(())
        }
        DetailOutcome::Removed(_) => bail!("posting {} is no longer served (404)", id),
        DetailOutcome::Failed { reason, .. } => bail!("posting {} failed: {}", id, reason),
    }
}

/// Handles the sync itself (incremental, full or backfill)
async fn handle_sync(config: &Config, config_hash: &str, mode: RunMode) -> anyhow::Result<()> {
    let report = run_sync(config, config_hash, mode)
        .await
        .with_context(|| format!("{} run failed", mode.to_db_string()))?;

    print_sync_report(&report)?;
    Ok(())
}
