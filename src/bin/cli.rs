//! Torrent spider CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use torrent_spider::{
    config,
    error::Result,
    pipeline::{self, CrawlOptions},
    storage::{LocalCatalog, LocalStorage},
};

/// spider - Torrent listing crawler
#[derive(Parser, Debug)]
#[command(
    name = "spider",
    version,
    about = "Crawls torrent listing boards and stores resolved torrents"
)]
struct Cli {
    /// Path to storage directory containing config and data files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured boards
    Crawl {
        /// Crawl only this board id
        #[arg(long)]
        board: Option<String>,

        /// Override the lookback window in hours
        #[arg(long)]
        lookback_hours: Option<u32>,

        /// Ignore saved checkpoints and start from page 1
        #[arg(long)]
        fresh: bool,
    },

    /// Validate configuration files
    Validate,

    /// Show stored torrents and checkpoints
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Crawl {
            board,
            lookback_hours,
            fresh,
        } => {
            let config = config::load_config(&cli.storage_dir);
            config.validate()?;
            log::info!("Loaded configuration from {}", cli.storage_dir.display());

            let options = CrawlOptions {
                board,
                lookback_hours,
                fresh,
            };
            let summaries = pipeline::run_spider(&config, &cli.storage_dir, &options).await?;

            let stored: usize = summaries.iter().map(|s| s.persisted).sum();
            log::info!("Crawl complete! {} torrents stored", stored);
            for summary in summaries.iter().filter(|s| s.next_page.is_some()) {
                log::info!(
                    "Board {} continues at page {} on the next run",
                    summary.board_id,
                    summary.next_page.unwrap_or(1)
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config::load_validated(&cli.storage_dir) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (includes boards and selectors)");

            let catalog = LocalCatalog::load(&cli.storage_dir).await?;
            log::info!(
                "✓ Catalog OK ({} movies, {} shows)",
                catalog.catalog().movies.len(),
                catalog.catalog().shows.len()
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Config: {}",
                if config::config_path(&cli.storage_dir).exists() {
                    "exists"
                } else {
                    "not found (defaults apply)"
                }
            );

            let storage = LocalStorage::open(&cli.storage_dir).await?;
            let torrents = storage.stored_torrents().await;
            log::info!("Stored torrents: {}", torrents.len());
            if let Some(latest) = torrents.iter().max_by_key(|t| t.updated_at) {
                log::info!("Last updated: {} ({})", latest.updated_at, latest.torrent.title);
            }

            let checkpoints = storage.checkpoints().await?;
            if checkpoints.is_empty() {
                log::info!("No pending checkpoints.");
            }
            let now = Utc::now();
            for (board, checkpoint) in &checkpoints {
                log::info!(
                    "Board {}: page {}, due in {}s",
                    board,
                    checkpoint.continuation.cursor.page,
                    checkpoint.remaining_delay(now)
                );
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
