//! Weibo-Search main entry point
//!
//! This is the command-line interface for the Weibo-Search keyword crawler.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use weibo_search::config::{compute_fingerprint, finalize_config, read_config, Config};
use weibo_search::crawler::{expand, run_crawl};
use weibo_search::query::{ContainType, WeiboType};
use weibo_search::ConfigError;

/// Weibo-Search: a resumable keyword crawler for Weibo search results
///
/// Weibo-Search expands keywords, dates and regions into search tasks,
/// splits date windows that hit the result page ceiling, and keeps a ledger
/// so an interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "weibo-search")]
#[command(version = "1.0.0")]
#[command(about = "A resumable Weibo keyword search crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Comma separated keywords, replacing those of the config file
    #[arg(long, value_delimiter = ',')]
    keywords: Option<Vec<String>>,

    /// File with one keyword per line
    #[arg(long, value_name = "FILE")]
    keyword_file: Option<PathBuf>,

    /// First day to search (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// Last day to search (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// Result type: 0 all, 1 original, 2 hot, 3 following, 4 verified, 5 media, 6 viewpoint
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=6))]
    weibo_type: Option<u8>,

    /// Content filter: 0 any, 1 images, 2 video, 3 music, 4 short link
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    contain_type: Option<u8>,

    /// Comma separated region names, or "all"
    #[arg(long, value_delimiter = ',')]
    region: Option<Vec<String>>,

    /// Maximum number of records to emit (0 = unlimited)
    #[arg(long)]
    limit: Option<u64>,

    /// Base delay between requests in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Directory for the ledger database and the records file
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with_all = ["verbose", "log_level"])]
    quiet: bool,

    /// Explicit log level
    #[arg(long, value_enum, ignore_case = true, conflicts_with = "verbose")]
    log_level: Option<LogLevel>,

    /// Start a fresh crawl, abandoning any interrupted run
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the report of the latest run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if let Some(level) = cli.log_level {
        EnvFilter::new(format!("weibo_search={},warn", level.directive()))
    } else {
        match cli.verbose {
            0 => EnvFilter::new("weibo_search=info,warn"),
            1 => EnvFilter::new("weibo_search=debug,info"),
            2 => EnvFilter::new("weibo_search=trace,debug"),
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

/// Reads the config file (if any), applies command-line overrides and validates
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(keywords) = &cli.keywords {
        config.search.keywords = keywords.clone();
    }
    if let Some(path) = &cli.keyword_file {
        config.search.keyword_file = Some(path.display().to_string());
    }
    if let Some(date) = cli.start_date {
        config.search.start_date = date;
    }
    if let Some(date) = cli.end_date {
        config.search.end_date = date;
    }
    if let Some(code) = cli.weibo_type {
        config.search.weibo_type = WeiboType::from_code(code)
            .ok_or_else(|| ConfigError::Validation(format!("Invalid weibo-type {}", code)))?;
    }
    if let Some(code) = cli.contain_type {
        config.search.contain_type = ContainType::from_code(code)
            .ok_or_else(|| ConfigError::Validation(format!("Invalid contain-type {}", code)))?;
    }
    if let Some(regions) = &cli.region {
        config.search.region = regions.clone();
    }
    if let Some(limit) = cli.limit {
        config.search.limit_result = limit;
    }
    if let Some(delay) = cli.delay {
        config.crawler.download_delay = delay;
        config.crawler.max_delay = config.crawler.max_delay.max(delay);
    }
    if let Some(dir) = &cli.output_dir {
        config.output.ledger_path = dir.join("weibo_search.db").display().to_string();
        config.output.records_path = dir.join("posts.jsonl").display().to_string();
    }

    let config = finalize_config(config).context("Invalid configuration")?;
    tracing::info!(
        "Configuration loaded successfully (fingerprint: {})",
        compute_fingerprint(&config.search, config.crawler.max_pages_per_query)
    );
    tracing::debug!("Configuration: {:?}", config);
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    let search = &config.search;
    let tasks = expand(search)?;

    println!("=== Weibo-Search Dry Run ===\n");

    println!("Search:");
    println!("  Keywords: {}", search.unique_keywords().join(", "));
    println!("  Dates: {} to {}", search.start_date, search.end_date);
    println!("  Weibo type: {}", search.weibo_type.label());
    println!("  Contain type: {}", search.contain_type.label());
    let regions: Vec<String> = search
        .region_list()
        .into_iter()
        .map(|r| r.unwrap_or_else(|| "all".to_string()))
        .collect();
    println!("  Regions: {}", regions.join(", "));
    if search.limit_result == 0 {
        println!("  Limit: unlimited");
    } else {
        println!("  Limit: {}", search.limit_result);
    }

    println!("\nCrawler:");
    println!("  Download delay: {}s", config.crawler.download_delay);
    println!("  Max delay: {}s", config.crawler.max_delay);
    println!("  Max pages per query: {}", config.crawler.max_pages_per_query);
    println!("  Block retry limit: {}", config.crawler.block_retry_limit);

    println!("\nOutput:");
    println!("  Ledger: {}", config.output.ledger_path);
    println!("  Records: {}", config.output.records_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} search tasks", tasks.len());

    Ok(())
}

/// Handles the --stats mode: shows the report of the latest run
fn handle_stats(config: &Config) -> Result<()> {
    use weibo_search::output::{load_report, print_report};
    use weibo_search::storage::SqliteStorage;

    println!("Ledger: {}\n", config.output.ledger_path);

    let storage = SqliteStorage::new(Path::new(&config.output.ledger_path))
        .context("Failed to open the ledger")?;

    match load_report(&storage)? {
        Some(report) => print_report(&report),
        None => println!("No runs recorded yet."),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping at the next page boundary (Ctrl-C again to exit now)");
        on_signal.cancel();

        // A hard exit resumes from the last committed ledger save
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt received, exiting");
            std::process::exit(130);
        }
    });

    let records_path = config.output.records_path.clone();
    let report = run_crawl(config, fresh, cancel).await.context("Crawl failed")?;

    tracing::info!("Records written to {}", records_path);
    weibo_search::output::print_report(&report);

    Ok(())
}
