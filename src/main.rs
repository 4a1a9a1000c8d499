//! Sitepulse main entry point
//!
//! Command-line interface for the domain snapshot and stats pipeline.

use clap::Parser;
use sitepulse::config::load_config_with_hash;
use sitepulse::domain::DomainRegistry;
use sitepulse::pipeline::{self, CancelFlag};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sitepulse: domain snapshot and stats pipeline
///
/// Tracks a registry of web domains, snapshots their crawl state, and
/// runs stat-extraction plugins over new snapshots to build per-domain
/// and global time-series statistics.
#[derive(Parser, Debug)]
#[command(name = "sitepulse")]
#[command(version = "1.0.0")]
#[command(about = "Domain snapshot and stats pipeline", long_about = None)]
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

    /// Refresh every tracked domain (fetch, snapshot) instead of running
    /// the stats pipeline
    #[arg(long, conflicts_with_all = ["summarize", "reset", "add", "gather"])]
    refresh: bool,

    /// Rebuild the global summary from existing stats and exit
    #[arg(long, conflicts_with_all = ["refresh", "reset", "add", "gather"])]
    summarize: bool,

    /// Clear stats and processed ledgers to force full reprocessing
    /// (a domain name, or "all")
    #[arg(long, value_name = "DOMAIN", conflicts_with_all = ["refresh", "summarize", "add", "gather"])]
    reset: Option<String>,

    /// Add a domain to the registry by URL or hostname and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["refresh", "summarize", "reset", "gather"])]
    add: Option<String>,

    /// Discover new domains from the configured [gather] source page
    #[arg(long, conflicts_with_all = ["refresh", "summarize", "reset", "add"])]
    gather: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.refresh {
        handle_refresh(&config).await?;
    } else if cli.summarize {
        handle_summarize(&config)?;
    } else if let Some(target) = cli.reset.as_deref() {
        handle_reset(&config, target)?;
    } else if let Some(url) = cli.add.as_deref() {
        handle_add(&config, url)?;
    } else if cli.gather {
        handle_gather(&config).await?;
    } else {
        handle_pipeline(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitepulse=info,warn"),
            1 => EnvFilter::new("sitepulse=debug,info"),
            2 => EnvFilter::new("sitepulse=trace,debug"),
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

/// Runs the stats pipeline: detect pending, dispatch plugins, merge,
/// summarize
async fn handle_pipeline(config: &sitepulse::Config) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; finishing the in-flight plugin");
            signal_flag.cancel();
        }
    });

    let report = pipeline::run_pipeline(config, &cancel).await?;

    println!(
        "Pipeline complete: {} domains processed, {} merges, {} failures{}",
        report.domains_processed,
        report.pairs_merged,
        report.pairs_failed,
        if report.cancelled { " (cancelled)" } else { "" }
    );

    Ok(())
}

/// Refreshes every tracked domain and stores the ledger
async fn handle_refresh(config: &sitepulse::Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = DomainRegistry::load(config);
    tracing::info!("{} domains loaded from datastore", registry.len());

    sitepulse::crawl::refresh_all(config, &mut registry).await?;

    println!("Refreshed {} domains", registry.len());
    Ok(())
}

/// Rebuilds summary.json from the existing stats stores
fn handle_summarize(config: &sitepulse::Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = DomainRegistry::load(config);
    tracing::info!("{} domains loaded from datastore", registry.len());

    let summary = pipeline::summarize(config, &registry);
    pipeline::write_summary(config, &summary)?;

    println!(
        "Summary written to {} ({} domains, {} - {})",
        config.summary_path().display(),
        summary.domain_count,
        summary.start_date,
        summary.end_date
    );
    Ok(())
}

/// Clears stats and processed ledgers for one domain or all of them
fn handle_reset(
    config: &sitepulse::Config,
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = DomainRegistry::load(config);

    if target == "all" {
        pipeline::reset_all(config, &registry)?;
        println!("Reset {} domains", registry.len());
    } else if registry.contains(target) {
        pipeline::reset_domain(config, target)?;
        println!("Reset {}", target);
    } else {
        tracing::error!("Domain not found: {}", target);
        return Err(format!("domain not found: {}", target).into());
    }

    Ok(())
}

/// Discovers new domains from the configured source page and stores the
/// ledger
async fn handle_gather(config: &sitepulse::Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = DomainRegistry::load(config);
    tracing::info!("{} domains loaded from datastore", registry.len());

    let added = sitepulse::crawl::gather(config, &mut registry).await?;
    registry.store()?;

    println!("Gathered {} new domains ({} tracked)", added, registry.len());
    Ok(())
}

/// Adds a domain to the registry without fetching it
fn handle_add(config: &sitepulse::Config, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = DomainRegistry::load(config);
    let record = registry.add(url)?;
    let domain = record.domain.clone();
    registry.store()?;

    println!("Added {}", domain);
    Ok(())
}
