//! Job Watch CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use job_watch::{
    error::{AppError, Result},
    models::{Config, FetchMode},
    pipeline,
    services::RenderingFetcher,
    storage::LocalStorage,
};
use tokio_util::sync::CancellationToken;

/// Number of recent runs shown by `info`.
const RECENT_RUNS: usize = 5;

const DEFAULT_STATE_DIR: &str = "storage";

/// Conventional exit status for termination by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// job-watch - Job Search Change Notifier
#[derive(Parser, Debug)]
#[command(
    name = "job-watch",
    version,
    about = "Emails you when the top results of a job search change"
)]
struct Cli {
    /// State directory (snapshot, run and IP history). Overrides MS_STATE_DIR
    #[arg(short, long)]
    state_dir: Option<PathBuf>,

    /// Path to config file (default: {state_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll until interrupted with Ctrl-C
    Run {
        /// Log alerts instead of emailing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single iteration and exit
    Once {
        /// Log alerts instead of emailing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration
    Validate,

    /// Show stored snapshot and history
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Config file location: `--config`, else `config.toml` in the state
/// directory named by `--state-dir`, `MS_STATE_DIR` or the default.
fn config_path(
    config: Option<&Path>,
    state_dir: Option<&Path>,
    env_state_dir: Option<String>,
) -> PathBuf {
    if let Some(path) = config {
        return path.to_path_buf();
    }
    let dir = state_dir.map(Path::to_path_buf).unwrap_or_else(|| {
        env_state_dir
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
    });
    dir.join("config.toml")
}

/// Load configuration: file, then environment, then command line.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = config_path(
        cli.config.as_deref(),
        cli.state_dir.as_deref(),
        std::env::var("MS_STATE_DIR").ok(),
    );

    let mut config = Config::load_or_default(&config_path)?;
    config.apply_process_env()?;
    if let Some(dir) = &cli.state_dir {
        config.storage.state_dir = dir.clone();
    }

    log::debug!("Configuration loaded from {}", config_path.display());
    Ok(config)
}

/// Listen for Ctrl-C: the first stops the loop after the current round,
/// a second exits immediately.
fn spawn_interrupt_listener(cancel: CancellationToken) {
    let interrupts = futures::stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(((), ())),
            Err(e) => {
                log::error!("Could not listen for Ctrl-C: {}", e);
                None
            }
        }
    });

    tokio::spawn(async move {
        if pipeline::escalate_interrupts(Box::pin(interrupts), cancel).await {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Run { dry_run } => {
            config.validate(!dry_run)?;
            let mut monitor = pipeline::build_monitor(Arc::new(config), dry_run)?;

            let cancel = CancellationToken::new();
            spawn_interrupt_listener(cancel.clone());

            monitor.run(cancel).await;
        }

        Command::Once { dry_run } => {
            config.validate(!dry_run)?;
            let mut monitor = pipeline::build_monitor(Arc::new(config), dry_run)?;

            let record = monitor.run_once(Utc::now()).await;
            log::info!(
                "{:?}: {} postings, changed={}, notified={}",
                record.outcome,
                record.job_count,
                record.changed,
                record.notified
            );
            if let Some(error) = record.error {
                return Err(AppError::iteration(error));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate(true) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Search URL: {}", config.search.search_url()?);
            if config.http.fetcher == FetchMode::Browser {
                RenderingFetcher::new(&config.http)?;
            }
            log::info!("✓ Fetcher: {:?}", config.http.fetcher);
            log::info!(
                "✓ Top {} every {}-{}s, cooldown {}s, first run: {:?}",
                config.monitor.top_k,
                config.monitor.poll_min_secs,
                config.monitor.poll_max_secs,
                config.monitor.cooldown_secs,
                config.monitor.first_run
            );
            log::info!(
                "✓ Mail via {}:{} to {}",
                config.email.smtp_host,
                config.email.smtp_port,
                config.email.to
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = LocalStorage::new(config.storage.state_dir.clone());
            log::info!("State directory: {}", storage.root_dir().display());

            match storage.load_stored().await? {
                Some(stored) => {
                    log::info!("Last updated: {}", stored.updated_at);
                    log::info!(
                        "Snapshot of {} postings captured {}",
                        stored.snapshot.len(),
                        stored.snapshot.captured_at
                    );
                    for (rank, posting) in stored.snapshot.postings.iter().enumerate() {
                        log::info!(
                            "  {}. [{}] {} - {}",
                            rank + 1,
                            posting.id,
                            posting.title,
                            posting.location_or_na()
                        );
                    }
                    match stored.notification.last_notified_at {
                        Some(at) => log::info!("Last notified: {}", at),
                        None => log::info!("Never notified"),
                    }
                }
                None => log::info!("No snapshot found yet."),
            }

            let runs = storage.read_runs().await?;
            log::info!("Runs recorded: {}", runs.len());
            for run in runs.iter().rev().take(RECENT_RUNS) {
                log::info!(
                    "  {} {:?} jobs={} changed={} notified={}{}",
                    run.timestamp,
                    run.outcome,
                    run.job_count,
                    run.changed,
                    run.notified,
                    run.error
                        .as_deref()
                        .map(|e| format!(" error={e}"))
                        .unwrap_or_default()
                );
                if !run.top.is_empty() {
                    let ids: Vec<&str> = run.top.iter().map(|p| p.id.as_str()).collect();
                    log::info!("    top: {}", ids.join(", "));
                }
            }

            if let Some(last) = storage.read_ips().await?.last() {
                log::info!("Last public IP: {} at {}", last.ip, last.timestamp);
            }
        }
    }

    Ok(())
}
