use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use alpha_tracker::config::{self, Config};
use alpha_tracker::evaluator::backtest::{load_history, sample_history};
use alpha_tracker::evaluator::{BacktestRunner, TokenScorer};
use alpha_tracker::listing::Chain;
use alpha_tracker::monitoring::report::{render_backtest, render_tokens};
use alpha_tracker::monitoring::SnapshotWriter;
use alpha_tracker::pipeline::{Scheduler, Tracker, TrackerContext};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the listing API on the configured interval until Ctrl-C
    Start,
    /// Run a single tracking cycle and print the qualifying tokens
    Scan {
        /// Only show tokens on this chain (sol, eth, bsc, arbi, base)
        #[arg(long)]
        chain: Option<Chain>,
    },
    /// Replay filter and scorer over historical records
    Backtest {
        /// JSON file of historical records; the built-in sample is used otherwise
        #[arg(long)]
        input: Option<PathBuf>,
        /// Override the alert score threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Print the snapshot written by the last cycle
    Show {
        #[arg(long)]
        chain: Option<Chain>,
    },
    /// Print the effective configuration and configured collaborators
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting alpha-tracker");

    let config = config::load_config()?;

    match cli.command {
        Some(Commands::Start) => run_tracker(&config).await?,
        Some(Commands::Scan { chain }) => {
            let tracker = Tracker::from_config(&config)?;
            let mut ctx = TrackerContext::new(config.poll_interval());
            let report = tracker.run_cycle(&mut ctx).await;

            let writer = SnapshotWriter::new(&config.snapshot_dir)?;
            if let Err(e) = writer.write(&report).await {
                error!("Failed to write snapshot: {:#}", e);
            }
            print!("{}", render_tokens(&report, chain));
        }
        Some(Commands::Backtest { input, threshold }) => {
            let history = match input {
                Some(path) => load_history(&path)
                    .with_context(|| format!("loading historical records from {}", path.display()))?,
                None => sample_history(),
            };
            let threshold = threshold.unwrap_or(config.alert_score_threshold);
            let runner = BacktestRunner::new(
                &config.filter,
                TokenScorer::new(config.scoring.clone(), threshold),
            );
            print!("{}", render_backtest(&runner.run(&history)));
        }
        Some(Commands::Show { chain }) => {
            let writer = SnapshotWriter::new(&config.snapshot_dir)?;
            match writer.read().await? {
                Some(report) => {
                    println!("Snapshot from {}", report.started_at);
                    print!("{}", render_tokens(&report, chain));
                }
                None => println!("No data: no snapshot at {}", writer.path().display()),
            }
        }
        Some(Commands::Check) => check_config(&config),
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn run_tracker(config: &Config) -> Result<()> {
    let tracker = Tracker::from_config(config)?;
    let snapshot = SnapshotWriter::new(&config.snapshot_dir)?;
    let mut ctx = TrackerContext::new(config.poll_interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(config.poll_interval());
    let cycles = scheduler
        .run(&tracker, &mut ctx, Some(&snapshot), shutdown_rx)
        .await;

    info!("Tracker stopped after {} cycles, {} pairs alerted", cycles, ctx.alerted.len());
    Ok(())
}

fn check_config(config: &Config) {
    println!("Chains:               {:?}", config.chains);
    println!("Filter:               {:?}", config.filter);
    println!("Scoring:              {:?}", config.scoring);
    println!("Alert threshold:      {}", config.alert_score_threshold);
    println!("Whale threshold USD:  {}", config.whale_threshold_usd);
    println!("Poll interval:        {}s", config.poll_interval_secs);
    println!("Request timeout:      {}s", config.request_timeout_secs);
    println!("Snapshot dir:         {}", config.snapshot_dir.display());
    println!();
    for (name, configured) in config.collaborator_status() {
        println!(
            "{:<10} {}",
            name,
            if configured { "configured" } else { "not configured (defaults used)" }
        );
    }
}
