//! hygrolog control tool
//!
//! Runs the sensor by hand and inspects the history log without a running daemon.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use hygrolog_core::{HistoryLog, LogEntry, SensorReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hygrologctl")]
#[command(about = "Control tool for the hygrolog sensor and history log")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor once and print the reading
    Sample {
        /// Sensor executable
        #[arg(long, default_value = hygrolog_core::DEFAULT_SENSOR_PATH)]
        sensor: PathBuf,

        /// Kill the sensor after this many seconds (0 = never)
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Print recent history entries
    History {
        /// History log file
        #[arg(long, default_value = hygrolog_core::DEFAULT_LOG_PATH)]
        log: PathBuf,

        /// How many hours back to show
        #[arg(long, default_value = "24")]
        hours: i64,

        /// Print a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sample { sensor, timeout } => handle_sample(sensor, timeout).await,
        Commands::History { log, hours, json } => handle_history(&log, hours, json).await,
    }
}

async fn handle_sample(sensor: PathBuf, timeout: u64) -> Result<()> {
    let mut reader = SensorReader::new(sensor);
    if timeout > 0 {
        reader = reader.with_timeout(std::time::Duration::from_secs(timeout));
    }

    debug!("Sampling {}", reader.path().display());
    let reading = reader.sample().await.context("Sensor read failed")?;
    println!("{}", reading);
    Ok(())
}

async fn handle_history(log: &Path, hours: i64, json: bool) -> Result<()> {
    if hours <= 0 {
        anyhow::bail!("Hours must be positive");
    }

    debug!("Reading history from {}", log.display());
    let history = HistoryLog::new(log);
    let window = Duration::try_hours(hours).context("Hours out of range")?;
    let since = Utc::now()
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let entries = history
        .read_window(since)
        .await
        .with_context(|| format!("Failed to read {}", log.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No entries in the last {} hours", hours);
    } else {
        for entry in &entries {
            println!("{}", format_entry(entry));
        }
    }

    Ok(())
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{}  {}",
        entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        entry.reading()
    )
}
