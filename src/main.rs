//! CLI entry point for the telemetry repair tool.
//!
//! Provides subcommands for correcting per-channel OCR dumps into a wide
//! telemetry table and for inspecting a previously written table.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use telemetry_repair::aggregate::Table;
use telemetry_repair::output::{append_audit_log, read_table, write_table};
use telemetry_repair::repair::correct_channel_dir;
use telemetry_repair::series::{Channel, ChannelSummary};
use tracing::Instrument;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "telemetry-repair")]
#[command(about = "Repairs OCR-extracted telemetry time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct all channels found under an OCR dump directory
    Correct {
        /// Directory containing one subdirectory of frame .txt files per channel
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Wide CSV file to write the merged raw/corrected table to
        #[arg(short, long, default_value = "telemetry.csv")]
        output: PathBuf,

        /// Audit log file to append correction lines to
        #[arg(short, long, default_value = "corrections.log")]
        log: PathBuf,

        /// Maximum number of channels corrected concurrently
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Re-import a wide telemetry table and print a per-channel summary
    Inspect {
        /// Previously written wide CSV table
        #[arg(value_name = "FILE")]
        table: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/telemetry_repair.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("telemetry_repair.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Correct {
            input,
            output,
            log,
            concurrency,
        } => {
            correct_all_channels(&input, &output, &log, concurrency).await?;
        }
        Commands::Inspect { table } => {
            inspect_table(&table)?;
        }
    }

    Ok(())
}

/// Corrects every channel directory under `input` concurrently, then merges
/// the results into one wide table and one audit log.
///
/// Workers return pure values; the table and the audit log are written
/// serially here once all channels are done, so no shared file is ever
/// written from two tasks at once.
#[tracing::instrument(skip_all, fields(input = %input.display(), concurrency))]
async fn correct_all_channels(
    input: &Path,
    output: &Path,
    log: &Path,
    concurrency: usize,
) -> Result<()> {
    let started = std::time::Instant::now();
    let channel_dirs = discover_channel_dirs(input)?;
    info!(channels = channel_dirs.len(), "channel directories found");

    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut tasks = vec![];

    for (name, dir) in channel_dirs {
        let sem = semaphore.clone();

        let channel_span = tracing::info_span!("correct_channel", channel = %name);
        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await?;
                let worker_name = name.clone();
                let result = tokio::task::spawn_blocking(move || {
                    correct_channel_dir(&worker_name, &dir)
                })
                .await?;

                match &result {
                    Ok((_, _, summary)) => info!(
                        frames = summary.frames,
                        gap_filled = summary.gap_filled,
                        outliers = summary.outliers_corrected,
                        dropped = summary.dropped,
                        "channel corrected"
                    ),
                    Err(e) => error!(error = %e, "channel correction failed"),
                }
                result
            }
            .instrument(channel_span),
        );
        tasks.push(task);
    }

    let mut channels: Vec<Channel> = Vec::new();
    let mut audit: Vec<(String, Vec<String>)> = Vec::new();
    let mut summaries: Vec<ChannelSummary> = Vec::new();

    for task in tasks {
        // A failed channel contributes no data but never blocks the rest.
        match task.await? {
            Ok((channel, entries, summary)) => {
                let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
                audit.push((channel.name.clone(), lines));
                channels.push(channel);
                summaries.push(summary);
            }
            Err(_) => continue,
        }
    }

    let table = Table::from_channels(channels);
    write_table(output, &table)?;

    if audit.iter().any(|(_, lines)| !lines.is_empty()) {
        for (channel, lines) in &audit {
            append_audit_log(log, channel, lines)?;
        }
        info!(path = %log.display(), "audit log appended");
    }

    for summary in &summaries {
        info!("{}", serde_json::to_string(summary)?);
    }
    info!(elapsed_secs = started.elapsed().as_secs_f64(), "done");

    Ok(())
}

/// Every subdirectory of the input directory is one channel; the directory
/// name is the channel name.
fn discover_channel_dirs(input: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();

    for entry in std::fs::read_dir(input).with_context(|| format!("reading {}", input.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path()));
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Re-imports a wide table and logs per-channel frame counts as JSON.
fn inspect_table(path: &Path) -> Result<()> {
    let table = read_table(path)?;
    info!(
        channels = table.channels.len(),
        rows = table.frame_ids().len(),
        "table loaded"
    );

    for channel in table.channels.values() {
        let summary = ChannelSummary {
            timestamp: chrono::Utc::now(),
            channel: channel.name.clone(),
            frames: channel.raw.len(),
            dropped: channel.raw.len().saturating_sub(channel.corrected.len()),
            ..Default::default()
        };
        info!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
