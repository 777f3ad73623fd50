mod metrics;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester_core::{load_config, run_job, validate_config, JobError, RunSummary};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    if let Err(e) = run() {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Logs go to stderr; stdout carries the run summary
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Config path: first argument, then HARVESTER_CONFIG, then ./harvester.toml
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HARVESTER_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("harvester.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        job = config.job.name(),
        config_hash = &config_hash[..16],
        "Configuration loaded"
    );

    let started = Instant::now();
    let result = run_job(&config);
    let elapsed = started.elapsed().as_secs_f64();

    metrics::record_run(config.job.name(), elapsed, result.is_ok());
    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = metrics::write_textfile(path) {
            warn!("Failed to write metrics to {:?}: {}", path, e);
        }
    }

    match result {
        Ok(report) => {
            print_summary(&report.summary)?;
            if let Some(detail) = &report.detail {
                println!("{}", detail);
            }
            info!(elapsed_secs = elapsed, "Job finished");
            Ok(())
        }
        Err(e) => {
            if let Some(summary) = e.summary() {
                print_summary(summary)?;
            }
            if let JobError::Ingest(aborted) = &e {
                if aborted.is_retryable() {
                    info!(
                        cursor = aborted.summary.end_cursor,
                        "Rerun to resume from the last checkpoint"
                    );
                }
            }
            Err(e).with_context(|| format!("Job {} failed", config.job.name()))
        }
    }
}

fn print_summary(summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to encode summary")?;
    println!("{}", json);
    Ok(())
}
