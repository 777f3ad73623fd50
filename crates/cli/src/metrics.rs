//! Prometheus metrics export for a single job run.
//!
//! The binary exits when the job ends, so metrics are written once to a
//! node-exporter style text file instead of being served.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Wall-clock duration of the last run.
pub static JOB_DURATION_SECONDS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "harvester_job_duration_seconds",
            "Wall-clock duration of the last job run",
        ),
        &["job"],
    )
    .unwrap()
});

/// Unix time of the last run that ended without a fatal error.
pub static JOB_LAST_SUCCESS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "harvester_job_last_success_timestamp_seconds",
            "Unix time of the last successful job run",
        ),
        &["job"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(JOB_DURATION_SECONDS.clone()))
        .unwrap();
    registry
        .register(Box::new(JOB_LAST_SUCCESS.clone()))
        .unwrap();

    for metric in harvester_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Record the outcome of a run.
pub fn record_run(job: &str, seconds: f64, success: bool) {
    JOB_DURATION_SECONDS.with_label_values(&[job]).set(seconds);
    if success {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        JOB_LAST_SUCCESS.with_label_values(&[job]).set(now);
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Write the encoded metrics to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, encode_metrics())?;
    fs::rename(&tmp, path)
}
