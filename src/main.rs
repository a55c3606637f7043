//! Crime Rate Predictor - Main Entry Point
//!
//! Loads the model artifact and its metadata once, then serves an interactive
//! prediction form on the terminal.

use anyhow::{Context, Result};
use crime_rate_predictor::{
    config::{AppConfig, LoggingConfig},
    metrics::SessionMetrics,
    FormSession, PredictionContext,
};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!("Starting Crime Rate Predictor");
    info!(
        model = %config.artifacts.model_path.display(),
        metadata = %config.artifacts.metadata_path.display(),
        format = ?config.artifacts.format,
        "Configuration loaded"
    );

    // Artifacts are a build-time dependency; without them there is nothing to serve
    let ctx = PredictionContext::load(&config).context("Failed to load model artifacts")?;

    let metrics = SessionMetrics::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    FormSession::new(&ctx, &metrics, stdin.lock(), stdout.lock())
        .run()
        .context("Terminal session failed")?;

    info!("Session ended");
    metrics.print_summary();

    Ok(())
}

/// Logs go to stderr so they never interleave with the form on stdout
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("crime_rate_predictor={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
