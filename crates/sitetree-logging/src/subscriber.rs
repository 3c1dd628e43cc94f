// ABOUTME: Tracing subscriber initialization and layer composition
// ABOUTME: Combines console, file, and JSON layers with filtering for complete logging setup

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::layers::{
    BoxedLayer, create_console_layer, create_env_filter, create_file_layer, create_json_layer,
};

/// Keeps the background file writer alive; drop it on shutdown to flush.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber with the given configuration.
pub fn init_subscriber(config: LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = create_env_filter(&config).context("Failed to create environment filter")?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guard = None;

    if let Some(layer) = create_console_layer(&config.output) {
        layers.push(layer);
    }
    if let Some(layer) = create_json_layer(&config.output) {
        layers.push(layer);
    }
    if config.output.file {
        let (layer, guard) = create_file_layer(&config.file)?;
        layers.push(layer);
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        log_level = %config.level,
        console_output = config.output.console,
        file_output = config.output.file,
        json_output = config.output.json,
        file_path = %config.file.resolved_path().display(),
        "Sitetree logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
