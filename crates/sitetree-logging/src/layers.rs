// ABOUTME: Layer constructors for the different logging outputs
// ABOUTME: Console, rolling file, and JSON layers plus the environment filter

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
};

use crate::config::{FileConfig, LoggingConfig, OutputConfig};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Create a human-readable console layer on stderr, leaving stdout to
/// command output.
///
/// Returns `None` when console output is disabled or when JSON output
/// takes over the console.
pub fn create_console_layer(config: &OutputConfig) -> Option<BoxedLayer> {
    if !config.console || config.json {
        return None;
    }

    let layer = if config.pretty_console {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .pretty()
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    Some(layer)
}

/// Create a daily-rolling file layer that keeps `max_files` days of logs.
///
/// The returned guard flushes the non-blocking writer when dropped and must
/// be kept alive for as long as logging is needed.
pub fn create_file_layer(config: &FileConfig) -> Result<(BoxedLayer, WorkerGuard)> {
    let path = config.resolved_path();
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory).with_context(|| {
        format!("Failed to create log directory: {}", directory.display())
    })?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Invalid log file path")?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(config.max_files.max(1))
        .build(directory)
        .with_context(|| format!("Failed to open log file in {}", directory.display()))?;
    let (writer, guard) = non_blocking(file_appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .boxed();

    Ok((layer, guard))
}

/// Create a JSON layer on stderr for structured log shipping.
pub fn create_json_layer(config: &OutputConfig) -> Option<BoxedLayer> {
    if !config.json {
        return None;
    }

    let layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .boxed();

    Some(layer)
}

/// Create an environment filter from the logging configuration.
pub fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(config.level.to_string());

    for (module, level) in &config.module_levels {
        filter = filter.add_directive(
            format!("{module}={level}")
                .parse()
                .context(format!("Invalid filter directive for module '{module}'"))?,
        );
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use tempfile::tempdir;
    use tracing::Level;

    #[test]
    fn test_create_console_layer() {
        let config = OutputConfig {
            console: true,
            ..Default::default()
        };
        assert!(create_console_layer(&config).is_some());

        let config = OutputConfig {
            console: false,
            ..Default::default()
        };
        assert!(create_console_layer(&config).is_none());

        // JSON output owns the console
        let config = OutputConfig {
            console: true,
            json: true,
            ..Default::default()
        };
        assert!(create_console_layer(&config).is_none());
    }

    #[test]
    fn test_create_json_layer() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        assert!(create_json_layer(&config).is_some());
        assert!(create_json_layer(&OutputConfig::default()).is_none());
    }

    #[test]
    fn test_create_file_layer_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");
        let config = FileConfig {
            path: Some(log_dir.join("sitetree.log")),
            max_files: 3,
        };

        let result = create_file_layer(&config);
        assert!(result.is_ok());
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_create_env_filter() {
        let mut config = LoggingConfig {
            level: LogLevel(Level::DEBUG),
            ..Default::default()
        };
        config
            .module_levels
            .insert("sitetree_core".to_string(), LogLevel(Level::TRACE));

        assert!(create_env_filter(&config).is_ok());

        // the keystroke defaults are valid directives too
        assert!(create_env_filter(&LoggingConfig::default()).is_ok());
    }
}
