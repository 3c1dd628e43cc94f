// ABOUTME: Public API for sitetree logging infrastructure using tokio-tracing
// ABOUTME: Provides centralized configuration and initialization for structured logging

pub mod config;
pub mod layers;
pub mod subscriber;


// Re-export tracing macros for convenience
pub use tracing::{Level, Span, debug, error, info, instrument, span, trace, warn};

// Re-export configuration types
pub use config::{EnvOverrides, FileConfig, LogLevel, LoggingConfig, OutputConfig};

// Re-export initialization functions
pub use subscriber::{LoggingGuard, init_subscriber};

use anyhow::Result;

/// Initialize logging with configuration taken from the environment.
///
/// Falls back to the defaults when no `SITETREE_LOG*` or `RUST_LOG`
/// variables are set.
pub fn init_logging() -> Result<LoggingGuard> {
    let config = LoggingConfig::from_env()?;
    init_subscriber(config)
}

/// Initialize logging with custom configuration.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<LoggingGuard> {
    init_subscriber(config)
}
