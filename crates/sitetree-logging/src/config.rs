// ABOUTME: Logging settings for the sitetree console, read from the [logging] table of sitetree.toml
// ABOUTME: Environment and command line overrides, quiet defaults for per-keystroke modules, log file placement

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

pub const LOG_FILE_NAME: &str = "sitetree.log";

/// Modules that log on every keystroke. They stay at info when the global
/// level is raised and only get louder when named explicitly.
pub const KEYSTROKE_MODULES: [&str; 2] = ["sitetree_core::debounce", "sitetree_core::search"];

/// A tracing level spelled the way config files and `RUST_LOG` spell it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogLevel(pub Level);

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_log_level(s).map(LogLevel)
    }
}

impl TryFrom<String> for LogLevel {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.as_str().to_lowercase())
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        LogLevel(level)
    }
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        log_level.0
    }
}

/// The `[logging]` table of `sitetree.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,

    /// Per-module overrides, e.g. `"sitetree_core::selection" = "debug"`
    pub module_levels: HashMap<String, LogLevel>,

    pub output: OutputConfig,

    pub file: FileConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Human-readable lines on stderr; stdout belongs to command output
    pub console: bool,

    pub file: bool,

    /// JSON lines on stderr in place of the console format
    pub json: bool,

    pub pretty_console: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Explicit log file. When unset the log lives next to `sitetree.toml`.
    pub path: Option<PathBuf>,

    /// Daily files kept before the oldest is deleted
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let module_levels = KEYSTROKE_MODULES
            .iter()
            .map(|module| (module.to_string(), LogLevel(Level::INFO)))
            .collect();

        Self {
            level: LogLevel(Level::WARN),
            module_levels,
            output: OutputConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            console: true,
            file: true,
            json: false,
            pretty_console: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_files: 7,
        }
    }
}

impl FileConfig {
    /// The file the file layer writes to
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_log_file_path)
    }

    /// Put the log beside a config file unless a path was set explicitly
    pub fn place_beside(&mut self, config_file: &Path) {
        if self.path.is_some() {
            return;
        }
        if let Some(dir) = config_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            self.path = Some(dir.join(LOG_FILE_NAME));
        }
    }
}

/// Logging switches taken from the process environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `SITETREE_LOG`, a single level
    pub sitetree_log: Option<String>,
    /// `RUST_LOG`, consulted only when `SITETREE_LOG` is unset
    pub rust_log: Option<String>,
    pub json: bool,
    pub no_console: bool,
    pub no_file: bool,
}

impl EnvOverrides {
    pub fn capture() -> Self {
        Self {
            sitetree_log: env::var("SITETREE_LOG").ok(),
            rust_log: env::var("RUST_LOG").ok(),
            json: env::var_os("SITETREE_LOG_JSON").is_some(),
            no_console: env::var_os("SITETREE_LOG_NO_CONSOLE").is_some(),
            no_file: env::var_os("SITETREE_LOG_NO_FILE").is_some(),
        }
    }
}

impl LoggingConfig {
    /// Defaults with the environment applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply(&EnvOverrides::capture())
    }

    pub fn apply(&mut self, overrides: &EnvOverrides) -> Result<()> {
        if let Some(level) = &overrides.sitetree_log {
            self.level = level.parse().context("Invalid SITETREE_LOG level")?;
        } else if let Some(directives) = &overrides.rust_log {
            self.parse_rust_log(directives)?;
        }

        self.output.json |= overrides.json;
        self.output.console &= !overrides.no_console;
        self.output.file &= !overrides.no_file;
        Ok(())
    }

    /// Raise the global level to at least `level`; never lowers it.
    pub fn raise_level(&mut self, level: Level) {
        // tracing orders more verbose levels higher
        if level > self.level.0 {
            self.level = LogLevel(level);
        }
    }

    /// Apply `RUST_LOG` style directives such as `info,sitetree_core::sync=debug`.
    pub(crate) fn parse_rust_log(&mut self, rust_log: &str) -> Result<()> {
        let directives = rust_log
            .split(',')
            .map(str::trim)
            .filter(|directive| !directive.is_empty());

        for directive in directives {
            match directive.split_once('=') {
                Some((module, level)) => {
                    let level = level.parse().with_context(|| {
                        format!("Invalid log level '{level}' for module '{module}'")
                    })?;
                    self.module_levels.insert(module.to_string(), level);
                }
                None => {
                    self.level = directive
                        .parse()
                        .with_context(|| format!("Invalid global log level '{directive}'"))?;
                }
            }
        }
        Ok(())
    }
}

/// `~/.config/sitetree/sitetree.log`, or the working directory without a config dir
fn default_log_file_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("sitetree").join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

pub(crate) fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Invalid log level: {level_str}. Must be one of: trace, debug, info, warn, error"
        ),
    }
}
