// ABOUTME: Console configuration loaded from sitetree.toml in the user's config directory
// ABOUTME: Covers the project list, search and lookup thresholds, navigation hit areas, and cache age

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sitetree_logging::{LoggingConfig, debug, warn};

use crate::debounce::{DEFAULT_MIN_LOOKUP_LEN, DEFAULT_QUIET_PERIOD};
use crate::navigation::DEFAULT_TOGGLE_HIT_WIDTH;
use crate::search::DEFAULT_MIN_QUERY_LEN;

pub const CONFIG_FILE_NAME: &str = "sitetree.toml";

/// Search field behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_min_query_len")]
    pub min_query_len: usize,
}

fn default_search_min_query_len() -> usize {
    DEFAULT_MIN_QUERY_LEN
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_search_min_query_len(),
        }
    }
}

impl SearchConfig {
    /// Characters needed before searching, never below the three-character floor
    pub fn threshold(&self) -> usize {
        self.min_query_len.max(DEFAULT_MIN_QUERY_LEN)
    }
}

/// Owner and reviewer lookup behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_lookup_min_query_len")]
    pub min_query_len: usize,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_QUIET_PERIOD.as_millis() as u64
}

fn default_lookup_min_query_len() -> usize {
    DEFAULT_MIN_LOOKUP_LEN
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_lookup_min_query_len(),
        }
    }
}

impl LookupConfig {
    /// Input quiet time before a lookup, never below 500ms
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms).max(DEFAULT_QUIET_PERIOD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Width of the expand toggle at the start of each sidebar row
    #[serde(default = "default_toggle_hit_width")]
    pub toggle_hit_width: f32,
}

fn default_toggle_hit_width() -> f32 {
    DEFAULT_TOGGLE_HIT_WIDTH
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            toggle_hit_width: default_toggle_hit_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cached trees older than this are refetched on next access
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_stale_after_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

fn default_projects() -> Vec<String> {
    vec!["canonical.com".to_string(), "ubuntu.com".to_string()]
}

/// Top-level console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Projects in the order the site selector lists them
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            search: SearchConfig::default(),
            lookup: LookupConfig::default(),
            navigation: NavigationConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Directory holding `sitetree.toml`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitetree")
    }

    /// Load from the standard location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(&Self::config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit file; a missing file yields the defaults.
    ///
    /// Unless `[logging.file] path` says otherwise, the log file sits next to the config file.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Self = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            config.validate()?;
            config
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.logging.file.place_beside(path);
        Ok(config)
    }

    /// Reject project lists the selector cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for project in &self.projects {
            if project.trim().is_empty() {
                bail!("Project names must not be empty");
            }
            if project.contains('/') {
                bail!("Project name '{project}' must not contain '/'");
            }
            if !seen.insert(project.as_str()) {
                bail!("Project '{project}' is listed more than once");
            }
        }

        if self.projects.is_empty() {
            warn!("No projects configured, the console will have nothing to show");
        }

        if self.navigation.toggle_hit_width < 0.0 {
            bail!("navigation.toggle_hit_width must not be negative");
        }

        if u128::from(self.lookup.debounce_ms) < DEFAULT_QUIET_PERIOD.as_millis() {
            bail!(
                "lookup.debounce_ms must be at least {}",
                DEFAULT_QUIET_PERIOD.as_millis()
            );
        }

        if self.search.min_query_len < DEFAULT_MIN_QUERY_LEN {
            bail!("search.min_query_len must be at least {DEFAULT_MIN_QUERY_LEN}");
        }

        Ok(())
    }
}
