//! Configuration management for leakscan.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Largest page size the GitHub search API accepts.
const MAX_PER_PAGE: u32 = 100;

/// Main application configuration.
///
/// This is loaded from `~/.config/leakscan/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan scheduling settings
    pub search: SearchConfig,
    /// Search provider settings
    pub github: GithubConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Rule seeding settings
    pub rules: RulesConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides, then validate.
    ///
    /// Supports the following environment variables:
    /// - `LEAKSCAN_GITHUB_TOKENS`: comma separated access tokens
    /// - `LEAKSCAN_DB_PATH`: database file path
    /// - `LEAKSCAN_BATCH_SIZE`: rules per batch
    /// - `LEAKSCAN_CYCLE_INTERVAL_SECS`: seconds between scan cycles
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored and the configured value is kept.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("LEAKSCAN_GITHUB_TOKENS") {
            self.github.tokens = val
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(ToString::to_string)
                .collect();
            tracing::debug!(
                "Override github.tokens from env: {} token(s)",
                self.github.tokens.len()
            );
        }

        if let Some(val) = lookup("LEAKSCAN_DB_PATH") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("LEAKSCAN_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                self.search.batch_size = size;
                tracing::debug!("Override search.batch_size from env: {}", size);
            }
        }

        if let Some(val) = lookup("LEAKSCAN_CYCLE_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.search.cycle_interval_secs = secs;
                tracing::debug!("Override search.cycle_interval_secs from env: {}", secs);
            }
        }
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.search.batch_size == 0 {
            return Err(invalid("search.batch_size", "must be greater than zero"));
        }
        if self.search.max_concurrent_searches == 0 {
            return Err(invalid(
                "search.max_concurrent_searches",
                "must be greater than zero",
            ));
        }
        if self.github.per_page == 0 || self.github.per_page > MAX_PER_PAGE {
            return Err(invalid(
                "github.per_page",
                &format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        if self.github.max_pages == 0 {
            return Err(invalid("github.max_pages", "must be greater than zero"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid(
                "database.max_connections",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/leakscan/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/leakscan`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the database file, defaulting to `leakscan.db` in the data dir.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("leakscan.db")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "leakscan", "leakscan").ok_or(ConfigError::NoConfigDir)
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Scan scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Rules per batch
    pub batch_size: usize,
    /// Minimum wall-clock seconds one batch occupies
    pub per_batch_budget_secs: u64,
    /// Seconds to sleep between scan cycles
    pub cycle_interval_secs: u64,
    /// Upper bound on in-flight searches within a batch
    pub max_concurrent_searches: usize,
    /// Path suffixes marking low-priority findings
    pub ignored_extensions: Vec<String>,
}

impl SearchConfig {
    /// Per-batch pacing budget as a `Duration`.
    #[must_use]
    pub fn per_batch_budget(&self) -> Duration {
        Duration::from_secs(self.per_batch_budget_secs)
    }

    /// Cycle interval as a `Duration`.
    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            per_batch_budget_secs: 60,
            cycle_interval_secs: 900,
            max_concurrent_searches: 25,
            ignored_extensions: default_ignored_extensions(),
        }
    }
}

fn default_ignored_extensions() -> Vec<String> {
    [
        ".min.js", ".min.css", ".map", ".lock", ".sum", ".svg", ".png", ".jpg", ".jpeg", ".gif",
        ".ico", ".bmp", ".woff", ".woff2", ".ttf", ".eot", ".pdf", ".zip", ".gz", ".tar", ".jar",
        ".exe", ".dll", ".so", ".dylib", ".class", ".pyc",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Access tokens, used round-robin
    pub tokens: Vec<String>,
    /// Results per page (max 100)
    pub per_page: u32,
    /// Pages fetched per rule
    pub max_pages: u32,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            tokens: Vec::new(),
            per_page: MAX_PER_PAGE,
            max_pages: 3,
            timeout_secs: 30,
            user_agent: "leakscan/0.1.0 (+https://github.com/leakscan/leakscan)".to_string(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; defaults to the data directory
    pub path: Option<PathBuf>,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

/// Rule seeding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Optional TOML rule file imported at startup
    pub file: Option<PathBuf>,
}
