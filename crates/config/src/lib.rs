#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for npmirror
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/npmirror/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod resources_semaphore;

use npmirror_errors::{ConfigError, Error};
use npmirror_types::ColorChoice;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Path configuration; unset entries fall back to platform directories
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub cache_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Registry endpoint and HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    #[serde(default = "default_metadata_lookups")]
    pub metadata_lookups: usize,
    #[serde(default = "default_downloads")]
    pub downloads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default)]
    pub strict_lookups: bool,
    /// 0 disables the run timeout
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            metadata_lookups: default_metadata_lookups(),
            downloads: default_downloads(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_start: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            strict_lookups: false,
            timeout_secs: 0,
        }
    }
}

// Default value functions for serde
fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_registry_url() -> String {
    constants::DEFAULT_REGISTRY.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_metadata_lookups() -> usize {
    8
}

fn default_downloads() -> usize {
    4
}

fn default_cron() -> String {
    constants::DEFAULT_CRON.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(constants::APP_DIR).join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with process environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with variables resolved by `lookup`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending variable.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CACHE_FOLDER") {
            self.paths.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(cron) = lookup("CRON_TIME") {
            self.schedule.cron = cron;
        }

        // NPMIRROR_REGISTRY
        if let Some(url) = lookup("NPMIRROR_REGISTRY") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(invalid("NPMIRROR_REGISTRY", url));
            }
            self.registry.url = url;
        }

        if let Some(dir) = lookup("NPMIRROR_OUTPUT_DIR") {
            self.paths.output_dir = Some(PathBuf::from(dir));
        }

        if let Some(downloads) = lookup("NPMIRROR_PARALLEL_DOWNLOADS") {
            self.concurrency.downloads = parse_count("NPMIRROR_PARALLEL_DOWNLOADS", downloads)?;
        }

        if let Some(lookups) = lookup("NPMIRROR_PARALLEL_LOOKUPS") {
            self.concurrency.metadata_lookups = parse_count("NPMIRROR_PARALLEL_LOOKUPS", lookups)?;
        }

        if let Some(value) = lookup("NPMIRROR_RUN_ON_START") {
            self.schedule.run_on_start = parse_bool("NPMIRROR_RUN_ON_START", value)?;
        }

        if let Some(value) = lookup("NPMIRROR_STRICT_LOOKUPS") {
            self.run.strict_lookups = parse_bool("NPMIRROR_STRICT_LOOKUPS", value)?;
        }

        Ok(())
    }

    /// Check values that serde cannot validate on its own
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a bad cron expression or a
    /// zero concurrency limit.
    pub fn validate(&self) -> Result<(), Error> {
        self.cron_schedule()?;
        if self.concurrency.metadata_lookups == 0 {
            return Err(invalid("concurrency.metadata_lookups", "0"));
        }
        if self.concurrency.downloads == 0 {
            return Err(invalid("concurrency.downloads", "0"));
        }
        Ok(())
    }

    /// Parse the configured cron expression
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the expression does not parse.
    pub fn cron_schedule(&self) -> Result<cron::Schedule, Error> {
        cron::Schedule::from_str(&self.schedule.cron)
            .map_err(|_| invalid("schedule.cron", self.schedule.cron.clone()))
    }

    /// Cache root (with default)
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.paths.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(constants::APP_DIR)
        })
    }

    /// Directory holding cached registry documents
    #[must_use]
    pub fn metadata_cache_dir(&self) -> PathBuf {
        self.cache_dir().join(constants::METADATA_DIR)
    }

    /// Directory holding cached tarballs
    #[must_use]
    pub fn package_cache_dir(&self) -> PathBuf {
        self.cache_dir().join(constants::PACKAGES_DIR)
    }

    /// Where destination folders and archives are written (with default)
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.paths
            .output_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Tracked-record database path (with default)
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.paths
            .db_path
            .clone()
            .unwrap_or_else(|| self.cache_dir().join(constants::DB_FILE))
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths
            .log_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir().join(constants::LOGS_DIR))
    }

    /// Run timeout, `None` when disabled
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run.timeout_secs > 0).then(|| Duration::from_secs(self.run.timeout_secs))
    }
}

fn invalid(field: &str, value: impl Into<String>) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.into(),
    }
    .into()
}

fn parse_count(field: &str, value: String) -> Result<usize, Error> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(field, value)),
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(field, value)),
    }
}
