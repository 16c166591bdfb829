// src/config.rs

//! Manages service configuration: loading, layering environment overrides, and validation.
//!
//! Values are resolved once at startup, lowest precedence first: built-in defaults,
//! an optional TOML file, then environment variables. The resolved `Config` is
//! validated before anything is built from it and is never re-read afterwards.

use crate::core::BloomGuardError;
use crate::core::storage::FilterParams;
use crate::core::storage::params::{self, MAX_FILTER_BITS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variables that override file values, mapped to their config keys.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("EXPECTED_ELEMENTS", "filter.expected_elements"),
    ("FALSE_POSITIVE_PROBABILITY", "filter.false_positive_probability"),
    ("BLOOM_FILTER_FILE_NAME", "persistence.snapshot_path"),
    ("BLOOMGUARD_HOST", "host"),
    ("BLOOMGUARD_PORT", "port"),
    ("BLOOMGUARD_LOG_LEVEL", "log_level"),
];

/// Parameters the fresh filter is derived from.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FilterConfig {
    /// The number of distinct items the filter is sized for.
    #[serde(default = "default_expected_elements")]
    pub expected_elements: u64,
    /// The target false-positive probability, strictly between 0 and 1.
    #[serde(default = "default_false_positive_probability")]
    pub false_positive_probability: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_elements: default_expected_elements(),
            false_positive_probability: default_false_positive_probability(),
        }
    }
}

impl FilterConfig {
    /// Derives the filter dimensions. Only meaningful once the config is validated.
    pub fn params(&self) -> FilterParams {
        FilterParams::derive(self.expected_elements, self.false_positive_probability)
    }
}

fn default_expected_elements() -> u64 {
    100
}
fn default_false_positive_probability() -> f64 {
    0.05
}

/// What startup does when a snapshot exists but cannot be loaded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailurePolicy {
    /// Abort startup.
    #[default]
    Fail,
    /// Log the failure and start from a freshly built filter.
    Fresh,
}

/// Snapshot persistence settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PersistenceConfig {
    pub snapshot_path: String,
    pub on_load_failure: LoadFailurePolicy,
    pub save_timeout_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: String::new(),
            on_load_failure: LoadFailurePolicy::default(),
            save_timeout_ms: default_save_timeout_ms(),
        }
    }
}

impl PersistenceConfig {
    pub fn snapshot_path(&self) -> &Path {
        Path::new(&self.snapshot_path)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }
}

fn default_save_timeout_ms() -> u64 {
    5000
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8878
}

/// The snapshot path has no default, so it is optional until validation.
#[derive(Deserialize)]
struct RawPersistenceConfig {
    snapshot_path: Option<String>,
    #[serde(default)]
    on_load_failure: LoadFailurePolicy,
    #[serde(default = "default_save_timeout_ms")]
    save_timeout_ms: u64,
}

impl Default for RawPersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            on_load_failure: LoadFailurePolicy::default(),
            save_timeout_ms: default_save_timeout_ms(),
        }
    }
}

/// A raw representation of the layered config before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    filter: FilterConfig,
    #[serde(default)]
    persistence: RawPersistenceConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Represents the final, validated, and resolved service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub filter: FilterConfig,
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            filter: FilterConfig::default(),
            persistence: PersistenceConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            filter: raw.filter,
            persistence: PersistenceConfig {
                snapshot_path: raw.persistence.snapshot_path.unwrap_or_default(),
                on_load_failure: raw.persistence.on_load_failure,
                save_timeout_ms: raw.persistence.save_timeout_ms,
            },
            metrics: raw.metrics,
        }
    }
}

impl Config {
    /// Loads the configuration from an optional TOML file and the process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads the configuration, reading environment overrides through `env`.
    ///
    /// A `path` that does not exist is skipped, so the service can be
    /// configured from the environment alone.
    pub fn load_with_env<F>(path: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder
                .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false));
        }
        for &(var, key) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(key, env(var))
                .with_context(|| format!("Failed to apply environment variable {var}"))?;
        }

        let raw: RawConfig = builder
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration values")?;

        let config = Config::from(raw);
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), BloomGuardError> {
        let mut problems = Vec::new();

        if self.filter.expected_elements < 1 {
            problems.push("filter.expected_elements: must be at least 1".to_string());
        }
        let p = self.filter.false_positive_probability;
        // Written so that NaN is rejected too.
        let p_in_range = p > 0.0 && p < 1.0;
        if !p_in_range {
            problems.push(format!(
                "filter.false_positive_probability: must be strictly between 0 and 1, got {p}"
            ));
        }
        if p_in_range && self.filter.expected_elements >= 1 {
            let bits = params::required_bits(self.filter.expected_elements, p);
            if !(bits.is_finite() && bits <= MAX_FILTER_BITS as f64) {
                problems.push(format!(
                    "filter: {} expected elements at p={} need {:.0} bits, above the limit of {}",
                    self.filter.expected_elements, p, bits, MAX_FILTER_BITS
                ));
            }
        }
        if self.persistence.snapshot_path.trim().is_empty() {
            problems.push(
                "persistence.snapshot_path: is required (set BLOOM_FILTER_FILE_NAME)".to_string(),
            );
        }
        if self.persistence.save_timeout_ms == 0 {
            problems.push("persistence.save_timeout_ms: cannot be 0".to_string());
        }
        if self.port == 0 {
            problems.push("port: cannot be 0".to_string());
        }
        if self.host.trim().is_empty() {
            problems.push("host: cannot be empty".to_string());
        }
        if self.metrics.enabled {
            if self.metrics.port == 0 {
                problems.push("metrics.port: cannot be 0".to_string());
            }
            if self.metrics.port == self.port {
                problems.push(
                    "metrics.port: cannot be the same as the main server port".to_string(),
                );
            }
        }

        if !problems.is_empty() {
            return Err(BloomGuardError::ConfigValidation(problems));
        }
        Ok(())
    }
}
