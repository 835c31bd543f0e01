//! Configuration management
//!
//! Handles loading and validating pool/churn configuration from TOML files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::connection::CONNECTION_ID_LENGTH;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub churn: ChurnConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-identifier pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Bytes per slot
    #[serde(default = "default_slot_size")]
    pub slot_size: usize,
    /// Slots added per growth event (0 = one OS page worth)
    #[serde(default)]
    pub growth_rate: usize,
    /// Track outstanding slots and panic on bad releases
    /// (unset = on in debug builds only)
    #[serde(default)]
    pub verify_releases: Option<bool>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slot_size: default_slot_size(),
            growth_rate: 0,
            verify_releases: None,
        }
    }
}

impl PoolConfig {
    /// Get effective growth rate (derive from page size if 0)
    pub fn effective_growth_rate(&self, page_size: usize) -> usize {
        if self.growth_rate == 0 {
            (page_size / self.slot_size.max(1)).max(1)
        } else {
            self.growth_rate
        }
    }

    pub fn effective_verify_releases(&self) -> bool {
        self.verify_releases.unwrap_or(cfg!(debug_assertions))
    }
}

/// Churn driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChurnConfig {
    /// Number of worker threads (0 = auto)
    #[serde(default)]
    pub workers: usize,
    /// Connections each worker keeps open at once
    #[serde(default = "default_in_flight")]
    pub in_flight: usize,
    /// Run time in seconds (0 = until shutdown signal)
    #[serde(default)]
    pub duration_secs: u64,
    /// Time each connection holds its identifier buffer
    #[serde(default)]
    pub hold_micros: u64,
    /// Status report interval in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            in_flight: default_in_flight(),
            duration_secs: 0,
            hold_micros: 0,
            report_interval_secs: default_report_interval(),
        }
    }
}

impl ChurnConfig {
    /// Get effective worker count (auto-detect if 0)
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics endpoint
    #[serde(default)]
    pub enabled: bool,
    /// Metrics server bind address
    #[serde(default = "default_metrics_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: default_metrics_addr(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Text log for errors and status lines
    #[serde(default)]
    pub error_log: Option<PathBuf>,
    /// Status line format in the text log: "console" or "csv"
    #[serde(default = "default_status_format")]
    pub status_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            error_log: None,
            status_format: default_status_format(),
        }
    }
}

// Default value functions
fn default_slot_size() -> usize { CONNECTION_ID_LENGTH }
fn default_in_flight() -> usize { 64 }
fn default_report_interval() -> u64 { 5 }
fn default_metrics_addr() -> SocketAddr { SocketAddr::from(([127, 0, 0, 1], 9090)) }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_status_format() -> String { "console".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.pool.slot_size == 0 {
            anyhow::bail!("slot_size must be > 0");
        }
        if self.churn.in_flight == 0 {
            anyhow::bail!("in_flight must be > 0");
        }
        if self.churn.report_interval_secs == 0 {
            anyhow::bail!("report_interval_secs must be > 0");
        }
        if !matches!(self.logging.status_format.as_str(), "console" | "csv") {
            anyhow::bail!("status_format must be \"console\" or \"csv\"");
        }
        Ok(())
    }
}
