//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and the merge
//! between them (CLI takes precedence).

pub mod cli;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default master listen port (kept from the original deployment)
pub const DEFAULT_MASTER_PORT: u16 = 10000;

/// Master configuration
///
/// Every field has a default so a bare `pipulse --mode master` works; a TOML
/// file and CLI flags can override individual settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Port the master listens on for client and worker traffic
    pub listen_port: u16,

    /// Health monitor probe period in milliseconds
    pub probe_period_ms: u64,

    /// Transport timeout for a single liveness probe, in milliseconds.
    /// Kept below the probe period so a dead worker is evicted within one cycle.
    pub probe_timeout_ms: u64,

    /// Transport timeout for a sampling call, in milliseconds
    pub call_timeout_ms: u64,

    /// Append-only statistics log written when test-mode tiers finalize
    pub stats_log: PathBuf,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_MASTER_PORT,
            probe_period_ms: 500,
            probe_timeout_ms: 300,
            call_timeout_ms: 30_000,
            stats_log: PathBuf::from("pi_stats.log"),
        }
    }
}

impl MasterConfig {
    /// Probe period as a Duration
    pub fn probe_period(&self) -> Duration {
        Duration::from_millis(self.probe_period_ms)
    }

    /// Probe timeout as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Sampling call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Port the worker listens on for master calls
    pub listen_port: u16,

    /// Master address to register with (host:port)
    pub master_addr: String,

    /// Worker name. When empty, derived as `worker{N+1}` from the master's
    /// current pool size at registration time.
    pub name: String,

    /// Address advertised to the master. When empty, built from the local
    /// hostname and the listen port.
    pub advertise_addr: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_MASTER_PORT + 1,
            master_addr: format!("127.0.0.1:{}", DEFAULT_MASTER_PORT),
            name: String::new(),
            advertise_addr: String::new(),
        }
    }
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub master: MasterConfig,
    pub worker: WorkerConfig,
}

/// Parse a TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from a string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with file configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &cli::Cli, mut config: Config) -> Config {
    if let Some(port) = cli.listen_port {
        config.master.listen_port = port;
        config.worker.listen_port = port;
    }
    if let Some(ref master) = cli.master {
        config.worker.master_addr = master.clone();
    }
    if let Some(ref name) = cli.name {
        config.worker.name = name.clone();
    }
    if let Some(ref addr) = cli.advertise_addr {
        config.worker.advertise_addr = addr.clone();
    }
    if let Some(period) = cli.probe_period_ms {
        config.master.probe_period_ms = period;
    }
    if let Some(ref path) = cli.stats_log {
        config.master.stats_log = path.clone();
    }

    config
}
