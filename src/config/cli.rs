//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Master mode - coordinate the worker pool and serve estimate requests
    Master,
    /// Worker mode - register with a master and sample point batches
    Worker,
    /// Client mode - interactive front end for estimate requests
    Client,
}

/// pipulse - Distributed Monte Carlo pi estimation
#[derive(Parser, Debug)]
#[command(name = "pipulse")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:\n    \
    # Start the master on the default port\n    \
    pipulse --mode master\n\n    \
    # Start a worker and register with the master\n    \
    pipulse --mode worker --master 10.0.1.10:10000 --listen-port 10001\n\n    \
    # Ask for an estimate interactively\n    \
    pipulse --mode client --master 10.0.1.10:10000")]
pub struct Cli {
    /// Execution mode: master, worker, or client
    #[arg(long, value_enum, default_value = "master")]
    pub mode: ExecutionMode,

    /// Optional TOML configuration file (CLI flags take precedence)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (master and worker modes)
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Master address to connect to (worker and client modes)
    #[arg(long, env = "PIPULSE_MASTER")]
    pub master: Option<String>,

    /// Worker name (worker mode; derived from the pool size when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Address advertised to the master (worker mode; defaults to hostname:port)
    #[arg(long)]
    pub advertise_addr: Option<String>,

    /// Health monitor probe period in milliseconds (master mode)
    #[arg(long)]
    pub probe_period_ms: Option<u64>,

    /// Path of the test-mode statistics log (master mode)
    #[arg(long)]
    pub stats_log: Option<PathBuf>,

    /// Mark estimate requests as test runs (client mode)
    #[arg(long)]
    pub test: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate cross-flag constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Master => {}
            ExecutionMode::Worker | ExecutionMode::Client => {
                // master_addr has a config-file default, so --master is not
                // strictly required; nothing to reject here.
            }
        }

        if let Some(period) = self.probe_period_ms {
            if period == 0 {
                anyhow::bail!("--probe-period-ms must be greater than zero");
            }
        }

        Ok(())
    }
}
