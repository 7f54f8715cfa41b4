//! pipulse CLI entry point

use anyhow::{Context, Result};
use pipulse::config::cli::{Cli, ExecutionMode};
use pipulse::config::{merge_cli_with_config, parse_toml_file, Config};

fn main() -> Result<()> {
    println!("pipulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed Monte Carlo pi estimation");
    println!();

    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    // Layer the configuration: defaults, then file, then CLI flags
    let file_config = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    let config = merge_cli_with_config(&cli, file_config);

    // Handle the different execution modes
    match cli.mode {
        ExecutionMode::Master => run_master(config),
        ExecutionMode::Worker => run_worker(config),
        ExecutionMode::Client => run_client(&cli, config),
    }
}

/// Run the master: coordinate the pool and serve estimate requests
fn run_master(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = pipulse::MasterService::new(config.master);
        service.run().await
    })
}

/// Run a worker: register with the master and sample batches
fn run_worker(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = pipulse::WorkerService::new(config.worker);
        service.run().await
    })
}

/// Run the interactive client against the configured master
fn run_client(cli: &Cli, config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    // The client dials the same master address the worker section carries
    runtime.block_on(pipulse::client::run_interactive(
        &config.worker.master_addr,
        cli.test,
    ))
}
