//! Client-side access to the master
//!
//! `MasterClient` speaks the request/response protocol over one persistent
//! connection; it is used by the interactive front end and by workers for
//! registration. The interactive loop mirrors the original tool: read a
//! point count, print the estimate to six decimals, repeat until exit.

use crate::protocol::{read_message, write_message, MasterRequest, MasterResponse, PROTOCOL_VERSION};
use crate::Result;
use anyhow::Context;
use std::io::Write as _;
use tokio::io::AsyncBufReadExt;
use tokio::net::TcpStream;

/// Connection to a master
pub struct MasterClient {
    stream: TcpStream,
}

impl MasterClient {
    /// Connect to the master at `addr` (host:port)
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await
            .with_context(|| format!("Failed to connect to master at {}", addr))?;

        Ok(Self { stream })
    }

    /// Issue one request and read its response
    async fn call(&mut self, request: &MasterRequest) -> Result<MasterResponse> {
        write_message(&mut self.stream, request).await?;
        read_message(&mut self.stream).await
    }

    /// Request a pi estimate (`total_points = -1` flushes test stats)
    pub async fn calculate_pi(&mut self, total_points: i64, is_test: bool) -> Result<f64> {
        let request = MasterRequest::CalculatePi { total_points, is_test };

        match self.call(&request).await? {
            MasterResponse::Estimate { estimation } => Ok(estimation),
            MasterResponse::Error { message } => anyhow::bail!("Master rejected request: {}", message),
            other => anyhow::bail!("Unexpected reply to calculatePi: {:?}", other),
        }
    }

    /// Register a worker reachable at `addr` under `name`
    pub async fn add_worker(&mut self, name: &str, addr: &str) -> Result<bool> {
        let request = MasterRequest::AddWorker {
            protocol_version: PROTOCOL_VERSION,
            name: name.to_string(),
            addr: addr.to_string(),
        };

        match self.call(&request).await? {
            MasterResponse::WorkerAdded { added } => Ok(added),
            MasterResponse::Error { message } => anyhow::bail!("Master rejected registration: {}", message),
            other => anyhow::bail!("Unexpected reply to addWorker: {:?}", other),
        }
    }

    /// Deregister the worker named `name`
    pub async fn remove_worker(&mut self, name: &str) -> Result<bool> {
        let request = MasterRequest::RemoveWorker {
            name: name.to_string(),
        };

        match self.call(&request).await? {
            MasterResponse::WorkerRemoved { removed } => Ok(removed),
            other => anyhow::bail!("Unexpected reply to removeWorker: {:?}", other),
        }
    }

    /// Current number of registered workers
    pub async fn get_worker_count(&mut self) -> Result<u64> {
        match self.call(&MasterRequest::GetWorkerCount).await? {
            MasterResponse::WorkerCount { count } => Ok(count),
            other => anyhow::bail!("Unexpected reply to getWorkerCount: {:?}", other),
        }
    }
}

/// Interactive estimate loop
///
/// Accepts a point count per line, plus `flush` (finalize test stats),
/// `count` (pool size), and `exit`/`quit`.
pub async fn run_interactive(addr: &str, is_test: bool) -> Result<()> {
    let mut master = MasterClient::connect(addr).await?;

    println!("Connected to master at {}", addr);
    println!("Enter a point count to estimate pi ('flush', 'count', 'exit'):");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "flush" => {
                master.calculate_pi(-1, true).await?;
                println!("Stats flushed");
            }
            "count" => {
                println!("{} workers registered", master.get_worker_count().await?);
            }
            input => match input.parse::<i64>() {
                Ok(points) => {
                    let estimation = master.calculate_pi(points, is_test).await?;
                    println!("Pi estimation: {:.6}", estimation);
                }
                Err(_) => println!("Unrecognized input: {}", input),
            },
        }
    }

    println!("Exiting...");
    Ok(())
}
