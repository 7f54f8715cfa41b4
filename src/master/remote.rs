//! Remote worker handles
//!
//! A registered worker is reached through the `WorkerClient` trait, which
//! exposes exactly the two capabilities the master needs: a liveness probe
//! and a sampling call. The TCP implementation dials the worker's advertised
//! address per call and bounds each call with a transport-level timeout, so
//! a hung worker surfaces as a call error rather than blocking forever.

use crate::protocol::{read_message, write_message, WorkerRequest, WorkerResponse};
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Remote operations the master invokes on a worker
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Liveness probe. Ok means the worker answered within the probe timeout.
    async fn ping(&self) -> Result<()>;

    /// Sample `num_points` points, returning the in-circle count.
    async fn count_points(&self, num_points: u64) -> Result<u64>;
}

/// TCP-backed worker handle
pub struct RemoteWorker {
    /// Advertised worker address (host:port)
    addr: String,

    /// Timeout for liveness probes (kept below the monitor period)
    probe_timeout: Duration,

    /// Timeout for sampling calls
    call_timeout: Duration,
}

impl RemoteWorker {
    /// Create a handle for a worker reachable at `addr`
    pub fn new(addr: String, probe_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            addr,
            probe_timeout,
            call_timeout,
        }
    }

    /// The address this handle dials
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Issue one request/response exchange bounded by `timeout`
    async fn call(&self, request: &WorkerRequest, timeout: Duration) -> Result<WorkerResponse> {
        let exchange = async {
            let mut stream = TcpStream::connect(&self.addr).await
                .with_context(|| format!("Failed to connect to worker at {}", self.addr))?;

            write_message(&mut stream, request).await?;
            read_message::<WorkerResponse>(&mut stream).await
        };

        tokio::time::timeout(timeout, exchange).await
            .map_err(|_| anyhow::anyhow!("Call to worker at {} timed out after {:?}", self.addr, timeout))?
    }
}

#[async_trait]
impl WorkerClient for RemoteWorker {
    async fn ping(&self) -> Result<()> {
        match self.call(&WorkerRequest::Ping, self.probe_timeout).await? {
            WorkerResponse::Pong => Ok(()),
            WorkerResponse::Error { message } => {
                anyhow::bail!("Worker at {} rejected ping: {}", self.addr, message)
            }
            other => anyhow::bail!("Unexpected reply to ping from {}: {:?}", self.addr, other),
        }
    }

    async fn count_points(&self, num_points: u64) -> Result<u64> {
        let request = WorkerRequest::CountPoints { num_points };

        match self.call(&request, self.call_timeout).await? {
            WorkerResponse::PointsCounted { in_circle } => Ok(in_circle),
            WorkerResponse::Error { message } => {
                anyhow::bail!("Worker at {} failed to sample: {}", self.addr, message)
            }
            other => anyhow::bail!("Unexpected reply to sampling call from {}: {:?}", self.addr, other),
        }
    }
}
