//! Worker agent
//!
//! A worker registers itself with the master, then listens for the master's
//! calls: liveness probes and sampling batches. Sampling runs off the async
//! runtime (spawn_blocking + rayon), so a large batch never stalls probe
//! handling on a separate connection.
//!
//! Registration mirrors the original deployment: a worker without an
//! explicit name asks the master for the current pool size and calls itself
//! `worker{N+1}`. If the name is already taken the master refuses and the
//! worker exits instead of silently renaming. On Ctrl-C the worker
//! best-effort deregisters before exiting.

pub mod sampler;

use crate::client::MasterClient;
use crate::config::WorkerConfig;
use crate::protocol::{read_message, write_message, WorkerRequest, WorkerResponse};
use crate::Result;
use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};

/// Worker service
///
/// Serves `ping` and `countPointsInCircle` for exactly one master pool.
pub struct WorkerService {
    config: WorkerConfig,
}

impl WorkerService {
    /// Create a worker service from configuration
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Run the worker: bind, register with the master, serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!("0.0.0.0:{}", self.config.listen_port);
        let listener = TcpListener::bind(&bind_addr).await
            .context("Failed to bind worker listener")?;

        let advertise = if self.config.advertise_addr.is_empty() {
            format!("{}:{}", node_hostname()?, self.config.listen_port)
        } else {
            self.config.advertise_addr.clone()
        };

        let mut master = MasterClient::connect(&self.config.master_addr).await
            .with_context(|| format!("Failed to reach master at {}", self.config.master_addr))?;

        let name = if self.config.name.is_empty() {
            let count = master.get_worker_count().await?;
            format!("worker{}", count + 1)
        } else {
            self.config.name.clone()
        };

        let added = master.add_worker(&name, &advertise).await?;
        if !added {
            anyhow::bail!("Master refused registration: name {} already in use", name);
        }

        println!("{} registered with master at {}", name, self.config.master_addr);
        println!("{} listening on port {} (advertised as {})...", name, self.config.listen_port, advertise);

        let accept = async {
            loop {
                let (stream, _peer) = listener.accept().await
                    .context("Failed to accept connection")?;

                tokio::spawn(serve_master(stream));
            }
        };

        tokio::select! {
            result = accept => result,
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down, deregistering {}...", name);
                if let Err(e) = master.remove_worker(&name).await {
                    eprintln!("Warning: failed to deregister: {:#}", e);
                }
                Ok(())
            }
        }
    }
}

/// Serve one master connection until it closes
async fn serve_master(mut stream: TcpStream) {
    loop {
        let request: WorkerRequest = match read_message(&mut stream).await {
            Ok(request) => request,
            Err(_) => break,
        };

        let response = match request {
            WorkerRequest::Ping => WorkerResponse::Pong,
            WorkerRequest::CountPoints { num_points } => {
                println!("Sampling {} points...", num_points);

                match tokio::task::spawn_blocking(move || sampler::count_points_in_circle(num_points)).await {
                    Ok(in_circle) => {
                        println!("{} of {} points inside the circle", in_circle, num_points);
                        WorkerResponse::PointsCounted { in_circle }
                    }
                    Err(e) => WorkerResponse::Error {
                        message: format!("Sampling task failed: {}", e),
                    },
                }
            }
        };

        if write_message(&mut stream, &response).await.is_err() {
            break;
        }
    }
}

/// Local hostname for the advertised address
fn node_hostname() -> Result<String> {
    let name = hostname::get()
        .context("Failed to resolve local hostname")?;
    Ok(name.to_string_lossy().into_owned())
}
