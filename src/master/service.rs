//! Master service
//!
//! The master owns the worker registry and the test-mode stats collector,
//! runs the health monitor, and serves client traffic: it listens on the
//! configured port and answers estimate and membership requests, spawning
//! one task per connection. A failed estimate collapses to a 0.0 reply and
//! a logged cause; the service itself stays up for subsequent requests.

use crate::config::MasterConfig;
use crate::master::aggregator::aggregate;
use crate::master::distributor::{distribute, NoWorkersAvailable};
use crate::master::monitor::HealthMonitor;
use crate::master::registry::WorkerRegistry;
use crate::master::remote::{RemoteWorker, WorkerClient};
use crate::master::stats::StatsCollector;
use crate::protocol::{read_message, write_message, MasterRequest, MasterResponse, PROTOCOL_VERSION};
use crate::Result;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};

/// Shared master state: registry, stats, and configuration
///
/// All request handling goes through this struct, which makes the
/// coordination logic testable without sockets.
pub struct MasterState {
    config: MasterConfig,
    registry: Arc<WorkerRegistry>,
    stats: Mutex<StatsCollector>,
}

impl MasterState {
    /// Create master state from configuration
    pub fn new(config: MasterConfig) -> Self {
        let stats = Mutex::new(StatsCollector::new(config.stats_log.clone()));
        Self {
            config,
            registry: Arc::new(WorkerRegistry::new()),
            stats,
        }
    }

    /// The registry shared with the health monitor
    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Register a worker handle under `name`
    pub fn add_worker(&self, name: &str, handle: Arc<dyn WorkerClient>) -> bool {
        let added = self.registry.add(name, handle);
        if added {
            println!("Worker {} registered", name);
        } else {
            println!("Worker {} already registered, refusing duplicate", name);
        }
        added
    }

    /// Remove a worker by name
    pub fn remove_worker(&self, name: &str) -> bool {
        let removed = self.registry.remove(name);
        if removed {
            println!("Worker {} removed", name);
        } else {
            println!("Worker {} not found", name);
        }
        removed
    }

    /// Current pool size
    pub fn worker_count(&self) -> usize {
        self.registry.count()
    }

    /// Estimate pi from `total_points` samples spread over the current pool
    ///
    /// Returns 0.0 when nothing can be estimated: the flush sentinel, an
    /// empty pool, a zero-point request, or a failed aggregation. Failures
    /// are logged, never propagated; the master stays serviceable.
    pub async fn calculate_pi(&self, total_points: i64, is_test: bool) -> f64 {
        if total_points < 0 {
            if is_test {
                if let Err(e) = self.stats.lock().unwrap().flush() {
                    eprintln!("Warning: failed to flush stats: {:#}", e);
                }
            } else {
                println!("Ignoring flush sentinel outside test mode");
            }
            return 0.0;
        }

        if total_points == 0 {
            println!("Zero points requested, nothing to estimate");
            return 0.0;
        }

        let start = Instant::now();

        let snapshot = self.registry.snapshot();
        let worker_count = snapshot.len();

        let batch = match distribute(snapshot, total_points as u64) {
            Ok(batch) => batch,
            Err(NoWorkersAvailable) => {
                println!("No workers registered, cannot estimate");
                return 0.0;
            }
        };

        println!(
            "Estimating pi with {} points across {} workers ({} each)...",
            total_points, worker_count, batch.share
        );

        let in_circle_total = match aggregate(batch).await {
            Ok(total) => total,
            Err(e) => {
                eprintln!("Estimate failed: {:#}", e);
                return 0.0;
            }
        };

        // The estimate divides by the requested total, not the distributed
        // sum, so truncated remainder points count against the result.
        let estimation = 4.0 * in_circle_total as f64 / total_points as f64;
        let elapsed = start.elapsed();

        println!("Final estimation: {:.6} ({:.3} ms)", estimation, elapsed.as_secs_f64() * 1_000.0);

        if is_test {
            let error = (estimation - std::f64::consts::PI).abs();
            if let Err(e) = self
                .stats
                .lock()
                .unwrap()
                .record(total_points, worker_count, elapsed, error)
            {
                eprintln!("Warning: failed to record stats: {:#}", e);
            }
        }

        estimation
    }

    /// Turn one decoded request into its response
    async fn dispatch(&self, request: MasterRequest) -> MasterResponse {
        match request {
            MasterRequest::CalculatePi { total_points, is_test } => MasterResponse::Estimate {
                estimation: self.calculate_pi(total_points, is_test).await,
            },
            MasterRequest::AddWorker { protocol_version, name, addr } => {
                if protocol_version != PROTOCOL_VERSION {
                    return MasterResponse::Error {
                        message: format!(
                            "Protocol version mismatch: worker={}, master={}",
                            protocol_version, PROTOCOL_VERSION
                        ),
                    };
                }

                let handle = Arc::new(RemoteWorker::new(
                    addr,
                    self.config.probe_timeout(),
                    self.config.call_timeout(),
                ));
                MasterResponse::WorkerAdded {
                    added: self.add_worker(&name, handle),
                }
            }
            MasterRequest::RemoveWorker { name } => MasterResponse::WorkerRemoved {
                removed: self.remove_worker(&name),
            },
            MasterRequest::GetWorkerCount => MasterResponse::WorkerCount {
                count: self.worker_count() as u64,
            },
        }
    }
}

/// TCP front end over [`MasterState`]
pub struct MasterService {
    state: Arc<MasterState>,
}

impl MasterService {
    /// Create a master service from configuration
    pub fn new(config: MasterConfig) -> Self {
        Self {
            state: Arc::new(MasterState::new(config)),
        }
    }

    /// Run the master: bind, start the health monitor, accept forever
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.state.config.listen_port);
        let listener = TcpListener::bind(&addr).await
            .context("Failed to bind master listener")?;

        println!("Master listening on port {}", self.state.config.listen_port);
        println!("Probe period: {} ms", self.state.config.probe_period_ms);
        println!("Stats log: {}", self.state.config.stats_log.display());

        let _monitor = HealthMonitor::new(
            Arc::clone(&self.state.registry),
            self.state.config.probe_period(),
        )
        .spawn();

        loop {
            let (stream, peer) = listener.accept().await
                .context("Failed to accept connection")?;

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                handle_connection(state, stream, peer).await;
            });
        }
    }
}

/// Serve one client connection until it closes or misbehaves
async fn handle_connection(state: Arc<MasterState>, mut stream: TcpStream, peer: SocketAddr) {
    loop {
        let request: MasterRequest = match read_message(&mut stream).await {
            Ok(request) => request,
            // Clean disconnects and garbage both end the conversation; only
            // garbage is worth a log line. The service keeps accepting others
            // either way.
            Err(e) => {
                if !is_clean_disconnect(&e) {
                    eprintln!("Warning: closing connection to {}: {:#}", peer, e);
                }
                break;
            }
        };

        let response = state.dispatch(request).await;

        if let Err(e) = write_message(&mut stream, &response).await {
            eprintln!("Warning: failed to reply to {}: {:#}", peer, e);
            break;
        }
    }
}

/// Whether a read error is just the peer hanging up between requests
fn is_clean_disconnect(e: &anyhow::Error) -> bool {
    e.root_cause()
        .downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::UnexpectedEof)
        .unwrap_or(false)
}
