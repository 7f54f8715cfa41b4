//! Worker registry
//!
//! Single source of truth for pool membership: a name → handle map guarded
//! by one mutex. Membership changes and snapshots are mutually exclusive, so
//! a snapshot never observes a half-applied add or remove. The lock is never
//! held across remote calls: callers snapshot first, then fan out.

use crate::master::remote::WorkerClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Thread-safe worker membership map
///
/// Duplicate names are rejected, never overwritten; both add and remove
/// report their outcome as a boolean rather than an error, since membership
/// churn is a normal part of operation.
pub struct WorkerRegistry {
    workers: Mutex<HashMap<String, Arc<dyn WorkerClient>>>,
}

impl WorkerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a worker under `name`
    ///
    /// Returns true if the name was absent and the worker was inserted,
    /// false if a worker of that name is already registered (the existing
    /// entry is left untouched).
    pub fn add(&self, name: &str, handle: Arc<dyn WorkerClient>) -> bool {
        let mut workers = self.workers.lock().unwrap();
        if workers.contains_key(name) {
            return false;
        }
        workers.insert(name.to_string(), handle);
        true
    }

    /// Remove the worker registered under `name`
    ///
    /// Returns true if a worker was present and removed, false otherwise.
    pub fn remove(&self, name: &str) -> bool {
        self.workers.lock().unwrap().remove(name).is_some()
    }

    /// Point-in-time copy of the current membership
    ///
    /// The returned pairs are a consistent view taken under the lock;
    /// concurrent adds and removes land entirely before or entirely after it.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn WorkerClient>)> {
        self.workers
            .lock()
            .unwrap()
            .iter()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect()
    }

    /// Current number of registered workers
    pub fn count(&self) -> usize {
        self.workers.lock().unwrap().len()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
