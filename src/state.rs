//! Application state for the Axum host.
//!
//! The registry is shared by every request; schedulers are not. Each
//! request gets its own scheduler, built here. Drains started after a
//! response are tracked so shutdown can wait for them.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::{JoinError, JoinSet};

use crate::config::{ApplicationConfig, QueueConfig};
use crate::jobs::{HandlerResolver, JobDriver, JobRegistry, Scheduler};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub queue: QueueConfig,
    pub application: ApplicationConfig,
    drains: Arc<Mutex<JoinSet<()>>>,
}

impl AppState {
    pub fn new(registry: JobRegistry, queue: QueueConfig, application: ApplicationConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            queue,
            application,
            drains: Arc::default(),
        }
    }

    /// Fresh scheduler for one unit of work
    pub fn scheduler(&self) -> Scheduler {
        let resolver: Arc<dyn HandlerResolver> = self.registry.clone();
        Scheduler::new(JobDriver::new(resolver), self.queue.clone())
    }

    /// Run a drain on the blocking pool and keep track of it
    ///
    /// Must be called from within the Tokio runtime.
    pub fn spawn_drain<F>(&self, drain: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut drains = self.drains.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(result) = drains.try_join_next() {
            log_drain_result(result);
        }
        drains.spawn_blocking(drain);
    }

    pub fn drains_in_flight(&self) -> usize {
        self.drains.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every tracked drain to finish
    ///
    /// Drains spawned while waiting are not included.
    pub async fn wait_for_drains(&self) {
        let mut drains =
            std::mem::take(&mut *self.drains.lock().unwrap_or_else(PoisonError::into_inner));
        if drains.is_empty() {
            return;
        }

        tracing::info!(in_flight = drains.len(), "Waiting for deferred job drains");
        while let Some(result) = drains.join_next().await {
            log_drain_result(result);
        }
    }
}

fn log_drain_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Deferred job drain aborted");
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .field("drains_in_flight", &self.drains_in_flight())
            .finish_non_exhaustive()
    }
}
