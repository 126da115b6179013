//! Application state shared by every handler.

use incidencias_core::{Config, NormalizeOptions};
use incidencias_db::IncidenceStore;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::System;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IncidenceStore>,
    pub config: Config,
    pub normalize_options: NormalizeOptions,
    pub started_at: Instant,
    pub system: Arc<Mutex<System>>,
    /// Store writes in flight; drained on shutdown before the store closes.
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn IncidenceStore>) -> Self {
        Self {
            store,
            normalize_options: config.normalize_options(),
            config,
            started_at: Instant::now(),
            system: Arc::new(Mutex::new(System::new())),
            tasks: TaskTracker::new(),
        }
    }

    /// Seconds since the state was built, i.e. since process start.
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
