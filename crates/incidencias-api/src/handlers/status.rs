//! Liveness probe: store connectivity, memory snapshot and uptime.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::System;
use tikv_jemalloc_ctl::{epoch, stats};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub db: &'static str,
    pub memory: MemorySnapshot,
    pub uptime: f64,
}

/// Memory figures in bytes.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub rss: u64,
    #[serde(rename = "virtual")]
    pub virtual_memory: u64,
    pub heap_used: u64,
    pub system_total: u64,
    pub system_used: u64,
}

/// GET /api/status
///
/// Always answers 200; a store outage shows up as `db: "disconnected"`.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store.backend(), "Store ping failed");
            "disconnected"
        }
    };

    let response = StatusResponse {
        db,
        memory: memory_snapshot(&state),
        uptime: state.uptime_seconds(),
    };

    (StatusCode::OK, Json(response))
}

fn memory_snapshot(state: &AppState) -> MemorySnapshot {
    let mut snapshot = MemorySnapshot {
        heap_used: heap_allocated(),
        ..MemorySnapshot::default()
    };

    let Ok(mut system) = state.system.lock() else {
        tracing::error!("Failed to acquire system lock for memory snapshot");
        return snapshot;
    };
    read_process_memory(&mut system, &mut snapshot);
    snapshot
}

/// Bytes currently allocated through jemalloc; 0 when its statistics are unavailable.
fn heap_allocated() -> u64 {
    let read = || -> Result<usize, tikv_jemalloc_ctl::Error> {
        // Statistics are cached until the epoch advances
        epoch::advance()?;
        stats::allocated::read()
    };
    match read() {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            tracing::debug!(error = %e, "Allocator statistics unavailable");
            0
        }
    }
}

fn read_process_memory(system: &mut System, snapshot: &mut MemorySnapshot) {
    system.refresh_memory();
    snapshot.system_total = system.total_memory();
    snapshot.system_used = system.used_memory();

    match sysinfo::get_current_pid() {
        Ok(pid) => {
            if !system.refresh_process(pid) {
                tracing::debug!(pid = %pid, "Process refresh failed");
            }
            if let Some(process) = system.process(pid) {
                snapshot.rss = process.memory();
                snapshot.virtual_memory = process.virtual_memory();
            }
        }
        Err(e) => tracing::debug!(error = e, "Current pid unavailable"),
    }
}
