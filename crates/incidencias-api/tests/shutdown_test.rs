//! Shutdown drain tests.
//!
//! Run with: `cargo test -p incidencias-api --test shutdown_test`

mod helpers;

use async_trait::async_trait;
use helpers::{setup_test_server, valid_submission};
use incidencias_api::setup::server::drain_store_writes;
use incidencias_core::{Incidence, InsertedIncidence};
use incidencias_db::{InMemoryIncidenceStore, IncidenceStore, StoreResult};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Holds every insert until released.
struct GatedStore {
    inner: InMemoryIncidenceStore,
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl IncidenceStore for GatedStore {
    async fn insert(&self, incidence: &Incidence) -> StoreResult<InsertedIncidence> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.insert(incidence).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn shutdown(&self) {}

    fn backend(&self) -> &'static str {
        "gated"
    }
}

#[tokio::test]
async fn test_drain_waits_for_write_of_abandoned_request() {
    let store = InMemoryIncidenceStore::new();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (server, state) = setup_test_server(
        &[],
        Arc::new(GatedStore {
            inner: store.clone(),
            started: started.clone(),
            release: release.clone(),
        }),
    );

    // The client goes away once the write has been issued
    let request = server.post("/api/reportar").json(&valid_submission());
    tokio::select! {
        _ = request.into_future() => panic!("insert should still be held"),
        _ = started.notified() => {}
    }
    assert!(store.is_empty());

    let drain = drain_store_writes(&state);
    tokio::pin!(drain);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), &mut drain)
            .await
            .is_err(),
        "drain must wait for the held insert"
    );

    release.notify_one();
    drain.await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_drain_with_nothing_in_flight() {
    let store = InMemoryIncidenceStore::new();
    let (server, state) = setup_test_server(&[], Arc::new(store.clone()));

    let response = server.post("/api/reportar").json(&valid_submission()).await;
    assert_eq!(response.status_code(), 201);

    tokio::time::timeout(Duration::from_secs(1), drain_store_writes(&state))
        .await
        .expect("drain completes");
    assert_eq!(store.len(), 1);
}
