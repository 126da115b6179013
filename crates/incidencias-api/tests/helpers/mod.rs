//! Test helpers: build AppState and router over the in-memory store.
//!
//! Run from workspace root: `cargo test -p incidencias-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use incidencias_api::setup::routes;
use incidencias_api::state::AppState;
use incidencias_core::Config;
use incidencias_db::{InMemoryIncidenceStore, IncidenceStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Test application: server plus a handle on the backing store.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryIncidenceStore,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Build a configuration from the given variables, defaulting `MONGO_URI`.
pub fn create_test_config(vars: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.entry("MONGO_URI".to_string())
        .or_insert_with(|| "mongodb://localhost:27017/incidencias_test".to_string());
    Config::from_lookup(|key| map.get(key).cloned()).expect("Failed to build test config")
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(&[])
}

pub fn setup_test_app_with(vars: &[(&str, &str)]) -> TestApp {
    let store = InMemoryIncidenceStore::new();
    let (server, state) = setup_test_server(vars, Arc::new(store.clone()));

    TestApp {
        server,
        store,
        state,
    }
}

/// Router over an arbitrary store implementation.
pub fn setup_test_server(
    vars: &[(&str, &str)],
    store: Arc<dyn IncidenceStore>,
) -> (TestServer, Arc<AppState>) {
    let config = create_test_config(vars);
    let state = Arc::new(AppState::new(config.clone(), store));
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");
    (server, state)
}

pub fn photo(len: usize) -> String {
    "A".repeat(len)
}

/// A structured submission that passes validation.
pub fn valid_submission() -> Value {
    json!({
        "bellota": 7,
        "localizacion": { "latitud": 40.0, "longitud": -3.0 },
        "incidencias": 1,
        "foto": photo(150),
    })
}
