//! In-process backend
//!
//! Keeps documents in memory with the same shape the MongoDB backend writes.
//! An availability switch lets tests exercise the store-outage path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incidencias_core::{Incidence, InsertedIncidence};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{IncidenceStore, StoreError, StoreResult};

/// A persisted record together with its store-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIncidence {
    pub id: String,
    pub incidence: Incidence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredIncidence {
    /// The stored document as JSON, `_id` and timestamps included.
    pub fn document(&self) -> Value {
        let mut document = serde_json::to_value(&self.incidence).unwrap_or(Value::Null);
        if let Value::Object(ref mut fields) = document {
            fields.insert("_id".to_string(), Value::String(self.id.clone()));
            fields.insert(
                "createdAt".to_string(),
                Value::String(self.created_at.to_rfc3339()),
            );
            fields.insert(
                "updatedAt".to_string(),
                Value::String(self.updated_at.to_rfc3339()),
            );
        }
        document
    }
}

#[derive(Clone)]
pub struct InMemoryIncidenceStore {
    records: Arc<Mutex<Vec<StoredIncidence>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryIncidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIncidenceStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Vec<StoredIncidence> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<StoredIncidence> {
        self.records().into_iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl IncidenceStore for InMemoryIncidenceStore {
    async fn insert(&self, incidence: &Incidence) -> StoreResult<InsertedIncidence> {
        self.check_available()?;

        let now = Utc::now();
        let record = StoredIncidence {
            id: ObjectId::new().to_hex(),
            incidence: incidence.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Internal("in-memory store lock poisoned".to_string()))?;
        records.push(record.clone());

        Ok(InsertedIncidence {
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }

    async fn shutdown(&self) {
        tracing::debug!(records = self.len(), "In-memory store shut down");
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
