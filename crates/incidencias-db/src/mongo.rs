//! MongoDB backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incidencias_core::{config::DEFAULT_DATABASE_NAME, Incidence, InsertedIncidence};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::time::Duration;

use crate::traits::{IncidenceStore, StoreError, StoreResult};

/// Collection holding one document per incidence.
pub const COLLECTION_NAME: &str = "incidencias";

const APP_NAME: &str = "incidencias-api";
const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Server error codes that denote a document the store will never accept.
const DUPLICATE_KEY: i32 = 11000;
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

/// Server error codes raised while a node is stepping down, shutting down or unreachable.
const TRANSIENT_CODES: &[i32] = &[
    6,     // HostUnreachable
    7,     // HostNotFound
    50,    // MaxTimeMSExpired
    89,    // NetworkTimeout
    91,    // ShutdownInProgress
    189,   // PrimarySteppedDown
    262,   // ExceededTimeLimit
    9001,  // SocketException
    10107, // NotWritablePrimary
    11600, // InterruptedAtShutdown
    11602, // InterruptedDueToReplStateChange
    13435, // NotPrimaryNoSecondaryOk
    13436, // NotPrimaryOrSecondary
];

#[derive(Clone)]
pub struct MongoIncidenceStore {
    client: Client,
    database: Database,
    collection: Collection<Document>,
}

impl MongoIncidenceStore {
    /// Connect and verify the deployment is reachable.
    ///
    /// `timeout` bounds both server selection and the initial connection; a
    /// store that cannot be reached within it is reported as `Unavailable`.
    pub async fn connect(
        uri: &str,
        database_name: Option<&str>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Internal(format!("Invalid MONGO_URI: {}", e)))?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(classify)?;
        let database = select_database(&client, database_name);
        let collection = database.collection::<Document>(COLLECTION_NAME);

        let store = Self {
            client,
            database,
            collection,
        };

        // The driver connects lazily; force a round trip so startup fails fast
        store.run_ping().await?;

        tracing::info!(
            database = %store.database.name(),
            collection = COLLECTION_NAME,
            "MongoDB connected"
        );

        Ok(store)
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn run_ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(drop)
            .map_err(classify)
    }
}

/// Explicit name first, then the database named in the connection string, then the default.
fn select_database(client: &Client, database_name: Option<&str>) -> Database {
    match database_name {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE_NAME)),
    }
}

/// Build the stored document, stamping both timestamps with the same instant.
fn to_document(incidence: &Incidence, now: DateTime<Utc>) -> StoreResult<Document> {
    let mut document = bson::to_document(incidence)
        .map_err(|e| StoreError::Internal(format!("Failed to encode incidence: {}", e)))?;
    let stamp = bson::DateTime::from_millis(now.timestamp_millis());
    document.insert("createdAt", stamp);
    document.insert("updatedAt", stamp);
    Ok(document)
}

/// BSON datetimes carry millisecond precision.
fn truncate_to_millis(now: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn inserted_id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl IncidenceStore for MongoIncidenceStore {
    #[tracing::instrument(
        skip(self, incidence),
        fields(db.collection = COLLECTION_NAME, db.operation = "insert", bellota = incidence.bellota)
    )]
    async fn insert(&self, incidence: &Incidence) -> StoreResult<InsertedIncidence> {
        let now = truncate_to_millis(Utc::now());
        let document = to_document(incidence, now)?;

        let result = self.collection.insert_one(document).await.map_err(|e| {
            let err = classify(e);
            tracing::warn!(error = %err, transient = err.is_transient(), "Insert failed");
            err
        })?;

        let id = inserted_id_to_string(&result.inserted_id);
        tracing::debug!(id = %id, "Incidence stored");

        Ok(InsertedIncidence {
            id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        match tokio::time::timeout(PING_TIMEOUT, self.run_ping()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable("ping timed out".to_string())),
        }
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("MongoDB connection closed");
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

/// Map a server error code onto the store taxonomy.
fn classify_code(code: i32, message: String) -> StoreError {
    if code == DUPLICATE_KEY || code == DOCUMENT_VALIDATION_FAILURE {
        StoreError::Rejected(message)
    } else if TRANSIENT_CODES.contains(&code) {
        StoreError::Unavailable(message)
    } else {
        StoreError::Internal(message)
    }
}

/// Map a driver error onto the store taxonomy.
fn classify(err: MongoError) -> StoreError {
    if err.contains_label("RetryableWriteError") || err.contains_label("TransientTransactionError")
    {
        return StoreError::Unavailable(err.to_string());
    }

    let message = err.to_string();
    match *err.kind {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(message),
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => {
            classify_code(write_error.code, message)
        }
        ErrorKind::Write(WriteFailure::WriteConcernError(_)) => StoreError::Unavailable(message),
        ErrorKind::Command(ref command_error) => classify_code(command_error.code, message),
        _ => StoreError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incidencias_core::{IncidenceKind, Localizacion};

    fn incidence() -> Incidence {
        Incidence {
            bellota: 42,
            location: Localizacion {
                latitude: 40.4168,
                longitude: -3.7038,
            },
            kind: IncidenceKind::Panic,
            active: true,
            photo: "A".repeat(150),
        }
    }

    #[test]
    fn test_document_shape() {
        let now = truncate_to_millis(Utc::now());
        let document = to_document(&incidence(), now).unwrap();

        assert_eq!(document.get_i64("bellota").unwrap(), 42);
        let location = document.get_document("localizacion").unwrap();
        assert_eq!(location.get_f64("latitud").unwrap(), 40.4168);
        assert_eq!(location.get_f64("longitud").unwrap(), -3.7038);
        assert_eq!(document.get_i32("incidencias").unwrap(), 1);
        assert!(document.get_bool("activo").unwrap());
        assert_eq!(document.get_str("foto").unwrap().len(), 150);
        assert!(!document.contains_key("_id"), "the id is left to the store");

        let created = document.get_datetime("createdAt").unwrap();
        let updated = document.get_datetime("updatedAt").unwrap();
        assert_eq!(created, updated);
        assert_eq!(created.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn test_database_selection() {
        // Clients connect lazily, so no server is needed here
        let client_for = |uri: &'static str| async move {
            let options = ClientOptions::parse(uri).await.unwrap();
            Client::with_options(options).unwrap()
        };

        let client = client_for("mongodb://localhost:27017/reports").await;
        assert_eq!(select_database(&client, None).name(), "reports");
        assert_eq!(select_database(&client, Some("alertas")).name(), "alertas");

        let client = client_for("mongodb://localhost:27017").await;
        assert_eq!(select_database(&client, None).name(), DEFAULT_DATABASE_NAME);
    }

    #[test]
    fn test_truncate_to_millis() {
        let now = Utc::now();
        let truncated = truncate_to_millis(now);
        assert!(truncated <= now);
        assert_eq!(truncated.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_inserted_id_rendering() {
        let oid = bson::oid::ObjectId::new();
        assert_eq!(inserted_id_to_string(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(
            inserted_id_to_string(&Bson::String("abc".to_string())),
            "abc"
        );
    }

    #[test]
    fn test_classify_code() {
        assert!(matches!(
            classify_code(DUPLICATE_KEY, String::new()),
            StoreError::Rejected(_)
        ));
        assert!(matches!(
            classify_code(DOCUMENT_VALIDATION_FAILURE, String::new()),
            StoreError::Rejected(_)
        ));
        assert!(matches!(
            classify_code(189, String::new()),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_code(10107, String::new()),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_code(2, String::new()),
            StoreError::Internal(_)
        ));
    }
}
