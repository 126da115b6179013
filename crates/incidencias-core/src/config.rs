//! Configuration module
//!
//! Settings are read once at startup from the process environment (after an
//! optional `.env` file) into an immutable [`Config`].

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::models::{IncidenceKind, NormalizeOptions};

const DEFAULT_PORT: u16 = 3000;
const DB_TIMEOUT_SECS: u64 = 5;
const MAX_BODY_SIZE_MB: usize = 20;

/// Database used when neither `MONGO_DB_NAME` nor the connection string names one.
pub const DEFAULT_DATABASE_NAME: &str = "incidencias";

#[derive(Clone)]
pub struct Config {
    server_port: u16,
    mongo_uri: String,
    mongo_db_name: Option<String>,
    db_timeout_seconds: u64,
    max_body_size_bytes: usize,
    cors_origins: Vec<String>,
    environment: String,
    legacy_default_incidencia: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mongo_uri = lookup("MONGO_URI")
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("MONGO_URI must be set"))?;

        let server_port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_body_size_mb: usize =
            parse_or("MAX_BODY_SIZE_MB", lookup("MAX_BODY_SIZE_MB"), MAX_BODY_SIZE_MB)?;
        let max_body_size_bytes = max_body_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("MAX_BODY_SIZE_MB is too large"))?;

        Ok(Config {
            server_port,
            mongo_uri,
            mongo_db_name: lookup("MONGO_DB_NAME").filter(|s| !s.trim().is_empty()),
            db_timeout_seconds: parse_or(
                "DB_TIMEOUT_SECONDS",
                lookup("DB_TIMEOUT_SECONDS"),
                DB_TIMEOUT_SECS,
            )?,
            max_body_size_bytes,
            cors_origins,
            environment,
            legacy_default_incidencia: lookup("LEGACY_DEFAULT_INCIDENCIA")
                .map(|s| s.trim().to_lowercase())
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn mongo_uri(&self) -> &str {
        &self.mongo_uri
    }

    pub fn mongo_db_name(&self) -> Option<&str> {
        self.mongo_db_name.as_deref()
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn max_body_size_bytes(&self) -> usize {
        self.max_body_size_bytes
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn legacy_default_incidencia(&self) -> bool {
        self.legacy_default_incidencia
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            default_kind: self
                .legacy_default_incidencia
                .then_some(IncidenceKind::Panic),
        }
    }
}

/// Parse a set variable, or fall back to `default` when it is unset.
fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, anyhow::Error> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

// The connection string may carry credentials; keep it out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("mongo_uri", &"<redacted>")
            .field("mongo_db_name", &self.mongo_db_name)
            .field("db_timeout_seconds", &self.db_timeout_seconds)
            .field("max_body_size_bytes", &self.max_body_size_bytes)
            .field("cors_origins", &self.cors_origins)
            .field("environment", &self.environment)
            .field("legacy_default_incidencia", &self.legacy_default_incidencia)
            .finish()
    }
}
