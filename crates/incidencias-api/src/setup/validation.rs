//! Configuration validation
//!
//! Validates configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use incidencias_core::Config;

const DB_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=30;
const MAX_BODY_SIZE_RANGE_MB: std::ops::RangeInclusive<usize> = 20..=25;

/// Fail fast on configuration that would make the service misbehave.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.is_production() && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set specific allowed origins via the CORS_ORIGINS environment variable."
        ));
    }

    if !DB_TIMEOUT_RANGE.contains(&config.db_timeout_seconds()) {
        return Err(anyhow::anyhow!(
            "DB_TIMEOUT_SECONDS must be between {} and {} (got {})",
            DB_TIMEOUT_RANGE.start(),
            DB_TIMEOUT_RANGE.end(),
            config.db_timeout_seconds()
        ));
    }

    let max_body_mb = config.max_body_size_bytes() / 1024 / 1024;
    if !MAX_BODY_SIZE_RANGE_MB.contains(&max_body_mb) {
        return Err(anyhow::anyhow!(
            "MAX_BODY_SIZE_MB must be between {} and {} (got {})",
            MAX_BODY_SIZE_RANGE_MB.start(),
            MAX_BODY_SIZE_RANGE_MB.end(),
            max_body_mb
        ));
    }

    if config.legacy_default_incidencia() {
        tracing::warn!(
            "LEGACY_DEFAULT_INCIDENCIA enabled: submissions without incidencias are stored as panic alerts"
        );
    }

    Ok(())
}
