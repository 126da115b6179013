//! Incidencias Core Library
//!
//! Domain model, submission normalization, validation, error taxonomy and
//! configuration shared by the store adapter and the HTTP API.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    normalize, Incidence, IncidenceCandidate, IncidenceKind, InsertedIncidence, Localizacion,
    NormalizeOptions, ReportQuery, Submission,
};
pub use validation::{validate, FieldError};
