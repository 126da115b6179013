//! Domain models

pub mod incidence;
pub mod submission;

pub use incidence::{Incidence, IncidenceKind, InsertedIncidence, Localizacion, UnknownIncidenceKind};
pub use submission::{normalize, IncidenceCandidate, NormalizeOptions, ReportQuery, Submission};
