//! Validation modules

pub mod incidence;

pub use incidence::{validate, FieldError, MIN_PHOTO_LENGTH};
