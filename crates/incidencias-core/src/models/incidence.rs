use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Incident class carried by a report.
///
/// Stored and transmitted as its numeric code: `1` for a panic alert and `2`
/// for a dead-man's-switch activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum IncidenceKind {
    Panic,
    DeadMan,
}

impl IncidenceKind {
    pub fn code(self) -> i32 {
        match self {
            IncidenceKind::Panic => 1,
            IncidenceKind::DeadMan => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(IncidenceKind::Panic),
            2 => Some(IncidenceKind::DeadMan),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IncidenceKind::Panic => "panic",
            IncidenceKind::DeadMan => "dead_man",
        }
    }
}

impl fmt::Display for IncidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown incidence kind code: {0}")]
pub struct UnknownIncidenceKind(pub i32);

impl From<IncidenceKind> for i32 {
    fn from(kind: IncidenceKind) -> Self {
        kind.code()
    }
}

impl TryFrom<i32> for IncidenceKind {
    type Error = UnknownIncidenceKind;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        IncidenceKind::from_code(code as i64).ok_or(UnknownIncidenceKind(code))
    }
}

/// WGS-84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Localizacion {
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
}

/// A validated incidence report, ready to be persisted.
///
/// Serializes to the canonical stored shape. The identifier and the
/// `createdAt`/`updatedAt` timestamps are not part of this type: they are
/// assigned by the store on insert and returned as [`InsertedIncidence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incidence {
    pub bellota: i64,
    #[serde(rename = "localizacion")]
    pub location: Localizacion,
    #[serde(rename = "incidencias")]
    pub kind: IncidenceKind,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "foto")]
    pub photo: String,
}

/// Store-assigned identity of a persisted incidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertedIncidence {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
