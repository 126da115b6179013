//! Inbound submission shapes and normalization into a single candidate record.
//!
//! Two client generations report incidences: one posts a structured JSON body
//! (`localizacion: {latitud, longitud}`), the other issues a flat query string.
//! Older clients also send `incidencia` instead of `incidencias`. Both shapes
//! are reduced to an [`IncidenceCandidate`] before validation.
//!
//! Values are kept untyped (`serde_json::Value`) so that a value of the wrong
//! type, or a numeric string that fails to parse, is reported by the validator
//! as a field error instead of rejecting the whole request body.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::IncidenceKind;

/// Structured body submission (`POST /api/reportar`).
///
/// Unknown keys are ignored. Flat `latitud`/`longitud` keys are accepted
/// when the nested `localizacion` object is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    pub bellota: Option<Value>,
    pub localizacion: Option<Value>,
    pub latitud: Option<Value>,
    pub longitud: Option<Value>,
    pub incidencias: Option<Value>,
    pub incidencia: Option<Value>,
    pub foto: Option<Value>,
    pub activo: Option<Value>,
}

/// Flat query submission (`GET /api/reportarData`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub bellota: Option<String>,
    pub latitud: Option<String>,
    pub longitud: Option<String>,
    pub incidencias: Option<String>,
    pub incidencia: Option<String>,
    pub foto: Option<String>,
}

impl From<ReportQuery> for Submission {
    fn from(query: ReportQuery) -> Self {
        Submission {
            bellota: query.bellota.map(Value::String),
            localizacion: None,
            latitud: query.latitud.map(Value::String),
            longitud: query.longitud.map(Value::String),
            incidencias: query.incidencias.map(Value::String),
            incidencia: query.incidencia.map(Value::String),
            foto: query.foto.map(Value::String),
            activo: None,
        }
    }
}

/// Canonical candidate record handed to the validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidenceCandidate {
    pub bellota: Option<Value>,
    pub localizacion: Option<Value>,
    pub incidencias: Option<Value>,
    pub foto: Option<Value>,
    pub activo: Option<Value>,
}

/// Normalization switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Kind adopted when a submission carries neither `incidencias` nor
    /// `incidencia`. `None` leaves the field missing so validation rejects it.
    pub default_kind: Option<IncidenceKind>,
}

/// Reconcile field-name variants into one candidate.
///
/// Canonical fields always win over their aliases: `incidencias` over
/// `incidencia`, a nested `localizacion` over flat `latitud`/`longitud`.
/// Required values are never invented unless `options.default_kind` is set.
pub fn normalize(submission: Submission, options: &NormalizeOptions) -> IncidenceCandidate {
    let Submission {
        bellota,
        localizacion,
        latitud,
        longitud,
        incidencias,
        incidencia,
        foto,
        activo,
    } = submission;

    let mut incidencias = non_blank(incidencias).or_else(|| non_blank(incidencia));
    if incidencias.is_none() {
        if let Some(kind) = options.default_kind {
            tracing::warn!(
                default_kind = %kind,
                "Submission without incidencias, applying legacy default"
            );
            incidencias = Some(Value::from(kind.code()));
        }
    }

    let localizacion = localizacion.or_else(|| synthesize_localizacion(latitud, longitud));

    IncidenceCandidate {
        bellota,
        localizacion,
        incidencias,
        foto,
        activo,
    }
}

/// `null` and whitespace-only strings carry no value.
fn non_blank(value: Option<Value>) -> Option<Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn synthesize_localizacion(latitud: Option<Value>, longitud: Option<Value>) -> Option<Value> {
    if latitud.is_none() && longitud.is_none() {
        return None;
    }

    let mut location = Map::new();
    if let Some(latitud) = latitud {
        location.insert("latitud".to_string(), latitud);
    }
    if let Some(longitud) = longitud {
        location.insert("longitud".to_string(), longitud);
    }
    Some(Value::Object(location))
}

impl From<IncidenceCandidate> for Submission {
    fn from(candidate: IncidenceCandidate) -> Self {
        Submission {
            bellota: candidate.bellota,
            localizacion: candidate.localizacion,
            incidencias: candidate.incidencias,
            foto: candidate.foto,
            activo: candidate.activo,
            ..Submission::default()
        }
    }
}
