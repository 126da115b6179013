//! Incidence validation
//!
//! [`validate`] is pure: no I/O, no mutation of its input, safe to call from
//! any number of concurrent handlers. Untyped submission values are first
//! coerced into [`CoercedIncidence`]; the field rules then run through
//! `validator`. Every rule runs even after an earlier one fails, so a client
//! can fix all defects in a single round trip.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use validator::{Validate, ValidationErrors};

use crate::models::{Incidence, IncidenceCandidate, IncidenceKind, Localizacion};

/// Minimum accepted length of the Base64 photo payload, in characters.
///
/// The payload is never decoded; the floor only rejects empty or truncated uploads.
pub const MIN_PHOTO_LENGTH: usize = 100;

/// A single failed rule, addressed by field path (e.g. `localizacion.latitud`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Candidate after type coercion. `None` means missing or not coercible.
#[derive(Debug, Default, Validate)]
struct CoercedIncidence {
    #[validate(
        required(message = "bellota is required"),
        range(min = 0, message = "bellota must be greater than or equal to 0")
    )]
    bellota: Option<i64>,
    #[validate(
        required(message = "localizacion.latitud is required"),
        range(
            min = -90.0,
            max = 90.0,
            message = "localizacion.latitud must be between -90 and 90"
        )
    )]
    latitud: Option<f64>,
    #[validate(
        required(message = "localizacion.longitud is required"),
        range(
            min = -180.0,
            max = 180.0,
            message = "localizacion.longitud must be between -180 and 180"
        )
    )]
    longitud: Option<f64>,
    #[validate(
        required(message = "incidencias is required"),
        range(min = 1, max = 2, message = "incidencias must be 1 (panic) or 2 (dead-man)")
    )]
    incidencias: Option<i64>,
    #[validate(
        required(message = "foto is required"),
        length(min = 100, message = "foto must be at least 100 characters long")
    )]
    foto: Option<String>,
    activo: bool,
}

/// Report order: `(validator field, client-facing path)`.
const FIELD_ORDER: &[(&str, &str)] = &[
    ("bellota", "bellota"),
    ("localizacion", "localizacion"),
    ("latitud", "localizacion.latitud"),
    ("longitud", "localizacion.longitud"),
    ("incidencias", "incidencias"),
    ("foto", "foto"),
    ("activo", "activo"),
];

/// Coercion outcome: typed values plus the type errors found along the way.
#[derive(Default)]
struct Coercion {
    incidence: CoercedIncidence,
    type_errors: Vec<FieldError>,
    /// Fields whose rule errors are superseded by a type error or a missing parent.
    superseded: HashSet<&'static str>,
}

impl Coercion {
    fn reject(&mut self, field: &'static str, path: &str, message: impl Into<String>) {
        self.type_errors.push(FieldError::new(path, message));
        self.superseded.insert(field);
    }
}

/// Accept or reject a candidate record.
///
/// Errors are reported in a fixed order: bellota, coordinates, kind, photo, active flag.
pub fn validate(candidate: &IncidenceCandidate) -> Result<Incidence, Vec<FieldError>> {
    let coercion = coerce(candidate);
    let rule_errors = coercion.incidence.validate().err();
    let errors = ordered_errors(&coercion, rule_errors.as_ref());

    if !errors.is_empty() {
        return Err(errors);
    }

    let CoercedIncidence {
        bellota,
        latitud,
        longitud,
        incidencias,
        foto,
        activo,
    } = coercion.incidence;

    match (
        bellota,
        latitud,
        longitud,
        incidencias.and_then(IncidenceKind::from_code),
        foto,
    ) {
        (Some(bellota), Some(latitude), Some(longitude), Some(kind), Some(photo)) => {
            Ok(Incidence {
                bellota,
                location: Localizacion {
                    latitude,
                    longitude,
                },
                kind,
                active: activo,
                photo,
            })
        }
        _ => Err(vec![FieldError::new(
            "incidencias",
            "incidencias must be 1 (panic) or 2 (dead-man)",
        )]),
    }
}

fn ordered_errors(coercion: &Coercion, rule_errors: Option<&ValidationErrors>) -> Vec<FieldError> {
    let rule_errors = rule_errors.map(ValidationErrors::field_errors);
    let mut errors = Vec::new();

    for &(field, path) in FIELD_ORDER {
        errors.extend(
            coercion
                .type_errors
                .iter()
                .filter(|e| e.field == path)
                .cloned(),
        );

        if coercion.superseded.contains(field) {
            continue;
        }
        let Some(field_errors) = rule_errors.as_ref().and_then(|all| all.get(field)) else {
            continue;
        };
        errors.extend(field_errors.iter().map(|e| {
            let message = e
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{path} is invalid"));
            FieldError::new(path, message)
        }));
    }

    errors
}

/// Typed view of a single untyped value.
enum Coerced<T> {
    Missing,
    Invalid,
    Present(T),
}

impl<T> Coerced<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Coerced::Present(value) => Some(value),
            Coerced::Missing | Coerced::Invalid => None,
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_integer(value: Option<&Value>) -> Coerced<i64> {
    if is_blank(value) {
        return Coerced::Missing;
    }
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    parsed.map_or(Coerced::Invalid, Coerced::Present)
}

fn coerce_number(value: Option<&Value>) -> Coerced<f64> {
    if is_blank(value) {
        return Coerced::Missing;
    }
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Coerced::Present(n),
        _ => Coerced::Invalid,
    }
}

fn coerce(candidate: &IncidenceCandidate) -> Coercion {
    let mut coercion = Coercion::default();

    let bellota = coerce_integer(candidate.bellota.as_ref());
    if matches!(bellota, Coerced::Invalid) {
        coercion.reject("bellota", "bellota", "bellota must be an integer");
    }
    coercion.incidence.bellota = bellota.into_option();

    match candidate.localizacion.as_ref() {
        None | Some(Value::Null) => {
            coercion.reject(
                "localizacion",
                "localizacion",
                "localizacion is required (latitud and longitud)",
            );
            coercion.superseded.insert("latitud");
            coercion.superseded.insert("longitud");
        }
        Some(Value::Object(location)) => coerce_location(location, &mut coercion),
        Some(_) => {
            coercion.reject(
                "localizacion",
                "localizacion",
                "localizacion must be an object with latitud and longitud",
            );
            coercion.superseded.insert("latitud");
            coercion.superseded.insert("longitud");
        }
    }

    let kind = coerce_integer(candidate.incidencias.as_ref());
    if matches!(kind, Coerced::Invalid) {
        coercion.reject("incidencias", "incidencias", "incidencias must be an integer");
    }
    coercion.incidence.incidencias = kind.into_option();

    match candidate.foto.as_ref() {
        None | Some(Value::Null) => {}
        Some(Value::String(photo)) if photo.is_empty() => {}
        Some(Value::String(photo)) => coercion.incidence.foto = Some(photo.clone()),
        Some(_) => coercion.reject("foto", "foto", "foto must be a Base64 string"),
    }

    match candidate.activo.as_ref() {
        None | Some(Value::Null) => coercion.incidence.activo = true,
        Some(Value::Bool(active)) => coercion.incidence.activo = *active,
        Some(_) => coercion.reject("activo", "activo", "activo must be a boolean"),
    }

    coercion
}

fn coerce_location(location: &Map<String, Value>, coercion: &mut Coercion) {
    let latitud = coerce_number(location.get("latitud"));
    if matches!(latitud, Coerced::Invalid) {
        coercion.reject(
            "latitud",
            "localizacion.latitud",
            "localizacion.latitud must be a number",
        );
    }
    coercion.incidence.latitud = latitud.into_option();

    let longitud = coerce_number(location.get("longitud"));
    if matches!(longitud, Coerced::Invalid) {
        coercion.reject(
            "longitud",
            "localizacion.longitud",
            "localizacion.longitud must be a number",
        );
    }
    coercion.incidence.longitud = longitud.into_option();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn photo(len: usize) -> Value {
        Value::String("A".repeat(len))
    }

    fn valid_candidate() -> IncidenceCandidate {
        IncidenceCandidate {
            bellota: Some(json!(7)),
            localizacion: Some(json!({ "latitud": 40.0, "longitud": -3.0 })),
            incidencias: Some(json!(1)),
            foto: Some(photo(150)),
            activo: None,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_candidate() {
        let incidence = validate(&valid_candidate()).expect("valid");
        assert_eq!(incidence.bellota, 7);
        assert_eq!(incidence.location.latitude, 40.0);
        assert_eq!(incidence.location.longitude, -3.0);
        assert_eq!(incidence.kind, IncidenceKind::Panic);
        assert_eq!(incidence.photo.len(), 150);
        assert!(incidence.active, "activo defaults to true");
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!("3")),
            localizacion: Some(json!({ "latitud": "40.5", "longitud": " -3.5 " })),
            incidencias: Some(json!("2")),
            ..valid_candidate()
        };
        let incidence = validate(&candidate).expect("valid");
        assert_eq!(incidence.bellota, 3);
        assert_eq!(incidence.location.latitude, 40.5);
        assert_eq!(incidence.location.longitude, -3.5);
        assert_eq!(incidence.kind, IncidenceKind::DeadMan);
    }

    #[test]
    fn test_integral_floats_are_integers() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!(42.0)),
            incidencias: Some(json!("2.0")),
            ..valid_candidate()
        };
        let incidence = validate(&candidate).expect("valid");
        assert_eq!(incidence.bellota, 42);
        assert_eq!(incidence.kind, IncidenceKind::DeadMan);
    }

    #[test]
    fn test_missing_fields_each_reported() {
        let errors = validate(&IncidenceCandidate::default()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["bellota", "localizacion", "incidencias", "foto"]
        );
    }

    #[test]
    fn test_multiple_defects_reported_together() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!(-1)),
            localizacion: Some(json!({ "latitud": 100, "longitud": 0 })),
            incidencias: Some(json!(5)),
            foto: Some(json!("x")),
            activo: None,
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["bellota", "localizacion.latitud", "incidencias", "foto"]
        );
        assert!(errors[0].message.contains("bellota"));
        assert!(errors[1].message.contains("latitud"));
        assert!(errors[2].message.contains("incidencias"));
        assert!(errors[3].message.contains("foto"));
    }

    #[test]
    fn test_coordinate_ranges_are_inclusive() {
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            let candidate = IncidenceCandidate {
                localizacion: Some(json!({ "latitud": lat, "longitud": lon })),
                ..valid_candidate()
            };
            assert!(validate(&candidate).is_ok(), "({lat}, {lon}) should be valid");
        }
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let candidate = IncidenceCandidate {
            localizacion: Some(json!({ "latitud": -90.0001, "longitud": 180.5 })),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["localizacion.latitud", "localizacion.longitud"]
        );
    }

    #[test]
    fn test_unparseable_and_non_finite_coordinates() {
        for bad in [json!("abc"), json!("NaN"), json!("inf"), json!(true), json!([1])] {
            let candidate = IncidenceCandidate {
                localizacion: Some(json!({ "latitud": bad, "longitud": -3.5 })),
                ..valid_candidate()
            };
            let errors = validate(&candidate).unwrap_err();
            assert_eq!(fields(&errors), vec!["localizacion.latitud"]);
            assert_eq!(errors[0].message, "localizacion.latitud must be a number");
        }
    }

    #[test]
    fn test_range_errors_carry_nested_paths() {
        let candidate = IncidenceCandidate {
            localizacion: Some(json!({ "latitud": "91", "longitud": -181 })),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new(
                    "localizacion.latitud",
                    "localizacion.latitud must be between -90 and 90"
                ),
                FieldError::new(
                    "localizacion.longitud",
                    "localizacion.longitud must be between -180 and 180"
                ),
            ]
        );
    }

    #[test]
    fn test_type_error_replaces_rule_error() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!("-1.5")),
            foto: Some(json!(["A"])),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("bellota", "bellota must be an integer"),
                FieldError::new("foto", "foto must be a Base64 string"),
            ]
        );
    }

    #[test]
    fn test_missing_single_coordinate() {
        let candidate = IncidenceCandidate {
            localizacion: Some(json!({ "latitud": 10.0 })),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(fields(&errors), vec!["localizacion.longitud"]);
    }

    #[test]
    fn test_localizacion_must_be_object() {
        let candidate = IncidenceCandidate {
            localizacion: Some(json!("40.0,-3.0")),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(fields(&errors), vec!["localizacion"]);
    }

    #[test]
    fn test_unknown_kind_refused() {
        for code in [json!(0), json!(3), json!(-1), json!("9")] {
            let candidate = IncidenceCandidate {
                incidencias: Some(code),
                ..valid_candidate()
            };
            let errors = validate(&candidate).unwrap_err();
            assert_eq!(fields(&errors), vec!["incidencias"]);
        }
    }

    #[test]
    fn test_non_integer_values() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!(1.5)),
            incidencias: Some(json!("uno")),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(errors[0].message, "bellota must be an integer");
        assert_eq!(errors[1].message, "incidencias must be an integer");
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let candidate = IncidenceCandidate {
            bellota: Some(json!("  ")),
            ..valid_candidate()
        };
        let errors = validate(&candidate).unwrap_err();
        assert_eq!(errors[0].message, "bellota is required");
    }

    #[test]
    fn test_photo_length_floor() {
        let candidate = IncidenceCandidate {
            foto: Some(photo(MIN_PHOTO_LENGTH - 1)),
            ..valid_candidate()
        };
        assert_eq!(fields(&validate(&candidate).unwrap_err()), vec!["foto"]);

        let candidate = IncidenceCandidate {
            foto: Some(photo(MIN_PHOTO_LENGTH)),
            ..valid_candidate()
        };
        assert!(validate(&candidate).is_ok());
    }

    #[test]
    fn test_photo_is_not_decoded() {
        // Not valid Base64, but long enough: accepted as-is
        let candidate = IncidenceCandidate {
            foto: Some(Value::String("!".repeat(MIN_PHOTO_LENGTH))),
            ..valid_candidate()
        };
        assert!(validate(&candidate).is_ok());
    }

    #[test]
    fn test_empty_and_non_string_photo() {
        let candidate = IncidenceCandidate {
            foto: Some(json!("")),
            ..valid_candidate()
        };
        assert_eq!(validate(&candidate).unwrap_err()[0].message, "foto is required");

        let candidate = IncidenceCandidate {
            foto: Some(json!(12345)),
            ..valid_candidate()
        };
        assert_eq!(
            validate(&candidate).unwrap_err()[0].message,
            "foto must be a Base64 string"
        );
    }

    #[test]
    fn test_activo_must_be_boolean() {
        let candidate = IncidenceCandidate {
            activo: Some(json!(false)),
            ..valid_candidate()
        };
        assert!(!validate(&candidate).expect("valid").active);

        let candidate = IncidenceCandidate {
            activo: Some(json!("true")),
            ..valid_candidate()
        };
        assert_eq!(fields(&validate(&candidate).unwrap_err()), vec!["activo"]);
    }

    #[test]
    fn test_validate_does_not_mutate_input() {
        let candidate = valid_candidate();
        let before = candidate.clone();
        let _ = validate(&candidate);
        assert_eq!(candidate, before);
    }
}
