//! Prediction payload validation
//!
//! Payloads are parsed as untyped JSON and checked field by field so every
//! rejection maps to a specific [`ValidationError`]. Unknown top-level fields
//! are ignored. Numbers are never coerced from strings or booleans.

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{FeatureVector, NUM_FEATURES};

/// Name of the field carrying the feature array
pub const DATA_FIELD: &str = "data";

/// Validate a raw request body into a feature vector
pub fn validate_payload(body: &[u8]) -> Result<FeatureVector, ValidationError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::MalformedJson)?;
    validate_value(&value)
}

/// Validate an already-decoded JSON value into a feature vector
pub fn validate_value(value: &Value) -> Result<FeatureVector, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    if object.len() > 1 {
        debug!(
            fields = object.len(),
            "Ignoring unknown fields in prediction request"
        );
    }

    let data = object
        .get(DATA_FIELD)
        .ok_or(ValidationError::MissingField)?;
    let items = data.as_array().ok_or(ValidationError::NotAnArray {
        expected: NUM_FEATURES,
    })?;

    if items.len() != NUM_FEATURES {
        return Err(ValidationError::WrongArity {
            expected: NUM_FEATURES,
            actual: items.len(),
        });
    }

    let cpu_usage = number_at(items, 0)?;
    let memory_load = number_at(items, 1)?;
    FeatureVector::new(cpu_usage, memory_load)
}

fn number_at(items: &[Value], index: usize) -> Result<f64, ValidationError> {
    match &items[index] {
        Value::Number(n) => n.as_f64().ok_or(ValidationError::NonFinite { index }),
        _ => Err(ValidationError::NotANumber { index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_payload() {
        let features = validate_payload(br#"{"data": [-5.5, 5.2]}"#).unwrap();
        assert_eq!(features.cpu_usage, -5.5);
        assert_eq!(features.memory_load, 5.2);
    }

    #[test]
    fn test_integers_accepted_as_numbers() {
        let features = validate_payload(br#"{"data": [2, -3]}"#).unwrap();
        assert_eq!(features.as_array(), [2.0, -3.0]);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let features = validate_payload(br#"{"data": [2.1, 2.1], "host": "node-1"}"#).unwrap();
        assert_eq!(features.as_array(), [2.1, 2.1]);
    }

    #[test]
    fn test_single_element_rejected() {
        assert_eq!(
            validate_payload(br#"{"data": [2.1]}"#),
            Err(ValidationError::WrongArity {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_too_many_elements_rejected() {
        assert_eq!(
            validate_payload(br#"{"data": [1.0, 2.0, 3.0]}"#),
            Err(ValidationError::WrongArity {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_non_numeric_element_rejected() {
        assert_eq!(
            validate_payload(br#"{"data": ["x", 2.1]}"#),
            Err(ValidationError::NotANumber { index: 0 })
        );
        assert_eq!(
            validate_payload(br#"{"data": [2.1, "2.1"]}"#),
            Err(ValidationError::NotANumber { index: 1 })
        );
        assert_eq!(
            validate_payload(br#"{"data": [true, 2.1]}"#),
            Err(ValidationError::NotANumber { index: 0 })
        );
        assert_eq!(
            validate_payload(br#"{"data": [null, 2.1]}"#),
            Err(ValidationError::NotANumber { index: 0 })
        );
    }

    #[test]
    fn test_non_finite_literals_rejected() {
        // NaN and Infinity are not JSON; overflowing literals are refused by the parser.
        assert!(validate_payload(br#"{"data": [NaN, 1.0]}"#).is_err());
        assert!(validate_payload(br#"{"data": [Infinity, 1.0]}"#).is_err());
        assert!(validate_payload(br#"{"data": [1e400, 1.0]}"#).is_err());
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            validate_payload(b"not json"),
            Err(ValidationError::MalformedJson)
        );
        assert_eq!(
            validate_payload(b"[1.0, 2.0]"),
            Err(ValidationError::NotAnObject)
        );
        assert_eq!(
            validate_payload(br#"{"values": [1.0, 2.0]}"#),
            Err(ValidationError::MissingField)
        );
        assert_eq!(
            validate_payload(br#"{"data": 1.0}"#),
            Err(ValidationError::NotAnArray { expected: 2 })
        );
        assert_eq!(validate_payload(b""), Err(ValidationError::MalformedJson));
    }
}
