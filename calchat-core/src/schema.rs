//! Argument validation against a tool's parameter schema.
//!
//! Schemas are compiled once with `jsonschema`. Model output is loosely
//! typed, so arguments are normalized before validation: JSON-encoded
//! argument strings are parsed, `null` fields are dropped, and integer
//! fields sent as numeric strings or integral floats are converted.

use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

/// A compiled tool parameter schema.
#[derive(Clone)]
pub struct ArgumentSchema {
    compiled: Arc<JSONSchema>,
    integer_fields: Vec<String>,
}

impl fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSchema")
            .field("integer_fields", &self.integer_fields)
            .finish_non_exhaustive()
    }
}

impl ArgumentSchema {
    pub fn compile(parameters: &Value) -> Result<Self, String> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(parameters)
            .map_err(|e| e.to_string())?;

        let integer_fields = parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .filter(|(_, p)| p.get("type").and_then(Value::as_str) == Some("integer"))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ArgumentSchema {
            compiled: Arc::new(compiled),
            integer_fields,
        })
    }

    /// Normalize `arguments` and validate them.
    ///
    /// Returns the normalized object. Defaults are left to the typed
    /// argument structs; the error string lists every violation.
    pub fn validate(&self, arguments: &Value) -> Result<Value, String> {
        let mut object = as_object(arguments)?;
        object.retain(|_, value| !value.is_null());

        for name in &self.integer_fields {
            if let Some(value) = object.get_mut(name) {
                if let Some(n) = coerce_integer(value) {
                    *value = Value::from(n);
                }
            }
        }

        let instance = Value::Object(object);
        let violations: Vec<String> = match self.compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|e| e.to_string()).collect(),
        };

        if violations.is_empty() {
            Ok(instance)
        } else {
            Err(violations.join("; "))
        }
    }
}

/// Models sometimes send arguments as a JSON-encoded string.
fn as_object(arguments: &Value) -> Result<Map<String, Value>, String> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err("arguments must be a JSON object".to_string()),
        },
        _ => Err("arguments must be a JSON object".to_string()),
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CalendarTool;
    use serde_json::json;

    fn search_schema() -> ArgumentSchema {
        ArgumentSchema::compile(&CalendarTool::SearchEvents.spec().parameters).unwrap()
    }

    fn upcoming_schema() -> ArgumentSchema {
        ArgumentSchema::compile(&CalendarTool::GetUpcomingEvents.spec().parameters).unwrap()
    }

    #[test]
    fn omitted_optional_fields_are_accepted() {
        assert_eq!(upcoming_schema().validate(&json!({})).unwrap(), json!({}));
        assert_eq!(upcoming_schema().validate(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn null_fields_count_as_omitted() {
        let args = upcoming_schema()
            .validate(&json!({"max_results": null, "calendar_id": "work"}))
            .unwrap();
        assert_eq!(args, json!({"calendar_id": "work"}));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = search_schema().validate(&json!({"max_results": 3})).unwrap_err();
        assert!(err.contains("\"query\" is a required property"), "{err}");
    }

    #[test]
    fn rejects_wrong_types() {
        let err = search_schema().validate(&json!({"query": 42})).unwrap_err();
        assert!(err.contains("is not of type"), "{err}");

        let err = upcoming_schema()
            .validate(&json!({"max_results": "lots"}))
            .unwrap_err();
        assert!(err.contains("\"lots\" is not of type"), "{err}");
    }

    #[test]
    fn rejects_blank_query_and_zero_results() {
        assert!(search_schema().validate(&json!({"query": ""})).is_err());
        assert!(search_schema().validate(&json!({"query": "   "})).is_err());

        let err = upcoming_schema()
            .validate(&json!({"max_results": 0}))
            .unwrap_err();
        assert!(err.contains("minimum"), "{err}");
    }

    #[test]
    fn coerces_numeric_strings_and_integral_floats() {
        let args = upcoming_schema()
            .validate(&json!({"max_results": "5"}))
            .unwrap();
        assert_eq!(args["max_results"], json!(5));

        let args = upcoming_schema()
            .validate(&json!({"max_results": 7.0}))
            .unwrap();
        assert_eq!(args["max_results"], json!(7));

        assert!(
            upcoming_schema()
                .validate(&json!({"max_results": 2.5}))
                .is_err()
        );
    }

    #[test]
    fn accepts_json_encoded_argument_strings() {
        let raw = Value::String(r#"{"query": "John", "max_results": 2}"#.to_string());
        let args = search_schema().validate(&raw).unwrap();
        assert_eq!(args["query"], "John");
        assert_eq!(args["max_results"], json!(2));

        let garbage = Value::String("{not json".to_string());
        assert_eq!(
            search_schema().validate(&garbage).unwrap_err(),
            "arguments must be a JSON object"
        );
    }

    #[test]
    fn reports_every_violation() {
        let err = search_schema()
            .validate(&json!({"max_results": 0}))
            .unwrap_err();
        assert!(err.contains("required"), "{err}");
        assert!(err.contains("minimum"), "{err}");
    }
}
