//! Client-argument validation against an [`InputSchema`].

use serde_json::{Map, Value};

use crate::error::{OpenApiError, Result};
use crate::schema::{InputSchema, ParamKind};

/// Validates arguments, injects declared defaults, and returns the
/// normalized map.
///
/// Unknown keys are rejected. `null` values count as absent. `Object`
/// parameters accept either a map or a JSON-encoded string (the invocation
/// layer parses the latter).
pub fn validate_args(
    schema: &InputSchema,
    args: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>> {
    let empty = Map::new();
    let args = args.unwrap_or(&empty);

    for key in args.keys() {
        if !schema.contains_key(key) {
            return Err(OpenApiError::Validation(format!(
                "unexpected parameter '{key}'"
            )));
        }
    }

    let mut normalized = Map::new();
    for (key, spec) in schema.iter() {
        let value = args.get(key).filter(|v| !v.is_null());
        match value {
            Some(value) => {
                check_kind(key, spec.kind, spec.enum_values.as_deref(), value)?;
                normalized.insert(key.to_string(), value.clone());
            }
            None => {
                if let Some(default) = &spec.default {
                    normalized.insert(key.to_string(), default.clone());
                } else if spec.required {
                    return Err(OpenApiError::Validation(format!(
                        "missing required parameter '{key}'"
                    )));
                }
            }
        }
    }

    Ok(normalized)
}

fn check_kind(
    key: &str,
    kind: ParamKind,
    enum_values: Option<&[Value]>,
    value: &Value,
) -> Result<()> {
    let ok = match kind {
        ParamKind::String => value.is_string(),
        ParamKind::Integer => value.is_i64() || value.is_u64(),
        ParamKind::Number => value.is_number(),
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::Array => value.is_array(),
        ParamKind::Object => value.is_object() || value.is_string(),
        ParamKind::Enum => {
            value.is_string()
                && enum_values
                    .map(|allowed| allowed.contains(value))
                    .unwrap_or(true)
        }
    };
    if ok {
        Ok(())
    } else {
        Err(OpenApiError::Validation(format!(
            "parameter '{key}' has the wrong type or an out-of-range value"
        )))
    }
}
