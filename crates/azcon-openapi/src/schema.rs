//! Typed input-schema generation.
//!
//! A tool's input schema is a small insertion-ordered map of tagged
//! descriptors, not a full JSON Schema: eight kinds cover every connector
//! parameter, and the validator stays separate from the descriptor.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::naming::sanitize_key;
use crate::types::{ParsedOperation, ParsedParameter, SchemaType};

/// The tagged kind of one input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
}

/// Descriptor for one validated tool input.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    /// Element kind for arrays; `None` leaves elements unconstrained.
    pub item_kind: Option<ParamKind>,
    pub description: Option<String>,
}

impl ParamSpec {
    fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            enum_values: None,
            item_kind: None,
            description: None,
        }
    }
}

/// Insertion-ordered, unique-key collection of [`ParamSpec`]s.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    entries: Vec<(String, ParamSpec)>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a spec; returns `false` without replacing when the key exists.
    pub fn insert(&mut self, key: impl Into<String>, spec: ParamSpec) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, spec));
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamSpec> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the schema in JSON Schema object form for the registrar.
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (key, spec) in self.iter() {
            properties.insert(key.to_string(), render_spec(spec));
            if spec.required {
                required.push(Value::String(key.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }
}

fn render_spec(spec: &ParamSpec) -> Value {
    let mut rendered = match spec.kind {
        ParamKind::String => json!({"type": "string"}),
        ParamKind::Integer => json!({"type": "integer"}),
        ParamKind::Number => json!({"type": "number"}),
        ParamKind::Boolean => json!({"type": "boolean"}),
        ParamKind::Object => json!({"type": "object"}),
        ParamKind::Array => match spec.item_kind {
            Some(ParamKind::String) => json!({"type": "array", "items": {"type": "string"}}),
            _ => json!({"type": "array", "items": {}}),
        },
        ParamKind::Enum => json!({
            "type": "string",
            "enum": spec.enum_values.clone().unwrap_or_default(),
        }),
    };
    if let Some(description) = &spec.description {
        rendered["description"] = json!(description);
    }
    if let Some(default) = &spec.default {
        rendered["default"] = default.clone();
    }
    rendered
}

/// Flattens a parsed operation into its input schema.
///
/// The `connectionId` path parameter never surfaces; it is injected by the
/// invocation layer. Body properties whose sanitized name collides with a
/// parameter are prefixed with `body_`.
pub fn generate_input_schema(operation: &ParsedOperation) -> InputSchema {
    let mut schema = InputSchema::new();

    for param in &operation.parameters {
        if param.name == "connectionId" {
            continue;
        }
        let key = sanitize_key(&param.name);
        if !schema.insert(key.clone(), param_spec(param)) {
            warn!(
                operation = %operation.operation_id,
                key = %key,
                "duplicate parameter key, keeping first occurrence"
            );
        }
    }

    if let Some(body) = &operation.request_body {
        for property in &body.properties {
            if property.format.as_deref() == Some("binary") {
                continue;
            }
            let mut spec = ParamSpec::new(match property.schema_type {
                SchemaType::Integer | SchemaType::Number => ParamKind::Number,
                SchemaType::Boolean => ParamKind::Boolean,
                SchemaType::Array => ParamKind::Array,
                SchemaType::Object | SchemaType::JsonText => ParamKind::Object,
                SchemaType::String => {
                    if property.enum_values.is_some() {
                        ParamKind::Enum
                    } else {
                        ParamKind::String
                    }
                }
            });
            spec.required = property.required;
            spec.default = property.default.clone();
            spec.enum_values = property.enum_values.clone();
            spec.description = property.description.clone();

            let key = sanitize_key(&property.name);
            if schema.contains_key(&key) {
                let prefixed = format!("body_{key}");
                if !schema.insert(prefixed.clone(), spec) {
                    warn!(
                        operation = %operation.operation_id,
                        key = %prefixed,
                        "body property key collides twice, skipping"
                    );
                }
            } else {
                schema.insert(key, spec);
            }
        }
    }

    schema
}

fn param_spec(param: &ParsedParameter) -> ParamSpec {
    let mut spec = match param.schema_type {
        SchemaType::Integer => ParamSpec::new(ParamKind::Integer),
        SchemaType::Number => ParamSpec::new(ParamKind::Number),
        SchemaType::Boolean => ParamSpec::new(ParamKind::Boolean),
        SchemaType::Array => {
            let mut s = ParamSpec::new(ParamKind::Array);
            s.item_kind = Some(ParamKind::String);
            s
        }
        SchemaType::Object | SchemaType::JsonText => ParamSpec::new(ParamKind::Object),
        SchemaType::String => {
            if param.enum_values.is_some() {
                ParamSpec::new(ParamKind::Enum)
            } else {
                ParamSpec::new(ParamKind::String)
            }
        }
    };
    spec.required = param.required;
    spec.default = param.default.clone();
    spec.enum_values = param.enum_values.clone();
    spec.description = param.description.clone();
    spec
}
