//! Swagger 2.0 document walker.
//!
//! Connector documents are Swagger 2.0 with Microsoft `x-ms-*` vendor
//! extensions, so the walk happens over raw JSON rather than a typed
//! OpenAPI model. Individual operations that fail to compile are logged and
//! skipped; one bad operation never poisons the document.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{
    ApiAnnotation, BodyProperty, DynamicValues, HttpMethod, ParameterLocation, ParsedOperation,
    ParsedParameter, RequestBody, SchemaType, Visibility,
};

/// Body properties nested deeper than this collapse to `JsonText`.
const MAX_FLATTEN_DEPTH: usize = 2;

/// Compiles every operation in a Swagger document.
///
/// `api_name` is a label for diagnostics only. Output order follows the
/// document's own path and method order.
pub fn parse_document(doc: &Value, api_name: &str) -> Vec<ParsedOperation> {
    let mut operations = Vec::new();

    let Some(paths) = doc.get("paths").and_then(|p| p.as_object()) else {
        warn!(api = api_name, "Swagger document has no paths object");
        return operations;
    };

    for (path, path_item) in paths {
        let Some(path_item) = path_item.as_object() else {
            continue;
        };
        let shared_params = path_item
            .get("parameters")
            .and_then(|p| p.as_array())
            .cloned()
            .unwrap_or_default();

        for method in HttpMethod::ALL {
            let Some(operation) = path_item.get(method.as_str()) else {
                continue;
            };
            match parse_operation(doc, path, method, operation, &shared_params) {
                Some(parsed) => operations.push(parsed),
                None => warn!(
                    api = api_name,
                    method = method.as_str(),
                    path = %path,
                    "skipping unparseable operation"
                ),
            }
        }
    }

    debug!(api = api_name, count = operations.len(), "parsed operations");
    operations
}

fn parse_operation(
    doc: &Value,
    path: &str,
    method: HttpMethod,
    operation: &Value,
    shared_params: &[Value],
) -> Option<ParsedOperation> {
    let operation = operation.as_object()?;

    let operation_id = operation
        .get("operationId")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}_{}", method.as_str(), path));

    let mut parameters = Vec::new();
    let mut request_body = None;

    let declared = operation
        .get("parameters")
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();
    for raw in shared_params.iter().chain(declared.iter()) {
        let resolved = resolve_parameter(doc, raw);
        let Some(param) = resolved.as_object() else {
            continue;
        };
        let location = param.get("in").and_then(|i| i.as_str()).unwrap_or_default();

        if location == "body" {
            // Swagger allows exactly one body parameter per operation.
            if request_body.is_none() {
                request_body = parse_request_body(doc, param);
            }
            continue;
        }
        let Some(location) = ParameterLocation::parse(location) else {
            continue;
        };
        let Some(name) = param.get("name").and_then(|n| n.as_str()) else {
            continue;
        };

        parameters.push(ParsedParameter {
            name: name.to_string(),
            location,
            schema_type: SchemaType::parse(param.get("type").and_then(|t| t.as_str())),
            format: str_field(param, "format"),
            required: param
                .get("required")
                .and_then(|r| r.as_bool())
                .unwrap_or(false),
            description: str_field(param, "description"),
            default: param.get("default").cloned(),
            enum_values: param
                .get("enum")
                .and_then(|e| e.as_array())
                .map(|e| e.to_vec()),
            dynamic_values: parse_dynamic_values(param.get("x-ms-dynamic-values")),
        });
    }

    Some(ParsedOperation {
        operation_id,
        method,
        path: path.to_string(),
        summary: operation
            .get("summary")
            .and_then(|s| s.as_str())
            .map(str::to_string),
        description: operation
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_string),
        deprecated: operation
            .get("deprecated")
            .and_then(|d| d.as_bool())
            .unwrap_or(false),
        visibility: Visibility::parse(operation.get("x-ms-visibility").and_then(|v| v.as_str())),
        is_trigger: operation.contains_key("x-ms-trigger"),
        api_annotation: parse_annotation(operation.get("x-ms-api-annotation")),
        parameters,
        request_body,
        response_schema: parse_response_schema(doc, operation.get("responses")),
    })
}

/// Resolves a parameter that may itself be a `#/parameters/<name>` reference.
fn resolve_parameter(doc: &Value, raw: &Value) -> Value {
    if let Some(reference) = raw.get("$ref").and_then(|r| r.as_str()) {
        if let Some(resolved) = resolve_ref(doc, reference) {
            return resolved;
        }
    }
    raw.clone()
}

fn parse_request_body(
    doc: &Value,
    param: &serde_json::Map<String, Value>,
) -> Option<RequestBody> {
    let raw_schema = param.get("schema")?;
    let schema = resolve_schema(doc, raw_schema);
    let schema = schema.as_object()?;

    let required_fields: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut properties = Vec::new();
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, raw_prop) in props {
            let resolved = resolve_schema(doc, raw_prop);
            if let Some(prop) = flatten_property(name, &resolved, &required_fields, 1) {
                properties.push(prop);
            }
        }
    }

    Some(RequestBody {
        required: param
            .get("required")
            .and_then(|r| r.as_bool())
            .unwrap_or(false),
        required_fields,
        properties,
    })
}

/// Records one top-level body property.
///
/// Objects that still declare their own `properties` below the flatten cap
/// are re-typed as `JsonText`; nothing recurses past the cap.
fn flatten_property(
    name: &str,
    schema: &Value,
    required_fields: &[String],
    depth: usize,
) -> Option<BodyProperty> {
    let obj = schema.as_object()?;

    let format = str_field(obj, "format");
    if format.as_deref() == Some("binary") {
        // The invocation envelope carries JSON only.
        debug!(property = name, "skipping binary body property");
        return None;
    }

    let mut schema_type = SchemaType::parse(obj.get("type").and_then(|t| t.as_str()));
    if schema_type == SchemaType::Object
        && depth < MAX_FLATTEN_DEPTH
        && obj
            .get("properties")
            .and_then(|p| p.as_object())
            .is_some_and(|p| !p.is_empty())
    {
        schema_type = SchemaType::JsonText;
    }

    Some(BodyProperty {
        name: name.to_string(),
        schema_type,
        format,
        description: str_field(obj, "description"),
        required: required_fields.iter().any(|f| f == name),
        visibility: Visibility::parse(obj.get("x-ms-visibility").and_then(|v| v.as_str())),
        enum_values: obj.get("enum").and_then(|e| e.as_array()).map(|e| e.to_vec()),
        default: obj.get("default").cloned(),
    })
}

fn parse_response_schema(doc: &Value, responses: Option<&Value>) -> Option<Value> {
    let responses = responses?.as_object()?;
    let schema = responses
        .get("200")
        .and_then(|r| r.get("schema"))
        .or_else(|| responses.get("201").and_then(|r| r.get("schema")))?;
    Some(resolve_schema(doc, schema))
}

/// Resolves a schema's `$ref` if present, otherwise returns it unchanged.
fn resolve_schema(doc: &Value, schema: &Value) -> Value {
    if let Some(reference) = schema.get("$ref").and_then(|r| r.as_str()) {
        if let Some(resolved) = resolve_ref(doc, reference) {
            return resolved;
        }
    }
    schema.clone()
}

/// Walks a `#/segment/segment/...` reference through the document.
///
/// The result is a deep copy, so later mutation cannot corrupt the shared
/// definitions tree. Unresolvable references yield `None`.
fn resolve_ref(doc: &Value, reference: &str) -> Option<Value> {
    let pointer = reference.strip_prefix("#/")?;
    let mut current = doc;
    for segment in pointer.split('/') {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

fn parse_annotation(raw: Option<&Value>) -> Option<ApiAnnotation> {
    let obj = raw?.as_object()?;
    Some(ApiAnnotation {
        family: str_field(obj, "family"),
        revision: obj.get("revision").and_then(|r| r.as_i64()),
        status: str_field(obj, "status"),
    })
}

fn parse_dynamic_values(raw: Option<&Value>) -> Option<DynamicValues> {
    let obj = raw?.as_object()?;
    Some(DynamicValues {
        operation_id: str_field(obj, "operationId"),
        value_collection: str_field(obj, "value-collection"),
        value_path: str_field(obj, "value-path"),
        value_title: str_field(obj, "value-title"),
        parameters: obj.get("parameters").cloned(),
    })
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
