//! Invocation translation.
//!
//! Maps validated tool arguments onto ARM's `dynamicInvoke` envelope and
//! decodes the proxied response. Nothing here ever panics out to the
//! transport: every failure is folded into an error text block carrying the
//! tool's identity.

use std::sync::Arc;

use azcon_arm::{endpoints, ArmClient, ArmContext, ConnectionInfo, TokenProvider};
use azcon_openapi::{sanitize_key, ParameterLocation, ParsedOperation, SchemaType};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Builds the `dynamicInvoke` request envelope for one operation call.
///
/// `params` holds validated arguments keyed by their sanitized names;
/// original parameter and property names reappear in the envelope.
pub fn build_envelope(operation: &ParsedOperation, params: &Map<String, Value>) -> Value {
    let mut path = strip_connection_segment(&operation.path);
    let mut queries = Map::new();

    for param in &operation.parameters {
        if param.name == "connectionId" {
            continue;
        }
        let key = sanitize_key(&param.name);
        let Some(value) = params.get(&key) else {
            continue;
        };
        match param.location {
            ParameterLocation::Path => {
                path = path.replace(&format!("{{{}}}", param.name), &string_form(value));
            }
            ParameterLocation::Query => {
                queries.insert(param.name.clone(), Value::String(string_form(value)));
            }
            ParameterLocation::Header => {}
        }
    }

    let mut body = Map::new();
    if let Some(request_body) = &operation.request_body {
        for property in &request_body.properties {
            let key = sanitize_key(&property.name);
            let value = params
                .get(&key)
                .or_else(|| params.get(&format!("body_{key}")));
            let Some(value) = value else {
                continue;
            };
            body.insert(property.name.clone(), coerce_body_value(property.schema_type, value));
        }
    }

    let mut request = Map::new();
    request.insert("method".to_string(), json!(operation.method.as_upper()));
    request.insert("path".to_string(), Value::String(path));
    if !body.is_empty() {
        request.insert(
            "headers".to_string(),
            json!({"Content-Type": "application/json"}),
        );
        request.insert("body".to_string(), Value::Object(body));
    }
    if !queries.is_empty() {
        request.insert("queries".to_string(), Value::Object(queries));
    }

    json!({ "request": Value::Object(request) })
}

/// Drops the leading `/{connectionId}` segment exactly once; the proxy
/// prepends the connection itself.
fn strip_connection_segment(path: &str) -> String {
    match path.strip_prefix("/{connectionId}") {
        Some("") => "/".to_string(),
        Some(rest) => rest.to_string(),
        None => path.to_string(),
    }
}

fn string_form(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Flattened object properties accept either structured JSON or a
/// JSON-encoded string; unparseable strings pass through untouched.
fn coerce_body_value(schema_type: SchemaType, value: &Value) -> Value {
    if matches!(schema_type, SchemaType::Object | SchemaType::JsonText) {
        if let Some(text) = value.as_str() {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                return parsed;
            }
        }
    }
    value.clone()
}

/// Executes dynamic tool calls against ARM.
pub struct Invoker {
    ctx: ArmContext,
    arm: Arc<ArmClient>,
    tokens: Arc<dyn TokenProvider>,
}

impl Invoker {
    pub fn new(ctx: ArmContext, arm: Arc<ArmClient>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { ctx, arm, tokens }
    }

    /// Invokes the operation and returns the proxied response as JSON text,
    /// or an error text flagged as such. Errors never propagate.
    pub async fn invoke_tool(
        &self,
        connection: &ConnectionInfo,
        operation: &ParsedOperation,
        params: &Map<String, Value>,
    ) -> (String, bool) {
        match self.invoke(connection, operation, params).await {
            Ok(text) => (text, false),
            Err(err) => (
                format!(
                    "Error invoking {}/{}: {}",
                    connection.api_name, operation.operation_id, err
                ),
                true,
            ),
        }
    }

    async fn invoke(
        &self,
        connection: &ConnectionInfo,
        operation: &ParsedOperation,
        params: &Map<String, Value>,
    ) -> azcon_arm::Result<String> {
        let token = self.tokens.acquire().await?;
        let envelope = build_envelope(operation, params);
        debug!(
            connection = %connection.name,
            operation = %operation.operation_id,
            "invoking connector operation"
        );

        let result =
            endpoints::dynamic_invoke(&self.arm, &self.ctx, &token, &connection.name, envelope)
                .await?;
        let payload = result
            .pointer("/response/body")
            .cloned()
            .unwrap_or(result);
        Ok(serde_json::to_string_pretty(&payload)?)
    }
}
