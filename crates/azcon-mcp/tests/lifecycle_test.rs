//! End-to-end lifecycle tests against a scripted ARM transport.
//!
//! A routing mock stands in for ARM: it serves a connection list, a managed
//! API document with an embedded Swagger, and a `dynamicInvoke` endpoint
//! that records the envelopes it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azcon_arm::{
    ArmClient, ArmError, ConnectionInfo, ConnectionStatus, HttpRequest, HttpResponse, HttpSend,
    StaticTokenProvider,
};
use azcon_mcp::{ChangeNotifier, Coordinator, Invoker, SchemaCache, ToolRegistry};
use serde_json::{json, Value};

/// Minimal Office 365-shaped Swagger document.
fn office365_swagger() -> Value {
    json!({
        "swagger": "2.0",
        "parameters": {
            "connectionId": {
                "name": "connectionId",
                "in": "path",
                "required": true,
                "type": "string"
            }
        },
        "paths": {
            "/{connectionId}/v2/Mail": {
                "parameters": [{"$ref": "#/parameters/connectionId"}],
                "post": {
                    "operationId": "SendEmail",
                    "summary": "Send an email",
                    "parameters": [{
                        "name": "body",
                        "in": "body",
                        "required": true,
                        "schema": {
                            "type": "object",
                            "required": ["Subject"],
                            "properties": {
                                "Subject": {"type": "string"},
                                "Body": {"type": "string"}
                            }
                        }
                    }],
                    "responses": {"200": {}}
                },
                "get": {
                    "operationId": "GetEmails",
                    "summary": "Get emails",
                    "parameters": [
                        {"name": "$top", "in": "query", "type": "integer"}
                    ],
                    "responses": {"200": {}}
                }
            },
            "/{connectionId}/Mail/Delete": {
                "parameters": [{"$ref": "#/parameters/connectionId"}],
                "delete": {
                    "operationId": "DeleteMessage",
                    "deprecated": true,
                    "x-ms-api-annotation": {"family": "DeleteMessage", "revision": 1},
                    "responses": {"200": {}}
                }
            },
            "/{connectionId}/v2/Mail/Delete": {
                "parameters": [{"$ref": "#/parameters/connectionId"}],
                "delete": {
                    "operationId": "DeleteMessageV2",
                    "x-ms-api-annotation": {"family": "DeleteMessage", "revision": 2},
                    "responses": {"200": {}}
                }
            },
            "/{connectionId}/internal/Probe": {
                "get": {
                    "operationId": "Probe",
                    "x-ms-visibility": "internal",
                    "responses": {"200": {}}
                }
            },
            "/{connectionId}/trigger/OnNewEmail": {
                "get": {
                    "operationId": "OnNewEmail",
                    "x-ms-trigger": "batch",
                    "responses": {"200": {}}
                }
            }
        }
    })
}

fn connection_resource() -> Value {
    json!({
        "name": "office365",
        "properties": {
            "displayName": "Office 365 Outlook",
            "api": {
                "id": "/subscriptions/s/providers/Microsoft.Web/locations/westus/managedApis/office365",
                "name": "office365"
            },
            "statuses": [{"status": "Connected"}]
        }
    })
}

/// Routes requests by URL shape and counts traffic per route.
struct ArmFake {
    managed_api_fetches: AtomicUsize,
    invocations: Mutex<Vec<Value>>,
}

impl ArmFake {
    fn new() -> Self {
        Self {
            managed_api_fetches: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Default::default(),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }
}

#[async_trait]
impl HttpSend for ArmFake {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ArmError> {
        let url = &request.url;
        if url.contains("/dynamicInvoke") {
            let envelope: Value = serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
            self.invocations.lock().unwrap().push(envelope);
            return Ok(Self::ok(json!({
                "response": {"statusCode": 200, "body": {"Id": "msg-1"}}
            })));
        }
        if url.contains("/managedApis/office365") {
            self.managed_api_fetches.fetch_add(1, Ordering::SeqCst);
            return Ok(Self::ok(json!({
                "name": "office365",
                "properties": {"swagger": office365_swagger()}
            })));
        }
        if url.contains("/providers/Microsoft.Web/connections") {
            return Ok(Self::ok(json!({"value": [connection_resource()]})));
        }
        Ok(HttpResponse {
            status: 404,
            headers: Default::default(),
            body: br#"{"error":{"code":"NotFound","message":"no route"}}"#.to_vec(),
        })
    }
}

struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChangeNotifier for CountingNotifier {
    async fn tools_list_changed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    fake: Arc<ArmFake>,
    registry: Arc<ToolRegistry>,
    cache: Arc<SchemaCache>,
    coordinator: Coordinator,
    invoker: Invoker,
}

fn harness() -> Harness {
    let fake = Arc::new(ArmFake::new());
    let arm = Arc::new(ArmClient::new(fake.clone()));
    let ctx = azcon_arm::ArmContext::new("sub", "rg", "westus").unwrap();
    let tokens = Arc::new(StaticTokenProvider::new("token"));
    let registry = Arc::new(ToolRegistry::new());
    let cache = Arc::new(SchemaCache::new());
    let coordinator = Coordinator::new(
        ctx.clone(),
        arm.clone(),
        tokens.clone(),
        registry.clone(),
        cache.clone(),
    );
    let invoker = Invoker::new(ctx, arm, tokens);
    Harness {
        fake,
        registry,
        cache,
        coordinator,
        invoker,
    }
}

fn office365_connection() -> ConnectionInfo {
    ConnectionInfo::from_resource(&connection_resource()).unwrap()
}

#[tokio::test]
async fn startup_scan_registers_filtered_tools() {
    let h = harness();
    let summary = h.coordinator.startup_scan().await;

    assert_eq!(summary.registered, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.errors, 0);

    let names: Vec<String> = h.registry.snapshot().into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec![
            "office365_get_emails",
            "office365_send_email",
            "office365_delete_message_v2",
        ]
    );

    // Internal, trigger, and superseded-revision operations never surface.
    assert!(h.registry.get("office365_probe").is_none());
    assert!(h.registry.get("office365_on_new_email").is_none());
    assert!(h.registry.get("office365_delete_message").is_none());
}

#[tokio::test]
async fn incremental_registration_is_idempotent() {
    let h = harness();
    let notifier = CountingNotifier::new();
    let connection = office365_connection();

    let first = h
        .coordinator
        .register_api(&connection, &notifier)
        .await
        .expect("first registration runs");
    assert!(first.registered > 0);
    assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
    assert_eq!(h.fake.managed_api_fetches.load(Ordering::SeqCst), 1);
    let size = h.registry.len();

    // Second registration short-circuits: no fetch, no notification.
    let second = h.coordinator.register_api(&connection, &notifier).await;
    assert!(second.is_none());
    assert_eq!(h.registry.len(), size);
    assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
    assert_eq!(h.fake.managed_api_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_is_additive_and_clears_only_cache() {
    let h = harness();
    h.coordinator.startup_scan().await;
    assert_eq!(h.cache.len(), 1);
    let size = h.registry.len();

    let summary = h.coordinator.refresh().await;

    // The cache was dropped, forcing a refetch; existing tools collide.
    assert_eq!(h.fake.managed_api_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(summary.registered, 0);
    assert_eq!(summary.skipped, size);
    assert_eq!(h.registry.len(), size);
}

#[tokio::test]
async fn invoke_builds_envelope_and_decodes_response() {
    let h = harness();
    h.coordinator.startup_scan().await;

    let tool = h.registry.get("office365_send_email").unwrap();
    let args = json!({"Subject": "Hello", "Body": "World"});
    let (text, is_error) = h
        .invoker
        .invoke_tool(
            &tool.connection,
            &tool.operation,
            args.as_object().unwrap(),
        )
        .await;

    assert!(!is_error, "unexpected error result: {text}");
    let decoded: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, json!({"Id": "msg-1"}));

    let invocations = h.fake.invocations.lock().unwrap();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations[0],
        json!({
            "request": {
                "method": "POST",
                "path": "/v2/Mail",
                "headers": {"Content-Type": "application/json"},
                "body": {"Subject": "Hello", "Body": "World"}
            }
        })
    );
}

#[tokio::test]
async fn connection_status_flag_reaches_descriptions() {
    let h = harness();
    let mut connection = office365_connection();
    connection.status = ConnectionStatus::Unauthenticated;

    let notifier = CountingNotifier::new();
    h.coordinator.register_api(&connection, &notifier).await;

    let tool = h.registry.get("office365_send_email").unwrap();
    assert!(tool
        .description
        .ends_with("⚠️ Connection not authenticated"));
}
