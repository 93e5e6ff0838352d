//! Typed wrappers over the ARM endpoints the server uses.

use reqwest::Method;
use serde_json::{json, Value};

use crate::client::{ArmClient, RequestOptions, CONSENT_LINK_API_VERSION};
use crate::connection::ConnectionInfo;
use crate::context::ArmContext;
use crate::error::Result;

/// Redirect target baked into consent links.
pub const CONSENT_REDIRECT_URL: &str = "http://localhost:8080";

/// Lists the managed-API catalog for a region.
pub async fn list_managed_apis(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
    location: &str,
) -> Result<Value> {
    client
        .request(
            Method::GET,
            &ctx.managed_apis_path_at(location),
            token,
            RequestOptions::default(),
        )
        .await
}

/// Fetches one managed API with its embedded Swagger document.
pub async fn get_managed_api(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
    api_name: &str,
) -> Result<Value> {
    client
        .request(
            Method::GET,
            &ctx.managed_api_id(api_name),
            token,
            RequestOptions::default().with_query("export", "true"),
        )
        .await
}

/// Lists the connections in the target resource group.
pub async fn list_connections(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
) -> Result<Vec<ConnectionInfo>> {
    let body = client
        .request(
            Method::GET,
            &format!(
                "{}/providers/Microsoft.Web/connections",
                ctx.resource_group_path()
            ),
            token,
            RequestOptions::default(),
        )
        .await?;

    let mut connections = Vec::new();
    if let Some(items) = body.get("value").and_then(|v| v.as_array()) {
        for item in items {
            match ConnectionInfo::from_resource(item) {
                Ok(info) => connections.push(info),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable connection resource")
                }
            }
        }
    }
    Ok(connections)
}

/// Creates or updates a connection resource. Returns the raw ARM response.
pub async fn put_connection(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
    connection_name: &str,
    managed_api_name: &str,
    display_name: &str,
    parameter_values: Option<Value>,
    location: Option<&str>,
) -> Result<Value> {
    let mut properties = json!({
        "displayName": display_name,
        "api": { "id": ctx.managed_api_id(managed_api_name) },
    });
    if let Some(values) = parameter_values {
        properties["parameterValues"] = values;
    }
    let body = json!({
        "location": location.unwrap_or(&ctx.location),
        "properties": properties,
    });

    client
        .request(
            Method::PUT,
            &ctx.connection_path(connection_name),
            token,
            RequestOptions::default().with_body(body),
        )
        .await
}

/// Requests an OAuth consent link for a connection.
pub async fn list_consent_links(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
    connection_name: &str,
    object_id: &str,
    tenant_id: &str,
) -> Result<Value> {
    let body = json!({
        "parameters": [{
            "parameterName": "token",
            "redirectUrl": CONSENT_REDIRECT_URL,
            "objectId": object_id,
            "tenantId": tenant_id,
        }]
    });

    client
        .request(
            Method::POST,
            &format!("{}/listConsentLinks", ctx.connection_path(connection_name)),
            token,
            RequestOptions::default()
                .with_api_version(CONSENT_LINK_API_VERSION)
                .with_body(body),
        )
        .await
}

/// Forwards a proxied request to the connector backing a connection.
pub async fn dynamic_invoke(
    client: &ArmClient,
    ctx: &ArmContext,
    token: &str,
    connection_name: &str,
    envelope: Value,
) -> Result<Value> {
    client
        .request(
            Method::POST,
            &format!("{}/dynamicInvoke", ctx.connection_path(connection_name)),
            token,
            RequestOptions::default().with_body(envelope),
        )
        .await
}
