//! The static tool surface.
//!
//! Six fixed tools sit alongside the dynamically compiled ones: catalog and
//! connection listing, connection provisioning (which feeds incremental
//! registration), consent links, and the registry meta-tools.

use std::sync::Arc;

use anyhow::{bail, Result};
use azcon_arm::{
    endpoints, ArmClient, ArmContext, ConnectionInfo, ConnectionStatus, TokenProvider,
};
use azcon_openapi::{InputSchema, ParamKind, ParamSpec};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::lifecycle::Coordinator;
use crate::notify::ChangeNotifier;
use crate::registry::ToolRegistry;

pub const LIST_MANAGED_APIS: &str = "list_managed_apis";
pub const PUT_CONNECTION: &str = "put_connection";
pub const LIST_CONNECTIONS: &str = "list_connections";
pub const GET_CONSENT_LINK: &str = "get_consent_link";
pub const LIST_DYNAMIC_TOOLS: &str = "list_dynamic_tools";
pub const REFRESH_TOOLS: &str = "refresh_tools";

fn spec(kind: ParamKind, required: bool, description: &str) -> ParamSpec {
    ParamSpec {
        kind,
        required,
        default: None,
        enum_values: None,
        item_kind: None,
        description: Some(description.to_string()),
    }
}

/// Name, description, and input schema of every static tool.
pub fn definitions() -> Vec<(&'static str, String, InputSchema)> {
    let mut list_apis = InputSchema::new();
    list_apis.insert(
        "location",
        spec(
            ParamKind::String,
            false,
            "Azure region to list the catalog for (defaults to the configured region)",
        ),
    );
    let mut microsoft_only = spec(
        ParamKind::Boolean,
        false,
        "Only list first-party Microsoft connectors",
    );
    microsoft_only.default = Some(json!(true));
    list_apis.insert("microsoftOnly", microsoft_only);

    let mut put_connection = InputSchema::new();
    put_connection.insert(
        "connectionName",
        spec(ParamKind::String, true, "Name for the connection resource"),
    );
    put_connection.insert(
        "managedApiName",
        spec(ParamKind::String, true, "Managed API to connect, e.g. office365"),
    );
    put_connection.insert(
        "displayName",
        spec(ParamKind::String, true, "Human-readable connection name"),
    );
    put_connection.insert(
        "parameterValues",
        spec(
            ParamKind::Object,
            false,
            "Connector-specific connection parameters",
        ),
    );
    put_connection.insert(
        "location",
        spec(
            ParamKind::String,
            false,
            "Azure region for the connection (defaults to the configured region)",
        ),
    );

    let mut consent = InputSchema::new();
    consent.insert(
        "connectionName",
        spec(ParamKind::String, true, "Connection to authorize"),
    );
    consent.insert(
        "objectId",
        spec(ParamKind::String, true, "AAD object id of the consenting user"),
    );
    let mut tenant = spec(ParamKind::String, false, "AAD tenant id");
    tenant.default = Some(json!("common"));
    consent.insert("tenantId", tenant);

    vec![
        (
            LIST_MANAGED_APIS,
            "List the managed API (connector) catalog for a region".to_string(),
            list_apis,
        ),
        (
            PUT_CONNECTION,
            "Create or update an API connection and register its operations as tools"
                .to_string(),
            put_connection,
        ),
        (
            LIST_CONNECTIONS,
            "List API connections in the configured resource group".to_string(),
            InputSchema::new(),
        ),
        (
            GET_CONSENT_LINK,
            "Get an OAuth consent link to authorize a connection".to_string(),
            consent,
        ),
        (
            LIST_DYNAMIC_TOOLS,
            "List the dynamically registered connector tools".to_string(),
            InputSchema::new(),
        ),
        (
            REFRESH_TOOLS,
            "Re-scan connections and register newly available tools".to_string(),
            InputSchema::new(),
        ),
    ]
}

/// Handlers behind the static tool names.
pub struct StaticTools {
    ctx: ArmContext,
    arm: Arc<ArmClient>,
    tokens: Arc<dyn TokenProvider>,
    registry: Arc<ToolRegistry>,
    coordinator: Arc<Coordinator>,
}

impl StaticTools {
    pub fn new(
        ctx: ArmContext,
        arm: Arc<ArmClient>,
        tokens: Arc<dyn TokenProvider>,
        registry: Arc<ToolRegistry>,
        coordinator: Arc<Coordinator>,
    ) -> Self {
        Self {
            ctx,
            arm,
            tokens,
            registry,
            coordinator,
        }
    }

    /// Dispatches a static tool call. `None` means the name is not a static
    /// tool; `Some((text, is_error))` is the finished result.
    pub async fn call(
        &self,
        name: &str,
        args: &Map<String, Value>,
        notifier: &dyn ChangeNotifier,
    ) -> Option<(String, bool)> {
        let result = match name {
            LIST_MANAGED_APIS => self.list_managed_apis(args).await,
            PUT_CONNECTION => self.put_connection(args, notifier).await,
            LIST_CONNECTIONS => self.list_connections().await,
            GET_CONSENT_LINK => self.get_consent_link(args).await,
            LIST_DYNAMIC_TOOLS => Ok(self.list_dynamic_tools()),
            REFRESH_TOOLS => Ok(self.coordinator.refresh().await.to_string()),
            _ => return None,
        };
        Some(match result {
            Ok(text) => (text, false),
            Err(err) => (format!("Error: {err}"), true),
        })
    }

    async fn list_managed_apis(&self, args: &Map<String, Value>) -> Result<String> {
        let location = args
            .get("location")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.ctx.location);
        let microsoft_only = args
            .get("microsoftOnly")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let token = self.tokens.acquire().await?;
        let catalog = endpoints::list_managed_apis(&self.arm, &self.ctx, &token, location).await?;

        let apis: Vec<Value> = catalog
            .get("value")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter(|item| !microsoft_only || is_microsoft_api(item))
                    .map(|item| {
                        json!({
                            "name": item.get("name").cloned().unwrap_or(Value::Null),
                            "displayName": item
                                .pointer("/properties/displayName")
                                .cloned()
                                .unwrap_or(Value::Null),
                            "description": item
                                .pointer("/properties/description")
                                .cloned()
                                .unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(serde_json::to_string_pretty(&Value::Array(apis))?)
    }

    async fn put_connection(
        &self,
        args: &Map<String, Value>,
        notifier: &dyn ChangeNotifier,
    ) -> Result<String> {
        let connection_name = required_str(args, "connectionName")?;
        let managed_api_name = required_str(args, "managedApiName")?;
        let display_name = required_str(args, "displayName")?;
        let parameter_values = args.get("parameterValues").cloned();
        let location = args.get("location").and_then(|v| v.as_str());

        let token = self.tokens.acquire().await?;
        let response = endpoints::put_connection(
            &self.arm,
            &self.ctx,
            &token,
            connection_name,
            managed_api_name,
            display_name,
            parameter_values,
            location,
        )
        .await?;

        let connection = ConnectionInfo::from_resource(&response).unwrap_or_else(|err| {
            warn!(error = %err, "PUT response not projectable, using request arguments");
            ConnectionInfo {
                name: connection_name.to_string(),
                api_name: managed_api_name.to_string(),
                display_name: display_name.to_string(),
                status: ConnectionStatus::Unknown,
                api_id: self.ctx.managed_api_id(managed_api_name),
            }
        });

        let mut payload = response;
        if let Some(summary) = self.coordinator.register_api(&connection, notifier).await {
            if let Value::Object(map) = &mut payload {
                map.insert(
                    "dynamicTools".to_string(),
                    json!({
                        "registered": summary.registered,
                        "skipped": summary.skipped,
                        "errors": summary.errors,
                    }),
                );
            }
        }

        Ok(serde_json::to_string_pretty(&payload)?)
    }

    async fn list_connections(&self) -> Result<String> {
        let token = self.tokens.acquire().await?;
        let connections = endpoints::list_connections(&self.arm, &self.ctx, &token).await?;
        let projected: Vec<Value> = connections
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "apiName": c.api_name,
                    "displayName": c.display_name,
                    "status": c.status.as_str(),
                })
            })
            .collect();
        Ok(serde_json::to_string_pretty(&Value::Array(projected))?)
    }

    async fn get_consent_link(&self, args: &Map<String, Value>) -> Result<String> {
        let connection_name = required_str(args, "connectionName")?;
        let object_id = required_str(args, "objectId")?;
        let tenant_id = args
            .get("tenantId")
            .and_then(|v| v.as_str())
            .unwrap_or("common");

        let token = self.tokens.acquire().await?;
        let links = endpoints::list_consent_links(
            &self.arm,
            &self.ctx,
            &token,
            connection_name,
            object_id,
            tenant_id,
        )
        .await?;
        Ok(serde_json::to_string_pretty(&links)?)
    }

    fn list_dynamic_tools(&self) -> String {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return "No dynamic tools registered.".to_string();
        }
        snapshot
            .iter()
            .map(|(name, tool)| {
                format!(
                    "{name}: [{connection}] {method} {path} - {description}",
                    connection = tool.connection.name,
                    method = tool.operation.method.as_upper(),
                    path = tool.operation.path,
                    description = tool.description,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// First-party connectors publish under Microsoft; marketplace entries
/// carry a distinct metadata source.
fn is_microsoft_api(item: &Value) -> bool {
    item.pointer("/properties/metadata/source")
        .and_then(|s| s.as_str())
        .map(|s| !s.eq_ignore_ascii_case("marketplace"))
        .unwrap_or(true)
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match args.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value),
        None => bail!("missing required argument '{key}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tool_names_are_fixed() {
        let names: Vec<&str> = definitions().iter().map(|(name, _, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "list_managed_apis",
                "put_connection",
                "list_connections",
                "get_consent_link",
                "list_dynamic_tools",
                "refresh_tools",
            ]
        );
    }

    #[test]
    fn test_put_connection_schema_requirements() {
        let defs = definitions();
        let (_, _, schema) = defs.iter().find(|(n, _, _)| *n == PUT_CONNECTION).unwrap();
        assert!(schema.get("connectionName").unwrap().required);
        assert!(schema.get("managedApiName").unwrap().required);
        assert!(schema.get("displayName").unwrap().required);
        assert!(!schema.get("parameterValues").unwrap().required);
        assert!(!schema.get("location").unwrap().required);
    }

    #[test]
    fn test_defaults_declared() {
        let defs = definitions();
        let (_, _, apis) = defs
            .iter()
            .find(|(n, _, _)| *n == LIST_MANAGED_APIS)
            .unwrap();
        assert_eq!(apis.get("microsoftOnly").unwrap().default, Some(json!(true)));

        let (_, _, consent) = defs
            .iter()
            .find(|(n, _, _)| *n == GET_CONSENT_LINK)
            .unwrap();
        assert_eq!(consent.get("tenantId").unwrap().default, Some(json!("common")));
    }

    #[test]
    fn test_required_str() {
        let args = serde_json::json!({"a": "x", "b": ""});
        let args = args.as_object().unwrap();
        assert_eq!(required_str(args, "a").unwrap(), "x");
        assert!(required_str(args, "b").is_err());
        assert!(required_str(args, "missing").is_err());
    }

    #[test]
    fn test_microsoft_filter() {
        assert!(is_microsoft_api(&json!({"properties": {}})));
        assert!(is_microsoft_api(
            &json!({"properties": {"metadata": {"source": "microsoft"}}})
        ));
        assert!(!is_microsoft_api(
            &json!({"properties": {"metadata": {"source": "marketplace"}}})
        ));
    }
}
