//! Tool lifecycle coordination.
//!
//! Three entry points: the startup scan over every connection in the
//! resource group, incremental registration for a freshly provisioned
//! connection, and the additive refresh behind the `refresh_tools` tool.
//! Failures are contained per connection; one broken API never prevents the
//! others from registering.

use std::fmt;
use std::sync::Arc;

use azcon_arm::{endpoints, ArmClient, ArmContext, ConnectionInfo, ConnectionStatus, TokenProvider};
use azcon_openapi::{filter_operations, generate_input_schema, parse_document, tool_name, ParsedOperation};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::notify::ChangeNotifier;
use crate::registry::{RegisteredTool, SchemaCache, ToolRegistry};

/// Tally of one registration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    pub registered: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RegistrationSummary {
    pub fn merge(&mut self, other: RegistrationSummary) {
        self.registered += other.registered;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }

    fn error() -> Self {
        Self {
            errors: 1,
            ..Self::default()
        }
    }
}

impl fmt::Display for RegistrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "registered {} new tool(s), skipped {} duplicate(s), {} error(s)",
            self.registered, self.skipped, self.errors
        )
    }
}

/// Drives compilation and registration of dynamic tools.
pub struct Coordinator {
    ctx: ArmContext,
    arm: Arc<ArmClient>,
    tokens: Arc<dyn TokenProvider>,
    registry: Arc<ToolRegistry>,
    cache: Arc<SchemaCache>,
}

impl Coordinator {
    pub fn new(
        ctx: ArmContext,
        arm: Arc<ArmClient>,
        tokens: Arc<dyn TokenProvider>,
        registry: Arc<ToolRegistry>,
        cache: Arc<SchemaCache>,
    ) -> Self {
        Self {
            ctx,
            arm,
            tokens,
            registry,
            cache,
        }
    }

    /// Scans every connection in the resource group and registers its tools.
    pub async fn startup_scan(&self) -> RegistrationSummary {
        let token = match self.tokens.acquire().await {
            Ok(token) => token,
            Err(err) => {
                error!(error = %err, "token acquisition failed, skipping scan");
                return RegistrationSummary::error();
            }
        };

        let connections = match endpoints::list_connections(&self.arm, &self.ctx, &token).await {
            Ok(connections) => connections,
            Err(err) => {
                error!(error = %err, "failed to list connections");
                return RegistrationSummary::error();
            }
        };
        info!(count = connections.len(), "scanning connections");

        let mut summary = RegistrationSummary::default();
        for connection in &connections {
            summary.merge(self.register_connection(connection, &token).await);
        }
        info!(%summary, "scan complete");
        summary
    }

    /// Registers tools for one new connection, called after a successful
    /// `put_connection`.
    ///
    /// Returns `None` when tools for the API already exist (the compilation
    /// is skipped entirely). Emits at most one `tools/list_changed`
    /// notification, and only when the registry actually grew.
    pub async fn register_api(
        &self,
        connection: &ConnectionInfo,
        notifier: &dyn ChangeNotifier,
    ) -> Option<RegistrationSummary> {
        if self.registry.has_api_prefix(&connection.api_name) {
            debug!(
                api = %connection.api_name,
                "tools already registered, skipping incremental registration"
            );
            return None;
        }

        let token = match self.tokens.acquire().await {
            Ok(token) => token,
            Err(err) => {
                error!(error = %err, "token acquisition failed");
                return Some(RegistrationSummary::error());
            }
        };

        let summary = self.register_connection(connection, &token).await;
        if summary.registered > 0 {
            notifier.tools_list_changed().await;
        }
        Some(summary)
    }

    /// Clears the schema cache and re-runs the scan.
    ///
    /// The registry is left intact, so the refresh is additive: new APIs
    /// register, existing tools collide by name and count as skipped.
    pub async fn refresh(&self) -> RegistrationSummary {
        self.cache.clear();
        self.startup_scan().await
    }

    /// Compiles and registers every surviving operation of one connection.
    async fn register_connection(
        &self,
        connection: &ConnectionInfo,
        token: &str,
    ) -> RegistrationSummary {
        let swagger = match self.fetch_swagger(&connection.api_name, token).await {
            Ok(Some(swagger)) => swagger,
            Ok(None) => {
                warn!(
                    api = %connection.api_name,
                    "managed API document has no embedded Swagger, skipping"
                );
                return RegistrationSummary::default();
            }
            Err(err) => {
                error!(
                    api = %connection.api_name,
                    error = %err,
                    "failed to fetch managed API document"
                );
                return RegistrationSummary::error();
            }
        };

        let operations = filter_operations(parse_document(&swagger, &connection.api_name));
        let mut summary = RegistrationSummary::default();
        for operation in operations {
            let name = tool_name(&connection.api_name, &operation.operation_id);
            let description = compose_description(connection, &operation);
            let schema = generate_input_schema(&operation);
            let inserted = self.registry.put(
                name.clone(),
                RegisteredTool {
                    connection: connection.clone(),
                    operation,
                    schema,
                    description,
                },
            );
            if inserted {
                summary.registered += 1;
            } else {
                debug!(tool = %name, "tool name already registered, skipping");
                summary.skipped += 1;
            }
        }

        info!(
            api = %connection.api_name,
            connection = %connection.name,
            registered = summary.registered,
            skipped = summary.skipped,
            "connection processed"
        );
        summary
    }

    /// Returns the connection's Swagger document, consulting the cache first.
    ///
    /// `Ok(None)` means the managed API document carried no Swagger; only a
    /// failed fetch is an error.
    async fn fetch_swagger(
        &self,
        api_name: &str,
        token: &str,
    ) -> azcon_arm::Result<Option<Value>> {
        if let Some(cached) = self.cache.get(api_name) {
            debug!(api = %api_name, "swagger cache hit");
            return Ok(Some(cached));
        }

        let document = endpoints::get_managed_api(&self.arm, &self.ctx, token, api_name).await?;
        match document.pointer("/properties/swagger") {
            Some(swagger) if swagger.is_object() => {
                self.cache.put(api_name, swagger.clone());
                Ok(Some(swagger.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// `"[<display name>] <summary-or-description>"`, flagged when the
/// connection still needs consent.
fn compose_description(connection: &ConnectionInfo, operation: &ParsedOperation) -> String {
    let text = operation
        .summary
        .as_deref()
        .or(operation.description.as_deref())
        .unwrap_or(&operation.operation_id);
    let mut description = format!("[{}] {}", connection.display_name, text);
    if connection.status != ConnectionStatus::Connected {
        description.push_str(" ⚠️ Connection not authenticated");
    }
    description
}
