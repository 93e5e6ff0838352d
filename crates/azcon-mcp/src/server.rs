//! rmcp server handler.
//!
//! The tool list is assembled at request time from the static definitions
//! plus the registry snapshot, so the `#[tool_router]` macro does not apply;
//! listing and dispatch are implemented by hand. `tools.listChanged` is
//! advertised so clients pick up incremental registrations.

use std::borrow::Cow;
use std::sync::Arc;

use azcon_openapi::{validate_args, InputSchema};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler};
use tracing::{debug, info};

use crate::invoke::Invoker;
use crate::notify::PeerNotifier;
use crate::registry::ToolRegistry;
use crate::tools::{self, StaticTools};

/// The MCP-facing server.
pub struct ConnectorServer {
    registry: Arc<ToolRegistry>,
    invoker: Invoker,
    static_tools: StaticTools,
}

impl ConnectorServer {
    pub fn new(registry: Arc<ToolRegistry>, invoker: Invoker, static_tools: StaticTools) -> Self {
        Self {
            registry,
            invoker,
            static_tools,
        }
    }

    fn tool_definition(name: &str, description: &str, schema: &InputSchema) -> Tool {
        Tool {
            name: Cow::Owned(name.to_string()),
            title: None,
            description: Some(Cow::Owned(description.to_string())),
            input_schema: Arc::new(schema.to_json_schema()),
            output_schema: None,
            annotations: None,
            icons: None,
        }
    }
}

impl ServerHandler for ConnectorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "azure-connectors-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Create connections with put_connection, authorize them via \
                 get_consent_link, then call the per-connector tools that appear."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let mut listed = Vec::new();
        for (name, description, schema) in tools::definitions() {
            listed.push(Self::tool_definition(name, &description, &schema));
        }
        for (name, tool) in self.registry.snapshot() {
            listed.push(Self::tool_definition(&name, &tool.description, &tool.schema));
        }
        info!(count = listed.len(), "listing tools");
        Ok(ListToolsResult {
            tools: listed,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name.as_ref();
        debug!(tool = %name, "tool call received");

        if let Some((_, _, schema)) = tools::definitions()
            .into_iter()
            .find(|(candidate, _, _)| *candidate == name)
        {
            let args = validate_args(&schema, request.arguments.as_ref())
                .map_err(|err| ErrorData::invalid_params(err.to_string(), None))?;
            let notifier = PeerNotifier::new(context.peer.clone());
            let (text, is_error) = self
                .static_tools
                .call(name, &args, &notifier)
                .await
                .expect("name matched a static definition");
            return Ok(tool_result(text, is_error));
        }

        let Some(tool) = self.registry.get(name) else {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool '{name}'"),
                None,
            ));
        };
        let args = validate_args(&tool.schema, request.arguments.as_ref())
            .map_err(|err| ErrorData::invalid_params(err.to_string(), None))?;
        let (text, is_error) = self
            .invoker
            .invoke_tool(&tool.connection, &tool.operation, &args)
            .await;
        Ok(tool_result(text, is_error))
    }
}

fn tool_result(text: String, is_error: bool) -> CallToolResult {
    if is_error {
        CallToolResult::error(vec![Content::text(text)])
    } else {
        CallToolResult::success(vec![Content::text(text)])
    }
}
