use std::sync::Arc;

use anyhow::Result;
use azcon_arm::{ArmClient, ReqwestSender};
use azcon_mcp::{ConnectorServer, Coordinator, Invoker, SchemaCache, ServerConfig, StaticTools, ToolRegistry};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// Logging goes to stderr; stdout belongs to the JSON-RPC stream.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::info!("starting azure-connectors-mcp");

    let config = ServerConfig::from_env()?;
    let ctx = config.arm_context()?;
    let tokens = config.token_provider();
    let arm = Arc::new(
        ArmClient::new(Arc::new(ReqwestSender::new())).with_user_agent(format!(
            "azure-connectors-mcp/{}",
            env!("CARGO_PKG_VERSION")
        )),
    );

    let registry = Arc::new(ToolRegistry::new());
    let cache = Arc::new(SchemaCache::new());
    let coordinator = Arc::new(Coordinator::new(
        ctx.clone(),
        arm.clone(),
        tokens.clone(),
        registry.clone(),
        cache.clone(),
    ));

    // A failed scan still leaves the static tools usable; refresh_tools can
    // retry once credentials or connectivity recover.
    let summary = coordinator.startup_scan().await;
    tracing::info!(%summary, tools = registry.len(), "startup scan finished");

    let invoker = Invoker::new(ctx.clone(), arm.clone(), tokens.clone());
    let static_tools = StaticTools::new(ctx, arm, tokens, registry.clone(), coordinator);
    let server = ConnectorServer::new(registry, invoker, static_tools);

    let service = server.serve(stdio()).await?;
    tracing::info!("stdio transport connected");
    service.waiting().await?;
    tracing::info!("server stopped");
    Ok(())
}
