//! MCP server for Azure API Connections.
//!
//! At startup the server scans the configured resource group, compiles each
//! connected API's Swagger document into typed tools, and proxies
//! invocations through ARM's `dynamicInvoke` endpoint. New connections
//! created through `put_connection` register their tools incrementally and
//! announce themselves with a `tools/list_changed` notification.

pub mod config;
pub mod invoke;
pub mod lifecycle;
pub mod notify;
pub mod registry;
pub mod server;
pub mod tools;

pub use config::{AuthBackend, ServerConfig};
pub use invoke::{build_envelope, Invoker};
pub use lifecycle::{Coordinator, RegistrationSummary};
pub use notify::{ChangeNotifier, NullNotifier, PeerNotifier};
pub use registry::{RegisteredTool, SchemaCache, ToolRegistry};
pub use server::ConnectorServer;
pub use tools::StaticTools;
