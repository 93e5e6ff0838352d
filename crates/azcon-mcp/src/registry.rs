//! Process-wide tool registry and Swagger document cache.

use std::sync::{Arc, Mutex};

use azcon_arm::ConnectionInfo;
use azcon_openapi::{api_prefix, InputSchema, ParsedOperation};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Everything needed to list and invoke one dynamic tool.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub connection: ConnectionInfo,
    pub operation: ParsedOperation,
    pub schema: InputSchema,
    pub description: String,
}

/// Name-keyed registry of dynamic tools.
///
/// Append-mostly: entries are only removed by [`clear`](Self::clear), and
/// duplicate names are rejected rather than replaced.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<RegisteredTool>>,
    /// Registration order, for deterministic listings.
    order: Mutex<Vec<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tool; returns `false` when the name is already taken.
    pub fn put(&self, name: impl Into<String>, tool: RegisteredTool) -> bool {
        use dashmap::mapref::entry::Entry;

        let name = name.into();
        match self.tools.entry(name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(tool));
                self.order.lock().unwrap().push(name);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(name).map(|entry| entry.clone())
    }

    /// True when any registered tool was compiled from the given API.
    pub fn has_api_prefix(&self, api_name: &str) -> bool {
        let prefix = api_prefix(api_name);
        self.order
            .lock()
            .unwrap()
            .iter()
            .any(|name| name.starts_with(&prefix))
    }

    /// Registration-ordered copy of the registry.
    pub fn snapshot(&self) -> Vec<(String, Arc<RegisteredTool>)> {
        self.order
            .lock()
            .unwrap()
            .iter()
            .filter_map(|name| self.tools.get(name).map(|t| (name.clone(), t.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Removes every tool. Only the refresh flow may call this.
    pub fn clear(&self) {
        self.tools.clear();
        self.order.lock().unwrap().clear();
        debug!("tool registry cleared");
    }
}

/// Cache of raw Swagger documents, keyed by managed-API name.
#[derive(Default)]
pub struct SchemaCache {
    docs: DashMap<String, Value>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, api_name: &str) -> Option<Value> {
        self.docs.get(api_name).map(|doc| doc.clone())
    }

    pub fn put(&self, api_name: impl Into<String>, doc: Value) {
        self.docs.insert(api_name.into(), doc);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn clear(&self) {
        self.docs.clear();
        debug!("schema cache cleared");
    }
}
