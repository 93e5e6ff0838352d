//! Connection resource model.

use serde_json::Value;

use crate::error::{ArmError, Result};

/// Authorization state of a connection, as reported by ARM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Unauthenticated,
    Error,
    Unknown,
}

impl ConnectionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            s if s.eq_ignore_ascii_case("connected") => ConnectionStatus::Connected,
            s if s.eq_ignore_ascii_case("unauthenticated") => ConnectionStatus::Unauthenticated,
            s if s.eq_ignore_ascii_case("error") => ConnectionStatus::Error,
            _ => ConnectionStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Unauthenticated => "Unauthenticated",
            ConnectionStatus::Error => "Error",
            ConnectionStatus::Unknown => "Unknown",
        }
    }
}

/// Projection of a `Microsoft.Web/connections` resource.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection resource name, unique within the resource group.
    pub name: String,
    /// Managed-API identifier, e.g. `office365`.
    pub api_name: String,
    pub display_name: String,
    pub status: ConnectionStatus,
    /// Full ARM resource id of the backing managed API.
    pub api_id: String,
}

impl ConnectionInfo {
    /// Builds a projection from an ARM connection resource.
    ///
    /// The managed-API name is taken from `properties.api.name` when
    /// present, otherwise from the last segment of `properties.api.id`.
    pub fn from_resource(resource: &Value) -> Result<Self> {
        let name = resource
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string();

        let properties = resource.get("properties");
        let api = properties.and_then(|p| p.get("api"));
        let api_id = api
            .and_then(|a| a.get("id"))
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string();
        let api_name = api
            .and_then(|a| a.get("name"))
            .and_then(|n| n.as_str())
            .map(str::to_string)
            .or_else(|| api_id.rsplit('/').next().map(str::to_string))
            .unwrap_or_default();

        if name.is_empty() || api_name.is_empty() {
            return Err(ArmError::Auth(format!(
                "connection resource missing name or api identity: {resource}"
            )));
        }

        let display_name = properties
            .and_then(|p| p.get("displayName"))
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .or_else(|| {
                api.and_then(|a| a.get("displayName"))
                    .and_then(|d| d.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| name.clone());

        let status = properties
            .and_then(|p| p.get("statuses"))
            .and_then(|s| s.as_array())
            .and_then(|s| s.first())
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
            .or_else(|| {
                properties
                    .and_then(|p| p.get("overallStatus"))
                    .and_then(|s| s.as_str())
            })
            .map(ConnectionStatus::parse)
            .unwrap_or(ConnectionStatus::Unknown);

        Ok(Self {
            name,
            api_name,
            display_name,
            status,
            api_id,
        })
    }
}
