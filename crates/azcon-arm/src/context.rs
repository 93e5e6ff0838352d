//! Process-wide ARM coordinates.

use crate::error::{ArmError, Result};

/// The subscription, resource group, and region every ARM call targets.
///
/// Constructed once at startup and shared by reference for the lifetime of
/// the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmContext {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
}

impl ArmContext {
    /// Creates a context, rejecting empty fields.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self> {
        let ctx = Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            location: location.into(),
        };
        if ctx.subscription_id.is_empty() {
            return Err(ArmError::Auth("subscription id must not be empty".into()));
        }
        if ctx.resource_group.is_empty() {
            return Err(ArmError::Auth("resource group must not be empty".into()));
        }
        if ctx.location.is_empty() {
            return Err(ArmError::Auth("location must not be empty".into()));
        }
        Ok(ctx)
    }

    /// ARM path prefix for resources scoped to the resource group.
    pub fn resource_group_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )
    }

    /// ARM path prefix for the regional managed-API catalog.
    pub fn managed_apis_path(&self) -> String {
        self.managed_apis_path_at(&self.location)
    }

    /// Same as [`managed_apis_path`](Self::managed_apis_path) for an explicit region.
    pub fn managed_apis_path_at(&self, location: &str) -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Web/locations/{}/managedApis",
            self.subscription_id, location
        )
    }

    /// Full ARM resource id of a managed API in this context's region.
    pub fn managed_api_id(&self, api_name: &str) -> String {
        format!("{}/{}", self.managed_apis_path(), api_name)
    }

    /// ARM path of a named connection resource.
    pub fn connection_path(&self, connection_name: &str) -> String {
        format!(
            "{}/providers/Microsoft.Web/connections/{}",
            self.resource_group_path(),
            connection_name
        )
    }
}
