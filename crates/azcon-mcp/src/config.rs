//! Environment-driven server configuration.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use azcon_arm::{
    ArmContext, AzureCliTokenProvider, EnvTokenProvider, TokenProvider, AUTH_TOKEN_ENV,
};
use tracing::info;

/// Which credential backend feeds the ARM pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBackend {
    /// Raw bearer token from `ARM_MCP_AUTH_TOKEN`.
    EnvToken,
    /// Azure CLI cached credentials (`az account get-access-token`).
    AzureCli,
}

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub auth: AuthBackend,
}

impl ServerConfig {
    /// Reads `AZURE_SUBSCRIPTION_ID`, `AZURE_RESOURCE_GROUP`, and
    /// `AZURE_LOCATION` (default `westus`).
    ///
    /// The auth backend is `EnvToken` when `ARM_MCP_AUTH_TOKEN` is set,
    /// otherwise the Azure CLI.
    pub fn from_env() -> Result<Self> {
        let subscription_id = require_env("AZURE_SUBSCRIPTION_ID")?;
        let resource_group = require_env("AZURE_RESOURCE_GROUP")?;
        let location =
            std::env::var("AZURE_LOCATION").unwrap_or_else(|_| "westus".to_string());

        let has_raw_token = std::env::var(AUTH_TOKEN_ENV)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        let auth = if has_raw_token {
            AuthBackend::EnvToken
        } else {
            AuthBackend::AzureCli
        };
        info!(?auth, %location, "configuration loaded");

        Ok(Self {
            subscription_id,
            resource_group,
            location,
            auth,
        })
    }

    pub fn arm_context(&self) -> Result<ArmContext> {
        Ok(ArmContext::new(
            &self.subscription_id,
            &self.resource_group,
            &self.location,
        )?)
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        match self.auth {
            AuthBackend::EnvToken => Arc::new(EnvTokenProvider),
            AuthBackend::AzureCli => Arc::new(AzureCliTokenProvider),
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{name} must be set, e.g. export {name}=<value>"))
}
