//! Token providers for the ARM pipeline.
//!
//! The pipeline consults a provider at the head of every ARM operation and
//! never caches the result, so retries that cross a token expiry boundary
//! pick up fresh credentials automatically.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ArmError, Result};

/// Name of the environment variable carrying a raw bearer token.
pub const AUTH_TOKEN_ENV: &str = "ARM_MCP_AUTH_TOKEN";

/// Source of ARM bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquires a token good for `https://management.azure.com`.
    async fn acquire(&self) -> Result<String>;
}

/// Reads a raw token from [`AUTH_TOKEN_ENV`] on every call.
pub struct EnvTokenProvider;

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn acquire(&self) -> Result<String> {
        match std::env::var(AUTH_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(ArmError::Auth(format!(
                "{AUTH_TOKEN_ENV} is not set; export an ARM bearer token or use the CLI backend"
            ))),
        }
    }
}

/// Shells out to the Azure CLI's cached credentials.
pub struct AzureCliTokenProvider;

#[async_trait]
impl TokenProvider for AzureCliTokenProvider {
    async fn acquire(&self) -> Result<String> {
        debug!("acquiring token via az CLI");
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                "https://management.azure.com",
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| ArmError::Auth(format!("failed to run az CLI: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArmError::Auth(format!(
                "az account get-access-token failed: {}",
                stderr.trim()
            )));
        }

        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ArmError::Auth(format!("unexpected az CLI output: {e}")))?;
        parsed
            .get("accessToken")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| ArmError::Auth("az CLI output missing accessToken".into()))
    }
}

/// Fixed token, for tests and short-lived sessions.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_token() {
        let provider = StaticTokenProvider::new("tok-123");
        assert_eq!(provider.acquire().await.unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn test_env_provider_reads_current_value() {
        std::env::remove_var(AUTH_TOKEN_ENV);
        let provider = EnvTokenProvider;
        assert!(provider.acquire().await.is_err());

        std::env::set_var(AUTH_TOKEN_ENV, "from-env");
        assert_eq!(provider.acquire().await.unwrap(), "from-env");
        std::env::remove_var(AUTH_TOKEN_ENV);
    }
}
