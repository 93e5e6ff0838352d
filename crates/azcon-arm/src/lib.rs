//! Azure Resource Manager request pipeline.
//!
//! This crate provides the single chokepoint through which every ARM call
//! flows: URL and header assembly, correlation ids, transient-failure
//! retries, and error-envelope shaping. It also defines the token-provider
//! contract and the typed wrappers for the handful of ARM endpoints the
//! server uses.

pub mod auth;
pub mod client;
pub mod connection;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod http;

// Re-exports
pub use auth::{
    AzureCliTokenProvider, EnvTokenProvider, StaticTokenProvider, TokenProvider, AUTH_TOKEN_ENV,
};
pub use client::{ArmClient, RequestOptions, CONSENT_LINK_API_VERSION, DEFAULT_API_VERSION};
pub use connection::{ConnectionInfo, ConnectionStatus};
pub use context::ArmContext;
pub use error::{ArmError, Result};
pub use http::{HttpRequest, HttpResponse, HttpSend, ReqwestSender};
