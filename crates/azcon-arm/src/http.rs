//! HTTP transport seam.
//!
//! The ARM client never talks to the network directly; it hands a fully
//! assembled [`HttpRequest`] to an [`HttpSend`] implementation. Production
//! uses [`ReqwestSender`]; tests script responses through mock senders.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{ArmError, Result};

/// Per-attempt client timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully assembled outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Header name/value pairs, already in wire form.
    pub headers: Vec<(String, String)>,
    /// JSON-encoded body, present only for PUT and POST.
    pub body: Option<Vec<u8>>,
}

/// A decoded inbound response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Retry-After` in whole seconds, when present and parseable.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Transport abstraction under the ARM client.
#[async_trait]
pub trait HttpSend: Send + Sync {
    /// Performs one HTTP attempt. Failures below the HTTP layer surface as
    /// [`ArmError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production transport backed by a shared `reqwest` client.
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { client }
    }
}

impl Default for ReqwestSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpSend for ReqwestSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ArmError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ArmError::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HashMap::new();
        headers.insert("retry-after".to_string(), "7".to_string());
        let resp = HttpResponse {
            status: 429,
            headers,
            body: Vec::new(),
        };
        assert_eq!(resp.retry_after_secs(), Some(7));

        let resp = HttpResponse {
            status: 429,
            headers: HashMap::from([("retry-after".to_string(), "soon".to_string())]),
            body: Vec::new(),
        };
        assert_eq!(resp.retry_after_secs(), None);
    }

    #[test]
    fn test_success_range() {
        let ok = HttpResponse {
            status: 204,
            headers: HashMap::new(),
            body: Vec::new(),
        };
        assert!(ok.is_success());
        let not_ok = HttpResponse {
            status: 301,
            headers: HashMap::new(),
            body: Vec::new(),
        };
        assert!(!not_ok.is_success());
    }
}
