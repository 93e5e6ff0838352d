//! The ARM request pipeline.
//!
//! Every call carries a fresh correlation id that is reused across retries,
//! so ARM-side traces aggregate per logical request. Transient failures
//! (429, 5xx, transport errors) are retried with exponential backoff and
//! jitter; everything else surfaces immediately with the shaped envelope.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ArmError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpSend};

/// ARM control-plane base URL.
pub const ARM_BASE_URL: &str = "https://management.azure.com";

/// Default `api-version` for Microsoft.Web connection resources.
pub const DEFAULT_API_VERSION: &str = "2016-06-01";

/// `listConsentLinks` requires the preview surface.
pub const CONSENT_LINK_API_VERSION: &str = "2018-07-01-preview";

/// Additional attempts after the first (4 attempts total).
const MAX_RETRIES: u32 = 3;

/// Optional knobs for a single ARM request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides [`DEFAULT_API_VERSION`].
    pub api_version: Option<String>,
    /// Extra query parameters beyond `api-version`.
    pub query: Vec<(String, String)>,
    /// JSON body. Only serialized for PUT and POST.
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Client for the ARM control plane.
///
/// Tokens are passed per call and never stored, so rotated credentials are
/// picked up by whichever provider the caller consults.
pub struct ArmClient {
    sender: Arc<dyn HttpSend>,
    base_url: String,
    user_agent: Option<String>,
}

impl ArmClient {
    pub fn new(sender: Arc<dyn HttpSend>) -> Self {
        Self {
            sender,
            base_url: ARM_BASE_URL.to_string(),
            user_agent: None,
        }
    }

    /// Sets the `User-Agent` header sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Issues one logical ARM request, retrying transient failures.
    ///
    /// Returns the decoded JSON body; empty successful bodies decode to `{}`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.build_url(path, &options)?;
        let body = encode_body(&method, &options);

        let mut attempt: u32 = 0;
        loop {
            let request = self.build_request(&method, &url, token, &correlation_id, body.clone());
            debug!(
                method = %method,
                url = %url,
                correlation_id = %correlation_id,
                attempt,
                "sending ARM request"
            );

            match self.sender.send(request).await {
                Ok(response) if response.is_success() => {
                    return decode_body(&response.body);
                }
                Ok(response) => {
                    if retryable_status(response.status) && attempt < MAX_RETRIES {
                        let delay = retry_delay(attempt + 1, response.retry_after_secs());
                        warn!(
                            status = response.status,
                            correlation_id = %correlation_id,
                            delay_ms = delay.as_millis() as u64,
                            "transient ARM failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(shape_error(&response));
                }
                Err(err) => {
                    let transport = matches!(err, ArmError::Transport(_));
                    if transport && attempt < MAX_RETRIES {
                        let delay = retry_delay(attempt + 1, None);
                        warn!(
                            error = %err,
                            correlation_id = %correlation_id,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    fn build_url(&self, path: &str, options: &RequestOptions) -> Result<String> {
        let mut url = url::Url::parse(&format!("{}{}", self.base_url, path))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(
                "api-version",
                options.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION),
            );
            for (name, value) in &options.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url.into())
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        token: &str,
        correlation_id: &str,
        body: Option<Vec<u8>>,
    ) -> HttpRequest {
        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "x-ms-correlation-request-id".to_string(),
                correlation_id.to_string(),
            ),
        ];
        if let Some(agent) = &self.user_agent {
            headers.push(("User-Agent".to_string(), agent.clone()));
        }
        HttpRequest {
            method: method.clone(),
            url: url.to_string(),
            headers,
            body,
        }
    }
}

/// Bodies ride only on PUT and POST; ARM rejects payloads elsewhere.
fn encode_body(method: &Method, options: &RequestOptions) -> Option<Vec<u8>> {
    if *method != Method::PUT && *method != Method::POST {
        return None;
    }
    options
        .body
        .as_ref()
        .map(|body| serde_json::to_vec(body).unwrap_or_default())
}

fn decode_body(body: &[u8]) -> Result<Value> {
    if body.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_slice(body)?)
}

fn retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn shape_error(response: &HttpResponse) -> ArmError {
    ArmError::from_response(response.status, &response.body)
}

/// `Retry-After` wins when present; otherwise `2^attempt` seconds plus
/// uniform jitter in `[0, 1)`.
fn retry_delay(attempt: u32, retry_after: Option<u64>) -> Duration {
    match retry_after {
        Some(secs) => Duration::from_secs(secs),
        None => {
            let base = 2u64.saturating_pow(attempt) as f64;
            Duration::from_secs_f64(base + rand::thread_rng().gen::<f64>())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted transport: pops responses in order and records requests.
    struct ScriptedSender {
        responses: Mutex<Vec<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedSender {
        fn new(responses: Vec<Result<HttpResponse>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpSend for ScriptedSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ArmError::Transport("script exhausted".into())))
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn client(sender: Arc<ScriptedSender>) -> ArmClient {
        ArmClient::new(sender)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_succeed() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Ok(response(429, "")),
            Ok(response(200, r#"{"ok":true}"#)),
        ]));
        let result = client(sender.clone())
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(sender.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_attempts_on_persistent_500() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Ok(response(500, "")),
            Ok(response(500, "")),
            Ok(response(500, "")),
            Ok(response(500, "")),
        ]));
        let err = client(sender.clone())
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(sender.requests().len(), 4);
        assert!(matches!(err, ArmError::Api { status: 500, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_400_surfaces_without_retry() {
        let sender = Arc::new(ScriptedSender::new(vec![Ok(response(
            400,
            r#"{"error":{"code":"InvalidParameter","message":"bad"}}"#,
        ))]));
        let err = client(sender.clone())
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(sender.requests().len(), 1);
        match err {
            ArmError::Api {
                code,
                message,
                status,
            } => {
                assert_eq!(code, "InvalidParameter");
                assert_eq!(message, "bad");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_correlation_id_stable_across_retries() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Ok(response(503, "")),
            Ok(response(503, "")),
            Ok(response(200, "{}")),
        ]));
        client(sender.clone())
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap();

        let ids: Vec<String> = sender
            .requests()
            .iter()
            .map(|r| {
                r.headers
                    .iter()
                    .find(|(n, _)| n == "x-ms-correlation-request-id")
                    .map(|(_, v)| v.clone())
                    .expect("correlation header present")
            })
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert!(Uuid::parse_str(&ids[0]).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_never_carries_body() {
        let sender = Arc::new(ScriptedSender::new(vec![Ok(response(200, "{}"))]));
        client(sender.clone())
            .request(
                Method::GET,
                "/s/x",
                "t",
                RequestOptions::default().with_body(serde_json::json!({"x": 1})),
            )
            .await
            .unwrap();
        assert!(sender.requests()[0].body.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_carries_body() {
        let sender = Arc::new(ScriptedSender::new(vec![Ok(response(200, "{}"))]));
        client(sender.clone())
            .request(
                Method::PUT,
                "/s/x",
                "t",
                RequestOptions::default().with_body(serde_json::json!({"x": 1})),
            )
            .await
            .unwrap();
        let body = sender.requests()[0].body.clone().unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            serde_json::json!({"x": 1})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_success_body_decodes_to_empty_object() {
        let sender = Arc::new(ScriptedSender::new(vec![Ok(response(200, ""))]));
        let result = client(sender)
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(result, Value::Object(serde_json::Map::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_then_surfaced() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Err(ArmError::Transport("connection reset".into())),
            Err(ArmError::Transport("connection reset".into())),
            Err(ArmError::Transport("connection reset".into())),
            Err(ArmError::Transport("connection reset".into())),
        ]));
        let err = client(sender.clone())
            .request(Method::GET, "/s/x", "t", RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(sender.requests().len(), 4);
        assert!(matches!(err, ArmError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_version_and_query_in_url() {
        let sender = Arc::new(ScriptedSender::new(vec![Ok(response(200, "{}"))]));
        client(sender.clone())
            .request(
                Method::GET,
                "/s/x",
                "t",
                RequestOptions::default()
                    .with_api_version(CONSENT_LINK_API_VERSION)
                    .with_query("export", "true"),
            )
            .await
            .unwrap();
        let url = sender.requests()[0].url.clone();
        assert!(url.contains("api-version=2018-07-01-preview"));
        assert!(url.contains("export=true"));
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        assert_eq!(retry_delay(1, Some(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_delay_backoff_with_jitter() {
        let d = retry_delay(2, None).as_secs_f64();
        assert!((4.0..5.0).contains(&d), "delay {d} outside [4, 5)");
        let d = retry_delay(3, None).as_secs_f64();
        assert!((8.0..9.0).contains(&d), "delay {d} outside [8, 9)");
    }
}
