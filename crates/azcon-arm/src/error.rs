//! Error types for the ARM pipeline.

use thiserror::Error;

/// Result type for ARM operations.
pub type Result<T> = std::result::Result<T, ArmError>;

/// Errors that can occur while talking to Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// ARM rejected the request and returned its error envelope.
    #[error("ARM error {code} (status {status}): {message}")]
    Api {
        /// Stable ARM error code, e.g. `AuthorizationFailed`.
        code: String,
        /// Human-readable message from the envelope.
        message: String,
        /// HTTP status of the response.
        status: u16,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Token acquisition failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A response body could not be decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request URL could not be constructed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ArmError {
    /// Shapes a non-OK ARM response into an [`ArmError::Api`].
    ///
    /// ARM ships a stable envelope `{"error":{"code":...,"message":...}}`;
    /// when the body does not parse as that envelope the error is reported
    /// as `UnknownError` with the status code preserved.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let envelope: Option<serde_json::Value> = serde_json::from_slice(body).ok();
        let error = envelope.as_ref().and_then(|v| v.get("error"));
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
            .map(str::to_string);
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string);

        match (code, message) {
            (Some(code), Some(message)) => ArmError::Api {
                code,
                message,
                status,
            },
            _ => ArmError::Api {
                code: "UnknownError".to_string(),
                message: format!("ARM request failed with status {status}"),
                status,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_arm_envelope() {
        let body = br#"{"error":{"code":"InvalidParameter","message":"bad"}}"#;
        let err = ArmError::from_response(400, body);
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

    #[test]
    fn test_unparseable_body_becomes_unknown_error() {
        let err = ArmError::from_response(502, b"<html>bad gateway</html>");
        match err {
            ArmError::Api { code, message, status } => {
                assert_eq!(code, "UnknownError");
                assert_eq!(message, "ARM request failed with status 502");
                assert_eq!(status, 502);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_missing_fields_is_unknown() {
        let err = ArmError::from_response(409, br#"{"error":{"code":"MissingSubscriptionRegistration"}}"#);
        match err {
            ArmError::Api { code, .. } => assert_eq!(code, "UnknownError"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
