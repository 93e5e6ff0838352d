//! Error types for operation compilation.

use thiserror::Error;

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur while compiling or validating against a Swagger
/// document.
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// The document is structurally unusable (no `paths`, wrong root type).
    #[error("invalid Swagger document: {0}")]
    InvalidDocument(String),

    /// Client arguments failed validation against an input schema.
    #[error("validation error: {0}")]
    Validation(String),

    /// JSON handling error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
