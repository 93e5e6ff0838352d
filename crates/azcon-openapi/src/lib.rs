//! Swagger 2.0 operation compiler.
//!
//! Turns a connector's Swagger document into a filtered list of
//! [`ParsedOperation`]s and, per operation, a typed input schema the tool
//! layer can validate client arguments against.

pub mod error;
pub mod filter;
pub mod naming;
pub mod parser;
pub mod schema;
pub mod types;
pub mod validate;

// Re-exports
pub use error::{OpenApiError, Result};
pub use filter::filter_operations;
pub use naming::{api_prefix, sanitize_key, tool_name};
pub use parser::parse_document;
pub use schema::{generate_input_schema, InputSchema, ParamKind, ParamSpec};
pub use types::{
    ApiAnnotation, BodyProperty, DynamicValues, HttpMethod, ParameterLocation, ParsedOperation,
    ParsedParameter, RequestBody, SchemaType, Visibility,
};
pub use validate::validate_args;
