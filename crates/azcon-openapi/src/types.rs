//! Data structures produced by the Swagger compiler.

use serde_json::Value;

/// HTTP methods surfaced as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Wire form for the invocation envelope.
    pub fn as_upper(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// `x-ms-visibility` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    None,
    Important,
    Advanced,
    Internal,
}

impl Visibility {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("important") => Visibility::Important,
            Some(s) if s.eq_ignore_ascii_case("advanced") => Visibility::Advanced,
            Some(s) if s.eq_ignore_ascii_case("internal") => Visibility::Internal,
            _ => Visibility::None,
        }
    }
}

/// `x-ms-api-annotation`: groups evolving revisions of one logical action.
#[derive(Debug, Clone, Default)]
pub struct ApiAnnotation {
    pub family: Option<String>,
    pub revision: Option<i64>,
    pub status: Option<String>,
}

/// `x-ms-dynamic-values`: hint that a parameter's values come from another
/// operation. Informational only; carried through to tool descriptions.
#[derive(Debug, Clone)]
pub struct DynamicValues {
    pub operation_id: Option<String>,
    pub value_collection: Option<String>,
    pub value_path: Option<String>,
    pub value_title: Option<String>,
    pub parameters: Option<Value>,
}

/// Where a non-body parameter rides on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            _ => None,
        }
    }
}

/// Declared type of a parameter or flattened body property.
///
/// `JsonText` is the synthetic "string (JSON)" kind: an object whose nested
/// shape was collapsed during flattening. The runtime accepts either a
/// structured value or a JSON-encoded string for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    JsonText,
}

impl SchemaType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("integer") => SchemaType::Integer,
            Some("number") => SchemaType::Number,
            Some("boolean") => SchemaType::Boolean,
            Some("array") => SchemaType::Array,
            Some("object") => SchemaType::Object,
            _ => SchemaType::String,
        }
    }
}

/// A path, query, or header parameter.
#[derive(Debug, Clone)]
pub struct ParsedParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub schema_type: SchemaType,
    pub format: Option<String>,
    pub required: bool,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub dynamic_values: Option<DynamicValues>,
}

/// One flattened request-body property.
#[derive(Debug, Clone)]
pub struct BodyProperty {
    pub name: String,
    pub schema_type: SchemaType,
    pub format: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub visibility: Visibility,
    pub enum_values: Option<Vec<Value>>,
    pub default: Option<Value>,
}

/// The flattened request body of an operation.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub required: bool,
    pub required_fields: Vec<String>,
    /// Properties in document order.
    pub properties: Vec<BodyProperty>,
}

/// Result of compiling one `(path, method)` pair.
#[derive(Debug, Clone)]
pub struct ParsedOperation {
    pub operation_id: String,
    pub method: HttpMethod,
    /// Templated path, beginning with `/{connectionId}`.
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub visibility: Visibility,
    pub is_trigger: bool,
    pub api_annotation: Option<ApiAnnotation>,
    pub parameters: Vec<ParsedParameter>,
    pub request_body: Option<RequestBody>,
    /// Resolved response schema; informational only.
    pub response_schema: Option<Value>,
}

impl ParsedOperation {
    /// Family name, when the operation carries an annotation with one.
    pub fn family(&self) -> Option<&str> {
        self.api_annotation
            .as_ref()
            .and_then(|a| a.family.as_deref())
    }

    /// Revision within the family; missing revisions sort lowest.
    pub fn revision(&self) -> i64 {
        self.api_annotation
            .as_ref()
            .and_then(|a| a.revision)
            .unwrap_or(0)
    }
}
