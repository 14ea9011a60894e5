//! API configuration AST.
//!
//! Model-scoped sections repeat and are kept as separate entries. Global
//! sections are singletons: a repeated header appends to the existing one.

use super::common::{Spanned, TimeAmount, TimeUnit};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `api.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiAst {
    pub rate_limits: Vec<RateLimitSection>,
    pub cors: Option<CorsConfig>,
    pub pagination: Vec<PaginationSection>,
    pub query_parameters: Vec<QueryParameterSection>,
    pub response: Option<ResponseConfig>,
    pub security_headers: Option<SecurityHeadersConfig>,
    pub compression: Option<CompressionConfig>,
    pub size_limits: Option<SizeLimitsConfig>,
}

// ============================================================================
// RATE LIMITS
// ============================================================================

/// `Rate limit [for <Model>]:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSection {
    /// `None` for the global section.
    pub model_name: Option<String>,
    pub limits: Vec<RateLimit>,
    pub span: Span,
}

/// `- N requests per <unit> [for <scope>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u64,
    pub period: TimeUnit,
    pub scope: Option<String>,
    pub span: Span,
}

// ============================================================================
// CORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    pub rules: Vec<Spanned<CorsRule>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorsRule {
    AllowOrigins { origins: Vec<String> },
    AllowMethods { methods: Vec<HttpMethod> },
    AllowHeaders { headers: Vec<String> },
    AllowCredentials,
    MaxAge { age: TimeAmount },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }
}

// ============================================================================
// PAGINATION AND QUERY PARAMETERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationSection {
    pub model_name: Option<String>,
    pub settings: Vec<Spanned<PaginationSetting>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationSetting {
    DefaultPageSize { size: u64 },
    MaxPageSize { size: u64 },
    Style { style: PaginationStyle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationStyle {
    Cursor,
    Offset,
    Page,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameterSection {
    pub model_name: String,
    pub parameters: Vec<QueryParameter>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub kind: QueryParameterKind,
    pub fields: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryParameterKind {
    Filter,
    Sort,
    Search,
}

// ============================================================================
// RESPONSE SHAPE AND HEADERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub rules: Vec<Spanned<ResponseRule>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseRule {
    Include { field: String },
    Exclude { field: String },
    Format { format: ResponseFormat },
    Envelope { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseFormat {
    Json,
    Xml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityHeadersConfig {
    pub rules: Vec<Spanned<SecurityHeaderRule>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityHeaderRule {
    Enable { header: String },
    Disable { header: String },
    Set { header: String, value: String },
}

// ============================================================================
// COMPRESSION AND SIZE LIMITS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub rules: Vec<Spanned<CompressionRule>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompressionRule {
    Enable { algorithms: Vec<CompressionAlgorithm> },
    MinimumSize { bytes: u64 },
    Level { level: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompressionAlgorithm {
    Gzip,
    Brotli,
    Deflate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeLimitsConfig {
    pub limits: Vec<SizeLimit>,
    pub span: Span,
}

/// `- maximum <target> N <unit>`, stored in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeLimit {
    pub target: String,
    pub bytes: u64,
    pub span: Span,
}
