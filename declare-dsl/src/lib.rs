//! DECLARE DSL - Front end for the DeclareLang declarative languages
//!
//! This crate turns the text of the nine DeclareLang files (`ddl.dsl`,
//! `dml.dsl`, `auth.dsl`, `validation.dsl`, `api.dsl`, `monitor.dsl`,
//! `log.dsl`, `seed.dsl`, `security.dsl`) into typed, span-annotated ASTs.
//!
//! Architecture:
//! ```text
//! Source text (one .dsl file)
//!     ↓
//! Lexer (tokens with line/column/offset)
//!     ↓
//! TokenCursor (comments dropped, shared phrase combinators)
//!     ↓
//! Grammar parser (one of nine, fail-fast recursive descent)
//!     ↓
//! AST (serde-serializable, consumed by generators)
//! ```
//!
//! ```
//! let schema = declare_dsl::parse_schema("User[s]:\n- has email as unique email\n").unwrap();
//! assert_eq!(schema.models[0].name.plural, "Users");
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod grammar;
pub mod identifier;
pub mod lexer;
pub mod parser;

// Re-export key types for convenience
pub use ast::*;
pub use config::FrontendConfig;
pub use error::*;
pub use grammar::{parse_document, Grammar};
pub use identifier::{
    depluralize, is_valid_identifier, normalize_identifier, parse_model_name, ModelNameParts,
};
pub use lexer::{tokenize, Lexer, Position, Span, Token, TokenKind};
pub use parser::{
    ApiParser, AuthParser, DmlParser, GrammarParser, LogParser, MonitorParser, SchemaParser,
    SecurityParser, SeedParser, ValidationParser,
};

use grammar::parse_with;

/// Parse a schema (`ddl.dsl`) file with the default limits.
pub fn parse_schema(source: &str) -> DslResult<SchemaAst> {
    parse_with::<SchemaParser>(source, &FrontendConfig::default())
}

/// Parse a data-manipulation (`dml.dsl`) file with the default limits.
pub fn parse_dml(source: &str) -> DslResult<DmlAst> {
    parse_with::<DmlParser>(source, &FrontendConfig::default())
}

/// Parse an authorization (`auth.dsl`) file with the default limits.
pub fn parse_auth(source: &str) -> DslResult<AuthAst> {
    parse_with::<AuthParser>(source, &FrontendConfig::default())
}

/// Parse a validation (`validation.dsl`) file with the default limits.
pub fn parse_validation(source: &str) -> DslResult<ValidationAst> {
    parse_with::<ValidationParser>(source, &FrontendConfig::default())
}

/// Parse an API configuration (`api.dsl`) file with the default limits.
pub fn parse_api(source: &str) -> DslResult<ApiAst> {
    parse_with::<ApiParser>(source, &FrontendConfig::default())
}

/// Parse a monitoring (`monitor.dsl`) file with the default limits.
pub fn parse_monitor(source: &str) -> DslResult<MonitorAst> {
    parse_with::<MonitorParser>(source, &FrontendConfig::default())
}

/// Parse a logging (`log.dsl`) file with the default limits.
pub fn parse_log(source: &str) -> DslResult<LogAst> {
    parse_with::<LogParser>(source, &FrontendConfig::default())
}

/// Parse a seed data (`seed.dsl`) file with the default limits.
pub fn parse_seed(source: &str) -> DslResult<SeedAst> {
    parse_with::<SeedParser>(source, &FrontendConfig::default())
}

/// Parse a security (`security.dsl`) file with the default limits.
pub fn parse_security(source: &str) -> DslResult<SecurityAst> {
    parse_with::<SecurityParser>(source, &FrontendConfig::default())
}
