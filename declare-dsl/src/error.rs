//! Error types for DeclareLang front-end operations

use crate::lexer::Position;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed character stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Tokenizer error at line {}, column {}: {message}", .position.line, .position.column)]
pub struct TokenizerError {
    pub message: String,
    pub position: Position,
}

impl TokenizerError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Malformed token sequence relative to a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Parse error at line {}, column {}: {message}", .position.line, .position.column)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }
}

/// Rejected identifier or model-name text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Invalid identifier: identifier is empty")]
    Empty,

    #[error("Invalid identifier '{identifier}': must start with a letter")]
    InvalidStart { identifier: String },

    #[error("Invalid identifier '{identifier}': longer than {max} characters")]
    TooLong { identifier: String, max: usize },

    #[error("Invalid identifier '{identifier}': character '{character}' is not allowed")]
    InvalidCharacter { identifier: String, character: char },

    #[error("Malformed pluralization in '{raw}': {reason}")]
    MalformedPluralization { raw: String, reason: String },
}

impl IdentifierError {
    /// Attach a source position, producing the parser's diagnostic.
    pub fn at(self, position: Position) -> ParseError {
        ParseError::new(self.to_string(), position)
    }
}

/// Errors raised by the one-call entry points (`parse_schema`, `parse_document`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl DslError {
    pub fn message(&self) -> &str {
        match self {
            DslError::Tokenizer(e) => &e.message,
            DslError::Parse(e) => &e.message,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            DslError::Tokenizer(e) => e.position,
            DslError::Parse(e) => e.position,
        }
    }
}

/// Configuration decoding and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Decode(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Decode(err.to_string())
    }
}

/// Result type alias for the one-call entry points.
pub type DslResult<T> = Result<T, DslError>;

// =============================================================================
// TESTS
// =============================================================================
