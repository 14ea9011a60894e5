//! Logging and audit AST.

use super::common::{Spanned, TimeAmount};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `log.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogAst {
    pub logs: Vec<LogDefinition>,
    pub audits: Vec<AuditDefinition>,
    pub levels: Vec<LogLevelDefinition>,
    pub exclude: Option<ExcludeDefinition>,
}

/// `Log for <Model>:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDefinition {
    pub model_name: String,
    pub items: Vec<Spanned<LogItem>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogItem {
    /// `- created and updated with full data`
    Action {
        actions: Vec<String>,
        detail: LogDetail,
    },
    /// `- failed login attempts`
    Event { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogDetail {
    FullData,
    ChangedFieldsOnly,
    Fields { fields: Vec<String>, only: bool },
}

/// `Audit for <Model>:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDefinition {
    pub model_name: String,
    pub items: Vec<Spanned<LogItem>>,
    /// `- retain for N <unit>`, at most once per section.
    pub retention: Option<TimeAmount>,
    pub span: Span,
}

/// `Log level <level> for:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLevelDefinition {
    pub level: LogLevel,
    pub targets: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// The singleton `Exclude:` section: fields never written to logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludeDefinition {
    pub fields: Vec<String>,
    pub span: Span,
}
