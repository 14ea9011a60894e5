//! Security constraints AST.
//!
//! Rules are free text. The extracted fields are best-effort readings of the
//! leading words; `description` always keeps the whole line.

use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `security.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecurityAst {
    pub encryption: Vec<EncryptionRule>,
    pub sanitization: Vec<SanitizationRule>,
    pub threats: Vec<ThreatRule>,
    pub requirements: Vec<RequirementRule>,
    pub restrictions: Vec<RestrictionRule>,
}

impl SecurityAst {
    pub fn rule_count(&self) -> usize {
        self.encryption.len()
            + self.sanitization.len()
            + self.threats.len()
            + self.requirements.len()
            + self.restrictions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionRule {
    pub description: String,
    pub field: String,
    pub method: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationRule {
    pub description: String,
    pub field: String,
    pub context: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatRule {
    pub description: String,
    pub threat: String,
    pub scope: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRule {
    pub description: String,
    pub requirement: String,
    pub scope: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionRule {
    pub description: String,
    pub subject: String,
    pub scope: Option<String>,
    pub span: Span,
}
