//! Authorization AST.

use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `auth.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthAst {
    pub roles: Vec<RoleDefinition>,
    pub model_rules: Vec<ModelRules>,
    pub field_rules: Vec<FieldRules>,
}

impl AuthAst {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.model_rules.is_empty() && self.field_rules.is_empty()
    }
}

/// One entry of the `Roles:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    pub description: Option<String>,
    pub span: Span,
}

/// `<Model>:` followed by permission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRules {
    /// De-pluralized model reference, resolved downstream.
    pub model_name: String,
    pub permissions: Vec<PermissionRule>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub subject: Subject,
    pub actions: Vec<PermissionAction>,
    pub ownership: Option<Ownership>,
    /// What the rule applies to, when named (`their posts`, `comments`).
    pub target: Option<String>,
    pub span: Span,
}

/// Who a rule grants permissions to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    Anyone,
    AuthenticatedUsers,
    Users,
    Role { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionAction {
    Read,
    Create,
    Update,
    Delete,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ownership {
    Own,
    Any,
}

/// `Fields for <Model>:` followed by per-field permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRules {
    pub model_name: String,
    pub permissions: Vec<FieldPermission>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPermission {
    pub subject: Subject,
    pub actions: Vec<PermissionAction>,
    pub ownership: Option<Ownership>,
    /// Normalized field name.
    pub field: String,
    /// Rule began with `only`: nobody else gets these actions.
    pub exclusive: bool,
    pub span: Span,
}
