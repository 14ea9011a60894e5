//! Schema (DDL) AST.

use super::common::{LiteralValue, ModelName};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `ddl.dsl` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAst {
    pub models: Vec<Model>,
}

impl SchemaAst {
    /// Find a model by its singular or plural name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models
            .iter()
            .find(|m| m.name.singular == name || m.name.plural == name)
    }
}

/// A model declaration. Always holds at least one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: ModelName,
    pub items: Vec<ModelItem>,
    pub span: Span,
}

impl Model {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.items.iter().filter_map(|item| match item {
            ModelItem::Field(field) => Some(field),
            ModelItem::Relationship(_) => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter().filter_map(|item| match item {
            ModelItem::Relationship(rel) => Some(rel),
            ModelItem::Field(_) => None,
        })
    }
}

/// One dash item of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelItem {
    Field(Field),
    Relationship(Relationship),
}

impl ModelItem {
    pub fn span(&self) -> Span {
        match self {
            ModelItem::Field(f) => f.span,
            ModelItem::Relationship(r) => r.span,
        }
    }
}

/// `has <name> as <type and constraints>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// Constraints in source order, each at most once.
    pub constraints: Vec<FieldConstraint>,
    pub default: Option<DefaultValue>,
    pub span: Span,
}

impl Field {
    pub fn has_constraint(&self, constraint: FieldConstraint) -> bool {
        self.constraints.contains(&constraint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Number,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Email,
    Url,
    Json,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldConstraint {
    Unique,
    Required,
    Optional,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefaultValue {
    Literal { value: LiteralValue },
    Now,
}

/// `has many X` / `belongs to X`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub target: ModelName,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    HasMany,
    BelongsTo,
}
