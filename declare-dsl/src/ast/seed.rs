//! Seed data AST.

use super::common::{LiteralValue, ModelName};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `seed.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedAst {
    pub sections: Vec<SeedSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSection {
    pub target: SeedTarget,
    pub items: Vec<SeedItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeedTarget {
    Model { name: ModelName },
    Environment { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeedItem {
    Literal(LiteralSeed),
    Random(RandomSeed),
}

impl SeedItem {
    pub fn span(&self) -> Span {
        match self {
            SeedItem::Literal(seed) => seed.span,
            SeedItem::Random(seed) => seed.span,
        }
    }
}

/// A single concrete record: `- "admin@example.com" with role admin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralSeed {
    pub value: SeedValue,
    pub attributes: Vec<SeedAttribute>,
    /// `for <Model>` override inside an environment section.
    pub model_name: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeedValue {
    String { value: String },
    Email { address: String },
    Identifier { name: String },
}

/// Generated records: `- 10 random posts with title and body for each user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSeed {
    pub count: u64,
    pub model_name: Option<String>,
    /// Fields filled with generated values.
    pub fields: Vec<String>,
    /// Attributes after `with fixed`.
    pub fixed: Vec<SeedAttribute>,
    /// `for each <Model>`: generate `count` records per parent.
    pub per_parent: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAttribute {
    pub field: String,
    pub value: LiteralValue,
    pub span: Span,
}
