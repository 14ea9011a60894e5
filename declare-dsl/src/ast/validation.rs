//! Validation AST.

use super::common::{LiteralValue, TimeUnit};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `validation.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationAst {
    pub definitions: Vec<ValidationDefinition>,
}

impl ValidationAst {
    /// All definitions for one model, in source order.
    pub fn for_model<'a>(
        &'a self,
        model_name: &'a str,
    ) -> impl Iterator<Item = &'a ValidationDefinition> + 'a {
        self.definitions
            .iter()
            .filter(move |d| d.model_name == model_name)
    }
}

/// One validation section. Exactly one of the rule lists is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationDefinition {
    pub model_name: String,
    pub rules: Vec<ValidationRule>,
    pub cross_field_rules: Vec<CrossFieldRule>,
    pub rate_limits: Vec<RateLimitRule>,
    pub business_rules: Vec<BusinessRule>,
    pub span: Span,
}

impl ValidationDefinition {
    pub fn new(model_name: String, span: Span) -> Self {
        Self {
            model_name,
            rules: Vec::new(),
            cross_field_rules: Vec::new(),
            rate_limits: Vec::new(),
            business_rules: Vec::new(),
            span,
        }
    }
}

/// `- <field> must <constraint>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    pub constraint: ConstraintExpression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintExpression {
    Format { format: FormatKind },
    Length { min: u64, max: u64 },
    MinLength { min: u64 },
    MaxLength { max: u64 },
    Range { min: f64, max: f64 },
    Min { value: f64 },
    Max { value: f64 },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    Empty,
    NotEmpty,
    /// `be unique [within <Model>]`
    Unique { scope: Option<String> },
    OneOf { values: Vec<LiteralValue> },
    NotIn { values: Vec<LiteralValue> },
    Contains { requirement: ContainRequirement },
    NotContains { text: String },
    Matches { pattern: String },
    RequiredWhen { condition: ValidationCondition },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatKind {
    Email,
    Url,
    Phone,
    Date,
    Uuid,
    Alphanumeric,
    Numeric,
    Lowercase,
    Uppercase,
}

impl FormatKind {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "email" => Some(FormatKind::Email),
            "url" => Some(FormatKind::Url),
            "phone" => Some(FormatKind::Phone),
            "date" => Some(FormatKind::Date),
            "uuid" => Some(FormatKind::Uuid),
            "alphanumeric" => Some(FormatKind::Alphanumeric),
            "numeric" => Some(FormatKind::Numeric),
            "lowercase" => Some(FormatKind::Lowercase),
            "uppercase" => Some(FormatKind::Uppercase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainRequirement {
    Uppercase,
    Lowercase,
    Digit,
    SpecialCharacter,
    Text { text: String },
}

/// `<field> is [not] <value>` inside `exist when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCondition {
    pub field: String,
    pub negated: bool,
    pub value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossFieldRule {
    pub field: String,
    pub comparison: CrossFieldComparison,
    pub other_field: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossFieldComparison {
    Before,
    After,
    GreaterThan,
    LessThan,
    Equal,
    DifferentFrom,
}

/// `- <action> limited to N [times] per <unit>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub action: String,
    pub count: u64,
    pub period: TimeUnit,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub description: String,
    pub span: Span,
}
