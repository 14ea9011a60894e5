//! Types shared by several AST families.

use crate::identifier::ModelNameParts;
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// A model name with both grammatical forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelName {
    pub singular: String,
    pub plural: String,
    /// The name as written, brackets included.
    pub original_form: String,
    pub span: Span,
}

impl ModelName {
    pub fn from_parts(parts: ModelNameParts, span: Span) -> Self {
        Self {
            singular: parts.singular,
            plural: parts.plural,
            original_form: parts.original_form,
            span,
        }
    }
}

/// A node that carries no span of its own, paired with one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A literal written in DSL source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl LiteralValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LiteralValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Calendar and clock units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    /// Approximate length in milliseconds (months are 30 days, years 365).
    pub fn as_millis(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
            TimeUnit::Weeks => 7 * 86_400_000,
            TimeUnit::Months => 30 * 86_400_000,
            TimeUnit::Years => 365 * 86_400_000,
        }
    }
}

/// An amount of time such as `30 seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeAmount {
    pub amount: u64,
    pub unit: TimeUnit,
}

impl TimeAmount {
    pub fn new(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_millis(self.amount.saturating_mul(self.unit.as_millis()))
    }
}
