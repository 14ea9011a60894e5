//! Data-manipulation (DML) AST: queries, mutations and computed fields.

use super::common::{LiteralValue, Spanned, TimeUnit};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `dml.dsl` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmlAst {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Query(QuerySection),
    Mutation(MutationSection),
    Computed(ComputedSection),
}

impl Section {
    pub fn model_name(&self) -> &str {
        match self {
            Section::Query(s) => &s.model_name,
            Section::Mutation(s) => &s.model_name,
            Section::Computed(s) => &s.model_name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Section::Query(s) => s.span,
            Section::Mutation(s) => s.span,
            Section::Computed(s) => s.span,
        }
    }
}

// ============================================================================
// QUERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySection {
    pub model_name: String,
    pub queries: Vec<Query>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub name: String,
    pub where_clause: Option<WhereClause>,
    pub sort_clause: Option<SortClause>,
    pub limit_clause: Option<LimitClause>,
    pub span: Span,
}

/// Conditions joined by `and`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub conditions: Vec<Condition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    /// `None` only for `is empty` / `is not empty`.
    pub value: Option<ConditionValue>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    IsAfter,
    IsBefore,
    GreaterThan,
    LessThan,
    AtLeast,
    AtMost,
    IsEmpty,
    IsNotEmpty,
    Contains,
    StartsWith,
    EndsWith,
}

impl ConditionOperator {
    /// Whether the operator is followed by a value.
    pub fn takes_value(self) -> bool {
        !matches!(self, ConditionOperator::IsEmpty | ConditionOperator::IsNotEmpty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionValue {
    Literal { value: LiteralValue },
    Time { expression: TimeExpression },
    /// Free text such as `current user`, normalized.
    Reference { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeExpression {
    Now,
    Today,
    /// `N <unit> ago`
    Relative { value: u64, unit: TimeUnit },
    /// `N <unit> from now`
    FromNow { value: u64, unit: TimeUnit },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub count: u64,
    pub span: Span,
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationSection {
    pub model_name: String,
    pub mutations: Vec<Mutation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub name: String,
    pub actions: Vec<Spanned<MutationAction>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationAction {
    Set { field: String, value: ConditionValue },
    Increment { field: String, amount: f64 },
    Decrement { field: String, amount: f64 },
    Clear { field: String },
    Delete,
}

// ============================================================================
// COMPUTED FIELDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedSection {
    pub model_name: String,
    pub fields: Vec<ComputedField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedField {
    pub name: String,
    pub aggregation: ComputedAggregation,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputedAggregation {
    Count {
        relation: String,
        filter: Option<WhereClause>,
    },
    Sum(FieldAggregate),
    Average(FieldAggregate),
    Minimum(FieldAggregate),
    Maximum(FieldAggregate),
}

/// `<function> of <field> in <relation> [where ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAggregate {
    pub field: String,
    pub relation: String,
    pub filter: Option<WhereClause>,
}
