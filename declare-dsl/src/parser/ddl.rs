//! Schema (`ddl.dsl`) parser.

use super::cursor::TokenCursor;
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{Position, TokenKind};

pub struct SchemaParser {
    cursor: TokenCursor,
}

impl GrammarParser for SchemaParser {
    type Output = SchemaAst;
    const GRAMMAR: Grammar = Grammar::Schema;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<SchemaAst, ParseError> {
        let mut models = Vec::new();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            models.push(self.parse_model()?);
        }
        if models.is_empty() {
            return Err(self
                .cursor
                .error("Expected at least one model definition"));
        }
        Ok(SchemaAst { models })
    }
}

impl SchemaParser {
    fn parse_model(&mut self) -> Result<Model, ParseError> {
        let start = self.cursor.start();
        let name = self.cursor.model_name(&[TokenKind::Colon])?;
        self.cursor.expect_header_end("after model name")?;

        let mut items = Vec::new();
        while let Some(item_start) = self.cursor.next_item(items.len(), &name.singular)? {
            items.push(self.parse_model_item(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor
            .require_items(&items, &name.singular)?;

        tracing::trace!(model = %name.singular, items = items.len(), "parsed model");
        Ok(Model {
            name,
            items,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_model_item(&mut self, start: Position) -> Result<ModelItem, ParseError> {
        match self.cursor.kind() {
            TokenKind::Has if self.cursor.check_at(1, TokenKind::Many) => {
                self.cursor.advance();
                self.cursor.advance();
                let target = self.cursor.model_name(&[])?;
                Ok(ModelItem::Relationship(Relationship {
                    kind: RelationshipKind::HasMany,
                    target,
                    span: self.cursor.span_from(start),
                }))
            }
            TokenKind::Has => {
                self.cursor.advance();
                self.parse_field(start).map(ModelItem::Field)
            }
            TokenKind::Belongs => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::To, "after 'belongs'")?;
                let target = self.cursor.model_name(&[])?;
                Ok(ModelItem::Relationship(Relationship {
                    kind: RelationshipKind::BelongsTo,
                    target,
                    span: self.cursor.span_from(start),
                }))
            }
            _ => Err(self.cursor.error("Expected 'has' or 'belongs to'")),
        }
    }

    /// `<name> as <type and constraints>`, after `has`.
    fn parse_field(&mut self, start: Position) -> Result<Field, ParseError> {
        let name = self.cursor.name(&[TokenKind::As], "field name")?;
        self.cursor.expect(TokenKind::As, "after field name")?;

        let mut field_type = None;
        let mut constraints = Vec::new();
        let mut default = None;

        while !self.cursor.at_line_end() {
            let kind = self.cursor.kind();
            if let Some(ty) = field_type_of(kind) {
                if field_type.is_some() {
                    return Err(self.cursor.error_at(
                        format!(
                            "Duplicate type '{}' for field '{}'",
                            self.cursor.current().text,
                            name.text
                        ),
                        self.cursor.start(),
                    ));
                }
                field_type = Some(ty);
                self.cursor.advance();
            } else if let Some(constraint) = constraint_of(kind) {
                if !constraints.contains(&constraint) {
                    constraints.push(constraint);
                }
                self.cursor.advance();
            } else {
                match kind {
                    TokenKind::And | TokenKind::Comma => self.cursor.advance(),
                    TokenKind::Default => {
                        self.cursor.advance();
                        default = Some(if self.cursor.eat(TokenKind::Now) {
                            DefaultValue::Now
                        } else {
                            DefaultValue::Literal {
                                value: self.cursor.literal("default value")?,
                            }
                        });
                    }
                    _ => {
                        return Err(self.cursor.error(format!(
                            "Unexpected token in definition of field '{}'",
                            name.text
                        )))
                    }
                }
            }
        }

        let Some(field_type) = field_type else {
            return Err(self.cursor.error_at(
                format!("Field '{}' has no type", name.text),
                name.span.start,
            ));
        };
        if constraints.contains(&FieldConstraint::Required)
            && constraints.contains(&FieldConstraint::Optional)
        {
            return Err(self.cursor.error_at(
                format!("Field '{}' cannot be both required and optional", name.text),
                name.span.start,
            ));
        }

        Ok(Field {
            name: name.text,
            field_type,
            constraints,
            default,
            span: self.cursor.span_from(start),
        })
    }
}

fn field_type_of(kind: TokenKind) -> Option<FieldType> {
    match kind {
        TokenKind::Text => Some(FieldType::Text),
        TokenKind::Number => Some(FieldType::Number),
        TokenKind::Integer => Some(FieldType::Integer),
        TokenKind::Decimal => Some(FieldType::Decimal),
        TokenKind::Boolean => Some(FieldType::Boolean),
        TokenKind::Date => Some(FieldType::Date),
        TokenKind::Timestamp => Some(FieldType::Timestamp),
        TokenKind::Email => Some(FieldType::Email),
        TokenKind::Url => Some(FieldType::Url),
        TokenKind::Json => Some(FieldType::Json),
        TokenKind::Uuid => Some(FieldType::Uuid),
        _ => None,
    }
}

fn constraint_of(kind: TokenKind) -> Option<FieldConstraint> {
    match kind {
        TokenKind::Unique => Some(FieldConstraint::Unique),
        TokenKind::Required => Some(FieldConstraint::Required),
        TokenKind::Optional => Some(FieldConstraint::Optional),
        TokenKind::Indexed => Some(FieldConstraint::Indexed),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
