//! Data-manipulation (`dml.dsl`) parser.

use super::cursor::{time_unit_of, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{unquote, Position, TokenKind};

pub struct DmlParser {
    cursor: TokenCursor,
}

impl GrammarParser for DmlParser {
    type Output = DmlAst;
    const GRAMMAR: Grammar = Grammar::Dml;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<DmlAst, ParseError> {
        let mut sections = Vec::new();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            let section = match self.cursor.kind() {
                TokenKind::Query => Section::Query(self.parse_query_section()?),
                TokenKind::Mutation => Section::Mutation(self.parse_mutation_section()?),
                TokenKind::Computed => Section::Computed(self.parse_computed_section()?),
                _ => {
                    return Err(self
                        .cursor
                        .error("Expected 'Query for', 'Mutation for' or 'Computed for'"))
                }
            };
            sections.push(section);
        }
        if sections.is_empty() {
            return Err(self
                .cursor
                .error("Expected at least one Query, Mutation or Computed section"));
        }
        Ok(DmlAst { sections })
    }
}

impl DmlParser {
    /// `<Keyword> for <Model>:`; returns the model reference.
    fn parse_header(&mut self, keyword: &str) -> Result<String, ParseError> {
        self.cursor.advance();
        self.cursor
            .expect(TokenKind::For, &format!("after '{}'", keyword))?;
        let model = self.cursor.model_reference(&[TokenKind::Colon])?;
        self.cursor.expect_header_end("after model name")?;
        Ok(model)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn parse_query_section(&mut self) -> Result<QuerySection, ParseError> {
        let start = self.cursor.start();
        let model_name = self.parse_header("Query")?;
        let section = format!("Query for {}", model_name);

        let mut queries = Vec::new();
        while let Some(item_start) = self.cursor.next_item(queries.len(), &section)? {
            queries.push(self.parse_query(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&queries, &section)?;

        tracing::trace!(model = %model_name, queries = queries.len(), "parsed query section");
        Ok(QuerySection {
            model_name,
            queries,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_query(&mut self, start: Position) -> Result<Query, ParseError> {
        let name = self.cursor.name(
            &[TokenKind::Where, TokenKind::Sorted, TokenKind::Limited],
            "query name",
        )?;

        let where_clause = if self.cursor.eat(TokenKind::Where) {
            Some(self.parse_where_clause(&[TokenKind::Sorted, TokenKind::Limited])?)
        } else {
            None
        };

        let sort_clause = if self.cursor.check(TokenKind::Sorted) {
            let sort_start = self.cursor.start();
            self.cursor.advance();
            self.cursor.expect(TokenKind::By, "after 'sorted'")?;
            let field = self.cursor.name(
                &[TokenKind::Ascending, TokenKind::Descending, TokenKind::Limited],
                "sort field",
            )?;
            let direction = if self.cursor.eat(TokenKind::Descending) {
                SortDirection::Descending
            } else {
                self.cursor.eat(TokenKind::Ascending);
                SortDirection::Ascending
            };
            Some(SortClause {
                field: field.text,
                direction,
                span: self.cursor.span_from(sort_start),
            })
        } else {
            None
        };

        let limit_clause = if self.cursor.check(TokenKind::Limited) {
            let limit_start = self.cursor.start();
            self.cursor.advance();
            self.cursor.expect(TokenKind::To, "after 'limited'")?;
            let count = self.cursor.positive_integer("Limit")?;
            Some(LimitClause {
                count,
                span: self.cursor.span_from(limit_start),
            })
        } else {
            None
        };

        if !self.cursor.at_line_end() {
            return Err(self
                .cursor
                .error(format!("Unexpected token in query '{}'", name.text)));
        }

        Ok(Query {
            name: name.text,
            where_clause,
            sort_clause,
            limit_clause,
            span: self.cursor.span_from(start),
        })
    }

    /// Conditions joined by `and`, after `where`.
    fn parse_where_clause(&mut self, stop: &[TokenKind]) -> Result<WhereClause, ParseError> {
        let start = self.cursor.start();
        let mut conditions = vec![self.parse_condition(stop)?];
        while self.cursor.eat(TokenKind::And) {
            conditions.push(self.parse_condition(stop)?);
        }
        Ok(WhereClause {
            conditions,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_condition(&mut self, stop: &[TokenKind]) -> Result<Condition, ParseError> {
        let start = self.cursor.start();
        let mut words = Vec::new();
        while self.cursor.current().is_word() && !self.at_word_operator() {
            words.push(self.cursor.bump());
        }
        let field = self.cursor.name_from_words(&words, "condition field")?;
        let operator = self.parse_operator(&field.text)?;
        let value = if operator.takes_value() {
            Some(self.parse_value(stop)?)
        } else {
            None
        };
        Ok(Condition {
            field: field.text,
            operator,
            value,
            span: self.cursor.span_from(start),
        })
    }

    /// `starts`/`ends` are operators only when followed by `with`, so field
    /// names such as `starts at` stay intact.
    fn at_word_operator(&self) -> bool {
        match self.cursor.kind() {
            TokenKind::Is | TokenKind::Contains => true,
            TokenKind::Starts | TokenKind::Ends => self.cursor.check_at(1, TokenKind::With),
            _ => false,
        }
    }

    fn parse_operator(&mut self, field: &str) -> Result<ConditionOperator, ParseError> {
        let operator = match self.cursor.kind() {
            TokenKind::Is => {
                self.cursor.advance();
                match self.cursor.kind() {
                    TokenKind::Not => {
                        self.cursor.advance();
                        if self.cursor.eat(TokenKind::Empty) {
                            return Ok(ConditionOperator::IsNotEmpty);
                        }
                        return Ok(ConditionOperator::NotEquals);
                    }
                    TokenKind::After => ConditionOperator::IsAfter,
                    TokenKind::Before => ConditionOperator::IsBefore,
                    TokenKind::Empty => ConditionOperator::IsEmpty,
                    TokenKind::Greater => {
                        self.cursor.advance();
                        self.cursor.expect(TokenKind::Than, "after 'greater'")?;
                        return Ok(ConditionOperator::GreaterThan);
                    }
                    TokenKind::Less => {
                        self.cursor.advance();
                        self.cursor.expect(TokenKind::Than, "after 'less'")?;
                        return Ok(ConditionOperator::LessThan);
                    }
                    TokenKind::At => {
                        self.cursor.advance();
                        if self.cursor.eat(TokenKind::Least) {
                            return Ok(ConditionOperator::AtLeast);
                        }
                        if self.cursor.eat(TokenKind::Most) {
                            return Ok(ConditionOperator::AtMost);
                        }
                        return Err(self.cursor.error("Expected 'least' or 'most' after 'is at'"));
                    }
                    _ => return Ok(ConditionOperator::Equals),
                }
            }
            TokenKind::Contains => ConditionOperator::Contains,
            TokenKind::Starts => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::With, "after 'starts'")?;
                return Ok(ConditionOperator::StartsWith);
            }
            TokenKind::Ends => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::With, "after 'ends'")?;
                return Ok(ConditionOperator::EndsWith);
            }
            TokenKind::Eq => ConditionOperator::Equals,
            TokenKind::Ne => ConditionOperator::NotEquals,
            TokenKind::Gt => ConditionOperator::GreaterThan,
            TokenKind::Lt => ConditionOperator::LessThan,
            TokenKind::Ge => ConditionOperator::AtLeast,
            TokenKind::Le => ConditionOperator::AtMost,
            _ => {
                return Err(self
                    .cursor
                    .error(format!("Expected comparison operator after '{}'", field)))
            }
        };
        self.cursor.advance();
        Ok(operator)
    }

    /// Condition value, classified by its first token.
    fn parse_value(&mut self, stop: &[TokenKind]) -> Result<ConditionValue, ParseError> {
        match self.cursor.kind() {
            TokenKind::BooleanLiteral => {
                let token = self.cursor.bump();
                Ok(ConditionValue::Literal {
                    value: LiteralValue::Boolean(token.is_text("true")),
                })
            }
            TokenKind::StringLiteral => Ok(ConditionValue::Literal {
                value: LiteralValue::String(unquote(&self.cursor.bump().text)),
            }),
            TokenKind::Now => {
                self.cursor.advance();
                Ok(ConditionValue::Time {
                    expression: TimeExpression::Now,
                })
            }
            TokenKind::Today => {
                self.cursor.advance();
                Ok(ConditionValue::Time {
                    expression: TimeExpression::Today,
                })
            }
            TokenKind::NumberLiteral
                if time_unit_of(self.cursor.peek_at(1).kind).is_some() =>
            {
                let value = self.cursor.integer("time amount")?;
                let unit = self.cursor.expect_time_unit()?;
                let expression = if self.cursor.eat(TokenKind::Ago) {
                    TimeExpression::Relative { value, unit }
                } else if self.cursor.check(TokenKind::From)
                    && self.cursor.check_at(1, TokenKind::Now)
                {
                    self.cursor.advance();
                    self.cursor.advance();
                    TimeExpression::FromNow { value, unit }
                } else {
                    return Err(self
                        .cursor
                        .error("Expected 'ago' or 'from now' after time amount"));
                };
                Ok(ConditionValue::Time { expression })
            }
            _ if self.cursor.at_number() => Ok(ConditionValue::Literal {
                value: LiteralValue::Number(self.cursor.number("number")?),
            }),
            _ => {
                let mut stop = stop.to_vec();
                stop.push(TokenKind::And);
                let path = self.cursor.reference_path(&stop, "value")?;
                Ok(ConditionValue::Reference { path: path.text })
            }
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn parse_mutation_section(&mut self) -> Result<MutationSection, ParseError> {
        let start = self.cursor.start();
        let model_name = self.parse_header("Mutation")?;
        let section = format!("Mutation for {}", model_name);

        let mut mutations = Vec::new();
        while let Some(item_start) = self.cursor.next_item(mutations.len(), &section)? {
            mutations.push(self.parse_mutation(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&mutations, &section)?;

        tracing::trace!(model = %model_name, mutations = mutations.len(), "parsed mutation section");
        Ok(MutationSection {
            model_name,
            mutations,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_mutation(&mut self, start: Position) -> Result<Mutation, ParseError> {
        let name = self.cursor.name(&[TokenKind::Colon], "mutation name")?;
        self.cursor.expect(TokenKind::Colon, "after mutation name")?;

        let mut actions = vec![self.parse_action()?];
        while self.cursor.check(TokenKind::And) || self.cursor.check(TokenKind::Comma) {
            self.cursor.advance();
            self.cursor.eat(TokenKind::And);
            actions.push(self.parse_action()?);
        }
        if !self.cursor.at_line_end() {
            return Err(self
                .cursor
                .error(format!("Unexpected token in mutation '{}'", name.text)));
        }

        Ok(Mutation {
            name: name.text,
            actions,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_action(&mut self) -> Result<Spanned<MutationAction>, ParseError> {
        let start = self.cursor.start();
        let separators = [TokenKind::And, TokenKind::Comma];
        let action = match self.cursor.kind() {
            TokenKind::Set => {
                self.cursor.advance();
                let field = self.cursor.name(&[TokenKind::To], "field to set")?;
                self.cursor.expect(TokenKind::To, "after field name")?;
                let value = self.parse_value(&separators)?;
                MutationAction::Set {
                    field: field.text,
                    value,
                }
            }
            TokenKind::Increment | TokenKind::Decrement => {
                let increment = self.cursor.check(TokenKind::Increment);
                self.cursor.advance();
                let field = self.cursor.name(&[TokenKind::By, TokenKind::And], "field")?;
                let amount = if self.cursor.eat(TokenKind::By) {
                    self.cursor.number("amount")?
                } else {
                    1.0
                };
                if increment {
                    MutationAction::Increment {
                        field: field.text,
                        amount,
                    }
                } else {
                    MutationAction::Decrement {
                        field: field.text,
                        amount,
                    }
                }
            }
            TokenKind::Clear => {
                self.cursor.advance();
                let field = self.cursor.name(&[TokenKind::And], "field to clear")?;
                MutationAction::Clear { field: field.text }
            }
            TokenKind::Delete => {
                self.cursor.advance();
                MutationAction::Delete
            }
            _ => {
                return Err(self.cursor.error(
                    "Expected mutation action (set, increment, decrement, clear or delete)",
                ))
            }
        };
        Ok(Spanned::new(action, self.cursor.span_from(start)))
    }

    // ========================================================================
    // Computed fields
    // ========================================================================

    fn parse_computed_section(&mut self) -> Result<ComputedSection, ParseError> {
        let start = self.cursor.start();
        let model_name = self.parse_header("Computed")?;
        let section = format!("Computed for {}", model_name);

        let mut fields = Vec::new();
        while let Some(item_start) = self.cursor.next_item(fields.len(), &section)? {
            fields.push(self.parse_computed_field(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&fields, &section)?;

        tracing::trace!(model = %model_name, fields = fields.len(), "parsed computed section");
        Ok(ComputedSection {
            model_name,
            fields,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_computed_field(&mut self, start: Position) -> Result<ComputedField, ParseError> {
        let name = self.cursor.name(&[TokenKind::Colon], "computed field name")?;
        self.cursor.expect(TokenKind::Colon, "after computed field name")?;

        let function = self.cursor.kind();
        let aggregation = match function {
            TokenKind::Count => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::Of, "after 'count'")?;
                let relation = self.cursor.name(&[TokenKind::Where], "relation")?;
                let filter = self.parse_optional_filter()?;
                ComputedAggregation::Count {
                    relation: relation.text,
                    filter,
                }
            }
            TokenKind::Sum | TokenKind::Average | TokenKind::Minimum | TokenKind::Maximum => {
                let keyword = self.cursor.bump();
                self.cursor
                    .expect(TokenKind::Of, &format!("after '{}'", keyword.text))?;
                let field = self.cursor.name(&[TokenKind::In], "aggregated field")?;
                self.cursor.expect(TokenKind::In, "after aggregated field")?;
                let relation = self.cursor.name(&[TokenKind::Where], "relation")?;
                let aggregate = FieldAggregate {
                    field: field.text,
                    relation: relation.text,
                    filter: self.parse_optional_filter()?,
                };
                match function {
                    TokenKind::Sum => ComputedAggregation::Sum(aggregate),
                    TokenKind::Average => ComputedAggregation::Average(aggregate),
                    TokenKind::Minimum => ComputedAggregation::Minimum(aggregate),
                    _ => ComputedAggregation::Maximum(aggregate),
                }
            }
            _ => {
                return Err(self.cursor.error(
                    "Expected aggregation (count, sum, average, minimum or maximum)",
                ))
            }
        };

        Ok(ComputedField {
            name: name.text,
            aggregation,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_optional_filter(&mut self) -> Result<Option<WhereClause>, ParseError> {
        if self.cursor.eat(TokenKind::Where) {
            Ok(Some(self.parse_where_clause(&[])?))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<DmlAst, ParseError> {
        DmlParser::new(tokenize(source).unwrap()).parse()
    }

    fn first_query(ast: &DmlAst) -> &Query {
        match &ast.sections[0] {
            Section::Query(section) => &section.queries[0],
            other => panic!("expected query section, got {:?}", other),
        }
    }

    #[test]
    fn test_recent_posts_query() {
        let ast = parse(
            "Query for Post:\n- recent posts where created at is after 7 days ago sorted by created at descending limited to 20\n",
        )
        .unwrap();
        assert_eq!(ast.sections.len(), 1);
        assert_eq!(ast.sections[0].model_name(), "Post");

        let query = first_query(&ast);
        assert_eq!(query.name, "recent_posts");
        let conditions = &query.where_clause.as_ref().unwrap().conditions;
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].field, "created_at");
        assert_eq!(conditions[0].operator, ConditionOperator::IsAfter);
        assert_eq!(
            conditions[0].value,
            Some(ConditionValue::Time {
                expression: TimeExpression::Relative {
                    value: 7,
                    unit: TimeUnit::Days
                }
            })
        );
        let sort = query.sort_clause.as_ref().unwrap();
        assert_eq!(sort.field, "created_at");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(query.limit_clause.as_ref().unwrap().count, 20);
    }

    #[test]
    fn test_condition_values() {
        let ast = parse(
            "Query for Post:\n\
             - published where published is true and author is current user\n\
             - drafts where status is \"draft\" and views is at least 10\n\
             - upcoming where starts at is after 2 weeks from now\n\
             - untitled where title is empty\n\
             - titled where title is not empty and slug starts with \"a\"\n",
        )
        .unwrap();
        let Section::Query(section) = &ast.sections[0] else {
            panic!("expected query section");
        };
        let q = &section.queries;
        let published = &q[0].where_clause.as_ref().unwrap().conditions;
        assert_eq!(
            published[0].value,
            Some(ConditionValue::Literal {
                value: LiteralValue::Boolean(true)
            })
        );
        assert_eq!(
            published[1].value,
            Some(ConditionValue::Reference {
                path: "current_user".into()
            })
        );

        let drafts = &q[1].where_clause.as_ref().unwrap().conditions;
        assert_eq!(drafts[1].operator, ConditionOperator::AtLeast);
        assert_eq!(
            drafts[1].value,
            Some(ConditionValue::Literal {
                value: LiteralValue::Number(10.0)
            })
        );

        let upcoming = &q[2].where_clause.as_ref().unwrap().conditions;
        assert_eq!(upcoming[0].field, "starts_at");
        assert_eq!(
            upcoming[0].value,
            Some(ConditionValue::Time {
                expression: TimeExpression::FromNow {
                    value: 2,
                    unit: TimeUnit::Weeks
                }
            })
        );

        let untitled = &q[3].where_clause.as_ref().unwrap().conditions;
        assert_eq!(untitled[0].operator, ConditionOperator::IsEmpty);
        assert_eq!(untitled[0].value, None);

        let titled = &q[4].where_clause.as_ref().unwrap().conditions;
        assert_eq!(titled[0].operator, ConditionOperator::IsNotEmpty);
        assert_eq!(titled[1].operator, ConditionOperator::StartsWith);
    }

    #[test]
    fn test_mutations() {
        let ast = parse(
            "Mutation for Post:\n- publish: set status to \"published\" and set published at to now\n- bump: increment views by 2, clear cache key\n- remove: delete\n",
        )
        .unwrap();
        let Section::Mutation(section) = &ast.sections[0] else {
            panic!("expected mutation section");
        };
        assert_eq!(section.mutations.len(), 3);
        let publish = &section.mutations[0];
        assert_eq!(publish.name, "publish");
        assert_eq!(publish.actions.len(), 2);
        assert_eq!(
            publish.actions[1].node,
            MutationAction::Set {
                field: "published_at".into(),
                value: ConditionValue::Time {
                    expression: TimeExpression::Now
                },
            }
        );
        let bump = &section.mutations[1];
        assert_eq!(
            bump.actions[0].node,
            MutationAction::Increment {
                field: "views".into(),
                amount: 2.0
            }
        );
        assert_eq!(
            bump.actions[1].node,
            MutationAction::Clear {
                field: "cache_key".into()
            }
        );
        assert_eq!(section.mutations[2].actions[0].node, MutationAction::Delete);
    }

    #[test]
    fn test_computed_fields() {
        let ast = parse(
            "Computed for User:\n- post count: count of posts where published is true\n- total views: sum of views in posts\n",
        )
        .unwrap();
        let Section::Computed(section) = &ast.sections[0] else {
            panic!("expected computed section");
        };
        assert_eq!(section.fields[0].name, "post_count");
        match &section.fields[0].aggregation {
            ComputedAggregation::Count { relation, filter } => {
                assert_eq!(relation, "posts");
                assert_eq!(filter.as_ref().unwrap().conditions.len(), 1);
            }
            other => panic!("unexpected aggregation {:?}", other),
        }
        assert_eq!(
            section.fields[1].aggregation,
            ComputedAggregation::Sum(FieldAggregate {
                field: "views".into(),
                relation: "posts".into(),
                filter: None,
            })
        );
    }

    #[test]
    fn test_sections_interleave() {
        let ast = parse(
            "Query for Post:\n- all posts\n\nMutation for Post:\n- archive: set archived to true\n\nQuery for User:\n- everyone\n",
        )
        .unwrap();
        assert_eq!(ast.sections.len(), 3);
        assert!(matches!(ast.sections[1], Section::Mutation(_)));
        assert_eq!(ast.sections[2].model_name(), "User");
        assert!(ast.sections[0].span().end.offset <= ast.sections[1].span().start.offset);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = parse("").unwrap_err();
        assert!(err
            .message
            .starts_with("Expected at least one Query, Mutation or Computed section"));
    }

    #[test]
    fn test_limit_must_be_positive() {
        let err = parse("Query for Post:\n- none limited to 0\n").unwrap_err();
        assert_eq!(err.message, "Limit must be greater than zero");
        assert_eq!((err.position.line, err.position.column), (2, 19));
    }

    #[test]
    fn test_time_amount_needs_direction() {
        let err = parse("Query for Post:\n- old where created at is before 3 days\n").unwrap_err();
        assert!(err.message.starts_with("Expected 'ago' or 'from now'"));
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("Report for Post:\n- x\n").unwrap_err();
        assert!(err.message.starts_with("Expected 'Query for'"));
        assert_eq!(err.position.line, 1);
    }

    #[test]
    fn test_symbol_operators() {
        let ast = parse("Query for Post:\n- popular where views >= 100 and rank != 3\n").unwrap();
        let conditions = &first_query(&ast).where_clause.as_ref().unwrap().conditions;
        assert_eq!(conditions[0].operator, ConditionOperator::AtLeast);
        assert_eq!(conditions[1].operator, ConditionOperator::NotEquals);
    }
}
