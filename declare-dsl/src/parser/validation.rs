//! Validation (`validation.dsl`) parser.

use super::cursor::{Phrase, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{unquote, Position, Span, TokenKind};
use regex::Regex;

pub struct ValidationParser {
    cursor: TokenCursor,
}

/// The four section kinds of a validation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Rules,
    CrossField,
    RateLimits,
    Business,
}

impl GrammarParser for ValidationParser {
    type Output = ValidationAst;
    const GRAMMAR: Grammar = Grammar::Validation;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<ValidationAst, ParseError> {
        let mut definitions = Vec::new();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            definitions.push(self.parse_section()?);
        }
        Ok(ValidationAst { definitions })
    }
}

impl ValidationParser {
    fn parse_section(&mut self) -> Result<ValidationDefinition, ParseError> {
        let start = self.cursor.start();
        let kind = self.parse_section_keywords()?;
        let model_name = self.cursor.model_reference(&[TokenKind::Colon])?;
        self.cursor.expect_header_end("after model name")?;

        let mut definition = ValidationDefinition::new(model_name, Span::point(start));
        let label = match kind {
            SectionKind::Rules => definition.model_name.clone(),
            SectionKind::CrossField => format!("Cross-field rules for {}", definition.model_name),
            SectionKind::RateLimits => format!("Rate limits for {}", definition.model_name),
            SectionKind::Business => format!("Business rules for {}", definition.model_name),
        };

        let mut count = 0;
        while let Some(item_start) = self.cursor.next_item(count, &label)? {
            match kind {
                SectionKind::Rules => definition.rules.push(self.parse_rule(item_start)?),
                SectionKind::CrossField => definition
                    .cross_field_rules
                    .push(self.parse_cross_field_rule(item_start)?),
                SectionKind::RateLimits => definition
                    .rate_limits
                    .push(self.parse_rate_limit(item_start)?),
                SectionKind::Business => definition
                    .business_rules
                    .push(self.parse_business_rule(item_start)?),
            }
            count += 1;
            self.cursor.expect_line_end()?;
        }
        if count == 0 {
            return Err(self
                .cursor
                .error(format!("Section '{}' has no items", label)));
        }

        tracing::trace!(section = %label, items = count, "parsed validation section");
        definition.span = self.cursor.span_from(start);
        Ok(definition)
    }

    /// Consume the keywords in front of the model name of a section header.
    fn parse_section_keywords(&mut self) -> Result<SectionKind, ParseError> {
        let c = &self.cursor;
        let cross = c.check(TokenKind::Cross)
            && (c.check_at(1, TokenKind::Dash) || c.peek_at(1).is_text("field"));
        let rate = c.check(TokenKind::Rate) && c.check_at(1, TokenKind::Limits);
        let business = c.check(TokenKind::Business) && c.check_at(1, TokenKind::Rules);

        if cross {
            self.cursor.advance();
            self.cursor.eat(TokenKind::Dash);
            self.cursor.expect_word("field", "after 'Cross'")?;
            self.cursor.expect(TokenKind::Rules, "after 'Cross-field'")?;
            self.cursor.expect(TokenKind::For, "after 'Cross-field rules'")?;
            Ok(SectionKind::CrossField)
        } else if rate {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.expect(TokenKind::For, "after 'Rate limits'")?;
            Ok(SectionKind::RateLimits)
        } else if business {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.expect(TokenKind::For, "after 'Business rules'")?;
            Ok(SectionKind::Business)
        } else if let Some(expected) = misspelled_header(self.cursor.kind())
            .filter(|_| self.cursor.peek_at(1).is_word())
        {
            Err(self.cursor.error_at(
                format!(
                    "Unknown validation section '{} {} ...', expected '{}'",
                    self.cursor.current().text,
                    self.cursor.peek_at(1).text,
                    expected
                ),
                self.cursor.start(),
            ))
        } else {
            Ok(SectionKind::Rules)
        }
    }

    // ========================================================================
    // Field rules
    // ========================================================================

    /// `<field> must <constraint>`
    fn parse_rule(&mut self, start: Position) -> Result<ValidationRule, ParseError> {
        let field = self.cursor.name(&[TokenKind::Must], "field name")?;
        self.cursor.expect(TokenKind::Must, "after field name")?;
        let constraint = self.parse_constraint()?;
        if !self.cursor.at_line_end() {
            return Err(self.cursor.error(format!(
                "Unexpected token in rule for '{}'",
                field.text
            )));
        }
        Ok(ValidationRule {
            field: field.text,
            constraint,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_constraint(&mut self) -> Result<ConstraintExpression, ParseError> {
        match self.cursor.kind() {
            TokenKind::Be => {
                self.cursor.advance();
                self.parse_be_tail()
            }
            TokenKind::Contain => {
                self.cursor.advance();
                Ok(ConstraintExpression::Contains {
                    requirement: self.parse_requirement()?,
                })
            }
            TokenKind::Not => {
                self.cursor.advance();
                if self.cursor.eat(TokenKind::Be) {
                    if self.cursor.eat(TokenKind::Empty) {
                        return Ok(ConstraintExpression::NotEmpty);
                    }
                    if self.cursor.eat(TokenKind::In) {
                        return Ok(ConstraintExpression::NotIn {
                            values: self.cursor.literal_list("value")?,
                        });
                    }
                    return Err(self.cursor.error("Expected 'empty' or 'in' after 'not be'"));
                }
                if self.cursor.eat(TokenKind::Contain) {
                    let token = self
                        .cursor
                        .expect(TokenKind::StringLiteral, "after 'not contain'")?;
                    return Ok(ConstraintExpression::NotContains {
                        text: unquote(&token.text),
                    });
                }
                Err(self.cursor.error("Expected 'be' or 'contain' after 'not'"))
            }
            TokenKind::Match => {
                self.cursor.advance();
                let token = self
                    .cursor
                    .expect(TokenKind::StringLiteral, "after 'match'")?;
                let pattern = unquote(&token.text);
                if let Err(e) = Regex::new(&pattern) {
                    return Err(self.cursor.error_at(
                        format!("Invalid pattern {}: {}", token.text, e),
                        token.span.start,
                    ));
                }
                Ok(ConstraintExpression::Matches { pattern })
            }
            TokenKind::Exist => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::When, "after 'exist'")?;
                let field = self.cursor.name(&[TokenKind::Is], "condition field")?;
                self.cursor.expect(TokenKind::Is, "after condition field")?;
                let negated = self.cursor.eat(TokenKind::Not);
                let value = self.cursor.literal("condition value")?;
                Ok(ConstraintExpression::RequiredWhen {
                    condition: ValidationCondition {
                        field: field.text,
                        negated,
                        value,
                    },
                })
            }
            _ => Err(self.cursor.error(
                "Expected constraint after 'must' (be, contain, not, match or exist)",
            )),
        }
    }

    /// Everything that may follow `must be`.
    fn parse_be_tail(&mut self) -> Result<ConstraintExpression, ParseError> {
        match self.cursor.kind() {
            TokenKind::Between => {
                self.cursor.advance();
                let min = self.cursor.number("minimum")?;
                self.cursor.expect(TokenKind::And, "between bounds")?;
                let max = self.cursor.number("maximum")?;
                if min > max {
                    return Err(self.cursor.error_at(
                        format!("Lower bound {} is greater than upper bound {}", min, max),
                        self.cursor.prev_end(),
                    ));
                }
                if self.eat_characters() {
                    Ok(ConstraintExpression::Length {
                        min: self.whole(min)?,
                        max: self.whole(max)?,
                    })
                } else {
                    Ok(ConstraintExpression::Range { min, max })
                }
            }
            TokenKind::At => {
                self.cursor.advance();
                let least = if self.cursor.eat(TokenKind::Least) {
                    true
                } else if self.cursor.eat(TokenKind::Most) {
                    false
                } else {
                    return Err(self.cursor.error("Expected 'least' or 'most' after 'at'"));
                };
                let value = self.cursor.number("bound")?;
                match (least, self.eat_characters()) {
                    (true, true) => Ok(ConstraintExpression::MinLength {
                        min: self.whole(value)?,
                    }),
                    (false, true) => Ok(ConstraintExpression::MaxLength {
                        max: self.whole(value)?,
                    }),
                    (true, false) => Ok(ConstraintExpression::Min { value }),
                    (false, false) => Ok(ConstraintExpression::Max { value }),
                }
            }
            TokenKind::Greater | TokenKind::Less => {
                let greater = self.cursor.check(TokenKind::Greater);
                self.cursor.advance();
                self.cursor.expect(TokenKind::Than, "in comparison")?;
                let value = self.cursor.number("bound")?;
                Ok(if greater {
                    ConstraintExpression::GreaterThan { value }
                } else {
                    ConstraintExpression::LessThan { value }
                })
            }
            TokenKind::Empty => {
                self.cursor.advance();
                Ok(ConstraintExpression::Empty)
            }
            TokenKind::Unique => {
                self.cursor.advance();
                let scope = if self.cursor.eat(TokenKind::Within) {
                    Some(self.cursor.model_reference(&[])?)
                } else {
                    None
                };
                Ok(ConstraintExpression::Unique { scope })
            }
            TokenKind::One => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::Of, "after 'one'")?;
                Ok(ConstraintExpression::OneOf {
                    values: self.cursor.literal_list("value")?,
                })
            }
            _ => {
                if self.cursor.check_word("a") || self.cursor.check_word("an") {
                    self.cursor.advance();
                }
                self.cursor.eat(TokenKind::Valid);
                let token = self.cursor.current().clone();
                let format = token
                    .is_word()
                    .then(|| FormatKind::from_word(&token.text))
                    .flatten()
                    .ok_or_else(|| self.cursor.error("Expected format or constraint after 'be'"))?;
                self.cursor.advance();
                // `a valid email address`, `a valid phone number`
                if self.cursor.check_word("address") || self.cursor.check(TokenKind::Number) {
                    self.cursor.advance();
                }
                Ok(ConstraintExpression::Format { format })
            }
        }
    }

    /// Optional `characters [long]`.
    fn eat_characters(&mut self) -> bool {
        if self.cursor.eat(TokenKind::Characters) {
            self.cursor.eat_word("long");
            true
        } else {
            false
        }
    }

    fn whole(&self, value: f64) -> Result<u64, ParseError> {
        if value >= 0.0 && value.fract() == 0.0 {
            Ok(value as u64)
        } else {
            Err(self.cursor.error_at(
                format!("Character count must be a whole number, got {}", value),
                self.cursor.prev_end(),
            ))
        }
    }

    /// What may follow `must contain`.
    fn parse_requirement(&mut self) -> Result<ContainRequirement, ParseError> {
        if self.cursor.check_word("a") || self.cursor.check_word("an") {
            self.cursor.advance();
        } else if self.cursor.check(TokenKind::At)
            && self.cursor.check_at(1, TokenKind::Least)
            && self.cursor.check_at(2, TokenKind::One)
        {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
        }

        if self.cursor.check(TokenKind::StringLiteral) {
            return Ok(ContainRequirement::Text {
                text: unquote(&self.cursor.bump().text),
            });
        }

        let requirement = if self.cursor.check_word("uppercase") {
            ContainRequirement::Uppercase
        } else if self.cursor.check_word("lowercase") {
            ContainRequirement::Lowercase
        } else if self.cursor.check(TokenKind::Number)
            || self.cursor.check_word("numbers")
            || self.cursor.check_word("digit")
            || self.cursor.check_word("digits")
        {
            ContainRequirement::Digit
        } else if self.cursor.check_word("special") {
            ContainRequirement::SpecialCharacter
        } else {
            return Err(self.cursor.error(
                "Expected uppercase, lowercase, number, special character or a quoted string",
            ));
        };
        self.cursor.advance();

        for filler in ["letter", "letters", "character"] {
            if self.cursor.eat_word(filler) {
                break;
            }
        }
        self.cursor.eat(TokenKind::Characters);
        Ok(requirement)
    }

    // ========================================================================
    // Other sections
    // ========================================================================

    fn parse_cross_field_rule(&mut self, start: Position) -> Result<CrossFieldRule, ParseError> {
        let field = self.cursor.name(&[TokenKind::Must], "field name")?;
        self.cursor.expect(TokenKind::Must, "after field name")?;

        let comparison = if self.cursor.eat(TokenKind::Be) {
            match self.cursor.kind() {
                TokenKind::Before => {
                    self.cursor.advance();
                    CrossFieldComparison::Before
                }
                TokenKind::After => {
                    self.cursor.advance();
                    CrossFieldComparison::After
                }
                TokenKind::Greater => {
                    self.cursor.advance();
                    self.cursor.expect(TokenKind::Than, "after 'greater'")?;
                    CrossFieldComparison::GreaterThan
                }
                TokenKind::Less => {
                    self.cursor.advance();
                    self.cursor.expect(TokenKind::Than, "after 'less'")?;
                    CrossFieldComparison::LessThan
                }
                _ if self.cursor.check_word("different") => {
                    self.cursor.advance();
                    self.cursor.expect(TokenKind::From, "after 'different'")?;
                    CrossFieldComparison::DifferentFrom
                }
                _ => {
                    return Err(self.cursor.error(
                        "Expected 'before', 'after', 'greater than', 'less than' or 'different from'",
                    ))
                }
            }
        } else if self.cursor.eat(TokenKind::Match) || self.cursor.eat_word("equal") {
            self.cursor.eat(TokenKind::To);
            CrossFieldComparison::Equal
        } else {
            return Err(self
                .cursor
                .error("Expected 'be', 'match' or 'equal' in cross-field rule"));
        };

        let other = self.cursor.name(&[], "other field")?;
        Ok(CrossFieldRule {
            field: field.text,
            comparison,
            other_field: other.text,
            span: self.cursor.span_from(start),
        })
    }

    /// `<action> limited to N [times] per <unit>`
    fn parse_rate_limit(&mut self, start: Position) -> Result<RateLimitRule, ParseError> {
        let action = self.cursor.name(&[TokenKind::Limited], "action")?;
        self.cursor.expect(TokenKind::Limited, "after action")?;
        self.cursor.expect(TokenKind::To, "after 'limited'")?;
        let count = self.cursor.positive_integer("Rate limit")?;
        self.cursor.eat_word("times");
        self.cursor.expect(TokenKind::Per, "after rate limit count")?;
        let period = self.cursor.expect_time_unit()?;
        Ok(RateLimitRule {
            action: action.text,
            count,
            period,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_business_rule(&mut self, start: Position) -> Result<BusinessRule, ParseError> {
        let words = self.cursor.rest_of_line();
        let description = Phrase::from_adjacent(&words)
            .ok_or_else(|| self.cursor.error("Expected business rule description"))?;
        Ok(BusinessRule {
            description: description.text,
            span: self.cursor.span_from(start),
        })
    }
}

/// The header a multi-word section starting with `kind` was meant to be.
fn misspelled_header(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Cross => Some("Cross-field rules for <Model>:"),
        TokenKind::Rate => Some("Rate limits for <Model>:"),
        TokenKind::Business => Some("Business rules for <Model>:"),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<ValidationAst, ParseError> {
        ValidationParser::new(tokenize(source).unwrap()).parse()
    }

    fn constraints(source: &str) -> Vec<ConstraintExpression> {
        parse(source).unwrap().definitions[0]
            .rules
            .iter()
            .map(|r| r.constraint.clone())
            .collect()
    }

    #[test]
    fn test_empty_input_is_empty_ast() {
        assert!(parse("").unwrap().definitions.is_empty());
    }

    #[test]
    fn test_be_constraints() {
        let source = "\
User:
- email must be a valid email
- username must be between 3 and 20 characters long
- age must be between 13 and 120
- bio must be at most 500 characters
- password must be at least 8 characters
- score must be at least 0
- price must be greater than 0
- username must be unique
- slug must be unique within Blog[s]
- status must be one of \"draft\", \"published\" or \"archived\"
- phone must be a valid phone number
- nickname must be empty
";
        let c = constraints(source);
        assert_eq!(c[0], ConstraintExpression::Format { format: FormatKind::Email });
        assert_eq!(c[1], ConstraintExpression::Length { min: 3, max: 20 });
        assert_eq!(c[2], ConstraintExpression::Range { min: 13.0, max: 120.0 });
        assert_eq!(c[3], ConstraintExpression::MaxLength { max: 500 });
        assert_eq!(c[4], ConstraintExpression::MinLength { min: 8 });
        assert_eq!(c[5], ConstraintExpression::Min { value: 0.0 });
        assert_eq!(c[6], ConstraintExpression::GreaterThan { value: 0.0 });
        assert_eq!(c[7], ConstraintExpression::Unique { scope: None });
        assert_eq!(
            c[8],
            ConstraintExpression::Unique {
                scope: Some("Blog".into())
            }
        );
        assert_eq!(
            c[9],
            ConstraintExpression::OneOf {
                values: vec![
                    LiteralValue::String("draft".into()),
                    LiteralValue::String("published".into()),
                    LiteralValue::String("archived".into()),
                ]
            }
        );
        assert_eq!(c[10], ConstraintExpression::Format { format: FormatKind::Phone });
        assert_eq!(c[11], ConstraintExpression::Empty);
    }

    #[test]
    fn test_other_constraints() {
        let source = "\
User:
- password must contain an uppercase letter
- password must contain at least one number
- password must contain a special character
- handle must not contain \"admin\"
- title must not be empty
- role must not be in \"root\", \"system\"
- zip must match \"^[0-9]{5}$\"
- company must exist when account type is \"business\"
- referrer must exist when invited is not false
";
        let c = constraints(source);
        assert_eq!(
            c[0],
            ConstraintExpression::Contains {
                requirement: ContainRequirement::Uppercase
            }
        );
        assert_eq!(
            c[1],
            ConstraintExpression::Contains {
                requirement: ContainRequirement::Digit
            }
        );
        assert_eq!(
            c[2],
            ConstraintExpression::Contains {
                requirement: ContainRequirement::SpecialCharacter
            }
        );
        assert_eq!(c[3], ConstraintExpression::NotContains { text: "admin".into() });
        assert_eq!(c[4], ConstraintExpression::NotEmpty);
        assert!(matches!(&c[5], ConstraintExpression::NotIn { values } if values.len() == 2));
        assert_eq!(
            c[6],
            ConstraintExpression::Matches {
                pattern: "^[0-9]{5}$".into()
            }
        );
        assert_eq!(
            c[7],
            ConstraintExpression::RequiredWhen {
                condition: ValidationCondition {
                    field: "account_type".into(),
                    negated: false,
                    value: LiteralValue::String("business".into()),
                }
            }
        );
        assert!(matches!(
            &c[8],
            ConstraintExpression::RequiredWhen { condition } if condition.negated
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = parse("User:\n- zip must match \"[0-9\"\n").unwrap_err();
        assert!(err.message.starts_with("Invalid pattern \"[0-9\""));
        assert_eq!((err.position.line, err.position.column), (2, 18));
    }

    #[test]
    fn test_sections_are_kept_separate() {
        let source = "\
Event[s]:
- title must not be empty

Cross-field rules for Event:
- ends at must be after starts at
- confirm password must match password

Rate limits for Event:
- create limited to 10 times per hour

Business rules for Event:
- Events cannot be scheduled on public holidays
";
        let ast = parse(source).unwrap();
        assert_eq!(ast.definitions.len(), 4);
        assert_eq!(ast.for_model("Event").count(), 4);

        let cross = &ast.definitions[1].cross_field_rules;
        assert_eq!(cross[0].field, "ends_at");
        assert_eq!(cross[0].comparison, CrossFieldComparison::After);
        assert_eq!(cross[0].other_field, "starts_at");
        assert_eq!(cross[1].comparison, CrossFieldComparison::Equal);

        let rate = &ast.definitions[2].rate_limits[0];
        assert_eq!(rate.action, "create");
        assert_eq!(rate.count, 10);
        assert_eq!(rate.period, TimeUnit::Hours);

        assert_eq!(
            ast.definitions[3].business_rules[0].description,
            "Events cannot be scheduled on public holidays"
        );

        for pair in ast.definitions.windows(2) {
            assert!(pair[0].span.end.offset <= pair[1].span.start.offset);
        }
    }

    #[test]
    fn test_unknown_format() {
        let err = parse("User:\n- email must be a valid fax\n").unwrap_err();
        assert!(err.message.starts_with("Expected format or constraint after 'be'"));
        assert_eq!(err.position.column, 25);
    }

    #[test]
    fn test_inverted_bounds() {
        let err = parse("User:\n- age must be between 9 and 3\n").unwrap_err();
        assert!(err.message.contains("greater than upper bound"));
    }

    #[test]
    fn test_missing_must() {
        let err = parse("User:\n- email be valid email\n").unwrap_err();
        assert!(err.message.starts_with("Expected 'must' after field name"));
    }

    #[test]
    fn test_misspelled_section_header() {
        let err = parse("Rate limit for User:\n- login limited to 5 times per minute\n")
            .unwrap_err();
        assert_eq!(
            err.message,
            "Unknown validation section 'Rate limit ...', expected 'Rate limits for <Model>:'"
        );
        assert_eq!((err.position.line, err.position.column), (1, 1));

        let err = parse("Business rule for Order:\n- Orders need approval\n").unwrap_err();
        assert!(err.message.ends_with("expected 'Business rules for <Model>:'"));

        let err = parse("Cross rules for Event:\n- ends at must be after starts at\n")
            .unwrap_err();
        assert!(err.message.contains("Cross-field rules for <Model>:"));

        // A single-word model named like a keyword is still a model.
        let ast = parse("Rate:\n- value must be between 0 and 100\n").unwrap();
        assert_eq!(ast.definitions[0].model_name, "Rate");
    }
}
