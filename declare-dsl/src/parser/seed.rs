//! Seed data (`seed.dsl`) parser.
//!
//! A random seed lists its generated fields after `with`; constant
//! attributes shared by every generated row come after an explicit
//! `with fixed`:
//!
//! ```text
//! - 20 random Post[s] with title, body with fixed status "published" for each User
//! ```

use super::cursor::TokenCursor;
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{unquote, Position, TokenKind};

pub struct SeedParser {
    cursor: TokenCursor,
}

impl GrammarParser for SeedParser {
    type Output = SeedAst;
    const GRAMMAR: Grammar = Grammar::Seed;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<SeedAst, ParseError> {
        let mut sections = Vec::new();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            sections.push(self.parse_section()?);
        }
        Ok(SeedAst { sections })
    }
}

impl SeedParser {
    fn parse_section(&mut self) -> Result<SeedSection, ParseError> {
        let start = self.cursor.start();
        let (target, label) = if self.cursor.eat(TokenKind::Environment) {
            let name = self.cursor.name(&[TokenKind::Colon], "environment name")?;
            let label = format!("Environment {}", name.text);
            (SeedTarget::Environment { name: name.text }, label)
        } else {
            let name = self.cursor.model_name(&[TokenKind::Colon])?;
            let label = name.singular.clone();
            (SeedTarget::Model { name }, label)
        };
        self.cursor.expect_header_end("after seed target")?;

        let mut items = Vec::new();
        while let Some(item_start) = self.cursor.next_item(items.len(), &label)? {
            let item = if self.cursor.check(TokenKind::NumberLiteral)
                || self.cursor.check(TokenKind::Random)
            {
                SeedItem::Random(self.parse_random(item_start)?)
            } else {
                SeedItem::Literal(self.parse_literal(item_start)?)
            };
            items.push(item);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&items, &label)?;

        tracing::trace!(section = %label, items = items.len(), "parsed seed section");
        Ok(SeedSection {
            target,
            items,
            span: self.cursor.span_from(start),
        })
    }

    /// `("…" | address | words) [with <attrs>] [for <model>]`
    fn parse_literal(&mut self, start: Position) -> Result<LiteralSeed, ParseError> {
        let value = if self.cursor.check(TokenKind::StringLiteral) {
            SeedValue::String {
                value: unquote(&self.cursor.bump().text),
            }
        } else if let Some(address) = self.cursor.email() {
            SeedValue::Email {
                address: address.text,
            }
        } else {
            SeedValue::Identifier {
                name: self
                    .cursor
                    .name(&[TokenKind::With, TokenKind::For], "seed value")?
                    .text,
            }
        };

        let attributes = if self.cursor.eat(TokenKind::With) {
            self.parse_attributes()?
        } else {
            Vec::new()
        };
        let model_name = if self.cursor.eat(TokenKind::For) {
            Some(self.cursor.model_reference(&[])?)
        } else {
            None
        };
        if !self.cursor.at_line_end() {
            return Err(self.cursor.error("Unexpected token in seed item"));
        }

        Ok(LiteralSeed {
            value,
            attributes,
            model_name,
            span: self.cursor.span_from(start),
        })
    }

    /// `[N] random [<model>] [with <fields>] [with fixed <attrs>] [for each <model>]`
    fn parse_random(&mut self, start: Position) -> Result<RandomSeed, ParseError> {
        let count = if self.cursor.check(TokenKind::NumberLiteral) {
            self.cursor.positive_integer("Seed count")?
        } else {
            1
        };
        self.cursor.expect(TokenKind::Random, "after seed count")?;

        let model_name = if self.cursor.current().is_word()
            && !self.cursor.check_any(&[TokenKind::With, TokenKind::For])
        {
            Some(
                self.cursor
                    .model_reference(&[TokenKind::With, TokenKind::For])?,
            )
        } else {
            None
        };

        let mut fields = Vec::new();
        let mut fixed = Vec::new();
        while self.cursor.eat(TokenKind::With) {
            if self.cursor.eat(TokenKind::Fixed) {
                if !fixed.is_empty() {
                    return Err(self.cursor.error_at(
                        "Duplicate 'with fixed' in random seed",
                        self.cursor.prev_end(),
                    ));
                }
                fixed = self.parse_attributes()?;
            } else {
                if !fields.is_empty() || !fixed.is_empty() {
                    return Err(self
                        .cursor
                        .error("Random fields must come before 'with fixed'"));
                }
                fields = self
                    .cursor
                    .name_list(&[TokenKind::With, TokenKind::For], "field name")?;
            }
        }

        let per_parent = if self.cursor.eat(TokenKind::For) {
            self.cursor.expect(TokenKind::Each, "after 'for'")?;
            Some(self.cursor.model_reference(&[])?)
        } else {
            None
        };
        if !self.cursor.at_line_end() {
            return Err(self.cursor.error("Unexpected token in random seed"));
        }

        Ok(RandomSeed {
            count,
            model_name,
            fields,
            fixed,
            per_parent,
            span: self.cursor.span_from(start),
        })
    }

    /// `<field> <value> ((',' | 'and') <field> <value>)*`
    fn parse_attributes(&mut self) -> Result<Vec<SeedAttribute>, ParseError> {
        let mut attributes = vec![self.parse_attribute()?];
        loop {
            if self.cursor.eat(TokenKind::Comma) {
                self.cursor.eat(TokenKind::And);
            } else if !self.cursor.eat(TokenKind::And) {
                break;
            }
            attributes.push(self.parse_attribute()?);
        }
        Ok(attributes)
    }

    /// Field words followed by a literal. Without a literal the last bare
    /// word is the value (`role admin`).
    fn parse_attribute(&mut self) -> Result<SeedAttribute, ParseError> {
        let start = self.cursor.start();
        let mut words = Vec::new();
        let value = loop {
            if !words.is_empty() {
                if let Some(address) = self.cursor.email() {
                    break Some(LiteralValue::String(address.text));
                }
                if self.cursor.check_any(&[
                    TokenKind::StringLiteral,
                    TokenKind::NumberLiteral,
                    TokenKind::BooleanLiteral,
                ]) || self.cursor.at_number()
                {
                    break Some(self.cursor.literal("attribute value")?);
                }
            }
            if self.cursor.current().is_word()
                && !self.cursor.check_any(&[TokenKind::And, TokenKind::For, TokenKind::With])
            {
                words.push(self.cursor.bump());
            } else {
                break None;
            }
        };

        let value = match value {
            Some(value) => value,
            None if words.len() >= 2 => words
                .pop()
                .map(|word| LiteralValue::String(word.text))
                .ok_or_else(|| self.cursor.error("Expected attribute value"))?,
            None => {
                return Err(self.cursor.error(if words.is_empty() {
                    "Expected attribute name"
                } else {
                    "Expected attribute value"
                }))
            }
        };
        let field = self.cursor.name_from_words(&words, "attribute name")?;

        Ok(SeedAttribute {
            field: field.text,
            value,
            span: self.cursor.span_from(start),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<SeedAst, ParseError> {
        SeedParser::new(tokenize(source).unwrap()).parse()
    }

    #[test]
    fn test_literal_seeds() {
        let source = "\
User[s]:
- admin@example.com with role admin and name \"Admin\"
- \"Guest\" with active false
- support team for Organization
";
        let ast = parse(source).unwrap();
        let section = &ast.sections[0];
        assert!(matches!(&section.target, SeedTarget::Model { name } if name.plural == "Users"));

        let SeedItem::Literal(first) = &section.items[0] else {
            panic!("expected literal seed");
        };
        assert_eq!(
            first.value,
            SeedValue::Email {
                address: "admin@example.com".into()
            }
        );
        assert_eq!(first.attributes[0].field, "role");
        assert_eq!(first.attributes[0].value, LiteralValue::String("admin".into()));
        assert_eq!(first.attributes[1].field, "name");
        assert_eq!(first.attributes[1].value, LiteralValue::String("Admin".into()));

        let SeedItem::Literal(second) = &section.items[1] else {
            panic!("expected literal seed");
        };
        assert_eq!(second.value, SeedValue::String { value: "Guest".into() });
        assert_eq!(second.attributes[0].value, LiteralValue::Boolean(false));

        let SeedItem::Literal(third) = &section.items[2] else {
            panic!("expected literal seed");
        };
        assert_eq!(
            third.value,
            SeedValue::Identifier {
                name: "support_team".into()
            }
        );
        assert_eq!(third.model_name.as_deref(), Some("Organization"));
    }

    #[test]
    fn test_hyphenated_email_seeds() {
        let source = "\
User:
- ops@my-site.co.uk with team ops
- \"Ann\" with contact a-b@example.com
- a@my-site.com
";
        let ast = parse(source).unwrap();
        let items = &ast.sections[0].items;
        assert_eq!(items.len(), 3);

        let SeedItem::Literal(ops) = &items[0] else {
            panic!("expected literal seed");
        };
        assert_eq!(
            ops.value,
            SeedValue::Email {
                address: "ops@my-site.co.uk".into()
            }
        );
        assert_eq!(ops.attributes[0].field, "team");

        let SeedItem::Literal(ann) = &items[1] else {
            panic!("expected literal seed");
        };
        assert_eq!(ann.attributes[0].field, "contact");
        assert_eq!(
            ann.attributes[0].value,
            LiteralValue::String("a-b@example.com".into())
        );

        let SeedItem::Literal(short) = &items[2] else {
            panic!("expected literal seed");
        };
        assert_eq!(
            short.value,
            SeedValue::Email {
                address: "a@my-site.com".into()
            }
        );
    }

    #[test]
    fn test_random_seeds() {
        let source = "\
Environment development:
- 50 random users with name, email and bio
- 20 random Post[s] with title, body with fixed status \"published\" for each User
- random Comment with fixed approved true, score 5
";
        let ast = parse(source).unwrap();
        let section = &ast.sections[0];
        assert_eq!(
            section.target,
            SeedTarget::Environment {
                name: "development".into()
            }
        );

        let SeedItem::Random(users) = &section.items[0] else {
            panic!("expected random seed");
        };
        assert_eq!(users.count, 50);
        assert_eq!(users.model_name.as_deref(), Some("users"));
        assert_eq!(users.fields, vec!["name", "email", "bio"]);
        assert!(users.fixed.is_empty());

        let SeedItem::Random(posts) = &section.items[1] else {
            panic!("expected random seed");
        };
        assert_eq!(posts.model_name.as_deref(), Some("Post"));
        assert_eq!(posts.fields, vec!["title", "body"]);
        assert_eq!(posts.fixed[0].field, "status");
        assert_eq!(posts.fixed[0].value, LiteralValue::String("published".into()));
        assert_eq!(posts.per_parent.as_deref(), Some("User"));

        let SeedItem::Random(comments) = &section.items[2] else {
            panic!("expected random seed");
        };
        assert_eq!(comments.count, 1);
        assert!(comments.fields.is_empty());
        assert_eq!(comments.fixed.len(), 2);
        assert_eq!(comments.fixed[1].value, LiteralValue::Number(5.0));
    }

    #[test]
    fn test_field_that_looks_like_a_value_stays_a_field() {
        let ast = parse("Product:\n- 5 random products with name and price category\n").unwrap();
        let SeedItem::Random(seed) = &ast.sections[0].items[0] else {
            panic!("expected random seed");
        };
        assert_eq!(seed.fields, vec!["name", "price_category"]);
        assert!(seed.fixed.is_empty());
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = parse("User:\n- 0 random users\n").unwrap_err();
        assert_eq!(err.message, "Seed count must be greater than zero");
        assert_eq!((err.position.line, err.position.column), (2, 3));
    }

    #[test]
    fn test_attribute_without_value() {
        let err = parse("User:\n- \"Ann\" with role\n").unwrap_err();
        assert_eq!(err.message, "Expected attribute value, found end of line");
    }

    #[test]
    fn test_sibling_spans_are_ordered() {
        let ast = parse("User:\n- \"a\"\n- \"b\"\n\nPost:\n- 3 random posts\n").unwrap();
        let items: Vec<_> = ast.sections.iter().flat_map(|s| s.items.iter()).collect();
        for pair in items.windows(2) {
            assert!(pair[0].span().end.offset <= pair[1].span().start.offset);
        }
        assert!(ast.sections[0].span.end.offset <= ast.sections[1].span.start.offset);
    }
}
