//! Logging (`log.dsl`) parser.

use super::cursor::TokenCursor;
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{Position, TokenKind};

pub struct LogParser {
    cursor: TokenCursor,
}

impl GrammarParser for LogParser {
    type Output = LogAst;
    const GRAMMAR: Grammar = Grammar::Log;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<LogAst, ParseError> {
        let mut ast = LogAst::default();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            let start = self.cursor.start();
            match self.cursor.kind() {
                TokenKind::Log if self.cursor.check_at(1, TokenKind::Level) => {
                    ast.levels.push(self.parse_level(start)?);
                }
                TokenKind::Log => ast.logs.push(self.parse_log(start)?),
                TokenKind::Audit => ast.audits.push(self.parse_audit(start)?),
                TokenKind::Exclude => {
                    if ast.exclude.is_some() {
                        return Err(self.cursor.error_at("Duplicate Exclude section", start));
                    }
                    ast.exclude = Some(self.parse_exclude(start)?);
                }
                _ => {
                    return Err(self.cursor.error(
                        "Expected logging section (Log for, Audit for, Log level or Exclude)",
                    ))
                }
            }
        }
        Ok(ast)
    }
}

impl LogParser {
    /// `Log level <level> for:` followed by one target per item.
    fn parse_level(&mut self, start: Position) -> Result<LogLevelDefinition, ParseError> {
        self.cursor.advance();
        self.cursor.advance();
        let level = match self.cursor.kind() {
            TokenKind::Trace => LogLevel::Trace,
            TokenKind::Debug => LogLevel::Debug,
            TokenKind::Info => LogLevel::Info,
            TokenKind::Warn | TokenKind::Warning => LogLevel::Warn,
            TokenKind::Error => LogLevel::Error,
            _ => {
                return Err(self
                    .cursor
                    .error("Expected log level (trace, debug, info, warn or error)"))
            }
        };
        self.cursor.advance();
        self.cursor.expect(TokenKind::For, "after log level")?;
        self.cursor.expect_header_end("after 'for'")?;

        let section = format!("Log level {:?}", level);
        let mut targets = Vec::new();
        while self.cursor.next_item(targets.len(), &section)?.is_some() {
            targets.push(self.cursor.name(&[], "log target")?.text);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&targets, &section)?;

        Ok(LogLevelDefinition {
            level,
            targets,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_log(&mut self, start: Position) -> Result<LogDefinition, ParseError> {
        self.cursor.advance();
        self.cursor.expect(TokenKind::For, "after 'Log'")?;
        let model_name = self.cursor.model_reference(&[TokenKind::Colon])?;
        self.cursor.expect_header_end("after model name")?;

        let section = format!("Log for {}", model_name);
        let mut items = Vec::new();
        while let Some(item_start) = self.cursor.next_item(items.len(), &section)? {
            let item = self.parse_item()?;
            items.push(Spanned::new(item, self.cursor.span_from(item_start)));
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&items, &section)?;

        tracing::trace!(section = %section, items = items.len(), "parsed log section");
        Ok(LogDefinition {
            model_name,
            items,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_audit(&mut self, start: Position) -> Result<AuditDefinition, ParseError> {
        self.cursor.advance();
        self.cursor.expect(TokenKind::For, "after 'Audit'")?;
        let model_name = self.cursor.model_reference(&[TokenKind::Colon])?;
        self.cursor.expect_header_end("after model name")?;

        let section = format!("Audit for {}", model_name);
        let mut items = Vec::new();
        let mut retention = None;
        let mut lines = 0;
        while let Some(item_start) = self.cursor.next_item(lines, &section)? {
            if self.cursor.check(TokenKind::Retain) {
                if retention.is_some() {
                    return Err(self.cursor.error_at(
                        format!("Duplicate retention in '{}'", section),
                        self.cursor.start(),
                    ));
                }
                self.cursor.advance();
                self.cursor.expect(TokenKind::For, "after 'retain'")?;
                retention = Some(self.cursor.time_amount("retention period")?);
            } else {
                let item = self.parse_item()?;
                items.push(Spanned::new(item, self.cursor.span_from(item_start)));
            }
            lines += 1;
            self.cursor.expect_line_end()?;
        }
        if lines == 0 {
            return Err(self
                .cursor
                .error(format!("Section '{}' has no items", section)));
        }

        tracing::trace!(section = %section, items = items.len(), "parsed audit section");
        Ok(AuditDefinition {
            model_name,
            items,
            retention,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_exclude(&mut self, start: Position) -> Result<ExcludeDefinition, ParseError> {
        self.cursor.advance();
        self.cursor.expect_header_end("after 'Exclude'")?;

        let mut fields = Vec::new();
        while self.cursor.next_item(fields.len(), "Exclude")?.is_some() {
            fields.push(self.cursor.name(&[], "field name")?.text);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&fields, "Exclude")?;

        Ok(ExcludeDefinition {
            fields,
            span: self.cursor.span_from(start),
        })
    }

    /// An action item when the line has a `with`, an event otherwise.
    fn parse_item(&mut self) -> Result<LogItem, ParseError> {
        if !self.cursor.line_contains(TokenKind::With) {
            return Ok(LogItem::Event {
                name: self.cursor.name(&[], "event name")?.text,
            });
        }

        let actions = self.cursor.name_list(&[TokenKind::With], "action")?;
        self.cursor.expect(TokenKind::With, "after actions")?;

        let detail = if self.cursor.check(TokenKind::Full) && self.cursor.check_at(1, TokenKind::Data)
        {
            self.cursor.advance();
            self.cursor.advance();
            LogDetail::FullData
        } else if self.cursor.check(TokenKind::Changed)
            && self.cursor.check_at(1, TokenKind::Fields)
        {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.eat(TokenKind::Only);
            LogDetail::ChangedFieldsOnly
        } else {
            let fields = self.cursor.name_list(&[TokenKind::Only], "field name")?;
            let only = self.cursor.eat(TokenKind::Only);
            LogDetail::Fields { fields, only }
        };

        Ok(LogItem::Action { actions, detail })
    }
}

// ============================================================================
// TESTS
// ============================================================================
