//! Token cursor shared by every grammar parser.
//!
//! Owns the token vector and the read position. Besides the usual
//! `check`/`advance`/`expect` helpers it provides the phrase combinator used
//! for multi-word names: collect word tokens until a stop kind, join them
//! with single spaces, then normalize.

use crate::ast::{LiteralValue, ModelName, TimeAmount, TimeUnit};
use crate::error::ParseError;
use crate::identifier::{normalize_identifier, parse_model_name};
use crate::lexer::{unquote, Position, Span, Token, TokenKind};

/// A run of words collected from the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Words joined with single spaces (or the normalized form, for names).
    pub text: String,
    pub span: Span,
}

impl Phrase {
    /// Join tokens with single spaces.
    pub fn from_tokens(tokens: &[Token]) -> Option<Phrase> {
        let first = tokens.first()?;
        let last = tokens.last()?;
        let text = tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Phrase {
            text,
            span: first.span.to(last.span),
        })
    }

    /// Join tokens the way they were written: a space only where the source
    /// had a gap.
    pub fn from_adjacent(tokens: &[Token]) -> Option<Phrase> {
        let first = tokens.first()?;
        let last = tokens.last()?;
        let mut text = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 && !tokens[i - 1].touches(token) {
                text.push(' ');
            }
            text.push_str(&token.text);
        }
        Some(Phrase {
            text,
            span: first.span.to(last.span),
        })
    }
}

pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
    max_items: usize,
}

impl TokenCursor {
    /// Wrap a token stream. Comments are dropped here and a trailing `Eof` is
    /// guaranteed.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        let needs_eof = tokens.last().map(|t| t.kind != TokenKind::Eof).unwrap_or(true);
        if needs_eof {
            let at = tokens.last().map(|t| t.span.end).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", Span::point(at)));
        }
        Self {
            tokens,
            pos: 0,
            max_items: usize::MAX,
        }
    }

    /// Cap the number of items any one section may hold.
    pub fn with_item_limit(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn kind(&self) -> TokenKind {
        self.current().kind
    }

    /// The token `n` places ahead, clamped to `Eof`.
    pub fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn advance(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    /// Consume the current token and return a copy of it.
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    pub fn at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    pub fn at_line_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Eof)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn check_at(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_at(n).kind == kind
    }

    pub fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind())
    }

    /// Whether the current token is the plain word `word` (any case).
    pub fn check_word(&self, word: &str) -> bool {
        let token = self.current();
        token.is_word() && token.is_text(word)
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("Expected {} {}", kind, context)))
        }
    }

    pub fn expect_word(&mut self, word: &str, context: &str) -> Result<Token, ParseError> {
        if self.check_word(word) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("Expected '{}' {}", word, context)))
        }
    }

    pub fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Whether `kind` appears before the end of the current line.
    pub fn line_contains(&self, kind: TokenKind) -> bool {
        self.tokens[self.pos..]
            .iter()
            .take_while(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
            .any(|t| t.kind == kind)
    }

    /// Consume and return the rest of the current line (without the newline).
    pub fn rest_of_line(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !self.at_line_end() {
            tokens.push(self.bump());
        }
        tokens
    }

    // ========================================================================
    // Positions and errors
    // ========================================================================

    pub fn start(&self) -> Position {
        self.current().span.start
    }

    /// End of the last consumed token, ignoring line breaks.
    pub fn prev_end(&self) -> Position {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Newline)
            .map(|t| t.span.end)
            .unwrap_or_else(|| self.start())
    }

    /// Span from `start` to the end of the last consumed token.
    pub fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    /// Error at the current token, naming what was found instead.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        };
        ParseError::new(format!("{}, found {}", message.into(), found), token.span.start)
    }

    pub fn error_at(&self, message: impl Into<String>, position: Position) -> ParseError {
        ParseError::new(message, position)
    }

    // ========================================================================
    // Sections and items
    // ========================================================================

    /// `':'` followed by the end of the line.
    pub fn expect_header_end(&mut self, context: &str) -> Result<(), ParseError> {
        self.expect(TokenKind::Colon, context)?;
        self.expect_line_end()
    }

    /// Consume a newline, or accept end of input.
    pub fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match self.kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error("Expected end of line")),
        }
    }

    /// Start the next `-` item of a section, skipping blank lines.
    ///
    /// Returns the position of the dash, or `None` when the section is over.
    /// `count` is the number of items already parsed.
    pub fn next_item(&mut self, count: usize, section: &str) -> Result<Option<Position>, ParseError> {
        self.skip_newlines();
        if !self.check(TokenKind::Dash) {
            return Ok(None);
        }
        if count >= self.max_items {
            return Err(self.error_at(
                format!(
                    "Section '{}' has more than {} items",
                    section, self.max_items
                ),
                self.start(),
            ));
        }
        let start = self.start();
        self.advance();
        Ok(Some(start))
    }

    /// Fail with "has no items" when a present section is empty.
    pub fn require_items<T>(&self, items: &[T], section: &str) -> Result<(), ParseError> {
        if items.is_empty() {
            Err(self.error(format!("Section '{}' has no items", section)))
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Phrases and names
    // ========================================================================

    /// Consume word tokens until a stop kind, a non-word token or the end of
    /// the line.
    pub fn word_tokens(&mut self, stop: &[TokenKind]) -> Vec<Token> {
        let mut words = Vec::new();
        while self.current().is_word() && !self.check_any(stop) {
            words.push(self.bump());
        }
        words
    }

    /// Collect at least one word, joined with single spaces.
    pub fn phrase(&mut self, stop: &[TokenKind], what: &str) -> Result<Phrase, ParseError> {
        let words = self.word_tokens(stop);
        Phrase::from_tokens(&words).ok_or_else(|| self.error(format!("Expected {}", what)))
    }

    /// Collect a phrase and normalize it into an identifier.
    pub fn name(&mut self, stop: &[TokenKind], what: &str) -> Result<Phrase, ParseError> {
        let words = self.word_tokens(stop);
        self.name_from_words(&words, what)
    }

    /// Normalize already collected words into an identifier.
    pub fn name_from_words(&self, words: &[Token], what: &str) -> Result<Phrase, ParseError> {
        let phrase =
            Phrase::from_tokens(words).ok_or_else(|| self.error(format!("Expected {}", what)))?;
        let text = normalize_identifier(&phrase.text).map_err(|e| e.at(phrase.span.start))?;
        Ok(Phrase {
            text,
            span: phrase.span,
        })
    }

    /// One or more names separated by `,` or `and`.
    pub fn name_list(&mut self, stop: &[TokenKind], what: &str) -> Result<Vec<String>, ParseError> {
        let mut inner_stop = stop.to_vec();
        inner_stop.push(TokenKind::And);
        let mut names = vec![self.name(&inner_stop, what)?.text];
        while self.check(TokenKind::Comma) || self.check(TokenKind::And) {
            self.advance();
            // Oxford comma: `a, b, and c`
            self.eat(TokenKind::And);
            names.push(self.name(&inner_stop, what)?.text);
        }
        Ok(names)
    }

    /// Dotted reference such as `current user.id`: each segment normalized.
    pub fn reference_path(&mut self, stop: &[TokenKind], what: &str) -> Result<Phrase, ParseError> {
        let first = self.name(stop, what)?;
        let mut text = first.text;
        let mut span = first.span;
        while self.check(TokenKind::Dot) && self.peek_at(1).is_word() {
            self.advance();
            let segment = self.name(stop, what)?;
            text.push('.');
            text.push_str(&segment.text);
            span = span.to(segment.span);
        }
        Ok(Phrase { text, span })
    }

    /// A model name: words plus an optional bracket pluralization group.
    pub fn model_name(&mut self, stop: &[TokenKind]) -> Result<ModelName, ParseError> {
        let start = self.start();
        let words = self.word_tokens(stop);
        let mut raw = words
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if self.check(TokenKind::LBracket) {
            raw.push_str(&self.bump().text);
            loop {
                match self.kind() {
                    TokenKind::RBracket => {
                        raw.push_str(&self.bump().text);
                        break;
                    }
                    TokenKind::Newline | TokenKind::Eof => {
                        return Err(self.error_at("Unclosed '[' in model name", start));
                    }
                    _ => raw.push_str(&self.bump().text),
                }
            }
        } else if words.is_empty() {
            return Err(self.error("Expected model name"));
        }

        let parts = parse_model_name(&raw).map_err(|e| e.at(start))?;
        Ok(ModelName::from_parts(parts, self.span_from(start)))
    }

    /// A model reference inside a header (`Query for Post:`): the singular
    /// form of the model name.
    pub fn model_reference(&mut self, stop: &[TokenKind]) -> Result<String, ParseError> {
        Ok(self.model_name(stop)?.singular)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    /// Non-negative integer literal.
    pub fn integer(&mut self, what: &str) -> Result<u64, ParseError> {
        if self.check(TokenKind::NumberLiteral) {
            if let Ok(value) = self.current().text.parse::<u64>() {
                self.advance();
                return Ok(value);
            }
        }
        Err(self.error(format!("Expected {} (a whole number)", what)))
    }

    /// Integer literal greater than zero.
    pub fn positive_integer(&mut self, what: &str) -> Result<u64, ParseError> {
        let start = self.start();
        let value = self.integer(what)?;
        if value == 0 {
            return Err(self.error_at(format!("{} must be greater than zero", what), start));
        }
        Ok(value)
    }

    /// Number literal, optionally negative (`-5`, dash touching the digits).
    pub fn number(&mut self, what: &str) -> Result<f64, ParseError> {
        let negative = self.check(TokenKind::Dash)
            && self.check_at(1, TokenKind::NumberLiteral)
            && self.current().touches(self.peek_at(1));
        if negative {
            self.advance();
        }
        if self.check(TokenKind::NumberLiteral) {
            if let Ok(value) = self.current().text.parse::<f64>() {
                self.advance();
                return Ok(if negative { -value } else { value });
            }
        }
        Err(self.error(format!("Expected {}", what)))
    }

    pub fn at_number(&self) -> bool {
        self.check(TokenKind::NumberLiteral)
            || (self.check(TokenKind::Dash)
                && self.check_at(1, TokenKind::NumberLiteral)
                && self.current().touches(self.peek_at(1)))
    }

    /// Consume a time-unit keyword if present.
    pub fn time_unit(&mut self) -> Option<TimeUnit> {
        let unit = time_unit_of(self.kind())?;
        self.advance();
        Some(unit)
    }

    pub fn expect_time_unit(&mut self) -> Result<TimeUnit, ParseError> {
        self.time_unit()
            .ok_or_else(|| self.error("Expected time unit (ms, seconds, minutes, hours, days, weeks, months, years)"))
    }

    /// `N <unit>`
    pub fn time_amount(&mut self, what: &str) -> Result<TimeAmount, ParseError> {
        let amount = self.integer(what)?;
        let unit = self.expect_time_unit()?;
        Ok(TimeAmount::new(amount, unit))
    }

    /// String, number, boolean or a single bare word.
    pub fn literal(&mut self, what: &str) -> Result<LiteralValue, ParseError> {
        match self.kind() {
            TokenKind::StringLiteral => Ok(LiteralValue::String(unquote(&self.bump().text))),
            TokenKind::BooleanLiteral => {
                let token = self.bump();
                Ok(LiteralValue::Boolean(token.is_text("true")))
            }
            TokenKind::NumberLiteral | TokenKind::Dash if self.at_number() => {
                Ok(LiteralValue::Number(self.number(what)?))
            }
            _ if self.current().is_word() => Ok(LiteralValue::String(self.bump().text)),
            _ => Err(self.error(format!("Expected {}", what))),
        }
    }

    /// One or more literals separated by `,`, `and` or `or`.
    pub fn literal_list(&mut self, what: &str) -> Result<Vec<LiteralValue>, ParseError> {
        let mut values = vec![self.literal(what)?];
        while self.check_any(&[TokenKind::Comma, TokenKind::And, TokenKind::Or]) {
            self.advance();
            self.eat(TokenKind::And);
            self.eat(TokenKind::Or);
            values.push(self.literal(what)?);
        }
        Ok(values)
    }

    /// An email address split by the tokenizer (`john.doe@my-site.com`),
    /// reassembled from touching word, `.` and `-` tokens. Leaves the cursor
    /// alone when the tokens ahead do not form an address.
    pub fn email(&mut self) -> Option<Phrase> {
        if !self.current().is_word() {
            return None;
        }
        let mut end = self.pos;
        while end + 1 < self.tokens.len() {
            let next = &self.tokens[end + 1];
            let joins =
                next.is_word() || matches!(next.kind, TokenKind::Dot | TokenKind::Dash);
            if !joins || !self.tokens[end].touches(next) {
                break;
            }
            end += 1;
        }
        // A trailing `.` or `-` belongs to the sentence.
        while end > self.pos && !self.tokens[end].is_word() {
            end -= 1;
        }
        let tokens = &self.tokens[self.pos..=end];
        if end == self.pos || !tokens.iter().any(|t| t.text.contains('@')) {
            return None;
        }
        let phrase = Phrase::from_adjacent(tokens)?;
        self.pos = end + 1;
        Some(phrase)
    }
}

/// Map a time-unit keyword to its unit.
pub fn time_unit_of(kind: TokenKind) -> Option<TimeUnit> {
    match kind {
        TokenKind::Millisecond => Some(TimeUnit::Milliseconds),
        TokenKind::Second => Some(TimeUnit::Seconds),
        TokenKind::Minute => Some(TimeUnit::Minutes),
        TokenKind::Hour => Some(TimeUnit::Hours),
        TokenKind::Day => Some(TimeUnit::Days),
        TokenKind::Week => Some(TimeUnit::Weeks),
        TokenKind::Month => Some(TimeUnit::Months),
        TokenKind::Year => Some(TimeUnit::Years),
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

    fn cursor(source: &str) -> TokenCursor {
        TokenCursor::new(tokenize(source).unwrap())
    }

    #[test]
    fn test_comments_are_filtered() {
        let c = cursor("# header\nUser: # trailing\n");
        assert_eq!(c.kind(), TokenKind::Newline);
        assert!(c.tokens.iter().all(|t| t.kind != TokenKind::Comment));
    }

    #[test]
    fn test_missing_eof_is_added() {
        let c = TokenCursor::new(Vec::new());
        assert!(c.at_end());
        assert_eq!(c.start(), Position::default());
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let mut c = cursor("a");
        c.advance();
        c.advance();
        c.advance();
        assert!(c.at_end());
    }

    #[test]
    fn test_name_joins_and_normalizes() {
        let mut c = cursor("created at is after");
        let name = c.name(&[TokenKind::Is], "field name").unwrap();
        assert_eq!(name.text, "created_at");
        assert_eq!(name.span.start.column, 1);
        assert_eq!(name.span.end.column, 11);
        assert!(c.check(TokenKind::Is));
    }

    #[test]
    fn test_name_requires_a_word() {
        let mut c = cursor(": x");
        let err = c.name(&[], "field name").unwrap_err();
        assert_eq!(err.message, "Expected field name, found ':'");
    }

    #[test]
    fn test_name_reports_identifier_errors_at_phrase() {
        let mut c = cursor("- 2fa code");
        c.advance();
        let err = c.name(&[], "field name").unwrap_err();
        assert!(err.message.contains("must start with a letter"));
        assert_eq!(err.position.column, 3);
    }

    #[test]
    fn test_model_name_with_brackets() {
        let mut c = cursor("Blog Post[s]:");
        let name = c.model_name(&[TokenKind::Colon]).unwrap();
        assert_eq!(name.singular, "Blog_Post");
        assert_eq!(name.plural, "Blog_Posts");
        assert_eq!(name.original_form, "Blog Post[s]");
        assert!(c.check(TokenKind::Colon));

        let mut c = cursor("Person[|People]");
        let name = c.model_name(&[]).unwrap();
        assert_eq!(name.plural, "People");
    }

    #[test]
    fn test_model_name_unclosed_bracket() {
        let mut c = cursor("User[s\n");
        let err = c.model_name(&[]).unwrap_err();
        assert_eq!(err.message, "Unclosed '[' in model name");
        assert_eq!(err.position.column, 1);
    }

    #[test]
    fn test_model_name_too_many_pipes() {
        let mut c = cursor("User[a|b|c]:");
        let err = c.model_name(&[]).unwrap_err();
        assert!(err.message.contains("Malformed pluralization"));
    }

    #[test]
    fn test_email_reassembly() {
        let mut c = cursor("john.doe@example.com with role admin");
        let email = c.email().unwrap();
        assert_eq!(email.text, "john.doe@example.com");
        assert!(c.check(TokenKind::With));

        let mut c = cursor("example.com");
        assert!(c.email().is_none());
        assert_eq!(c.kind(), TokenKind::Identifier);

        let mut c = cursor("john @example.com");
        assert!(c.email().is_none());
    }

    #[test]
    fn test_email_with_hyphens() {
        let mut c = cursor("ops@my-site.co.uk.");
        assert_eq!(c.email().unwrap().text, "ops@my-site.co.uk");
        assert_eq!(c.kind(), TokenKind::Dot);

        let mut c = cursor("first-last@example.com - admin");
        assert_eq!(c.email().unwrap().text, "first-last@example.com");
        assert_eq!(c.kind(), TokenKind::Dash);

        let mut c = cursor("well-known name");
        assert!(c.email().is_none());
        assert!(c.current().is_text("well"));
    }

    #[test]
    fn test_literals() {
        let mut c = cursor("\"draft\" 42 -3.5 true admin");
        assert_eq!(c.literal("value").unwrap(), LiteralValue::String("draft".into()));
        assert_eq!(c.literal("value").unwrap(), LiteralValue::Number(42.0));
        assert_eq!(c.literal("value").unwrap(), LiteralValue::Number(-3.5));
        assert_eq!(c.literal("value").unwrap(), LiteralValue::Boolean(true));
        assert_eq!(c.literal("value").unwrap(), LiteralValue::String("admin".into()));
        assert!(c.literal("value").is_err());
    }

    #[test]
    fn test_name_list_with_oxford_comma() {
        let mut c = cursor("title, body, and published at");
        let names = c.name_list(&[], "field").unwrap();
        assert_eq!(names, vec!["title", "body", "published_at"]);
    }

    #[test]
    fn test_positive_integer() {
        let mut c = cursor("0");
        let err = c.positive_integer("Limit").unwrap_err();
        assert_eq!(err.message, "Limit must be greater than zero");
        let mut c = cursor("2.5");
        assert!(c.integer("count").is_err());
    }

    #[test]
    fn test_item_limit() {
        let mut c = cursor("- a\n- b\n").with_item_limit(1);
        assert!(c.next_item(0, "S").unwrap().is_some());
        c.rest_of_line();
        let err = c.next_item(1, "S").unwrap_err();
        assert_eq!(err.message, "Section 'S' has more than 1 items");
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn test_reference_path() {
        let mut c = cursor("current user.id and");
        let path = c.reference_path(&[TokenKind::And], "value").unwrap();
        assert_eq!(path.text, "current_user.id");
    }

    #[test]
    fn test_adjacent_phrase() {
        let tokens: Vec<Token> = tokenize("AES-256 at rest")
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        assert_eq!(Phrase::from_adjacent(&tokens).unwrap().text, "AES-256 at rest");
    }
}
