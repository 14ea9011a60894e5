//! Lexer implementation

use super::token::*;
use crate::config::FrontendConfig;
use crate::error::TokenizerError;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer shared by all DeclareLang grammars.
///
/// Produces a flat token stream terminated by a single `Eof` token. Newlines
/// and comments are kept as tokens; parsers drop comments themselves.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
    line_start: usize,
    max_source_bytes: usize,
    max_line_length: usize,
    max_tokens: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source, without resource limits.
    pub fn new(source: &'a str) -> Self {
        Self::with_config(source, &FrontendConfig::unlimited())
    }

    /// Create a lexer that enforces the source, line and token limits of
    /// `config`.
    pub fn with_config(source: &'a str, config: &FrontendConfig) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
            line_start: 0,
            max_source_bytes: config.max_source_bytes,
            max_line_length: config.max_line_length,
            max_tokens: config.max_tokens,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, TokenizerError> {
        if self.source.len() > self.max_source_bytes {
            return Err(TokenizerError::new(
                format!(
                    "Source is {} bytes, exceeding the limit of {} bytes",
                    self.source.len(),
                    self.max_source_bytes
                ),
                Position::default(),
            ));
        }

        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            if tokens.len() >= self.max_tokens {
                return Err(TokenizerError::new(
                    format!("Token limit of {} exceeded", self.max_tokens),
                    token.span.start,
                ));
            }
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Result<Token, TokenizerError> {
        self.skip_whitespace();

        let start = self.position();

        let kind = match self.peek_char() {
            None => {
                self.check_line_length(start)?;
                TokenKind::Eof
            }
            Some(c) => match c {
                '\n' => {
                    self.check_line_length(start)?;
                    self.advance();
                    return Ok(self.newline_token(start));
                }
                '\r' => {
                    self.check_line_length(start)?;
                    self.advance();
                    if self.peek_char() == Some('\n') {
                        self.advance();
                    }
                    return Ok(self.newline_token(start));
                }
                '#' => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.advance();
                    }
                    TokenKind::Comment
                }
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '-' => self.single(TokenKind::Dash),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '|' => self.single(TokenKind::Pipe),
                '%' => self.single(TokenKind::PercentSign),

                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }

                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }

                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                    }
                    TokenKind::Eq
                }

                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ne
                    } else {
                        return Err(TokenizerError::new("Unexpected character '!'", start));
                    }
                }

                '"' | '\'' => self.scan_string(c, start)?,

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_ascii_alphabetic() || c == '_' || c == '@' => self.scan_identifier(),

                c => {
                    return Err(TokenizerError::new(
                        format!("Unexpected character '{}'", c),
                        start,
                    ))
                }
            },
        };

        let end = self.position();
        Ok(Token::new(
            kind,
            &self.source[start.offset..end.offset],
            Span::new(start, end),
        ))
    }

    /// Reject the line ending at `end` if it is longer than allowed.
    fn check_line_length(&self, end: Position) -> Result<(), TokenizerError> {
        let length = end.offset - self.line_start;
        if length > self.max_line_length {
            return Err(TokenizerError::new(
                format!(
                    "Line {} is {} bytes long, exceeding the limit of {} bytes",
                    end.line, length, self.max_line_length
                ),
                Position::new(end.line, 1, self.line_start),
            ));
        }
        Ok(())
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Build a `Newline` token for the line break just consumed and move to
    /// the next line.
    fn newline_token(&mut self, start: Position) -> Token {
        let end = self.position();
        self.line += 1;
        self.column = 1;
        self.line_start = end.offset;
        Token::new(
            TokenKind::Newline,
            &self.source[start.offset..end.offset],
            Span::new(start, end),
        )
    }

    /// Scan an identifier, keyword or boolean literal.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '@' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        if ident.eq_ignore_ascii_case("true") || ident.eq_ignore_ascii_case("false") {
            return TokenKind::BooleanLiteral;
        }

        TokenKind::keyword(ident).unwrap_or(TokenKind::Identifier)
    }

    /// Scan a quoted string. The token text keeps the quotes and escapes.
    fn scan_string(&mut self, quote: char, start: Position) -> Result<TokenKind, TokenizerError> {
        self.advance(); // consume opening quote

        loop {
            match self.peek_char() {
                None | Some('\n') | Some('\r') => {
                    return Err(TokenizerError::new("Unterminated string", start));
                }
                Some('\\') => {
                    self.advance();
                    if let Some(c) = self.peek_char() {
                        if c != '\n' && c != '\r' {
                            self.advance();
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        Ok(TokenKind::StringLiteral)
    }

    /// Scan an integer or decimal literal.
    fn scan_number(&mut self) -> TokenKind {
        self.consume_digits();

        if self.peek_char() == Some('.')
            && self
                .peek_next_char()
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            self.advance(); // .
            self.consume_digits();
        }

        TokenKind::NumberLiteral
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip spaces and tabs. Line breaks are tokens.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' || c == '\r' || !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column, self.pos)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizerError> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================
