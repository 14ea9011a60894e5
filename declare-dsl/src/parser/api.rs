//! API configuration (`api.dsl`) parser.

use super::cursor::{Phrase, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{unquote, Position, Token, TokenKind};

pub struct ApiParser {
    cursor: TokenCursor,
}

impl GrammarParser for ApiParser {
    type Output = ApiAst;
    const GRAMMAR: Grammar = Grammar::Api;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<ApiAst, ParseError> {
        let mut ast = ApiAst::default();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            self.parse_section(&mut ast)?;
        }
        Ok(ast)
    }
}

impl ApiParser {
    fn parse_section(&mut self, ast: &mut ApiAst) -> Result<(), ParseError> {
        let start = self.cursor.start();
        let next = self.cursor.peek_at(1).kind;
        match self.cursor.kind() {
            TokenKind::Rate if next == TokenKind::Limit => {
                self.cursor.advance();
                self.cursor.advance();
                let model_name = self.optional_model()?;
                self.cursor.expect_header_end("after 'Rate limit'")?;
                let label = scoped_label("Rate limit", &model_name);
                let limits = self.items(&label, Self::parse_rate_limit)?;
                ast.rate_limits.push(RateLimitSection {
                    model_name,
                    limits,
                    span: self.cursor.span_from(start),
                });
            }
            TokenKind::Cors => {
                self.cursor.advance();
                self.cursor.expect_header_end("after 'CORS'")?;
                let rules = self.spanned_items("CORS", Self::parse_cors_rule)?;
                let span = self.cursor.span_from(start);
                // A repeated block appends its rules; the span stays on the first
                // block so it never encloses the sections in between.
                match &mut ast.cors {
                    Some(cors) => {
                        cors.rules.extend(rules);
                    }
                    None => ast.cors = Some(CorsConfig { rules, span }),
                }
            }
            TokenKind::Pagination => {
                self.cursor.advance();
                let model_name = self.optional_model()?;
                self.cursor.expect_header_end("after 'Pagination'")?;
                let label = scoped_label("Pagination", &model_name);
                let settings = self.spanned_items(&label, Self::parse_pagination_setting)?;
                ast.pagination.push(PaginationSection {
                    model_name,
                    settings,
                    span: self.cursor.span_from(start),
                });
            }
            TokenKind::Query if next == TokenKind::Parameters => {
                self.cursor.advance();
                self.cursor.advance();
                self.cursor.expect(TokenKind::For, "after 'Query parameters'")?;
                let model_name = self.cursor.model_reference(&[TokenKind::Colon])?;
                self.cursor.expect_header_end("after model name")?;
                let label = format!("Query parameters for {}", model_name);
                let parameters = self.items(&label, Self::parse_query_parameter)?;
                ast.query_parameters.push(QueryParameterSection {
                    model_name,
                    parameters,
                    span: self.cursor.span_from(start),
                });
            }
            TokenKind::Response => {
                self.cursor.advance();
                self.cursor.expect_header_end("after 'Response'")?;
                let rules = self.spanned_items("Response", Self::parse_response_rule)?;
                let span = self.cursor.span_from(start);
                match &mut ast.response {
                    Some(response) => {
                        response.rules.extend(rules);
                    }
                    None => ast.response = Some(ResponseConfig { rules, span }),
                }
            }
            TokenKind::Security if next == TokenKind::Headers => {
                self.cursor.advance();
                self.cursor.advance();
                self.cursor.expect_header_end("after 'Security headers'")?;
                let rules = self.spanned_items("Security headers", Self::parse_security_header)?;
                let span = self.cursor.span_from(start);
                match &mut ast.security_headers {
                    Some(headers) => {
                        headers.rules.extend(rules);
                    }
                    None => ast.security_headers = Some(SecurityHeadersConfig { rules, span }),
                }
            }
            TokenKind::Compression => {
                self.cursor.advance();
                self.cursor.expect_header_end("after 'Compression'")?;
                let rules = self.spanned_items("Compression", Self::parse_compression_rule)?;
                let span = self.cursor.span_from(start);
                match &mut ast.compression {
                    Some(compression) => {
                        compression.rules.extend(rules);
                    }
                    None => ast.compression = Some(CompressionConfig { rules, span }),
                }
            }
            TokenKind::Size if next == TokenKind::Limits => {
                self.cursor.advance();
                self.cursor.advance();
                self.cursor.expect_header_end("after 'Size limits'")?;
                let limits = self.items("Size limits", Self::parse_size_limit)?;
                let span = self.cursor.span_from(start);
                match &mut ast.size_limits {
                    Some(sizes) => {
                        sizes.limits.extend(limits);
                    }
                    None => ast.size_limits = Some(SizeLimitsConfig { limits, span }),
                }
            }
            _ => {
                return Err(self.cursor.error(
                    "Expected API section (Rate limit, CORS, Pagination, Query parameters, \
                     Response, Security headers, Compression or Size limits)",
                ))
            }
        }
        Ok(())
    }

    /// `for MODEL` before the header colon, if present.
    fn optional_model(&mut self) -> Result<Option<String>, ParseError> {
        if self.cursor.eat(TokenKind::For) {
            Ok(Some(self.cursor.model_reference(&[TokenKind::Colon])?))
        } else {
            Ok(None)
        }
    }

    /// Parse the `-` items of a section with `item`, requiring at least one.
    fn items<T, F>(&mut self, section: &str, mut item: F) -> Result<Vec<T>, ParseError>
    where
        F: FnMut(&mut Self, Position) -> Result<T, ParseError>,
    {
        let mut items = Vec::new();
        while let Some(item_start) = self.cursor.next_item(items.len(), section)? {
            items.push(item(self, item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&items, section)?;
        tracing::trace!(section = %section, items = items.len(), "parsed API section");
        Ok(items)
    }

    /// Like [`Self::items`] for item kinds that do not carry their own span.
    fn spanned_items<T, F>(&mut self, section: &str, mut item: F) -> Result<Vec<Spanned<T>>, ParseError>
    where
        F: FnMut(&mut Self) -> Result<T, ParseError>,
    {
        self.items(section, |parser: &mut Self, start| {
            let node = item(parser)?;
            Ok(Spanned::new(node, parser.cursor.span_from(start)))
        })
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// `N requests per <unit> [for <scope>]`
    fn parse_rate_limit(&mut self, start: Position) -> Result<RateLimit, ParseError> {
        let requests = self.cursor.positive_integer("Request count")?;
        self.cursor.expect(TokenKind::Requests, "after request count")?;
        self.cursor.expect(TokenKind::Per, "after 'requests'")?;
        let period = self.cursor.expect_time_unit()?;
        let scope = if self.cursor.eat(TokenKind::For) {
            Some(self.cursor.name(&[], "rate limit scope")?.text)
        } else {
            None
        };
        Ok(RateLimit {
            requests,
            period,
            scope,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_cors_rule(&mut self) -> Result<CorsRule, ParseError> {
        if self.cursor.eat(TokenKind::Allow) {
            return match self.cursor.kind() {
                TokenKind::Origins => {
                    self.cursor.advance();
                    Ok(CorsRule::AllowOrigins {
                        origins: self.value_list("origin")?,
                    })
                }
                TokenKind::Methods => {
                    self.cursor.advance();
                    Ok(CorsRule::AllowMethods {
                        methods: self.http_methods()?,
                    })
                }
                TokenKind::Headers => {
                    self.cursor.advance();
                    Ok(CorsRule::AllowHeaders {
                        headers: self.value_list("header")?,
                    })
                }
                TokenKind::Credentials => {
                    self.cursor.advance();
                    Ok(CorsRule::AllowCredentials)
                }
                _ => Err(self.cursor.error(
                    "Expected 'origins', 'methods', 'headers' or 'credentials' after 'allow'",
                )),
            };
        }
        if self.cursor.eat_word("max") {
            self.cursor.expect_word("age", "after 'max'")?;
            return Ok(CorsRule::MaxAge {
                age: self.cursor.time_amount("max age")?,
            });
        }
        Err(self.cursor.error("Expected 'allow' or 'max age'"))
    }

    fn http_methods(&mut self) -> Result<Vec<HttpMethod>, ParseError> {
        let mut methods = Vec::new();
        loop {
            let token = self.cursor.current().clone();
            let method = token
                .is_word()
                .then(|| HttpMethod::from_word(&token.text))
                .flatten()
                .ok_or_else(|| self.cursor.error("Expected HTTP method"))?;
            self.cursor.advance();
            if !methods.contains(&method) {
                methods.push(method);
            }
            if !self.list_separator() {
                return Ok(methods);
            }
        }
    }

    fn parse_pagination_setting(&mut self) -> Result<PaginationSetting, ParseError> {
        if self.cursor.eat(TokenKind::Default) {
            self.page_size_keywords()?;
            return Ok(PaginationSetting::DefaultPageSize {
                size: self.cursor.positive_integer("Page size")?,
            });
        }
        if self.cursor.eat(TokenKind::Maximum) || self.cursor.eat_word("max") {
            self.page_size_keywords()?;
            return Ok(PaginationSetting::MaxPageSize {
                size: self.cursor.positive_integer("Page size")?,
            });
        }
        if self.cursor.eat(TokenKind::Style) {
            let style = if self.cursor.eat_word("cursor") {
                PaginationStyle::Cursor
            } else if self.cursor.eat_word("offset") {
                PaginationStyle::Offset
            } else if self.cursor.eat(TokenKind::Page) {
                PaginationStyle::Page
            } else {
                return Err(self
                    .cursor
                    .error("Expected pagination style (cursor, offset or page)"));
            };
            return Ok(PaginationSetting::Style { style });
        }
        Err(self
            .cursor
            .error("Expected 'default page size', 'maximum page size' or 'style'"))
    }

    fn page_size_keywords(&mut self) -> Result<(), ParseError> {
        self.cursor.expect(TokenKind::Page, "in page size setting")?;
        self.cursor.expect(TokenKind::Size, "after 'page'")?;
        Ok(())
    }

    fn parse_query_parameter(&mut self, start: Position) -> Result<QueryParameter, ParseError> {
        let kind = match self.cursor.kind() {
            TokenKind::Filter => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::By, "after 'filter'")?;
                QueryParameterKind::Filter
            }
            TokenKind::Sort => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::By, "after 'sort'")?;
                QueryParameterKind::Sort
            }
            TokenKind::Search => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::In, "after 'search'")?;
                QueryParameterKind::Search
            }
            _ => {
                return Err(self
                    .cursor
                    .error("Expected 'filter by', 'sort by' or 'search in'"))
            }
        };
        let fields = self.cursor.name_list(&[], "field name")?;
        Ok(QueryParameter {
            kind,
            fields,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_response_rule(&mut self) -> Result<ResponseRule, ParseError> {
        if self.cursor.eat_word("envelope") {
            return Ok(ResponseRule::Envelope {
                name: self.cursor.name(&[], "envelope name")?.text,
            });
        }
        match self.cursor.kind() {
            TokenKind::Include => {
                self.cursor.advance();
                Ok(ResponseRule::Include {
                    field: self.cursor.name(&[], "field name")?.text,
                })
            }
            TokenKind::Exclude => {
                self.cursor.advance();
                Ok(ResponseRule::Exclude {
                    field: self.cursor.name(&[], "field name")?.text,
                })
            }
            TokenKind::Format => {
                self.cursor.advance();
                let format = if self.cursor.eat(TokenKind::Json) {
                    ResponseFormat::Json
                } else if self.cursor.eat_word("xml") {
                    ResponseFormat::Xml
                } else {
                    return Err(self.cursor.error("Expected response format (json or xml)"));
                };
                Ok(ResponseRule::Format { format })
            }
            _ => Err(self
                .cursor
                .error("Expected 'include', 'exclude', 'format' or 'envelope'")),
        }
    }

    fn parse_security_header(&mut self) -> Result<SecurityHeaderRule, ParseError> {
        if self.cursor.eat(TokenKind::Enable) {
            return Ok(SecurityHeaderRule::Enable {
                header: self.header_name()?,
            });
        }
        if self.cursor.eat(TokenKind::Disable) {
            return Ok(SecurityHeaderRule::Disable {
                header: self.header_name()?,
            });
        }
        let header = self.header_name()?;
        self.cursor.eat(TokenKind::Colon);
        let value = if self.cursor.check(TokenKind::StringLiteral) {
            unquote(&self.cursor.bump().text)
        } else {
            let words = self.cursor.rest_of_line();
            Phrase::from_adjacent(&words)
                .ok_or_else(|| self.cursor.error(format!("Expected value for header '{}'", header)))?
                .text
        };
        Ok(SecurityHeaderRule::Set { header, value })
    }

    /// A header name as written: a string, or words joined by `-`
    /// (`X-Frame-Options`, `strict transport security`).
    fn header_name(&mut self) -> Result<String, ParseError> {
        if self.cursor.check(TokenKind::StringLiteral) {
            return Ok(unquote(&self.cursor.bump().text));
        }
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let token = self.cursor.current();
            let continues_name = match tokens.last() {
                None => token.is_word(),
                Some(prev) if prev.kind == TokenKind::Dash => {
                    token.is_word() && prev.touches(token)
                }
                Some(prev) => {
                    (token.kind == TokenKind::Dash && prev.touches(token)) || token.is_word()
                }
            };
            if !continues_name {
                break;
            }
            tokens.push(self.cursor.bump());
        }
        Phrase::from_adjacent(&tokens)
            .map(|p| p.text)
            .ok_or_else(|| self.cursor.error("Expected header name"))
    }

    fn parse_compression_rule(&mut self) -> Result<CompressionRule, ParseError> {
        if self.cursor.eat(TokenKind::Enable) {
            let mut algorithms = Vec::new();
            loop {
                let algorithm = if self.cursor.eat_word("gzip") {
                    CompressionAlgorithm::Gzip
                } else if self.cursor.eat_word("brotli") {
                    CompressionAlgorithm::Brotli
                } else if self.cursor.eat_word("deflate") {
                    CompressionAlgorithm::Deflate
                } else {
                    return Err(self
                        .cursor
                        .error("Expected compression algorithm (gzip, brotli or deflate)"));
                };
                if !algorithms.contains(&algorithm) {
                    algorithms.push(algorithm);
                }
                if !self.list_separator() {
                    return Ok(CompressionRule::Enable { algorithms });
                }
            }
        }
        if self.cursor.eat(TokenKind::Minimum) {
            self.cursor.expect(TokenKind::Size, "after 'minimum'")?;
            return Ok(CompressionRule::MinimumSize {
                bytes: self.byte_size()?,
            });
        }
        if self.cursor.eat(TokenKind::Level) {
            let start = self.cursor.start();
            let level = self.cursor.integer("compression level")?;
            if !(1..=11).contains(&level) {
                return Err(self.cursor.error_at(
                    format!("Compression level must be between 1 and 11, got {}", level),
                    start,
                ));
            }
            return Ok(CompressionRule::Level { level });
        }
        Err(self
            .cursor
            .error("Expected 'enable', 'minimum size' or 'level'"))
    }

    /// `maximum <target> N <size unit>`
    fn parse_size_limit(&mut self, start: Position) -> Result<SizeLimit, ParseError> {
        if !(self.cursor.eat(TokenKind::Maximum) || self.cursor.eat_word("max")) {
            return Err(self.cursor.error("Expected 'maximum'"));
        }
        let target = self
            .cursor
            .name(&[TokenKind::NumberLiteral], "size limit target")?;
        let bytes = self.byte_size()?;
        Ok(SizeLimit {
            target: target.text,
            bytes,
            span: self.cursor.span_from(start),
        })
    }

    /// `N bytes|KB|MB|GB` in bytes, binary multiples.
    fn byte_size(&mut self) -> Result<u64, ParseError> {
        let amount = self.cursor.integer("size")?;
        let multiplier: u64 = match self.cursor.kind() {
            TokenKind::Bytes => 1,
            TokenKind::Kilobytes => 1 << 10,
            TokenKind::Megabytes => 1 << 20,
            TokenKind::Gigabytes => 1 << 30,
            _ => return Err(self.cursor.error("Expected size unit (bytes, KB, MB or GB)")),
        };
        self.cursor.advance();
        Ok(amount.saturating_mul(multiplier))
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Consume a `,` / `and` list separator (Oxford comma allowed).
    fn list_separator(&mut self) -> bool {
        if self.cursor.eat(TokenKind::Comma) {
            self.cursor.eat(TokenKind::And);
            true
        } else {
            self.cursor.eat(TokenKind::And)
        }
    }

    /// Strings or single words separated by `,` / `and`.
    fn value_list(&mut self, what: &str) -> Result<Vec<String>, ParseError> {
        let mut values = Vec::new();
        loop {
            let value = if self.cursor.check(TokenKind::StringLiteral) {
                unquote(&self.cursor.bump().text)
            } else if self.cursor.current().is_word() {
                self.cursor.bump().text
            } else {
                return Err(self.cursor.error(format!("Expected {}", what)));
            };
            values.push(value);
            if !self.list_separator() {
                return Ok(values);
            }
        }
    }
}

fn scoped_label(section: &str, model_name: &Option<String>) -> String {
    match model_name {
        Some(model) => format!("{} for {}", section, model),
        None => section.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<ApiAst, ParseError> {
        ApiParser::new(tokenize(source).unwrap()).parse()
    }

    #[test]
    fn test_empty_input_is_empty_ast() {
        assert_eq!(parse("\n\n").unwrap(), ApiAst::default());
    }

    #[test]
    fn test_rate_limits() {
        let source = "\
Rate limit:
- 1000 requests per hour
- 10 requests per second for anonymous users

Rate limit for Post[s]:
- 50 requests per minute
";
        let ast = parse(source).unwrap();
        assert_eq!(ast.rate_limits.len(), 2);
        let global = &ast.rate_limits[0];
        assert_eq!(global.model_name, None);
        assert_eq!(global.limits[0].requests, 1000);
        assert_eq!(global.limits[0].period, TimeUnit::Hours);
        assert_eq!(global.limits[1].scope.as_deref(), Some("anonymous_users"));
        assert_eq!(ast.rate_limits[1].model_name.as_deref(), Some("Post"));
    }

    #[test]
    fn test_cors() {
        let source = "\
CORS:
- allow origins \"https://example.com\", \"https://app.example.com\"
- allow methods GET, POST and DELETE
- allow headers \"Content-Type\", \"Authorization\"
- allow credentials
- max age 1 hour
";
        let cors = parse(source).unwrap().cors.unwrap();
        let rules: Vec<&CorsRule> = cors.rules.iter().map(|r| &r.node).collect();
        assert_eq!(
            rules[0],
            &CorsRule::AllowOrigins {
                origins: vec!["https://example.com".into(), "https://app.example.com".into()]
            }
        );
        assert_eq!(
            rules[1],
            &CorsRule::AllowMethods {
                methods: vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete]
            }
        );
        assert_eq!(rules[3], &CorsRule::AllowCredentials);
        assert_eq!(
            rules[4],
            &CorsRule::MaxAge {
                age: TimeAmount::new(1, TimeUnit::Hours)
            }
        );
    }

    #[test]
    fn test_unknown_http_method() {
        let err = parse("CORS:\n- allow methods GET, FETCH\n").unwrap_err();
        assert_eq!(err.message, "Expected HTTP method, found 'FETCH'");
        assert_eq!((err.position.line, err.position.column), (2, 22));
    }

    #[test]
    fn test_repeated_global_section_appends() {
        let source = "\
CORS:
- allow credentials

Compression:
- enable gzip

CORS:
- max age 10 minutes
";
        let ast = parse(source).unwrap();
        let cors = ast.cors.unwrap();
        let compression = ast.compression.unwrap();
        assert_eq!(cors.rules.len(), 2);
        assert_eq!((cors.span.start.line, cors.span.end.line), (1, 2));
        assert_eq!(cors.rules[1].span.start.line, 8);
        assert!(cors.span.end.offset <= compression.span.start.offset);
    }

    #[test]
    fn test_pagination_and_query_parameters() {
        let source = "\
Pagination for Post[s]:
- default page size 20
- maximum page size 100
- style cursor

Query parameters for Post[s]:
- filter by status, author and created at
- sort by created at
- search in title
";
        let ast = parse(source).unwrap();
        let pagination = &ast.pagination[0];
        assert_eq!(pagination.model_name.as_deref(), Some("Post"));
        assert_eq!(
            pagination.settings[0].node,
            PaginationSetting::DefaultPageSize { size: 20 }
        );
        assert_eq!(
            pagination.settings[1].node,
            PaginationSetting::MaxPageSize { size: 100 }
        );
        assert_eq!(
            pagination.settings[2].node,
            PaginationSetting::Style {
                style: PaginationStyle::Cursor
            }
        );

        let params = &ast.query_parameters[0];
        assert_eq!(params.parameters[0].kind, QueryParameterKind::Filter);
        assert_eq!(
            params.parameters[0].fields,
            vec!["status", "author", "created_at"]
        );
        assert_eq!(params.parameters[2].kind, QueryParameterKind::Search);
    }

    #[test]
    fn test_response_headers_compression_and_sizes() {
        let source = "\
Response:
- exclude password hash
- format json
- envelope data

Security headers:
- enable HSTS
- X-Frame-Options: DENY
- Content-Security-Policy: \"default-src 'self'\"

Compression:
- enable gzip and brotli
- minimum size 1 KB
- level 6

Size limits:
- maximum request body 10 MB
- maximum upload 2 GB
";
        let ast = parse(source).unwrap();
        let response = ast.response.unwrap();
        assert_eq!(
            response.rules[0].node,
            ResponseRule::Exclude {
                field: "password_hash".into()
            }
        );
        assert_eq!(
            response.rules[1].node,
            ResponseRule::Format {
                format: ResponseFormat::Json
            }
        );

        let headers = ast.security_headers.unwrap();
        assert_eq!(
            headers.rules[0].node,
            SecurityHeaderRule::Enable {
                header: "HSTS".into()
            }
        );
        assert_eq!(
            headers.rules[1].node,
            SecurityHeaderRule::Set {
                header: "X-Frame-Options".into(),
                value: "DENY".into()
            }
        );
        assert_eq!(
            headers.rules[2].node,
            SecurityHeaderRule::Set {
                header: "Content-Security-Policy".into(),
                value: "default-src 'self'".into()
            }
        );

        let compression = ast.compression.unwrap();
        assert_eq!(
            compression.rules[0].node,
            CompressionRule::Enable {
                algorithms: vec![CompressionAlgorithm::Gzip, CompressionAlgorithm::Brotli]
            }
        );
        assert_eq!(
            compression.rules[1].node,
            CompressionRule::MinimumSize { bytes: 1024 }
        );

        let sizes = ast.size_limits.unwrap();
        assert_eq!(sizes.limits[0].target, "request_body");
        assert_eq!(sizes.limits[0].bytes, 10 * 1024 * 1024);
        assert_eq!(sizes.limits[1].bytes, 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("Caching:\n- enable\n").unwrap_err();
        assert!(err.message.starts_with("Expected API section"));
        assert_eq!(err.position.line, 1);
    }

    #[test]
    fn test_zero_requests_rejected() {
        let err = parse("Rate limit:\n- 0 requests per hour\n").unwrap_err();
        assert_eq!(err.message, "Request count must be greater than zero");
    }
}
