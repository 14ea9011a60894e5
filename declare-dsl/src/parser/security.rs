//! Security (`security.dsl`) parser.
//!
//! Rules are free text. Each line is kept whole as the description and a few
//! leading words are read out of it; touching tokens (`user.password`,
//! `AES-256`) count as one word.

use super::cursor::{Phrase, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::identifier::normalize_identifier;
use crate::lexer::{Span, Token, TokenKind};

pub struct SecurityParser {
    cursor: TokenCursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Encrypt,
    Sanitize,
    Prevent,
    Require,
    Restrict,
}

impl SectionKind {
    fn of(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Encrypt => Some(SectionKind::Encrypt),
            TokenKind::Sanitize => Some(SectionKind::Sanitize),
            TokenKind::Prevent => Some(SectionKind::Prevent),
            TokenKind::Require => Some(SectionKind::Require),
            TokenKind::Restrict => Some(SectionKind::Restrict),
            _ => None,
        }
    }
}

/// Words that end the field of an Encrypt or Sanitize rule.
const FIELD_CONNECTORS: &[TokenKind] = &[
    TokenKind::Using,
    TokenKind::For,
    TokenKind::With,
    TokenKind::In,
    TokenKind::On,
    TokenKind::To,
];

impl GrammarParser for SecurityParser {
    type Output = SecurityAst;
    const GRAMMAR: Grammar = Grammar::Security;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<SecurityAst, ParseError> {
        let mut ast = SecurityAst::default();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            let Some(kind) = SectionKind::of(self.cursor.kind()) else {
                return Err(self.cursor.error(
                    "Expected security section (Encrypt, Sanitize, Prevent, Require or Restrict)",
                ));
            };
            let header = self.cursor.bump();
            self.cursor.expect_header_end("after section name")?;

            let mut count = 0;
            while let Some(item_start) = self.cursor.next_item(count, &header.text)? {
                let words = self.cursor.rest_of_line();
                let Some(line) = Phrase::from_adjacent(&words) else {
                    return Err(self.cursor.error("Expected rule text"));
                };
                let rule = Rule {
                    units: units(&words),
                    description: line.text,
                    span: Span::new(item_start, line.span.end),
                };
                match kind {
                    SectionKind::Encrypt => ast.encryption.push(rule.encryption()),
                    SectionKind::Sanitize => ast.sanitization.push(rule.sanitization()),
                    SectionKind::Prevent => ast.threats.push(rule.threat()),
                    SectionKind::Require => ast.requirements.push(rule.requirement()),
                    SectionKind::Restrict => ast.restrictions.push(rule.restriction()),
                }
                count += 1;
                self.cursor.expect_line_end()?;
            }
            if count == 0 {
                return Err(self
                    .cursor
                    .error(format!("Section '{}' has no items", header.text)));
            }
            tracing::trace!(section = %header.text, rules = count, "parsed security section");
        }
        Ok(ast)
    }
}

/// Punctuation stripped from both ends of a unit before it joins a field.
const FIELD_TRIM: &[char] = &['.', ',', ':', '(', ')', '"', '\''];

/// A run of touching tokens.
struct Unit {
    text: String,
    /// Keyword kind when the unit is a single token.
    kind: Option<TokenKind>,
}

fn units(tokens: &[Token]) -> Vec<Unit> {
    let mut groups: Vec<Vec<Token>> = Vec::new();
    for token in tokens {
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|prev| prev.touches(token)) => {
                group.push(token.clone())
            }
            _ => groups.push(vec![token.clone()]),
        }
    }
    groups
        .into_iter()
        .filter_map(|group| {
            let kind = (group.len() == 1).then(|| group[0].kind);
            let phrase = Phrase::from_adjacent(&group)?;
            Some(Unit {
                text: phrase.text,
                kind,
            })
        })
        .collect()
}

/// One security rule line split into units.
struct Rule {
    units: Vec<Unit>,
    description: String,
    span: Span,
}

impl Rule {
    fn position_of(&self, stops: &[TokenKind]) -> Option<usize> {
        self.units
            .iter()
            .position(|u| u.kind.is_some_and(|k| stops.contains(&k)))
    }

    fn text(&self, range: std::ops::Range<usize>) -> Option<String> {
        let words: Vec<&str> = self.units[range].iter().map(|u| u.text.as_str()).collect();
        (!words.is_empty()).then(|| words.join(" "))
    }

    fn after(&self, connector: TokenKind) -> Option<String> {
        let at = self.position_of(&[connector])?;
        self.text(at + 1..self.units.len())
    }

    /// Split at the first of `stops`: the text before it and the text after.
    fn split(&self, stops: &[TokenKind]) -> (String, Option<String>) {
        match self.position_of(stops) {
            Some(at) if at > 0 => (
                self.text(0..at).unwrap_or_default(),
                self.text(at + 1..self.units.len()),
            ),
            _ => (self.description.clone(), None),
        }
    }

    /// The first one or two units before a connector, normalized. A unit
    /// ending in `,` or `.` closes the field, and dotted paths are
    /// normalized segment by segment. When no identifier can be made the
    /// leading words of the description stand in.
    fn field(&self) -> String {
        self.field_name().unwrap_or_else(|| self.description_words())
    }

    fn field_name(&self) -> Option<String> {
        let end = self
            .position_of(FIELD_CONNECTORS)
            .unwrap_or(self.units.len())
            .clamp(1, 2)
            .min(self.units.len());
        let mut words = Vec::new();
        for unit in &self.units[..end] {
            let word = unit.text.trim_matches(FIELD_TRIM);
            if !word.is_empty() {
                words.push(word);
            }
            if unit.text.ends_with([',', '.']) {
                break;
            }
        }

        let first = *words.first()?;
        if first.contains('.') {
            let segments = first
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(|segment| normalize_identifier(segment).ok())
                .collect::<Option<Vec<_>>>()?;
            return (!segments.is_empty()).then(|| segments.join("."));
        }
        normalize_identifier(&words.join(" ")).ok()
    }

    fn description_words(&self) -> String {
        let words: Vec<String> = self
            .description
            .split_whitespace()
            .map(|word| {
                word.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect::<String>()
            })
            .filter(|word| !word.is_empty())
            .take(2)
            .collect();
        if words.is_empty() {
            self.description.clone()
        } else {
            words.join("_")
        }
    }

    fn encryption(self) -> EncryptionRule {
        let field = self.field();
        let method = self
            .position_of(&[TokenKind::Using])
            .and_then(|at| self.units.get(at + 1))
            .map(|u| u.text.clone());
        EncryptionRule {
            description: self.description,
            field,
            method,
            span: self.span,
        }
    }

    fn sanitization(self) -> SanitizationRule {
        let field = self.field();
        let context = self.after(TokenKind::For);
        SanitizationRule {
            description: self.description,
            field,
            context,
            span: self.span,
        }
    }

    fn threat(self) -> ThreatRule {
        let (threat, scope) = self.split(&[TokenKind::On, TokenKind::In, TokenKind::For]);
        ThreatRule {
            description: self.description,
            threat,
            scope,
            span: self.span,
        }
    }

    fn requirement(self) -> RequirementRule {
        let (requirement, scope) = self.split(&[TokenKind::For]);
        RequirementRule {
            description: self.description,
            requirement,
            scope,
            span: self.span,
        }
    }

    fn restriction(self) -> RestrictionRule {
        let (subject, scope) = self.split(&[TokenKind::To]);
        RestrictionRule {
            description: self.description,
            subject,
            scope,
            span: self.span,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
