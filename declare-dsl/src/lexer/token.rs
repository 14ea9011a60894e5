//! Lexer token types

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// POSITIONS
// ============================================================================

/// A point in the source text.
///
/// `line` and `column` are 1-based, `offset` is the 0-based byte offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width span at a single position.
    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Span covering `self` through `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// TOKEN KINDS
// ============================================================================

/// Token kinds shared by every DeclareLang grammar.
///
/// Keywords are recognized globally; each parser decides whether a keyword is
/// structural in its grammar or just another word of a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    Identifier,
    NumberLiteral,
    StringLiteral,
    BooleanLiteral,

    // Structural symbols
    Colon,
    Comma,
    Dot,
    Dash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    PercentSign,

    // Comparison operators
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,

    // Connectives
    And,
    Or,
    For,
    With,
    To,
    Of,
    In,
    By,
    As,
    Is,
    Not,
    Each,
    Only,
    All,
    When,
    Via,
    Every,
    Per,
    From,
    On,

    // Schema
    Has,
    Many,
    Belongs,
    Text,
    Number,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Email,
    Url,
    Json,
    Uuid,
    Unique,
    Required,
    Optional,
    Indexed,
    Default,

    // Data manipulation
    Query,
    Mutation,
    Computed,
    Where,
    Sorted,
    Limited,
    Ascending,
    Descending,
    After,
    Before,
    Greater,
    Less,
    Than,
    At,
    Least,
    Most,
    Empty,
    Contains,
    Starts,
    Ends,
    Now,
    Ago,
    Today,
    Set,
    Increment,
    Decrement,
    Clear,
    Delete,
    Count,
    Sum,
    Average,
    Minimum,
    Maximum,

    // Time units
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,

    // Authorization
    Roles,
    Fields,
    Can,
    Anyone,
    Authenticated,
    Users,
    Own,
    Any,
    Read,
    Create,
    Update,
    Manage,

    // Validation
    Must,
    Be,
    Between,
    Characters,
    Contain,
    Match,
    Exist,
    Within,
    Valid,
    One,
    Rules,
    Cross,
    Business,
    Limits,

    // API
    Rate,
    Limit,
    Requests,
    Cors,
    Allow,
    Origins,
    Methods,
    Headers,
    Credentials,
    Pagination,
    Page,
    Size,
    Style,
    Parameters,
    Filter,
    Sort,
    Search,
    Response,
    Include,
    Exclude,
    Format,
    Security,
    Enable,
    Disable,
    Compression,
    Level,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,

    // Monitoring
    Track,
    Alerts,
    Monitor,
    Dashboard,
    Above,
    Below,
    Exceeds,
    Equals,
    Notify,
    Percent,
    Critical,
    Warning,
    Info,
    Interval,
    Retention,
    Sample,
    Show,
    Refresh,

    // Logging
    Log,
    Audit,
    Full,
    Data,
    Changed,
    Retain,
    Trace,
    Debug,
    Warn,
    Error,

    // Seed
    Random,
    Environment,
    Fixed,

    // Security
    Encrypt,
    Sanitize,
    Prevent,
    Require,
    Restrict,
    Using,

    // Special
    Newline,
    Comment,
    Eof,
}

/// Keyword spellings. The first spelling listed for a kind is its canonical
/// name in diagnostics.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("for", TokenKind::For),
    ("with", TokenKind::With),
    ("to", TokenKind::To),
    ("of", TokenKind::Of),
    ("in", TokenKind::In),
    ("by", TokenKind::By),
    ("as", TokenKind::As),
    ("is", TokenKind::Is),
    ("not", TokenKind::Not),
    ("each", TokenKind::Each),
    ("only", TokenKind::Only),
    ("all", TokenKind::All),
    ("when", TokenKind::When),
    ("via", TokenKind::Via),
    ("every", TokenKind::Every),
    ("per", TokenKind::Per),
    ("from", TokenKind::From),
    ("on", TokenKind::On),
    // Schema
    ("has", TokenKind::Has),
    ("many", TokenKind::Many),
    ("belongs", TokenKind::Belongs),
    ("text", TokenKind::Text),
    ("number", TokenKind::Number),
    ("integer", TokenKind::Integer),
    ("decimal", TokenKind::Decimal),
    ("boolean", TokenKind::Boolean),
    ("date", TokenKind::Date),
    ("timestamp", TokenKind::Timestamp),
    ("email", TokenKind::Email),
    ("url", TokenKind::Url),
    ("json", TokenKind::Json),
    ("uuid", TokenKind::Uuid),
    ("unique", TokenKind::Unique),
    ("required", TokenKind::Required),
    ("optional", TokenKind::Optional),
    ("indexed", TokenKind::Indexed),
    ("default", TokenKind::Default),
    // Data manipulation
    ("query", TokenKind::Query),
    ("mutation", TokenKind::Mutation),
    ("computed", TokenKind::Computed),
    ("where", TokenKind::Where),
    ("sorted", TokenKind::Sorted),
    ("limited", TokenKind::Limited),
    ("ascending", TokenKind::Ascending),
    ("descending", TokenKind::Descending),
    ("after", TokenKind::After),
    ("before", TokenKind::Before),
    ("greater", TokenKind::Greater),
    ("less", TokenKind::Less),
    ("than", TokenKind::Than),
    ("at", TokenKind::At),
    ("least", TokenKind::Least),
    ("most", TokenKind::Most),
    ("empty", TokenKind::Empty),
    ("contains", TokenKind::Contains),
    ("starts", TokenKind::Starts),
    ("ends", TokenKind::Ends),
    ("now", TokenKind::Now),
    ("ago", TokenKind::Ago),
    ("today", TokenKind::Today),
    ("set", TokenKind::Set),
    ("increment", TokenKind::Increment),
    ("decrement", TokenKind::Decrement),
    ("clear", TokenKind::Clear),
    ("delete", TokenKind::Delete),
    ("count", TokenKind::Count),
    ("sum", TokenKind::Sum),
    ("average", TokenKind::Average),
    ("minimum", TokenKind::Minimum),
    ("maximum", TokenKind::Maximum),
    // Time units
    ("ms", TokenKind::Millisecond),
    ("millisecond", TokenKind::Millisecond),
    ("milliseconds", TokenKind::Millisecond),
    ("second", TokenKind::Second),
    ("seconds", TokenKind::Second),
    ("minute", TokenKind::Minute),
    ("minutes", TokenKind::Minute),
    ("hour", TokenKind::Hour),
    ("hours", TokenKind::Hour),
    ("day", TokenKind::Day),
    ("days", TokenKind::Day),
    ("week", TokenKind::Week),
    ("weeks", TokenKind::Week),
    ("month", TokenKind::Month),
    ("months", TokenKind::Month),
    ("year", TokenKind::Year),
    ("years", TokenKind::Year),
    // Authorization
    ("roles", TokenKind::Roles),
    ("fields", TokenKind::Fields),
    ("can", TokenKind::Can),
    ("anyone", TokenKind::Anyone),
    ("authenticated", TokenKind::Authenticated),
    ("users", TokenKind::Users),
    ("own", TokenKind::Own),
    ("any", TokenKind::Any),
    ("read", TokenKind::Read),
    ("create", TokenKind::Create),
    ("update", TokenKind::Update),
    ("manage", TokenKind::Manage),
    // Validation
    ("must", TokenKind::Must),
    ("be", TokenKind::Be),
    ("between", TokenKind::Between),
    ("characters", TokenKind::Characters),
    ("contain", TokenKind::Contain),
    ("match", TokenKind::Match),
    ("exist", TokenKind::Exist),
    ("within", TokenKind::Within),
    ("valid", TokenKind::Valid),
    ("one", TokenKind::One),
    ("rules", TokenKind::Rules),
    ("cross", TokenKind::Cross),
    ("business", TokenKind::Business),
    ("limits", TokenKind::Limits),
    // API
    ("rate", TokenKind::Rate),
    ("limit", TokenKind::Limit),
    ("requests", TokenKind::Requests),
    ("cors", TokenKind::Cors),
    ("allow", TokenKind::Allow),
    ("origins", TokenKind::Origins),
    ("methods", TokenKind::Methods),
    ("headers", TokenKind::Headers),
    ("credentials", TokenKind::Credentials),
    ("pagination", TokenKind::Pagination),
    ("page", TokenKind::Page),
    ("size", TokenKind::Size),
    ("style", TokenKind::Style),
    ("parameters", TokenKind::Parameters),
    ("filter", TokenKind::Filter),
    ("sort", TokenKind::Sort),
    ("search", TokenKind::Search),
    ("response", TokenKind::Response),
    ("include", TokenKind::Include),
    ("exclude", TokenKind::Exclude),
    ("format", TokenKind::Format),
    ("security", TokenKind::Security),
    ("enable", TokenKind::Enable),
    ("disable", TokenKind::Disable),
    ("compression", TokenKind::Compression),
    ("level", TokenKind::Level),
    ("bytes", TokenKind::Bytes),
    ("kb", TokenKind::Kilobytes),
    ("mb", TokenKind::Megabytes),
    ("gb", TokenKind::Gigabytes),
    // Monitoring
    ("track", TokenKind::Track),
    ("alerts", TokenKind::Alerts),
    ("monitor", TokenKind::Monitor),
    ("dashboard", TokenKind::Dashboard),
    ("above", TokenKind::Above),
    ("below", TokenKind::Below),
    ("exceeds", TokenKind::Exceeds),
    ("equals", TokenKind::Equals),
    ("notify", TokenKind::Notify),
    ("percent", TokenKind::Percent),
    ("critical", TokenKind::Critical),
    ("warning", TokenKind::Warning),
    ("info", TokenKind::Info),
    ("interval", TokenKind::Interval),
    ("retention", TokenKind::Retention),
    ("sample", TokenKind::Sample),
    ("show", TokenKind::Show),
    ("refresh", TokenKind::Refresh),
    // Logging
    ("log", TokenKind::Log),
    ("audit", TokenKind::Audit),
    ("full", TokenKind::Full),
    ("data", TokenKind::Data),
    ("changed", TokenKind::Changed),
    ("retain", TokenKind::Retain),
    ("trace", TokenKind::Trace),
    ("debug", TokenKind::Debug),
    ("warn", TokenKind::Warn),
    ("error", TokenKind::Error),
    // Seed
    ("random", TokenKind::Random),
    ("environment", TokenKind::Environment),
    ("fixed", TokenKind::Fixed),
    // Security
    ("encrypt", TokenKind::Encrypt),
    ("sanitize", TokenKind::Sanitize),
    ("prevent", TokenKind::Prevent),
    ("require", TokenKind::Require),
    ("restrict", TokenKind::Restrict),
    ("using", TokenKind::Using),
];

static KEYWORD_LOOKUP: Lazy<HashMap<&'static str, TokenKind>> =
    Lazy::new(|| KEYWORDS.iter().copied().collect());

impl TokenKind {
    /// Classify a word as a keyword (case-insensitive).
    pub fn keyword(word: &str) -> Option<TokenKind> {
        if word.bytes().any(|b| b.is_ascii_uppercase()) {
            KEYWORD_LOOKUP.get(word.to_ascii_lowercase().as_str()).copied()
        } else {
            KEYWORD_LOOKUP.get(word).copied()
        }
    }

    /// All keyword spellings, in table order.
    pub fn keyword_spellings() -> impl Iterator<Item = (&'static str, TokenKind)> {
        KEYWORDS.iter().copied()
    }

    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier
                | TokenKind::NumberLiteral
                | TokenKind::StringLiteral
                | TokenKind::BooleanLiteral
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::Dash
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::Pipe
                | TokenKind::PercentSign
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Ge
                | TokenKind::Le
                | TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Newline
                | TokenKind::Comment
                | TokenKind::Eof
        )
    }

    /// Whether a token of this kind can be part of a multi-word phrase.
    pub fn is_word(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::NumberLiteral | TokenKind::BooleanLiteral
        ) || self.is_keyword()
    }

    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::NumberLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::BooleanLiteral => "boolean",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Dash => "'-'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Pipe => "'|'",
            TokenKind::PercentSign => "'%'",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::Ge => "'>='",
            TokenKind::Le => "'<='",
            TokenKind::Eq => "'='",
            TokenKind::Ne => "'!='",
            TokenKind::Newline => "end of line",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of input",
            keyword => KEYWORDS
                .iter()
                .find(|(_, kind)| *kind == keyword)
                .map(|(spelling, _)| *spelling)
                .unwrap_or("keyword"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_keyword() {
            write!(f, "'{}'", self.describe())
        } else {
            f.write_str(self.describe())
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// A token with its kind, literal text and source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Text exactly as written (quotes included for strings).
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind.is_word()
    }

    /// Case-insensitive comparison against the token text.
    pub fn is_text(&self, word: &str) -> bool {
        self.text.eq_ignore_ascii_case(word)
    }

    /// Whether this token ends exactly where `next` begins.
    pub fn touches(&self, next: &Token) -> bool {
        self.span.end.offset == next.span.start.offset
    }
}

/// Strip the surrounding quotes of a string token and resolve backslash
/// escapes.
pub fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    let quote = match chars.next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return raw.to_string(),
    };
    let inner: Vec<char> = chars.collect();
    let inner = match inner.last() {
        Some(last) if *last == quote => &inner[..inner.len() - 1],
        _ => &inner[..],
    };

    let mut value = String::with_capacity(inner.len());
    let mut iter = inner.iter();
    while let Some(&c) = iter.next() {
        if c == '\\' {
            match iter.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some(&other) => value.push(other),
                None => value.push('\\'),
            }
        } else {
            value.push(c);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(TokenKind::keyword("has"), Some(TokenKind::Has));
        assert_eq!(TokenKind::keyword("Query"), Some(TokenKind::Query));
        assert_eq!(TokenKind::keyword("CORS"), Some(TokenKind::Cors));
        assert_eq!(TokenKind::keyword("Post"), None);
    }

    #[test]
    fn test_time_unit_spellings_share_a_kind() {
        assert_eq!(TokenKind::keyword("day"), Some(TokenKind::Day));
        assert_eq!(TokenKind::keyword("days"), Some(TokenKind::Day));
        assert_eq!(TokenKind::keyword("ms"), Some(TokenKind::Millisecond));
        assert_eq!(TokenKind::Millisecond.describe(), "ms");
    }

    #[test]
    fn test_keywords_are_words() {
        assert!(TokenKind::Where.is_word());
        assert!(TokenKind::Identifier.is_word());
        assert!(TokenKind::NumberLiteral.is_word());
        assert!(!TokenKind::Colon.is_word());
        assert!(!TokenKind::StringLiteral.is_word());
        assert!(!TokenKind::Newline.is_word());
    }

    #[test]
    fn test_describe_for_diagnostics() {
        assert_eq!(TokenKind::Colon.to_string(), "':'");
        assert_eq!(TokenKind::Has.to_string(), "'has'");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("'single'"), "single");
        assert_eq!(unquote(r#""escaped \"quote\"""#), "escaped \"quote\"");
        assert_eq!(unquote(r"'it\'s'"), "it's");
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(Position::new(1, 1, 0), Position::new(1, 5, 4));
        let b = Span::new(Position::new(2, 1, 10), Position::new(2, 3, 12));
        let merged = a.to(b);
        assert_eq!(merged.start.offset, 0);
        assert_eq!(merged.end.offset, 12);
        assert_eq!(merged.len(), 12);
    }
}
