//! DeclareLang Test Utilities
//!
//! Shared test infrastructure for the DeclareLang workspace:
//! - Fixtures: one representative source per grammar
//! - Proptest generators for identifier phrases, model names and documents
//! - Span and error assertions
//! - A tracing initializer for tests

pub use declare_dsl::{
    DslError, Grammar, ParseError, Position, Span, Token, TokenKind, TokenizerError,
};

use std::sync::Once;

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a `fmt` subscriber honoring `RUST_LOG` for the test binary.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("declare_dsl=warn"));
        // Another harness may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Representative sources, one per grammar.

    use super::Grammar;

    pub const SCHEMA: &str = "\
User[s]:
- has email as unique email and required
- has name as text
- has created at as timestamp default now
- has many Post[s]

Post[s]:
- has title as required text
- has published as boolean default false
- belongs to User
";

    pub const DML: &str = "\
Query for Post:
- recent posts where created at is after 7 days ago sorted by created at descending limited to 20
- drafts where published is false

Mutation for Post:
- publish: set published to true and set published at to now

Computed for User:
- post count: count of posts where published is true
";

    pub const AUTH: &str = "\
Roles:
- admin: full access
- editor

Post[s]:
- anyone can read posts
- users can update and delete own posts
- admins can manage all posts

Fields for User:
- only admins can update role
- users can read their own email
";

    pub const VALIDATION: &str = "\
User:
- email must be a valid email
- username must be between 3 and 20 characters long
- password must contain an uppercase letter

Cross-field rules for Event:
- ends at must be after starts at

Rate limits for User:
- login limited to 5 times per minute

Business rules for Order:
- Orders over 1000 need manual approval
";

    pub const API: &str = "\
Rate limit:
- 1000 requests per hour

CORS:
- allow origins \"https://example.com\"
- allow methods GET, POST
- allow credentials

Pagination for Post[s]:
- default page size 20
- style cursor

Query parameters for Post[s]:
- filter by status and author

Response:
- exclude password hash

Security headers:
- X-Frame-Options: DENY

Compression:
- enable gzip

Size limits:
- maximum request body 10 MB
";

    pub const MONITOR: &str = "\
Track:
- response time

Alerts:
- critical when error rate is above 5% for 5 minutes notify on call via pagerduty

Monitor:
- check interval 30 seconds

Dashboard \"Overview\":
- show response time as line chart
";

    pub const LOG: &str = "\
Log for Order[s]:
- create and update with full data
- payment failed

Audit for User[s]:
- update with email, role
- retain for 7 years

Log level debug for:
- payments

Exclude:
- password
";

    pub const SEED: &str = "\
User[s]:
- admin@example.com with role admin
- 10 random users with name, email

Environment development:
- 20 random Post[s] with title, body with fixed status \"draft\" for each User
";

    pub const SECURITY: &str = "\
Encrypt:
- user passwords using bcrypt

Sanitize:
- comment body for HTML

Prevent:
- SQL injection on all queries

Require:
- two-factor authentication for admins

Restrict:
- admin panel to internal network
";

    /// The fixture for `grammar`.
    pub fn source_for(grammar: Grammar) -> &'static str {
        match grammar {
            Grammar::Schema => SCHEMA,
            Grammar::Dml => DML,
            Grammar::Auth => AUTH,
            Grammar::Validation => VALIDATION,
            Grammar::Api => API,
            Grammar::Monitor => MONITOR,
            Grammar::Log => LOG,
            Grammar::Seed => SEED,
            Grammar::Security => SECURITY,
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for DeclareLang inputs.

    use proptest::prelude::*;

    /// A lowercase word that is not a keyword.
    pub fn arb_plain_word() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,8}".prop_filter("keywords are not plain words", |w| {
            declare_dsl::TokenKind::keyword(w).is_none() && w != "true" && w != "false"
        })
    }

    /// One to four plain words joined by spaces or hyphens.
    pub fn arb_identifier_phrase() -> impl Strategy<Value = String> {
        prop::collection::vec((arb_plain_word(), prop::bool::ANY), 1..=4).prop_map(|parts| {
            let mut phrase = String::new();
            for (i, (word, hyphen)) in parts.into_iter().enumerate() {
                if i > 0 {
                    phrase.push(if hyphen { '-' } else { ' ' });
                }
                phrase.push_str(&word);
            }
            phrase
        })
    }

    /// One to three plain words joined by single spaces.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_plain_word(), 1..=3).prop_map(|words| words.join(" "))
    }

    /// A capitalized model stem.
    pub fn arb_model_stem() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,10}"
    }

    /// A bracket-pluralized model name with its expected singular and plural.
    pub fn arb_bracket_model_name() -> impl Strategy<Value = (String, String, String)> {
        (
            arb_model_stem(),
            "[a-z]{1,3}",
            "[a-z]{0,4}",
            arb_model_stem(),
            0..4u8,
        )
            .prop_map(|(stem, singular, plural, irregular, form)| match form {
                // Stem[suffix]
                0 => (
                    format!("{}[{}]", stem, plural),
                    stem.clone(),
                    format!("{}{}", stem, plural),
                ),
                // Stem[singular|plural]
                1 => (
                    format!("{}[{}|{}]", stem, singular, plural),
                    format!("{}{}", stem, singular),
                    format!("{}{}", stem, plural),
                ),
                // Stem[|Irregular]
                2 => (format!("{}[|{}]", stem, irregular), stem, irregular),
                _ => (stem.clone(), stem.clone(), stem),
            })
    }

    /// A schema field line such as `- has created at as unique text`.
    pub fn arb_field_line() -> impl Strategy<Value = String> {
        let types = prop::sample::select(vec![
            "text", "number", "integer", "decimal", "boolean", "date", "timestamp", "email",
            "url", "json", "uuid",
        ]);
        let constraints = prop::sample::subsequence(vec!["unique", "required", "indexed"], 0..=3);
        (arb_field_name(), types, constraints).prop_map(|(name, ty, constraints)| {
            let mut clause = constraints.join(" and ");
            if !clause.is_empty() {
                clause.push(' ');
            }
            clause.push_str(ty);
            format!("- has {} as {}", name, clause)
        })
    }

    /// A well-formed schema document with 1 to 4 models.
    pub fn arb_schema_document() -> impl Strategy<Value = String> {
        prop::collection::vec(
            (arb_model_stem(), prop::collection::vec(arb_field_line(), 1..6)),
            1..4,
        )
        .prop_map(|models| {
            models
                .into_iter()
                .map(|(name, fields)| format!("{}:\n{}\n", name, fields.join("\n")))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    /// Arbitrary text built from DSL-looking fragments, for totality checks.
    pub fn arb_dsl_noise() -> impl Strategy<Value = String> {
        let punctuation = prop::sample::select(vec![
            "- ", ":", "\n", " has ", " as ", " for ", " with ", " and ", "[s]", "\"quoted\"",
            "# note",
        ])
        .prop_map(str::to_string);
        let keyword = prop::sample::select(
            declare_dsl::TokenKind::keyword_spellings()
                .map(|(spelling, _)| spelling)
                .collect::<Vec<_>>(),
        )
        .prop_map(|s| format!(" {} ", s));
        let fragment = prop_oneof![
            3 => punctuation,
            1 => "[0-9]{1,3}",
            2 => arb_plain_word(),
            2 => keyword,
        ];
        prop::collection::vec(fragment, 0..40).prop_map(|parts| parts.concat())
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Span and diagnostic assertions.

    use super::*;

    /// Assert that `span` is well formed.
    #[track_caller]
    pub fn assert_span_ordered(span: Span) {
        assert!(
            span.start.offset <= span.end.offset,
            "span ends before it starts: {:?}",
            span
        );
        assert!(
            (span.start.line, span.start.column) <= (span.end.line, span.end.column),
            "span line/column out of order: {:?}",
            span
        );
    }

    /// Assert that sibling spans are well formed and do not overlap.
    #[track_caller]
    pub fn assert_siblings_ordered(spans: &[Span]) {
        for span in spans {
            assert_span_ordered(*span);
        }
        for pair in spans.windows(2) {
            assert!(
                pair[0].end.offset <= pair[1].start.offset,
                "sibling spans overlap: {:?} then {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Assert that `inner` lies within `outer`.
    #[track_caller]
    pub fn assert_span_contains(outer: Span, inner: Span) {
        assert!(
            outer.start.offset <= inner.start.offset && inner.end.offset <= outer.end.offset,
            "{:?} is not inside {:?}",
            inner,
            outer
        );
    }

    /// Assert that a parse failed with a `ParseError` at `line`:`column`.
    #[track_caller]
    pub fn assert_parse_error_at<T: std::fmt::Debug>(
        result: &Result<T, DslError>,
        line: usize,
        column: usize,
    ) {
        match result {
            Err(DslError::Parse(err)) => assert_eq!(
                (err.position.line, err.position.column),
                (line, column),
                "wrong position for: {}",
                err.message
            ),
            other => panic!("Expected ParseError at {}:{}, got: {:?}", line, column, other),
        }
    }

    /// Assert that tokenizing failed at `line`:`column`.
    #[track_caller]
    pub fn assert_tokenizer_error_at<T: std::fmt::Debug>(
        result: &Result<T, DslError>,
        line: usize,
        column: usize,
    ) {
        match result {
            Err(DslError::Tokenizer(err)) => assert_eq!(
                (err.position.line, err.position.column),
                (line, column),
                "wrong position for: {}",
                err.message
            ),
            other => panic!(
                "Expected TokenizerError at {}:{}, got: {:?}",
                line, column, other
            ),
        }
    }
}
