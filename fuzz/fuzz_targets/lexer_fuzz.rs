//! Fuzz target for the DeclareLang tokenizer.
//!
//! Any UTF-8 input must produce either a token list ending in `Eof` with
//! ordered positions, or a `TokenizerError` with a valid position.
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use declare_dsl::{Lexer, TokenKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match Lexer::new(input).tokenize() {
            Ok(tokens) => {
                assert_eq!(
                    tokens.last().map(|t| t.kind),
                    Some(TokenKind::Eof),
                    "Last token should always be Eof"
                );
                for token in &tokens {
                    assert!(token.span.start.offset <= token.span.end.offset);
                    assert!(token.span.end.offset <= input.len());
                    assert!(token.span.start.line >= 1, "Line numbers should be >= 1");
                    assert!(token.span.start.column >= 1, "Column numbers should be >= 1");
                }
                for pair in tokens.windows(2) {
                    assert!(pair[0].span.end.offset <= pair[1].span.start.offset);
                }
            }
            Err(err) => {
                assert!(err.position.line >= 1);
                assert!(err.position.column >= 1);
                assert!(!err.message.is_empty());
            }
        }
    }
});
