//! Fuzz target for the nine DeclareLang grammar parsers.
//!
//! The first byte selects the grammar; the rest is the source. Parsers must
//! return an AST or a positioned error, never panic.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use declare_dsl::{parse_document, FrontendConfig, Grammar};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    let grammar = Grammar::ALL[selector as usize % Grammar::ALL.len()];

    match parse_document(grammar, input, &FrontendConfig::default()) {
        Ok(ast) => assert_eq!(ast.grammar(), grammar),
        Err(err) => {
            assert!(err.position().line >= 1, "Error line should be >= 1");
            assert!(err.position().column >= 1, "Error column should be >= 1");
            assert!(!err.message().is_empty(), "Error message should not be empty");
        }
    }
});
