//! Recursive-descent parsers, one per grammar.
//!
//! Every parser owns a [`TokenCursor`] over its token vector and fails on the
//! first structural error; there is no recovery mode.

pub mod cursor;

mod api;
mod auth;
mod ddl;
mod dml;
mod log;
mod monitor;
mod security;
mod seed;
mod validation;

pub use api::ApiParser;
pub use auth::AuthParser;
pub use cursor::{Phrase, TokenCursor};
pub use ddl::SchemaParser;
pub use dml::DmlParser;
pub use log::LogParser;
pub use monitor::MonitorParser;
pub use security::SecurityParser;
pub use seed::SeedParser;
pub use validation::ValidationParser;

use crate::config::FrontendConfig;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::Token;

/// Common shape of the nine grammar parsers.
pub trait GrammarParser: Sized {
    /// Root AST node produced by this grammar.
    type Output;

    const GRAMMAR: Grammar;

    fn from_cursor(cursor: TokenCursor) -> Self;

    /// Parser over `tokens`; comment tokens are dropped.
    fn new(tokens: Vec<Token>) -> Self {
        Self::from_cursor(TokenCursor::new(tokens))
    }

    /// Parser that also enforces the per-section item limit of `config`.
    fn with_config(tokens: Vec<Token>, config: &FrontendConfig) -> Self {
        Self::from_cursor(TokenCursor::new(tokens).with_item_limit(config.max_items_per_section))
    }

    fn parse(self) -> Result<Self::Output, ParseError>;
}
