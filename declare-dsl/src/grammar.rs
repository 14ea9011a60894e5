//! Grammar selection and whole-document parsing.

use crate::ast::DslAst;
use crate::config::FrontendConfig;
use crate::error::{DslError, ParseError};
use crate::lexer::{Lexer, Token};
use crate::parser::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The nine DeclareLang grammars, one per canonical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    Schema,
    Dml,
    Auth,
    Validation,
    Api,
    Monitor,
    Log,
    Seed,
    Security,
}

impl Grammar {
    pub const ALL: [Grammar; 9] = [
        Grammar::Schema,
        Grammar::Dml,
        Grammar::Auth,
        Grammar::Validation,
        Grammar::Api,
        Grammar::Monitor,
        Grammar::Log,
        Grammar::Seed,
        Grammar::Security,
    ];

    /// Canonical file name (`ddl.dsl`, `auth.dsl`, ...).
    pub fn file_name(self) -> &'static str {
        match self {
            Grammar::Schema => "ddl.dsl",
            Grammar::Dml => "dml.dsl",
            Grammar::Auth => "auth.dsl",
            Grammar::Validation => "validation.dsl",
            Grammar::Api => "api.dsl",
            Grammar::Monitor => "monitor.dsl",
            Grammar::Log => "log.dsl",
            Grammar::Seed => "seed.dsl",
            Grammar::Security => "security.dsl",
        }
    }

    /// Grammar for a canonical file name. Leading directories are ignored.
    pub fn from_file_name(name: &str) -> Option<Grammar> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        Grammar::ALL
            .into_iter()
            .find(|g| g.file_name().eq_ignore_ascii_case(base))
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl DslAst {
    pub fn grammar(&self) -> Grammar {
        match self {
            DslAst::Schema(_) => Grammar::Schema,
            DslAst::Dml(_) => Grammar::Dml,
            DslAst::Auth(_) => Grammar::Auth,
            DslAst::Validation(_) => Grammar::Validation,
            DslAst::Api(_) => Grammar::Api,
            DslAst::Monitor(_) => Grammar::Monitor,
            DslAst::Log(_) => Grammar::Log,
            DslAst::Seed(_) => Grammar::Seed,
            DslAst::Security(_) => Grammar::Security,
        }
    }
}

/// Tokenize and parse one file with `grammar`, enforcing `config`.
pub fn parse_document(
    grammar: Grammar,
    source: &str,
    config: &FrontendConfig,
) -> Result<DslAst, DslError> {
    let tokens = Lexer::with_config(source, config).tokenize()?;
    tracing::debug!(
        grammar = %grammar,
        bytes = source.len(),
        tokens = tokens.len(),
        "tokenized document"
    );

    let result = match grammar {
        Grammar::Schema => run::<SchemaParser>(tokens, config).map(DslAst::Schema),
        Grammar::Dml => run::<DmlParser>(tokens, config).map(DslAst::Dml),
        Grammar::Auth => run::<AuthParser>(tokens, config).map(DslAst::Auth),
        Grammar::Validation => run::<ValidationParser>(tokens, config).map(DslAst::Validation),
        Grammar::Api => run::<ApiParser>(tokens, config).map(DslAst::Api),
        Grammar::Monitor => run::<MonitorParser>(tokens, config).map(DslAst::Monitor),
        Grammar::Log => run::<LogParser>(tokens, config).map(DslAst::Log),
        Grammar::Seed => run::<SeedParser>(tokens, config).map(DslAst::Seed),
        Grammar::Security => run::<SecurityParser>(tokens, config).map(DslAst::Security),
    };

    match &result {
        Ok(_) => tracing::debug!(grammar = %grammar, "parsed document"),
        Err(e) => tracing::debug!(grammar = %grammar, error = %e, "document rejected"),
    }
    result.map_err(DslError::from)
}

/// Tokenize and parse with one grammar's parser type.
pub(crate) fn parse_with<P: GrammarParser>(
    source: &str,
    config: &FrontendConfig,
) -> Result<P::Output, DslError> {
    let tokens = Lexer::with_config(source, config).tokenize()?;
    tracing::trace!(grammar = %P::GRAMMAR, tokens = tokens.len(), "tokenized document");
    run::<P>(tokens, config).map_err(DslError::from)
}

fn run<P: GrammarParser>(tokens: Vec<Token>, config: &FrontendConfig) -> Result<P::Output, ParseError> {
    P::with_config(tokens, config).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_round_trip() {
        for grammar in Grammar::ALL {
            assert_eq!(Grammar::from_file_name(grammar.file_name()), Some(grammar));
        }
        assert_eq!(
            Grammar::from_file_name("project/declare/AUTH.dsl"),
            Some(Grammar::Auth)
        );
        assert_eq!(Grammar::from_file_name("schema.dsl"), None);
    }

    #[test]
    fn test_parse_document_dispatches() {
        let config = FrontendConfig::default();
        let ast = parse_document(Grammar::Schema, "User:\n- has email as text\n", &config).unwrap();
        assert_eq!(ast.grammar(), Grammar::Schema);
        assert_eq!(ast.as_schema().unwrap().models.len(), 1);

        let ast = parse_document(Grammar::Security, "", &config).unwrap();
        assert_eq!(ast, DslAst::Security(Default::default()));
    }

    #[test]
    fn test_parse_document_reports_both_error_kinds() {
        let config = FrontendConfig::default();
        let err = parse_document(Grammar::Schema, "User:\n- has $ as text\n", &config).unwrap_err();
        assert!(matches!(err, DslError::Tokenizer(_)));
        assert_eq!(err.position().column, 7);

        let err = parse_document(Grammar::Dml, "", &config).unwrap_err();
        assert!(matches!(err, DslError::Parse(_)));
    }

    #[test]
    fn test_item_limit_applies_to_every_grammar() {
        let config = FrontendConfig {
            max_items_per_section: 1,
            ..FrontendConfig::default()
        };
        let err = parse_document(Grammar::Log, "Exclude:\n- password\n- token\n", &config)
            .unwrap_err();
        assert_eq!(err.message(), "Section 'Exclude' has more than 1 items");
        assert_eq!(err.position().line, 3);
    }
}
