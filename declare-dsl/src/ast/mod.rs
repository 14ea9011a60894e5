//! AST families, one per DeclareLang grammar.

pub mod api;
pub mod auth;
pub mod common;
pub mod ddl;
pub mod dml;
pub mod log;
pub mod monitor;
pub mod security;
pub mod seed;
pub mod validation;

pub use api::*;
pub use auth::*;
pub use common::*;
pub use ddl::*;
pub use dml::*;
pub use log::*;
pub use monitor::*;
pub use security::*;
pub use seed::*;
pub use validation::*;

use serde::{Deserialize, Serialize};

/// The AST of any one DeclareLang file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "grammar", content = "ast", rename_all = "snake_case")]
pub enum DslAst {
    Schema(SchemaAst),
    Dml(DmlAst),
    Auth(AuthAst),
    Validation(ValidationAst),
    Api(ApiAst),
    Monitor(MonitorAst),
    Log(LogAst),
    Seed(SeedAst),
    Security(SecurityAst),
}

impl DslAst {
    pub fn as_schema(&self) -> Option<&SchemaAst> {
        match self {
            DslAst::Schema(ast) => Some(ast),
            _ => None,
        }
    }

    pub fn as_dml(&self) -> Option<&DmlAst> {
        match self {
            DslAst::Dml(ast) => Some(ast),
            _ => None,
        }
    }
}
