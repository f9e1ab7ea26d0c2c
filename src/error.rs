//! Error types for grammar type derivation

use thiserror::Error;

/// Everything that can abort emission for a whole grammar.
///
/// There is no partial output: one failing rule fails the grammar.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed AST JSON, including expression kinds outside the closed set.
    #[error("invalid grammar AST at JSON path {path}: {message}")]
    Decode { path: String, message: String },

    #[error("rule `{rule}`: character class range endpoints must be single characters, got {from:?}-{to:?}")]
    InvalidClassRange { rule: String, from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
