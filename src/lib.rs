//! Static type derivation for peggy grammars.
//!
//! Reads a grammar AST and emits TypeScript declarations describing what
//! each rule yields when it matches, without ever running the grammar:
//!
//! ```text
//! grammar AST JSON ──► ast::Grammar ──► synth (per rule) ──► emit ──► declaration text
//! ```
//!
//! Action code is treated as an opaque function body; the host type checker
//! infers its return type from the label-typed parameters we give it.
pub mod ast;
pub mod emit;
pub mod error;
pub mod path_de;
pub mod synth;
pub mod ty;

pub use ast::Grammar;
pub use emit::{EmitOptions, HelperSummary, RuleDeclaration, RuleSummary};
pub use error::{Error, Result};

// ------------------------------- Front API -------------------------------- //

/// Declaration text for a whole grammar, or the first error (no partial output).
pub fn generate(grammar: &Grammar, options: &EmitOptions) -> Result<String> {
    emit::emit_grammar(grammar, options)
}

pub fn generate_from_json(src: &str, options: &EmitOptions) -> Result<String> {
    let grammar = Grammar::from_json(src)?;
    generate(&grammar, options)
}
