//! Rule emission: one exported type per rule, plus the helper functions that
//! carry action code.
//!
//! Output layout: preamble, initializers (verbatim), then rules in grammar order.
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;

use crate::ast::{Grammar, Rule};
use crate::error::Result;
use crate::synth::{self, Accumulator, Helper, HelperKind, Synthesizer};
use crate::ty::TypeExpr;

/// Ambient functions peggy makes available inside action code.
pub const PREAMBLE: &str = "\
declare function text(): string;
declare function offset(): number;
declare function range(): { source: any; start: number; end: number };
declare function location(): { source: any; start: { offset: number; line: number; column: number }; end: { offset: number; line: number; column: number } };
declare function expected(description: string, location?: ReturnType<typeof location>): never;
declare function error(message: string, location?: ReturnType<typeof location>): never;
";

#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Emit the ambient helper declarations.
    pub preamble: bool,
    /// Emit top-level and per-parse initializer code.
    pub initializers: bool,
    pub class_expansion_limit: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            preamble: true,
            initializers: true,
            class_expansion_limit: synth::CLASS_EXPANSION_LIMIT,
        }
    }
}

// ------------------------------ Declarations ------------------------------ //

/// Everything synthesized for one rule, ready to render.
#[derive(Debug, Clone)]
pub struct RuleDeclaration {
    pub name: String,
    pub accumulator: Accumulator,
}

impl RuleDeclaration {
    pub fn synthesize(rule: &Rule, rule_names: &IndexSet<&str>, options: &EmitOptions) -> Result<Self> {
        log::debug!("synthesizing rule `{}` ({})", rule.name, rule.expression.kind());
        let accumulator = Synthesizer::new(&rule.name, rule_names)
            .with_class_limit(options.class_expansion_limit)
            .synthesize_rule(&rule.expression)?;
        Ok(Self { name: rule.name.clone(), accumulator })
    }

    pub fn has_action(&self) -> bool {
        self.accumulator.action.is_some()
    }

    /// The rule's exported type: its candidate union, or the return type of
    /// the action helper when action code decides the value.
    pub fn exported_type(&self) -> TypeExpr {
        self.accumulator.union_type()
    }

    /// The helper whose return type is the rule's value. It is `peg$parseR`
    /// for a top-level action, or the numbered helper of an action element
    /// of a top-level sequence.
    pub fn rule_helper(&self) -> Option<&Helper> {
        let action = self.accumulator.action.as_ref()?;
        self.accumulator.helpers.iter().find(|h| h.name == action.helper)
    }

    /// Every other helper, in allocation order.
    pub fn nested_helpers(&self) -> impl Iterator<Item = &Helper> {
        let own = self.accumulator.action.as_ref().map(|a| a.helper.as_str());
        self.accumulator
            .helpers
            .iter()
            .filter(move |h| own != Some(h.name.as_str()))
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            name: self.name.clone(),
            exported_type: self.exported_type().to_string(),
            candidates: self.accumulator.types.iter().map(|t| t.to_string()).collect(),
            labels: self
                .accumulator
                .labels
                .iter()
                .map(|(name, types)| (name.to_string(), types.iter().map(|t| t.to_string()).collect()))
                .collect(),
            action: self.has_action(),
            helpers: self
                .rule_helper()
                .into_iter()
                .chain(self.nested_helpers())
                .map(HelperSummary::of)
                .collect(),
        }
    }
}

impl fmt::Display for RuleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "export type {} = {};", self.name, self.exported_type())?;
        if let Some(helper) = self.rule_helper() {
            writeln!(f, "{helper}")?;
        }
        for helper in self.nested_helpers() {
            writeln!(f, "{helper}")?;
        }
        Ok(())
    }
}

/// Debug view of one rule's synthesis result.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub exported_type: String,
    pub candidates: Vec<String>,
    pub labels: IndexMap<String, Vec<String>>,
    pub action: bool,
    pub helpers: Vec<HelperSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelperSummary {
    pub name: String,
    pub kind: HelperKind,
    pub declaration: String,
}

impl HelperSummary {
    fn of(helper: &Helper) -> Self {
        Self { name: helper.name.clone(), kind: helper.kind, declaration: helper.to_string() }
    }
}

// -------------------------------- Grammar --------------------------------- //

pub fn emit_rule(rule: &Rule, rule_names: &IndexSet<&str>, options: &EmitOptions) -> Result<String> {
    Ok(RuleDeclaration::synthesize(rule, rule_names, options)?.to_string())
}

/// Synthesize every rule. Rules are independent once the name table exists,
/// so they run in parallel; the result keeps grammar order. Any failure
/// fails the whole grammar.
pub fn declarations(grammar: &Grammar, options: &EmitOptions) -> Result<Vec<RuleDeclaration>> {
    let rule_names = grammar.rule_names();
    grammar
        .rules
        .par_iter()
        .map(|rule| RuleDeclaration::synthesize(rule, &rule_names, options))
        .collect()
}

pub fn emit_grammar(grammar: &Grammar, options: &EmitOptions) -> Result<String> {
    let declarations = declarations(grammar, options)?;

    let mut out = String::new();
    if options.preamble {
        out.push_str(PREAMBLE);
    }
    if options.initializers {
        let initializers = [&grammar.top_level_initializer, &grammar.initializer];
        for block in initializers.into_iter().flatten().flat_map(|i| i.blocks()) {
            out.push_str(&block.code);
            out.push('\n');
        }
    }
    for declaration in &declarations {
        out.push_str(&declaration.to_string());
    }
    Ok(out)
}

pub fn inspect_grammar(grammar: &Grammar, options: &EmitOptions) -> Result<Vec<RuleSummary>> {
    Ok(declarations(grammar, options)?.iter().map(RuleDeclaration::summary).collect())
}
