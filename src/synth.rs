//! Expression → type synthesis.
//!
//! Walks one rule's expression tree bottom-up and computes, per subtree, the
//! candidate types it yields and the labels it binds. Rule references stay
//! symbolic (the referenced rule's name), so recursive grammars terminate.
//! Action code is never read: each action becomes a helper function typed by
//! the labels in scope, and its value is that helper's return type.
//!
//! Known imprecisions, kept on purpose:
//! - labels bound in any alternative of a choice are visible after the choice;
//! - a label under `*` / `+` binds one occurrence's type, not an array.
pub mod accum;
pub mod scope;

use indexmap::IndexSet;

use crate::ast::{ClassPart, Expression};
use crate::error::{Error, Result};
use crate::ty::{Marker, TypeExpr};

pub use accum::{Accumulator, ActionValue, Helper, HelperKind};
pub use scope::LabelScope;

// ------------------------------- Policy ---------------------------------- //

/// Character classes wider than this are typed as plain `string`.
pub const CLASS_EXPANSION_LIMIT: usize = 256;

// ------------------------------ Synthesizer ------------------------------- //

/// Per-rule synthesis state: only the helper-name counter is mutable.
pub struct Synthesizer<'g> {
    rule: &'g str,
    rule_names: &'g IndexSet<&'g str>,
    class_limit: usize,
    next_helper: usize,
}

/// Name of the helper that stands for a rule whose value comes from action code.
pub fn rule_helper_name(rule: &str) -> String {
    format!("peg$parse{rule}")
}

impl<'g> Synthesizer<'g> {
    pub fn new(rule: &'g str, rule_names: &'g IndexSet<&'g str>) -> Self {
        Self { rule, rule_names, class_limit: CLASS_EXPANSION_LIMIT, next_helper: 1 }
    }

    pub fn with_class_limit(mut self, limit: usize) -> Self {
        self.class_limit = limit;
        self
    }

    /// Synthesize a rule's top-level expression from an empty scope.
    ///
    /// A top-level action gets the rule's own helper name.
    pub fn synthesize_rule(mut self, expression: &Expression) -> Result<Accumulator> {
        let scope = LabelScope::new();
        match unnamed(expression) {
            Expression::Action { code, expression } => {
                let name = rule_helper_name(self.rule);
                self.action(name, code, expression, &scope)
            }
            other => self.synthesize(other, &scope),
        }
    }

    /// `inherited` holds labels bound before this node (preceding sequence
    /// elements); nested action and predicate code sees them as parameters.
    pub fn synthesize(&mut self, node: &Expression, inherited: &LabelScope) -> Result<Accumulator> {
        match node {
            Expression::Any => Ok(Accumulator::of(TypeExpr::Text)),
            Expression::Literal { value, ignore_case } => Ok(Accumulator::of(if *ignore_case {
                // the matched input text is returned, not the grammar's spelling
                TypeExpr::Text
            } else {
                TypeExpr::literal(value.clone())
            })),
            Expression::Text { .. } => Ok(Accumulator::of(TypeExpr::Text)),
            Expression::Class { parts, inverted, ignore_case } => {
                self.class(parts, *inverted || *ignore_case)
            }
            Expression::Sequence { elements } => self.sequence(elements, inherited),
            Expression::Choice { alternatives } => self.choice(alternatives),
            Expression::Group { expression } => {
                let child = self.synthesize(expression, inherited)?;
                let mut acc = Accumulator::of(TypeExpr::group_of(&child.value_types()));
                acc.absorb(child);
                Ok(acc)
            }
            Expression::Labeled { label: None, expression } => self.synthesize(expression, inherited),
            Expression::Labeled { label: Some(label), expression } => {
                let child = self.synthesize(expression, inherited)?;
                let mut acc = Accumulator::default();
                acc.labels.bind(label, &child.value_types());
                acc.absorb_helpers(child);
                Ok(acc)
            }
            Expression::ZeroOrMore { expression } => {
                self.wrap(expression, inherited, |types| TypeExpr::array_of(repeated_item(types, true)))
            }
            Expression::OneOrMore { expression } => {
                self.wrap(expression, inherited, |types| TypeExpr::array_of(repeated_item(types, false)))
            }
            Expression::Optional { expression } => {
                self.wrap(expression, inherited, |types| {
                    TypeExpr::union([TypeExpr::group_of(types), TypeExpr::Marker(Marker::Null)])
                })
            }
            Expression::RuleRef { name } => {
                if !self.rule_names.contains(name.as_str()) {
                    log::warn!("rule `{}` references undefined rule `{name}`", self.rule);
                }
                Ok(Accumulator::of(TypeExpr::rule_ref(name.clone())))
            }
            Expression::SemanticAnd { code } | Expression::SemanticNot { code } => {
                let name = self.allocate_helper();
                let mut acc = Accumulator::of(TypeExpr::Marker(Marker::Undefined));
                acc.helpers.push(Helper::new(name, HelperKind::Predicate, inherited.clone(), code));
                Ok(acc)
            }
            Expression::SimpleAnd { .. } | Expression::SimpleNot { .. } => {
                Ok(Accumulator::of(TypeExpr::Marker(Marker::Void)))
            }
            Expression::Action { code, expression } => {
                let name = self.allocate_helper();
                self.action(name, code, expression, inherited)
            }
            Expression::Named { expression, .. } => self.synthesize(expression, inherited),
        }
    }

    fn sequence(&mut self, elements: &[Expression], inherited: &LabelScope) -> Result<Accumulator> {
        let mut acc = Accumulator::default();
        let mut scope = inherited.clone();
        for element in elements {
            let child = self.synthesize(element, &scope)?;
            scope.merge(&child.labels);
            if let Some(action) = child.action.clone() {
                // the last action decides the sequence's value; an earlier one becomes an entry
                if let Some(previous) = acc.action.replace(action) {
                    acc.types.push(TypeExpr::group_of(&[TypeExpr::ReturnOf(previous.helper)]));
                }
            } else if !child.types.is_empty() {
                acc.types.push(TypeExpr::group_of(&child.types));
            }
            acc.absorb(child);
        }
        Ok(acc)
    }

    fn choice(&mut self, alternatives: &[Expression]) -> Result<Accumulator> {
        let mut acc = Accumulator::default();
        for alternative in alternatives {
            let child = self.synthesize(alternative, &LabelScope::new())?;
            acc.types.push(TypeExpr::group_of(&child.value_types()));
            acc.absorb(child);
        }
        Ok(acc)
    }

    fn class(&self, parts: &[ClassPart], matches_any_text: bool) -> Result<Accumulator> {
        if matches_any_text {
            return Ok(Accumulator::of(TypeExpr::Text));
        }
        if parts.is_empty() {
            return Ok(Accumulator::of(TypeExpr::Marker(Marker::Never)));
        }
        let mut members: Vec<TypeExpr> = Vec::new();
        for part in parts {
            match part {
                ClassPart::Char(c) => members.push(TypeExpr::literal(c.clone())),
                ClassPart::Range([from, to]) => {
                    let (lo, hi) = match (single_char(from), single_char(to)) {
                        (Some(lo), Some(hi)) if lo <= hi => (lo, hi),
                        _ => {
                            return Err(Error::InvalidClassRange {
                                rule: self.rule.to_string(),
                                from: from.clone(),
                                to: to.clone(),
                            });
                        }
                    };
                    let width = (hi as u32 - lo as u32) as usize + 1;
                    if members.len() + width > self.class_limit {
                        return Ok(Accumulator::of(TypeExpr::Text));
                    }
                    members.extend((lo..=hi).map(|c| TypeExpr::literal(c.to_string())));
                }
            }
            if members.len() > self.class_limit {
                return Ok(Accumulator::of(TypeExpr::Text));
            }
        }
        Ok(Accumulator::of(TypeExpr::union(members)))
    }

    /// The child's value is folded into one wrapper type; labels pass through.
    fn wrap(
        &mut self,
        expression: &Expression,
        inherited: &LabelScope,
        make: impl FnOnce(&[TypeExpr]) -> TypeExpr,
    ) -> Result<Accumulator> {
        let child = self.synthesize(expression, inherited)?;
        let mut acc = Accumulator::of(make(&child.value_types()));
        acc.absorb(child);
        Ok(acc)
    }

    fn action(
        &mut self,
        name: String,
        code: &str,
        expression: &Expression,
        inherited: &LabelScope,
    ) -> Result<Accumulator> {
        let child = self.synthesize(expression, inherited)?;
        let params = inherited.concat(&child.labels);
        log::trace!("rule `{}`: helper {name}({})", self.rule, params.params());

        let mut acc = Accumulator::of(TypeExpr::ReturnOf(name.clone()));
        acc.action = Some(ActionValue { helper: name.clone(), code: code.to_string() });
        acc.absorb(child);
        acc.helpers.push(Helper::new(name, HelperKind::Action, params, code));
        Ok(acc)
    }

    fn allocate_helper(&mut self) -> String {
        let name = format!("{}${}", rule_helper_name(self.rule), self.next_helper);
        self.next_helper += 1;
        name
    }
}

// ------------------------------- Utilities -------------------------------- //

fn unnamed(mut expression: &Expression) -> &Expression {
    while let Expression::Named { expression: inner, .. } = expression {
        expression = inner;
    }
    expression
}

/// Element type of a repetition. A child without candidates (e.g. a bare
/// labeled capture) repeats `unknown` whether or not the empty case applies.
fn repeated_item(types: &[TypeExpr], empty_case: bool) -> TypeExpr {
    if types.is_empty() {
        return TypeExpr::Unknown;
    }
    let marker = empty_case.then_some(TypeExpr::Marker(Marker::Never));
    TypeExpr::union(types.iter().cloned().chain(marker))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

// ------------------------------- Tests ------------------------------------ //
