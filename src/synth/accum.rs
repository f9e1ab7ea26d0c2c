use std::fmt;

use serde::Serialize;

use super::scope::LabelScope;
use crate::ty::TypeExpr;

/// What one expression subtree yields: candidate types, the labels it binds,
/// and the action that replaces its value, if any.
///
/// Owned by the caller that synthesized it; subtrees never hold on to it.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    pub types: Vec<TypeExpr>,
    pub labels: LabelScope,
    pub action: Option<ActionValue>,
    /// Helper declarations allocated anywhere in the subtree, in completion order.
    pub helpers: Vec<Helper>,
}

/// Opaque action code and the helper that wraps it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionValue {
    pub helper: String,
    pub code: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperKind {
    Action,
    Predicate,
}

/// A function wrapping opaque user code, typed by the labels in scope.
///
/// The downstream type checker infers its return type; nothing here reads the code.
#[derive(Clone, Debug)]
pub struct Helper {
    pub name: String,
    pub kind: HelperKind,
    pub params: LabelScope,
    pub code: String,
}

impl Accumulator {
    pub fn of(ty: TypeExpr) -> Self {
        Self { types: vec![ty], ..Self::default() }
    }

    /// Candidates a parent sees. When an action decides the value, that is
    /// only its helper's return type; sibling entries in `types` are dropped.
    pub fn value_types(&self) -> Vec<TypeExpr> {
        match &self.action {
            Some(action) => vec![TypeExpr::ReturnOf(action.helper.clone())],
            None => self.types.clone(),
        }
    }

    /// The single type this subtree stands for once its candidates are joined.
    pub fn union_type(&self) -> TypeExpr {
        TypeExpr::union(self.value_types())
    }

    /// Take over `child`'s labels and helpers; its types and action stay with the caller.
    pub fn absorb(&mut self, child: Accumulator) {
        self.labels.merge(&child.labels);
        self.helpers.extend(child.helpers);
    }

    /// Keep only `child`'s helpers (its labels do not escape).
    pub fn absorb_helpers(&mut self, child: Accumulator) {
        self.helpers.extend(child.helpers);
    }
}

impl Helper {
    pub fn new(name: String, kind: HelperKind, params: LabelScope, code: &str) -> Self {
        Self { name, kind, params, code: code.to_string() }
    }
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}({}) {{{}}}", self.name, self.params.params(), self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_renders_labels_as_typed_parameters() {
        let mut params = LabelScope::new();
        params.bind("a", &[TypeExpr::Text]);
        params.bind("b", &[TypeExpr::rule_ref("T")]);
        let helper = Helper::new("peg$parsePair".into(), HelperKind::Action, params, " return [a, b]; ");
        assert_eq!(helper.to_string(), "function peg$parsePair(a: string, b: T) { return [a, b]; }");
    }

    #[test]
    fn absorb_moves_labels_and_helpers_but_not_types() {
        let mut child = Accumulator::of(TypeExpr::Text);
        child.labels.bind("x", &[TypeExpr::Text]);
        child.action = Some(ActionValue { helper: "h".into(), code: "return x".into() });
        child.helpers.push(Helper::new("h".into(), HelperKind::Predicate, LabelScope::new(), ""));

        let mut parent = Accumulator::default();
        parent.absorb(child);
        assert!(parent.types.is_empty());
        assert!(parent.action.is_none());
        assert_eq!(parent.labels.len(), 1);
        assert_eq!(parent.helpers.len(), 1);
        assert_eq!(parent.union_type(), TypeExpr::Unknown);
    }

    #[test]
    fn action_value_overrides_sibling_candidates() {
        let mut acc = Accumulator::of(TypeExpr::literal(","));
        assert_eq!(acc.value_types(), [TypeExpr::literal(",")]);
        acc.action = Some(ActionValue { helper: "peg$parseR$1".into(), code: "return a".into() });
        assert_eq!(acc.value_types(), [TypeExpr::ReturnOf("peg$parseR$1".into())]);
        assert_eq!(acc.union_type().to_string(), "ReturnType<typeof peg$parseR$1>");
    }
}
