use indexmap::IndexMap;

use crate::ty::TypeExpr;

/// Ordered label bindings visible to action code.
///
/// Rebinding a name unions the candidate lists instead of shadowing, so
/// alternatives of a choice that reuse a label end up with one parameter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelScope {
    bindings: IndexMap<String, Vec<TypeExpr>>,
}

impl LabelScope {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.bindings.is_empty() }

    pub fn len(&self) -> usize { self.bindings.len() }

    /// Bind `name`; an empty candidate list is recorded as `unknown`.
    pub fn bind(&mut self, name: &str, types: &[TypeExpr]) {
        let fallback = [TypeExpr::Unknown];
        let types = if types.is_empty() { &fallback[..] } else { types };
        match self.bindings.get_mut(name) {
            Some(existing) => {
                log::debug!("label `{name}` bound more than once, unioning its candidates");
                for ty in types {
                    if !existing.contains(ty) { existing.push(ty.clone()); }
                }
            }
            None => {
                self.bindings.insert(name.to_string(), types.to_vec());
            }
        }
    }

    /// Append `other`'s bindings after ours, first-seen order.
    pub fn merge(&mut self, other: &LabelScope) {
        for (name, types) in &other.bindings {
            self.bind(name, types);
        }
    }

    pub fn concat(&self, other: &LabelScope) -> LabelScope {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn get(&self, name: &str) -> Option<&[TypeExpr]> {
        self.bindings.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TypeExpr])> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The parameter type of one binding: the union of its candidates.
    pub fn binding_type(&self, name: &str) -> Option<TypeExpr> {
        self.get(name).map(|types| TypeExpr::union(types.iter().cloned()))
    }

    /// `a: T, b: U` parameter list.
    pub fn params(&self) -> String {
        self.iter()
            .map(|(name, types)| format!("{name}: {}", TypeExpr::union(types.iter().cloned())))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
