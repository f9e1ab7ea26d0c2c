//! Structural type expressions and their TypeScript rendering.
//!
//! Unions are only built through [`TypeExpr::union`], which never yields a
//! zero- or one-member union, keeps grammar order and drops repeats.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// Any matched text.
    Text,
    /// Nothing structural is known (e.g. a sequence made only of labeled captures).
    Unknown,
    /// Exact string value.
    Literal(String),
    Union(Vec<TypeExpr>),
    /// Explicit parenthesization, preserves precedence when combined later.
    Group(Box<TypeExpr>),
    Array(Box<TypeExpr>),
    Marker(Marker),
    /// Symbolic reference to a rule's exported type, never expanded.
    RuleRef(String),
    /// Whatever the named action helper returns.
    ReturnOf(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Empty case of a `*` repetition.
    Never,
    /// An optional that did not match.
    Null,
    /// Semantic predicate result.
    Undefined,
    /// Syntactic predicate result, possibly present.
    Void,
}

impl TypeExpr {
    pub fn union(members: impl IntoIterator<Item = TypeExpr>) -> TypeExpr {
        let mut out: Vec<TypeExpr> = Vec::new();
        for member in members {
            match member {
                TypeExpr::Union(inner) => {
                    for m in inner {
                        if !out.contains(&m) { out.push(m); }
                    }
                }
                m => {
                    if !out.contains(&m) { out.push(m); }
                }
            }
        }
        match out.len() {
            0 => TypeExpr::Unknown,
            1 => out.remove(0),
            _ => TypeExpr::Union(out),
        }
    }

    /// `(a|b|...)` over a candidate list. An already grouped type is not wrapped twice.
    pub fn group_of(members: &[TypeExpr]) -> TypeExpr {
        match TypeExpr::union(members.iter().cloned()) {
            grouped @ TypeExpr::Group(_) => grouped,
            inner => TypeExpr::Group(Box::new(inner)),
        }
    }

    pub fn array_of(item: TypeExpr) -> TypeExpr {
        TypeExpr::Array(Box::new(item))
    }

    pub fn literal(value: impl Into<String>) -> TypeExpr {
        TypeExpr::Literal(value.into())
    }

    pub fn rule_ref(name: impl Into<String>) -> TypeExpr {
        TypeExpr::RuleRef(name.into())
    }

    /// Number of members once rendered (a non-union counts as one).
    pub fn arity(&self) -> usize {
        match self {
            TypeExpr::Union(members) => members.len(),
            _ => 1,
        }
    }
}

// ------------------------------- Render ----------------------------------- //

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Text => f.write_str("string"),
            TypeExpr::Unknown => f.write_str("unknown"),
            TypeExpr::Literal(value) => f.write_str(&string_literal(value)),
            TypeExpr::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 { f.write_str("|")?; }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            TypeExpr::Group(inner) => write!(f, "({inner})"),
            TypeExpr::Array(item) => write!(f, "Array<{item}>"),
            TypeExpr::Marker(marker) => write!(f, "{marker}"),
            TypeExpr::RuleRef(name) => f.write_str(name),
            TypeExpr::ReturnOf(helper) => write!(f, "ReturnType<typeof {helper}>"),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Marker::Never => "never",
            Marker::Null => "null",
            Marker::Undefined => "undefined",
            Marker::Void => "void",
        })
    }
}

/// Double-quoted string literal that is valid both as TypeScript and as JSON.
///
/// Every UTF-16 unit from U+007F upward is written as `\uXXXX`, so astral
/// characters become surrogate pairs.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || (c as u32) >= 0x7f => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{unit:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn singleton_union_collapses_and_empty_is_unknown() {
        assert_eq!(TypeExpr::union([TypeExpr::Text]), TypeExpr::Text);
        assert_eq!(TypeExpr::union(Vec::<TypeExpr>::new()), TypeExpr::Unknown);
        assert_eq!(TypeExpr::union([TypeExpr::Text, TypeExpr::Text]), TypeExpr::Text);
    }

    #[test]
    fn union_keeps_insertion_order() {
        let u = TypeExpr::union([
            TypeExpr::literal("b"),
            TypeExpr::literal("a"),
            TypeExpr::union([TypeExpr::literal("c"), TypeExpr::literal("a")]),
        ]);
        assert_eq!(u.to_string(), r#""b"|"a"|"c""#);
        assert_eq!(u.arity(), 3);
    }

    #[test]
    fn renders_wrappers() {
        let item = TypeExpr::union([TypeExpr::rule_ref("Digit"), TypeExpr::Marker(Marker::Never)]);
        assert_eq!(TypeExpr::array_of(item).to_string(), "Array<Digit|never>");
        assert_eq!(TypeExpr::group_of(&[TypeExpr::Text]).to_string(), "(string)");
        assert_eq!(
            TypeExpr::ReturnOf("peg$parseA".into()).to_string(),
            "ReturnType<typeof peg$parseA>"
        );
    }

    #[test]
    fn escapes_outside_printable_ascii() {
        assert_eq!(string_literal("é"), r#""\u00e9""#);
        assert_eq!(string_literal("\u{7f}"), r#""\u007f""#);
        assert_eq!(string_literal("😀"), r#""\ud83d\ude00""#);
        assert_eq!(string_literal("a\"b\\\n\u{1}"), r#""a\"b\\\n\u0001""#);
    }

    proptest! {
        #[test]
        fn literal_round_trips_through_target_syntax(value in any::<String>()) {
            let rendered = TypeExpr::literal(value.clone()).to_string();
            prop_assert!(rendered.is_ascii());
            let back: String = serde_json::from_str(&rendered).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
