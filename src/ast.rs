//! Grammar AST as produced by the peggy grammar parser (`peggy --ast`).
//!
//! Only the fields the type deriver reads are modelled; locations and the
//! like are skipped by serde. The expression-kind set is closed: a `type`
//! tag outside it fails decoding and names the offending kind.
use indexmap::IndexSet;
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grammar {
    #[serde(default)]
    pub top_level_initializer: Option<Initializers>,
    #[serde(default)]
    pub initializer: Option<Initializers>,
    pub rules: Vec<Rule>,
}

/// Newer peggy versions emit an array of initializer blocks, older ones a single block.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Initializers {
    One(CodeBlock),
    Many(Vec<CodeBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeBlock {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Action {
        code: String,
        expression: Box<Expression>,
    },
    Any,
    Choice {
        alternatives: Vec<Expression>,
    },
    Class {
        parts: Vec<ClassPart>,
        #[serde(default)]
        inverted: bool,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    Group {
        expression: Box<Expression>,
    },
    Labeled {
        label: Option<String>,
        expression: Box<Expression>,
    },
    Literal {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    /// Display name attached to a rule (`Rule "human name" = ...`).
    Named {
        name: String,
        expression: Box<Expression>,
    },
    OneOrMore {
        expression: Box<Expression>,
    },
    Optional {
        expression: Box<Expression>,
    },
    RuleRef {
        name: String,
    },
    SemanticAnd {
        code: String,
    },
    SemanticNot {
        code: String,
    },
    Sequence {
        elements: Vec<Expression>,
    },
    SimpleAnd {
        expression: Box<Expression>,
    },
    SimpleNot {
        expression: Box<Expression>,
    },
    Text {
        expression: Box<Expression>,
    },
    ZeroOrMore {
        expression: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClassPart {
    Char(String),
    Range([String; 2]),
}

// ------------------------------- Helpers ---------------------------------- //

impl Grammar {
    pub fn from_json(src: &str) -> Result<Self> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        crate::path_de::from_value_with_path(value)
    }

    /// The read-only rule-name table consulted for rule references.
    pub fn rule_names(&self) -> IndexSet<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

impl Initializers {
    pub fn blocks(&self) -> &[CodeBlock] {
        match self {
            Initializers::One(block) => std::slice::from_ref(block),
            Initializers::Many(blocks) => blocks,
        }
    }
}

impl Expression {
    /// The AST `type` tag of this node.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Action { .. } => "action",
            Expression::Any => "any",
            Expression::Choice { .. } => "choice",
            Expression::Class { .. } => "class",
            Expression::Group { .. } => "group",
            Expression::Labeled { .. } => "labeled",
            Expression::Literal { .. } => "literal",
            Expression::Named { .. } => "named",
            Expression::OneOrMore { .. } => "one_or_more",
            Expression::Optional { .. } => "optional",
            Expression::RuleRef { .. } => "rule_ref",
            Expression::SemanticAnd { .. } => "semantic_and",
            Expression::SemanticNot { .. } => "semantic_not",
            Expression::Sequence { .. } => "sequence",
            Expression::SimpleAnd { .. } => "simple_and",
            Expression::SimpleNot { .. } => "simple_not",
            Expression::Text { .. } => "text",
            Expression::ZeroOrMore { .. } => "zero_or_more",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_peggy_rule_shapes() {
        let g = Grammar::from_value(json!({
            "type": "grammar",
            "topLevelInitializer": null,
            "rules": [{
                "type": "rule",
                "name": "Pair",
                "nameLocation": { "start": { "offset": 0 } },
                "expression": {
                    "type": "action",
                    "code": " return a+b ",
                    "expression": {
                        "type": "sequence",
                        "elements": [
                            { "type": "labeled", "label": "a", "expression": { "type": "rule_ref", "name": "Digit" } },
                            { "type": "labeled", "label": null, "expression": { "type": "any", "location": {} } },
                            { "type": "class", "parts": ["x", ["0", "9"]], "inverted": false, "ignoreCase": false }
                        ]
                    }
                }
            }]
        })).unwrap();

        assert!(g.top_level_initializer.is_none());
        assert_eq!(g.rules.len(), 1);
        let Expression::Action { code, expression } = &g.rules[0].expression else {
            panic!("expected action");
        };
        assert_eq!(code, " return a+b ");
        let Expression::Sequence { elements } = expression.as_ref() else {
            panic!("expected sequence");
        };
        assert_eq!(elements.len(), 3);
        assert!(matches!(&elements[1], Expression::Labeled { label: None, .. }));
        let Expression::Class { parts, .. } = &elements[2] else { panic!("expected class") };
        assert_eq!(parts[0], ClassPart::Char("x".into()));
        assert_eq!(parts[1], ClassPart::Range(["0".into(), "9".into()]));
    }

    #[test]
    fn initializers_accept_single_block_or_array() {
        let one = Grammar::from_value(json!({
            "topLevelInitializer": { "type": "top_level_initializer", "code": "const A = 1;" },
            "rules": []
        })).unwrap();
        assert_eq!(one.top_level_initializer.unwrap().blocks()[0].code, "const A = 1;");

        let many = Grammar::from_value(json!({
            "initializer": [{ "code": "let x;" }, { "code": "let y;" }],
            "rules": []
        })).unwrap();
        let blocks = many.initializer.unwrap();
        assert_eq!(blocks.blocks().len(), 2);
    }

    #[test]
    fn unknown_expression_kind_is_named_with_its_path() {
        let err = Grammar::from_json(r#"{
            "rules": [{
                "name": "List",
                "expression": { "type": "repeated", "min": null, "max": null, "expression": { "type": "any" } }
            }]
        }"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("repeated"), "{msg}");
        assert!(msg.contains("rules[0].expression"), "{msg}");
    }

    #[test]
    fn rule_name_table_keeps_grammar_order() {
        let g = Grammar::from_value(json!({
            "rules": [
                { "name": "B", "expression": { "type": "any" } },
                { "name": "A", "expression": { "type": "rule_ref", "name": "B" } }
            ]
        })).unwrap();
        let names: Vec<_> = g.rule_names().into_iter().collect();
        assert_eq!(names, ["B", "A"]);
    }
}
