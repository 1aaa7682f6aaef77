// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rule tree produced by the annotation parser
//!
//! The tree is purely syntactic: a [`TagNode`] holds the rules written at one
//! nesting level plus optional key and element sub-nodes. `Display` renders
//! the canonical annotation text, which parses back into an equal tree.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

static INTEGER_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer pattern"));

static FLOAT_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("valid float pattern")
});

/// Literal type of a rule option, decided by its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    /// `true` or `false`
    Bool,
    /// Decimal integer, optionally signed
    Int,
    /// Decimal number with a fraction or exponent
    Float,
    /// Quoted text, or raw text of no other shape
    String,
    /// `&key` reference to another field of the record
    FieldRef,
    /// Empty option, e.g. the lower bound in `len::10`
    Unknown,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionKind::Bool => "boolean",
            OptionKind::Int => "integer",
            OptionKind::Float => "float",
            OptionKind::String => "string",
            OptionKind::FieldRef => "field reference",
            OptionKind::Unknown => "empty",
        };
        f.write_str(name)
    }
}

/// One rule argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleOption {
    /// Literal text (unescaped for quoted strings, the key for references)
    pub value: String,
    /// Literal type
    pub kind: OptionKind,
}

impl RuleOption {
    /// Create an option with an explicit kind
    pub fn new(value: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    /// Type a raw, unquoted argument by its shape
    pub fn classify(raw: &str) -> Self {
        let kind = if raw.is_empty() {
            OptionKind::Unknown
        } else if raw == "true" || raw == "false" {
            OptionKind::Bool
        } else if INTEGER_SHAPE.is_match(raw) {
            OptionKind::Int
        } else if FLOAT_SHAPE.is_match(raw) {
            OptionKind::Float
        } else {
            OptionKind::String
        };
        Self::new(raw, kind)
    }

    /// Create a quoted string option
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, OptionKind::String)
    }

    /// Create a field-reference option
    pub fn field_ref(key: impl Into<String>) -> Self {
        Self::new(key, OptionKind::FieldRef)
    }

    /// Check whether this option references another field
    pub fn is_field_ref(&self) -> bool {
        self.kind == OptionKind::FieldRef
    }

    /// Integer value, if this is an integer literal that fits in `i128`
    pub fn as_int(&self) -> Option<i128> {
        match self.kind {
            OptionKind::Int => self.value.trim_start_matches('+').parse().ok(),
            _ => None,
        }
    }

    /// Floating point value of an integer or float literal
    pub fn as_float(&self) -> Option<f64> {
        match self.kind {
            OptionKind::Int | OptionKind::Float => self.value.parse().ok(),
            _ => None,
        }
    }

    fn needs_quotes(&self) -> bool {
        self.value.is_empty()
            || Self::classify(&self.value).kind != OptionKind::String
            || self.value.starts_with(['@', '&'])
            || self.value.contains([',', ':', '[', ']', '"'])
    }
}

impl fmt::Display for RuleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OptionKind::Unknown => Ok(()),
            OptionKind::FieldRef => write!(f, "&{}", self.value),
            OptionKind::String if self.needs_quotes() => {
                f.write_str("\"")?;
                let mut chars = self.value.chars().peekable();
                while let Some(ch) = chars.next() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        // Inside quotes only `\"` and `\\` are escapes.
                        '\\' if matches!(chars.peek(), None | Some('"' | '\\')) => {
                            f.write_str("\\\\")?
                        }
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            _ => f.write_str(&self.value),
        }
    }
}

/// A named validation directive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, e.g. `len`
    pub name: String,
    /// Ordered options
    pub options: SmallVec<[RuleOption; 2]>,
    /// Context label given with `@label`
    pub context: Option<String>,
}

impl Rule {
    /// Create a rule without options
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: SmallVec::new(),
            context: None,
        }
    }

    /// Append an option
    pub fn with_option(mut self, option: RuleOption) -> Self {
        self.options.push(option);
        self
    }

    /// Set the context label
    pub fn with_context(mut self, label: impl Into<String>) -> Self {
        self.context = Some(label.into());
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for option in &self.options {
            write!(f, ":{option}")?;
        }
        if let Some(label) = &self.context {
            write!(f, ":@{label}")?;
        }
        Ok(())
    }
}

/// Parsed annotation at one nesting level
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagNode {
    /// Rules applying at this level
    pub rules: Vec<Rule>,
    /// Rules for a map key
    pub key: Option<Box<TagNode>>,
    /// Rules for a container element or map value
    pub elem: Option<Box<TagNode>>,
}

impl TagNode {
    /// Check whether the node carries nothing at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.key.is_none() && self.elem.is_none()
    }

    /// Find a rule by name at this level
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Check whether a rule is present at this level
    pub fn has_rule(&self, name: &str) -> bool {
        self.rule(name).is_some()
    }

    /// Number of nested element levels below this node
    pub fn elem_depth(&self) -> usize {
        self.elem.as_ref().map_or(0, |elem| 1 + elem.elem_depth())
    }

    /// Number of nested key levels below this node
    pub fn key_depth(&self) -> usize {
        self.key.as_ref().map_or(0, |key| 1 + key.key_depth())
    }

    /// Check whether this node or any sub-node holds a rule
    pub fn has_any_rule(&self) -> bool {
        !self.rules.is_empty()
            || self.key.as_ref().is_some_and(|key| key.has_any_rule())
            || self.elem.as_ref().is_some_and(|elem| elem.has_any_rule())
    }

    /// Wrap the node into a sub-node slot, dropping it when empty
    pub(crate) fn into_slot(self) -> Option<Box<TagNode>> {
        if self.is_empty() {
            None
        } else {
            Some(Box::new(self))
        }
    }
}

impl fmt::Display for TagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rule}")?;
        }
        if self.key.is_some() || self.elem.is_some() {
            if !self.rules.is_empty() {
                f.write_str(",")?;
            }
            f.write_str("[")?;
            if let Some(key) = &self.key {
                write!(f, "{key}")?;
            }
            f.write_str("]")?;
            if let Some(elem) = &self.elem {
                write!(f, "{elem}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_classification() {
        assert_eq!(RuleOption::classify("123").kind, OptionKind::Int);
        assert_eq!(RuleOption::classify("-123").kind, OptionKind::Int);
        assert_eq!(RuleOption::classify("1.5").kind, OptionKind::Float);
        assert_eq!(RuleOption::classify("1e9").kind, OptionKind::Float);
        assert_eq!(RuleOption::classify("true").kind, OptionKind::Bool);
        assert_eq!(RuleOption::classify("false").kind, OptionKind::Bool);
        assert_eq!(RuleOption::classify("").kind, OptionKind::Unknown);
        assert_eq!(RuleOption::classify("us").kind, OptionKind::String);
        assert_eq!(RuleOption::classify("inf").kind, OptionKind::String);
        assert_eq!(RuleOption::classify("1.2.3").kind, OptionKind::String);
    }

    #[test]
    fn test_option_numeric_values() {
        assert_eq!(RuleOption::classify("-42").as_int(), Some(-42));
        assert_eq!(RuleOption::classify("+7").as_int(), Some(7));
        assert_eq!(RuleOption::classify("2.5").as_int(), None);
        assert_eq!(RuleOption::classify("2.5").as_float(), Some(2.5));
        assert_eq!(RuleOption::string("12").as_int(), None);
    }

    #[test]
    fn test_string_option_quoting() {
        assert_eq!(RuleOption::string("abc").to_string(), "abc");
        assert_eq!(RuleOption::string("123").to_string(), "\"123\"");
        assert_eq!(RuleOption::string("a:b").to_string(), "\"a:b\"");
        assert_eq!(RuleOption::string("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(RuleOption::string(r#"a\"b"#).to_string(), r#""a\\\"b""#);
        assert_eq!(RuleOption::string(r"a\b,").to_string(), r#""a\b,""#);
        assert_eq!(RuleOption::string(r"a\\b:").to_string(), r#""a\\\b:""#);
        assert_eq!(RuleOption::string(r"end\,").to_string(), r#""end\,""#);
        assert_eq!(RuleOption::string(r"end,\").to_string(), r#""end,\\""#);
        assert_eq!(RuleOption::string("").to_string(), "\"\"");
    }

    #[test]
    fn test_tag_node_display() {
        let node = TagNode {
            rules: vec![Rule::new("required")],
            key: Some(Box::new(TagNode {
                rules: vec![Rule::new("len").with_option(RuleOption::classify("2"))],
                ..TagNode::default()
            })),
            elem: Some(Box::new(TagNode {
                rules: vec![Rule::new("email").with_context("create")],
                ..TagNode::default()
            })),
        };
        assert_eq!(node.to_string(), "required,[len:2]email:@create");
    }
}
