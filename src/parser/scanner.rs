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

//! Single-pass recursive-descent scanner for validation annotations
//!
//! ```text
//! tagnode      := (rule (','|'['))* bracketgroup? rule*
//! rule         := name (':' arglist)?
//! arglist      := arg (':' arg)*
//! arg          := '@' label | '&' fieldkey | '"' chars '"' | rawchars
//! bracketgroup := '[' tagnode ']' tagnode?
//! ```
//!
//! The scanner only ever moves forward. Separators are ASCII, so every slice
//! taken between two separator positions is valid UTF-8.

use super::error::{ParseError, ParseResult};
use super::tag::{Rule, RuleOption, TagNode};

/// Deepest rule tree the scanner builds, counting key and elem levels
pub const MAX_NESTING_DEPTH: usize = 256;

/// Recursive-descent scanner over one annotation string
#[derive(Debug, Clone)]
pub struct TagScanner<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
}

impl<'input> TagScanner<'input> {
    /// Create a scanner positioned at the start of `input`
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    /// Scan the whole input into a rule tree
    pub fn parse(mut self) -> ParseResult<TagNode> {
        self.parse_node(0, 0)
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline(always)]
    fn is_separator(byte: u8) -> bool {
        matches!(byte, b':' | b',' | b'[' | b']')
    }

    /// `depth` counts open bracket groups, `nesting` counts tree levels.
    fn parse_node(&mut self, depth: usize, nesting: usize) -> ParseResult<TagNode> {
        let mut node = TagNode::default();

        loop {
            match self.peek() {
                None => return Ok(node),
                Some(b']') if depth == 0 => {
                    return Err(ParseError::UnmatchedCloseBracket { position: self.pos });
                }
                // The enclosing group consumes its own ']'.
                Some(b']') => return Ok(node),
                Some(b',') => self.pos += 1,
                Some(b'[') => {
                    let open = self.pos;
                    if nesting >= MAX_NESTING_DEPTH {
                        return Err(ParseError::NestingTooDeep {
                            position: open,
                            limit: MAX_NESTING_DEPTH,
                        });
                    }
                    self.pos += 1;
                    let key = self.parse_node(depth + 1, nesting + 1)?;
                    if self.peek() != Some(b']') {
                        return Err(ParseError::UnclosedBracket { position: open });
                    }
                    self.pos += 1;
                    let elem = self.parse_node(depth, nesting + 1)?;
                    node.key = key.into_slot();
                    node.elem = elem.into_slot();
                    return Ok(node);
                }
                Some(_) => {
                    let start = self.pos;
                    let rule = self.parse_rule();
                    if rule.name.is_empty() {
                        log::trace!("skipping rule with empty name at position {start}");
                    } else {
                        node.rules.push(rule);
                    }
                }
            }
        }
    }

    fn parse_rule(&mut self) -> Rule {
        let name = self.read_raw();
        let mut rule = Rule::new(name);

        while self.peek() == Some(b':') {
            self.pos += 1;
            self.parse_arg(&mut rule);
        }

        rule
    }

    fn parse_arg(&mut self, rule: &mut Rule) {
        match self.peek() {
            Some(b'@') => {
                self.pos += 1;
                rule.context = Some(self.read_raw().to_string());
            }
            Some(b'&') => {
                self.pos += 1;
                let key = self.read_raw();
                rule.options.push(RuleOption::field_ref(key));
            }
            Some(b'"') => {
                let mut value = self.read_quoted();
                value.push_str(self.read_raw());
                rule.options.push(RuleOption::string(value));
            }
            _ => {
                let raw = self.read_raw();
                rule.options.push(RuleOption::classify(raw));
            }
        }
    }

    /// Read up to the next separator or the end of input
    fn read_raw(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if Self::is_separator(byte) {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Read a quoted string starting at the opening quote.
    ///
    /// Only `\"` and `\\` are unescaped; any other backslash pair is kept
    /// verbatim so pattern escapes like `\[` survive.
    /// Brackets and separators inside the quotes are plain characters.
    fn read_quoted(&mut self) -> String {
        let open = self.pos;
        self.pos += 1;
        let mut buf: Vec<u8> = Vec::new();

        while let Some(byte) = self.peek() {
            match byte {
                b'"' => {
                    self.pos += 1;
                    return String::from_utf8_lossy(&buf).into_owned();
                }
                b'\\' => match self.bytes.get(self.pos + 1).copied() {
                    Some(escaped @ (b'"' | b'\\')) => {
                        buf.push(escaped);
                        self.pos += 2;
                    }
                    Some(next) => {
                        buf.push(b'\\');
                        buf.push(next);
                        self.pos += 2;
                    }
                    None => {
                        buf.push(b'\\');
                        self.pos += 1;
                    }
                },
                other => {
                    buf.push(other);
                    self.pos += 1;
                }
            }
        }

        log::trace!("unterminated quote opened at position {open}, taking rest of input");
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tag::OptionKind;

    fn scan(input: &str) -> TagNode {
        TagScanner::new(input).parse().unwrap()
    }

    #[test]
    fn test_plain_rules() {
        let node = scan("required,len:8:256");
        assert_eq!(node.rules.len(), 2);
        assert_eq!(node.rules[0].name, "required");
        assert_eq!(node.rules[1].name, "len");
        assert_eq!(node.rules[1].options[0].as_int(), Some(8));
        assert_eq!(node.rules[1].options[1].as_int(), Some(256));
        assert!(node.key.is_none());
        assert!(node.elem.is_none());
    }

    #[test]
    fn test_key_and_elem_groups() {
        let node = scan("required,[len:1:10]email");
        assert_eq!(node.rules[0].name, "required");
        let key = node.key.as_ref().unwrap();
        assert_eq!(key.rules[0].name, "len");
        let elem = node.elem.as_ref().unwrap();
        assert_eq!(elem.rules[0].name, "email");
    }

    #[test]
    fn test_rule_directly_before_bracket() {
        let node = scan("required[]email");
        assert_eq!(node.rules[0].name, "required");
        assert_eq!(node.elem.as_ref().unwrap().rules[0].name, "email");
    }

    #[test]
    fn test_context_label_and_reference() {
        let node = scan("eq:&Other:@create");
        let rule = &node.rules[0];
        assert_eq!(rule.options.len(), 1);
        assert_eq!(rule.options[0].kind, OptionKind::FieldRef);
        assert_eq!(rule.options[0].value, "Other");
        assert_eq!(rule.context.as_deref(), Some("create"));
    }

    #[test]
    fn test_stray_separators_are_skipped() {
        let node = scan(",,required,,:x,email,");
        let names: Vec<_> = node.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["required", "email"]);
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let node = scan(r#"contains:"a\"b]c",required"#);
        assert_eq!(node.rules[0].options[0].value, "a\"b]c");
        assert_eq!(node.rules[1].name, "required");
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(
            TagScanner::new("[email").parse(),
            Err(ParseError::UnclosedBracket { position: 0 })
        );
        assert_eq!(
            TagScanner::new("email]").parse(),
            Err(ParseError::UnmatchedCloseBracket { position: 5 })
        );
        assert!(TagScanner::new(r#"[re:"]"]"#).parse().is_ok());
        assert!(TagScanner::new(r#"[re:"]""#).parse().is_err());
    }

    #[test]
    fn test_escaped_backslash_in_quotes() {
        let node = scan(r#"contains:"a\\\"b",re:"\d+\[""#);
        assert_eq!(node.rules[0].options[0].value, r#"a\"b"#);
        assert_eq!(node.rules[1].options[0].value, r"\d+\[");
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = "[".repeat(MAX_NESTING_DEPTH) + &"]".repeat(MAX_NESTING_DEPTH);
        assert!(TagScanner::new(&at_limit).parse().is_ok());

        let opens = "[".repeat(1_000_000);
        assert_eq!(
            TagScanner::new(&opens).parse(),
            Err(ParseError::NestingTooDeep {
                position: MAX_NESTING_DEPTH,
                limit: MAX_NESTING_DEPTH,
            })
        );

        let chain = "[]".repeat(100_000);
        assert!(matches!(
            TagScanner::new(&chain).parse(),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_unterminated_quote_takes_rest() {
        let node = scan(r#"prefix:"abc,def"#);
        assert_eq!(node.rules.len(), 1);
        assert_eq!(node.rules[0].options[0].value, "abc,def");
    }
}
