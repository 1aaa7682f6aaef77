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

//! Properties of the annotation parser

use pretty_assertions::assert_eq;
use rstest::rstest;
use valtag::parser::{MAX_NESTING_DEPTH, OptionKind, ParseError, TagNode, parse_tag};

fn rule_names(node: &TagNode) -> Vec<&str> {
    node.rules.iter().map(|rule| rule.name.as_str()).collect()
}

#[rstest]
#[case("required")]
#[case("required,len:8:256")]
#[case("required,[len:1:10]email")]
#[case("[]email")]
#[case("omitnil,[]required,[]len:1:")]
#[case("len::10")]
#[case("eq:&Other:@create")]
#[case("eq:1:2:3,ne:\"1\":x")]
#[case(r#"re:"^[a-z]+\[[0-9]+\]$""#)]
#[case(r#"contains:"a,b:c",prefix:"say \"hi\"""#)]
#[case("[[required]email]len:2,[ip:4]uuid")]
#[case("custom:1.5:-3:true:plain")]
#[case(",,required,,")]
#[case("required[]email")]
#[case(r#"contains:a\"b"#)]
#[case(r#"contains:a\\\"b,len:1"#)]
#[case(r#"contains:a"b"#)]
#[case(r#"re:"\d\\\"x\\""#)]
#[case(r"suffix:\,excludes:a\\b")]
fn canonical_text_round_trips(#[case] input: &str) {
    let parsed = parse_tag(input).unwrap();
    let canonical = parsed.to_string();
    let reparsed = parse_tag(&canonical).unwrap();
    assert_eq!(reparsed, parsed, "canonical text: {canonical}");
    assert_eq!(reparsed.to_string(), canonical);
}

#[rstest]
#[case("[email", ParseError::UnclosedBracket { position: 0 })]
#[case("required,[[len:1]", ParseError::UnclosedBracket { position: 9 })]
#[case("email]", ParseError::UnmatchedCloseBracket { position: 5 })]
#[case("[]]", ParseError::UnmatchedCloseBracket { position: 2 })]
#[case(r#"[re:"]"#, ParseError::UnclosedBracket { position: 0 })]
fn unbalanced_brackets_fail(#[case] input: &str, #[case] expected: ParseError) {
    assert_eq!(parse_tag(input), Err(expected));
}

#[rstest]
#[case("[".repeat(1_000_000))]
#[case(format!("{}email", "[]".repeat(100_000)))]
#[case("[".repeat(MAX_NESTING_DEPTH + 1) + &"]".repeat(MAX_NESTING_DEPTH + 1))]
fn runaway_nesting_is_rejected(#[case] input: String) {
    assert!(matches!(
        parse_tag(&input),
        Err(ParseError::NestingTooDeep { position, limit: MAX_NESTING_DEPTH }) if position < input.len()
    ));
}

#[rstest]
#[case(5)]
#[case(8)]
#[case(16)]
fn balanced_nesting_matches_depth(#[case] depth: usize) {
    let elems = format!("{}email", "[]".repeat(depth));
    let node = parse_tag(&elems).unwrap();
    assert_eq!(node.elem_depth(), depth);
    assert_eq!(node.key_depth(), 0);

    let keys = format!("{}required{}", "[".repeat(depth), "]".repeat(depth));
    let node = parse_tag(&keys).unwrap();
    assert_eq!(node.key_depth(), depth);
    assert_eq!(node.elem_depth(), 0);
}

#[rstest]
#[case(r#"contains:"a,b""#, "a,b")]
#[case(r#"contains:"a:b""#, "a:b")]
#[case(r#"contains:"[x]""#, "[x]")]
#[case(r#"contains:"]""#, "]")]
#[case(r#"contains:"say \"hi\"""#, "say \"hi\"")]
fn quoted_options_are_opaque(#[case] input: &str, #[case] expected: &str) {
    let node = parse_tag(input).unwrap();
    assert_eq!(rule_names(&node), vec!["contains"]);
    let options = &node.rules[0].options;
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].value, expected);
    assert_eq!(options[0].kind, OptionKind::String);
}

#[rstest]
#[case("123", OptionKind::Int)]
#[case("-123", OptionKind::Int)]
#[case("1.5", OptionKind::Float)]
#[case("true", OptionKind::Bool)]
#[case("false", OptionKind::Bool)]
#[case("", OptionKind::Unknown)]
#[case("US", OptionKind::String)]
#[case("\"123\"", OptionKind::String)]
#[case("\"true\"", OptionKind::String)]
#[case("&Other", OptionKind::FieldRef)]
fn options_are_typed_by_shape(#[case] option: &str, #[case] expected: OptionKind) {
    let node = parse_tag(&format!("rule:{option}:last")).unwrap();
    assert_eq!(node.rules[0].options[0].kind, expected);
}

#[test]
fn regex_escapes_survive_verbatim() {
    let node = parse_tag(r#"re:"^[a-z]+\[[0-9]+\]$""#).unwrap();
    assert_eq!(node.rules[0].options[0].value, r"^[a-z]+\[[0-9]+\]$");
}

#[test]
fn last_context_label_wins() {
    let node = parse_tag("required:@create:@update").unwrap();
    assert_eq!(node.rules[0].context.as_deref(), Some("update"));
    assert!(node.rules[0].options.is_empty());
}

#[test]
fn trailing_rules_after_group_are_elem_rules() {
    let node = parse_tag("required,[len:1:10]email,lower").unwrap();
    assert_eq!(rule_names(&node), vec!["required"]);
    let key = node.key.as_deref().unwrap();
    assert_eq!(rule_names(key), vec!["len"]);
    let elem = node.elem.as_deref().unwrap();
    assert_eq!(rule_names(elem), vec!["email", "lower"]);
}

#[test]
fn empty_annotation_is_empty_node() {
    let node = parse_tag("").unwrap();
    assert!(node.is_empty());
    assert_eq!(node.to_string(), "");
}
