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

//! Annotation parser
//!
//! Turns a raw validation annotation such as `required,[len:1:32]email` into a
//! [`TagNode`] tree. The parser is purely syntactic and knows nothing about
//! field types or rule names.

pub mod error;
pub mod scanner;
pub mod tag;

pub use error::{ParseError, ParseResult};
pub use scanner::{MAX_NESTING_DEPTH, TagScanner};
pub use tag::{OptionKind, Rule, RuleOption, TagNode};

/// Annotation value marking a field as excluded from validation
pub const SKIP_ANNOTATION: &str = "-";

/// Parse an annotation string into a rule tree
pub fn parse_tag(input: &str) -> ParseResult<TagNode> {
    TagScanner::new(input).parse()
}
