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

//! Annotation parser error types

use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Syntax error raised while scanning an annotation.
///
/// The annotation grammar is lenient: the only shapes rejected outright are
/// unbalanced bracket groups and trees nested past the scanner's limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `]` was found with no open bracket group
    #[error("Unexpected ']' at position {position}: no bracket group is open")]
    UnmatchedCloseBracket {
        /// Byte offset of the stray `]`
        position: usize,
    },

    /// Input ended while a bracket group was still open
    #[error("Unclosed '[' opened at position {position}")]
    UnclosedBracket {
        /// Byte offset of the `[` that was never closed
        position: usize,
    },

    /// Bracket groups nest deeper than the scanner accepts
    #[error("Bracket group at position {position} nests deeper than {limit} levels")]
    NestingTooDeep {
        /// Byte offset of the `[` that crossed the limit
        position: usize,
        /// Maximum tree depth
        limit: usize,
    },
}

impl ParseError {
    /// Byte offset the error points at
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnmatchedCloseBracket { position }
            | ParseError::UnclosedBracket { position }
            | ParseError::NestingTooDeep { position, .. } => *position,
        }
    }
}
