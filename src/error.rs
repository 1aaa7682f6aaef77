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

//! Error types for annotation analysis
//!
//! Every error aborts the analysis of the record it was raised for and
//! carries enough identity (record, field path, rule, option position) for a
//! diagnostic renderer to point at the offending annotation.

use crate::model::ProviderError;
use crate::parser::ParseError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Location of a rule inside a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuleSite {
    /// Record name
    pub record: String,
    /// Dotted field path from the record root
    pub field: String,
    /// Rule name
    pub rule: String,
}

impl RuleSite {
    /// Create a new rule site
    pub fn new(
        record: impl Into<String>,
        field: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            record: record.into(),
            field: field.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for RuleSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule '{}' on field '{}' of '{}'",
            self.rule, self.field, self.record
        )
    }
}

/// Broad classification of analysis errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    /// Bad custom-rule registration or configuration
    Configuration,
    /// Unbalanced annotation brackets
    Syntax,
    /// Record-level shape problems
    Structural,
    /// A rule cannot apply to its field or options
    RuleApplicability,
    /// Unresolved field reference
    Reference,
    /// Key or element rules on the wrong kind of type
    Placement,
    /// The type provider failed
    Provider,
}

/// Comprehensive error type for annotation analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A custom rule signature is unusable
    #[error("Invalid custom rule '{name}': {reason}")]
    InvalidCustomRule {
        /// Rule name
        name: String,
        /// Why the registration was rejected
        reason: String,
    },

    /// A custom rule tried to take a reserved name
    #[error("Rule name '{name}' is reserved")]
    ReservedRuleName {
        /// Rule name
        name: String,
    },

    /// A custom rule overload overlaps an existing one
    #[error("Rule '{name}' is already registered for {arity} options")]
    DuplicateRule {
        /// Rule name
        name: String,
        /// Overlapping option count bounds
        arity: String,
    },

    /// The analyzer configuration could not be loaded
    #[error("Invalid configuration: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// An annotation failed to parse
    #[error("Syntax error in annotation of field '{field}' of '{record}': {source}")]
    Syntax {
        /// Record name
        record: String,
        /// Field path
        field: String,
        /// Underlying parser error
        #[source]
        source: ParseError,
    },

    /// The requested type is not a record
    #[error("Type '{name}' is not a record")]
    NotARecord {
        /// Type handle
        name: String,
    },

    /// The record has nothing to validate
    #[error("Record '{record}' has no fields to validate")]
    NoValidatableFields {
        /// Record name
        record: String,
    },

    /// A second error-handler field was found
    #[error("Record '{record}' has more than one error handler: field '{field}' conflicts with '{first}'")]
    DuplicateErrorHandler {
        /// Record name
        record: String,
        /// The second handler field
        field: String,
        /// The handler field found first
        first: String,
    },

    /// A second context field was found
    #[error("Record '{record}' has more than one context field: field '{field}' conflicts with '{first}'")]
    DuplicateContextField {
        /// Record name
        record: String,
        /// The second context field
        field: String,
        /// The context field found first
        first: String,
    },

    /// A context label is used but the record has no context field
    #[error("{site} uses context label '{label}' but the record has no string field named '{expected}'")]
    MissingContextField {
        /// First rule using a context label
        site: RuleSite,
        /// The label used
        label: String,
        /// Reserved context field name
        expected: String,
    },

    /// No rule with this name exists
    #[error("Unknown {site}")]
    UnknownRule {
        /// Offending rule
        site: RuleSite,
    },

    /// The rule exists but not with this many options
    #[error("{site} has {count} options, expected {accepted}")]
    InvalidOptionCount {
        /// Offending rule
        site: RuleSite,
        /// Options given
        count: usize,
        /// Accepted option counts
        accepted: String,
    },

    /// A literal option cannot be used at all
    #[error("{site}: option #{} '{value}' is malformed: {reason}", .index + 1)]
    MalformedLiteral {
        /// Offending rule
        site: RuleSite,
        /// Zero-based option position
        index: usize,
        /// Literal text
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// A literal option does not fit the field
    #[error("{site}: option #{} '{value}' is incompatible, expected {expected}", .index + 1)]
    IncompatibleOption {
        /// Offending rule
        site: RuleSite,
        /// Zero-based option position
        index: usize,
        /// Literal text
        value: String,
        /// What the option should have been
        expected: String,
    },

    /// The rule cannot apply to the field's type
    #[error("{site} cannot apply to type {type_name}, expected {expected}")]
    IncompatibleFieldType {
        /// Offending rule
        site: RuleSite,
        /// Field type
        type_name: String,
        /// Accepted type category
        expected: String,
    },

    /// A rule targets a type the provider could not classify
    #[error("{site} targets unresolved type {type_name}")]
    UnresolvedType {
        /// Offending rule
        site: RuleSite,
        /// Type as far as it is known
        type_name: String,
    },

    /// A field-reference option names no known field
    #[error("{site}: option #{} references unknown field key '{key}'", .index + 1)]
    UnresolvedReference {
        /// Offending rule
        site: RuleSite,
        /// Zero-based option position
        index: usize,
        /// The unresolved key
        key: String,
    },

    /// Key rules on something other than a map
    #[error("Field '{field}' of '{record}' has key rules but type {type_name} is not a map")]
    KeyRuleOnNonMap {
        /// Record name
        record: String,
        /// Field path
        field: String,
        /// Type the key rules were applied to
        type_name: String,
    },

    /// Element rules on something other than an array, slice or map
    #[error("Field '{field}' of '{record}' has element rules but type {type_name} is not an array, slice or map")]
    ElemRuleOnNonContainer {
        /// Record name
        record: String,
        /// Field path
        field: String,
        /// Type the element rules were applied to
        type_name: String,
    },

    /// The type provider failed
    #[error("Type provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl AnalysisError {
    /// Create an invalid custom rule error
    pub fn invalid_custom_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidCustomRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        AnalysisError::Config {
            message: message.into(),
        }
    }

    /// Classification of the error
    pub fn category(&self) -> ErrorCategory {
        use AnalysisError::*;
        match self {
            InvalidCustomRule { .. } | ReservedRuleName { .. } | DuplicateRule { .. }
            | Config { .. } => ErrorCategory::Configuration,
            Syntax { .. } => ErrorCategory::Syntax,
            NotARecord { .. }
            | NoValidatableFields { .. }
            | DuplicateErrorHandler { .. }
            | DuplicateContextField { .. }
            | MissingContextField { .. } => ErrorCategory::Structural,
            UnknownRule { .. }
            | InvalidOptionCount { .. }
            | MalformedLiteral { .. }
            | IncompatibleOption { .. }
            | IncompatibleFieldType { .. }
            | UnresolvedType { .. } => ErrorCategory::RuleApplicability,
            UnresolvedReference { .. } => ErrorCategory::Reference,
            KeyRuleOnNonMap { .. } | ElemRuleOnNonContainer { .. } => ErrorCategory::Placement,
            Provider(_) => ErrorCategory::Provider,
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        use AnalysisError::*;
        match self {
            InvalidCustomRule { .. } => "VT0001",
            ReservedRuleName { .. } => "VT0002",
            DuplicateRule { .. } => "VT0003",
            Config { .. } => "VT0004",
            Syntax { .. } => "VT0101",
            NotARecord { .. } => "VT0201",
            NoValidatableFields { .. } => "VT0202",
            DuplicateErrorHandler { .. } => "VT0203",
            DuplicateContextField { .. } => "VT0204",
            MissingContextField { .. } => "VT0205",
            UnknownRule { .. } => "VT0301",
            InvalidOptionCount { .. } => "VT0302",
            MalformedLiteral { .. } => "VT0303",
            IncompatibleOption { .. } => "VT0304",
            IncompatibleFieldType { .. } => "VT0305",
            UnresolvedType { .. } => "VT0306",
            UnresolvedReference { .. } => "VT0401",
            KeyRuleOnNonMap { .. } => "VT0501",
            ElemRuleOnNonContainer { .. } => "VT0502",
            Provider(_) => "VT0601",
        }
    }

    /// Rule site, for errors raised on a specific rule
    pub fn site(&self) -> Option<&RuleSite> {
        use AnalysisError::*;
        match self {
            MissingContextField { site, .. }
            | UnknownRule { site }
            | InvalidOptionCount { site, .. }
            | MalformedLiteral { site, .. }
            | IncompatibleOption { site, .. }
            | IncompatibleFieldType { site, .. }
            | UnresolvedType { site, .. }
            | UnresolvedReference { site, .. } => Some(site),
            _ => None,
        }
    }
}
