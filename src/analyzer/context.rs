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

//! State carried across one record's analysis

use crate::model::Constant;
use crate::selector::{Selector, SelectorMap};
use indexmap::{IndexMap, IndexSet};

/// First rule that used a context label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUse {
    /// Field path
    pub field: String,
    /// Rule name
    pub rule: String,
    /// Label given with `@label`
    pub label: String,
}

/// Per-record analysis state
#[derive(Debug)]
pub struct AnalysisContext {
    /// Record name
    pub record: String,
    /// Selectors of every field, indexed by key
    pub selectors: SelectorMap,
    /// First rule requiring a context field
    pub context_use: Option<ContextUse>,
    /// Regular expressions used by `re` rules, in first-use order
    pub patterns: IndexSet<String>,
    /// Named constants of types used with `enum`, by qualified type name
    pub enums: IndexMap<String, Vec<Constant>>,
}

impl AnalysisContext {
    /// Create the context for `record`
    pub fn new(record: impl Into<String>, selectors: SelectorMap) -> Self {
        Self {
            record: record.into(),
            selectors,
            context_use: None,
            patterns: IndexSet::new(),
            enums: IndexMap::new(),
        }
    }

    /// Resolve a field-reference key
    pub fn selector(&self, key: &str) -> Option<&Selector> {
        self.selectors.get(key)
    }

    /// Remember a context label; only the first use is kept
    pub fn note_context(&mut self, field: &str, rule: &str, label: &str) {
        if self.context_use.is_none() {
            self.context_use = Some(ContextUse {
                field: field.to_string(),
                rule: rule.to_string(),
                label: label.to_string(),
            });
        }
    }

    /// Check whether any rule used a context label
    pub fn needs_context(&self) -> bool {
        self.context_use.is_some()
    }

    /// Record a pattern used by a rule
    pub fn note_pattern(&mut self, pattern: &str) {
        if !self.patterns.contains(pattern) {
            self.patterns.insert(pattern.to_string());
        }
    }

    /// Record the constants of an enumeration type
    pub fn note_enum(&mut self, type_name: String, constants: &[Constant]) {
        self.enums
            .entry(type_name)
            .or_insert_with(|| constants.to_vec());
    }
}
