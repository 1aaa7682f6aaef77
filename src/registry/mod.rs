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

//! Rule registry
//!
//! Holds rule descriptors keyed by name and option count. Built-in rules are
//! registered on construction; custom rules backed by predicate functions are
//! added through [`RuleRegistryBuilder`] before the registry is frozen behind
//! an [`Arc`] and handed to the analyzer.

pub mod builtin;
pub mod custom;
pub mod pattern_cache;
pub mod signature;

pub use builtin::{IS_VALID, NO_IS_VALID};
pub use custom::{CustomRule, CustomSignature};
pub use pattern_cache::PatternCache;
pub use signature::{
    Arity, FieldCheck, OptionCheck, OptionMismatch, RuleKind, RuleSpec, literal_fits,
};

use crate::error::{AnalysisError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;

/// Characters that would break the annotation grammar inside a rule name
const NAME_DELIMITERS: &[char] = &[':', ',', '[', ']', '"', '@', '&'];

/// Why a rule lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No rule is registered under the name
    Unknown,
    /// The rule exists, but no overload accepts the option count
    InvalidCount {
        /// Option-count bounds of every overload
        accepted: Vec<Arity>,
    },
}

impl LookupError {
    /// Render the accepted counts as `1 or 2-3`
    pub fn accepted_counts(&self) -> String {
        match self {
            LookupError::Unknown => String::new(),
            LookupError::InvalidCount { accepted } => accepted
                .iter()
                .map(Arity::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

/// Registry of rule descriptors with arity overloading
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleRegistry {
    rules: FxHashMap<String, SmallVec<[RuleSpec; 2]>>,
    #[serde(skip)]
    reserved: FxHashSet<String>,
}

impl RuleRegistry {
    /// Create a registry with no rules at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in rule set
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        builtin::register_builtin_rules(&mut registry);
        registry
    }

    /// Start building a registry on top of the built-in rule set
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::new()
    }

    /// Find the overload of `name` accepting `count` options
    pub fn lookup(&self, name: &str, count: usize) -> std::result::Result<&RuleSpec, LookupError> {
        let overloads = self.rules.get(name).ok_or(LookupError::Unknown)?;
        overloads
            .iter()
            .find(|spec| spec.arity.accepts(count))
            .ok_or_else(|| LookupError::InvalidCount {
                accepted: overloads.iter().map(|spec| spec.arity).collect(),
            })
    }

    /// Check whether any overload exists for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Check whether `name` belongs to the built-in set
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// All overloads registered for `name`
    pub fn overloads(&self, name: &str) -> &[RuleSpec] {
        self.rules.get(name).map_or(&[], |specs| specs.as_slice())
    }

    /// Registered rule names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered rule names
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check whether the registry holds no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn insert_builtin(&mut self, spec: RuleSpec) {
        debug_assert!(
            self.overloads(&spec.name)
                .iter()
                .all(|existing| !existing.arity.overlaps(&spec.arity)),
            "built-in overloads of '{}' overlap",
            spec.name
        );
        self.reserved.insert(spec.name.clone());
        self.rules.entry(spec.name.clone()).or_default().push(spec);
    }

    /// Register a custom rule backed by a predicate function.
    ///
    /// The option count of the rule follows from the signature: every
    /// parameter after the first receives one option, a variadic tail any
    /// number of them.
    pub fn register_custom(&mut self, name: &str, signature: CustomSignature) -> Result<()> {
        validate_rule_name(name)?;
        if self.is_reserved(name) {
            return Err(AnalysisError::ReservedRuleName {
                name: name.to_string(),
            });
        }
        signature
            .validate()
            .map_err(|reason| AnalysisError::invalid_custom_rule(name, reason))?;

        let rule = CustomRule::new(signature);
        let arity = rule.arity();
        if self
            .overloads(name)
            .iter()
            .any(|existing| existing.arity.overlaps(&arity))
        {
            return Err(AnalysisError::DuplicateRule {
                name: name.to_string(),
                arity: arity.to_string(),
            });
        }

        log::debug!(
            "registered custom rule '{name}' ({arity} options) -> {}.{}",
            rule.signature.package,
            rule.signature.function
        );
        self.rules
            .entry(name.to_string())
            .or_default()
            .push(RuleSpec {
                name: name.to_string(),
                arity,
                kind: RuleKind::Custom(rule),
            });
        Ok(())
    }
}

fn validate_rule_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name.starts_with('-') {
        "name must not start with '-'"
    } else if name.contains(NAME_DELIMITERS) || name.contains(char::is_whitespace) {
        "name must not contain whitespace or any of : , [ ] \" @ &"
    } else {
        return Ok(());
    };
    Err(AnalysisError::invalid_custom_rule(name, reason))
}

/// Builder extending the built-in registry with custom rules
#[derive(Debug, Clone)]
pub struct RuleRegistryBuilder {
    registry: RuleRegistry,
}

impl Default for RuleRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistryBuilder {
    /// Create a builder seeded with the built-in rules
    pub fn new() -> Self {
        Self {
            registry: RuleRegistry::standard(),
        }
    }

    /// Add a custom rule, consuming the builder
    pub fn custom_rule(mut self, name: &str, signature: CustomSignature) -> Result<Self> {
        self.registry.register_custom(name, signature)?;
        Ok(self)
    }

    /// Add a custom rule in place
    pub fn register_custom(&mut self, name: &str, signature: CustomSignature) -> Result<()> {
        self.registry.register_custom(name, signature)
    }

    /// Freeze the registry
    pub fn build(self) -> Arc<RuleRegistry> {
        Arc::new(self.registry)
    }
}
