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

//! Semantic analysis of annotated records
//!
//! [`Analyzer::analyze`] builds the type tree of one record, assigns field
//! keys, parses and checks every annotation, runs the record-wide
//! cross-checks and returns the validated IR together with the [`Info`]
//! aggregate the emitter needs.

pub mod checker;
pub mod context;
pub mod crossref;

pub use checker::Checker;
pub use context::{AnalysisContext, ContextUse};
pub use crossref::SpecialFields;

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result};
use crate::model::{Constant, Field, TypeKind, TypeModelBuilder, TypeProvider};
use crate::registry::{PatternCache, RuleRegistry};
use crate::selector::{SelectorMap, index_fields};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::Arc;

/// Analysed form of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorRecord {
    /// Record name
    pub name: String,
    /// Package declaring the record
    pub package: Option<String>,
    /// Top-level fields carrying rules, in declaration order
    pub fields: Vec<Field>,
    /// Field receiving validation errors
    pub error_handler: Option<Field>,
    /// Field carrying the validation context
    pub context: Option<Field>,
}

impl ValidatorRecord {
    /// Find a top-level field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Everything the emitter needs besides the record itself
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    /// Field selectors by key
    pub selectors: SelectorMap,
    /// Rule registry the record was checked against
    pub registry: Arc<RuleRegistry>,
    /// Regular expressions used by the record
    pub patterns: IndexSet<String>,
    /// Enumerations used with `enum`, by qualified type name
    pub enums: IndexMap<String, Vec<Constant>>,
}

/// Result of analysing one record
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Validated record IR
    pub record: ValidatorRecord,
    /// Aggregate data for the emitter
    pub info: Info,
}

/// Annotation analyzer over a type provider
pub struct Analyzer<P: TypeProvider> {
    provider: P,
    registry: Arc<RuleRegistry>,
    patterns: Arc<PatternCache>,
    config: AnalyzerConfig,
}

impl<P: TypeProvider> Analyzer<P> {
    /// Create an analyzer with the built-in rules and default configuration
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            registry: Arc::new(RuleRegistry::standard()),
            patterns: Arc::new(PatternCache::new()),
            config: AnalyzerConfig::default(),
        }
    }

    /// Use a registry extended with custom rules
    pub fn with_registry(mut self, registry: Arc<RuleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use a custom configuration. It is validated when analysis starts.
    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a pattern cache with other analyzers
    pub fn with_pattern_cache(mut self, patterns: Arc<PatternCache>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Rule registry in use
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compiled pattern cache
    pub fn pattern_cache(&self) -> &Arc<PatternCache> {
        &self.patterns
    }

    /// Analyse the record behind `handle`
    pub fn analyze(&self, handle: &str) -> Result<Analysis> {
        log::debug!("analysing record '{handle}'");
        self.config.validate()?;

        let ty = TypeModelBuilder::new(&self.provider).build(handle)?;
        let ty = match ty.kind {
            TypeKind::Pointer => ty.elem.map(|elem| *elem),
            TypeKind::Record => Some(ty),
            _ => None,
        }
        .filter(|ty| ty.kind == TypeKind::Record)
        .ok_or_else(|| AnalysisError::NotARecord {
            name: handle.to_string(),
        })?;

        let name = ty.name.clone().unwrap_or_else(|| handle.to_string());
        let package = ty.package.clone();
        let mut fields = ty.fields;

        let selectors = index_fields(&mut fields, &self.config.keys);
        let mut ctx = AnalysisContext::new(name.clone(), selectors);

        Checker::new(&self.registry, &self.patterns, &self.config, &mut ctx)
            .check_fields(&mut fields)?;

        let context_name = &self.config.context_field_name;
        let (fields, special) = crossref::split_special_fields(&name, fields, context_name)?;
        crossref::check_context_requirement(&ctx, &special, context_name)?;

        let fields: Vec<Field> = fields
            .into_iter()
            .filter(|field| {
                let keep = !field.skipped && field.has_rules();
                if !keep {
                    log::trace!("{name}: dropping field '{}' without rules", field.name);
                }
                keep
            })
            .collect();
        if fields.is_empty() {
            return Err(AnalysisError::NoValidatableFields { record: name });
        }

        log::debug!("record '{name}' analysed: {} fields", fields.len());

        Ok(Analysis {
            record: ValidatorRecord {
                name,
                package,
                fields,
                error_handler: special.error_handler,
                context: special.context,
            },
            info: Info {
                selectors: ctx.selectors,
                registry: Arc::clone(&self.registry),
                patterns: ctx.patterns,
                enums: ctx.enums,
            },
        })
    }

    /// Analyse several records.
    ///
    /// Returns one entry per analysed handle. A failing record is logged and
    /// the batch continues, unless `fail_fast_batch` is set, in which case the
    /// failing record is the last entry.
    pub fn analyze_batch<I, S>(&self, handles: I) -> Vec<(String, Result<Analysis>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = Vec::new();
        for handle in handles {
            let handle = handle.as_ref();
            let result = self.analyze(handle);
            let failed = result.is_err();
            if let Err(err) = &result {
                log::warn!("excluding record '{handle}': [{}] {err}", err.code());
            }
            results.push((handle.to_string(), result));
            if failed && self.config.fail_fast_batch {
                log::debug!("stopping batch after failure of '{handle}'");
                break;
            }
        }
        results
    }
}
