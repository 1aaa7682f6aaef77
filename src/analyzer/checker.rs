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

//! Rule/type compatibility checks
//!
//! The checker walks every field of a record depth-first, parses its
//! annotation and checks each rule at each nesting level against the type it
//! applies to. The first violation aborts the walk.

use super::context::AnalysisContext;
use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result, RuleSite};
use crate::model::{Field, Type, TypeKind};
use crate::parser::{Rule, RuleOption, TagNode, parse_tag};
use crate::registry::{
    IS_VALID, LookupError, NO_IS_VALID, OptionMismatch, PatternCache, RuleRegistry, RuleSpec,
};
use crate::selector::nested_fields_mut;

/// Rule that collects enumeration constants
const ENUM_RULE: &str = "enum";

/// Checks the rule trees of a record's fields
pub struct Checker<'a> {
    registry: &'a RuleRegistry,
    patterns: &'a PatternCache,
    config: &'a AnalyzerConfig,
    ctx: &'a mut AnalysisContext,
}

impl<'a> Checker<'a> {
    /// Create a checker writing into `ctx`
    pub fn new(
        registry: &'a RuleRegistry,
        patterns: &'a PatternCache,
        config: &'a AnalyzerConfig,
        ctx: &'a mut AnalysisContext,
    ) -> Self {
        Self {
            registry,
            patterns,
            config,
            ctx,
        }
    }

    /// Parse and check every field, replacing each field's tag with the
    /// resolved rule tree
    pub fn check_fields(&mut self, fields: &mut [Field]) -> Result<()> {
        self.check_level(fields, None)
    }

    fn check_level(&mut self, fields: &mut [Field], parent: Option<&str>) -> Result<()> {
        for field in fields.iter_mut() {
            let path = match parent {
                Some(parent) => format!("{parent}.{}", field.name),
                None => field.name.clone(),
            };
            if field.skipped {
                log::trace!("{}: field '{path}' is skipped", self.ctx.record);
                continue;
            }

            let tag = match &field.annotation {
                Some(annotation) => {
                    parse_tag(annotation).map_err(|source| AnalysisError::Syntax {
                        record: self.ctx.record.clone(),
                        field: path.clone(),
                        source,
                    })?
                }
                None => TagNode::default(),
            };
            field.tag = self.check_node(tag, &field.ty, &path)?;

            if let Some(nested) = nested_fields_mut(&mut field.ty) {
                self.check_level(nested, Some(&path))?;
            }
        }
        Ok(())
    }

    /// Check one nesting level; `declared` is the type before pointer stripping
    fn check_node(&mut self, mut node: TagNode, declared: &Type, path: &str) -> Result<TagNode> {
        let ty = declared.deref();

        if self.config.auto_isvalid
            && (declared.flags.self_validating || ty.flags.self_validating)
            && !node.has_rule(IS_VALID)
            && !node.has_rule(NO_IS_VALID)
        {
            log::debug!(
                "{}: adding implicit '{IS_VALID}' to field '{path}' of type {declared}",
                self.ctx.record
            );
            node.rules.push(Rule::new(IS_VALID));
        }

        for rule in &node.rules {
            self.check_rule(rule, declared, path)?;
        }
        node.rules.retain(|rule| rule.name != NO_IS_VALID);

        if let Some(key) = node.key.take() {
            let key_type = match (ty.kind, ty.key.as_deref()) {
                (TypeKind::Map, Some(key_type)) => key_type,
                _ => {
                    return Err(AnalysisError::KeyRuleOnNonMap {
                        record: self.ctx.record.clone(),
                        field: path.to_string(),
                        type_name: declared.to_string(),
                    });
                }
            };
            node.key = self.check_node(*key, key_type, path)?.into_slot();
        }

        if let Some(elem) = node.elem.take() {
            let elem_type = match ty.elem.as_deref() {
                Some(elem_type) if ty.is_container() => elem_type,
                _ => {
                    return Err(AnalysisError::ElemRuleOnNonContainer {
                        record: self.ctx.record.clone(),
                        field: path.to_string(),
                        type_name: declared.to_string(),
                    });
                }
            };
            node.elem = self.check_node(*elem, elem_type, path)?.into_slot();
        }

        Ok(node)
    }

    fn check_rule(&mut self, rule: &Rule, declared: &Type, path: &str) -> Result<()> {
        let site = RuleSite::new(self.ctx.record.clone(), path, rule.name.clone());
        log::trace!("checking {site} ({} options)", rule.options.len());

        let spec = self.lookup(rule, &site)?;

        if declared.deref().kind == TypeKind::Unresolved {
            return Err(AnalysisError::UnresolvedType {
                site,
                type_name: declared.to_string(),
            });
        }

        if let Some(label) = &rule.context {
            self.ctx.note_context(path, &rule.name, label);
        }

        for (index, option) in rule.options.iter().enumerate() {
            self.check_option(spec, &site, index, option, declared)?;
        }

        spec.check_bounds(&rule.options)
            .map_err(|(index, mismatch)| {
                option_error(site.clone(), index, &rule.options[index], mismatch)
            })?;

        spec.check_field(declared)
            .map_err(|expected| AnalysisError::IncompatibleFieldType {
                site: site.clone(),
                type_name: declared.to_string(),
                expected,
            })?;

        if rule.name == ENUM_RULE {
            let ty = declared.deref();
            let name = ty.qualified_name().unwrap_or_else(|| ty.to_string());
            self.ctx.note_enum(name, &ty.constants);
        }
        Ok(())
    }

    fn lookup(&self, rule: &Rule, site: &RuleSite) -> Result<&'a RuleSpec> {
        self.registry
            .lookup(&rule.name, rule.options.len())
            .map_err(|err| match err {
                LookupError::Unknown => AnalysisError::UnknownRule { site: site.clone() },
                LookupError::InvalidCount { .. } => AnalysisError::InvalidOptionCount {
                    site: site.clone(),
                    count: rule.options.len(),
                    accepted: err.accepted_counts(),
                },
            })
    }

    fn check_option(
        &mut self,
        spec: &RuleSpec,
        site: &RuleSite,
        index: usize,
        option: &RuleOption,
        declared: &Type,
    ) -> Result<()> {
        if option.is_field_ref() {
            let selector =
                self.ctx
                    .selector(&option.value)
                    .ok_or_else(|| AnalysisError::UnresolvedReference {
                        site: site.clone(),
                        index,
                        key: option.value.clone(),
                    })?;
            return spec
                .check_reference(index, &selector.ty, declared)
                .map_err(|mismatch| option_error(site.clone(), index, option, mismatch));
        }

        spec.check_option(index, option, declared)
            .map_err(|mismatch| option_error(site.clone(), index, option, mismatch))?;

        if spec.is_pattern() {
            self.patterns.compile(&option.value).map_err(|err| {
                AnalysisError::MalformedLiteral {
                    site: site.clone(),
                    index,
                    value: option.value.clone(),
                    reason: format!("invalid regular expression: {err}"),
                }
            })?;
            self.ctx.note_pattern(&option.value);
        }
        Ok(())
    }
}

fn option_error(
    site: RuleSite,
    index: usize,
    option: &RuleOption,
    mismatch: OptionMismatch,
) -> AnalysisError {
    let value = option.value.clone();
    match mismatch {
        OptionMismatch::Incompatible { expected } => AnalysisError::IncompatibleOption {
            site,
            index,
            value,
            expected,
        },
        OptionMismatch::Malformed { reason } => AnalysisError::MalformedLiteral {
            site,
            index,
            value,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::index_fields;

    fn run(fields: &mut Vec<Field>, config: &AnalyzerConfig) -> Result<AnalysisContext> {
        let registry = RuleRegistry::standard();
        let patterns = PatternCache::new();
        let selectors = index_fields(fields, &config.keys);
        let mut ctx = AnalysisContext::new("Form", selectors);
        Checker::new(&registry, &patterns, config, &mut ctx).check_fields(fields)?;
        Ok(ctx)
    }

    fn annotated(name: &str, ty: Type, annotation: &str) -> Field {
        let mut field = Field::new(name, ty);
        field.annotation = Some(annotation.to_string());
        field
    }

    fn self_validating() -> Type {
        let mut ty = Type::new(TypeKind::String);
        ty.name = Some("Status".to_string());
        ty.flags.self_validating = true;
        ty
    }

    #[test]
    fn test_implicit_isvalid() {
        let config = AnalyzerConfig::default();
        let mut fields = vec![
            Field::new("Implicit", self_validating()),
            annotated("Suppressed", self_validating(), "-isvalid"),
            annotated("Explicit", self_validating(), "isvalid,required"),
        ];
        run(&mut fields, &config).unwrap();

        assert!(fields[0].tag.has_rule(IS_VALID));
        assert!(fields[1].tag.rules.is_empty());
        assert_eq!(fields[2].tag.rules.len(), 2);

        let mut fields = vec![Field::new("Implicit", self_validating())];
        run(&mut fields, &config.clone().with_auto_isvalid(false)).unwrap();
        assert!(fields[0].tag.rules.is_empty());
    }

    #[test]
    fn test_nested_record_fields_are_checked() {
        let mut address = Type::new(TypeKind::Record);
        address.name = Some("Address".to_string());
        address.fields = vec![annotated("Zip", Type::new(TypeKind::Int), "email")];
        let mut fields = vec![Field::new("Home", Type::pointer_to(address))];

        let err = run(&mut fields, &AnalyzerConfig::default()).unwrap_err();
        match err {
            AnalysisError::IncompatibleFieldType { site, .. } => {
                assert_eq!(site.field, "Home.Zip");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_skipped_fields_are_not_checked() {
        let mut fields = vec![
            annotated("Ignored", Type::new(TypeKind::Int), "-"),
            annotated("Email", Type::new(TypeKind::String), "email"),
        ];
        fields[0].skipped = true;
        run(&mut fields, &AnalyzerConfig::default()).unwrap();
        assert!(fields[0].tag.is_empty());
    }

    #[test]
    fn test_enum_constants_are_collected() {
        let mut level = Type::new(TypeKind::Int);
        level.name = Some("Level".to_string());
        level.package = Some("acl".to_string());
        level.constants = vec![
            crate::model::Constant::new("Low", "0"),
            crate::model::Constant::new("High", "1"),
        ];
        let mut fields = vec![annotated("Level", level, "enum")];
        let ctx = run(&mut fields, &AnalyzerConfig::default()).unwrap();
        assert_eq!(ctx.enums["acl.Level"].len(), 2);
    }

    #[test]
    fn test_invalid_pattern_is_malformed() {
        let mut fields = vec![annotated("Code", Type::new(TypeKind::String), r#"re:"(unclosed""#)];
        let err = run(&mut fields, &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedLiteral { index: 0, .. }));
    }
}
