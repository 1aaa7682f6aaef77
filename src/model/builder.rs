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

//! Type model builder
//!
//! Converts provider descriptions into the [`Type`]/[`Field`] tree the
//! analyzer walks. Composite kinds are expanded recursively; a named type
//! already being expanded is left without fields or sub-types so
//! self-referential types stay finite.

use super::provider::{
    FieldDescription, MethodDescription, ProviderResult, TypeDescription, TypeProvider,
};
use super::types::{Field, Type, TypeFlags, TypeKind};
use crate::parser::SKIP_ANNOTATION;

/// Builds [`Type`] trees from a [`TypeProvider`]
pub struct TypeModelBuilder<'p, P: TypeProvider + ?Sized> {
    provider: &'p P,
    expanding: Vec<String>,
}

impl<'p, P: TypeProvider + ?Sized> TypeModelBuilder<'p, P> {
    /// Create a builder over `provider`
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            expanding: Vec::new(),
        }
    }

    /// Build the full type tree behind `handle`
    pub fn build(&mut self, handle: &str) -> ProviderResult<Type> {
        let description = self.provider.describe(handle)?;

        let kind = description.kind.unwrap_or_else(|| {
            log::trace!("type '{handle}' could not be classified, tagging as unresolved");
            TypeKind::Unresolved
        });

        let mut ty = Type::new(kind);
        ty.flags = TypeFlags {
            is_byte: description.is_byte,
            is_rune: description.is_rune,
            is_exported: description
                .name
                .as_ref()
                .and_then(|name| name.chars().next())
                .is_some_and(char::is_uppercase),
            is_imported: description.imported,
            ..TypeFlags::default()
        };
        ty.name = description.name.clone();
        ty.package = description.package.clone();
        ty.array_len = description.array_len;
        ty.constants = description.constants.clone();
        self.detect_capabilities(&description.methods, &mut ty.flags)?;

        let identity = match (&ty.name, kind) {
            (Some(_), _) => ty.qualified_name(),
            (None, TypeKind::Record) => Some(handle.to_string()),
            (None, _) => None,
        };
        let Some(identity) = identity else {
            self.expand(&description, &mut ty)?;
            return Ok(ty);
        };
        if self.expanding.contains(&identity) {
            log::trace!("type '{identity}' is already being expanded, not descending");
            return Ok(ty);
        }

        self.expanding.push(identity);
        let expanded = self.expand(&description, &mut ty);
        self.expanding.pop();
        expanded?;

        Ok(ty)
    }

    fn expand(&mut self, description: &TypeDescription, ty: &mut Type) -> ProviderResult<()> {
        if let Some(key) = &description.key {
            ty.key = Some(Box::new(self.build(key)?));
        }
        if let Some(elem) = &description.elem {
            ty.elem = Some(Box::new(self.build(elem)?));
        }
        if ty.kind == TypeKind::Record {
            ty.fields = self.build_fields(&description.fields, description.imported)?;
        }
        Ok(())
    }

    fn build_fields(
        &mut self,
        descriptions: &[FieldDescription],
        imported: bool,
    ) -> ProviderResult<Vec<Field>> {
        let mut fields = Vec::with_capacity(descriptions.len());

        for description in descriptions {
            if imported && !description.exported {
                log::trace!(
                    "skipping unexported field '{}' of imported record",
                    description.name
                );
                continue;
            }

            let ty = self.build(&description.type_handle)?;
            let mut field = Field::new(description.name.clone(), ty);
            field.is_exported = description.exported;
            field.is_embedded = description.embedded;
            field.tags = description.tags.clone();
            field.annotation = description
                .annotation
                .as_ref()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty());
            field.skipped = field.annotation.as_deref() == Some(SKIP_ANNOTATION);
            fields.push(field);
        }

        Ok(fields)
    }

    fn detect_capabilities(
        &self,
        methods: &[MethodDescription],
        flags: &mut TypeFlags,
    ) -> ProviderResult<()> {
        let mut has_error_method = false;
        let mut error_method_returns_error = false;
        let mut has_out_method = false;

        for method in methods {
            match method.name.as_str() {
                "IsValid" => {
                    flags.self_validating = method.params.is_empty()
                        && self.kinds_of(&method.results)? == [TypeKind::Bool];
                }
                "Error" if self.is_error_reporting(method)? => {
                    has_error_method = true;
                    error_method_returns_error = match method.results.as_slice() {
                        [result] => self.is_error_type(result)?,
                        _ => false,
                    };
                }
                "Out" if method.params.is_empty() => {
                    has_out_method = match method.results.as_slice() {
                        [result] => self.is_error_type(result)?,
                        _ => false,
                    };
                }
                _ => {}
            }
        }

        flags.error_constructor = has_error_method && error_method_returns_error;
        flags.error_aggregator =
            has_error_method && !error_method_returns_error && has_out_method;
        Ok(())
    }

    /// `Error(key string, val any, rule string, args ...any)`
    fn is_error_reporting(&self, method: &MethodDescription) -> ProviderResult<bool> {
        if !method.variadic || method.params.len() != 4 {
            return Ok(false);
        }
        let params = self.kinds_of(&method.params)?;
        if params[..3] != [TypeKind::String, TypeKind::Interface, TypeKind::String] {
            return Ok(false);
        }
        let rest = self.provider.describe(&method.params[3])?;
        if rest.kind != Some(TypeKind::Slice) {
            return Ok(false);
        }
        match &rest.elem {
            Some(elem) => Ok(self.provider.describe(elem)?.kind == Some(TypeKind::Interface)),
            None => Ok(false),
        }
    }

    fn is_error_type(&self, handle: &str) -> ProviderResult<bool> {
        let description = self.provider.describe(handle)?;
        Ok(description.kind == Some(TypeKind::Interface)
            && description.name.as_deref() == Some("error"))
    }

    fn kinds_of(&self, handles: &[String]) -> ProviderResult<Vec<TypeKind>> {
        handles
            .iter()
            .map(|handle| {
                self.provider
                    .describe(handle)
                    .map(|d| d.kind.unwrap_or(TypeKind::Unresolved))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_provider::MockTypeProvider;

    fn error_constructor() -> TypeDescription {
        TypeDescription::record("ErrorList", vec![]).with_method(
            MethodDescription::new("Error", &["string", "any", "string", "[]any"], &["error"])
                .variadic(),
        )
    }

    #[test]
    fn test_builds_nested_composites() {
        let provider = MockTypeProvider::new();
        let mut builder = TypeModelBuilder::new(&provider);
        let ty = builder.build("map[string][]*int").unwrap();

        assert_eq!(ty.kind, TypeKind::Map);
        assert_eq!(ty.key.as_ref().unwrap().kind, TypeKind::String);
        let elem = ty.elem.as_ref().unwrap();
        assert_eq!(elem.kind, TypeKind::Slice);
        assert_eq!(elem.elem.as_ref().unwrap().kind, TypeKind::Pointer);
    }

    #[test]
    fn test_self_referential_record_is_finite() {
        let provider = MockTypeProvider::new().with_type(
            "Node",
            TypeDescription::record(
                "Node",
                vec![
                    FieldDescription::new("Value", "string").with_annotation("required"),
                    FieldDescription::new("Next", "*Node"),
                ],
            ),
        );
        let ty = TypeModelBuilder::new(&provider).build("Node").unwrap();

        assert_eq!(ty.fields.len(), 2);
        let next = ty.fields[1].ty.deref();
        assert_eq!(next.kind, TypeKind::Record);
        assert!(next.fields.is_empty());
    }

    #[test]
    fn test_self_referential_named_composites_are_finite() {
        let mut list = TypeDescription::named("List", TypeKind::Slice);
        list.elem = Some("List".to_string());
        let mut tree = TypeDescription::named("Tree", TypeKind::Map);
        tree.key = Some("string".to_string());
        tree.elem = Some("Tree".to_string());
        let mut link = TypeDescription::named("Link", TypeKind::Pointer);
        link.elem = Some("Link".to_string());
        let provider = MockTypeProvider::new()
            .with_type("List", list)
            .with_type("Tree", tree)
            .with_type("Link", link);
        let mut builder = TypeModelBuilder::new(&provider);

        let list = builder.build("List").unwrap();
        let inner = list.elem.as_ref().unwrap();
        assert_eq!(inner.kind, TypeKind::Slice);
        assert!(inner.elem.is_none());

        let tree = builder.build("Tree").unwrap();
        assert_eq!(tree.key.as_ref().unwrap().kind, TypeKind::String);
        assert!(tree.elem.as_ref().unwrap().elem.is_none());

        let link = builder.build("Link").unwrap();
        assert!(link.elem.as_ref().unwrap().elem.is_none());
    }

    #[test]
    fn test_repeated_named_type_expands_in_siblings() {
        let provider = MockTypeProvider::new()
            .with_type(
                "Status",
                TypeDescription::named("Status", TypeKind::String),
            )
            .with_type(
                "Pair",
                TypeDescription::record(
                    "Pair",
                    vec![
                        FieldDescription::new("Left", "[]Status"),
                        FieldDescription::new("Right", "[]Status"),
                    ],
                ),
            );
        let ty = TypeModelBuilder::new(&provider).build("Pair").unwrap();

        for field in &ty.fields {
            let elem = field.ty.elem.as_ref().unwrap();
            assert_eq!(elem.name.as_deref(), Some("Status"));
            assert_eq!(elem.kind, TypeKind::String);
        }
    }

    #[test]
    fn test_detects_capabilities() {
        let provider = MockTypeProvider::new()
            .with_type(
                "Status",
                TypeDescription::named("Status", TypeKind::String)
                    .with_method(MethodDescription::new("IsValid", &[], &["bool"])),
            )
            .with_type("ErrorList", error_constructor())
            .with_type(
                "Collector",
                TypeDescription::record("Collector", vec![])
                    .with_method(
                        MethodDescription::new("Error", &["string", "any", "string", "[]any"], &[])
                            .variadic(),
                    )
                    .with_method(MethodDescription::new("Out", &[], &["error"])),
            );
        let mut builder = TypeModelBuilder::new(&provider);

        assert!(builder.build("Status").unwrap().flags.self_validating);
        let constructor = builder.build("ErrorList").unwrap();
        assert!(constructor.flags.error_constructor);
        assert!(!constructor.flags.error_aggregator);
        let aggregator = builder.build("Collector").unwrap();
        assert!(aggregator.flags.error_aggregator);
        assert!(!aggregator.flags.error_constructor);
    }

    #[test]
    fn test_skips_unexported_fields_of_imported_records() {
        let provider = MockTypeProvider::new().with_type(
            "ext.Account",
            TypeDescription::record(
                "Account",
                vec![
                    FieldDescription::new("ID", "string").with_annotation("required"),
                    FieldDescription::new("secret", "string").with_annotation("required"),
                    FieldDescription::new("Ignored", "string").with_annotation(" - "),
                ],
            )
            .in_package("ext")
            .imported(),
        );
        let ty = TypeModelBuilder::new(&provider).build("ext.Account").unwrap();

        let names: Vec<_> = ty.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "Ignored"]);
        assert!(ty.fields[1].skipped);
    }

    #[test]
    fn test_unclassified_type_is_unresolved() {
        let provider = MockTypeProvider::new().with_type("Weird", TypeDescription::unresolved());
        let ty = TypeModelBuilder::new(&provider).build("Weird").unwrap();
        assert_eq!(ty.kind, TypeKind::Unresolved);
    }
}
