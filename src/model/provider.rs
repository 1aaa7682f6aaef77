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

//! Type introspection provider interface
//!
//! The analyzer never inspects source code itself. Everything it knows about
//! a record comes from a [`TypeProvider`], queried by opaque type handles.

use super::types::{Constant, TypeKind};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider queries
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors reported by a type provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The handle does not name any known type
    #[error("Unknown type '{handle}'")]
    UnknownType {
        /// The handle that failed to resolve
        handle: String,
    },

    /// The provider failed while loading type information
    #[error("Failed to describe type '{handle}': {message}")]
    Failed {
        /// The handle being described
        handle: String,
        /// Provider-specific message
        message: String,
    },
}

/// Description of one record field as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// Declared field name
    pub name: String,
    /// Handle of the field type
    pub type_handle: String,
    /// Raw validation annotation
    pub annotation: Option<String>,
    /// Other tags attached to the field, e.g. `json`
    pub tags: IndexMap<String, String>,
    /// The field name is exported
    pub exported: bool,
    /// The field is embedded
    pub embedded: bool,
}

impl FieldDescription {
    /// Create a field description; exported-ness follows the name's case
    pub fn new(name: impl Into<String>, type_handle: impl Into<String>) -> Self {
        let name = name.into();
        let exported = name.chars().next().is_some_and(char::is_uppercase);
        Self {
            name,
            type_handle: type_handle.into(),
            annotation: None,
            tags: IndexMap::new(),
            exported,
            embedded: false,
        }
    }

    /// Attach a validation annotation
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Attach another tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Mark the field as embedded
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }
}

/// Description of one method in a type's method set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescription {
    /// Method name
    pub name: String,
    /// Parameter type handles
    pub params: Vec<String>,
    /// Result type handles
    pub results: Vec<String>,
    /// The last parameter is variadic
    pub variadic: bool,
}

impl MethodDescription {
    /// Create a non-variadic method description
    pub fn new(name: impl Into<String>, params: &[&str], results: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            results: results.iter().map(|r| r.to_string()).collect(),
            variadic: false,
        }
    }

    /// Mark the last parameter as variadic
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Everything the provider knows about one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    /// Kind, `None` when the provider cannot classify the type
    pub kind: Option<TypeKind>,
    /// Declared name for named types
    pub name: Option<String>,
    /// Package of a named type
    pub package: Option<String>,
    /// Declared outside the analysed package
    pub imported: bool,
    /// The `byte` alias
    pub is_byte: bool,
    /// The `rune` alias
    pub is_rune: bool,
    /// Handle of the map key type
    pub key: Option<String>,
    /// Handle of the element type
    pub elem: Option<String>,
    /// Array length
    pub array_len: Option<u64>,
    /// Record fields in declaration order
    pub fields: Vec<FieldDescription>,
    /// Method set
    pub methods: Vec<MethodDescription>,
    /// Named constants of this type
    pub constants: Vec<Constant>,
}

impl TypeDescription {
    /// Describe an unnamed type of the given kind
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind: Some(kind),
            name: None,
            package: None,
            imported: false,
            is_byte: false,
            is_rune: false,
            key: None,
            elem: None,
            array_len: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Describe a type the provider could not classify
    pub fn unresolved() -> Self {
        Self {
            kind: None,
            ..Self::new(TypeKind::Unresolved)
        }
    }

    /// Describe a named record
    pub fn record(name: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        Self {
            name: Some(name.into()),
            fields,
            ..Self::new(TypeKind::Record)
        }
    }

    /// Describe a named type of a basic kind
    pub fn named(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(kind)
        }
    }

    /// Set the package
    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Mark the type as declared in another package
    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }

    /// Add a method to the method set
    pub fn with_method(mut self, method: MethodDescription) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a named constant
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.push(Constant::new(name, value));
        self
    }
}

/// Query-only source of type information.
///
/// Calls are treated as blocking; errors abort the analysis of the record
/// being processed and are never retried.
pub trait TypeProvider {
    /// Describe the type behind `handle`
    fn describe(&self, handle: &str) -> ProviderResult<TypeDescription>;
}

impl<P: TypeProvider + ?Sized> TypeProvider for &P {
    fn describe(&self, handle: &str) -> ProviderResult<TypeDescription> {
        (**self).describe(handle)
    }
}

impl<P: TypeProvider + ?Sized> TypeProvider for Arc<P> {
    fn describe(&self, handle: &str) -> ProviderResult<TypeDescription> {
        (**self).describe(handle)
    }
}
