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

//! Field keys and selectors
//!
//! Every field of a record, nested ones included, gets a unique key. The
//! [`SelectorMap`] maps each key to the field path from the record root, and
//! is what `&key` references in annotations resolve against.

pub mod key;

pub use key::KeyResolver;

use crate::config::KeyConfig;
use crate::model::{Field, Type, TypeKind};
use indexmap::IndexMap;
use serde::Serialize;

/// Path to one field of a record, indexed by key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selector {
    /// Unique key of the field
    pub key: String,
    /// Field names from the record root down to the field
    pub path: Vec<String>,
    /// Resolved type of the field, without nested record fields
    pub ty: Type,
}

impl Selector {
    /// Dotted field path, e.g. `Address.Street`
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Selectors of a record in declaration order
pub type SelectorMap = IndexMap<String, Selector>;

/// Assign keys to `fields` and every nested record field below them.
///
/// Skipped fields are indexed too so they stay addressable by references.
pub fn index_fields(fields: &mut [Field], config: &KeyConfig) -> SelectorMap {
    let mut resolver = KeyResolver::new(config);
    let mut selectors = SelectorMap::new();
    let mut ancestors = Vec::new();
    index_level(fields, &mut resolver, &mut ancestors, &mut selectors);
    selectors
}

fn index_level(
    fields: &mut [Field],
    resolver: &mut KeyResolver<'_>,
    ancestors: &mut Vec<Field>,
    selectors: &mut SelectorMap,
) {
    for field in fields.iter_mut() {
        let key = resolver.key(ancestors, field);
        field.key = key.clone();

        let mut path: Vec<String> = ancestors.iter().map(|a| a.name.clone()).collect();
        path.push(field.name.clone());
        selectors.insert(
            key.clone(),
            Selector {
                key,
                path,
                ty: field.ty.without_fields(),
            },
        );

        // Ancestors only contribute their key segment and flags.
        let mut shallow = Field::new(field.name.clone(), Type::new(field.ty.kind));
        shallow.tags = field.tags.clone();
        shallow.is_embedded = field.is_embedded;

        if let Some(nested) = nested_fields_mut(&mut field.ty) {
            ancestors.push(shallow);
            index_level(nested, resolver, ancestors, selectors);
            ancestors.pop();
        }
    }
}

/// Fields of a record type, looking through one pointer
pub(crate) fn nested_fields_mut(ty: &mut Type) -> Option<&mut Vec<Field>> {
    let record = match ty.kind {
        TypeKind::Pointer => ty.elem.as_deref_mut()?,
        _ => ty,
    };
    (record.kind == TypeKind::Record && !record.fields.is_empty()).then_some(&mut record.fields)
}
