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

//! Key resolution policy

use crate::config::{KeyConfig, KeySource};
use crate::model::Field;
use rustc_hash::FxHashSet;

/// Computes unique, deterministic field keys
#[derive(Debug)]
pub struct KeyResolver<'c> {
    config: &'c KeyConfig,
    used: FxHashSet<String>,
}

impl<'c> KeyResolver<'c> {
    /// Create a resolver with no keys assigned yet
    pub fn new(config: &'c KeyConfig) -> Self {
        Self {
            config,
            used: FxHashSet::default(),
        }
    }

    /// Alternate name of a field from the configured tag.
    ///
    /// The tag value up to the first `,` is used unless it is empty or `-`.
    pub fn alternate_name<'f>(&self, field: &'f Field) -> Option<&'f str> {
        let KeySource::Tag(tag) = &self.config.source else {
            return None;
        };
        let value = field.tags.get(tag)?;
        let name = value.split(',').next().unwrap_or_default().trim();
        (!name.is_empty() && name != "-").then_some(name)
    }

    /// Own key segment of a field
    pub fn segment<'f>(&self, field: &'f Field) -> &'f str {
        self.alternate_name(field).unwrap_or(&field.name)
    }

    /// Check whether a field contributes nothing to its descendants' keys
    pub fn omits_from_join(&self, field: &Field) -> bool {
        field.is_embedded && self.alternate_name(field).is_none()
    }

    /// Compute and register the key of `field` below `ancestors`.
    ///
    /// A key already taken gets the first free `-N` suffix.
    pub fn key(&mut self, ancestors: &[Field], field: &Field) -> String {
        let base = if self.config.join {
            let separator = self.config.separator.to_string();
            ancestors
                .iter()
                .filter(|ancestor| !self.omits_from_join(ancestor))
                .map(|ancestor| self.segment(ancestor))
                .chain(std::iter::once(self.segment(field)))
                .collect::<Vec<_>>()
                .join(&separator)
        } else {
            self.segment(field).to_string()
        };

        let key = if self.used.contains(&base) {
            let mut suffix = 1usize;
            loop {
                let candidate = format!("{base}-{suffix}");
                if !self.used.contains(&candidate) {
                    log::debug!("key '{base}' is taken, using '{candidate}'");
                    break candidate;
                }
                suffix += 1;
            }
        } else {
            base
        };

        let fresh = self.used.insert(key.clone());
        debug_assert!(fresh, "disambiguated key '{key}' collides");
        key
    }

    /// Number of keys assigned so far
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Check whether no keys have been assigned
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
