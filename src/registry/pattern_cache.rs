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

//! Compiled pattern cache for regular-expression rules
//!
//! Patterns given to `re` are compiled once and shared by every analysis
//! holding the cache. The emitter receives the accepted pattern strings for
//! pre-registration.

use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;

/// Concurrent cache of compiled patterns keyed by their source text
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: DashMap<String, Arc<Regex>>,
}

impl PatternCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern`, reusing a cached compilation when present
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(Arc::clone(regex.value()));
        }
        let regex = Arc::new(Regex::new(pattern)?);
        log::trace!("compiled pattern {pattern:?}");
        let entry = self
            .compiled
            .entry(pattern.to_string())
            .or_insert(regex);
        Ok(Arc::clone(entry.value()))
    }

    /// Check whether `pattern` has been compiled
    pub fn contains(&self, pattern: &str) -> bool {
        self.compiled.contains_key(pattern)
    }

    /// Number of cached patterns
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Check whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_once() {
        let cache = PatternCache::new();
        let first = cache.compile(r"^[a-z]+\[[0-9]+\]$").unwrap();
        let second = cache.compile(r"^[a-z]+\[[0-9]+\]$").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(first.is_match("abc[12]"));
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let cache = PatternCache::new();
        assert!(cache.compile("(unclosed").is_err());
        assert!(cache.is_empty());
    }
}
