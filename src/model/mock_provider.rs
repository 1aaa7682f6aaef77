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

//! In-memory type provider for tests and examples
//!
//! Besides explicitly registered types, the mock understands basic type names
//! and composite handle syntax: `[]T`, `[N]T`, `map[K]V`, `*T`, `chan T`,
//! `func(...)`, `error`, `any`.

use super::provider::{
    MethodDescription, ProviderError, ProviderResult, TypeDescription, TypeProvider,
};
use super::types::TypeKind;
use rustc_hash::FxHashMap;

/// Type provider backed by a map of handles
#[derive(Debug, Clone, Default)]
pub struct MockTypeProvider {
    types: FxHashMap<String, TypeDescription>,
    failures: FxHashMap<String, String>,
}

impl MockTypeProvider {
    /// Create a provider that only knows built-in and composite handles
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under `handle`
    pub fn with_type(mut self, handle: impl Into<String>, description: TypeDescription) -> Self {
        self.insert(handle, description);
        self
    }

    /// Make every query for `handle` fail
    pub fn with_failure(mut self, handle: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(handle.into(), message.into());
        self
    }

    /// Register a type under `handle`
    pub fn insert(&mut self, handle: impl Into<String>, description: TypeDescription) {
        self.types.insert(handle.into(), description);
    }

    fn describe_builtin(handle: &str) -> Option<TypeDescription> {
        if let Some(kind) = TypeKind::from_basic_name(handle) {
            let mut description = TypeDescription::new(kind);
            description.is_byte = handle == "byte";
            description.is_rune = handle == "rune";
            return Some(description);
        }
        match handle {
            "error" => Some(
                TypeDescription::named("error", TypeKind::Interface)
                    .with_method(MethodDescription::new("Error", &[], &["string"])),
            ),
            "any" | "interface{}" => Some(TypeDescription::new(TypeKind::Interface)),
            _ => None,
        }
    }

    fn describe_composite(handle: &str) -> Option<TypeDescription> {
        if let Some(elem) = handle.strip_prefix("[]") {
            return Some(Self::wrapping(TypeKind::Slice, elem));
        }
        if let Some(rest) = handle.strip_prefix('[') {
            let (len, elem) = rest.split_once(']')?;
            let mut description = Self::wrapping(TypeKind::Array, elem);
            description.array_len = Some(len.trim().parse().ok()?);
            return Some(description);
        }
        if let Some(rest) = handle.strip_prefix("map[") {
            let close = matching_bracket(rest)?;
            let mut description = Self::wrapping(TypeKind::Map, &rest[close + 1..]);
            description.key = Some(rest[..close].trim().to_string());
            return Some(description);
        }
        if let Some(elem) = handle.strip_prefix('*') {
            return Some(Self::wrapping(TypeKind::Pointer, elem));
        }
        if let Some(elem) = handle.strip_prefix("chan ") {
            return Some(Self::wrapping(TypeKind::Chan, elem));
        }
        if handle.starts_with("func(") {
            return Some(TypeDescription::new(TypeKind::Func));
        }
        None
    }

    fn wrapping(kind: TypeKind, elem: &str) -> TypeDescription {
        TypeDescription {
            elem: Some(elem.trim().to_string()),
            ..TypeDescription::new(kind)
        }
    }
}

/// Byte offset of the `]` closing a group whose `[` was already consumed
fn matching_bracket(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in input.bytes().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(i),
            b']' => depth -= 1,
            _ => {}
        }
    }
    None
}

impl TypeProvider for MockTypeProvider {
    fn describe(&self, handle: &str) -> ProviderResult<TypeDescription> {
        let handle = handle.trim();
        if let Some(message) = self.failures.get(handle) {
            return Err(ProviderError::Failed {
                handle: handle.to_string(),
                message: message.clone(),
            });
        }
        if let Some(description) = self.types.get(handle) {
            return Ok(description.clone());
        }
        Self::describe_builtin(handle)
            .or_else(|| Self::describe_composite(handle))
            .ok_or_else(|| ProviderError::UnknownType {
                handle: handle.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_handles() {
        let provider = MockTypeProvider::new();
        let byte = provider.describe("byte").unwrap();
        assert_eq!(byte.kind, Some(TypeKind::Uint8));
        assert!(byte.is_byte);
        assert_eq!(
            provider.describe("error").unwrap().name.as_deref(),
            Some("error")
        );
    }

    #[test]
    fn test_composite_handles() {
        let provider = MockTypeProvider::new();

        let map = provider.describe("map[[2]string][]int").unwrap();
        assert_eq!(map.kind, Some(TypeKind::Map));
        assert_eq!(map.key.as_deref(), Some("[2]string"));
        assert_eq!(map.elem.as_deref(), Some("[]int"));

        let array = provider.describe("[16]byte").unwrap();
        assert_eq!(array.kind, Some(TypeKind::Array));
        assert_eq!(array.array_len, Some(16));

        let chan = provider.describe("chan *int").unwrap();
        assert_eq!(chan.kind, Some(TypeKind::Chan));
        assert_eq!(chan.elem.as_deref(), Some("*int"));
    }

    #[test]
    fn test_unknown_and_failing_handles() {
        let provider = MockTypeProvider::new().with_failure("Broken", "package not loaded");
        assert_eq!(
            provider.describe("Nope"),
            Err(ProviderError::UnknownType {
                handle: "Nope".to_string()
            })
        );
        assert!(matches!(
            provider.describe("Broken"),
            Err(ProviderError::Failed { .. })
        ));
    }
}
