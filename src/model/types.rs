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

//! Abstract type model for analysed records
//!
//! A [`Type`] is a finite tree: composite kinds own their key/element
//! sub-types and record kinds own their [`Field`]s.

use crate::parser::TagNode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed classification of a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Boolean value
    Bool,
    /// Platform-sized signed integer (treated as 64 bits)
    Int,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Platform-sized unsigned integer (treated as 64 bits)
    Uint,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// Unsigned integer large enough for a pointer
    Uintptr,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Complex number made of two 32-bit floats
    Complex64,
    /// Complex number made of two 64-bit floats
    Complex128,
    /// Text
    String,
    /// Fixed-length array
    Array,
    /// Growable sequence
    Slice,
    /// Key/value map
    Map,
    /// Pointer to another type
    Pointer,
    /// Record with named fields
    Record,
    /// Interface or `any`
    Interface,
    /// Channel
    Chan,
    /// Function value
    Func,
    /// The provider could not classify the type
    Unresolved,
}

impl TypeKind {
    /// Look up a basic kind by its source-level name
    pub fn from_basic_name(name: &str) -> Option<TypeKind> {
        let kind = match name {
            "bool" => TypeKind::Bool,
            "int" => TypeKind::Int,
            "int8" => TypeKind::Int8,
            "int16" => TypeKind::Int16,
            "int32" | "rune" => TypeKind::Int32,
            "int64" => TypeKind::Int64,
            "uint" => TypeKind::Uint,
            "uint8" | "byte" => TypeKind::Uint8,
            "uint16" => TypeKind::Uint16,
            "uint32" => TypeKind::Uint32,
            "uint64" => TypeKind::Uint64,
            "uintptr" => TypeKind::Uintptr,
            "float32" => TypeKind::Float32,
            "float64" => TypeKind::Float64,
            "complex64" => TypeKind::Complex64,
            "complex128" => TypeKind::Complex128,
            "string" => TypeKind::String,
            _ => return None,
        };
        Some(kind)
    }

    /// Source-level name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::Int8 => "int8",
            TypeKind::Int16 => "int16",
            TypeKind::Int32 => "int32",
            TypeKind::Int64 => "int64",
            TypeKind::Uint => "uint",
            TypeKind::Uint8 => "uint8",
            TypeKind::Uint16 => "uint16",
            TypeKind::Uint32 => "uint32",
            TypeKind::Uint64 => "uint64",
            TypeKind::Uintptr => "uintptr",
            TypeKind::Float32 => "float32",
            TypeKind::Float64 => "float64",
            TypeKind::Complex64 => "complex64",
            TypeKind::Complex128 => "complex128",
            TypeKind::String => "string",
            TypeKind::Array => "array",
            TypeKind::Slice => "slice",
            TypeKind::Map => "map",
            TypeKind::Pointer => "pointer",
            TypeKind::Record => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Chan => "chan",
            TypeKind::Func => "func",
            TypeKind::Unresolved => "unresolved",
        }
    }

    /// Check if the kind is a signed or unsigned integer
    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Check if the kind is a signed integer
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TypeKind::Int | TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 | TypeKind::Int64
        )
    }

    /// Check if the kind is an unsigned integer
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            TypeKind::Uint
                | TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
                | TypeKind::Uintptr
        )
    }

    /// Check if the kind is a floating point number
    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::Float32 | TypeKind::Float64)
    }

    /// Check if the kind is a complex number
    pub fn is_complex(&self) -> bool {
        matches!(self, TypeKind::Complex64 | TypeKind::Complex128)
    }

    /// Check if the kind is any numeric kind
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    /// Check if the kind is a scalar (bool, numeric or string)
    pub fn is_basic(&self) -> bool {
        matches!(self, TypeKind::Bool | TypeKind::String) || self.is_numeric()
    }

    /// Inclusive value range of an integer kind
    pub fn int_bounds(&self) -> Option<(i128, i128)> {
        let bounds = match self {
            TypeKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            TypeKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            TypeKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            TypeKind::Int | TypeKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            TypeKind::Uint8 => (0, u8::MAX as i128),
            TypeKind::Uint16 => (0, u16::MAX as i128),
            TypeKind::Uint32 => (0, u32::MAX as i128),
            TypeKind::Uint | TypeKind::Uint64 | TypeKind::Uintptr => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broad grouping used to compare a field with the field it references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// Boolean
    Bool,
    /// Any numeric kind
    Numeric,
    /// Strings and byte/rune sequences
    Text,
    /// Everything else, compared by kind
    Other(TypeKind),
}

/// Capability and alias flags of a type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFlags {
    /// The type is the `byte` alias
    pub is_byte: bool,
    /// The type is the `rune` alias
    pub is_rune: bool,
    /// The type name is exported
    pub is_exported: bool,
    /// The type is declared outside the analysed package
    pub is_imported: bool,
    /// The type has an `IsValid() bool` method
    pub self_validating: bool,
    /// The type can construct a single validation error
    pub error_constructor: bool,
    /// The type aggregates validation errors
    pub error_aggregator: bool,
}

/// Named constant declared for a named type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    /// Constant identifier
    pub name: String,
    /// Constant value as written
    pub value: String,
}

impl Constant {
    /// Create a new constant
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resolved type of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// Kind of the type
    pub kind: TypeKind,
    /// Declared name for named types
    pub name: Option<String>,
    /// Package of a named type
    pub package: Option<String>,
    /// Map key type
    pub key: Option<Box<Type>>,
    /// Element type of arrays, slices, maps, pointers and channels
    pub elem: Option<Box<Type>>,
    /// Array length
    pub array_len: Option<u64>,
    /// Fields of a record
    pub fields: Vec<Field>,
    /// Named constants of a named type
    pub constants: Vec<Constant>,
    /// Capability and alias flags
    pub flags: TypeFlags,
}

impl Type {
    /// Create an unnamed type of the given kind
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            name: None,
            package: None,
            key: None,
            elem: None,
            array_len: None,
            fields: Vec::new(),
            constants: Vec::new(),
            flags: TypeFlags::default(),
        }
    }

    /// Create a slice of `elem`
    pub fn slice_of(elem: Type) -> Self {
        Self {
            elem: Some(Box::new(elem)),
            ..Self::new(TypeKind::Slice)
        }
    }

    /// Create a map from `key` to `elem`
    pub fn map_of(key: Type, elem: Type) -> Self {
        Self {
            key: Some(Box::new(key)),
            elem: Some(Box::new(elem)),
            ..Self::new(TypeKind::Map)
        }
    }

    /// Create a pointer to `elem`
    pub fn pointer_to(elem: Type) -> Self {
        Self {
            elem: Some(Box::new(elem)),
            ..Self::new(TypeKind::Pointer)
        }
    }

    /// Strip one pointer indirection
    pub fn deref(&self) -> &Type {
        match (&self.kind, &self.elem) {
            (TypeKind::Pointer, Some(elem)) => elem,
            _ => self,
        }
    }

    /// Copy of the type with record fields dropped at every level
    pub fn without_fields(&self) -> Type {
        Type {
            kind: self.kind,
            name: self.name.clone(),
            package: self.package.clone(),
            key: self.key.as_ref().map(|key| Box::new(key.without_fields())),
            elem: self.elem.as_ref().map(|elem| Box::new(elem.without_fields())),
            array_len: self.array_len,
            fields: Vec::new(),
            constants: self.constants.clone(),
            flags: self.flags.clone(),
        }
    }

    /// Qualified name of a named type
    pub fn qualified_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        Some(match &self.package {
            Some(package) if !package.is_empty() => format!("{package}.{name}"),
            _ => name.clone(),
        })
    }

    /// Check if the type has a declared name
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Check if the type has a length (strings, arrays, slices, maps, channels)
    pub fn is_lengthable(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::String | TypeKind::Array | TypeKind::Slice | TypeKind::Map | TypeKind::Chan
        )
    }

    /// Check if the type can hold nil
    pub fn is_nilable(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Pointer
                | TypeKind::Slice
                | TypeKind::Map
                | TypeKind::Interface
                | TypeKind::Chan
                | TypeKind::Func
        )
    }

    /// Check if the type is a string or a byte/rune sequence
    pub fn is_string_like(&self) -> bool {
        match self.kind {
            TypeKind::String => true,
            TypeKind::Slice | TypeKind::Array => self.elem.as_ref().is_some_and(|elem| {
                elem.flags.is_byte || elem.flags.is_rune || elem.kind == TypeKind::Uint8
            }),
            _ => false,
        }
    }

    /// Check if values of the type support `==`
    pub fn is_comparable(&self) -> bool {
        self.kind.is_basic() || matches!(self.kind, TypeKind::Pointer | TypeKind::Interface)
    }

    /// Check if element rules may apply to the type
    pub fn is_container(&self) -> bool {
        matches!(self.kind, TypeKind::Array | TypeKind::Slice | TypeKind::Map)
    }

    /// Check if the type can receive validation errors
    pub fn is_error_handler(&self) -> bool {
        self.flags.error_constructor || self.flags.error_aggregator
    }

    /// Broad category for cross-field comparisons
    pub fn category(&self) -> TypeCategory {
        if self.kind == TypeKind::Bool {
            TypeCategory::Bool
        } else if self.kind.is_numeric() {
            TypeCategory::Numeric
        } else if self.is_string_like() {
            TypeCategory::Text
        } else {
            TypeCategory::Other(self.kind)
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.qualified_name() {
            return f.write_str(&name);
        }
        let elem = |f: &mut fmt::Formatter<'_>| match &self.elem {
            Some(elem) => write!(f, "{elem}"),
            None => f.write_str("?"),
        };
        match self.kind {
            TypeKind::Slice => {
                f.write_str("[]")?;
                elem(f)
            }
            TypeKind::Array => {
                write!(f, "[{}]", self.array_len.unwrap_or_default())?;
                elem(f)
            }
            TypeKind::Pointer => {
                f.write_str("*")?;
                elem(f)
            }
            TypeKind::Chan => {
                f.write_str("chan ")?;
                elem(f)
            }
            TypeKind::Map => {
                match &self.key {
                    Some(key) => write!(f, "map[{key}]")?,
                    None => f.write_str("map[?]")?,
                }
                elem(f)
            }
            TypeKind::Record => f.write_str("struct{...}"),
            TypeKind::Interface => f.write_str("interface{}"),
            kind => f.write_str(kind.name()),
        }
    }
}

/// One member of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Declared field name
    pub name: String,
    /// Unique key assigned by the key resolver
    pub key: String,
    /// Resolved type
    pub ty: Type,
    /// Raw annotation text
    pub annotation: Option<String>,
    /// Parsed and resolved rule tree
    pub tag: TagNode,
    /// Other field tags, e.g. `json`
    pub tags: IndexMap<String, String>,
    /// The field is embedded
    pub is_embedded: bool,
    /// The field name is exported
    pub is_exported: bool,
    /// The field is annotated `-` and excluded from validation
    pub skipped: bool,
}

impl Field {
    /// Create a field with no annotation
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        let is_exported = name.chars().next().is_some_and(char::is_uppercase);
        Self {
            name,
            key: String::new(),
            ty,
            annotation: None,
            tag: TagNode::default(),
            tags: IndexMap::new(),
            is_embedded: false,
            is_exported,
            skipped: false,
        }
    }

    /// Check if the field or any field nested below it carries rules
    pub fn has_rules(&self) -> bool {
        self.tag.has_any_rule() || type_has_rules(&self.ty)
    }
}

fn type_has_rules(ty: &Type) -> bool {
    ty.fields.iter().any(Field::has_rules)
        || ty.key.as_deref().is_some_and(type_has_rules)
        || ty.elem.as_deref().is_some_and(type_has_rules)
}
