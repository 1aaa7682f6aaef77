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

//! Rule descriptors and their compatibility predicates

use super::custom::CustomRule;
use crate::model::{Type, TypeKind};
use crate::parser::{OptionKind, RuleOption};
use serde::Serialize;
use std::fmt;

/// Accepted option-count bounds of a rule overload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Arity {
    /// Minimum number of options
    pub min: usize,
    /// Maximum number of options (None for unbounded)
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `n` options
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Between `min` and `max` options, inclusive
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// At least `min` options
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Check whether `count` options are accepted
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    /// Check whether two bounds accept a common option count
    pub fn overlaps(&self, other: &Arity) -> bool {
        let low = self.min.max(other.min);
        match (self.max, other.max) {
            (Some(a), Some(b)) => low <= a.min(b),
            (Some(a), None) | (None, Some(a)) => low <= a,
            (None, None) => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}-{max}", self.min),
            None => write!(f, "{}+", self.min),
        }
    }
}

/// Field-type category a rule can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldCheck {
    /// Any type
    Any,
    /// Strings, arrays, slices, maps and channels
    Lengthable,
    /// Numeric kinds
    Numeric,
    /// Types that can hold nil (checked before pointer stripping)
    Nilable,
    /// Strings and byte/rune sequences
    StringLike,
    /// Types supporting equality
    Comparable,
    /// Named types with declared constants
    Enum,
    /// Types with an `IsValid() bool` method
    SelfValidating,
}

impl FieldCheck {
    /// Check a field type; `declared` is the type before pointer stripping
    pub fn accepts(&self, declared: &Type) -> bool {
        let ty = declared.deref();
        match self {
            FieldCheck::Any => true,
            FieldCheck::Lengthable => ty.is_lengthable(),
            FieldCheck::Numeric => ty.kind.is_numeric(),
            FieldCheck::Nilable => declared.is_nilable(),
            FieldCheck::StringLike => ty.is_string_like(),
            FieldCheck::Comparable => ty.is_comparable(),
            FieldCheck::Enum => ty.is_named() && !ty.constants.is_empty(),
            FieldCheck::SelfValidating => {
                declared.flags.self_validating || ty.flags.self_validating
            }
        }
    }
}

impl fmt::Display for FieldCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FieldCheck::Any => "any type",
            FieldCheck::Lengthable => "a type with a length",
            FieldCheck::Numeric => "a numeric type",
            FieldCheck::Nilable => "a nilable type",
            FieldCheck::StringLike => "a string or byte/rune sequence",
            FieldCheck::Comparable => "a comparable type",
            FieldCheck::Enum => "a named type with declared constants",
            FieldCheck::SelfValidating => "a type with an IsValid() bool method",
        };
        f.write_str(text)
    }
}

/// How the options of a built-in rule are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OptionCheck {
    /// The rule takes no options
    Nothing,
    /// Options are values of the field's own type
    FieldValue,
    /// Options are non-negative lengths, empty meaning "no bound"
    Length,
    /// Options are free text
    Text,
    /// Options must be one of the listed literals
    Choice(&'static [&'static str]),
    /// The option is a regular expression
    Pattern,
}

/// Why an option was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionMismatch {
    /// The option's type does not fit
    Incompatible {
        /// What the option should have been
        expected: String,
    },
    /// The literal itself is unusable
    Malformed {
        /// What is wrong with it
        reason: String,
    },
}

impl OptionMismatch {
    pub(crate) fn incompatible(expected: impl Into<String>) -> Self {
        OptionMismatch::Incompatible {
            expected: expected.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        OptionMismatch::Malformed {
            reason: reason.into(),
        }
    }
}

/// Check a literal option against a target type.
///
/// Integer literals fit any numeric type able to represent them, float
/// literals only floating (and complex) types, string literals string-like
/// types. Interfaces accept any literal.
pub fn literal_fits(option: &RuleOption, target: &Type) -> Result<(), OptionMismatch> {
    let ty = target.deref();
    if ty.kind == TypeKind::Interface {
        return match option.kind {
            OptionKind::Unknown => Err(OptionMismatch::incompatible(format!("a value of type {ty}"))),
            _ => Ok(()),
        };
    }

    let fits = match option.kind {
        OptionKind::Bool => ty.kind == TypeKind::Bool,
        OptionKind::Int if ty.kind.is_integer() => {
            let value = option
                .as_int()
                .ok_or_else(|| OptionMismatch::malformed("integer literal is too large"))?;
            let (low, high) = ty.kind.int_bounds().unwrap_or((i128::MIN, i128::MAX));
            if value < low || value > high {
                return Err(OptionMismatch::incompatible(format!(
                    "an integer in {low}..={high} for {ty}"
                )));
            }
            true
        }
        OptionKind::Int => ty.kind.is_float() || ty.kind.is_complex(),
        OptionKind::Float => {
            if option.as_float().is_none_or(|v| !v.is_finite()) {
                return Err(OptionMismatch::malformed("float literal is out of range"));
            }
            ty.kind.is_float() || ty.kind.is_complex()
        }
        OptionKind::String => ty.is_string_like(),
        OptionKind::FieldRef | OptionKind::Unknown => false,
    };

    if fits {
        Ok(())
    } else {
        Err(OptionMismatch::incompatible(format!("a value of type {ty}")))
    }
}

/// Variant of a rule descriptor
#[derive(Debug, Clone, Serialize)]
pub enum RuleKind {
    /// Rule shipped with the analyzer
    Builtin {
        /// Field-type predicate
        field: FieldCheck,
        /// Option-type predicate
        options: OptionCheck,
    },
    /// Rule backed by a caller-supplied predicate function
    Custom(CustomRule),
}

/// Descriptor of one rule overload
#[derive(Debug, Clone, Serialize)]
pub struct RuleSpec {
    /// Rule name
    pub name: String,
    /// Accepted option counts
    pub arity: Arity,
    /// Predicates
    pub kind: RuleKind,
}

impl RuleSpec {
    /// Create a built-in descriptor
    pub fn builtin(name: &str, arity: Arity, field: FieldCheck, options: OptionCheck) -> Self {
        Self {
            name: name.to_string(),
            arity,
            kind: RuleKind::Builtin { field, options },
        }
    }

    /// Check whether this is a custom rule
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, RuleKind::Custom(_))
    }

    /// Check whether the options are regular expressions
    pub fn is_pattern(&self) -> bool {
        matches!(
            self.kind,
            RuleKind::Builtin {
                options: OptionCheck::Pattern,
                ..
            }
        )
    }

    /// Check whether the rule may apply to `declared`, the type before
    /// pointer stripping. Returns a description of the expected type on failure.
    pub fn check_field(&self, declared: &Type) -> Result<(), String> {
        match &self.kind {
            RuleKind::Builtin { field, .. } => {
                if field.accepts(declared) {
                    Ok(())
                } else {
                    Err(field.to_string())
                }
            }
            RuleKind::Custom(custom) => custom.check_field(declared),
        }
    }

    /// Check the literal option at `index` against the field type
    pub fn check_option(
        &self,
        index: usize,
        option: &RuleOption,
        field: &Type,
    ) -> Result<(), OptionMismatch> {
        match &self.kind {
            RuleKind::Builtin { options, .. } => check_builtin_option(*options, option, field),
            RuleKind::Custom(custom) => custom.check_option_literal(index, option),
        }
    }

    /// Check a field-reference option at `index` given the referenced type
    pub fn check_reference(
        &self,
        index: usize,
        referenced: &Type,
        field: &Type,
    ) -> Result<(), OptionMismatch> {
        let target = match &self.kind {
            RuleKind::Builtin {
                options: OptionCheck::FieldValue,
                ..
            } => field,
            RuleKind::Builtin {
                options: OptionCheck::Length,
                ..
            } => {
                return if referenced.deref().kind.is_integer() {
                    Ok(())
                } else {
                    Err(OptionMismatch::incompatible("a reference to an integer field"))
                };
            }
            RuleKind::Builtin {
                options: OptionCheck::Text,
                ..
            } => {
                let actual = referenced.deref();
                return if actual.is_string_like() || actual.kind == TypeKind::Interface {
                    Ok(())
                } else {
                    Err(OptionMismatch::incompatible("a reference to a string field"))
                };
            }
            RuleKind::Builtin { .. } => {
                return Err(OptionMismatch::incompatible(
                    "a literal value, not a field reference",
                ));
            }
            RuleKind::Custom(custom) => custom.option_param(index),
        };

        let expected = target.deref();
        let actual = referenced.deref();
        if expected.kind == TypeKind::Interface
            || actual.kind == TypeKind::Interface
            || expected.category() == actual.category()
        {
            Ok(())
        } else {
            Err(OptionMismatch::incompatible(format!(
                "a reference to a field compatible with {expected}"
            )))
        }
    }

    /// Check that a lower/upper bound pair is ordered.
    ///
    /// Returns the index of the offending upper bound.
    pub fn check_bounds(&self, options: &[RuleOption]) -> Result<(), (usize, OptionMismatch)> {
        let is_bounded = matches!(
            self.kind,
            RuleKind::Builtin {
                options: OptionCheck::Length | OptionCheck::FieldValue,
                field: FieldCheck::Lengthable | FieldCheck::StringLike | FieldCheck::Numeric,
            }
        );
        if !is_bounded || options.len() != 2 {
            return Ok(());
        }
        match (options[0].as_float(), options[1].as_float()) {
            (Some(low), Some(high)) if low > high => Err((
                1,
                OptionMismatch::malformed(format!(
                    "lower bound {} exceeds upper bound {}",
                    options[0].value, options[1].value
                )),
            )),
            _ => Ok(()),
        }
    }
}

fn check_builtin_option(
    check: OptionCheck,
    option: &RuleOption,
    field: &Type,
) -> Result<(), OptionMismatch> {
    match check {
        OptionCheck::Nothing => Err(OptionMismatch::incompatible("no options")),
        OptionCheck::FieldValue => literal_fits(option, field),
        OptionCheck::Length => match option.kind {
            OptionKind::Unknown => Ok(()),
            OptionKind::Int => match option.as_int() {
                Some(n) if n >= 0 && n <= u64::MAX as i128 => Ok(()),
                Some(_) => Err(OptionMismatch::incompatible("a non-negative integer")),
                None => Err(OptionMismatch::malformed("integer literal is too large")),
            },
            _ => Err(OptionMismatch::incompatible("a non-negative integer")),
        },
        OptionCheck::Text => match option.kind {
            OptionKind::Unknown | OptionKind::FieldRef => {
                Err(OptionMismatch::incompatible("a non-empty literal"))
            }
            _ => Ok(()),
        },
        OptionCheck::Choice(choices) => {
            if choices.contains(&option.value.as_str()) {
                Ok(())
            } else {
                Err(OptionMismatch::incompatible(format!(
                    "one of {}",
                    choices.join(", ")
                )))
            }
        }
        OptionCheck::Pattern => match option.kind {
            OptionKind::Unknown => Err(OptionMismatch::incompatible("a regular expression")),
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(kind: TypeKind) -> Type {
        Type::new(kind)
    }

    #[test]
    fn test_arity_bounds() {
        let arity = Arity::range(1, 2);
        assert!(!arity.accepts(0));
        assert!(arity.accepts(1));
        assert!(arity.accepts(2));
        assert!(!arity.accepts(3));
        assert!(Arity::at_least(1).accepts(100));
        assert!(Arity::exact(1).overlaps(&Arity::range(0, 1)));
        assert!(!Arity::exact(1).overlaps(&Arity::exact(2)));
        assert_eq!(Arity::at_least(1).to_string(), "1+");
        assert_eq!(Arity::range(1, 2).to_string(), "1-2");
    }

    #[test]
    fn test_integer_literal_widening() {
        let small = RuleOption::classify("200");
        assert!(literal_fits(&small, &basic(TypeKind::Uint8)).is_ok());
        assert!(literal_fits(&small, &basic(TypeKind::Int8)).is_err());
        assert!(literal_fits(&small, &basic(TypeKind::Float32)).is_ok());
        assert!(literal_fits(&small, &basic(TypeKind::String)).is_err());

        let negative = RuleOption::classify("-1");
        assert!(literal_fits(&negative, &basic(TypeKind::Int16)).is_ok());
        assert!(literal_fits(&negative, &basic(TypeKind::Uint)).is_err());
    }

    #[test]
    fn test_float_and_string_literals() {
        let float = RuleOption::classify("1.5");
        assert!(literal_fits(&float, &basic(TypeKind::Float64)).is_ok());
        assert!(literal_fits(&float, &basic(TypeKind::Int)).is_err());

        let text = RuleOption::string("abc");
        assert!(literal_fits(&text, &basic(TypeKind::String)).is_ok());
        assert!(literal_fits(&text, &Type::slice_of(basic(TypeKind::Uint8))).is_ok());
        assert!(literal_fits(&text, &basic(TypeKind::Int)).is_err());
    }

    #[test]
    fn test_field_checks() {
        let ptr = Type::pointer_to(basic(TypeKind::String));
        assert!(FieldCheck::Nilable.accepts(&ptr));
        assert!(FieldCheck::StringLike.accepts(&ptr));
        assert!(!FieldCheck::Nilable.accepts(&basic(TypeKind::String)));
        assert!(!FieldCheck::Numeric.accepts(&basic(TypeKind::String)));
        assert!(FieldCheck::Lengthable.accepts(&Type::slice_of(basic(TypeKind::Int))));
    }

    #[test]
    fn test_length_options() {
        let spec = RuleSpec::builtin(
            "len",
            Arity::exact(2),
            FieldCheck::Lengthable,
            OptionCheck::Length,
        );
        let field = basic(TypeKind::String);
        assert!(spec.check_option(0, &RuleOption::classify(""), &field).is_ok());
        assert!(spec.check_option(0, &RuleOption::classify("8"), &field).is_ok());
        assert!(spec.check_option(0, &RuleOption::classify("-8"), &field).is_err());
        assert!(spec.check_option(0, &RuleOption::classify("x"), &field).is_err());

        let reversed = [RuleOption::classify("10"), RuleOption::classify("2")];
        assert!(matches!(spec.check_bounds(&reversed), Err((1, _))));
    }

    #[test]
    fn test_references_follow_option_kind() {
        let field = basic(TypeKind::String);
        let count = basic(TypeKind::Int);
        let label = basic(TypeKind::String);

        let prefix = RuleSpec::builtin(
            "prefix",
            Arity::exact(1),
            FieldCheck::StringLike,
            OptionCheck::Text,
        );
        assert!(prefix.check_reference(0, &label, &field).is_ok());
        assert!(prefix.check_reference(0, &count, &field).is_err());

        let uuid = RuleSpec::builtin(
            "uuid",
            Arity::range(0, 1),
            FieldCheck::StringLike,
            OptionCheck::Choice(&["4"]),
        );
        assert!(uuid.check_reference(0, &label, &field).is_err());

        let re = RuleSpec::builtin(
            "re",
            Arity::exact(1),
            FieldCheck::StringLike,
            OptionCheck::Pattern,
        );
        assert!(re.check_reference(0, &label, &field).is_err());

        let len = RuleSpec::builtin(
            "len",
            Arity::exact(2),
            FieldCheck::Lengthable,
            OptionCheck::Length,
        );
        assert!(len.check_reference(0, &count, &field).is_ok());
        assert!(len.check_reference(0, &label, &field).is_err());
    }
}
