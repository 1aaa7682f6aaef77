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

//! Custom rules backed by caller-supplied predicate functions
//!
//! A custom rule `name` maps to a function whose first parameter receives the
//! field value and whose remaining parameters receive the rule options:
//!
//! ```text
//! func IsSlug(v string, maxLen int) bool   =>   slug:64
//! ```

use super::signature::{Arity, OptionMismatch, literal_fits};
use crate::model::{Type, TypeKind};
use crate::parser::RuleOption;
use serde::Serialize;

/// Signature of the predicate function behind a custom rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomSignature {
    /// Package declaring the function
    pub package: String,
    /// Function name
    pub function: String,
    /// Parameter types; the first receives the field value
    pub params: Vec<Type>,
    /// The last parameter is variadic (its type must be a slice)
    pub variadic: bool,
    /// Result types
    pub results: Vec<Type>,
}

impl CustomSignature {
    /// Create a non-variadic signature
    pub fn new(
        package: impl Into<String>,
        function: impl Into<String>,
        params: Vec<Type>,
        results: Vec<Type>,
    ) -> Self {
        Self {
            package: package.into(),
            function: function.into(),
            params,
            variadic: false,
            results,
        }
    }

    /// Mark the last parameter as variadic
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Validate the shape of the signature.
    ///
    /// Returns the reason the signature is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.params.is_empty() {
            return Err("function must accept at least one parameter".to_string());
        }
        match self.results.as_slice() {
            [result] if result.kind == TypeKind::Bool => {}
            _ => return Err("function must return exactly one bool".to_string()),
        }
        if self.variadic {
            let last = self.params.last().map(|p| p.kind);
            if self.params.len() < 2 || last != Some(TypeKind::Slice) {
                return Err("variadic parameter must be a slice following the value parameter"
                    .to_string());
            }
        }
        Ok(())
    }
}

/// Descriptor payload of a custom rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomRule {
    /// Predicate signature
    pub signature: CustomSignature,
}

impl CustomRule {
    /// Wrap a validated signature
    pub fn new(signature: CustomSignature) -> Self {
        Self { signature }
    }

    /// Option-count bounds implied by the signature
    pub fn arity(&self) -> Arity {
        let option_params = self.signature.params.len().saturating_sub(1);
        if self.signature.variadic {
            Arity::at_least(option_params - 1)
        } else {
            Arity::exact(option_params)
        }
    }

    /// Check that the field value can be passed as the first argument
    pub fn check_field(&self, declared: &Type) -> Result<(), String> {
        let param = &self.signature.params[0];
        if assignable(declared, param) || assignable(declared.deref(), param) {
            Ok(())
        } else {
            Err(format!("a value assignable to {param}"))
        }
    }

    /// Parameter type receiving the option at `index`
    pub fn option_param(&self, index: usize) -> &Type {
        let params = &self.signature.params;
        let position = index + 1;
        if self.signature.variadic && position >= params.len() - 1 {
            let last = &params[params.len() - 1];
            last.elem.as_deref().unwrap_or(last)
        } else {
            &params[position.min(params.len() - 1)]
        }
    }

    /// Check an option against its parameter type
    pub fn check_option_literal(
        &self,
        index: usize,
        option: &RuleOption,
    ) -> Result<(), OptionMismatch> {
        literal_fits(option, self.option_param(index))
    }
}

/// Check whether a value of type `value` can be passed as `param`
fn assignable(value: &Type, param: &Type) -> bool {
    if param.kind == TypeKind::Interface {
        return true;
    }
    if value.kind != param.kind {
        return false;
    }
    if let (Some(a), Some(b)) = (value.qualified_name(), param.qualified_name()) {
        return a == b;
    }
    let sub_types_match = |a: &Option<Box<Type>>, b: &Option<Box<Type>>| match (a, b) {
        (Some(a), Some(b)) => assignable(a, b),
        (None, None) => true,
        _ => false,
    };
    sub_types_match(&value.key, &param.key) && sub_types_match(&value.elem, &param.elem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(kind: TypeKind) -> Type {
        Type::new(kind)
    }

    #[test]
    fn test_signature_validation() {
        let ok = CustomSignature::new("p", "F", vec![t(TypeKind::String)], vec![t(TypeKind::Bool)]);
        assert!(ok.validate().is_ok());

        let no_params = CustomSignature::new("p", "F", vec![], vec![t(TypeKind::Bool)]);
        assert!(no_params.validate().is_err());

        let two_results = CustomSignature::new(
            "p",
            "F",
            vec![t(TypeKind::String)],
            vec![t(TypeKind::Bool), t(TypeKind::Bool)],
        );
        assert!(two_results.validate().is_err());

        let not_bool = CustomSignature::new("p", "F", vec![t(TypeKind::String)], vec![t(TypeKind::Int)]);
        assert!(not_bool.validate().is_err());
    }

    #[test]
    fn test_arity_and_option_params() {
        let fixed = CustomRule::new(CustomSignature::new(
            "p",
            "InRange",
            vec![t(TypeKind::Int), t(TypeKind::Int), t(TypeKind::Int)],
            vec![t(TypeKind::Bool)],
        ));
        assert_eq!(fixed.arity(), Arity::exact(2));
        assert_eq!(fixed.option_param(1).kind, TypeKind::Int);

        let variadic = CustomRule::new(
            CustomSignature::new(
                "p",
                "OneOf",
                vec![t(TypeKind::String), Type::slice_of(t(TypeKind::String))],
                vec![t(TypeKind::Bool)],
            )
            .variadic(),
        );
        assert_eq!(variadic.arity(), Arity::at_least(0));
        assert_eq!(variadic.option_param(3).kind, TypeKind::String);
        assert!(variadic.check_option_literal(0, &RuleOption::string("a")).is_ok());
        assert!(variadic.check_option_literal(0, &RuleOption::classify("1")).is_err());
    }

    #[test]
    fn test_field_assignability() {
        let rule = CustomRule::new(CustomSignature::new(
            "p",
            "F",
            vec![t(TypeKind::String)],
            vec![t(TypeKind::Bool)],
        ));
        assert!(rule.check_field(&t(TypeKind::String)).is_ok());
        assert!(rule.check_field(&Type::pointer_to(t(TypeKind::String))).is_ok());
        assert!(rule.check_field(&t(TypeKind::Int)).is_err());
    }
}
