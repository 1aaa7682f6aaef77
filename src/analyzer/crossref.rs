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

//! Record-wide cross-checks
//!
//! Runs after the field walk. Untagged top-level fields are inspected for the
//! error-handler and context roles before the field list is pruned, and a
//! record whose rules use context labels must carry a context field.

use super::context::AnalysisContext;
use crate::error::{AnalysisError, Result, RuleSite};
use crate::model::{Field, TypeKind};

/// Top-level fields with a special role
#[derive(Debug, Default)]
pub struct SpecialFields {
    /// Field receiving validation errors
    pub error_handler: Option<Field>,
    /// Field carrying the validation context
    pub context: Option<Field>,
}

/// Check whether `field` is a context field named `context_name`
pub fn is_context_field(field: &Field, context_name: &str) -> bool {
    field.ty.kind == TypeKind::String && field.name.eq_ignore_ascii_case(context_name)
}

/// Check whether `field` can receive validation errors
pub fn is_error_handler(field: &Field) -> bool {
    field.ty.is_error_handler() || field.ty.deref().is_error_handler()
}

/// Move the error-handler and context fields out of `fields`.
///
/// Only untagged, non-skipped fields are candidates. A second candidate for
/// either role is an error naming the second field.
pub fn split_special_fields(
    record: &str,
    fields: Vec<Field>,
    context_name: &str,
) -> Result<(Vec<Field>, SpecialFields)> {
    let mut special = SpecialFields::default();
    let mut remaining = Vec::with_capacity(fields.len());

    for field in fields {
        let candidate = field.annotation.is_none() && !field.skipped;

        if candidate && is_error_handler(&field) {
            if let Some(first) = &special.error_handler {
                return Err(AnalysisError::DuplicateErrorHandler {
                    record: record.to_string(),
                    field: field.name,
                    first: first.name.clone(),
                });
            }
            log::debug!("{record}: field '{}' is the error handler", field.name);
            special.error_handler = Some(field);
        } else if candidate && is_context_field(&field, context_name) {
            if let Some(first) = &special.context {
                return Err(AnalysisError::DuplicateContextField {
                    record: record.to_string(),
                    field: field.name,
                    first: first.name.clone(),
                });
            }
            log::debug!("{record}: field '{}' is the context field", field.name);
            special.context = Some(field);
        } else {
            remaining.push(field);
        }
    }

    Ok((remaining, special))
}

/// Require a context field when any rule used a context label
pub fn check_context_requirement(
    ctx: &AnalysisContext,
    special: &SpecialFields,
    context_name: &str,
) -> Result<()> {
    match (&ctx.context_use, &special.context) {
        (Some(usage), None) => Err(AnalysisError::MissingContextField {
            site: RuleSite::new(ctx.record.clone(), usage.field.clone(), usage.rule.clone()),
            label: usage.label.clone(),
            expected: context_name.to_string(),
        }),
        _ => Ok(()),
    }
}
