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

//! Built-in rule table

use super::RuleRegistry;
use super::signature::{Arity, FieldCheck, OptionCheck, RuleSpec};

/// Rule requesting the self-validation method call
pub const IS_VALID: &str = "isvalid";

/// Marker suppressing the implicit self-validation rule
pub const NO_IS_VALID: &str = "-isvalid";

/// String format rules that take no options
const STRING_FORMATS: &[&str] = &[
    "email", "url", "uri", "pan", "cvv", "ssn", "ein", "numeric", "hex", "hexcolor",
    "alphanum", "alpha", "cidr", "base64", "binary", "octal", "float", "digits", "ascii",
    "lower", "upper", "json",
];

const UUID_VERSIONS: &[&str] = &["1", "2", "3", "4", "5", "v1", "v2", "v3", "v4", "v5"];
const IP_VERSIONS: &[&str] = &["4", "6", "v4", "v6"];
const MAC_VERSIONS: &[&str] = &["6", "8"];

/// Register every built-in rule overload into `registry`
pub(crate) fn register_builtin_rules(registry: &mut RuleRegistry) {
    use FieldCheck::*;
    use OptionCheck::*;

    let none = Arity::exact(0);

    // presence and nilability
    registry.insert_builtin(RuleSpec::builtin("required", none, Any, Nothing));
    registry.insert_builtin(RuleSpec::builtin("notnil", none, Nilable, Nothing));
    registry.insert_builtin(RuleSpec::builtin("optional", none, Any, Nothing));
    registry.insert_builtin(RuleSpec::builtin("omitnil", none, Nilable, Nothing));
    registry.insert_builtin(RuleSpec::builtin(IS_VALID, none, SelfValidating, Nothing));
    registry.insert_builtin(RuleSpec::builtin(NO_IS_VALID, none, Any, Nothing));
    registry.insert_builtin(RuleSpec::builtin("enum", none, Enum, Nothing));

    // string formats
    for name in STRING_FORMATS {
        registry.insert_builtin(RuleSpec::builtin(name, none, StringLike, Nothing));
    }
    registry.insert_builtin(RuleSpec::builtin("phone", Arity::at_least(0), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin("zip", Arity::at_least(0), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin(
        "uuid",
        Arity::range(0, 5),
        StringLike,
        Choice(UUID_VERSIONS),
    ));
    registry.insert_builtin(RuleSpec::builtin("ip", none, StringLike, Nothing));
    registry.insert_builtin(RuleSpec::builtin("ip", Arity::exact(1), StringLike, Choice(IP_VERSIONS)));
    registry.insert_builtin(RuleSpec::builtin("mac", none, StringLike, Nothing));
    registry.insert_builtin(RuleSpec::builtin("mac", Arity::exact(1), StringLike, Choice(MAC_VERSIONS)));
    registry.insert_builtin(RuleSpec::builtin("iso", Arity::exact(1), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin("rfc", Arity::exact(1), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin("re", Arity::exact(1), StringLike, Pattern));
    registry.insert_builtin(RuleSpec::builtin("prefix", Arity::at_least(1), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin("suffix", Arity::at_least(1), StringLike, Text));
    registry.insert_builtin(RuleSpec::builtin("contains", Arity::at_least(1), StringLike, Text));

    // comparisons
    registry.insert_builtin(RuleSpec::builtin("eq", Arity::at_least(1), Comparable, FieldValue));
    registry.insert_builtin(RuleSpec::builtin("ne", Arity::at_least(1), Comparable, FieldValue));
    for name in ["gt", "lt", "gte", "lte", "min", "max"] {
        registry.insert_builtin(RuleSpec::builtin(name, Arity::exact(1), Numeric, FieldValue));
    }
    registry.insert_builtin(RuleSpec::builtin("rng", Arity::exact(2), Numeric, FieldValue));

    // lengths: one option is an exact length, two are a lower/upper bound pair
    registry.insert_builtin(RuleSpec::builtin("len", Arity::exact(1), Lengthable, Length));
    registry.insert_builtin(RuleSpec::builtin("len", Arity::exact(2), Lengthable, Length));
    registry.insert_builtin(RuleSpec::builtin("runecount", Arity::exact(1), StringLike, Length));
    registry.insert_builtin(RuleSpec::builtin("runecount", Arity::exact(2), StringLike, Length));
}
