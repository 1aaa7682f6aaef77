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

//! Type model for analysed records
//!
//! This module defines the abstract [`Type`]/[`Field`] tree, the
//! [`TypeProvider`] interface used to obtain type information, and the
//! [`TypeModelBuilder`] that turns provider descriptions into the tree.

pub mod builder;
pub mod mock_provider;
pub mod provider;
pub mod types;

pub use builder::TypeModelBuilder;
pub use mock_provider::MockTypeProvider;
pub use provider::{
    FieldDescription, MethodDescription, ProviderError, ProviderResult, TypeDescription,
    TypeProvider,
};
pub use types::{Constant, Field, Type, TypeCategory, TypeFlags, TypeKind};
