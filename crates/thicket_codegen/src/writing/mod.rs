// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turns resolved binding graphs into component implementations.

pub(crate) mod binding_expression;
pub(crate) mod component_impl;
pub(crate) mod creation;
pub mod expressions;
pub mod field_state;
pub(crate) mod generator;
pub mod output;
pub mod switching;

pub use component_impl::STATEMENTS_PER_INITIALIZE_METHOD;
pub use expressions::{BindingExpression, BindingRequest};
pub use output::{FieldKind, FieldSpec, GeneratedComponent, MethodKind, MethodSpec, TypeKind, TypeSpec};
pub use switching::{MAX_CASES_PER_SWITCH, MAX_CASES_PER_TYPE};
