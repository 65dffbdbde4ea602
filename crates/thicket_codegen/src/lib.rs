// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compile-time dependency injection: binding graph resolution and component code generation.
//!
//! # Summary
//!
//! A front end describes classes, modules and components as [`Declarations`]. This crate
//! resolves the bindings every component needs, checks them, and writes a plain Rust struct per
//! component that wires its dependencies together with the runtime types of the `thicket` crate.
//!
//! Generation runs in stages:
//!
//! 1. Declarations become normalized [`Binding`](binding::Binding) values, keyed by
//!    [`Key`](key::Key).
//! 2. Every component is resolved into a [`BindingGraph`](graph::BindingGraph), from the root
//!    component down through its subcomponents. A binding is owned by the highest component that
//!    can satisfy it.
//! 3. The graphs are validated. Problems are reported to a [`DiagnosticSink`] one by one.
//! 4. For every request, a [`BindingExpression`](writing::BindingExpression) strategy is chosen
//!    and the component implementation is written, including its constructor, initialization
//!    chunks, builder and switching providers.
//!
//! The result is a [`GeneratedComponent`], a model of the generated items that an emitter can
//! render; [`GeneratedComponent::to_source`] renders it with `prettyplease`.
//!
//! # Example
//!
//! ```
//! use thicket_codegen::declarations::{ClassDecl, ComponentDecl, ComponentMethodDecl, Declarations, Param};
//! use thicket_codegen::diagnostics::Diagnostics;
//! use thicket_codegen::options::CompilerOptions;
//! use thicket_codegen::types::{TypeName, TypeRef};
//!
//! let declarations = Declarations::new()
//!     .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
//!     .with_class(
//!         ClassDecl::new("crate::Greeter")
//!             .with_constructor(vec![Param::new("clock", TypeRef::declared("crate::Clock"))]),
//!     )
//!     .with_component(
//!         ComponentDecl::component("crate::App")
//!             .with_method(ComponentMethodDecl::new("greeter", TypeRef::declared("crate::Greeter"))),
//!     );
//!
//! let mut diagnostics = Diagnostics::new();
//! let app = thicket_codegen::generate(
//!     &declarations,
//!     &TypeName::new("crate::App"),
//!     &CompilerOptions::default(),
//!     &mut diagnostics,
//! )
//! .unwrap();
//!
//! assert!(app.method("greeter").is_some());
//! assert!(app.to_source().unwrap().contains("pub struct App"));
//! ```
//!
//! # Options
//!
//! [`CompilerOptions`] switch on fast-init mode, which trades framework fields for memoized
//! fields and switching providers, and full binding graph mode, which resolves every binding of
//! every installed module.

use std::sync::Arc;

use tracing::{Level, event};

pub mod binding;
mod binding_factory;
pub mod collector;
pub mod declarations;
pub mod descriptor;
pub mod diagnostics;
mod error;
pub mod graph;
mod inject_registry;
pub mod key;
mod naming;
pub mod oracle;
pub mod options;
pub mod request;
pub mod resolved;
mod resolver;
#[cfg(test)]
mod test_util;
pub mod types;
mod validation;
pub mod writing;

pub use declarations::Declarations;
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics};
pub use error::GenerateError;
pub use options::CompilerOptions;
pub use writing::GeneratedComponent;

use crate::binding_factory::BindingFactory;
use crate::descriptor::DescriptorFactory;
use crate::diagnostics::Reporter;
use crate::graph::BindingGraph;
use crate::oracle::TypeRegistry;
use crate::resolver::BindingGraphFactory;
use crate::types::TypeName;
use crate::writing::generator::ComponentGenerator;

/// Resolves the component `root` and its subcomponents without validating or generating them.
///
/// # Errors
///
/// Returns [`GenerateError::UnknownComponent`] if `root` is not declared, and
/// [`GenerateError::Invalid`] if a component, module or creator declaration is malformed; the
/// individual problems are reported to `sink`.
pub fn resolve(
    declarations: &Declarations,
    root: &TypeName,
    options: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Arc<BindingGraph>, GenerateError> {
    let registry = TypeRegistry::new(declarations);
    let mut reporter = Reporter::new(sink);
    resolve_with(declarations, &registry, root, options, &mut reporter)
}

/// Resolves, validates and generates the component `root` and its subcomponents.
///
/// # Errors
///
/// Returns [`GenerateError::Deferred`] if a referenced type is not available yet, in which case
/// nothing is reported and the caller may retry in a later pass. Returns
/// [`GenerateError::Invalid`] if any error was reported to `sink`, and
/// [`GenerateError::UnknownComponent`] if `root` is not declared.
pub fn generate(
    declarations: &Declarations,
    root: &TypeName,
    options: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<GeneratedComponent, GenerateError> {
    let registry = TypeRegistry::new(declarations);
    let mut reporter = Reporter::new(sink);
    let graph = resolve_with(declarations, &registry, root, options, &mut reporter)?;

    validation::validate(&graph, &registry, &mut reporter)?;
    let error_count = reporter.error_count();
    if error_count > 0 {
        event!(Level::DEBUG, component = %root, error_count, "component is invalid");
        return Err(GenerateError::Invalid { error_count });
    }

    let generated = ComponentGenerator::new(options).generate(&graph);
    event!(Level::DEBUG, component = %root, "generated component");
    Ok(generated)
}

fn resolve_with(
    declarations: &Declarations,
    registry: &TypeRegistry<'_>,
    root: &TypeName,
    options: &CompilerOptions,
    reporter: &mut Reporter<'_>,
) -> Result<Arc<BindingGraph>, GenerateError> {
    let Some(decl) = declarations.component(root) else {
        return Err(GenerateError::UnknownComponent(root.clone()));
    };
    event!(
        Level::DEBUG,
        component = %root,
        fast_init = options.fast_init(),
        full_binding_graph = options.full_binding_graph(),
        "resolving component"
    );

    let factory = BindingFactory::new(declarations, registry);
    let descriptor = DescriptorFactory::new(declarations, &factory, reporter).component(decl);
    let error_count = reporter.error_count();
    if error_count > 0 {
        return Err(GenerateError::Invalid { error_count });
    }
    Ok(BindingGraphFactory::new(&factory, options.full_binding_graph()).create(&descriptor))
}
