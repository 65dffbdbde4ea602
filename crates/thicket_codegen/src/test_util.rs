// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::binding_factory::BindingFactory;
use crate::declarations::Declarations;
use crate::descriptor::DescriptorFactory;
use crate::diagnostics::{Diagnostics, Reporter};
use crate::error::GenerateError;
use crate::graph::BindingGraph;
use crate::oracle::TypeRegistry;
use crate::resolver::BindingGraphFactory;
use crate::types::TypeName;

/// Resolves the component `root` of `declarations`, expecting well-formed descriptors.
pub(crate) fn resolve(declarations: &Declarations, root: &str, full_binding_graph: bool) -> Arc<BindingGraph> {
    let registry = TypeRegistry::new(declarations);
    let factory = BindingFactory::new(declarations, &registry);
    let mut diagnostics = Diagnostics::new();
    let mut reporter = Reporter::new(&mut diagnostics);
    let decl = declarations
        .component(&TypeName::new(root))
        .expect("root component is declared");
    let descriptor = DescriptorFactory::new(declarations, &factory, &mut reporter).component(decl);
    let errors = reporter.error_count();
    assert_eq!(errors, 0, "{:?}", diagnostics.error_messages());
    BindingGraphFactory::new(&factory, full_binding_graph).create(&descriptor)
}

/// Resolves and validates the component `root`, returning what was reported.
pub(crate) fn validate(declarations: &Declarations, root: &str) -> (Result<(), GenerateError>, Diagnostics) {
    let graph = resolve(declarations, root, false);
    let registry = TypeRegistry::new(declarations);
    let mut diagnostics = Diagnostics::new();
    let mut reporter = Reporter::new(&mut diagnostics);
    let result = crate::validation::validate(&graph, &registry, &mut reporter);
    (result, diagnostics)
}
