// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Checks a resolved component tree for user errors.
//!
//! Every problem is reported to the diagnostic sink and validation continues, so one pass
//! surfaces as many independent errors as possible.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{Level, event};

use crate::binding::{Binding, BindingType, ContributionType};
use crate::descriptor::{ComponentDescriptor, ComponentMethodKind};
use crate::diagnostics::Reporter;
use crate::error::GenerateError;
use crate::graph::BindingGraph;
use crate::oracle::TypeOracle;
use crate::request::{BindingKey, DependencyRequest, RequestError, RequestKind};
use crate::resolved::ResolvedBindings;
use crate::types::{TypeName, TypeRef};

/// What makes a request.
enum Requester<'g> {
    EntryPoint(&'g str),
    Binding(&'g Arc<Binding>),
}

impl Requester<'_> {
    fn is_provision(&self, component: &ComponentDescriptor) -> bool {
        match self {
            Self::EntryPoint(_) => !component.is_production(),
            Self::Binding(binding) => binding.binding_type == BindingType::Provision,
        }
    }

    fn describe(&self, component: &ComponentDescriptor) -> String {
        match self {
            Self::EntryPoint(method) => format!("{}::{method}", component.name),
            Self::Binding(binding) => binding.describe(),
        }
    }
}

/// Validates `graph` and its subgraphs.
///
/// # Errors
///
/// Returns [`GenerateError::Deferred`] if the graph references a type that is not available yet.
/// Every other problem is reported through `reporter`.
pub(crate) fn validate(
    graph: &BindingGraph,
    oracle: &dyn TypeOracle,
    reporter: &mut Reporter<'_>,
) -> Result<(), GenerateError> {
    if let Some(type_name) = find_unavailable(graph) {
        event!(Level::DEBUG, %type_name, "deferring generation");
        return Err(GenerateError::Deferred { type_name });
    }
    let mut validator = Validator {
        oracle,
        reporter,
        validated_modules: HashSet::new(),
    };
    validator.graph(graph);
    Ok(())
}

fn find_unavailable(graph: &BindingGraph) -> Option<TypeName> {
    let requests = graph
        .component()
        .entry_points()
        .map(|(_, request)| request.key.ty())
        .collect::<Vec<_>>();
    let resolved = graph.contributions().chain(graph.members_injections());
    let keys = resolved.flat_map(|resolved| {
        std::iter::once(resolved.key().ty()).chain(
            resolved
                .bindings()
                .flat_map(|binding| binding.all_dependencies().map(|request| request.key.ty())),
        )
    });
    requests
        .into_iter()
        .chain(keys)
        .find_map(TypeRef::find_unavailable)
        .cloned()
        .or_else(|| graph.subgraphs().iter().find_map(|subgraph| find_unavailable(subgraph)))
}

struct Validator<'v, 'r> {
    oracle: &'v dyn TypeOracle,
    reporter: &'v mut Reporter<'r>,
    validated_modules: HashSet<TypeName>,
}

impl Validator<'_, '_> {
    fn graph(&mut self, graph: &BindingGraph) {
        let component = graph.component();
        event!(Level::TRACE, component = %component.name, "validating component");

        let mut reported: HashSet<BindingKey> = HashSet::new();
        for (index, request) in component.entry_points() {
            let method = &component.methods[index].name;
            self.request(graph, &Requester::EntryPoint(method.as_ref()), request, &mut reported);
        }
        let owned: Vec<&Arc<Binding>> = graph
            .contributions()
            .chain(graph.members_injections())
            .flat_map(|resolved| resolved.bindings_owned_by(&component.name))
            .collect();
        for &binding in &owned {
            self.scope(component, binding);
            for request in binding.all_dependencies() {
                self.request(graph, &Requester::Binding(binding), request, &mut reported);
            }
        }

        self.cycles(graph);
        self.creator(graph);
        self.factory_methods(graph);
        self.modules(component);

        for subgraph in graph.subgraphs() {
            self.graph(subgraph);
        }
    }

    fn request(
        &mut self,
        graph: &BindingGraph,
        requester: &Requester<'_>,
        request: &DependencyRequest,
        reported: &mut HashSet<BindingKey>,
    ) {
        let component = graph.component();
        let binding_key = request.binding_key();
        if request.kind != RequestKind::Instance
            && request.kind != RequestKind::MembersInjection
            && matches!(request.key.ty(), TypeRef::Wildcard)
        {
            let error = RequestError::WildcardFrameworkRequest {
                requested: request.requested_type(),
            };
            self.reporter
                .error(error.to_string(), Some(requester.describe(component)));
            reported.insert(binding_key);
            return;
        }

        let Some(resolved) = graph.resolved(&binding_key) else {
            unreachable!("internal error: {binding_key} was requested but never resolved")
        };
        if resolved.is_empty() {
            if reported.insert(binding_key) {
                self.missing(component, requester, request);
            }
            return;
        }
        if matches!(binding_key, BindingKey::Contribution(_)) && resolved.bindings().count() > 1 {
            if reported.insert(binding_key) {
                self.duplicates(resolved);
            }
            return;
        }

        for binding in resolved.bindings() {
            if binding.nullable && !request.nullable && request.kind == RequestKind::Instance {
                self.reporter.error(
                    format!(
                        "`{}` is not nullable, but is being provided by nullable {}",
                        request.key,
                        binding.describe()
                    ),
                    Some(requester.describe(component)),
                );
            }
            if binding.is_production() && requester.is_provision(component) {
                self.reporter.error(
                    format!(
                        "`{}` is a production binding and cannot be requested by a provision: {}",
                        request.key,
                        requester.describe(component)
                    ),
                    Some(requester.describe(component)),
                );
            }
        }
        if request.kind.is_production() && requester.is_provision(component) {
            self.reporter.error(
                format!(
                    "`{}` can only be requested from a production component or binding",
                    request.requested_type()
                ),
                Some(requester.describe(component)),
            );
        }
        if !requester.is_provision(component) {
            self.production_request(component, requester, request, resolved);
        }
    }

    /// Requests made by production entry points and bindings: production bindings are only
    /// reachable asynchronously.
    fn production_request(
        &mut self,
        component: &ComponentDescriptor,
        requester: &Requester<'_>,
        request: &DependencyRequest,
        resolved: &ResolvedBindings,
    ) {
        let entry_point = matches!(requester, Requester::EntryPoint(_));
        if entry_point && request.kind == RequestKind::Produced {
            self.reporter.error(
                format!(
                    "`{}` cannot be returned by an entry point; request a future instead",
                    request.requested_type()
                ),
                Some(requester.describe(component)),
            );
            return;
        }
        let synchronous = match request.kind {
            RequestKind::Provider | RequestKind::Lazy | RequestKind::ProviderOfLazy => true,
            RequestKind::Instance => entry_point,
            _ => false,
        };
        if synchronous && resolved.bindings().any(|binding| binding.is_production()) {
            self.reporter.error(
                format!(
                    "`{}` is a production binding and cannot be requested as `{}`",
                    request.key,
                    request.requested_type()
                ),
                Some(requester.describe(component)),
            );
        }
    }

    fn missing(&mut self, component: &ComponentDescriptor, requester: &Requester<'_>, request: &DependencyRequest) {
        let mut message = match request.kind {
            RequestKind::MembersInjection => format!(
                "`{}` cannot have its members injected: it is not a declared class with injectable members",
                request.key
            ),
            _ => format!(
                "`{}` cannot be provided without an injection constructor or a binding method",
                request.key
            ),
        };
        let _ = write!(message, "\n    requested by {}", requester.describe(component));
        if let Some(element) = &request.element {
            let _ = write!(message, " at {element}");
        }
        self.reporter
            .error(message, Some(requester.describe(component)));
    }

    fn duplicates(&mut self, resolved: &ResolvedBindings) {
        let mut message = format!("`{}` is bound multiple times:", resolved.key());
        for binding in resolved.bindings() {
            let _ = write!(message, "\n    {}", binding.describe());
        }
        let element = resolved.bindings().next().map(|binding| binding.describe());
        self.reporter.error(message, element);
    }

    fn scope(&mut self, component: &ComponentDescriptor, binding: &Binding) {
        let Some(scope) = &binding.scope else {
            return;
        };
        if scope.is_reusable() || component.scopes.contains(scope) {
            return;
        }
        let scopes = component
            .scopes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let scopes = if scopes.is_empty() { "no scopes".to_string() } else { scopes };
        self.reporter.error(
            format!(
                "`{}` (unscoped, {scopes}) may not reference bindings with different scopes: {scope} {}",
                component.name,
                binding.describe()
            ),
            Some(binding.describe()),
        );
    }

    fn cycles(&mut self, graph: &BindingGraph) {
        let network = graph.network();
        for cycle in network.strict_cycles() {
            let path = cycle
                .iter()
                .map(|&node| network.binding_key(node).to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            self.reporter.error(
                format!("found a dependency cycle: {path}"),
                Some(graph.component().name.to_string()),
            );
        }
    }

    fn creator(&mut self, graph: &BindingGraph) {
        let component = graph.component();
        let Some(creator) = &component.creator else {
            return;
        };
        for requirement in graph.component_requirements() {
            let covered = creator
                .setters
                .iter()
                .any(|setter| setter.requirement.kind == requirement.kind && setter.requirement.ty == requirement.ty);
            // Factory methods pass module instances as arguments.
            let passed = graph.factory_method().is_some();
            if !covered && !passed && requirement.is_required() {
                self.reporter.error(
                    format!(
                        "`{}` is missing a setter for the required `{}`",
                        creator.name, requirement.ty
                    ),
                    Some(creator.name.to_string()),
                );
            }
        }
    }

    fn factory_methods(&mut self, graph: &BindingGraph) {
        let component = graph.component();
        for method in &component.methods {
            let ComponentMethodKind::SubcomponentFactory { subcomponent, params } = &method.kind else {
                continue;
            };
            let Some(subgraph) = graph.subgraph(&subcomponent.name) else {
                continue;
            };
            for requirement in subgraph.component_requirements() {
                let passed = params
                    .iter()
                    .any(|param| param.kind == requirement.kind && param.ty == requirement.ty);
                if !passed && requirement.is_required() {
                    self.reporter.error(
                        format!(
                            "`{}::{}` must take the required `{}` of `{}` as a parameter",
                            component.name, method.name, requirement.ty, subcomponent.name
                        ),
                        Some(format!("{}::{}", component.name, method.name)),
                    );
                }
            }
        }
    }

    fn modules(&mut self, component: &ComponentDescriptor) {
        for module in &component.modules {
            if !self.validated_modules.insert(module.name.clone()) {
                continue;
            }
            for delegate in &module.delegates {
                let bound = match delegate.contribution_type {
                    ContributionType::Unique | ContributionType::SetValues => Some(delegate.key.ty()),
                    ContributionType::Set => delegate.key.ty().as_set(),
                    ContributionType::Map => delegate.key.ty().as_map().map(|(_, value)| value),
                };
                let target = delegate.delegate_request.key.ty();
                if let Some(bound) = bound
                    && !self.oracle.is_subtype(target, bound)
                {
                    self.reporter.error(
                        format!("`binds` parameter `{target}` must be assignable to `{bound}`"),
                        Some(format!("{}::{}", delegate.module, delegate.method)),
                    );
                }
            }
            for subcomponent in &module.subcomponents {
                let declared = module
                    .subcomponent_declarations
                    .iter()
                    .any(|declaration| &declaration.subcomponent == subcomponent);
                if !declared {
                    self.reporter.error(
                        format!(
                            "`{subcomponent}` is listed as a subcomponent of `{}` but does not declare a creator",
                            module.name
                        ),
                        Some(module.name.to_string()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{
        BindingMethodDecl, ClassDecl, ComponentDecl, ComponentMethodDecl, CreatorDecl, Declarations, ModuleDecl, Param,
        Scope,
    };
    use crate::test_util;

    fn errors(declarations: &Declarations) -> Vec<String> {
        let (result, diagnostics) = test_util::validate(declarations, "crate::App");
        assert!(result.is_ok());
        diagnostics.error_messages().into_iter().map(str::to_string).collect()
    }

    fn app(method: ComponentMethodDecl) -> ComponentDecl {
        ComponentDecl::component("crate::App").with_method(method)
    }

    #[test]
    fn missing_binding_names_requester() {
        let declarations =
            Declarations::new().with_component(app(ComponentMethodDecl::new("db", TypeRef::declared("crate::Db"))));

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("`crate::Db` cannot be provided"));
        assert!(errors[0].contains("requested by crate::App::db"));
    }

    #[test]
    fn duplicate_bindings_are_listed() {
        let declarations = Declarations::new()
            .with_module(ModuleDecl::new("crate::A").with_method(BindingMethodDecl::provides("name", TypeRef::declared("String"))))
            .with_module(ModuleDecl::new("crate::B").with_method(BindingMethodDecl::provides("name", TypeRef::declared("String"))))
            .with_component(
                app(ComponentMethodDecl::new("name", TypeRef::declared("String")))
                    .with_module("crate::A")
                    .with_module("crate::B"),
            );

        let errors = errors(&declarations);

        assert_eq!(
            errors,
            ["`String` is bound multiple times:\n    crate::A::name\n    crate::B::name"]
        );
    }

    #[test]
    fn scoped_binding_in_unscoped_component() {
        let declarations = Declarations::new()
            .with_class(ClassDecl::new("crate::Db").with_scope(Scope::singleton()).with_constructor(Vec::new()))
            .with_component(app(ComponentMethodDecl::new("db", TypeRef::declared("crate::Db"))));

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("may not reference bindings with different scopes"));
    }

    #[test]
    fn instance_cycle_is_reported_and_provider_breaks_it() {
        let cyclic = |ty: TypeRef| {
            Declarations::new()
                .with_class(
                    ClassDecl::new("crate::A").with_constructor(vec![Param::new("b", TypeRef::declared("crate::B"))]),
                )
                .with_class(ClassDecl::new("crate::B").with_constructor(vec![Param::new("a", ty)]))
                .with_component(app(ComponentMethodDecl::new("a", TypeRef::declared("crate::A"))))
        };

        let strict = errors(&cyclic(TypeRef::declared("crate::A")));
        let deferred = errors(&cyclic(TypeRef::declared("crate::A").wrapped_in(crate::types::well_known::PROVIDER)));

        assert_eq!(strict, ["found a dependency cycle: crate::A -> crate::B -> crate::A"]);
        assert!(deferred.is_empty());
    }

    #[test]
    fn creator_must_set_dependencies() {
        let declarations = Declarations::new()
            .with_class(ClassDecl::new("crate::Config"))
            .with_component(
                ComponentDecl::component("crate::App")
                    .with_dependency("crate::Config")
                    .with_creator(CreatorDecl::new("crate::AppBuilder")),
            );

        let errors = errors(&declarations);

        assert_eq!(errors, ["`crate::AppBuilder` is missing a setter for the required `crate::Config`"]);
    }

    #[test]
    fn wildcard_provider_request() {
        let declarations = Declarations::new().with_component(app(ComponentMethodDecl::new(
            "any",
            TypeRef::Wildcard.wrapped_in(crate::types::well_known::PROVIDER),
        )));

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("framework types must name their value type"));
    }

    #[test]
    fn nullable_binding_for_non_nullable_request() {
        let declarations = Declarations::new()
            .with_module(
                ModuleDecl::new("crate::Names")
                    .with_method(BindingMethodDecl::provides("name", TypeRef::declared("String")).nullable()),
            )
            .with_component(app(ComponentMethodDecl::new("name", TypeRef::declared("String"))).with_module("crate::Names"));

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is not nullable"));
    }

    #[test]
    fn provision_may_not_depend_on_production() {
        let declarations = Declarations::new()
            .with_module(
                ModuleDecl::producer("crate::Fetch")
                    .with_method(BindingMethodDecl::produces("page", TypeRef::declared("String"))),
            )
            .with_component(app(ComponentMethodDecl::new("page", TypeRef::declared("String"))).with_module("crate::Fetch"));

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is a production binding"));
    }

    #[test]
    fn production_entry_point_must_be_asynchronous() {
        let fetch = ModuleDecl::producer("crate::Fetch")
            .with_method(BindingMethodDecl::produces("page", TypeRef::declared("String")));
        let component = |method: ComponentMethodDecl| {
            Declarations::new().with_module(fetch.clone()).with_component(
                ComponentDecl::production_component("crate::App")
                    .with_module("crate::Fetch")
                    .with_method(method),
            )
        };

        let instance = errors(&component(ComponentMethodDecl::new("page", TypeRef::declared("String"))));
        let future = errors(&component(ComponentMethodDecl::new(
            "page",
            TypeRef::declared("String").wrapped_in(crate::types::well_known::PRODUCER_FUTURE),
        )));
        let produced = errors(&component(ComponentMethodDecl::new(
            "page",
            TypeRef::declared("String").wrapped_in(crate::types::well_known::PRODUCED),
        )));

        assert_eq!(instance.len(), 1);
        assert!(instance[0].contains("cannot be requested as `String`"));
        assert!(future.is_empty(), "{future:?}");
        assert_eq!(produced.len(), 1);
        assert!(produced[0].contains("cannot be returned by an entry point"));
    }

    #[test]
    fn producer_may_not_request_a_provider_of_production() {
        let declarations = Declarations::new()
            .with_module(
                ModuleDecl::producer("crate::Fetch")
                    .with_method(BindingMethodDecl::produces("page", TypeRef::declared("String")))
                    .with_method(
                        BindingMethodDecl::produces("length", TypeRef::declared("usize")).with_params(vec![Param::new(
                            "page",
                            TypeRef::declared("String").wrapped_in(crate::types::well_known::PROVIDER),
                        )]),
                    ),
            )
            .with_component(
                ComponentDecl::production_component("crate::App")
                    .with_module("crate::Fetch")
                    .with_method(ComponentMethodDecl::new(
                        "length",
                        TypeRef::declared("usize").wrapped_in(crate::types::well_known::PRODUCER_FUTURE),
                    )),
            );

        let errors = errors(&declarations);

        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("is a production binding and cannot be requested as"));
    }

    #[test]
    fn factory_method_must_pass_required_modules() {
        let declarations = Declarations::new()
            .with_module(
                ModuleDecl::new("crate::SessionModule")
                    .not_instantiable()
                    .with_method(BindingMethodDecl::provides("token", TypeRef::declared("String")).instance_method()),
            )
            .with_component(
                ComponentDecl::subcomponent("crate::Session")
                    .with_module("crate::SessionModule")
                    .with_method(ComponentMethodDecl::new("token", TypeRef::declared("String"))),
            )
            .with_component(app(ComponentMethodDecl::new("session", TypeRef::declared("crate::Session"))));

        let errors = errors(&declarations);

        assert_eq!(
            errors,
            ["`crate::App::session` must take the required `crate::SessionModule` of `crate::Session` as a parameter"]
        );
    }

    #[test]
    fn binds_target_must_be_subtype() {
        let declarations = Declarations::new()
            .with_class(ClassDecl::new("crate::Pg").with_constructor(Vec::new()))
            .with_module(ModuleDecl::new("crate::Stores").with_method(BindingMethodDecl::binds(
                "store",
                TypeRef::declared("crate::Store"),
                Param::new("pg", TypeRef::declared("crate::Pg")),
            )))
            .with_component(app(ComponentMethodDecl::new("store", TypeRef::declared("crate::Store"))).with_module("crate::Stores"));

        let errors = errors(&declarations);

        assert_eq!(errors, ["`binds` parameter `crate::Pg` must be assignable to `crate::Store`"]);
    }

    #[test]
    fn unavailable_type_defers() {
        let declarations = Declarations::new().with_component(app(ComponentMethodDecl::new(
            "generated",
            TypeRef::Unavailable(TypeName::new("crate::Generated")),
        )));

        let (result, diagnostics) = test_util::validate(&declarations, "crate::App");

        assert!(result.is_err_and(|error| error.is_deferred()));
        assert!(diagnostics.is_empty());
    }
}
