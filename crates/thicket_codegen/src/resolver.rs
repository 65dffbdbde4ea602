// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolution of the bindings reachable from a component's entry points.
//!
//! Components are resolved from the root down. Every component has a resolver on the lineage
//! stack while it and its subcomponents are being resolved, so a child can ask an ancestor to
//! resolve a key it ends up owning. A binding is owned by the highest component that can satisfy
//! it without depending on bindings installed further down.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{Level, event};

use crate::binding::{
    Binding, BindingElement, BindingKind, ContributionType, DelegateDeclaration, MultibindingDeclaration,
    OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::binding_factory::BindingFactory;
use crate::collector::ComponentDeclarations;
use crate::declarations::Scope;
use crate::descriptor::ComponentDescriptor;
use crate::graph::BindingGraph;
use crate::inject_registry::InjectRegistry;
use crate::key::{Key, is_framework_wrapped};
use crate::request::{BindingKey, RequestKind};
use crate::resolved::{OwnedBinding, ResolvedBindings};
use crate::types::{TypeName, well_known};

/// Creates binding graphs for component trees.
pub(crate) struct BindingGraphFactory<'a> {
    factory: &'a BindingFactory<'a>,
    registry: InjectRegistry<'a>,
    full_binding_graph: bool,
    lineage: Vec<Resolver>,
    matching_keys: HashMap<Key, Arc<[Key]>>,
}

impl std::fmt::Debug for BindingGraphFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingGraphFactory")
            .field("full_binding_graph", &self.full_binding_graph)
            .field("depth", &self.lineage.len())
            .finish_non_exhaustive()
    }
}

/// Resolution state of one component.
#[derive(Debug)]
struct Resolver {
    component: Arc<ComponentDescriptor>,
    declarations: ComponentDeclarations,
    contributions: Resolutions,
    members_injections: Resolutions,
    cycle_stack: Vec<Key>,
    subcomponents_to_resolve: VecDeque<Arc<ComponentDescriptor>>,
    key_locality: HashMap<Key, bool>,
    binding_locality: HashMap<Arc<Binding>, bool>,
}

/// Insertion-ordered resolutions by key.
#[derive(Debug, Default)]
struct Resolutions {
    order: Vec<Key>,
    map: HashMap<Key, Arc<ResolvedBindings>>,
}

impl Resolutions {
    fn get(&self, key: &Key) -> Option<&Arc<ResolvedBindings>> {
        self.map.get(key)
    }

    fn contains(&self, key: &Key) -> bool {
        self.map.contains_key(key)
    }

    fn insert(&mut self, key: Key, resolved: Arc<ResolvedBindings>) {
        if self.map.insert(key.clone(), resolved).is_none() {
            self.order.push(key);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedBindings>> {
        self.order.iter().filter_map(|key| self.map.get(key))
    }
}

/// Bindings and declarations found for a key, before ownership is decided.
#[derive(Debug, Default)]
struct Lookup {
    bindings: Vec<Arc<Binding>>,
    multibinding_declarations: Vec<Arc<MultibindingDeclaration>>,
    subcomponent_declarations: Vec<Arc<SubcomponentDeclaration>>,
    optional_declarations: Vec<Arc<OptionalBindingDeclaration>>,
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

impl Resolver {
    fn new(component: Arc<ComponentDescriptor>, factory: &BindingFactory<'_>) -> Self {
        let mut declarations = ComponentDeclarations::default();
        declarations.add_explicit_binding(Arc::new(factory.component_binding(&component.name)));
        for dependency in &component.dependencies {
            declarations.add_explicit_binding(Arc::new(factory.component_dependency_binding(dependency)));
            let Some(class) = dependency.ty.name().and_then(|name| factory.oracle().class(name)) else {
                continue;
            };
            for method in &class.provision_methods {
                if let Some(binding) = factory.component_method_binding(dependency, method, component.is_production()) {
                    declarations.add_explicit_binding(Arc::new(binding));
                }
            }
        }
        for requirement in component.bound_instances() {
            declarations.add_explicit_binding(Arc::new(factory.bound_instance_binding(requirement)));
        }
        for (_, child) in component.creator_methods() {
            let declared_by_module = component
                .module_subcomponents
                .iter()
                .any(|declared| declared.name == child.name);
            if !declared_by_module && let Some(creator) = &child.creator {
                declarations.add_explicit_binding(Arc::new(
                    factory.subcomponent_creator_binding(&child.name, &creator.name),
                ));
            }
        }
        for module in &component.modules {
            declarations.add_module(module);
        }
        let subcomponents_to_resolve = component.method_children().cloned().collect();
        Self {
            component,
            declarations,
            contributions: Resolutions::default(),
            members_injections: Resolutions::default(),
            cycle_stack: Vec::new(),
            subcomponents_to_resolve,
            key_locality: HashMap::new(),
            binding_locality: HashMap::new(),
        }
    }
}

impl<'a> BindingGraphFactory<'a> {
    pub(crate) fn new(factory: &'a BindingFactory<'a>, full_binding_graph: bool) -> Self {
        Self {
            factory,
            registry: InjectRegistry::new(factory),
            full_binding_graph,
            lineage: Vec::new(),
            matching_keys: HashMap::new(),
        }
    }

    /// Resolves `component` and every subcomponent reachable from it.
    pub(crate) fn create(&mut self, component: &Arc<ComponentDescriptor>) -> Arc<BindingGraph> {
        let component = Arc::clone(component);
        self.lineage.push(Resolver::new(Arc::clone(&component), self.factory));
        let level = self.lineage.len() - 1;
        event!(Level::DEBUG, component = %component.name, depth = level, "resolving component");

        for (_, request) in component.entry_points() {
            if request.kind == RequestKind::MembersInjection {
                self.resolve_members_injection(level, &request.key);
            } else {
                self.resolve(level, &request.key);
            }
        }

        if self.full_binding_graph {
            for module in &component.modules {
                for key in module.all_binding_keys() {
                    self.resolve(level, &key.without_contribution());
                }
            }
            self.lineage[level]
                .subcomponents_to_resolve
                .extend(component.module_subcomponents.iter().cloned());
        }

        let mut resolved_children = HashSet::new();
        let mut subgraphs = Vec::new();
        while let Some(child) = self.lineage[level].subcomponents_to_resolve.pop_front() {
            if resolved_children.insert(child.name.clone()) {
                subgraphs.push(self.create(&child));
            }
        }

        let graph = self.build_graph(level, subgraphs);
        self.lineage.pop();
        event!(
            Level::DEBUG,
            component = %component.name,
            keys = graph.contributions().count(),
            "resolved component"
        );
        Arc::new(graph)
    }

    fn build_graph(&self, level: usize, subgraphs: Vec<Arc<BindingGraph>>) -> BindingGraph {
        let resolver = &self.lineage[level];
        let mut index: HashMap<&Key, usize> = HashMap::new();
        let mut merged: Vec<Arc<ResolvedBindings>> = Vec::new();
        for ancestor in &self.lineage[..=level] {
            for resolved in ancestor.contributions.iter() {
                match index.get(resolved.key()) {
                    Some(&position) => merged[position] = Arc::clone(resolved),
                    None => {
                        index.insert(resolved.key(), merged.len());
                        merged.push(Arc::clone(resolved));
                    }
                }
            }
        }
        let members = resolver.members_injections.iter().cloned().collect();
        let owned_modules = resolver
            .component
            .modules
            .iter()
            .filter(|module| {
                !self.lineage[..level]
                    .iter()
                    .any(|ancestor| ancestor.component.module(&module.name).is_some())
            })
            .cloned()
            .collect();
        let factory_method = level
            .checked_sub(1)
            .and_then(|parent| self.lineage[parent].component.factory_method_for(&resolver.component.name))
            .map(|method| Arc::clone(&method.name));
        BindingGraph::new(
            Arc::clone(&resolver.component),
            merged,
            members,
            subgraphs,
            owned_modules,
            factory_method,
            self.full_binding_graph,
        )
    }

    fn resolve(&mut self, level: usize, key: &Key) {
        let resolver = &self.lineage[level];
        if resolver.cycle_stack.contains(key) || resolver.contributions.contains(key) {
            return;
        }

        if level > 0 && self.previously_resolved(level - 1, key).is_some() {
            self.resolve(level - 1, key);
            if !self.key_depends_on_local_bindings(level, key)
                && !self.has_local_explicit_bindings(level, key)
                && let Some(inherited) = self.lineage[level - 1].contributions.get(key).cloned()
            {
                self.lineage[level].contributions.insert(key.clone(), inherited);
                return;
            }
        }

        event!(Level::TRACE, component = %self.lineage[level].component.name, key = %key, "resolving key");
        self.lineage[level].cycle_stack.push(key.clone());
        let resolved = Arc::new(self.look_up_bindings(level, key));
        self.lineage[level]
            .contributions
            .insert(key.clone(), Arc::clone(&resolved));
        self.resolve_dependencies(level, &resolved);
        self.lineage[level].cycle_stack.pop();
    }

    fn resolve_members_injection(&mut self, level: usize, key: &Key) {
        if self.lineage[level].members_injections.contains(key) {
            return;
        }
        let owner = self.lineage[level].component.name.clone();
        let resolved = match self.registry.members_injection_binding(key) {
            Some(binding) => ResolvedBindings::for_members_injection(key.clone(), owner, binding),
            None => ResolvedBindings::no_bindings(BindingKey::MembersInjection(key.clone())),
        };
        let resolved = Arc::new(resolved);
        self.lineage[level]
            .members_injections
            .insert(key.clone(), Arc::clone(&resolved));
        self.resolve_dependencies(level, &resolved);
    }

    fn resolve_dependencies(&mut self, level: usize, resolved: &ResolvedBindings) {
        let owner = self.lineage[level].component.name.clone();
        let keys: Vec<Key> = resolved
            .bindings_owned_by(&owner)
            .flat_map(|binding| binding.all_dependencies())
            .map(|request| request.key.clone())
            .collect();
        for key in &keys {
            self.resolve(level, key);
        }
    }

    fn look_up_bindings(&mut self, level: usize, key: &Key) -> ResolvedBindings {
        let lookup = self.look_up(level, key);
        let mut owned = Vec::with_capacity(lookup.bindings.len());
        for binding in lookup.bindings {
            let owner = self.owning_component(level, key, &binding);
            owned.push(OwnedBinding { owner, binding });
        }
        ResolvedBindings::for_contributions(
            key.clone(),
            owned,
            lookup.multibinding_declarations,
            lookup.subcomponent_declarations,
            lookup.optional_declarations,
        )
    }

    /// Finds every binding for `key` visible from the component at `level`.
    fn look_up(&mut self, level: usize, key: &Key) -> Lookup {
        let mut lookup = Lookup::default();

        for ancestor in 0..=level {
            for binding in self.local_explicit_bindings(ancestor, key) {
                push_unique(&mut lookup.bindings, binding);
            }
        }

        let mut contributions = Vec::new();
        for matching in self.keys_matching_request(key).iter() {
            for ancestor in 0..=level {
                for binding in self.local_explicit_multibindings(ancestor, matching) {
                    push_unique(&mut contributions, binding);
                }
                for declaration in self.lineage[ancestor]
                    .declarations
                    .multibinding_declarations
                    .get(matching)
                {
                    push_unique(&mut lookup.multibinding_declarations, Arc::clone(declaration));
                }
            }
        }
        if !contributions.is_empty() || !lookup.multibinding_declarations.is_empty() {
            let multibinding = self.factory.synthetic_multibinding(key, &contributions);
            push_unique(&mut lookup.bindings, Arc::new(multibinding));
        }

        if let Some(value_key) = key.unwrap_optional() {
            for ancestor in 0..=level {
                for declaration in self.lineage[ancestor].declarations.optional_declarations.get(&value_key) {
                    push_unique(&mut lookup.optional_declarations, Arc::clone(declaration));
                }
            }
            if !lookup.optional_declarations.is_empty()
                && let Some(value_type) = key.ty().as_optional()
            {
                let request_kind = RequestKind::of(value_type);
                let underlying = self.look_up(level, &value_key).bindings;
                let optional = self.factory.synthetic_optional_binding(key, request_kind, &underlying);
                push_unique(&mut lookup.bindings, Arc::new(optional));
            }
        }

        for ancestor in 0..=level {
            for declaration in self.lineage[ancestor].declarations.subcomponent_declarations.get(key) {
                push_unique(&mut lookup.subcomponent_declarations, Arc::clone(declaration));
            }
        }
        if let Some(declaration) = lookup.subcomponent_declarations.first().cloned()
            && let Some(creator) = key.ty().name()
        {
            let binding = self.factory.subcomponent_creator_binding(&declaration.subcomponent, creator);
            push_unique(&mut lookup.bindings, Arc::new(binding));
            self.enqueue_module_subcomponent(level, &declaration);
        }

        if key.ty().is_wrapped_in(well_known::MEMBERS_INJECTOR)
            && let Some(binding) = self.registry.members_injector_binding(key)
        {
            push_unique(&mut lookup.bindings, binding);
        }

        if lookup.bindings.is_empty()
            && let Some(binding) = self.registry.injection_binding(key)
            && !self.is_incorrectly_scoped_in_partial_graph(level, &binding)
        {
            lookup.bindings.push(binding);
        }

        lookup
    }

    /// Queues a module-declared subcomponent on the resolver that installs its module.
    fn enqueue_module_subcomponent(&mut self, level: usize, declaration: &SubcomponentDeclaration) {
        let owner = (0..=level).rev().find(|&ancestor| {
            self.lineage[ancestor]
                .declarations
                .subcomponent_declarations
                .contains_key(&declaration.key)
        });
        if let Some(owner) = owner {
            let resolver = &mut self.lineage[owner];
            if let Some(child) = resolver.component.child(&declaration.subcomponent).cloned() {
                resolver.subcomponents_to_resolve.push_back(child);
            }
        }
    }

    /// Scoped just-in-time bindings of a subcomponent resolved on its own cannot be placed when no
    /// component in the lineage has their scope.
    fn is_incorrectly_scoped_in_partial_graph(&self, level: usize, binding: &Binding) -> bool {
        self.lineage[0].component.is_subcomponent()
            && binding.scope.as_ref().is_some_and(|scope| {
                !scope.is_reusable()
                    && !self.lineage[..=level]
                        .iter()
                        .any(|resolver| resolver.component.scopes.contains(scope))
            })
    }

    fn local_explicit_bindings(&mut self, level: usize, key: &Key) -> Vec<Arc<Binding>> {
        let declarations = &self.lineage[level].declarations;
        let mut bindings = declarations.explicit_bindings.get(key).to_vec();
        let delegates = declarations.delegates.get(&key.unwrap_map_value_type()).to_vec();
        for delegate in &delegates {
            bindings.push(Arc::new(self.create_delegate_binding(level, delegate)));
        }
        bindings
    }

    fn local_explicit_multibindings(&mut self, level: usize, key: &Key) -> Vec<Arc<Binding>> {
        let declarations = &self.lineage[level].declarations;
        let mut bindings = declarations.explicit_multibindings.get(key).to_vec();
        if includes_delegate_multibindings(key) {
            let delegates = declarations
                .delegate_multibindings
                .get(&key.unwrap_map_value_type())
                .to_vec();
            for delegate in &delegates {
                bindings.push(Arc::new(self.create_delegate_binding(level, delegate)));
            }
        }
        bindings
    }

    fn create_delegate_binding(&mut self, level: usize, declaration: &DelegateDeclaration) -> Binding {
        let delegate_key = &declaration.delegate_request.key;
        if self.lineage[level].cycle_stack.contains(delegate_key) {
            return self.factory.unresolved_delegate_binding(declaration);
        }
        self.lineage[level].cycle_stack.push(delegate_key.clone());
        let resolved = self.look_up(level, delegate_key);
        self.lineage[level].cycle_stack.pop();
        match resolved.bindings.first() {
            Some(actual) if actual.binding_type != crate::binding::BindingType::MembersInjection => {
                self.factory.delegate_binding(declaration, actual)
            }
            _ => self.factory.unresolved_delegate_binding(declaration),
        }
    }

    fn keys_matching_request(&mut self, key: &Key) -> Arc<[Key]> {
        if let Some(keys) = self.matching_keys.get(key) {
            return Arc::clone(keys);
        }
        let keys: Arc<[Key]> = key.keys_matching_request().into();
        self.matching_keys.insert(key.clone(), Arc::clone(&keys));
        keys
    }

    fn previously_resolved(&self, level: usize, key: &Key) -> Option<Arc<ResolvedBindings>> {
        (0..=level)
            .rev()
            .find_map(|ancestor| self.lineage[ancestor].contributions.get(key).cloned())
    }

    fn owning_component(&mut self, level: usize, request_key: &Key, binding: &Arc<Binding>) -> TypeName {
        let this = self.lineage[level].component.name.clone();
        match self.owning_resolver(level, binding) {
            Some(owner) if owner < level => {}
            _ => return this,
        }
        self.resolve(level - 1, request_key);
        if self.binding_depends_on_local_bindings(level, binding) {
            return this;
        }
        self.lineage[level - 1]
            .contributions
            .get(request_key)
            .and_then(|resolved| resolved.owner_of(binding).cloned())
            .unwrap_or(this)
    }

    /// The resolver at which a binding should be placed, or `None` for the requesting one.
    fn owning_resolver(&self, level: usize, binding: &Binding) -> Option<usize> {
        let production_scoped = binding.scope.as_ref().is_some_and(Scope::is_production);
        if production_scoped || binding.is_production() {
            let highest = (0..=level).find(|&ancestor| {
                (binding.kind == BindingKind::Injection && self.lineage[ancestor].component.is_production())
                    || self.contains_explicit_binding(ancestor, binding)
            });
            if highest.is_some() {
                return highest;
            }
        }

        if binding.scope.as_ref().is_some_and(Scope::is_reusable) {
            return (0..=level).rev().find(|&ancestor| {
                self.lineage[ancestor]
                    .contributions
                    .get(&binding.key)
                    .is_some_and(|resolved| resolved.bindings().any(|resolved| **resolved == *binding))
            });
        }

        if let Some(owner) = (0..=level)
            .rev()
            .find(|&ancestor| self.contains_explicit_binding(ancestor, binding))
        {
            return Some(owner);
        }

        let scope = binding.scope.as_ref()?;
        (0..=level)
            .rev()
            .find(|&ancestor| self.lineage[ancestor].component.scopes.contains(scope))
    }

    fn contains_explicit_binding(&self, level: usize, binding: &Binding) -> bool {
        let declarations = &self.lineage[level].declarations;
        declarations.contains_explicit_binding(binding)
            || contains_delegate_declaration(declarations, binding)
            || declarations.subcomponent_declarations.contains_key(&binding.key)
    }

    fn has_local_explicit_bindings(&self, level: usize, key: &Key) -> bool {
        let declarations = &self.lineage[level].declarations;
        !declarations.explicit_bindings.get(key).is_empty()
            || !declarations.delegates.get(&key.unwrap_map_value_type()).is_empty()
    }

    fn has_local_multibinding_contributions(&mut self, level: usize, key: &Key) -> bool {
        let matching = self.keys_matching_request(key);
        let declarations = &self.lineage[level].declarations;
        matching.iter().any(|matching| {
            !declarations.explicit_multibindings.get(matching).is_empty()
                || (includes_delegate_multibindings(matching)
                    && !declarations
                        .delegate_multibindings
                        .get(&matching.unwrap_map_value_type())
                        .is_empty())
        })
    }

    fn has_local_optional_contribution(&self, level: usize, key: &Key) -> bool {
        let Some(value_key) = key.unwrap_optional() else {
            return false;
        };
        let resolved_as_optional = self
            .previously_resolved(level, key)
            .is_some_and(|resolved| resolved.bindings().any(|binding| binding.kind == BindingKind::Optional));
        if resolved_as_optional {
            self.has_local_explicit_bindings(level, &value_key)
        } else {
            !self.lineage[level]
                .declarations
                .optional_declarations
                .get(&value_key)
                .is_empty()
        }
    }

    /// Whether resolving `key` in the component at `level` could differ from the resolution an
    /// ancestor already made, because of contributions installed at `level`.
    fn key_depends_on_local_bindings(&mut self, level: usize, key: &Key) -> bool {
        self.key_locality(level, key, &mut HashSet::new())
    }

    fn binding_depends_on_local_bindings(&mut self, level: usize, binding: &Arc<Binding>) -> bool {
        self.binding_locality(level, binding, &mut HashSet::new())
    }

    fn key_locality(&mut self, level: usize, key: &Key, visiting: &mut HashSet<Key>) -> bool {
        if let Some(&cached) = self.lineage[level].key_locality.get(key) {
            return cached;
        }
        if !visiting.insert(key.clone()) {
            return false;
        }
        let mut local =
            self.has_local_multibinding_contributions(level, key) || self.has_local_optional_contribution(level, key);
        if !local && let Some(previous) = self.previously_resolved(level, key) {
            for binding in previous.bindings() {
                if self.binding_locality(level, binding, visiting) {
                    local = true;
                    break;
                }
            }
        }
        self.lineage[level].key_locality.insert(key.clone(), local);
        local
    }

    /// Scoped and production bindings keep their owner; others move down when a dependency does.
    fn binding_locality(&mut self, level: usize, binding: &Arc<Binding>, visiting: &mut HashSet<Key>) -> bool {
        if let Some(&cached) = self.lineage[level].binding_locality.get(binding) {
            return cached;
        }
        let unscoped = binding.scope.as_ref().is_none_or(Scope::is_reusable);
        let mut local = false;
        if unscoped && !binding.is_production() {
            let keys: Vec<Key> = binding.all_dependencies().map(|request| request.key.clone()).collect();
            for key in &keys {
                if self.key_locality(level, key, visiting) {
                    local = true;
                    break;
                }
            }
        }
        self.lineage[level]
            .binding_locality
            .insert(Arc::clone(binding), local);
        local
    }
}

/// Delegate contributions only satisfy set keys and maps whose values are framework types.
fn includes_delegate_multibindings(key: &Key) -> bool {
    key.ty().as_map().is_none_or(|(_, value)| is_framework_wrapped(value))
}

fn contains_delegate_declaration(declarations: &ComponentDeclarations, binding: &Binding) -> bool {
    if binding.kind != BindingKind::Delegate {
        return false;
    }
    let key = if binding.contribution_type == ContributionType::Map {
        binding.key.unwrap_map_value_type()
    } else {
        binding.key.clone()
    };
    let Some(BindingElement::ModuleMethod { module, method, .. }) = &binding.element else {
        return false;
    };
    declarations
        .delegates
        .get(&key)
        .iter()
        .any(|declaration| &declaration.module == module && &declaration.method == method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{
        BindingMethodDecl, ClassDecl, ComponentDecl, ComponentMethodDecl, Contribution, Declarations, ModuleDecl, Param,
    };
    use crate::test_util::resolve;
    use crate::types::TypeRef;

    fn key(name: &str) -> Key {
        Key::new(TypeRef::declared(name))
    }

    fn plugins() -> Key {
        Key::new(TypeRef::set_of(TypeRef::declared("crate::Plugin")))
    }

    fn owners(graph: &BindingGraph, key: &Key) -> Vec<String> {
        graph
            .contribution_bindings(key)
            .unwrap()
            .owned()
            .iter()
            .map(|owned| owned.owner.to_string())
            .collect()
    }

    fn tree() -> Declarations {
        Declarations::new()
            .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
            .with_class(
                ClassDecl::new("crate::Db")
                    .with_scope(Scope::singleton())
                    .with_constructor(vec![Param::new("clock", TypeRef::declared("crate::Clock"))]),
            )
            .with_class(
                ClassDecl::new("crate::Handler")
                    .with_constructor(vec![Param::new("plugins", TypeRef::set_of(TypeRef::declared("crate::Plugin")))]),
            )
            .with_module(
                ModuleDecl::new("crate::RootPlugins").with_method(
                    BindingMethodDecl::provides("logging", TypeRef::declared("crate::Plugin"))
                        .contributing(Contribution::IntoSet),
                ),
            )
            .with_module(
                ModuleDecl::new("crate::ChildPlugins").with_method(
                    BindingMethodDecl::provides("metrics", TypeRef::declared("crate::Plugin"))
                        .contributing(Contribution::IntoSet),
                ),
            )
            .with_component(
                ComponentDecl::component("crate::App")
                    .with_scope(Scope::singleton())
                    .with_module("crate::RootPlugins")
                    .with_method(ComponentMethodDecl::new("clock", TypeRef::declared("crate::Clock")))
                    .with_method(ComponentMethodDecl::new("handler", TypeRef::declared("crate::Handler")))
                    .with_method(ComponentMethodDecl::new("session", TypeRef::declared("crate::Session"))),
            )
            .with_component(
                ComponentDecl::subcomponent("crate::Session")
                    .with_module("crate::ChildPlugins")
                    .with_method(ComponentMethodDecl::new("db", TypeRef::declared("crate::Db")))
                    .with_method(ComponentMethodDecl::new("clock", TypeRef::declared("crate::Clock")))
                    .with_method(ComponentMethodDecl::new("handler", TypeRef::declared("crate::Handler"))),
            )
    }

    #[test]
    fn entry_point_dependencies_are_resolved() {
        let graph = resolve(&tree(), "crate::App", false);

        assert_eq!(owners(&graph, &key("crate::Handler")), ["crate::App"]);
        assert_eq!(graph.contribution_bindings(&plugins()).unwrap().owned().len(), 1);
    }

    #[test]
    fn scoped_binding_requested_by_child_is_owned_by_scoped_ancestor() {
        let root = resolve(&tree(), "crate::App", false);
        let session = root.subgraph(&TypeName::new("crate::Session")).unwrap();

        assert_eq!(owners(session, &key("crate::Db")), ["crate::App"]);
        assert_eq!(owners(&root, &key("crate::Db")), ["crate::App"]);
        assert_eq!(session.factory_method().map(AsRef::as_ref), Some("session"));
    }

    #[test]
    fn unscoped_binding_without_local_dependencies_is_inherited() {
        let root = resolve(&tree(), "crate::App", false);
        let session = root.subgraph(&TypeName::new("crate::Session")).unwrap();

        assert!(Arc::ptr_eq(
            session.contribution_bindings(&key("crate::Clock")).unwrap(),
            root.contribution_bindings(&key("crate::Clock")).unwrap(),
        ));
    }

    #[test]
    fn local_contributions_move_dependents_into_the_child() {
        let root = resolve(&tree(), "crate::App", false);
        let session = root.subgraph(&TypeName::new("crate::Session")).unwrap();

        let set = session.contribution_bindings(&plugins()).unwrap();
        let multibinding = set.binding().unwrap();
        assert_eq!(multibinding.owner.as_str(), "crate::Session");
        assert_eq!(multibinding.binding.dependencies.len(), 2);
        assert_eq!(owners(session, &key("crate::Handler")), ["crate::Session"]);
        assert_eq!(owners(&root, &key("crate::Handler")), ["crate::App"]);
    }

    #[test]
    fn owned_modules_exclude_inherited_ones() {
        let declarations = Declarations::new()
            .with_module(ModuleDecl::new("crate::Shared"))
            .with_module(ModuleDecl::new("crate::Local"))
            .with_component(
                ComponentDecl::component("crate::App")
                    .with_module("crate::Shared")
                    .with_method(ComponentMethodDecl::new("session", TypeRef::declared("crate::Session"))),
            )
            .with_component(
                ComponentDecl::subcomponent("crate::Session")
                    .with_module("crate::Shared")
                    .with_module("crate::Local"),
            );
        let root = resolve(&declarations, "crate::App", false);
        let session = root.subgraph(&TypeName::new("crate::Session")).unwrap();

        let owned: Vec<&str> = session.owned_modules().iter().map(|module| module.name.as_str()).collect();
        assert_eq!(owned, ["crate::Local"]);
    }

    #[test]
    fn full_binding_graph_resolves_unrequested_declarations() {
        let declarations = Declarations::new()
            .with_module(
                ModuleDecl::new("crate::Unused")
                    .with_method(BindingMethodDecl::provides("name", TypeRef::declared("String"))),
            )
            .with_component(ComponentDecl::component("crate::App").with_module("crate::Unused"));

        let partial = resolve(&declarations, "crate::App", false);
        let full = resolve(&declarations, "crate::App", true);

        assert!(partial.contribution_bindings(&key("String")).is_none());
        assert!(full.contribution_bindings(&key("String")).is_some());
        assert!(full.is_full_binding_graph());
    }

    #[test]
    fn resolution_is_deterministic() {
        fn order(graph: &BindingGraph) -> Vec<String> {
            graph.contributions().map(|resolved| resolved.key().to_string()).collect()
        }
        let declarations = tree();

        let first = resolve(&declarations, "crate::App", false);
        let second = resolve(&declarations, "crate::App", false);

        assert_eq!(order(&first), order(&second));
        assert_eq!(order(&first.subgraphs()[0]), order(&second.subgraphs()[0]));
    }

    #[test]
    fn delegate_follows_target_binding() {
        let declarations = Declarations::new()
            .with_class(ClassDecl::new("crate::PgStore").with_constructor(Vec::new()))
            .with_module(ModuleDecl::new("crate::Stores").with_method(BindingMethodDecl::binds(
                "store",
                TypeRef::declared("crate::Store"),
                Param::new("store", TypeRef::declared("crate::PgStore")),
            )))
            .with_component(
                ComponentDecl::component("crate::App")
                    .with_module("crate::Stores")
                    .with_method(ComponentMethodDecl::new("store", TypeRef::declared("crate::Store"))),
            );

        let graph = resolve(&declarations, "crate::App", false);
        let store = graph.contribution_bindings(&key("crate::Store")).unwrap();

        assert_eq!(store.binding().unwrap().binding.kind, BindingKind::Delegate);
        assert!(graph.contribution_bindings(&key("crate::PgStore")).is_some());
    }
}
