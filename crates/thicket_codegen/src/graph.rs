// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The resolved binding graph of a component tree.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::collector::ModuleDescriptor;
use crate::descriptor::{ComponentDescriptor, ComponentRequirement, RequirementKind};
use crate::key::Key;
use crate::request::BindingKey;
use crate::resolved::ResolvedBindings;

/// The bindings one component can reach, with the graphs of its subcomponents.
///
/// A graph contains its own resolutions merged over those of its ancestors, so every key a
/// binding of this component depends on can be looked up here.
#[derive(Debug)]
pub struct BindingGraph {
    component: Arc<ComponentDescriptor>,
    contributions: Vec<Arc<ResolvedBindings>>,
    contribution_index: HashMap<Key, usize>,
    members_injections: Vec<Arc<ResolvedBindings>>,
    members_index: HashMap<Key, usize>,
    subgraphs: Vec<Arc<Self>>,
    owned_modules: Vec<Arc<ModuleDescriptor>>,
    factory_method: Option<Arc<str>>,
    full_binding_graph: bool,
    component_requirements: Vec<ComponentRequirement>,
    network: BindingNetwork,
}

impl BindingGraph {
    pub(crate) fn new(
        component: Arc<ComponentDescriptor>,
        contributions: Vec<Arc<ResolvedBindings>>,
        members_injections: Vec<Arc<ResolvedBindings>>,
        subgraphs: Vec<Arc<Self>>,
        owned_modules: Vec<Arc<ModuleDescriptor>>,
        factory_method: Option<Arc<str>>,
        full_binding_graph: bool,
    ) -> Self {
        let contribution_index = contributions
            .iter()
            .enumerate()
            .map(|(index, resolved)| (resolved.key().clone(), index))
            .collect();
        let members_index = members_injections
            .iter()
            .enumerate()
            .map(|(index, resolved)| (resolved.key().clone(), index))
            .collect();
        let mut graph = Self {
            component,
            contributions,
            contribution_index,
            members_injections,
            members_index,
            subgraphs,
            owned_modules,
            factory_method,
            full_binding_graph,
            component_requirements: Vec::new(),
            network: BindingNetwork::default(),
        };
        graph.component_requirements = graph.compute_component_requirements();
        graph.network = BindingNetwork::build(&graph);
        graph
    }

    /// The component this graph belongs to.
    #[must_use]
    pub const fn component(&self) -> &Arc<ComponentDescriptor> {
        &self.component
    }

    /// The contribution bindings resolved for `key`, including inherited ones.
    #[must_use]
    pub fn contribution_bindings(&self, key: &Key) -> Option<&Arc<ResolvedBindings>> {
        self.contribution_index.get(key).map(|&index| &self.contributions[index])
    }

    /// The members-injection binding resolved for `key`.
    #[must_use]
    pub fn members_injection_bindings(&self, key: &Key) -> Option<&Arc<ResolvedBindings>> {
        self.members_index.get(key).map(|&index| &self.members_injections[index])
    }

    /// The resolution for either kind of binding key.
    #[must_use]
    pub fn resolved(&self, binding_key: &BindingKey) -> Option<&Arc<ResolvedBindings>> {
        match binding_key {
            BindingKey::Contribution(key) => self.contribution_bindings(key),
            BindingKey::MembersInjection(key) => self.members_injection_bindings(key),
        }
    }

    /// Every contribution resolution, ancestors' first, in resolution order.
    pub fn contributions(&self) -> impl Iterator<Item = &Arc<ResolvedBindings>> {
        self.contributions.iter()
    }

    /// Every members-injection resolution of this component.
    pub fn members_injections(&self) -> impl Iterator<Item = &Arc<ResolvedBindings>> {
        self.members_injections.iter()
    }

    /// The graphs of subcomponents reachable from this component.
    #[must_use]
    pub fn subgraphs(&self) -> &[Arc<Self>] {
        &self.subgraphs
    }

    /// The subgraph of the subcomponent named `name`.
    #[must_use]
    pub fn subgraph(&self, name: &crate::types::TypeName) -> Option<&Arc<Self>> {
        self.subgraphs.iter().find(|graph| &graph.component.name == name)
    }

    /// Modules installed here and not already installed by an ancestor.
    #[must_use]
    pub fn owned_modules(&self) -> &[Arc<ModuleDescriptor>] {
        &self.owned_modules
    }

    /// The parent's factory method that creates this subcomponent.
    #[must_use]
    pub fn factory_method(&self) -> Option<&Arc<str>> {
        self.factory_method.as_ref()
    }

    /// Whether unreachable declared bindings were resolved too.
    #[must_use]
    pub const fn is_full_binding_graph(&self) -> bool {
        self.full_binding_graph
    }

    /// Instances this component needs: owned modules used by some binding in this graph or a
    /// subgraph, component dependencies and bound instances.
    #[must_use]
    pub fn component_requirements(&self) -> &[ComponentRequirement] {
        &self.component_requirements
    }

    /// The dependency network of the bindings this component owns.
    #[must_use]
    pub const fn network(&self) -> &BindingNetwork {
        &self.network
    }

    /// How many requests in this component reach `binding_key`: dependencies of owned bindings and
    /// entry points.
    #[must_use]
    pub fn dependent_count(&self, binding_key: &BindingKey) -> usize {
        let entry_points = self
            .component
            .entry_points()
            .filter(|(_, request)| request.binding_key() == *binding_key)
            .count();
        let edges = self.network.node(binding_key).map_or(0, |node| self.network.incoming(node));
        entry_points + edges
    }

    fn compute_component_requirements(&self) -> Vec<ComponentRequirement> {
        let mut requirements: Vec<ComponentRequirement> = Vec::new();
        let mut add = |requirement: ComponentRequirement| {
            if !requirements
                .iter()
                .any(|existing| existing.kind == requirement.kind && existing.ty == requirement.ty)
            {
                requirements.push(requirement);
            }
        };
        let mut pending = vec![self];
        while let Some(graph) = pending.pop() {
            for binding in graph.contributions.iter().flat_map(|resolved| resolved.bindings()) {
                if !binding.requires_module_instance() {
                    continue;
                }
                let owned = binding
                    .contributing_module
                    .as_ref()
                    .and_then(|module| self.owned_modules.iter().find(|owned| &owned.name == module));
                if let Some(module) = owned {
                    add(module.requirement());
                }
            }
            pending.extend(graph.subgraphs.iter().rev().map(AsRef::as_ref));
        }
        for dependency in &self.component.dependencies {
            add(dependency.clone());
        }
        for bound in self.component.bound_instances() {
            add(bound.clone());
        }
        requirements.sort_by_key(|requirement| match requirement.kind {
            RequirementKind::Module => 0,
            RequirementKind::Dependency => 1,
            RequirementKind::BoundInstance => 2,
        });
        requirements
    }
}

/// Identifies a node of a [`BindingNetwork`].
pub type NodeId = usize;

/// A dependency edge between two resolved keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The requesting key's node.
    pub from: NodeId,
    /// The requested key's node.
    pub to: NodeId,
    /// Whether the request goes through a framework type such as `Provider` or `Lazy`, which
    /// breaks construction cycles.
    pub deferred: bool,
}

/// An adjacency structure over the binding keys of one graph.
///
/// Edges start only at bindings owned by the graph's component; bindings owned by ancestors are
/// checked in the ancestors' graphs.
#[derive(Debug, Default)]
pub struct BindingNetwork {
    nodes: Vec<BindingKey>,
    index: HashMap<BindingKey, NodeId>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<usize>,
}

impl BindingNetwork {
    fn build(graph: &BindingGraph) -> Self {
        let mut network = Self::default();
        let resolutions = graph.contributions.iter().chain(&graph.members_injections);
        for resolved in resolutions.clone() {
            network.add_node(resolved.binding_key().clone());
        }
        let owner = &graph.component.name;
        for resolved in resolutions {
            let from = network.add_node(resolved.binding_key().clone());
            for binding in resolved.bindings_owned_by(owner) {
                for request in binding.all_dependencies() {
                    let to = network.add_node(request.binding_key());
                    network.add_edge(Edge {
                        from,
                        to,
                        deferred: request.kind.is_deferred(),
                    });
                }
            }
        }
        network
    }

    fn add_node(&mut self, binding_key: BindingKey) -> NodeId {
        if let Some(&node) = self.index.get(&binding_key) {
            return node;
        }
        let node = self.nodes.len();
        self.index.insert(binding_key.clone(), node);
        self.nodes.push(binding_key);
        self.outgoing.push(Vec::new());
        self.incoming.push(0);
        node
    }

    fn add_edge(&mut self, edge: Edge) {
        self.outgoing[edge.from].push(self.edges.len());
        self.incoming[edge.to] += 1;
        self.edges.push(edge);
    }

    /// The node of a binding key.
    #[must_use]
    pub fn node(&self, binding_key: &BindingKey) -> Option<NodeId> {
        self.index.get(binding_key).copied()
    }

    /// The binding key of a node.
    #[must_use]
    pub fn binding_key(&self, node: NodeId) -> &BindingKey {
        &self.nodes[node]
    }

    /// The number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the network has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The edges leaving `node`.
    pub fn edges_from(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing[node].iter().map(|&edge| &self.edges[edge])
    }

    /// The number of edges entering `node`.
    #[must_use]
    pub fn incoming(&self, node: NodeId) -> usize {
        self.incoming[node]
    }

    /// Cycles made only of non-deferred edges, each as a path that starts and ends at its lowest
    /// node.
    #[must_use]
    pub fn strict_cycles(&self) -> Vec<Vec<NodeId>> {
        self.strongly_connected_components()
            .into_iter()
            .filter_map(|component| self.cycle_path(&component))
            .collect()
    }

    /// Tarjan's algorithm over non-deferred edges, without recursion.
    fn strongly_connected_components(&self) -> Vec<Vec<NodeId>> {
        let count = self.nodes.len();
        let mut indices: Vec<Option<usize>> = vec![None; count];
        let mut lowlink = vec![0; count];
        let mut on_stack = vec![false; count];
        let mut stack = Vec::new();
        let mut next_index = 0;
        let mut components = Vec::new();

        for start in 0..count {
            if indices[start].is_some() {
                continue;
            }
            let mut calls: Vec<(NodeId, usize)> = vec![(start, 0)];
            indices[start] = Some(next_index);
            lowlink[start] = next_index;
            next_index += 1;
            stack.push(start);
            on_stack[start] = true;

            while let Some(&(node, position)) = calls.last() {
                let strict: Vec<NodeId> = self.strict_successors(node).collect();
                if let Some(&next) = strict.get(position) {
                    if let Some(frame) = calls.last_mut() {
                        frame.1 += 1;
                    }
                    match indices[next] {
                        None => {
                            indices[next] = Some(next_index);
                            lowlink[next] = next_index;
                            next_index += 1;
                            stack.push(next);
                            on_stack[next] = true;
                            calls.push((next, 0));
                        }
                        Some(index) if on_stack[next] => lowlink[node] = lowlink[node].min(index),
                        Some(_) => {}
                    }
                    continue;
                }
                calls.pop();
                if let Some(&(parent, _)) = calls.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if Some(lowlink[node]) == indices[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
        components.sort();
        components
    }

    fn strict_successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges_from(node).filter(|edge| !edge.deferred).map(|edge| edge.to)
    }

    /// A shortest path from the lowest node of `component` back to itself, if the component is a
    /// cycle.
    fn cycle_path(&self, component: &[NodeId]) -> Option<Vec<NodeId>> {
        let &start = component.first()?;
        let mut previous: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.strict_successors(node) {
                if !component.contains(&next) {
                    continue;
                }
                if next == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while current != start {
                        current = previous[&current];
                        path.push(current);
                    }
                    path.reverse();
                    path.push(start);
                    return Some(path);
                }
                if next != start && !previous.contains_key(&next) {
                    previous.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}
