// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Writes a component tree from its resolved binding graphs.
//!
//! Components are written parent first. While a subcomponent is written, its ancestors stay open
//! in a lineage so that bindings they own can still gain fields and methods; expressions for
//! those bindings are computed in the owner and reached through `parent` fields.

use std::collections::HashMap;
use std::sync::Arc;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use tracing::{Level, event};

use crate::binding::Binding;
use crate::descriptor::{ComponentDescriptor, ComponentMethodKind, ComponentRequirement};
use crate::graph::BindingGraph;
use crate::naming::{UniqueNameSet, ident};
use crate::options::CompilerOptions;
use crate::request::{BindingKey, DependencyRequest, FrameworkType, RequestKind};
use crate::types::{TypeName, well_known};
use crate::writing::binding_expression::{Selection, Strategy, select};
use crate::writing::component_impl::{ComponentImplementation, FrameworkFieldKey, base_name};
use crate::writing::creation::{CreationContext, creation_expression, injection_site_statements, value_type};
use crate::writing::expressions::{BindingExpression, BindingRequest, Receiver};
use crate::writing::field_state::{Begin, Completion};
use crate::writing::output::{FieldKind, GeneratedComponent, MethodKind, TypeKind};

/// Writes components, keeping the implementations of every open ancestor.
#[derive(Debug)]
pub(crate) struct ComponentGenerator {
    fast_init: bool,
    lineage: Vec<ComponentImplementation>,
}

impl ComponentGenerator {
    pub(crate) fn new(options: &CompilerOptions) -> Self {
        Self {
            fast_init: options.fast_init(),
            lineage: Vec::new(),
        }
    }

    /// Writes the component of `graph` and every subcomponent below it.
    pub(crate) fn generate(mut self, graph: &Arc<BindingGraph>) -> GeneratedComponent {
        self.component(graph, None)
    }

    fn component(&mut self, graph: &Arc<BindingGraph>, parent: Option<Ident>) -> GeneratedComponent {
        let name = graph.component().name.clone();
        event!(Level::DEBUG, component = %name, depth = self.lineage.len(), "writing component");

        let implementation = ComponentImplementation::new(Arc::clone(graph), parent);
        let component_ident = implementation.ident().clone();
        self.lineage.push(implementation);
        let at = self.lineage.len() - 1;

        self.component_methods(at);
        let subcomponents = graph
            .subgraphs()
            .iter()
            .map(|subgraph| self.component(subgraph, Some(component_ident.clone())))
            .collect();
        self.creation(at);

        let Some(implementation) = self.lineage.pop() else {
            unreachable!("internal error: lineage of {name} is empty")
        };
        let switching_types = implementation.switching.type_count();
        let generated = implementation.finish(subcomponents);
        event!(
            Level::DEBUG,
            component = %name,
            fields = generated.fields().len(),
            methods = generated.methods().len(),
            switching_types,
            delegated = generated.delegated_fields().len(),
            "wrote component"
        );
        generated
    }

    /// The single binding for `binding_key` as seen from the component at `at`, and the index of
    /// the component that owns it.
    fn resolve(&self, at: usize, binding_key: &BindingKey) -> (usize, Arc<Binding>) {
        let graph = self.lineage[at].graph();
        let Some(owned) = graph.resolved(binding_key).and_then(|resolved| resolved.binding()) else {
            unreachable!(
                "internal error: {binding_key:?} has no single binding in {}",
                graph.component().name
            )
        };
        let Some(owner) = self.lineage[..=at]
            .iter()
            .rposition(|implementation| implementation.graph().component().name == owned.owner)
        else {
            unreachable!("internal error: {} is not an open component", owned.owner)
        };
        (owner, Arc::clone(&owned.binding))
    }

    /// The expression for `request`, written in the component at `at` and read from `receiver`.
    fn request_expression(&mut self, at: usize, request: &BindingRequest, receiver: &Receiver) -> TokenStream {
        self.read_expression(at, request, receiver, true)
    }

    /// Like [`request_expression`](Self::request_expression). A framework instance read from a
    /// field is retained when it `escapes`: it may be used after the component is borrowed, and
    /// the code reading it does not store it in the component.
    fn read_expression(
        &mut self,
        at: usize,
        request: &BindingRequest,
        receiver: &Receiver,
        escapes: bool,
    ) -> TokenStream {
        let (owner, binding) = self.resolve(at, &request.binding_key);
        if owner != at {
            return self.read_expression(owner, request, &receiver.ancestor(at - owner), escapes);
        }
        let expression = self.expression(at, request, &binding);
        match &expression {
            BindingExpression::Inline => self.inline_creation(at, &binding, receiver),
            BindingExpression::InlineFramework { framework } => {
                self.framework_instance(at, &binding, *framework, receiver)
            }
            BindingExpression::DerivedFromFramework { framework } => {
                let escapes = request.kind != RequestKind::Instance;
                let instance = self.read_expression(at, &request.framework(*framework), receiver, escapes);
                BindingExpression::derive(request.kind, *framework, instance)
            }
            _ => {
                if let BindingExpression::FrameworkField { field, framework } = &expression {
                    self.initialize_field(at, &request.binding_key, *framework, field, &binding);
                }
                let value_type = value_type(&binding).to_type_tokens();
                let tokens = expression
                    .dependency_expression(receiver, &value_type)
                    .unwrap_or_else(|| unreachable!("internal error: {expression:?} is composed by the writer"));
                match &expression {
                    BindingExpression::FrameworkField { framework, .. } if escapes && !receiver.is_stored() => {
                        let this = receiver.tokens();
                        match framework {
                            FrameworkType::Provider => quote!(::thicket::retain_provider(&#this.this, #tokens)),
                            FrameworkType::Producer => quote!(::thicket::retain_producer(&#this.this, #tokens)),
                        }
                    }
                    _ => tokens,
                }
            }
        }
    }

    /// The expression selected for `request` in the component at `at`, allocating what it needs
    /// on first use.
    fn expression(&mut self, at: usize, request: &BindingRequest, binding: &Arc<Binding>) -> BindingExpression {
        let implementation = &self.lineage[at];
        if let Some(expression) = implementation.expression(request) {
            return expression.clone();
        }
        let strategy = select(Selection {
            binding,
            kind: request.kind,
            fast_init: self.fast_init,
            dependent_count: implementation.graph().dependent_count(&request.binding_key),
            has_component_method: implementation
                .component_method(&request.binding_key, RequestKind::Instance)
                .is_some(),
        });
        event!(
            Level::TRACE,
            component = %implementation.graph().component().name,
            key = %binding.key,
            kind = ?request.kind,
            ?strategy,
            "selected binding expression"
        );
        self.materialize(at, request, binding, strategy)
    }

    fn materialize(
        &mut self,
        at: usize,
        request: &BindingRequest,
        binding: &Arc<Binding>,
        strategy: Strategy,
    ) -> BindingExpression {
        let base = base_name(&request.binding_key);
        let value_type = value_type(binding).to_type_tokens();
        let expression = match strategy {
            Strategy::Inline => BindingExpression::Inline,
            Strategy::InlineFramework(framework) => BindingExpression::InlineFramework { framework },
            Strategy::DerivedFromFramework(framework) => BindingExpression::DerivedFromFramework { framework },
            Strategy::ComponentMethod => {
                let Some(method) = self.lineage[at]
                    .component_method(&request.binding_key, RequestKind::Instance)
                    .cloned()
                else {
                    unreachable!("internal error: {} has no component method", binding.key)
                };
                BindingExpression::ComponentMethod { method }
            }
            Strategy::FrameworkField(framework) => {
                let implementation = &mut self.lineage[at];
                let (suffix, slot) = match framework {
                    FrameworkType::Provider => ("provider", quote!(::thicket::ProviderSlot)),
                    FrameworkType::Producer => ("producer", quote!(::thicket::ProducerSlot)),
                };
                let field = implementation.unique_name(&format!("{base}_{suffix}"));
                implementation.add_field(
                    FieldKind::Framework,
                    &field,
                    quote!(#slot<#value_type>),
                    quote!(#slot::new()),
                );
                BindingExpression::FrameworkField { field, framework }
            }
            Strategy::PrivateMethod => {
                let method = self.lineage[at].unique_name(&format!("get_{base}"));
                let expression = BindingExpression::PrivateMethod { method: method.clone() };
                self.lineage[at].set_expression(request.clone(), expression.clone());
                let slot = self.lineage[at].reserve_method();
                let body = self.inline_creation(at, binding, &Receiver::this());
                self.lineage[at].set_method(
                    slot,
                    MethodKind::PrivateMethod,
                    &method,
                    quote! {
                        fn #method(&self) -> #value_type {
                            #body
                        }
                    },
                );
                return expression;
            }
            Strategy::MemoizedMethod => {
                let implementation = &mut self.lineage[at];
                let field = implementation.unique_name(&base);
                let method = implementation.unique_name(&format!("get_{base}"));
                implementation.add_field(
                    FieldKind::Memoized,
                    &field,
                    quote!(::thicket::Memoized<#value_type>),
                    quote!(::thicket::Memoized::new()),
                );
                let expression = BindingExpression::MemoizedMethod { method: method.clone() };
                implementation.set_expression(request.clone(), expression.clone());
                let slot = implementation.reserve_method();
                let body = self.inline_creation(at, binding, &Receiver::this());
                self.lineage[at].set_method(
                    slot,
                    MethodKind::PrivateMethod,
                    &method,
                    quote! {
                        fn #method(&self) -> #value_type {
                            self.#field.get_or_init(|| #body)
                        }
                    },
                );
                return expression;
            }
            Strategy::SwitchingProvider => {
                let implementation = &mut self.lineage[at];
                let allocation = implementation.allocate_switching(&request.binding_key);
                let expression = BindingExpression::SwitchingProvider {
                    dispatch: implementation.switching.name(allocation.dispatch).clone(),
                    id: allocation.id,
                };
                implementation.set_expression(request.clone(), expression.clone());
                let instance = BindingRequest::new(request.binding_key.clone(), RequestKind::Instance);
                let body = self.request_expression(at, &instance, &Receiver::dispatch());
                self.lineage[at]
                    .switching
                    .set_case(allocation.dispatch, allocation.id, body);
                return expression;
            }
            Strategy::MembersInjection => {
                let method = self.lineage[at].unique_name(&format!("inject_{base}"));
                let expression = BindingExpression::MembersInjection { method: method.clone() };
                self.lineage[at].set_expression(request.clone(), expression.clone());
                let slot = self.lineage[at].reserve_method();
                let ty = binding.key.ty().to_type_tokens();
                let statements = {
                    let mut cx = ComponentContext::new(self, at, Receiver::this());
                    injection_site_statements(&binding.injection_sites, &quote!(instance), &mut cx)
                };
                let instance = if statements.is_empty() {
                    quote!(_instance)
                } else {
                    quote!(instance)
                };
                self.lineage[at].set_method(
                    slot,
                    MethodKind::MembersInjection,
                    &method,
                    quote! {
                        fn #method(&self, #instance: &mut #ty) {
                            #(#statements)*
                        }
                    },
                );
                return expression;
            }
        };
        self.lineage[at].set_expression(request.clone(), expression.clone());
        expression
    }

    fn inline_creation(&mut self, at: usize, binding: &Binding, receiver: &Receiver) -> TokenStream {
        let mut cx = ComponentContext::new(self, at, receiver.clone());
        creation_expression(binding, &mut cx)
    }

    /// A new provider or producer creating the value of `binding`.
    fn framework_instance(
        &mut self,
        at: usize,
        binding: &Binding,
        framework: FrameworkType,
        receiver: &Receiver,
    ) -> TokenStream {
        let value_type = value_type(binding).to_type_tokens();
        let mut cx = FactoryContext::new(self, at, receiver.clone(), framework == FrameworkType::Producer);
        let body = creation_expression(binding, &mut cx);
        let (names, inits): (Vec<Ident>, Vec<TokenStream>) = cx.captures.into_iter().unzip();
        match framework {
            FrameworkType::Provider => quote! {
                ::thicket::provider_fn({
                    #(let #names = #inits;)*
                    move || -> #value_type { #body }
                })
            },
            FrameworkType::Producer => quote! {
                ::thicket::producer_fn({
                    #(let #names = #inits;)*
                    move || -> ::thicket::ProducerFuture<#value_type> {
                        #(let #names = ::std::clone::Clone::clone(&#names);)*
                        ::std::boxed::Box::pin(async move {
                            ::std::result::Result::<#value_type, ::thicket::ProductionError>::Ok(#body)
                        })
                    }
                })
            },
        }
    }

    /// Emits the initialization of a framework field the first time it is read.
    ///
    /// A read while the field's own initializer is being computed installs a delegate, which the
    /// outer read back-patches once the initializer is known.
    fn initialize_field(
        &mut self,
        at: usize,
        binding_key: &BindingKey,
        framework: FrameworkType,
        field: &Ident,
        binding: &Binding,
    ) {
        let key = FrameworkFieldKey {
            binding_key: binding_key.clone(),
            framework,
        };
        match self.lineage[at].field_states.begin(&key) {
            Begin::Start(frame) => {
                let mut init = self.framework_instance(at, binding, framework, &Receiver::field_initializer());
                if framework == FrameworkType::Provider
                    && let Some(scope) = &binding.scope
                {
                    init = if scope.is_reusable() {
                        quote!(::thicket::SingleCheck::provider(#init))
                    } else {
                        quote!(::thicket::DoubleCheck::provider(#init))
                    };
                }
                let implementation = &mut self.lineage[at];
                let statement = match implementation.field_states.finish(frame) {
                    Completion::Direct => quote!(self.#field.set(#init);),
                    Completion::BackPatch => quote!(self.#field.set_delegate(#init);),
                };
                implementation.add_initialization(statement);
            }
            Begin::Delegate => {
                let implementation = &mut self.lineage[at];
                event!(
                    Level::DEBUG,
                    component = %implementation.graph().component().name,
                    field = %field,
                    "delegating field initialization to break a dependency cycle"
                );
                implementation.add_initialization(quote!(self.#field.install_delegate();));
            }
            Begin::AlreadyDelegated | Begin::Initialized => {}
        }
    }

    /// A place expression for the field holding `requirement`, searching from `at` upwards.
    fn requirement_place(&self, at: usize, requirement: &ComponentRequirement, receiver: &Receiver) -> TokenStream {
        for (hops, index) in (0..=at).rev().enumerate() {
            if let Some(field) = self.lineage[index].requirement_field(requirement) {
                let receiver = receiver.ancestor(hops);
                let receiver = receiver.tokens();
                return quote!(#receiver.#field);
            }
        }
        unreachable!("internal error: no component holds {}", requirement.ty)
    }

    fn module_place(&self, at: usize, module: &TypeName, receiver: &Receiver) -> TokenStream {
        for (hops, index) in (0..=at).rev().enumerate() {
            if let Some(field) = self.lineage[index].module_field(module) {
                let receiver = receiver.ancestor(hops);
                let receiver = receiver.tokens();
                return quote!(#receiver.#field);
            }
        }
        unreachable!("internal error: no component holds an instance of {module}")
    }

    fn component_methods(&mut self, at: usize) {
        let component = Arc::clone(self.lineage[at].graph().component());
        for method in &component.methods {
            let name = ident(&method.name);
            match &method.kind {
                ComponentMethodKind::EntryPoint {
                    request,
                    returns_instance,
                } if request.kind == RequestKind::MembersInjection => {
                    self.members_injection_method(at, &name, request, *returns_instance);
                }
                ComponentMethodKind::EntryPoint { request, .. } => self.entry_point(at, &name, request),
                ComponentMethodKind::SubcomponentFactory { subcomponent, params } => {
                    self.factory_method(at, &name, subcomponent, params);
                }
                ComponentMethodKind::SubcomponentCreator { subcomponent } => {
                    self.creator_method(at, &name, subcomponent);
                }
            }
        }
    }

    fn entry_point(&mut self, at: usize, name: &Ident, request: &DependencyRequest) {
        let binding_request = BindingRequest::new(request.binding_key(), request.kind);
        let ty = request.requested_type().to_type_tokens();
        let first = self.lineage[at]
            .component_method(&binding_request.binding_key, binding_request.kind)
            .cloned();
        let body = match first {
            Some(first) if first != *name => quote!(self.#first()),
            _ => self.entry_point_body(at, &binding_request, name),
        };
        self.lineage[at].add_method(
            MethodKind::ComponentMethod,
            name,
            quote! {
                pub fn #name(&self) -> #ty {
                    #body
                }
            },
        );
    }

    fn entry_point_body(&mut self, at: usize, request: &BindingRequest, name: &Ident) -> TokenStream {
        let (owner, binding) = self.resolve(at, &request.binding_key);
        if owner == at
            && request.kind == RequestKind::Instance
            && let BindingExpression::ComponentMethod { method } = self.expression(at, request, &binding)
            && method == *name
        {
            return self.inline_creation(at, &binding, &Receiver::this());
        }
        self.request_expression(at, request, &Receiver::this())
    }

    fn members_injection_method(&mut self, at: usize, name: &Ident, request: &DependencyRequest, returns_instance: bool) {
        let binding_request = BindingRequest::new(request.binding_key(), RequestKind::MembersInjection);
        let (owner, binding) = self.resolve(at, &binding_request.binding_key);
        let BindingExpression::MembersInjection { method } = self.expression(owner, &binding_request, &binding) else {
            unreachable!("internal error: {} is not injected by a method", request.key)
        };
        let receiver = Receiver::this().ancestor(at - owner);
        let receiver = receiver.tokens();
        let ty = request.key.ty().to_type_tokens();
        let tokens = if returns_instance {
            quote! {
                pub fn #name(&self, mut instance: #ty) -> #ty {
                    #receiver.#method(&mut instance);
                    instance
                }
            }
        } else {
            quote! {
                pub fn #name(&self, instance: &mut #ty) {
                    #receiver.#method(instance);
                }
            }
        };
        self.lineage[at].add_method(MethodKind::ComponentMethod, name, tokens);
    }

    fn factory_method(
        &mut self,
        at: usize,
        name: &Ident,
        subcomponent: &ComponentDescriptor,
        params: &[ComponentRequirement],
    ) {
        let Some(child_graph) = self.lineage[at].graph().subgraph(&subcomponent.name).cloned() else {
            unreachable!("internal error: {} has no graph", subcomponent.name)
        };
        let child = subcomponent.name.simple_ident();
        let param_names: Vec<Ident> = params.iter().map(|param| ident(&param.name)).collect();
        let param_types = params.iter().map(|param| param.ty.to_type_tokens());
        let mut used = vec![false; params.len()];
        let args: Vec<TokenStream> = child_graph
            .component_requirements()
            .iter()
            .map(|requirement| {
                let param = params
                    .iter()
                    .position(|param| param.kind == requirement.kind && param.ty == requirement.ty);
                match param {
                    Some(index) => {
                        used[index] = true;
                        let param = &param_names[index];
                        quote!(#param)
                    }
                    None if requirement.has_default => quote!(::std::default::Default::default()),
                    None => unreachable!("internal error: {name} does not pass the required {}", requirement.ty),
                }
            })
            .collect();
        let unused = param_names
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(param, _)| param);
        self.lineage[at].add_method(
            MethodKind::ComponentMethod,
            name,
            quote! {
                pub fn #name(&self #(, #param_names: #param_types)*) -> ::std::sync::Arc<#child> {
                    #(let _ = #unused;)*
                    #child::new(::thicket::upgrade_component(&self.this) #(, #args)*)
                }
            },
        );
    }

    fn creator_method(&mut self, at: usize, name: &Ident, subcomponent: &ComponentDescriptor) {
        let Some(creator) = &subcomponent.creator else {
            unreachable!("internal error: {} has no creator", subcomponent.name)
        };
        let creator = creator.name.simple_ident();
        self.lineage[at].add_method(
            MethodKind::ComponentMethod,
            name,
            quote! {
                pub fn #name(&self) -> #creator {
                    #creator::new(::thicket::upgrade_component(&self.this))
                }
            },
        );
    }

    /// Writes the functions and the builder type that create the component at `at`.
    fn creation(&mut self, at: usize) {
        let implementation = &self.lineage[at];
        let component = Arc::clone(implementation.graph().component());
        let component_ident = implementation.ident().clone();
        let requirements = implementation.requirements().to_vec();
        let is_root = at == 0;

        let builder = match &component.creator {
            Some(creator) => creator.name.simple_ident(),
            None if is_root => format_ident!("{}Builder", component_ident),
            None => return,
        };
        let setters: Vec<Setter> = match &component.creator {
            Some(creator) => creator
                .setters
                .iter()
                .map(|setter| Setter {
                    name: ident(&setter.name),
                    requirement: setter.requirement.clone(),
                })
                .collect(),
            None => requirements
                .iter()
                .map(|(requirement, field)| Setter {
                    name: field.clone(),
                    requirement: requirement.clone(),
                })
                .collect(),
        };
        let parent = (!is_root).then(|| {
            let Some(parent) = self.lineage.get(at - 1) else {
                unreachable!("internal error: subcomponent {} has no parent", component.name)
            };
            parent.ident().clone()
        });

        let tokens = builder_type(&BuilderShape {
            component: &component.name,
            ident: &component_ident,
            builder: &builder,
            parent: parent.as_ref(),
            setters: &setters,
            requirements: &requirements,
        });
        let implementation = &mut self.lineage[at];
        implementation.add_type(TypeKind::Creator, &builder, tokens);

        if is_root {
            let builder_fn = implementation.unique_name("builder");
            implementation.add_method(
                MethodKind::Creation,
                &builder_fn,
                quote! {
                    pub fn #builder_fn() -> #builder {
                        #builder::new()
                    }
                },
            );
            if requirements.iter().all(|(requirement, _)| !requirement.is_required()) {
                let create = implementation.unique_name("create");
                let defaults = requirements.iter().map(|_| quote!(::std::default::Default::default()));
                implementation.add_method(
                    MethodKind::Creation,
                    &create,
                    quote! {
                        pub fn #create() -> ::std::sync::Arc<Self> {
                            Self::new(#(#defaults),*)
                        }
                    },
                );
            }
        }
    }
}

/// A builder setter and the requirement it fills.
#[derive(Debug)]
struct Setter {
    name: Ident,
    requirement: ComponentRequirement,
}

#[derive(Debug)]
struct BuilderShape<'a> {
    component: &'a TypeName,
    ident: &'a Ident,
    builder: &'a Ident,
    parent: Option<&'a Ident>,
    setters: &'a [Setter],
    requirements: &'a [(ComponentRequirement, Ident)],
}

fn same_requirement(a: &ComponentRequirement, b: &ComponentRequirement) -> bool {
    a.kind == b.kind && a.ty == b.ty && a.key == b.key
}

/// The builder of a component: one optional field per settable requirement and a `build` that
/// checks the required ones.
fn builder_type(shape: &BuilderShape<'_>) -> TokenStream {
    let BuilderShape {
        component,
        ident,
        builder,
        parent,
        setters,
        requirements,
    } = *shape;

    let settable: Vec<(&ComponentRequirement, &Ident)> = requirements
        .iter()
        .filter(|(requirement, _)| {
            setters
                .iter()
                .any(|setter| same_requirement(&setter.requirement, requirement))
        })
        .map(|(requirement, field)| (requirement, field))
        .collect();
    let field_names: Vec<&Ident> = settable.iter().map(|(_, field)| *field).collect();
    let field_types = settable.iter().map(|(requirement, _)| requirement.ty.to_type_tokens());

    let (parent_field, parent_param, parent_init, parent_arg) = match parent {
        Some(parent) => (
            quote!(parent: ::std::sync::Arc<#parent>,),
            quote!(parent: ::std::sync::Arc<#parent>),
            quote!(parent,),
            vec![quote!(self.parent)],
        ),
        None => (TokenStream::new(), TokenStream::new(), TokenStream::new(), Vec::new()),
    };

    let setter_fns = setters.iter().map(|setter| {
        let name = &setter.name;
        let ty = setter.requirement.ty.to_type_tokens();
        let field = settable
            .iter()
            .find(|(requirement, _)| same_requirement(requirement, &setter.requirement))
            .map(|(_, field)| *field);
        match field {
            Some(field) => quote! {
                #[must_use]
                pub fn #name(mut self, value: #ty) -> Self {
                    self.#field = ::std::option::Option::Some(value);
                    self
                }
            },
            None => quote! {
                #[must_use]
                pub fn #name(self, _value: #ty) -> Self {
                    self
                }
            },
        }
    });

    let component_path = component.as_str();
    let args = parent_arg.into_iter().chain(requirements.iter().map(|(requirement, field)| {
        let settable = field_names.contains(&field);
        let name = field.to_string();
        match (settable, requirement.is_required()) {
            (true, true) => quote! {
                self.#field.ok_or_else(|| ::thicket::MissingRequirement::new(#component_path, #name))?
            },
            (true, false) => quote!(self.#field.unwrap_or_default()),
            (false, false) => quote!(::std::default::Default::default()),
            (false, true) => unreachable!("internal error: {component} cannot set the required {name}"),
        }
    }));

    quote! {
        pub struct #builder {
            #parent_field
            #(#field_names: ::std::option::Option<#field_types>,)*
        }

        impl #builder {
            fn new(#parent_param) -> Self {
                Self {
                    #parent_init
                    #(#field_names: ::std::option::Option::None,)*
                }
            }

            #(#setter_fns)*

            /// Creates the component.
            ///
            /// # Errors
            ///
            /// Returns an error if a required module, dependency or instance was not set.
            pub fn build(self) -> ::std::result::Result<::std::sync::Arc<#ident>, ::thicket::MissingRequirement> {
                ::std::result::Result::Ok(#ident::new(#(#args),*))
            }
        }
    }
}

/// Writes creation expressions inside a method of the component, where the component is
/// borrowed through the receiver.
struct ComponentContext<'g> {
    generator: &'g mut ComponentGenerator,
    at: usize,
    receiver: Receiver,
}

impl<'g> ComponentContext<'g> {
    fn new(generator: &'g mut ComponentGenerator, at: usize, receiver: Receiver) -> Self {
        Self { generator, at, receiver }
    }
}

impl CreationContext for ComponentContext<'_> {
    fn dependency(&mut self, request: &DependencyRequest) -> TokenStream {
        let request = BindingRequest::new(request.binding_key(), request.kind);
        self.generator.request_expression(self.at, &request, &self.receiver)
    }

    fn requirement(&mut self, requirement: &ComponentRequirement) -> TokenStream {
        self.generator.requirement_place(self.at, requirement, &self.receiver)
    }

    fn module(&mut self, module: &TypeName) -> TokenStream {
        self.generator.module_place(self.at, module, &self.receiver)
    }

    fn component(&mut self) -> TokenStream {
        let receiver = self.receiver.tokens();
        quote!(::thicket::upgrade_component(&#receiver.this))
    }

    fn resolved(&self, request: &DependencyRequest) -> Arc<Binding> {
        self.generator.resolve(self.at, &request.binding_key()).1
    }

    fn members_injector(&mut self, binding: &Binding) -> TokenStream {
        let mut cx = FactoryContext::new(self.generator, self.at, self.receiver.clone(), false);
        let closure = cx.injector_closure(binding, false);
        let (names, inits): (Vec<Ident>, Vec<TokenStream>) = cx.captures.into_iter().unzip();
        quote! {
            {
                #(let #names = #inits;)*
                #closure
            }
        }
    }
}

/// Writes creation expressions inside a provider or producer closure.
///
/// Every dependency becomes a captured framework instance, initialized before the closure and
/// moved into it.
struct FactoryContext<'g> {
    generator: &'g mut ComponentGenerator,
    at: usize,
    receiver: Receiver,
    production: bool,
    names: UniqueNameSet,
    captures: Vec<(Ident, TokenStream)>,
    touched: Vec<Ident>,
    framework_captures: HashMap<(BindingKey, FrameworkType), Ident>,
    place_captures: HashMap<String, Ident>,
}

impl<'g> FactoryContext<'g> {
    fn new(generator: &'g mut ComponentGenerator, at: usize, receiver: Receiver, production: bool) -> Self {
        Self {
            generator,
            at,
            receiver,
            production,
            names: UniqueNameSet::default(),
            captures: Vec::new(),
            touched: Vec::new(),
            framework_captures: HashMap::new(),
            place_captures: HashMap::new(),
        }
    }

    fn capture(&mut self, base: &str, init: TokenStream) -> Ident {
        let name = self.names.unique_ident(base);
        self.captures.push((name.clone(), init));
        name
    }

    /// Records a read of `name` and returns it.
    fn touch(&mut self, name: Ident) -> Ident {
        if !self.touched.contains(&name) {
            self.touched.push(name.clone());
        }
        name
    }

    fn capture_place(&mut self, base: &str, place: TokenStream) -> TokenStream {
        let key = place.to_string();
        let name = match self.place_captures.get(&key) {
            Some(name) => name.clone(),
            None => {
                let name = self.capture(base, quote!(::std::clone::Clone::clone(&#place)));
                self.place_captures.insert(key, name.clone());
                name
            }
        };
        let name = self.touch(name);
        quote!(#name)
    }

    /// A `members_injector_fn` closure for `binding`. A closure nested in a provider or
    /// producer re-clones the captures it reads, since the enclosing closure keeps them.
    fn injector_closure(&mut self, binding: &Binding, nested: bool) -> TokenStream {
        let Some(target) = binding.key.ty().unwrap_in(well_known::MEMBERS_INJECTOR) else {
            unreachable!("internal error: {} is not a members injector", binding.key)
        };
        let ty = target.to_type_tokens();
        let touched = std::mem::take(&mut self.touched);
        let statements = injection_site_statements(&binding.injection_sites, &quote!(instance), self);
        let read = std::mem::replace(&mut self.touched, touched);
        for name in &read {
            self.touch(name.clone());
        }
        let rebinds: &[Ident] = if nested { &read } else { &[] };
        let instance = if statements.is_empty() {
            quote!(_instance)
        } else {
            quote!(instance)
        };
        quote! {
            ::thicket::members_injector_fn({
                #(let #rebinds = ::std::clone::Clone::clone(&#rebinds);)*
                move |#instance: &mut #ty| {
                    #(#statements)*
                }
            })
        }
    }
}

impl CreationContext for FactoryContext<'_> {
    fn dependency(&mut self, request: &DependencyRequest) -> TokenStream {
        let binding_key = request.binding_key();
        let (_, dependency) = self.generator.resolve(self.at, &binding_key);
        let framework = if request.kind.is_production() || (self.production && dependency.is_production()) {
            FrameworkType::Producer
        } else {
            FrameworkType::Provider
        };
        let capture_key = (binding_key, framework);
        let capture = if let Some(capture) = self.framework_captures.get(&capture_key) {
            capture.clone()
        } else {
            let framework_request = BindingRequest::new(capture_key.0.clone(), framework.request_kind());
            let init = self
                .generator
                .request_expression(self.at, &framework_request, &self.receiver);
            let suffix = match framework {
                FrameworkType::Provider => "provider",
                FrameworkType::Producer => "producer",
            };
            let capture = self.capture(&format!("{}_{suffix}", base_name(&capture_key.0)), init);
            self.framework_captures.insert(capture_key, capture.clone());
            capture
        };
        let capture = self.touch(capture);
        match (framework, request.kind) {
            (FrameworkType::Provider, RequestKind::Instance) => quote!(#capture.get()),
            (FrameworkType::Provider, RequestKind::Provider) | (FrameworkType::Producer, RequestKind::Producer) => {
                quote!(::std::sync::Arc::clone(&#capture))
            }
            (FrameworkType::Provider, RequestKind::Lazy) => {
                quote!(::thicket::Lazy::new(::std::sync::Arc::clone(&#capture)))
            }
            (FrameworkType::Provider, RequestKind::ProviderOfLazy) => {
                quote!(::thicket::ProviderOfLazy::create(::std::sync::Arc::clone(&#capture)))
            }
            (FrameworkType::Producer, RequestKind::Instance) => quote!(#capture.get().await?),
            (FrameworkType::Producer, RequestKind::Produced) => {
                quote!(::thicket::Produced::from(#capture.get().await))
            }
            (FrameworkType::Producer, RequestKind::Future) => quote!(#capture.get()),
            (framework, kind) => {
                unreachable!("internal error: {kind:?} of {} cannot be read from a {framework:?}", request.key)
            }
        }
    }

    fn requirement(&mut self, requirement: &ComponentRequirement) -> TokenStream {
        let place = self.generator.requirement_place(self.at, requirement, &self.receiver);
        self.capture_place(&requirement.name, place)
    }

    fn module(&mut self, module: &TypeName) -> TokenStream {
        let place = self.generator.module_place(self.at, module, &self.receiver);
        self.capture_place(&crate::naming::snake_case(module.simple_name()), place)
    }

    /// A closure stored in the component captures it weakly; any other closure keeps it alive.
    fn component(&mut self) -> TokenStream {
        let receiver = self.receiver.tokens();
        let this = quote!(#receiver.this);
        let key = this.to_string();
        let name = match self.place_captures.get(&key) {
            Some(name) => name.clone(),
            None => {
                let init = if self.receiver.is_stored() {
                    quote!(::std::sync::Weak::clone(&#this))
                } else {
                    quote!(::thicket::upgrade_component(&#this))
                };
                let name = self.capture("this", init);
                self.place_captures.insert(key, name.clone());
                name
            }
        };
        let name = self.touch(name);
        if self.receiver.is_stored() {
            quote!(::thicket::upgrade_component(&#name))
        } else {
            quote!(::std::sync::Arc::clone(&#name))
        }
    }

    fn resolved(&self, request: &DependencyRequest) -> Arc<Binding> {
        self.generator.resolve(self.at, &request.binding_key()).1
    }

    fn members_injector(&mut self, binding: &Binding) -> TokenStream {
        self.injector_closure(binding, true)
    }
}
