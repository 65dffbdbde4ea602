// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The mutable implementation model of one component while it is being written.

use std::collections::HashMap;
use std::sync::Arc;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::descriptor::{ComponentMethodKind, ComponentRequirement, RequirementKind};
use crate::graph::BindingGraph;
use crate::naming::{UniqueNameSet, ident, snake_case};
use crate::request::{BindingKey, FrameworkType, RequestKind};
use crate::writing::expressions::{BindingExpression, BindingRequest};
use crate::writing::field_state::FieldStates;
use crate::writing::output::{FieldKind, FieldSpec, GeneratedComponent, MethodKind, MethodSpec, TypeKind, TypeSpec};
use crate::writing::switching::{Allocation, SwitchingProviders};

/// The number of statements in one `initialize{n}` method.
pub const STATEMENTS_PER_INITIALIZE_METHOD: usize = 100;

/// A framework field: one binding key held as a provider or a producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FrameworkFieldKey {
    pub(crate) binding_key: BindingKey,
    pub(crate) framework: FrameworkType,
}

/// The implementation of one component: what has been allocated so far, and the statements its
/// constructor runs.
///
/// Fields and methods are added as expressions are requested; the model is turned into a
/// [`GeneratedComponent`] once the component and its subcomponents are written.
#[derive(Debug)]
pub(crate) struct ComponentImplementation {
    graph: Arc<BindingGraph>,
    ident: Ident,
    parent: Option<Ident>,
    names: UniqueNameSet,
    fields: Vec<FieldSpec>,
    methods: Vec<Option<MethodSpec>>,
    types: Vec<TypeSpec>,
    initializations: Vec<TokenStream>,
    requirement_fields: Vec<(ComponentRequirement, Ident)>,
    expressions: HashMap<BindingRequest, BindingExpression>,
    component_methods: HashMap<(BindingKey, RequestKind), Ident>,
    pub(crate) field_states: FieldStates<FrameworkFieldKey>,
    pub(crate) switching: SwitchingProviders,
}

impl ComponentImplementation {
    pub(crate) fn new(graph: Arc<BindingGraph>, parent: Option<Ident>) -> Self {
        let component = graph.component();
        let component_ident = component.name.simple_ident();
        let mut names = UniqueNameSet::default();
        names.claim("this");
        names.claim("parent");
        names.claim("new");

        let mut component_methods = HashMap::new();
        for method in &component.methods {
            names.claim(&method.name);
            if let ComponentMethodKind::EntryPoint { request, .. } = &method.kind {
                component_methods
                    .entry((request.binding_key(), request.kind))
                    .or_insert_with(|| ident(&method.name));
            }
        }

        let requirement_fields = graph
            .component_requirements()
            .iter()
            .map(|requirement| (requirement.clone(), names.unique_ident(&requirement.name)))
            .collect();

        Self {
            graph,
            ident: component_ident,
            parent,
            names,
            fields: Vec::new(),
            methods: Vec::new(),
            types: Vec::new(),
            initializations: Vec::new(),
            requirement_fields,
            expressions: HashMap::new(),
            component_methods,
            field_states: FieldStates::default(),
            switching: SwitchingProviders::default(),
        }
    }

    pub(crate) const fn graph(&self) -> &Arc<BindingGraph> {
        &self.graph
    }

    /// The name of the generated struct.
    pub(crate) const fn ident(&self) -> &Ident {
        &self.ident
    }

    /// Claims a unique name derived from `base`.
    pub(crate) fn unique_name(&mut self, base: &str) -> Ident {
        self.names.unique_ident(base)
    }

    /// The expression selected for `request`, if any.
    pub(crate) fn expression(&self, request: &BindingRequest) -> Option<&BindingExpression> {
        self.expressions.get(request)
    }

    pub(crate) fn set_expression(&mut self, request: BindingRequest, expression: BindingExpression) {
        let previous = self.expressions.insert(request, expression);
        assert!(previous.is_none(), "internal error: binding expression selected twice");
    }

    /// The first component method implementing `(binding_key, kind)`, in declaration order.
    pub(crate) fn component_method(&self, binding_key: &BindingKey, kind: RequestKind) -> Option<&Ident> {
        self.component_methods.get(&(binding_key.clone(), kind))
    }

    /// The field holding `requirement`, if this component holds it.
    pub(crate) fn requirement_field(&self, requirement: &ComponentRequirement) -> Option<&Ident> {
        self.requirement_fields
            .iter()
            .find(|(held, _)| held.kind == requirement.kind && held.ty == requirement.ty && held.key == requirement.key)
            .map(|(_, field)| field)
    }

    /// The field holding the instance of `module`, if this component holds it.
    pub(crate) fn module_field(&self, module: &crate::types::TypeName) -> Option<&Ident> {
        self.requirement_fields
            .iter()
            .find(|(held, _)| held.kind == RequirementKind::Module && held.ty.name() == Some(module))
            .map(|(_, field)| field)
    }

    /// The requirements passed to the constructor, with their fields.
    pub(crate) fn requirements(&self) -> &[(ComponentRequirement, Ident)] {
        &self.requirement_fields
    }

    pub(crate) fn add_field(&mut self, kind: FieldKind, name: &Ident, ty: TokenStream, init: TokenStream) {
        self.fields.push(FieldSpec {
            kind,
            name: name.to_string(),
            ty,
            init,
        });
    }

    /// Reserves a method slot, so that the method can be referenced while its body is written.
    pub(crate) fn reserve_method(&mut self) -> usize {
        self.methods.push(None);
        self.methods.len() - 1
    }

    pub(crate) fn set_method(&mut self, slot: usize, kind: MethodKind, name: &Ident, tokens: TokenStream) {
        let method = &mut self.methods[slot];
        assert!(method.is_none(), "internal error: method {name} written twice");
        *method = Some(MethodSpec {
            kind,
            name: name.to_string(),
            tokens,
        });
    }

    pub(crate) fn add_method(&mut self, kind: MethodKind, name: &Ident, tokens: TokenStream) {
        let slot = self.reserve_method();
        self.set_method(slot, kind, name, tokens);
    }

    pub(crate) fn add_type(&mut self, kind: TypeKind, name: &Ident, tokens: TokenStream) {
        self.types.push(TypeSpec {
            kind,
            name: name.to_string(),
            tokens,
        });
    }

    /// Allocates a switching-provider id for `binding_key`.
    pub(crate) fn allocate_switching(&mut self, binding_key: &BindingKey) -> Allocation {
        let Self { ident, switching, .. } = self;
        switching.allocate(binding_key, |index| format_ident!("{}SwitchingProviders{}", ident, index))
    }

    /// Appends a statement to the constructor's initialization.
    pub(crate) fn add_initialization(&mut self, statement: TokenStream) {
        self.initializations.push(statement);
    }

    /// Writes the constructor and its `initialize{n}` methods, then returns the finished model.
    pub(crate) fn finish(mut self, subcomponents: Vec<GeneratedComponent>) -> GeneratedComponent {
        let chunks: Vec<Vec<TokenStream>> = self
            .initializations
            .chunks(STATEMENTS_PER_INITIALIZE_METHOD)
            .map(<[TokenStream]>::to_vec)
            .collect();
        let initialize: Vec<Ident> = (0..chunks.len())
            .map(|index| self.names.unique_ident(&format!("initialize{index}")))
            .collect();

        self.write_constructor(&initialize);
        for (name, statements) in initialize.iter().zip(chunks) {
            self.add_method(
                MethodKind::Initialize,
                name,
                quote! {
                    fn #name(&self) {
                        #(#statements)*
                    }
                },
            );
        }
        for (name, tokens) in self.switching.render(&self.ident) {
            self.add_type(TypeKind::SwitchingProviders, &name, tokens);
        }

        let delegated_fields = self
            .field_states
            .delegated()
            .iter()
            .filter_map(|key| self.framework_field_name(key))
            .collect();
        let mut methods: Vec<MethodSpec> = self
            .methods
            .into_iter()
            .map(|method| method.unwrap_or_else(|| unreachable!("internal error: reserved method never written")))
            .collect();
        methods.sort_by_key(|method| method.kind);

        GeneratedComponent {
            name: self.graph.component().name.clone(),
            fields: self.fields,
            methods,
            types: self.types,
            subcomponents,
            delegated_fields,
        }
    }

    fn framework_field_name(&self, key: &FrameworkFieldKey) -> Option<String> {
        let request = BindingRequest::new(key.binding_key.clone(), key.framework.request_kind());
        match self.expressions.get(&request) {
            Some(BindingExpression::FrameworkField { field, .. }) => Some(field.to_string()),
            _ => None,
        }
    }

    fn write_constructor(&mut self, initialize: &[Ident]) {
        let mut fields = vec![quote!(this: ::std::sync::Weak::clone(this))];
        let mut declarations = vec![FieldSpec {
            kind: FieldKind::Component,
            name: "this".to_string(),
            ty: quote!(::std::sync::Weak<Self>),
            init: TokenStream::new(),
        }];
        let mut params = Vec::new();

        if let Some(parent) = &self.parent {
            fields.push(quote!(parent));
            params.push(quote!(parent: ::std::sync::Arc<#parent>));
            declarations.push(FieldSpec {
                kind: FieldKind::Parent,
                name: "parent".to_string(),
                ty: quote!(::std::sync::Arc<#parent>),
                init: TokenStream::new(),
            });
        }
        for (requirement, field) in &self.requirement_fields {
            let ty = requirement.ty.to_type_tokens();
            fields.push(quote!(#field));
            params.push(quote!(#field: #ty));
            declarations.push(FieldSpec {
                kind: FieldKind::Requirement,
                name: field.to_string(),
                ty,
                init: TokenStream::new(),
            });
        }
        for field in &self.fields {
            let name = format_ident!("{}", field.name);
            let init = &field.init;
            fields.push(quote!(#name: #init));
        }
        declarations.append(&mut self.fields);
        self.fields = declarations;

        self.add_method(
            MethodKind::Constructor,
            &format_ident!("new"),
            quote! {
                fn new(#(#params),*) -> ::std::sync::Arc<Self> {
                    let component = ::std::sync::Arc::new_cyclic(|this| Self {
                        #(#fields,)*
                    });
                    #(component.#initialize();)*
                    component
                }
            },
        );
    }
}

/// The name of the field or method for `binding_key`, without a suffix.
pub(crate) fn base_name(binding_key: &BindingKey) -> String {
    match binding_key {
        BindingKey::Contribution(key) => {
            let mut base = crate::naming::key_base_name(key);
            if let Some(contribution) = key.contribution() {
                base = snake_case(&format!("{base}_{}", contribution.method));
            }
            base
        }
        BindingKey::MembersInjection(key) => crate::naming::key_base_name(key),
    }
}
