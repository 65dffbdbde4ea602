// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Switching providers: many provider requests served by a few shared dispatch types.
//!
//! Each binding routed through a switching provider gets an id in a dispatch type. A dispatch
//! type matches on `id / 100` to pick one of its `get{n}` functions, each of which matches on the
//! id with at most 100 arms. A dispatch type takes at most 10,000 ids; the next binding starts a
//! new dispatch type.
//!
//! A dispatch type instance is created with every switching provider and holds a
//! `::thicket::ComponentHandle` to the component.

use std::collections::HashMap;

use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};
use tracing::{Level, event};

use crate::request::BindingKey;

/// The maximum number of arms in one `match` of a dispatch type.
pub const MAX_CASES_PER_SWITCH: usize = 100;

/// The maximum number of ids served by one dispatch type.
pub const MAX_CASES_PER_TYPE: usize = 10_000;

/// Where a binding lives in the switching providers of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Allocation {
    /// The index of the dispatch type.
    pub(crate) dispatch: usize,
    /// The id within the dispatch type.
    pub(crate) id: usize,
    /// Whether the allocation started a new dispatch type.
    pub(crate) new_type: bool,
}

#[derive(Debug)]
struct DispatchType {
    name: Ident,
    cases: Vec<Option<TokenStream>>,
}

/// The switching providers of one component.
#[derive(Debug, Default)]
pub(crate) struct SwitchingProviders {
    types: Vec<DispatchType>,
    ids: HashMap<BindingKey, (usize, usize)>,
}

impl SwitchingProviders {
    /// Returns the existing allocation of `binding_key`, if any.
    pub(crate) fn get(&self, binding_key: &BindingKey) -> Option<(usize, usize)> {
        self.ids.get(binding_key).copied()
    }

    /// Allocates an id for `binding_key`, naming a new dispatch type with `name_type` if the last
    /// one is full.
    ///
    /// The case body is set later with [`set_case`](Self::set_case), because computing it may
    /// request more switching providers.
    pub(crate) fn allocate(
        &mut self,
        binding_key: &BindingKey,
        name_type: impl FnOnce(usize) -> Ident,
    ) -> Allocation {
        if let Some((dispatch, id)) = self.get(binding_key) {
            return Allocation {
                dispatch,
                id,
                new_type: false,
            };
        }
        let new_type = self
            .types
            .last()
            .is_none_or(|last| last.cases.len() >= MAX_CASES_PER_TYPE);
        if new_type {
            let name = name_type(self.types.len());
            event!(Level::DEBUG, dispatch_type = %name, "allocating switching provider type");
            self.types.push(DispatchType {
                name,
                cases: Vec::new(),
            });
        }
        let dispatch = self.types.len() - 1;
        let cases = &mut self.types[dispatch].cases;
        let id = cases.len();
        cases.push(None);
        self.ids.insert(binding_key.clone(), (dispatch, id));
        Allocation { dispatch, id, new_type }
    }

    /// Sets the expression constructing the instance for `id`.
    pub(crate) fn set_case(&mut self, dispatch: usize, id: usize, body: TokenStream) {
        let case = &mut self.types[dispatch].cases[id];
        assert!(case.is_none(), "internal error: switching provider {id} is already implemented");
        *case = Some(body);
    }

    /// The name of dispatch type `dispatch`.
    pub(crate) fn name(&self, dispatch: usize) -> &Ident {
        &self.types[dispatch].name
    }

    /// The number of dispatch types.
    pub(crate) fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Renders every dispatch type of `component`.
    pub(crate) fn render(&self, component: &Ident) -> Vec<(Ident, TokenStream)> {
        self.types
            .iter()
            .map(|dispatch| (dispatch.name.clone(), render_type(dispatch, component)))
            .collect()
    }
}

fn render_type(dispatch: &DispatchType, component: &Ident) -> TokenStream {
    let name = &dispatch.name;
    let switches: Vec<Ident> = (0..dispatch.cases.len().div_ceil(MAX_CASES_PER_SWITCH))
        .map(|index| format_ident!("get{}", index))
        .collect();
    let arms = switches.iter().enumerate().map(|(index, switch)| {
        quote!(#index => Self::#switch(&component, id),)
    });
    let functions = dispatch
        .cases
        .chunks(MAX_CASES_PER_SWITCH)
        .zip(&switches)
        .enumerate()
        .map(|(index, (cases, switch))| {
            let cases = cases.iter().enumerate().map(|(offset, body)| {
                let id = index * MAX_CASES_PER_SWITCH + offset;
                let Some(body) = body else {
                    unreachable!("internal error: switching provider {id} of {name} was never implemented")
                };
                quote!(#id => ::std::boxed::Box::new(#body),)
            });
            quote! {
                fn #switch(component: &#component, id: usize) -> ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send> {
                    match id {
                        #(#cases)*
                        _ => unreachable!("unknown switching provider id {id}"),
                    }
                }
            }
        });
    let max_cases = Literal::usize_unsuffixed(MAX_CASES_PER_SWITCH);
    quote! {
        struct #name {
            component: ::thicket::ComponentHandle<#component>,
        }

        impl ::thicket::Dispatch for #name {
            fn dispatch(&self, id: usize) -> ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send> {
                let component = self.component.component();
                match id / #max_cases {
                    #(#arms)*
                    _ => unreachable!("unknown switching provider id {id}"),
                }
            }
        }

        impl #name {
            #(#functions)*
        }
    }
}

#[cfg(test)]
mod tests {
    use proc_macro2::Span;

    use super::*;
    use crate::key::Key;
    use crate::types::TypeRef;

    fn dispatch_type_name(component: &Ident, index: usize) -> Ident {
        format_ident!("{}SwitchingProviders{}", component, index)
    }

    fn key(index: usize) -> BindingKey {
        BindingKey::Contribution(Key::new(TypeRef::declared(format!("crate::Binding{index}"))))
    }

    fn fill(count: usize) -> SwitchingProviders {
        let component = Ident::new("App", Span::call_site());
        let mut providers = SwitchingProviders::default();
        for index in 0..count {
            let allocation = providers.allocate(&key(index), |n| dispatch_type_name(&component, n));
            providers.set_case(allocation.dispatch, allocation.id, quote!(#index));
        }
        providers
    }

    #[test]
    fn ids_are_stable() {
        let component = Ident::new("App", Span::call_site());
        let mut providers = SwitchingProviders::default();

        let first = providers.allocate(&key(0), |n| dispatch_type_name(&component, n));
        let again = providers.allocate(&key(0), |n| dispatch_type_name(&component, n));

        assert!(first.new_type);
        assert_eq!(again, Allocation { dispatch: 0, id: 0, new_type: false });
    }

    #[test]
    fn full_type_starts_another() {
        let providers = fill(MAX_CASES_PER_TYPE + 1);

        assert_eq!(providers.type_count(), 2);
        assert_eq!(providers.get(&key(MAX_CASES_PER_TYPE)), Some((1, 0)));
    }

    #[test]
    fn switches_hold_at_most_one_hundred_cases() {
        let component = Ident::new("App", Span::call_site());
        let providers = fill(250);

        let rendered = providers.render(&component);
        let source = rendered[0].1.to_string();

        assert_eq!(rendered.len(), 1);
        assert!(source.contains("fn get2"));
        assert!(!source.contains("fn get3"));
    }

    #[test]
    fn dispatch_type_reaches_the_component_through_a_handle() {
        let component = Ident::new("App", Span::call_site());
        let providers = fill(1);

        let rendered = providers.render(&component);
        let source: String = rendered[0].1.to_string().split_whitespace().collect();

        assert_eq!(providers.name(0), "AppSwitchingProviders0");
        assert!(source.contains("component:::thicket::ComponentHandle<App>"), "{source}");
        assert!(source.contains("letcomponent=self.component.component();"), "{source}");
        assert!(!source.contains("Weak"), "{source}");
    }

    #[test]
    #[should_panic(expected = "already implemented")]
    fn case_is_set_once() {
        let mut providers = fill(1);
        providers.set_case(0, 0, quote!(1));
    }
}
