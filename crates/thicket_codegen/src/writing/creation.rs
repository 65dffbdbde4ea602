// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expressions that create a binding's value from its dependencies.

use std::sync::Arc;

use proc_macro2::TokenStream;
use quote::quote;

use crate::binding::{Binding, BindingElement, BindingKind, ContributionType, InjectionSite, InjectionSiteKind};
use crate::descriptor::ComponentRequirement;
use crate::naming::ident;
use crate::request::{DependencyRequest, RequestKind};
use crate::types::{TypeName, TypeRef, well_known};

/// Where a creation expression is written, and how it reaches what it needs.
///
/// Inside a component method the component is borrowed as `self`; inside a provider or producer
/// closure every dependency is captured first.
pub(crate) trait CreationContext {
    /// The expression for `request`.
    fn dependency(&mut self, request: &DependencyRequest) -> TokenStream;

    /// A place expression holding `requirement`.
    fn requirement(&mut self, requirement: &ComponentRequirement) -> TokenStream;

    /// A place expression holding the instance of `module`.
    fn module(&mut self, module: &TypeName) -> TokenStream;

    /// An `Arc` of the component that owns the binding.
    fn component(&mut self) -> TokenStream;

    /// The binding resolved for a dependency.
    fn resolved(&self, request: &DependencyRequest) -> Arc<Binding>;

    /// A members injector closure for `binding`.
    fn members_injector(&mut self, binding: &Binding) -> TokenStream;
}

/// The type of the value a binding creates.
///
/// Multibinding contributions create one element or entry of their collection rather than the
/// collection itself.
pub(crate) fn value_type(binding: &Binding) -> TypeRef {
    let ty = binding.key.ty();
    let value = match binding.contribution_type {
        ContributionType::Set => ty.as_set(),
        ContributionType::Map => ty.as_map().map(|(_, value)| {
            value
                .unwrap_in(well_known::PROVIDER)
                .or_else(|| value.unwrap_in(well_known::PRODUCER))
                .unwrap_or(value)
        }),
        ContributionType::Unique | ContributionType::SetValues => None,
    };
    value.unwrap_or(ty).clone()
}

/// The expression creating the value of `binding`.
pub(crate) fn creation_expression(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    match binding.kind {
        BindingKind::Injection => injection(binding, cx),
        BindingKind::Provision | BindingKind::Production => module_method(binding, cx),
        BindingKind::Component => cx.component(),
        BindingKind::ComponentDependency | BindingKind::BoundInstance => {
            let Some(BindingElement::Requirement(requirement)) = &binding.element else {
                unreachable!("internal error: {binding} is not backed by a requirement")
            };
            let place = cx.requirement(requirement);
            quote!(::std::clone::Clone::clone(&#place))
        }
        BindingKind::ComponentProvision | BindingKind::ComponentProduction => {
            let Some(BindingElement::DependencyMethod { dependency, method }) = &binding.element else {
                unreachable!("internal error: {binding} is not a dependency method")
            };
            let place = cx.requirement(dependency);
            let method = ident(method);
            if binding.kind == BindingKind::ComponentProduction {
                quote!(#place.#method().await?)
            } else {
                quote!(#place.#method())
            }
        }
        BindingKind::SubcomponentCreator => {
            let Some(BindingElement::SubcomponentCreator { creator, .. }) = &binding.element else {
                unreachable!("internal error: {binding} is not a subcomponent creator")
            };
            let creator = creator.simple_ident();
            let component = cx.component();
            quote!(#creator::new(#component))
        }
        BindingKind::Delegate => delegate(binding, cx),
        BindingKind::MultiboundSet => set(binding, cx),
        BindingKind::MultiboundMap => map(binding, cx),
        BindingKind::Optional => match binding.dependencies.first() {
            Some(request) => {
                let value = cx.dependency(request);
                quote!(::std::option::Option::Some(#value))
            }
            None => quote!(::std::option::Option::None),
        },
        BindingKind::MembersInjector => cx.members_injector(binding),
        BindingKind::MembersInjection => {
            unreachable!("internal error: members injection of {} has no value", binding.key)
        }
    }
}

fn arguments(requests: &[DependencyRequest], cx: &mut dyn CreationContext) -> Vec<TokenStream> {
    requests.iter().map(|request| cx.dependency(request)).collect()
}

fn injection(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    let Some(BindingElement::Constructor { name, .. }) = &binding.element else {
        unreachable!("internal error: {binding} has no injection constructor")
    };
    let ty = binding.key.ty().to_type_tokens();
    let constructor = ident(name);
    let args = arguments(&binding.dependencies, cx);
    let construct = quote!(<#ty>::#constructor(#(#args),*));
    if binding.injection_sites.is_empty() {
        return construct;
    }
    let sites = injection_site_statements(&binding.injection_sites, &quote!(instance), cx);
    quote!({
        let mut instance = #construct;
        #(#sites)*
        instance
    })
}

/// Statements injecting `sites` into the place `instance`.
pub(crate) fn injection_site_statements(
    sites: &[InjectionSite],
    instance: &TokenStream,
    cx: &mut dyn CreationContext,
) -> Vec<TokenStream> {
    sites
        .iter()
        .map(|site| {
            let name = ident(&site.name);
            let args = arguments(&site.dependencies, cx);
            match site.kind {
                InjectionSiteKind::Field => quote!(#instance.#name = #(#args)*;),
                InjectionSiteKind::Method => quote!(#instance.#name(#(#args),*);),
            }
        })
        .collect()
}

fn module_method(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    let Some(BindingElement::ModuleMethod {
        module,
        method,
        is_static,
        returns_future,
    }) = &binding.element
    else {
        unreachable!("internal error: {binding} is not declared by a module method")
    };
    let method = ident(method);
    let args = arguments(&binding.dependencies, cx);
    let call = if *is_static {
        let module = module.path_tokens();
        quote!(<#module>::#method(#(#args),*))
    } else {
        let place = cx.module(module);
        quote!(#place.#method(#(#args),*))
    };
    if *returns_future {
        quote!(#call.await?)
    } else {
        call
    }
}

fn delegate(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    let Some(request) = binding.dependencies.first() else {
        unreachable!("internal error: {binding} delegates to nothing")
    };
    let target = cx.dependency(request);
    if request.kind != RequestKind::Instance {
        return target;
    }
    let ty = value_type(binding).to_type_tokens();
    quote!({
        let value: #ty = #target;
        value
    })
}

/// The request for one contribution, asking for `Produced` results when the collection holds them.
fn contribution_request(request: &DependencyRequest, produced: bool) -> DependencyRequest {
    if produced && request.kind == RequestKind::Instance {
        DependencyRequest {
            kind: RequestKind::Produced,
            ..request.clone()
        }
    } else {
        request.clone()
    }
}

fn set(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    let produced = binding
        .key
        .ty()
        .as_set()
        .is_some_and(|element| element.is_wrapped_in(well_known::PRODUCED));
    let capacity = binding.dependencies.len();
    let additions: Vec<TokenStream> = binding
        .dependencies
        .iter()
        .map(|request| {
            if cx.resolved(request).contribution_type == ContributionType::SetValues {
                let values = cx.dependency(request);
                if produced {
                    quote!(.add_all(::std::iter::IntoIterator::into_iter(#values).map(::thicket::Produced::Successful)))
                } else {
                    quote!(.add_all(#values))
                }
            } else {
                let element = cx.dependency(&contribution_request(request, produced));
                quote!(.add(#element))
            }
        })
        .collect();
    quote!(::thicket::Set::builder(#capacity)#(#additions)*.build())
}

fn map(binding: &Binding, cx: &mut dyn CreationContext) -> TokenStream {
    let produced = binding
        .key
        .ty()
        .as_map()
        .is_some_and(|(_, value)| value.is_wrapped_in(well_known::PRODUCED));
    let capacity = binding.dependencies.len();
    let entries: Vec<TokenStream> = binding
        .dependencies
        .iter()
        .map(|request| {
            let contribution = cx.resolved(request);
            let Some(map_key) = &contribution.map_key else {
                unreachable!("internal error: map contribution {contribution} has no map key")
            };
            let key = &map_key.value;
            let value = cx.dependency(&contribution_request(request, produced));
            quote!(.put(#key, #value))
        })
        .collect();
    quote!(::thicket::Map::builder(#capacity)#(#entries)*.build())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::binding::BindingType;
    use crate::declarations::MapKey;
    use crate::key::{ContributionId, Key};

    /// Renders dependencies as their key's base name and records nothing else.
    struct Names;

    impl CreationContext for Names {
        fn dependency(&mut self, request: &DependencyRequest) -> TokenStream {
            let name = ident(&crate::naming::key_base_name(&request.key));
            match request.kind {
                RequestKind::Instance => quote!(#name),
                RequestKind::Produced => quote!(produced(#name)),
                _ => quote!(framework(#name)),
            }
        }

        fn requirement(&mut self, requirement: &ComponentRequirement) -> TokenStream {
            let name = ident(&requirement.name);
            quote!(self.#name)
        }

        fn module(&mut self, module: &TypeName) -> TokenStream {
            let name = ident(&crate::naming::snake_case(module.simple_name()));
            quote!(self.#name)
        }

        fn component(&mut self) -> TokenStream {
            quote!(component)
        }

        fn resolved(&self, request: &DependencyRequest) -> Arc<Binding> {
            let contribution = request.key.contribution().map(|id| id.method.to_string());
            let mut binding = Binding::new(BindingKind::Provision, BindingType::Provision, request.key.clone());
            binding.contribution_type = ContributionType::Map;
            binding.map_key = contribution.map(MapKey::str);
            Arc::new(binding)
        }

        fn members_injector(&mut self, _binding: &Binding) -> TokenStream {
            quote!(injector)
        }
    }

    fn squash(tokens: &TokenStream) -> String {
        tokens.to_string().split_whitespace().collect()
    }

    fn request(ty: &str) -> DependencyRequest {
        DependencyRequest::new(RequestKind::Instance, Key::new(TypeRef::declared(ty)))
    }

    #[test]
    fn constructor_with_injected_members() {
        let mut binding = Binding::new(
            BindingKind::Injection,
            BindingType::Provision,
            Key::new(TypeRef::declared("crate::Service")),
        );
        binding.element = Some(BindingElement::Constructor {
            class: TypeName::new("crate::Service"),
            name: Arc::from("new"),
        });
        binding.dependencies = vec![request("crate::Db")];
        binding.injection_sites = vec![InjectionSite {
            kind: InjectionSiteKind::Method,
            name: Arc::from("set_clock"),
            declaring_class: TypeName::new("crate::Service"),
            dependencies: vec![request("crate::Clock")],
        }];

        let tokens = creation_expression(&binding, &mut Names);

        assert_eq!(
            squash(&tokens),
            squash(&quote!({
                let mut instance = <crate::Service>::new(db);
                instance.set_clock(clock);
                instance
            }))
        );
    }

    #[test]
    fn instance_module_method_uses_the_module() {
        let mut binding = Binding::new(
            BindingKind::Provision,
            BindingType::Provision,
            Key::new(TypeRef::declared("crate::Db")),
        );
        binding.element = Some(BindingElement::ModuleMethod {
            module: TypeName::new("crate::DbModule"),
            method: Arc::from("db"),
            is_static: false,
            returns_future: false,
        });

        assert_eq!(
            squash(&creation_expression(&binding, &mut Names)),
            squash(&quote!(self.db_module.db()))
        );
    }

    #[test]
    fn map_entries_use_contribution_keys() {
        let handler = TypeRef::declared("crate::Handler");
        let map_key = Key::new(TypeRef::map_of(TypeRef::declared("String"), handler.clone()));
        let contribution = Key::new(TypeRef::map_of(
            TypeRef::declared("String"),
            handler.wrapped_in(well_known::PROVIDER),
        ))
        .with_contribution(ContributionId {
            module: TypeName::new("crate::Handlers"),
            method: Arc::from("admin"),
        });
        let mut binding = Binding::new(BindingKind::MultiboundMap, BindingType::Provision, map_key);
        binding.dependencies = vec![DependencyRequest::new(RequestKind::Instance, contribution)];

        let tokens = creation_expression(&binding, &mut Names);

        assert_eq!(
            squash(&tokens),
            squash(&quote!(::thicket::Map::builder(1usize)
                .put(::std::string::String::from("admin"), map_of_string_and_provider_of_handler)
                .build()))
        );
    }

    #[test]
    fn map_contribution_value_is_unwrapped() {
        let mut binding = Binding::new(
            BindingKind::Provision,
            BindingType::Provision,
            Key::new(TypeRef::map_of(
                TypeRef::declared("String"),
                TypeRef::declared("crate::Handler").wrapped_in(well_known::PROVIDER),
            )),
        );
        binding.contribution_type = ContributionType::Map;

        assert_eq!(value_type(&binding), TypeRef::declared("crate::Handler"));
    }

    #[test]
    fn absent_optional_is_none() {
        let binding = Binding::new(
            BindingKind::Optional,
            BindingType::Provision,
            Key::new(TypeRef::option_of(TypeRef::declared("crate::Db"))),
        );

        assert_eq!(
            squash(&creation_expression(&binding, &mut Names)),
            squash(&quote!(::std::option::Option::None))
        );
    }
}
