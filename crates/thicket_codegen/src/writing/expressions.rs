// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binding expressions: how each request for a binding is written, and from where.

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use crate::request::{BindingKey, FrameworkType, RequestKind};

/// A request for a binding key in one request kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingRequest {
    /// The requested binding key.
    pub binding_key: BindingKey,
    /// How the value is requested.
    pub kind: RequestKind,
}

impl BindingRequest {
    pub(crate) const fn new(binding_key: BindingKey, kind: RequestKind) -> Self {
        Self { binding_key, kind }
    }

    pub(crate) fn framework(&self, framework: FrameworkType) -> Self {
        Self::new(self.binding_key.clone(), framework.request_kind())
    }
}

/// The path from the code being written to a component instance.
///
/// Expressions of ancestor-owned bindings are reached through the `parent` field of each
/// subcomponent in between.
///
/// Code whose values the component stores in its own fields reaches the component weakly. Any
/// other code hands its values out, and these hold the component strongly.
#[derive(Debug, Clone)]
pub(crate) struct Receiver {
    tokens: TokenStream,
    stored: bool,
}

impl Receiver {
    /// `self` inside a method of the component.
    pub(crate) fn this() -> Self {
        Self {
            tokens: quote!(self),
            stored: false,
        }
    }

    /// `self` inside an initializer of one of the component's own fields.
    pub(crate) fn field_initializer() -> Self {
        Self {
            tokens: quote!(self),
            stored: true,
        }
    }

    /// The `component` parameter of a switching-provider dispatch function.
    pub(crate) fn dispatch() -> Self {
        Self {
            tokens: quote!(component),
            stored: false,
        }
    }

    /// The receiver `hops` components up the parent chain.
    pub(crate) fn ancestor(&self, hops: usize) -> Self {
        let mut tokens = self.tokens.clone();
        for _ in 0..hops {
            tokens = quote!(#tokens.parent);
        }
        Self {
            tokens,
            stored: self.stored,
        }
    }

    pub(crate) const fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    /// Whether values written from this receiver are stored in the component's own fields.
    pub(crate) const fn is_stored(&self) -> bool {
        self.stored
    }

    /// A `::thicket::ComponentHandle` to the component, weak when values are stored in it.
    pub(crate) fn handle(&self) -> TokenStream {
        let receiver = &self.tokens;
        if self.stored {
            quote!(::thicket::ComponentHandle::weak(&#receiver.this))
        } else {
            quote!(::thicket::ComponentHandle::strong(&#receiver.this))
        }
    }
}

/// How an expression for a [`BindingRequest`] is written.
///
/// One expression is selected per request in the component that owns the binding, and reused for
/// every later request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingExpression {
    /// The creation expression, written out at every use.
    Inline,
    /// A call to a private method that returns the creation expression.
    PrivateMethod {
        /// The method.
        method: Ident,
    },
    /// A call to a component method that implements the same request.
    ComponentMethod {
        /// The method.
        method: Ident,
    },
    /// A call to a private method that memoizes the value in a field.
    MemoizedMethod {
        /// The method.
        method: Ident,
    },
    /// A field holding the binding's provider or producer.
    FrameworkField {
        /// The field.
        field: Ident,
        /// Whether the field holds a provider or a producer.
        framework: FrameworkType,
    },
    /// A provider or producer created at every use.
    InlineFramework {
        /// Whether a provider or producer is created.
        framework: FrameworkType,
    },
    /// A provider that routes through a shared dispatch type.
    SwitchingProvider {
        /// The dispatch type.
        dispatch: Ident,
        /// The binding's id within the dispatch type.
        id: usize,
    },
    /// Derived from the provider or producer of the same binding.
    DerivedFromFramework {
        /// The framework instance the value is derived from.
        framework: FrameworkType,
    },
    /// A call to a private method that injects members.
    MembersInjection {
        /// The method.
        method: Ident,
    },
}

impl BindingExpression {
    /// The expression for a value from `receiver`, for strategies that do not need the creation
    /// expression or another framework instance.
    ///
    /// Returns `None` for [`Inline`](Self::Inline), [`InlineFramework`](Self::InlineFramework)
    /// and [`DerivedFromFramework`](Self::DerivedFromFramework), which the writer composes.
    pub(crate) fn dependency_expression(&self, receiver: &Receiver, value_type: &TokenStream) -> Option<TokenStream> {
        let tokens = receiver.tokens();
        match self {
            Self::PrivateMethod { method } | Self::ComponentMethod { method } | Self::MemoizedMethod { method } => {
                Some(quote!(#tokens.#method()))
            }
            Self::FrameworkField { field, .. } => Some(quote!(::std::sync::Arc::clone(#tokens.#field.get()))),
            Self::SwitchingProvider { dispatch, id } => {
                let handle = receiver.handle();
                Some(quote! {
                    ::thicket::SwitchingProvider::<#value_type>::create(
                        ::std::sync::Arc::new(#dispatch { component: #handle }),
                        #id,
                    )
                })
            }
            Self::MembersInjection { .. } => {
                unreachable!("internal error: members injection is a statement, not an expression")
            }
            Self::Inline | Self::InlineFramework { .. } | Self::DerivedFromFramework { .. } => None,
        }
    }

    /// Derives a request of `kind` from the framework instance `framework`.
    pub(crate) fn derive(kind: RequestKind, framework: FrameworkType, instance: TokenStream) -> TokenStream {
        match (framework, kind) {
            (FrameworkType::Provider, RequestKind::Instance) => quote!(#instance.get()),
            (FrameworkType::Provider, RequestKind::Lazy) => quote!(::thicket::Lazy::new(#instance)),
            (FrameworkType::Provider, RequestKind::ProviderOfLazy) => quote!(::thicket::ProviderOfLazy::create(#instance)),
            (FrameworkType::Provider, RequestKind::Producer) => quote!(::thicket::producer_from_provider(#instance)),
            (FrameworkType::Producer, RequestKind::Future) => quote!(#instance.get()),
            (framework, kind) => {
                unreachable!("internal error: {kind:?} cannot be derived from a {framework:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proc_macro2::Span;

    use super::*;

    fn squash(tokens: &TokenStream) -> String {
        tokens.to_string().split_whitespace().collect()
    }

    #[test]
    fn ancestor_receiver_walks_parents() {
        let receiver = Receiver::this().ancestor(2);

        assert_eq!(squash(receiver.tokens()), squash(&quote!(self.parent.parent)));
    }

    #[test]
    fn methods_are_called_on_the_receiver() {
        let expression = BindingExpression::PrivateMethod {
            method: Ident::new("get_clock", Span::call_site()),
        };

        let tokens = expression
            .dependency_expression(&Receiver::dispatch(), &quote!(crate::Clock))
            .expect("methods are plain calls");

        assert_eq!(squash(&tokens), squash(&quote!(component.get_clock())));
    }

    #[test]
    fn handed_out_switching_provider_holds_the_component() {
        let expression = BindingExpression::SwitchingProvider {
            dispatch: Ident::new("AppSwitchingProviders0", Span::call_site()),
            id: 7,
        };

        let tokens = expression
            .dependency_expression(&Receiver::this(), &quote!(crate::Clock))
            .expect("switching providers are plain calls");

        assert_eq!(
            squash(&tokens),
            squash(&quote!(::thicket::SwitchingProvider::<crate::Clock>::create(
                ::std::sync::Arc::new(AppSwitchingProviders0 {
                    component: ::thicket::ComponentHandle::strong(&self.this)
                }),
                7usize,
            )))
        );
    }

    #[test]
    fn stored_switching_provider_holds_the_component_weakly() {
        let expression = BindingExpression::SwitchingProvider {
            dispatch: Ident::new("AppSwitchingProviders0", Span::call_site()),
            id: 0,
        };

        let tokens = expression
            .dependency_expression(&Receiver::field_initializer().ancestor(1), &quote!(crate::Clock))
            .expect("switching providers are plain calls");

        assert!(
            squash(&tokens).contains("component:::thicket::ComponentHandle::weak(&self.parent.this)"),
            "{tokens}"
        );
    }

    #[test]
    fn lazy_is_derived_from_provider() {
        let tokens = BindingExpression::derive(RequestKind::Lazy, FrameworkType::Provider, quote!(provider));

        assert_eq!(squash(&tokens), squash(&quote!(::thicket::Lazy::new(provider))));
    }
}
