// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The finished implementation model handed to the emitter.

use proc_macro2::TokenStream;
use quote::quote;

use crate::types::TypeName;

/// What a field of a generated component holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// The weak handle to the component itself.
    Component,
    /// The parent component of a subcomponent.
    Parent,
    /// A module instance, dependency or bound instance.
    Requirement,
    /// A provider or producer slot.
    Framework,
    /// A memoized scoped value.
    Memoized,
}

/// A field of a generated component.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// What the field holds.
    pub kind: FieldKind,
    /// The field name.
    pub name: String,
    /// The field type.
    pub ty: TokenStream,
    /// The value assigned when the component is constructed.
    pub init: TokenStream,
}

/// The role of a generated method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodKind {
    /// Static functions that create the component.
    Creation,
    /// The constructor.
    Constructor,
    /// A chunk of field initializations, called by the constructor.
    Initialize,
    /// A method declared by the component.
    ComponentMethod,
    /// A private accessor for a value.
    PrivateMethod,
    /// A private method that injects members.
    MembersInjection,
}

/// A method of a generated component.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// The role of the method.
    pub kind: MethodKind,
    /// The method name.
    pub name: String,
    /// The complete method item.
    pub tokens: TokenStream,
}

/// The role of a generated type next to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The builder that creates the component.
    Creator,
    /// A switching-provider dispatch type.
    SwitchingProviders,
}

/// A type generated alongside a component.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// The role of the type.
    pub kind: TypeKind,
    /// The type name.
    pub name: String,
    /// The type's items.
    pub tokens: TokenStream,
}

/// The generated implementation of one component and its subcomponents.
#[derive(Debug, Clone)]
pub struct GeneratedComponent {
    pub(crate) name: TypeName,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) methods: Vec<MethodSpec>,
    pub(crate) types: Vec<TypeSpec>,
    pub(crate) subcomponents: Vec<Self>,
    pub(crate) delegated_fields: Vec<String>,
}

impl GeneratedComponent {
    /// The implemented component.
    #[must_use]
    pub const fn name(&self) -> &TypeName {
        &self.name
    }

    /// The fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The field named `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    /// The methods with the given role.
    pub fn methods_of_kind(&self, kind: MethodKind) -> impl Iterator<Item = &MethodSpec> {
        self.methods.iter().filter(move |method| method.kind == kind)
    }

    /// The method named `name`.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// The types generated alongside the component.
    #[must_use]
    pub fn types(&self) -> &[TypeSpec] {
        &self.types
    }

    /// The directly nested subcomponents.
    #[must_use]
    pub fn subcomponents(&self) -> &[Self] {
        &self.subcomponents
    }

    /// The nested subcomponent implementing `name`.
    #[must_use]
    pub fn subcomponent(&self, name: &TypeName) -> Option<&Self> {
        self.subcomponents.iter().find(|subcomponent| &subcomponent.name == name)
    }

    /// The framework fields that were delegated to break an initialization cycle.
    #[must_use]
    pub fn delegated_fields(&self) -> &[String] {
        &self.delegated_fields
    }

    /// Renders the component, its generated types and every nested subcomponent.
    #[must_use]
    pub fn to_token_stream(&self) -> TokenStream {
        let mut tokens = quote! {
            #[allow(unused_imports)]
            use ::thicket::{MembersInjector as _, Producer as _, Provider as _};
        };
        self.render_into(&mut tokens);
        tokens
    }

    /// Renders the component as formatted source.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendered tokens are not a valid Rust file, which means a declared
    /// name is not a valid Rust path.
    pub fn to_source(&self) -> Result<String, syn::Error> {
        let file: syn::File = syn::parse2(self.to_token_stream())?;
        Ok(prettyplease::unparse(&file))
    }

    fn render_into(&self, tokens: &mut TokenStream) {
        let ident = self.name.simple_ident();
        let fields = self.fields.iter().map(|field| {
            let name = quote::format_ident!("{}", field.name);
            let ty = &field.ty;
            quote!(#name: #ty)
        });
        let methods = self.methods.iter().map(|method| &method.tokens);
        let types = self.types.iter().map(|ty| &ty.tokens);
        tokens.extend(quote! {
            pub struct #ident {
                #(#fields,)*
            }

            impl #ident {
                #(#methods)*
            }

            #(#types)*
        });
        for subcomponent in &self.subcomponents {
            subcomponent.render_into(tokens);
        }
    }
}
