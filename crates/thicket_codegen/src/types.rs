// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The type model shared by declarations, keys and generated code.
//!
//! Types are plain values supplied by the front end. Names are fully qualified paths such as
//! `crate::db::Database` or `thicket::Provider`; [`TypeRef`] adds type arguments, primitives,
//! wildcards, type variables and types that are not available yet.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};

/// Fully qualified names of the types that carry meaning for binding resolution.
pub mod well_known {
    /// `thicket::Provider<T>`, requested as `Arc<dyn Provider<T>>`.
    pub const PROVIDER: &str = "thicket::Provider";
    /// `thicket::Lazy<T>`.
    pub const LAZY: &str = "thicket::Lazy";
    /// `thicket::Producer<T>`, requested as `Arc<dyn Producer<T>>`.
    pub const PRODUCER: &str = "thicket::Producer";
    /// `thicket::Produced<T>`.
    pub const PRODUCED: &str = "thicket::Produced";
    /// `thicket::ProducerFuture<T>`.
    pub const PRODUCER_FUTURE: &str = "thicket::ProducerFuture";
    /// `thicket::MembersInjector<T>`, requested as `Arc<dyn MembersInjector<T>>`.
    pub const MEMBERS_INJECTOR: &str = "thicket::MembersInjector";
    /// `thicket::Set<T>`.
    pub const SET: &str = "thicket::Set";
    /// `thicket::Map<K, V>`.
    pub const MAP: &str = "thicket::Map";
    /// `std::option::Option<T>`.
    pub const OPTION: &str = "std::option::Option";
    /// `std::sync::Arc<T>`.
    pub const ARC: &str = "std::sync::Arc";
    /// The scope whose bindings may be cached by any component.
    pub const REUSABLE: &str = "thicket::Reusable";
    /// The scope implicitly carried by every production component.
    pub const PRODUCTION_SCOPE: &str = "thicket::ProductionScope";

    /// Traits that are held behind `Arc<dyn _>` in generated code.
    pub(crate) const TRAIT_OBJECTS: [&str; 3] = [PROVIDER, PRODUCER, MEMBERS_INJECTOR];
}

/// A fully qualified type path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Creates a name from a `::` separated path.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    /// The full path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Iterates the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split("::")
    }

    /// The simple name as an identifier.
    #[must_use]
    pub fn simple_ident(&self) -> Ident {
        Ident::new(self.simple_name(), Span::call_site())
    }

    pub(crate) fn path_tokens(&self) -> TokenStream {
        let mut segments = self.segments().peekable();
        let relative = matches!(segments.peek(), Some(&("crate" | "self" | "super"))) || !self.0.contains("::");
        let idents = segments.map(|segment| Ident::new(segment, Span::call_site()));
        if relative {
            quote!(#(#idents)::*)
        } else {
            quote!(#(:: #idents)*)
        }
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[expect(missing_docs, reason = "variants are the scalar type names")]
pub enum Primitive {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
}

impl Primitive {
    /// The type's name in source code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// The declared (reference) form of this primitive, which keys are canonicalized to.
    #[must_use]
    pub fn boxed(self) -> TypeRef {
        TypeRef::declared(self.name())
    }
}

/// A declared type with its type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeclaredType {
    /// The type's path.
    pub name: TypeName,
    /// The type arguments, empty for non-generic types and for raw uses of generic types.
    pub args: Vec<TypeRef>,
}

/// A reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TypeRef {
    /// A struct, enum, trait object or alias, possibly generic.
    Declared(DeclaredType),
    /// A built-in scalar.
    Primitive(Primitive),
    /// An unconstrained type argument (`_`).
    Wildcard,
    /// A type parameter of the enclosing declaration.
    Variable(Arc<str>),
    /// A type that the front end could not resolve yet, for example because it is generated by
    /// another pass.
    Unavailable(TypeName),
}

impl TypeRef {
    /// A non-generic declared type.
    #[must_use]
    pub fn declared(name: impl AsRef<str>) -> Self {
        Self::generic(name, Vec::new())
    }

    /// A declared type with type arguments.
    #[must_use]
    pub fn generic(name: impl AsRef<str>, args: Vec<Self>) -> Self {
        Self::Declared(DeclaredType {
            name: TypeName::new(name),
            args,
        })
    }

    /// A type parameter.
    #[must_use]
    pub fn variable(name: impl AsRef<str>) -> Self {
        Self::Variable(Arc::from(name.as_ref()))
    }

    /// `wrapper<self>` for one of the single-argument framework types.
    #[must_use]
    pub fn wrapped_in(self, wrapper: &str) -> Self {
        Self::generic(wrapper, vec![self])
    }

    /// `thicket::Set<element>`.
    #[must_use]
    pub fn set_of(element: Self) -> Self {
        Self::generic(well_known::SET, vec![element])
    }

    /// `thicket::Map<key, value>`.
    #[must_use]
    pub fn map_of(key: Self, value: Self) -> Self {
        Self::generic(well_known::MAP, vec![key, value])
    }

    /// `std::option::Option<value>`.
    #[must_use]
    pub fn option_of(value: Self) -> Self {
        Self::generic(well_known::OPTION, vec![value])
    }

    /// The declared type, if this is one.
    #[must_use]
    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match self {
            Self::Declared(declared) => Some(declared),
            _ => None,
        }
    }

    /// The declared name, if this is a declared type.
    #[must_use]
    pub fn name(&self) -> Option<&TypeName> {
        self.as_declared().map(|declared| &declared.name)
    }

    /// The type arguments of a declared type.
    #[must_use]
    pub fn args(&self) -> &[Self] {
        self.as_declared().map_or(&[], |declared| declared.args.as_slice())
    }

    /// Returns `true` if this is `name<_>` with exactly one argument.
    #[must_use]
    pub fn is_wrapped_in(&self, name: &str) -> bool {
        self.unwrap_in(name).is_some()
    }

    /// Returns `T` if this is `name<T>`.
    #[must_use]
    pub fn unwrap_in(&self, name: &str) -> Option<&Self> {
        match self.as_declared() {
            Some(declared) if declared.name.as_str() == name && declared.args.len() == 1 => declared.args.first(),
            _ => None,
        }
    }

    /// The element type, if this is a parameterized `thicket::Set`.
    #[must_use]
    pub fn as_set(&self) -> Option<&Self> {
        self.unwrap_in(well_known::SET)
    }

    /// The key and value types, if this is a parameterized `thicket::Map`.
    #[must_use]
    pub fn as_map(&self) -> Option<(&Self, &Self)> {
        match self.as_declared() {
            Some(declared) if declared.name.as_str() == well_known::MAP => match declared.args.as_slice() {
                [key, value] => Some((key, value)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` for `thicket::Map` with or without type arguments.
    #[must_use]
    pub fn is_map(&self) -> bool {
        self.name().is_some_and(|name| name.as_str() == well_known::MAP)
    }

    /// Returns `true` for `thicket::Set` with or without type arguments.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.name().is_some_and(|name| name.as_str() == well_known::SET)
    }

    /// The value type, if this is `std::option::Option<T>`.
    #[must_use]
    pub fn as_optional(&self) -> Option<&Self> {
        self.unwrap_in(well_known::OPTION)
    }

    /// Canonicalizes primitives to their declared form.
    #[must_use]
    pub fn boxed(self) -> Self {
        match self {
            Self::Primitive(primitive) => primitive.boxed(),
            other => other,
        }
    }

    /// Returns `true` if neither this type nor any of its arguments is a wildcard, a type variable
    /// or unavailable.
    #[must_use]
    pub fn is_fully_declared(&self) -> bool {
        match self {
            Self::Declared(declared) => declared.args.iter().all(Self::is_fully_declared),
            Self::Primitive(_) => true,
            Self::Wildcard | Self::Variable(_) | Self::Unavailable(_) => false,
        }
    }

    /// Returns the first unavailable type referenced by this type.
    #[must_use]
    pub fn find_unavailable(&self) -> Option<&TypeName> {
        match self {
            Self::Unavailable(name) => Some(name),
            Self::Declared(declared) => declared.args.iter().find_map(Self::find_unavailable),
            _ => None,
        }
    }

    /// Replaces type variables with their bindings in `substitutions`.
    #[must_use]
    pub fn substitute(&self, substitutions: &HashMap<Arc<str>, Self>) -> Self {
        match self {
            Self::Variable(name) => substitutions.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Declared(declared) => Self::Declared(DeclaredType {
                name: declared.name.clone(),
                args: declared.args.iter().map(|arg| arg.substitute(substitutions)).collect(),
            }),
            other => other.clone(),
        }
    }

    /// Renders this type for use in generated code.
    #[must_use]
    pub fn to_type_tokens(&self) -> TokenStream {
        match self {
            Self::Declared(declared) => {
                let path = declared.name.path_tokens();
                let args = declared.args.iter().map(Self::to_type_tokens);
                let ty = if declared.args.is_empty() {
                    path
                } else {
                    quote!(#path<#(#args),*>)
                };
                if well_known::TRAIT_OBJECTS.contains(&declared.name.as_str()) {
                    quote!(::std::sync::Arc<dyn #ty>)
                } else {
                    ty
                }
            }
            Self::Primitive(primitive) => Ident::new(primitive.name(), Span::call_site()).into_token_stream(),
            Self::Wildcard => quote!(_),
            Self::Variable(name) => Ident::new(name, Span::call_site()).into_token_stream(),
            Self::Unavailable(name) => name.path_tokens(),
        }
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Declared(declared) => {
                f.write_str(declared.name.as_str())?;
                if let Some((first, rest)) = declared.args.split_first() {
                    write!(f, "<{first}")?;
                    for arg in rest {
                        write!(f, ", {arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Primitive(primitive) => f.write_str(primitive.name()),
            Self::Wildcard => f.write_str("_"),
            Self::Variable(name) => f.write_str(name),
            Self::Unavailable(name) => write!(f, "{name} (unavailable)"),
        }
    }
}

impl From<Primitive> for TypeRef {
    fn from(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn squash(tokens: &TokenStream) -> String {
        tokens.to_string().split_whitespace().collect()
    }

    #[test]
    fn simple_name_is_last_segment() {
        assert_eq!(TypeName::new("crate::db::Database").simple_name(), "Database");
        assert_eq!(TypeName::new("String").simple_name(), "String");
    }

    #[test]
    fn framework_traits_render_as_shared_trait_objects() {
        let ty = TypeRef::declared("crate::Database").wrapped_in(well_known::PROVIDER);

        assert_eq!(
            squash(&ty.to_type_tokens()),
            squash(&quote!(::std::sync::Arc<dyn ::thicket::Provider<crate::Database>>))
        );
    }

    #[test]
    fn local_and_external_paths() {
        assert_eq!(
            TypeRef::declared("crate::Foo").to_type_tokens().to_string(),
            quote!(crate::Foo).to_string()
        );
        assert_eq!(
            TypeRef::declared("app::Foo").to_type_tokens().to_string(),
            quote!(::app::Foo).to_string()
        );
        assert_eq!(TypeRef::declared("String").to_type_tokens().to_string(), "String");
    }

    #[test]
    fn display_includes_arguments() {
        let ty = TypeRef::map_of(TypeRef::declared("String"), TypeRef::Primitive(Primitive::I32));

        assert_eq!(ty.to_string(), "thicket::Map<String, i32>");
    }

    #[test]
    fn substitution_replaces_variables() {
        let ty = TypeRef::generic("crate::Repo", vec![TypeRef::variable("T")]);
        let substitutions = HashMap::from([(Arc::from("T"), TypeRef::declared("crate::User"))]);

        assert_eq!(
            ty.substitute(&substitutions),
            TypeRef::generic("crate::Repo", vec![TypeRef::declared("crate::User")])
        );
    }

    #[test]
    fn fully_declared_rejects_wildcards_and_variables() {
        assert!(TypeRef::generic("crate::Repo", vec![TypeRef::declared("crate::User")]).is_fully_declared());
        assert!(!TypeRef::generic("crate::Repo", vec![TypeRef::Wildcard]).is_fully_declared());
        assert!(!TypeRef::generic("crate::Repo", vec![TypeRef::variable("T")]).is_fully_declared());
    }

    #[test]
    fn primitives_box_to_declared_form() {
        assert_eq!(TypeRef::Primitive(Primitive::I32).boxed(), TypeRef::declared("i32"));
    }
}
