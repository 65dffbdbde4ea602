// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Questions about types that only the front end can answer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::declarations::{ClassDecl, Declarations};
use crate::types::{TypeName, TypeRef};

/// Type resolution services used by binding creation and validation.
pub trait TypeOracle {
    /// The declaration of a class, if the front end knows it.
    fn class(&self, name: &TypeName) -> Option<&ClassDecl>;

    /// Returns `true` if a value of `sub` can be used where `sup` is expected.
    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool;

    /// Returns `true` if the method `name` declared in `overridden_in` is overridden by a method of
    /// `overrider`, which must be a subclass of `overridden_in`.
    fn overrides(&self, overrider: &TypeName, name: &str, overridden_in: &TypeName) -> bool;

    /// The superclass chain of `ty`, starting with `ty` itself, with type arguments resolved.
    fn superclass_chain(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut chain = vec![ty.clone()];
        let mut current = ty.clone();
        while let Some(superclass) = self.direct_superclass(&current) {
            chain.push(superclass.clone());
            current = superclass;
        }
        chain
    }

    /// The superclass of `ty` with type arguments resolved.
    fn direct_superclass(&self, ty: &TypeRef) -> Option<TypeRef> {
        let class = self.class(ty.name()?)?;
        class
            .superclass
            .as_ref()
            .map(|superclass| superclass.substitute(&type_arguments(class, ty)))
    }

    /// Resolves a member type of `class`, declared in terms of its type parameters, as seen
    /// through the parameterization `container`.
    fn resolve_member_type(&self, class: &ClassDecl, container: &TypeRef, member: &TypeRef) -> TypeRef {
        member.substitute(&type_arguments(class, container))
    }

    /// `ty` without type arguments.
    fn erasure(&self, ty: &TypeRef) -> TypeRef {
        match ty.name() {
            Some(name) => TypeRef::declared(name.as_str()),
            None => ty.clone(),
        }
    }

    /// Returns `true` if both types denote the same type.
    fn is_same_type(&self, left: &TypeRef, right: &TypeRef) -> bool {
        left == right
    }
}

/// Maps a class's type parameters to the arguments in `ty`.
pub(crate) fn type_arguments(class: &ClassDecl, ty: &TypeRef) -> HashMap<Arc<str>, TypeRef> {
    class.type_params.iter().cloned().zip(ty.args().iter().cloned()).collect()
}

/// A [`TypeOracle`] backed by [`Declarations`].
#[derive(Debug)]
pub struct TypeRegistry<'a> {
    classes: HashMap<&'a TypeName, &'a ClassDecl>,
}

impl<'a> TypeRegistry<'a> {
    /// Indexes the classes of `declarations`.
    #[must_use]
    pub fn new(declarations: &'a Declarations) -> Self {
        Self {
            classes: declarations.classes.iter().map(|class| (&class.name, class)).collect(),
        }
    }

    fn direct_supertypes(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let Some(class) = ty.name().and_then(|name| self.classes.get(name)) else {
            return Vec::new();
        };
        let arguments = type_arguments(class, ty);
        class
            .superclass
            .iter()
            .chain(&class.implements)
            .map(|supertype| supertype.substitute(&arguments))
            .collect()
    }
}

impl TypeOracle for TypeRegistry<'_> {
    fn class(&self, name: &TypeName) -> Option<&ClassDecl> {
        self.classes.get(name).copied()
    }

    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if self.is_same_type(sub, sup) {
            return true;
        }
        let mut pending = self.direct_supertypes(sub);
        let mut seen = Vec::new();
        while let Some(candidate) = pending.pop() {
            if self.is_same_type(&candidate, sup) {
                return true;
            }
            if !seen.contains(&candidate) {
                pending.extend(self.direct_supertypes(&candidate));
                seen.push(candidate);
            }
        }
        false
    }

    fn overrides(&self, overrider: &TypeName, name: &str, overridden_in: &TypeName) -> bool {
        if overrider == overridden_in {
            return false;
        }
        self.classes.get(overrider).is_some_and(|class| {
            class
                .members
                .iter()
                .any(|member| member.is_method() && !member.is_private && !member.is_static && &*member.name == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::MemberDecl;

    fn declarations() -> Declarations {
        Declarations::new()
            .with_class(
                ClassDecl::new("crate::Base")
                    .with_type_params(["T"])
                    .with_member(MemberDecl::injected_method("set_value", Vec::new())),
            )
            .with_class(
                ClassDecl::new("crate::Derived")
                    .with_superclass(TypeRef::generic("crate::Base", vec![TypeRef::declared("String")]))
                    .implementing(TypeRef::declared("crate::Service"))
                    .with_member(MemberDecl::plain_method("set_value")),
            )
    }

    #[test]
    fn subtype_through_superclass_and_trait() {
        let declarations = declarations();
        let registry = TypeRegistry::new(&declarations);
        let derived = TypeRef::declared("crate::Derived");

        assert!(registry.is_subtype(&derived, &TypeRef::declared("crate::Service")));
        assert!(registry.is_subtype(
            &derived,
            &TypeRef::generic("crate::Base", vec![TypeRef::declared("String")])
        ));
        assert!(!registry.is_subtype(&TypeRef::declared("crate::Service"), &derived));
    }

    #[test]
    fn superclass_chain_resolves_arguments() {
        let declarations = declarations();
        let registry = TypeRegistry::new(&declarations);

        assert_eq!(
            registry.superclass_chain(&TypeRef::declared("crate::Derived")),
            vec![
                TypeRef::declared("crate::Derived"),
                TypeRef::generic("crate::Base", vec![TypeRef::declared("String")]),
            ]
        );
    }

    #[test]
    fn same_named_method_overrides() {
        let declarations = declarations();
        let registry = TypeRegistry::new(&declarations);

        assert!(registry.overrides(
            &TypeName::new("crate::Derived"),
            "set_value",
            &TypeName::new("crate::Base")
        ));
        assert!(!registry.overrides(
            &TypeName::new("crate::Derived"),
            "other",
            &TypeName::new("crate::Base")
        ));
    }
}
