// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The result of resolving one key in one component: the bindings and declarations that apply,
//! each with the component that owns it.

use std::sync::Arc;

use crate::binding::{Binding, MultibindingDeclaration, OptionalBindingDeclaration, SubcomponentDeclaration};
use crate::key::Key;
use crate::request::BindingKey;
use crate::types::TypeName;

/// A binding together with the component that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBinding {
    /// The component whose implementation holds the binding's field or method.
    pub owner: TypeName,
    /// The binding.
    pub binding: Arc<Binding>,
}

/// Everything resolved for one binding key in one component.
///
/// Contribution keys may resolve to several bindings; more than one binding for a unique key is
/// reported by validation. Bindings owned by ancestors are included with their owner.
#[derive(Debug, Clone)]
pub struct ResolvedBindings {
    binding_key: BindingKey,
    bindings: Vec<OwnedBinding>,
    multibinding_declarations: Vec<Arc<MultibindingDeclaration>>,
    subcomponent_declarations: Vec<Arc<SubcomponentDeclaration>>,
    optional_declarations: Vec<Arc<OptionalBindingDeclaration>>,
}

impl ResolvedBindings {
    pub(crate) fn for_contributions(
        key: Key,
        bindings: Vec<OwnedBinding>,
        multibinding_declarations: Vec<Arc<MultibindingDeclaration>>,
        subcomponent_declarations: Vec<Arc<SubcomponentDeclaration>>,
        optional_declarations: Vec<Arc<OptionalBindingDeclaration>>,
    ) -> Self {
        Self {
            binding_key: BindingKey::Contribution(key),
            bindings,
            multibinding_declarations,
            subcomponent_declarations,
            optional_declarations,
        }
    }

    pub(crate) fn for_members_injection(key: Key, owner: TypeName, binding: Arc<Binding>) -> Self {
        Self {
            binding_key: BindingKey::MembersInjection(key),
            bindings: vec![OwnedBinding { owner, binding }],
            multibinding_declarations: Vec::new(),
            subcomponent_declarations: Vec::new(),
            optional_declarations: Vec::new(),
        }
    }

    pub(crate) fn no_bindings(binding_key: BindingKey) -> Self {
        Self {
            binding_key,
            bindings: Vec::new(),
            multibinding_declarations: Vec::new(),
            subcomponent_declarations: Vec::new(),
            optional_declarations: Vec::new(),
        }
    }

    /// The resolved binding key.
    #[must_use]
    pub const fn binding_key(&self) -> &BindingKey {
        &self.binding_key
    }

    /// The resolved key.
    #[must_use]
    pub const fn key(&self) -> &Key {
        self.binding_key.key()
    }

    /// Every binding with its owner, in resolution order.
    #[must_use]
    pub fn owned(&self) -> &[OwnedBinding] {
        &self.bindings
    }

    /// Every binding, in resolution order.
    pub fn bindings(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.bindings.iter().map(|owned| &owned.binding)
    }

    /// The bindings owned by `component`.
    pub fn bindings_owned_by<'s>(&'s self, component: &'s TypeName) -> impl Iterator<Item = &'s Arc<Binding>> {
        self.bindings
            .iter()
            .filter(move |owned| &owned.owner == component)
            .map(|owned| &owned.binding)
    }

    /// The owner of `binding`, if it is one of the resolved bindings.
    #[must_use]
    pub fn owner_of(&self, binding: &Binding) -> Option<&TypeName> {
        self.bindings
            .iter()
            .find(|owned| *owned.binding == *binding)
            .map(|owned| &owned.owner)
    }

    /// The single binding, if exactly one was resolved.
    #[must_use]
    pub fn binding(&self) -> Option<&OwnedBinding> {
        match self.bindings.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    /// Returns `true` if nothing satisfies the key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// `multibinds` declarations of the key.
    #[must_use]
    pub fn multibinding_declarations(&self) -> &[Arc<MultibindingDeclaration>] {
        &self.multibinding_declarations
    }

    /// Module subcomponent declarations of the key.
    #[must_use]
    pub fn subcomponent_declarations(&self) -> &[Arc<SubcomponentDeclaration>] {
        &self.subcomponent_declarations
    }

    /// `binds_optional_of` declarations of the key.
    #[must_use]
    pub fn optional_declarations(&self) -> &[Arc<OptionalBindingDeclaration>] {
        &self.optional_declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingKind, BindingType};
    use crate::types::TypeRef;

    #[test]
    fn ownership_partitions_bindings() {
        let key = Key::new(TypeRef::set_of(TypeRef::declared("crate::Plugin")));
        let root = TypeName::new("crate::Root");
        let child = TypeName::new("crate::Child");
        let parent_owned = Arc::new(Binding::new(BindingKind::Provision, BindingType::Provision, key.clone()));
        let child_owned = Arc::new(Binding::new(BindingKind::MultiboundSet, BindingType::Provision, key.clone()));

        let resolved = ResolvedBindings::for_contributions(
            key,
            vec![
                OwnedBinding {
                    owner: root.clone(),
                    binding: Arc::clone(&parent_owned),
                },
                OwnedBinding {
                    owner: child.clone(),
                    binding: Arc::clone(&child_owned),
                },
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(resolved.bindings_owned_by(&child).count(), 1);
        assert_eq!(resolved.owner_of(&parent_owned), Some(&root));
        assert!(resolved.binding().is_none());
    }
}
