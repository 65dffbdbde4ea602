// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Gathers binding declarations per module and indexes them per component.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::{
    Binding, DelegateDeclaration, MultibindingDeclaration, OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::binding_factory::BindingFactory;
use crate::declarations::{BindingMethodKind, ModuleDecl};
use crate::descriptor::{ComponentRequirement, RequirementKind};
use crate::key::Key;
use crate::types::TypeName;

/// The binding declarations of one module.
#[derive(Debug)]
pub struct ModuleDescriptor {
    /// The module type.
    pub name: TypeName,
    /// Whether this is a producer module.
    pub is_producer: bool,
    /// Whether an instance can be created with `Default`.
    pub instantiable: bool,
    /// `provides` and `produces` bindings.
    pub bindings: Vec<Arc<Binding>>,
    /// `binds` declarations.
    pub delegates: Vec<Arc<DelegateDeclaration>>,
    /// `multibinds` declarations.
    pub multibinding_declarations: Vec<Arc<MultibindingDeclaration>>,
    /// `binds_optional_of` declarations.
    pub optional_declarations: Vec<Arc<OptionalBindingDeclaration>>,
    /// Subcomponents whose creators this module makes available.
    pub subcomponent_declarations: Vec<Arc<SubcomponentDeclaration>>,
    /// The subcomponents named by the module.
    pub subcomponents: Vec<TypeName>,
    /// Included modules.
    pub includes: Vec<TypeName>,
}

impl ModuleDescriptor {
    /// Creates the bindings and declarations of a module.
    #[must_use]
    pub fn create(decl: &ModuleDecl, factory: &BindingFactory<'_>) -> Self {
        let mut descriptor = Self {
            name: decl.name.clone(),
            is_producer: decl.is_producer,
            instantiable: decl.instantiable,
            bindings: Vec::new(),
            delegates: Vec::new(),
            multibinding_declarations: Vec::new(),
            optional_declarations: Vec::new(),
            subcomponent_declarations: Vec::new(),
            subcomponents: decl.subcomponents.clone(),
            includes: decl.includes.clone(),
        };
        for method in &decl.methods {
            match method.kind {
                BindingMethodKind::Provides => {
                    descriptor.bindings.push(Arc::new(factory.provision_method_binding(decl, method)));
                }
                BindingMethodKind::Produces => {
                    descriptor.bindings.push(Arc::new(factory.production_method_binding(decl, method)));
                }
                BindingMethodKind::Binds => {
                    if let Some(delegate) = factory.delegate_declaration(decl, method) {
                        descriptor.delegates.push(Arc::new(delegate));
                    }
                }
                BindingMethodKind::Multibinds => {
                    descriptor
                        .multibinding_declarations
                        .push(Arc::new(factory.multibinding_declaration(decl, method)));
                }
                BindingMethodKind::BindsOptionalOf => {
                    descriptor
                        .optional_declarations
                        .push(Arc::new(factory.optional_declaration(decl, method)));
                }
            }
        }
        descriptor.subcomponent_declarations = decl
            .subcomponents
            .iter()
            .filter_map(|subcomponent| factory.subcomponent_declaration(decl, subcomponent))
            .map(Arc::new)
            .collect();
        descriptor
    }

    /// Returns `true` if some binding needs an instance of the module.
    #[must_use]
    pub fn requires_instance(&self) -> bool {
        self.bindings.iter().any(|binding| binding.requires_module_instance())
    }

    /// The component requirement for an instance of this module.
    #[must_use]
    pub fn requirement(&self) -> ComponentRequirement {
        ComponentRequirement {
            kind: RequirementKind::Module,
            has_default: self.instantiable,
            ..ComponentRequirement::dependency(&self.name)
        }
    }

    /// The keys of every declaration in the module, in declaration order.
    #[must_use]
    pub fn all_binding_keys(&self) -> Vec<Key> {
        self.bindings
            .iter()
            .map(|binding| binding.key.clone())
            .chain(self.delegates.iter().map(|delegate| delegate.key.clone()))
            .chain(self.multibinding_declarations.iter().map(|declaration| declaration.key.clone()))
            .chain(self.optional_declarations.iter().map(|declaration| declaration.key.clone()))
            .chain(self.subcomponent_declarations.iter().map(|declaration| declaration.key.clone()))
            .collect()
    }
}

/// An insertion-ordered multimap from keys to values.
#[derive(Debug, Clone)]
pub(crate) struct KeyMultimap<V> {
    index: HashMap<Key, usize>,
    entries: Vec<(Key, Vec<V>)>,
}

impl<V> Default for KeyMultimap<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V: PartialEq> KeyMultimap<V> {
    /// Adds `value` under `key` unless it is already there.
    pub(crate) fn insert(&mut self, key: Key, value: V) {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        let values = &mut self.entries[position].1;
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub(crate) fn get(&self, key: &Key) -> &[V] {
        self.index
            .get(key)
            .map_or(&[], |&position| self.entries[position].1.as_slice())
    }

    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }
}

/// Every declaration installed in one component, indexed for lookup by key.
#[derive(Debug, Default)]
pub(crate) struct ComponentDeclarations {
    /// Unique and contribution bindings by their exact key.
    pub(crate) explicit_bindings: KeyMultimap<Arc<Binding>>,
    /// Multibinding contributions by the multibinding's key.
    pub(crate) explicit_multibindings: KeyMultimap<Arc<Binding>>,
    pub(crate) multibinding_declarations: KeyMultimap<Arc<MultibindingDeclaration>>,
    pub(crate) subcomponent_declarations: KeyMultimap<Arc<SubcomponentDeclaration>>,
    /// Delegates by their exact key.
    pub(crate) delegates: KeyMultimap<Arc<DelegateDeclaration>>,
    /// Delegate multibinding contributions by the multibinding's key.
    pub(crate) delegate_multibindings: KeyMultimap<Arc<DelegateDeclaration>>,
    pub(crate) optional_declarations: KeyMultimap<Arc<OptionalBindingDeclaration>>,
}

impl ComponentDeclarations {
    pub(crate) fn add_explicit_binding(&mut self, binding: Arc<Binding>) {
        if binding.contribution_type.is_multibinding() {
            self.explicit_multibindings
                .insert(binding.key.without_contribution(), Arc::clone(&binding));
        }
        self.explicit_bindings.insert(binding.key.clone(), binding);
    }

    pub(crate) fn add_module(&mut self, module: &ModuleDescriptor) {
        for binding in &module.bindings {
            self.add_explicit_binding(Arc::clone(binding));
        }
        for delegate in &module.delegates {
            if delegate.contribution_type.is_multibinding() {
                self.delegate_multibindings
                    .insert(delegate.key.without_contribution(), Arc::clone(delegate));
            }
            self.delegates.insert(delegate.key.clone(), Arc::clone(delegate));
        }
        for declaration in &module.multibinding_declarations {
            self.multibinding_declarations
                .insert(declaration.key.clone(), Arc::clone(declaration));
        }
        for declaration in &module.optional_declarations {
            self.optional_declarations
                .insert(declaration.key.clone(), Arc::clone(declaration));
        }
        for declaration in &module.subcomponent_declarations {
            self.subcomponent_declarations
                .insert(declaration.key.clone(), Arc::clone(declaration));
        }
    }

    /// Returns `true` if `binding` is one of the explicit bindings.
    pub(crate) fn contains_explicit_binding(&self, binding: &Binding) -> bool {
        self.explicit_bindings
            .get(&binding.key)
            .iter()
            .any(|explicit| **explicit == *binding)
    }
}
