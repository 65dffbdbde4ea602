// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Just-in-time bindings for classes with injection constructors or injected members.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Level, event};

use crate::binding::Binding;
use crate::binding_factory::BindingFactory;
use crate::key::Key;
use crate::types::{TypeRef, well_known};

/// Creates and memoizes implicit bindings for one generation pass.
pub(crate) struct InjectRegistry<'a> {
    factory: &'a BindingFactory<'a>,
    injection: HashMap<Key, Option<Arc<Binding>>>,
    members: HashMap<Key, Option<Arc<Binding>>>,
}

impl std::fmt::Debug for InjectRegistry<'_> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectRegistry")
            .field("injection", &self.injection.len())
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

impl<'a> InjectRegistry<'a> {
    pub(crate) fn new(factory: &'a BindingFactory<'a>) -> Self {
        Self {
            factory,
            injection: HashMap::new(),
            members: HashMap::new(),
        }
    }

    /// The injection-constructor binding for `key`, if the key is eligible for one.
    ///
    /// Eligible keys are unqualified, name a concrete declared class with an injection
    /// constructor and have fully declared type arguments. The raw form of a generic class is
    /// never eligible.
    pub(crate) fn injection_binding(&mut self, key: &Key) -> Option<Arc<Binding>> {
        if let Some(cached) = self.injection.get(key) {
            return cached.clone();
        }
        let binding = self.create_injection_binding(key).map(Arc::new);
        if let Some(binding) = &binding {
            event!(Level::TRACE, key = %key, "created just-in-time injection binding");
            debug_assert_eq!(&binding.key, key);
        }
        self.injection.insert(key.clone(), binding.clone());
        binding
    }

    fn create_injection_binding(&self, key: &Key) -> Option<Binding> {
        if key.qualifier().is_some() || key.contribution().is_some() {
            return None;
        }
        let ty = key.ty();
        let class = self.factory.oracle().class(ty.name()?)?;
        if class.is_abstract || !ty.is_fully_declared() {
            return None;
        }
        if class.type_params.is_empty() {
            return self.factory.injection_binding(class, None);
        }
        if ty.args().len() != class.type_params.len() {
            return None;
        }
        self.factory.injection_binding(class, Some(ty))
    }

    /// The members-injection binding for the type of `key`.
    pub(crate) fn members_injection_binding(&mut self, key: &Key) -> Option<Arc<Binding>> {
        if let Some(cached) = self.members.get(key) {
            return cached.clone();
        }
        let binding = if key.qualifier().is_some() || !is_injectable_type(key.ty()) {
            None
        } else {
            self.factory.members_injection_binding(key.ty()).map(Arc::new)
        };
        if binding.is_some() {
            event!(Level::TRACE, key = %key, "created members-injection binding");
        }
        self.members.insert(key.clone(), binding.clone());
        binding
    }

    /// The binding of a `MembersInjector<T>` key, backed by the members-injection binding of `T`.
    pub(crate) fn members_injector_binding(&mut self, key: &Key) -> Option<Arc<Binding>> {
        let target = key.ty().unwrap_in(well_known::MEMBERS_INJECTOR)?;
        let members = self.members_injection_binding(&Key::new(target.clone()))?;
        Some(Arc::new(self.factory.members_injector_binding(key, &members)))
    }
}

fn is_injectable_type(ty: &TypeRef) -> bool {
    ty.as_declared().is_some() && ty.is_fully_declared()
}
