// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Normalized bindings: how a value for a key is produced.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::declarations::{Contribution, MapKey, Scope};
use crate::descriptor::ComponentRequirement;
use crate::key::Key;
use crate::request::{DependencyRequest, FrameworkType};
use crate::types::TypeName;

/// The variant of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A class with an injection constructor.
    Injection,
    /// A module `provides` method.
    Provision,
    /// A module `produces` method.
    Production,
    /// The component itself.
    Component,
    /// A component dependency instance.
    ComponentDependency,
    /// A provision method of a component dependency.
    ComponentProvision,
    /// A production method of a component dependency.
    ComponentProduction,
    /// An instance bound through the component creator.
    BoundInstance,
    /// The creator of a subcomponent.
    SubcomponentCreator,
    /// An alias of another binding.
    Delegate,
    /// A set collected from contributions.
    MultiboundSet,
    /// A map collected from contributions.
    MultiboundMap,
    /// A present or absent optional value.
    Optional,
    /// A `MembersInjector<T>` for a class with injected members.
    MembersInjector,
    /// The injection of members into an existing instance.
    MembersInjection,
}

impl BindingKind {
    /// Returns `true` for synthesized set and map bindings.
    #[must_use]
    pub const fn is_multibinding(self) -> bool {
        matches!(self, Self::MultiboundSet | Self::MultiboundMap)
    }
}

/// Whether a binding computes values synchronously, asynchronously, or injects members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingType {
    /// Synchronous; exposed through `Provider`.
    Provision,
    /// Asynchronous; exposed through `Producer`.
    Production,
    /// Members injection.
    MembersInjection,
}

impl BindingType {
    /// The framework type a field for this binding type holds.
    ///
    /// # Panics
    ///
    /// Panics for members injection, which has no framework type.
    #[must_use]
    pub fn framework_type(self) -> FrameworkType {
        match self {
            Self::Provision => FrameworkType::Provider,
            Self::Production => FrameworkType::Producer,
            Self::MembersInjection => unreachable!("internal error: members injection has no framework type"),
        }
    }
}

/// How a contribution combines with others of the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionType {
    /// The only binding of its key.
    Unique,
    /// One element of a set.
    Set,
    /// Several elements of a set.
    SetValues,
    /// One entry of a map.
    Map,
}

impl ContributionType {
    /// Returns `true` for multibinding contributions.
    #[must_use]
    pub const fn is_multibinding(self) -> bool {
        !matches!(self, Self::Unique)
    }
}

impl From<&Contribution> for ContributionType {
    fn from(contribution: &Contribution) -> Self {
        match contribution {
            Contribution::Unique => Self::Unique,
            Contribution::IntoSet => Self::Set,
            Contribution::ElementsIntoSet => Self::SetValues,
            Contribution::IntoMap(_) => Self::Map,
        }
    }
}

/// The declaration a binding comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingElement {
    /// An injection constructor.
    Constructor {
        /// The constructed class.
        class: TypeName,
        /// The constructor function.
        name: Arc<str>,
    },
    /// A module binding method.
    ModuleMethod {
        /// The declaring module.
        module: TypeName,
        /// The method.
        method: Arc<str>,
        /// Whether the method is an associated function.
        is_static: bool,
        /// Whether a production method returns a `ProducerFuture` rather than a value.
        returns_future: bool,
    },
    /// The component type.
    Component(TypeName),
    /// A component requirement: a dependency or bound instance.
    Requirement(ComponentRequirement),
    /// A method of a component dependency.
    DependencyMethod {
        /// The dependency that exposes the method.
        dependency: ComponentRequirement,
        /// The method.
        method: Arc<str>,
    },
    /// A subcomponent creator.
    SubcomponentCreator {
        /// The created subcomponent.
        subcomponent: TypeName,
        /// The creator type.
        creator: TypeName,
    },
    /// A class whose members are injected.
    Class(TypeName),
}

impl Display for BindingElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructor { class, name } => write!(f, "{class}::{name}"),
            Self::ModuleMethod { module, method, .. } => write!(f, "{module}::{method}"),
            Self::Component(name) | Self::Class(name) => write!(f, "{name}"),
            Self::Requirement(requirement) => write!(f, "{}", requirement.ty),
            Self::DependencyMethod { dependency, method } => write!(f, "{}::{method}", dependency.ty),
            Self::SubcomponentCreator { creator, .. } => write!(f, "{creator}"),
        }
    }
}

/// Whether an injection site is a field or a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionSiteKind {
    /// Assigned.
    Field,
    /// Called.
    Method,
}

/// A member that receives injected values after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InjectionSite {
    /// Field or method.
    pub kind: InjectionSiteKind,
    /// The member name.
    pub name: Arc<str>,
    /// The class declaring the member.
    pub declaring_class: TypeName,
    /// The requests, one per injected value.
    pub dependencies: Vec<DependencyRequest>,
}

/// How a value for a key is produced.
///
/// Bindings are immutable values; the [`BindingFactory`](crate::binding_factory::BindingFactory)
/// creates each one in a single step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// The variant.
    pub kind: BindingKind,
    /// Provision, production or members injection.
    pub binding_type: BindingType,
    /// The satisfied key. Multibinding contributions carry a contribution identifier.
    pub key: Key,
    /// How the binding combines with others of its key.
    pub contribution_type: ContributionType,
    /// Requests needed to produce the value, in parameter order.
    pub dependencies: Vec<DependencyRequest>,
    /// Members injected after construction.
    pub injection_sites: Vec<InjectionSite>,
    /// The originating declaration.
    pub element: Option<BindingElement>,
    /// The module declaring the binding.
    pub contributing_module: Option<TypeName>,
    /// The binding's scope.
    pub scope: Option<Scope>,
    /// Whether the value may be absent.
    pub nullable: bool,
    /// The entry key of a map contribution.
    pub map_key: Option<MapKey>,
    /// The generic binding this one was resolved from.
    pub unresolved: Option<Arc<Self>>,
}

impl Binding {
    pub(crate) fn new(kind: BindingKind, binding_type: BindingType, key: Key) -> Self {
        Self {
            kind,
            binding_type,
            key,
            contribution_type: ContributionType::Unique,
            dependencies: Vec::new(),
            injection_sites: Vec::new(),
            element: None,
            contributing_module: None,
            scope: None,
            nullable: false,
            map_key: None,
            unresolved: None,
        }
    }

    /// Every request of this binding: its own dependencies followed by its injection sites'.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyRequest> {
        self.dependencies
            .iter()
            .chain(self.injection_sites.iter().flat_map(|site| site.dependencies.iter()))
    }

    /// Returns `true` for production bindings.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.binding_type == BindingType::Production
    }

    /// Returns `true` if the binding must be memoized per component instance.
    #[must_use]
    pub const fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Returns `true` if producing the value needs the contributing module's instance.
    #[must_use]
    pub fn requires_module_instance(&self) -> bool {
        matches!(
            self.element,
            Some(BindingElement::ModuleMethod { is_static: false, .. })
        )
    }

    /// The binding's origin, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.element {
            Some(element) => format!("{element}"),
            None => format!("synthetic binding for {}", self.key),
        }
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} binding for {}", self.kind, self.key)?;
        if let Some(element) = &self.element {
            write!(f, " declared by {element}")?;
        }
        Ok(())
    }
}

/// A `binds` method: an alias whose binding is only known after its target is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelegateDeclaration {
    /// The alias key, carrying a contribution identifier for multibinding contributions.
    pub key: Key,
    /// How the alias contributes.
    pub contribution_type: ContributionType,
    /// The aliased request.
    pub delegate_request: DependencyRequest,
    /// The declaring module.
    pub module: TypeName,
    /// The declaring method.
    pub method: Arc<str>,
    /// The alias scope.
    pub scope: Option<Scope>,
    /// The entry key of a map contribution.
    pub map_key: Option<MapKey>,
}

/// A `multibinds` method declaring a possibly empty set or map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultibindingDeclaration {
    /// The declared set or map key; maps use framework-wrapped values.
    pub key: Key,
    /// Set or map.
    pub contribution_type: ContributionType,
    /// Whether the declaring module is a producer module.
    pub binding_type: BindingType,
    /// The declaring module.
    pub module: TypeName,
    /// The declaring method.
    pub method: Arc<str>,
}

/// A `binds_optional_of` method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionalBindingDeclaration {
    /// The key of the optional value, not of the optional itself.
    pub key: Key,
    /// The declaring module.
    pub module: TypeName,
    /// The declaring method.
    pub method: Arc<str>,
}

/// A subcomponent listed by a module, available through its creator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubcomponentDeclaration {
    /// The key of the subcomponent's creator.
    pub key: Key,
    /// The subcomponent.
    pub subcomponent: TypeName,
    /// The declaring module.
    pub module: TypeName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestKind;
    use crate::types::TypeRef;

    #[test]
    fn all_dependencies_include_injection_sites() {
        let mut binding = Binding::new(
            BindingKind::Injection,
            BindingType::Provision,
            Key::new(TypeRef::declared("crate::Service")),
        );
        binding.dependencies = vec![DependencyRequest::new(
            RequestKind::Instance,
            Key::new(TypeRef::declared("crate::Db")),
        )];
        binding.injection_sites = vec![InjectionSite {
            kind: InjectionSiteKind::Field,
            name: Arc::from("clock"),
            declaring_class: TypeName::new("crate::Service"),
            dependencies: vec![DependencyRequest::new(
                RequestKind::Provider,
                Key::new(TypeRef::declared("crate::Clock")),
            )],
        }];

        let keys: Vec<String> = binding.all_dependencies().map(|request| request.key.to_string()).collect();

        assert_eq!(keys, ["crate::Db", "crate::Clock"]);
    }

    #[test]
    fn instance_module_methods_need_the_module() {
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

        assert!(binding.requires_module_instance());
    }
}
