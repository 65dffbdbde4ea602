// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turns declarations into normalized [`Binding`] values.

use std::sync::Arc;

use crate::binding::{
    Binding, BindingElement, BindingKind, BindingType, ContributionType, DelegateDeclaration, InjectionSite,
    InjectionSiteKind, MultibindingDeclaration, OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::declarations::{
    BindingMethodDecl, ClassDecl, ComponentMethodDecl, Contribution, Declarations, MemberKind, ModuleDecl, Param,
};
use crate::descriptor::ComponentRequirement;
use crate::key::{ContributionId, Key};
use crate::oracle::TypeOracle;
use crate::request::{DependencyRequest, FrameworkType, RequestKind};
use crate::types::{TypeName, TypeRef, well_known};

/// Creates bindings, each in one step from its declaration.
pub struct BindingFactory<'a> {
    declarations: &'a Declarations,
    oracle: &'a dyn TypeOracle,
}

impl std::fmt::Debug for BindingFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingFactory").finish_non_exhaustive()
    }
}

impl<'a> BindingFactory<'a> {
    /// Creates a factory over the given declarations.
    #[must_use]
    pub fn new(declarations: &'a Declarations, oracle: &'a dyn TypeOracle) -> Self {
        Self { declarations, oracle }
    }

    /// The type oracle this factory resolves types with.
    #[must_use]
    pub fn oracle(&self) -> &'a dyn TypeOracle {
        self.oracle
    }

    /// The binding of a class's injection constructor.
    ///
    /// If the class is generic and `resolved_type` is a parameterization of it, every dependency
    /// is resolved against that parameterization and the generic binding is kept as
    /// [`Binding::unresolved`].
    ///
    /// # Panics
    ///
    /// Panics if `resolved_type` is not a parameterization of `class`.
    #[must_use]
    pub fn injection_binding(&self, class: &ClassDecl, resolved_type: Option<&TypeRef>) -> Option<Binding> {
        let constructor = class.constructor.as_ref()?;
        let declared = class.as_type();
        let constructed = match resolved_type {
            Some(resolved) if !class.type_params.is_empty() => {
                assert_eq!(
                    self.oracle.erasure(resolved),
                    self.oracle.erasure(&declared),
                    "internal error: {resolved} is not a parameterization of {}",
                    class.name
                );
                resolved.clone()
            }
            _ => declared.clone(),
        };
        let owner = format!("{}::{}", class.name, constructor.name);
        let dependencies = constructor
            .params
            .iter()
            .map(|param| {
                let ty = self.oracle.resolve_member_type(class, &constructed, &param.ty);
                request(param, &ty, &owner)
            })
            .collect();
        let unresolved = if constructed == declared {
            None
        } else {
            self.injection_binding(class, None).map(Arc::new)
        };

        Some(Binding {
            dependencies,
            injection_sites: self.injection_sites(&constructed),
            element: Some(BindingElement::Constructor {
                class: class.name.clone(),
                name: Arc::clone(&constructor.name),
            }),
            scope: class.scope.clone(),
            unresolved,
            ..Binding::new(BindingKind::Injection, BindingType::Provision, Key::new(constructed))
        })
    }

    /// The members-injection binding of a class, if the class is known.
    #[must_use]
    pub fn members_injection_binding(&self, ty: &TypeRef) -> Option<Binding> {
        let class = self.oracle.class(ty.name()?)?;
        let unresolved = if class.type_params.is_empty() || *ty == class.as_type() {
            None
        } else {
            self.members_injection_binding(&class.as_type()).map(Arc::new)
        };
        Some(Binding {
            injection_sites: self.injection_sites(ty),
            element: Some(BindingElement::Class(class.name.clone())),
            unresolved,
            ..Binding::new(
                BindingKind::MembersInjection,
                BindingType::MembersInjection,
                Key::new(ty.clone()),
            )
        })
    }

    /// The injected members of `ty` and its superclasses.
    ///
    /// Superclass members come first, fields before methods within a class, then declaration
    /// order. Private and static members are skipped, as are methods overridden by a more derived
    /// class.
    #[must_use]
    pub fn injection_sites(&self, ty: &TypeRef) -> Vec<InjectionSite> {
        let chain = self.oracle.superclass_chain(ty);
        let mut sites = Vec::new();
        for (depth, current) in chain.iter().enumerate().rev() {
            let Some(class) = current.name().and_then(|name| self.oracle.class(name)) else {
                continue;
            };
            let injectable = class
                .members
                .iter()
                .filter(|member| member.injected && !member.is_private && !member.is_static);
            let (fields, methods): (Vec<_>, Vec<_>) = injectable.partition(|member| !member.is_method());

            for member in fields.into_iter().chain(methods) {
                let overridden = member.is_method()
                    && chain[..depth].iter().any(|derived| {
                        derived
                            .name()
                            .is_some_and(|derived| self.oracle.overrides(derived, &member.name, &class.name))
                    });
                if overridden {
                    continue;
                }
                let owner = format!("{}::{}", class.name, member.name);
                let (kind, params) = match &member.kind {
                    MemberKind::Field(param) => (InjectionSiteKind::Field, std::slice::from_ref(param)),
                    MemberKind::Method(params) => (InjectionSiteKind::Method, params.as_slice()),
                };
                sites.push(InjectionSite {
                    kind,
                    name: Arc::clone(&member.name),
                    declaring_class: class.name.clone(),
                    dependencies: params
                        .iter()
                        .map(|param| {
                            let ty = self.oracle.resolve_member_type(class, current, &param.ty);
                            request(param, &ty, &owner)
                        })
                        .collect(),
                });
            }
        }
        sites
    }

    /// The binding of a `provides` method.
    #[must_use]
    pub fn provision_method_binding(&self, module: &ModuleDecl, method: &BindingMethodDecl) -> Binding {
        self.method_binding(module, method, BindingKind::Provision, FrameworkType::Provider)
    }

    /// The binding of a `produces` method.
    #[must_use]
    pub fn production_method_binding(&self, module: &ModuleDecl, method: &BindingMethodDecl) -> Binding {
        self.method_binding(module, method, BindingKind::Production, FrameworkType::Producer)
    }

    fn method_binding(
        &self,
        module: &ModuleDecl,
        method: &BindingMethodDecl,
        kind: BindingKind,
        framework: FrameworkType,
    ) -> Binding {
        let owner = format!("{}::{}", module.name, method.name);
        let binding_type = match framework {
            FrameworkType::Provider => BindingType::Provision,
            FrameworkType::Producer => BindingType::Production,
        };
        let binding = Binding {
            contribution_type: ContributionType::from(&method.contribution),
            dependencies: method
                .params
                .iter()
                .map(|param| request(param, &param.ty, &owner))
                .collect(),
            element: Some(BindingElement::ModuleMethod {
                module: module.name.clone(),
                method: Arc::clone(&method.name),
                is_static: method.is_static,
                returns_future: framework == FrameworkType::Producer
                    && method.return_type.is_wrapped_in(well_known::PRODUCER_FUTURE),
            }),
            contributing_module: Some(module.name.clone()),
            scope: method.scope.clone(),
            nullable: method.nullable,
            map_key: map_key(method),
            ..Binding::new(kind, binding_type, method_key(module, method, Some(framework)))
        };
        assert_eq!(
            binding.contribution_type.is_multibinding(),
            binding.key.contribution().is_some(),
            "internal error: contribution type of {binding} does not match its key"
        );
        binding
    }

    /// The declaration of a `binds` method, or `None` if it does not take exactly one parameter.
    #[must_use]
    pub fn delegate_declaration(&self, module: &ModuleDecl, method: &BindingMethodDecl) -> Option<DelegateDeclaration> {
        let [param] = method.params.as_slice() else {
            return None;
        };
        let owner = format!("{}::{}", module.name, method.name);
        Some(DelegateDeclaration {
            key: method_key(module, method, None),
            contribution_type: ContributionType::from(&method.contribution),
            delegate_request: request(param, &param.ty, &owner),
            module: module.name.clone(),
            method: Arc::clone(&method.name),
            scope: method.scope.clone(),
            map_key: map_key(method),
        })
    }

    /// The declaration of a `multibinds` method. Map keys use framework-wrapped values.
    #[must_use]
    pub fn multibinding_declaration(&self, module: &ModuleDecl, method: &BindingMethodDecl) -> MultibindingDeclaration {
        let binding_type = if module.is_producer {
            BindingType::Production
        } else {
            BindingType::Provision
        };
        let (ty, contribution_type) = match method.return_type.as_map() {
            Some((key, value)) => (
                TypeRef::map_of(key.clone(), value.clone().wrapped_in(binding_type.framework_type().type_name())),
                ContributionType::Map,
            ),
            None => (method.return_type.clone(), ContributionType::Set),
        };
        MultibindingDeclaration {
            key: Key::qualified(ty, method.qualifier.clone()),
            contribution_type,
            binding_type,
            module: module.name.clone(),
            method: Arc::clone(&method.name),
        }
    }

    /// The declaration of a `binds_optional_of` method.
    #[must_use]
    pub fn optional_declaration(&self, module: &ModuleDecl, method: &BindingMethodDecl) -> OptionalBindingDeclaration {
        OptionalBindingDeclaration {
            key: Key::qualified(method.return_type.clone(), method.qualifier.clone()),
            module: module.name.clone(),
            method: Arc::clone(&method.name),
        }
    }

    /// The declaration of a module subcomponent, keyed by its creator, if it has one.
    #[must_use]
    pub fn subcomponent_declaration(&self, module: &ModuleDecl, subcomponent: &TypeName) -> Option<SubcomponentDeclaration> {
        let creator = self.declarations.component(subcomponent)?.creator.as_ref()?;
        Some(SubcomponentDeclaration {
            key: Key::new(TypeRef::declared(creator.name.as_str())),
            subcomponent: subcomponent.clone(),
            module: module.name.clone(),
        })
    }

    /// The binding of the component itself, available as a shared handle.
    #[must_use]
    pub fn component_binding(&self, component: &TypeName) -> Binding {
        Binding {
            element: Some(BindingElement::Component(component.clone())),
            ..Binding::new(
                BindingKind::Component,
                BindingType::Provision,
                Key::new(TypeRef::declared(component.as_str()).wrapped_in(well_known::ARC)),
            )
        }
    }

    /// The binding of a component dependency instance.
    #[must_use]
    pub fn component_dependency_binding(&self, dependency: &ComponentRequirement) -> Binding {
        Binding {
            element: Some(BindingElement::Requirement(dependency.clone())),
            ..Binding::new(
                BindingKind::ComponentDependency,
                BindingType::Provision,
                Key::new(dependency.ty.clone()),
            )
        }
    }

    /// The binding of a method of a component dependency, or `None` for methods that take
    /// parameters or return nothing.
    #[must_use]
    pub fn component_method_binding(
        &self,
        dependency: &ComponentRequirement,
        method: &ComponentMethodDecl,
        production_dependency: bool,
    ) -> Option<Binding> {
        let returned = method.return_type.as_ref().filter(|_| method.params.is_empty())?;
        let future = returned.unwrap_in(well_known::PRODUCER_FUTURE).filter(|_| production_dependency);
        let (kind, binding_type, ty) = match future {
            Some(value) => (BindingKind::ComponentProduction, BindingType::Production, value),
            None => (BindingKind::ComponentProvision, BindingType::Provision, returned),
        };
        Some(Binding {
            element: Some(BindingElement::DependencyMethod {
                dependency: dependency.clone(),
                method: Arc::clone(&method.name),
            }),
            nullable: method.nullable,
            ..Binding::new(kind, binding_type, Key::qualified(ty.clone(), method.qualifier.clone()))
        })
    }

    /// The binding of an instance passed to the component creator.
    ///
    /// # Panics
    ///
    /// Panics if `requirement` is not a bound instance.
    #[must_use]
    pub fn bound_instance_binding(&self, requirement: &ComponentRequirement) -> Binding {
        let key = requirement
            .key
            .clone()
            .unwrap_or_else(|| unreachable!("internal error: {} is not a bound instance", requirement.name));
        Binding {
            element: Some(BindingElement::Requirement(requirement.clone())),
            nullable: requirement.nullable,
            ..Binding::new(BindingKind::BoundInstance, BindingType::Provision, key)
        }
    }

    /// The binding of a subcomponent's creator.
    #[must_use]
    pub fn subcomponent_creator_binding(&self, subcomponent: &TypeName, creator: &TypeName) -> Binding {
        Binding {
            element: Some(BindingElement::SubcomponentCreator {
                subcomponent: subcomponent.clone(),
                creator: creator.clone(),
            }),
            ..Binding::new(
                BindingKind::SubcomponentCreator,
                BindingType::Provision,
                Key::new(TypeRef::declared(creator.as_str())),
            )
        }
    }

    /// The binding of a `binds` declaration whose target resolved to `actual`.
    ///
    /// # Panics
    ///
    /// Panics if `actual` is a members-injection binding.
    #[must_use]
    pub fn delegate_binding(&self, declaration: &DelegateDeclaration, actual: &Binding) -> Binding {
        match actual.binding_type {
            BindingType::Production => Binding {
                nullable: actual.nullable,
                ..self.build_delegate(declaration, FrameworkType::Producer)
            },
            BindingType::Provision => Binding {
                scope: declaration.scope.clone(),
                nullable: actual.nullable,
                ..self.build_delegate(declaration, FrameworkType::Provider)
            },
            BindingType::MembersInjection => {
                unreachable!("internal error: {} cannot delegate to members injection", declaration.method)
            }
        }
    }

    /// The binding of a `binds` declaration whose target could not be resolved.
    #[must_use]
    pub fn unresolved_delegate_binding(&self, declaration: &DelegateDeclaration) -> Binding {
        Binding {
            scope: declaration.scope.clone(),
            ..self.build_delegate(declaration, FrameworkType::Provider)
        }
    }

    fn build_delegate(&self, declaration: &DelegateDeclaration, framework: FrameworkType) -> Binding {
        let binding_type = match framework {
            FrameworkType::Provider => BindingType::Provision,
            FrameworkType::Producer => BindingType::Production,
        };
        let key = if declaration.contribution_type == ContributionType::Map {
            declaration
                .key
                .wrap_map_value(framework.type_name())
                .unwrap_or_else(|| declaration.key.clone())
        } else {
            declaration.key.clone()
        };
        Binding {
            contribution_type: declaration.contribution_type,
            dependencies: vec![declaration.delegate_request.clone()],
            element: Some(BindingElement::ModuleMethod {
                module: declaration.module.clone(),
                method: Arc::clone(&declaration.method),
                is_static: true,
                returns_future: false,
            }),
            contributing_module: Some(declaration.module.clone()),
            map_key: declaration.map_key.clone(),
            ..Binding::new(BindingKind::Delegate, binding_type, key)
        }
    }

    /// The set or map binding that combines `contributions`.
    ///
    /// Production is contagious: the result is a production binding if any contribution is one, or
    /// if the values are requested as producers or produced results.
    #[must_use]
    pub fn synthetic_multibinding(&self, key: &Key, contributions: &[Arc<Binding>]) -> Binding {
        let binding_type = if multibinding_requires_production(key, contributions) {
            BindingType::Production
        } else {
            BindingType::Provision
        };
        let kind = if key.ty().is_map() {
            BindingKind::MultiboundMap
        } else {
            BindingKind::MultiboundSet
        };
        let map_values = key.ty().as_map().map(|(_, value)| value);
        let dependencies = contributions
            .iter()
            .map(|contribution| {
                let request_kind = match contribution.contribution_type {
                    ContributionType::Map => match map_values {
                        Some(value) if value.is_wrapped_in(well_known::PROVIDER) => RequestKind::Provider,
                        Some(value) if value.is_wrapped_in(well_known::PRODUCER) => RequestKind::Producer,
                        _ => RequestKind::Instance,
                    },
                    ContributionType::Set | ContributionType::SetValues => RequestKind::Instance,
                    ContributionType::Unique => {
                        unreachable!("internal error: {contribution} is not a multibinding contribution")
                    }
                };
                DependencyRequest::new(request_kind, contribution.key.clone())
            })
            .collect();
        Binding {
            dependencies,
            ..Binding::new(kind, binding_type, key.clone())
        }
    }

    /// The binding of an optional key.
    ///
    /// Without underlying bindings the optional is absent and always a provision. Otherwise it is
    /// a production if the underlying bindings include one, or if the value is requested as a
    /// producer or produced result.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not an optional key.
    #[must_use]
    pub fn synthetic_optional_binding(&self, key: &Key, request_kind: RequestKind, underlying: &[Arc<Binding>]) -> Binding {
        let production = !underlying.is_empty()
            && (underlying.iter().any(|binding| binding.is_production())
                || matches!(request_kind, RequestKind::Producer | RequestKind::Produced));
        let binding_type = if production {
            BindingType::Production
        } else {
            BindingType::Provision
        };
        let dependencies = if underlying.is_empty() {
            Vec::new()
        } else {
            let value_key = key
                .unwrap_optional()
                .unwrap_or_else(|| unreachable!("internal error: {key} is not an optional key"));
            vec![DependencyRequest::new(request_kind, value_key).with_nullable(request_kind != RequestKind::Instance)]
        };
        Binding {
            dependencies,
            ..Binding::new(BindingKind::Optional, binding_type, key.clone())
        }
    }

    /// The binding of `MembersInjector<T>` for the members-injection binding of `T`.
    #[must_use]
    pub fn members_injector_binding(&self, key: &Key, members: &Binding) -> Binding {
        Binding {
            injection_sites: members.injection_sites.clone(),
            element: members.element.clone(),
            ..Binding::new(BindingKind::MembersInjector, BindingType::Provision, key.clone())
        }
    }
}

fn request(param: &Param, ty: &TypeRef, owner: &str) -> DependencyRequest {
    DependencyRequest::from_type(ty, param.qualifier.clone())
        .with_element(format!("{owner}({})", param.name))
        .with_nullable(param.nullable)
}

fn map_key(method: &BindingMethodDecl) -> Option<crate::declarations::MapKey> {
    match &method.contribution {
        Contribution::IntoMap(key) => Some(key.clone()),
        _ => None,
    }
}

fn method_key(module: &ModuleDecl, method: &BindingMethodDecl, framework: Option<FrameworkType>) -> Key {
    let mut returned = &method.return_type;
    if framework == Some(FrameworkType::Producer)
        && let Some(value) = returned.unwrap_in(well_known::PRODUCER_FUTURE)
    {
        returned = value;
    }
    let ty = match &method.contribution {
        Contribution::Unique | Contribution::ElementsIntoSet => returned.clone(),
        Contribution::IntoSet => TypeRef::set_of(returned.clone()),
        Contribution::IntoMap(map_key) => {
            let value = match framework {
                Some(framework) => returned.clone().wrapped_in(framework.type_name()),
                None => returned.clone(),
            };
            TypeRef::map_of(map_key.ty.clone(), value)
        }
    };
    let key = Key::qualified(ty, method.qualifier.clone());
    match method.contribution {
        Contribution::Unique => key,
        _ => key.with_contribution(ContributionId {
            module: module.name.clone(),
            method: Arc::clone(&method.name),
        }),
    }
}

fn multibinding_requires_production(key: &Key, contributions: &[Arc<Binding>]) -> bool {
    if let Some((_, value)) = key.ty().as_map() {
        if value.is_wrapped_in(well_known::PRODUCER) || value.is_wrapped_in(well_known::PRODUCED) {
            return true;
        }
    } else if key
        .ty()
        .as_set()
        .is_some_and(|element| element.is_wrapped_in(well_known::PRODUCED))
    {
        return true;
    }
    contributions.iter().any(|binding| binding.is_production())
}
