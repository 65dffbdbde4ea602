// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Component descriptors: the validated shape of a component and its subcomponent tree.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Level, event};

use crate::binding_factory::BindingFactory;
use crate::collector::ModuleDescriptor;
use crate::declarations::{
    ComponentDecl, ComponentKind, ComponentMethodDecl, CreatorDecl, Declarations, ModuleDecl, Param, Scope,
};
use crate::diagnostics::Reporter;
use crate::key::Key;
use crate::naming::snake_case;
use crate::request::{DependencyRequest, RequestKind};
use crate::types::{TypeName, TypeRef};

/// What kind of value a component needs from its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    /// A module instance.
    Module,
    /// A component dependency.
    Dependency,
    /// An instance bound into the graph.
    BoundInstance,
}

/// A value a component needs before it can be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRequirement {
    /// Module, dependency or bound instance.
    pub kind: RequirementKind,
    /// The required type.
    pub ty: TypeRef,
    /// The bound key, for bound instances.
    pub key: Option<Key>,
    /// The field and setter name.
    pub name: Arc<str>,
    /// Whether the value may be absent.
    pub nullable: bool,
    /// Whether a default value exists when the creator does not receive one.
    pub has_default: bool,
}

impl ComponentRequirement {
    /// The requirement of a module instance.
    #[must_use]
    pub fn module(module: &ModuleDecl) -> Self {
        Self {
            kind: RequirementKind::Module,
            ty: TypeRef::declared(module.name.as_str()),
            key: None,
            name: Arc::from(snake_case(module.name.simple_name())),
            nullable: false,
            has_default: module.instantiable,
        }
    }

    /// The requirement of a component dependency.
    #[must_use]
    pub fn dependency(name: &TypeName) -> Self {
        Self {
            kind: RequirementKind::Dependency,
            ty: TypeRef::declared(name.as_str()),
            key: None,
            name: Arc::from(snake_case(name.simple_name())),
            nullable: false,
            has_default: false,
        }
    }

    /// The requirement of an instance bound by a creator setter.
    #[must_use]
    pub fn bound_instance(param: &Param) -> Self {
        Self {
            kind: RequirementKind::BoundInstance,
            ty: param.ty.clone(),
            key: Some(Key::qualified(param.ty.clone(), param.qualifier.clone())),
            name: Arc::from(snake_case(&param.name)),
            nullable: param.nullable,
            has_default: param.nullable,
        }
    }

    /// Whether building fails when the creator did not receive this requirement.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !self.has_default
    }
}

/// What a component method does.
#[derive(Debug, Clone)]
pub enum ComponentMethodKind {
    /// Returns a value, or injects members when the request kind is members injection.
    EntryPoint {
        /// The request made by the method.
        request: DependencyRequest,
        /// Members-injection methods may return the injected instance.
        returns_instance: bool,
    },
    /// Creates a subcomponent from module instances.
    SubcomponentFactory {
        /// The created subcomponent.
        subcomponent: Arc<ComponentDescriptor>,
        /// The module requirements passed as arguments.
        params: Vec<ComponentRequirement>,
    },
    /// Returns the creator of a subcomponent.
    SubcomponentCreator {
        /// The created subcomponent.
        subcomponent: Arc<ComponentDescriptor>,
    },
}

/// One method of a component.
#[derive(Debug, Clone)]
pub struct ComponentMethodDescriptor {
    /// The method name.
    pub name: Arc<str>,
    /// What the method does.
    pub kind: ComponentMethodKind,
}

impl ComponentMethodDescriptor {
    /// The request of an entry point.
    #[must_use]
    pub const fn request(&self) -> Option<&DependencyRequest> {
        match &self.kind {
            ComponentMethodKind::EntryPoint { request, .. } => Some(request),
            _ => None,
        }
    }
}

/// A setter of a component creator and the requirement it fills.
#[derive(Debug, Clone)]
pub struct CreatorSetterDescriptor {
    /// The setter name.
    pub name: Arc<str>,
    /// The filled requirement.
    pub requirement: ComponentRequirement,
}

/// The creator of a component.
#[derive(Debug, Clone)]
pub struct CreatorDescriptor {
    /// The creator type.
    pub name: TypeName,
    /// Setters in declaration order.
    pub setters: Vec<CreatorSetterDescriptor>,
}

impl CreatorDescriptor {
    /// The bound-instance requirements.
    pub fn bound_instances(&self) -> impl Iterator<Item = &ComponentRequirement> {
        self.setters
            .iter()
            .map(|setter| &setter.requirement)
            .filter(|requirement| requirement.kind == RequirementKind::BoundInstance)
    }
}

/// The shape of one component.
#[derive(Debug)]
pub struct ComponentDescriptor {
    /// The component type.
    pub name: TypeName,
    /// Component or subcomponent, provision or production.
    pub kind: ComponentKind,
    /// Declared scopes; production components also carry the production scope.
    pub scopes: Vec<Scope>,
    /// Transitively installed modules.
    pub modules: Vec<Arc<ModuleDescriptor>>,
    /// Component dependencies.
    pub dependencies: Vec<ComponentRequirement>,
    /// Methods in declaration order. A method's index is its identity.
    pub methods: Vec<ComponentMethodDescriptor>,
    /// The declared creator.
    pub creator: Option<CreatorDescriptor>,
    /// Subcomponents made available by installed modules.
    pub module_subcomponents: Vec<Arc<Self>>,
}

impl ComponentDescriptor {
    /// Returns `true` for subcomponents.
    #[must_use]
    pub const fn is_subcomponent(&self) -> bool {
        self.kind.is_subcomponent()
    }

    /// Returns `true` for production components.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.kind.is_production()
    }

    /// Entry points with their method index.
    pub fn entry_points(&self) -> impl Iterator<Item = (usize, &DependencyRequest)> {
        self.methods
            .iter()
            .enumerate()
            .filter_map(|(index, method)| method.request().map(|request| (index, request)))
    }

    /// Subcomponents created through factory or creator methods, in method order.
    pub fn method_children(&self) -> impl Iterator<Item = &Arc<Self>> {
        self.methods.iter().filter_map(|method| match &method.kind {
            ComponentMethodKind::SubcomponentFactory { subcomponent, .. }
            | ComponentMethodKind::SubcomponentCreator { subcomponent } => Some(subcomponent),
            ComponentMethodKind::EntryPoint { .. } => None,
        })
    }

    /// The factory method that creates the subcomponent `child`.
    #[must_use]
    pub fn factory_method_for(&self, child: &TypeName) -> Option<&ComponentMethodDescriptor> {
        self.methods.iter().find(|method| {
            matches!(&method.kind, ComponentMethodKind::SubcomponentFactory { subcomponent, .. } if &subcomponent.name == child)
        })
    }

    /// Subcomponent creators returned by creator methods, with the method.
    pub fn creator_methods(&self) -> impl Iterator<Item = (&ComponentMethodDescriptor, &Arc<Self>)> {
        self.methods.iter().filter_map(|method| match &method.kind {
            ComponentMethodKind::SubcomponentCreator { subcomponent } => Some((method, subcomponent)),
            _ => None,
        })
    }

    /// Finds a subcomponent descriptor reachable from this component by name.
    #[must_use]
    pub fn child(&self, name: &TypeName) -> Option<&Arc<Self>> {
        self.method_children()
            .chain(&self.module_subcomponents)
            .find(|child| &child.name == name)
    }

    /// The bound-instance requirements of the creator.
    pub fn bound_instances(&self) -> impl Iterator<Item = &ComponentRequirement> {
        self.creator.iter().flat_map(CreatorDescriptor::bound_instances)
    }

    /// The requirement filled for a module, if the module is installed.
    #[must_use]
    pub fn module(&self, name: &TypeName) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.iter().find(|module| &module.name == name)
    }
}

/// Creates descriptors, reporting malformed declarations.
pub(crate) struct DescriptorFactory<'a, 'r> {
    declarations: &'a Declarations,
    factory: &'a BindingFactory<'a>,
    reporter: &'a mut Reporter<'r>,
    modules: HashMap<TypeName, Arc<ModuleDescriptor>>,
    in_progress: Vec<TypeName>,
}

impl<'a, 'r> DescriptorFactory<'a, 'r> {
    pub(crate) fn new(declarations: &'a Declarations, factory: &'a BindingFactory<'a>, reporter: &'a mut Reporter<'r>) -> Self {
        Self {
            declarations,
            factory,
            reporter,
            modules: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub(crate) fn component(&mut self, decl: &ComponentDecl) -> Arc<ComponentDescriptor> {
        event!(Level::TRACE, component = %decl.name, "creating component descriptor");
        self.in_progress.push(decl.name.clone());

        let mut scopes = decl.scopes.clone();
        if decl.kind.is_production() && !scopes.iter().any(Scope::is_production) {
            scopes.push(Scope::production());
        }
        let modules = self.transitive_modules(&decl.modules, &decl.name);
        let dependencies: Vec<_> = decl.dependencies.iter().map(ComponentRequirement::dependency).collect();
        let creator = decl
            .creator
            .as_ref()
            .map(|creator| self.creator(decl, creator, &modules, &dependencies));

        let mut methods: Vec<ComponentMethodDescriptor> = Vec::new();
        for method in &decl.methods {
            if methods.iter().any(|existing| existing.name == method.name) {
                // Same method inherited through several supertypes.
                continue;
            }
            if let Some(descriptor) = self.method(decl, method) {
                methods.push(descriptor);
            }
        }

        let mut module_subcomponents = Vec::new();
        for module in &modules {
            for subcomponent in &module.subcomponents {
                if module_subcomponents
                    .iter()
                    .any(|existing: &Arc<ComponentDescriptor>| &existing.name == subcomponent)
                {
                    continue;
                }
                if let Some(child) = self.subcomponent(subcomponent, &module.name) {
                    module_subcomponents.push(child);
                }
            }
        }

        self.in_progress.pop();
        Arc::new(ComponentDescriptor {
            name: decl.name.clone(),
            kind: decl.kind,
            scopes,
            modules,
            dependencies,
            methods,
            creator,
            module_subcomponents,
        })
    }

    fn subcomponent(&mut self, name: &TypeName, referenced_by: &TypeName) -> Option<Arc<ComponentDescriptor>> {
        let Some(decl) = self.declarations.component(name) else {
            self.reporter
                .error(format!("`{name}` is not a declared subcomponent"), Some(referenced_by.to_string()));
            return None;
        };
        if !decl.kind.is_subcomponent() {
            self.reporter.error(
                format!("`{name}` is a root component and cannot be installed as a subcomponent"),
                Some(referenced_by.to_string()),
            );
            return None;
        }
        if self.in_progress.contains(name) {
            self.reporter.error(
                format!("`{name}` is installed as a subcomponent of itself"),
                Some(referenced_by.to_string()),
            );
            return None;
        }
        Some(self.component(decl))
    }

    fn method(&mut self, component: &ComponentDecl, method: &ComponentMethodDecl) -> Option<ComponentMethodDescriptor> {
        let element = format!("{}::{}", component.name, method.name);
        let returned_name = method.return_type.as_ref().and_then(TypeRef::name);

        if let Some(returned) = returned_name {
            if method.params.is_empty()
                && let Some(child) = self.declarations.component_for_creator(returned)
                && child.kind.is_subcomponent()
            {
                let child_name = child.name.clone();
                let subcomponent = self.subcomponent(&child_name, &component.name)?;
                return Some(ComponentMethodDescriptor {
                    name: Arc::clone(&method.name),
                    kind: ComponentMethodKind::SubcomponentCreator { subcomponent },
                });
            }
            if self.declarations.component(returned).is_some_and(|child| child.kind.is_subcomponent()) {
                return self.factory_method(component, method, returned, &element);
            }
        }

        match (&method.return_type, method.params.as_slice()) {
            (Some(returned), []) => {
                let request = DependencyRequest::from_type(returned, method.qualifier.clone())
                    .with_element(&element)
                    .with_nullable(method.nullable);
                Some(ComponentMethodDescriptor {
                    name: Arc::clone(&method.name),
                    kind: ComponentMethodKind::EntryPoint {
                        request,
                        returns_instance: false,
                    },
                })
            }
            (returned, [target]) if returned.is_none() || returned.as_ref() == Some(&target.ty) => {
                let request = DependencyRequest::new(RequestKind::MembersInjection, Key::new(target.ty.clone()))
                    .with_element(&element);
                Some(ComponentMethodDescriptor {
                    name: Arc::clone(&method.name),
                    kind: ComponentMethodKind::EntryPoint {
                        request,
                        returns_instance: returned.is_some(),
                    },
                })
            }
            _ => {
                self.reporter.error(
                    format!(
                        "component method `{}` must return a value without parameters, inject the members of its \
                         single parameter, or create a subcomponent",
                        method.name
                    ),
                    Some(element),
                );
                None
            }
        }
    }

    fn factory_method(
        &mut self,
        component: &ComponentDecl,
        method: &ComponentMethodDecl,
        child_name: &TypeName,
        element: &str,
    ) -> Option<ComponentMethodDescriptor> {
        let mut params = Vec::new();
        for param in &method.params {
            let module = param.ty.name().and_then(|name| self.declarations.module(name));
            match module {
                Some(module) => params.push(ComponentRequirement {
                    name: Arc::from(snake_case(&param.name)),
                    ..ComponentRequirement::module(module)
                }),
                None => {
                    self.reporter.error(
                        format!(
                            "subcomponent factory method parameter `{}` must be a module, found `{}`",
                            param.name, param.ty
                        ),
                        Some(element.to_string()),
                    );
                    return None;
                }
            }
        }
        let subcomponent = self.subcomponent(child_name, &component.name)?;
        Some(ComponentMethodDescriptor {
            name: Arc::clone(&method.name),
            kind: ComponentMethodKind::SubcomponentFactory { subcomponent, params },
        })
    }

    fn creator(
        &mut self,
        component: &ComponentDecl,
        creator: &CreatorDecl,
        modules: &[Arc<ModuleDescriptor>],
        dependencies: &[ComponentRequirement],
    ) -> CreatorDescriptor {
        let mut setters = Vec::new();
        for setter in &creator.setters {
            let requirement = if setter.bind_instance {
                Some(ComponentRequirement::bound_instance(&setter.param))
            } else {
                let name = setter.param.ty.name();
                modules
                    .iter()
                    .find(|module| Some(&module.name) == name)
                    .map(|module| module.requirement())
                    .or_else(|| dependencies.iter().find(|dependency| dependency.ty == setter.param.ty).cloned())
            };
            match requirement {
                Some(requirement) => setters.push(CreatorSetterDescriptor {
                    name: Arc::clone(&setter.name),
                    requirement,
                }),
                None => self.reporter.error(
                    format!(
                        "creator setter `{}` takes `{}`, which is neither an installed module nor a dependency of `{}`",
                        setter.name, setter.param.ty, component.name
                    ),
                    Some(format!("{}::{}", creator.name, setter.name)),
                ),
            }
        }
        CreatorDescriptor {
            name: creator.name.clone(),
            setters,
        }
    }

    fn transitive_modules(&mut self, roots: &[TypeName], owner: &TypeName) -> Vec<Arc<ModuleDescriptor>> {
        let mut collected: Vec<Arc<ModuleDescriptor>> = Vec::new();
        let mut pending: Vec<(TypeName, TypeName)> = roots.iter().rev().map(|root| (root.clone(), owner.clone())).collect();
        while let Some((name, referenced_by)) = pending.pop() {
            if collected.iter().any(|module| module.name == name) {
                continue;
            }
            let Some(module) = self.module_descriptor(&name, &referenced_by) else {
                continue;
            };
            pending.extend(module.includes.iter().rev().map(|include| (include.clone(), name.clone())));
            collected.push(module);
        }
        collected
    }

    fn module_descriptor(&mut self, name: &TypeName, referenced_by: &TypeName) -> Option<Arc<ModuleDescriptor>> {
        if let Some(module) = self.modules.get(name) {
            return Some(Arc::clone(module));
        }
        let Some(decl) = self.declarations.module(name) else {
            self.reporter
                .error(format!("`{name}` is not a declared module"), Some(referenced_by.to_string()));
            return None;
        };
        let module = Arc::new(ModuleDescriptor::create(decl, self.factory));
        self.modules.insert(name.clone(), Arc::clone(&module));
        Some(module)
    }
}
