// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The declarations a front end discovers and hands to the generator.
//!
//! Every item is a plain value. The `with_*` methods make it convenient to assemble
//! declarations by hand, which is how tests and small front ends use this module.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use proc_macro2::{Literal, TokenStream};
use quote::{ToTokens, quote};

use crate::key::Qualifier;
use crate::types::{TypeName, TypeRef, well_known};

/// A lifetime marker that memoizes bindings per component instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Scope {
    /// The scope marker type.
    pub name: TypeName,
}

impl Scope {
    /// A scope named by its marker type.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
        }
    }

    /// `thicket::Singleton`.
    #[must_use]
    pub fn singleton() -> Self {
        Self::new("thicket::Singleton")
    }

    /// `thicket::Reusable`, cached by whichever component first needs it.
    #[must_use]
    pub fn reusable() -> Self {
        Self::new(well_known::REUSABLE)
    }

    /// The scope every production component carries.
    #[must_use]
    pub fn production() -> Self {
        Self::new(well_known::PRODUCTION_SCOPE)
    }

    /// Returns `true` for the reusable scope.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.name.as_str() == well_known::REUSABLE
    }

    /// Returns `true` for the production scope.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.name.as_str() == well_known::PRODUCTION_SCOPE
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#[{}]", self.name.simple_name())
    }
}

/// A parameter or field that receives an injected value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// The parameter or field name.
    pub name: Arc<str>,
    /// The requested type, possibly wrapped in a framework type.
    pub ty: TypeRef,
    /// The qualifier of the requested key.
    pub qualifier: Option<Qualifier>,
    /// Whether an absent value is accepted.
    pub nullable: bool,
}

impl Param {
    /// An unqualified, non-nullable parameter.
    #[must_use]
    pub fn new(name: impl AsRef<str>, ty: TypeRef) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            ty,
            qualifier: None,
            nullable: false,
        }
    }

    /// Sets the qualifier.
    #[must_use]
    pub fn qualified(self, qualifier: Qualifier) -> Self {
        Self {
            qualifier: Some(qualifier),
            ..self
        }
    }

    /// Marks the parameter as accepting an absent value.
    #[must_use]
    pub fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }
}

/// The constructor of an injectable class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constructor {
    /// The associated function name, usually `new`.
    pub name: Arc<str>,
    /// The injected parameters.
    pub params: Vec<Param>,
}

/// What a class member is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A field, injected by assignment.
    Field(Param),
    /// A method, injected by calling it with its parameters.
    Method(Vec<Param>),
}

/// A field or method of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberDecl {
    /// The member name.
    pub name: Arc<str>,
    /// Field or method.
    pub kind: MemberKind,
    /// Whether the member is marked for injection.
    pub injected: bool,
    /// Private members are never injected.
    pub is_private: bool,
    /// Associated (static) members are never injected.
    pub is_static: bool,
}

impl MemberDecl {
    /// An injected field.
    #[must_use]
    pub fn injected_field(param: Param) -> Self {
        Self {
            name: Arc::clone(&param.name),
            kind: MemberKind::Field(param),
            injected: true,
            is_private: false,
            is_static: false,
        }
    }

    /// An injected method.
    #[must_use]
    pub fn injected_method(name: impl AsRef<str>, params: Vec<Param>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            kind: MemberKind::Method(params),
            injected: true,
            is_private: false,
            is_static: false,
        }
    }

    /// A method that is not marked for injection; it can still override an injected one.
    #[must_use]
    pub fn plain_method(name: impl AsRef<str>) -> Self {
        Self {
            injected: false,
            ..Self::injected_method(name, Vec::new())
        }
    }

    /// Marks the member private.
    #[must_use]
    pub fn private(self) -> Self {
        Self {
            is_private: true,
            ..self
        }
    }

    /// Marks the member static.
    #[must_use]
    pub fn associated(self) -> Self {
        Self { is_static: true, ..self }
    }

    /// Returns `true` for methods.
    #[must_use]
    pub const fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method(_))
    }
}

/// A class (struct) that may be injected, members-injected or used as a component dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDecl {
    /// The class name.
    pub name: TypeName,
    /// The class's type parameters.
    pub type_params: Vec<Arc<str>>,
    /// Abstract classes and traits cannot be constructed.
    pub is_abstract: bool,
    /// The direct superclass, in terms of this class's type parameters.
    pub superclass: Option<TypeRef>,
    /// Implemented traits, in terms of this class's type parameters.
    pub implements: Vec<TypeRef>,
    /// The scope declared on the class.
    pub scope: Option<Scope>,
    /// The injection constructor, if the class has one.
    pub constructor: Option<Constructor>,
    /// Declared members in declaration order.
    pub members: Vec<MemberDecl>,
    /// Methods exposed to components that depend on this type.
    pub provision_methods: Vec<ComponentMethodDecl>,
}

impl ClassDecl {
    /// A concrete class without type parameters or members.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
            type_params: Vec::new(),
            is_abstract: false,
            superclass: None,
            implements: Vec::new(),
            scope: None,
            constructor: None,
            members: Vec::new(),
            provision_methods: Vec::new(),
        }
    }

    /// Adds type parameters.
    #[must_use]
    pub fn with_type_params<I, S>(self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            type_params: params.into_iter().map(|param| Arc::from(param.as_ref())).collect(),
            ..self
        }
    }

    /// Marks the class abstract.
    #[must_use]
    pub fn abstract_class(self) -> Self {
        Self {
            is_abstract: true,
            ..self
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn with_superclass(self, superclass: TypeRef) -> Self {
        Self {
            superclass: Some(superclass),
            ..self
        }
    }

    /// Adds an implemented trait.
    #[must_use]
    pub fn implementing(mut self, supertype: TypeRef) -> Self {
        self.implements.push(supertype);
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self
        }
    }

    /// Adds an injection constructor named `new`.
    #[must_use]
    pub fn with_constructor(self, params: Vec<Param>) -> Self {
        Self {
            constructor: Some(Constructor {
                name: Arc::from("new"),
                params,
            }),
            ..self
        }
    }

    /// Adds a member.
    #[must_use]
    pub fn with_member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    /// Adds a provision method exposed to dependent components.
    #[must_use]
    pub fn with_provision_method(mut self, method: ComponentMethodDecl) -> Self {
        self.provision_methods.push(method);
        self
    }

    /// The class as a type, with its type parameters as variables.
    #[must_use]
    pub fn as_type(&self) -> TypeRef {
        TypeRef::generic(
            self.name.as_str(),
            self.type_params.iter().map(|param| TypeRef::Variable(Arc::clone(param))).collect(),
        )
    }
}

/// How a binding method contributes to its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Contribution {
    /// The method is the only binding of its key.
    Unique,
    /// The returned value is one element of a `Set<T>`.
    IntoSet,
    /// The returned `Set<T>` is merged into a `Set<T>`.
    ElementsIntoSet,
    /// The returned value is one entry of a `Map<K, V>`.
    IntoMap(MapKey),
}

/// The key of a map contribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapKey {
    /// The map's key type.
    pub ty: TypeRef,
    /// The entry's key.
    pub value: MapKeyValue,
}

impl MapKey {
    /// A `String` map key.
    #[must_use]
    pub fn str(value: impl AsRef<str>) -> Self {
        Self {
            ty: TypeRef::declared("String"),
            value: MapKeyValue::Str(Arc::from(value.as_ref())),
        }
    }

    /// An `i64` map key.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self {
            ty: TypeRef::declared("i64"),
            value: MapKeyValue::Int(value),
        }
    }
}

/// The literal value of a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKeyValue {
    /// A string, rendered as an owned `String`.
    Str(Arc<str>),
    /// An integer literal.
    Int(i64),
    /// A boolean literal.
    Bool(bool),
    /// A path to a constant or enum variant.
    Path(TypeName),
}

impl ToTokens for MapKeyValue {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            Self::Str(value) => {
                let literal = Literal::string(value);
                quote!(::std::string::String::from(#literal)).to_tokens(tokens);
            }
            Self::Int(value) => Literal::i64_unsuffixed(*value).to_tokens(tokens),
            Self::Bool(value) => value.to_tokens(tokens),
            Self::Path(path) => path.path_tokens().to_tokens(tokens),
        }
    }
}

impl Display for MapKeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

/// The kind of a module binding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMethodKind {
    /// Computes a value synchronously.
    Provides,
    /// Computes a value asynchronously in a production component.
    Produces,
    /// Aliases its single parameter's key.
    Binds,
    /// Declares a possibly empty multibinding.
    Multibinds,
    /// Declares an optional binding of its return type.
    BindsOptionalOf,
}

/// A binding method of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingMethodDecl {
    /// The method name.
    pub name: Arc<str>,
    /// What the method declares.
    pub kind: BindingMethodKind,
    /// How the method contributes to its key.
    pub contribution: Contribution,
    /// The declared return type.
    pub return_type: TypeRef,
    /// The qualifier of the bound key.
    pub qualifier: Option<Qualifier>,
    /// The scope of the binding.
    pub scope: Option<Scope>,
    /// Parameters, each one a dependency.
    pub params: Vec<Param>,
    /// Whether the method may return an absent value.
    pub nullable: bool,
    /// Associated functions need no module instance.
    pub is_static: bool,
}

impl BindingMethodDecl {
    fn new(kind: BindingMethodKind, name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            kind,
            contribution: Contribution::Unique,
            return_type,
            qualifier: None,
            scope: None,
            params: Vec::new(),
            nullable: false,
            is_static: true,
        }
    }

    /// A `provides` method.
    #[must_use]
    pub fn provides(name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self::new(BindingMethodKind::Provides, name, return_type)
    }

    /// A `produces` method.
    #[must_use]
    pub fn produces(name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self::new(BindingMethodKind::Produces, name, return_type)
    }

    /// A `binds` method aliasing `param` as `return_type`.
    #[must_use]
    pub fn binds(name: impl AsRef<str>, return_type: TypeRef, param: Param) -> Self {
        Self::new(BindingMethodKind::Binds, name, return_type).with_params(vec![param])
    }

    /// A `multibinds` declaration of a set or map type.
    #[must_use]
    pub fn multibinds(name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self::new(BindingMethodKind::Multibinds, name, return_type)
    }

    /// An optional binding declaration.
    #[must_use]
    pub fn binds_optional_of(name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self::new(BindingMethodKind::BindsOptionalOf, name, return_type)
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_params(self, params: Vec<Param>) -> Self {
        Self { params, ..self }
    }

    /// Sets how the method contributes.
    #[must_use]
    pub fn contributing(self, contribution: Contribution) -> Self {
        Self { contribution, ..self }
    }

    /// Sets the qualifier.
    #[must_use]
    pub fn qualified(self, qualifier: Qualifier) -> Self {
        Self {
            qualifier: Some(qualifier),
            ..self
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn scoped(self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self
        }
    }

    /// Marks the result as possibly absent.
    #[must_use]
    pub fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    /// Makes the method require a module instance.
    #[must_use]
    pub fn instance_method(self) -> Self {
        Self {
            is_static: false,
            ..self
        }
    }
}

/// A module: a group of binding methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDecl {
    /// The module type.
    pub name: TypeName,
    /// Whether this is a producer module.
    pub is_producer: bool,
    /// Modules installed along with this one.
    pub includes: Vec<TypeName>,
    /// Subcomponents whose creators this module makes available.
    pub subcomponents: Vec<TypeName>,
    /// Binding methods in declaration order.
    pub methods: Vec<BindingMethodDecl>,
    /// Whether an instance can be created with `Default`.
    pub instantiable: bool,
}

impl ModuleDecl {
    /// An empty, default-instantiable module.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
            is_producer: false,
            includes: Vec::new(),
            subcomponents: Vec::new(),
            methods: Vec::new(),
            instantiable: true,
        }
    }

    /// An empty producer module.
    #[must_use]
    pub fn producer(name: impl AsRef<str>) -> Self {
        Self {
            is_producer: true,
            ..Self::new(name)
        }
    }

    /// Adds a binding method.
    #[must_use]
    pub fn with_method(mut self, method: BindingMethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Includes another module.
    #[must_use]
    pub fn including(mut self, module: impl AsRef<str>) -> Self {
        self.includes.push(TypeName::new(module));
        self
    }

    /// Declares a subcomponent.
    #[must_use]
    pub fn with_subcomponent(mut self, subcomponent: impl AsRef<str>) -> Self {
        self.subcomponents.push(TypeName::new(subcomponent));
        self
    }

    /// Requires the module instance to be supplied to the component creator.
    #[must_use]
    pub fn not_instantiable(self) -> Self {
        Self {
            instantiable: false,
            ..self
        }
    }
}

/// The kind of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// A root component.
    Component,
    /// A component created from a parent.
    Subcomponent,
    /// A root component that can run productions.
    ProductionComponent,
    /// A subcomponent that can run productions.
    ProductionSubcomponent,
}

impl ComponentKind {
    /// Returns `true` for subcomponent kinds.
    #[must_use]
    pub const fn is_subcomponent(self) -> bool {
        matches!(self, Self::Subcomponent | Self::ProductionSubcomponent)
    }

    /// Returns `true` for production kinds.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::ProductionComponent | Self::ProductionSubcomponent)
    }
}

/// A method of a component or of a component dependency type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentMethodDecl {
    /// The method name.
    pub name: Arc<str>,
    /// The return type, `None` for methods returning `()`.
    pub return_type: Option<TypeRef>,
    /// The qualifier of the returned key.
    pub qualifier: Option<Qualifier>,
    /// The parameters.
    pub params: Vec<Param>,
    /// Whether the returned value may be absent.
    pub nullable: bool,
}

impl ComponentMethodDecl {
    /// A method without parameters returning `return_type`.
    #[must_use]
    pub fn new(name: impl AsRef<str>, return_type: TypeRef) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            return_type: Some(return_type),
            qualifier: None,
            params: Vec::new(),
            nullable: false,
        }
    }

    /// A members-injection method taking the instance to inject.
    #[must_use]
    pub fn members_injection(name: impl AsRef<str>, target: TypeRef) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            return_type: None,
            qualifier: None,
            params: vec![Param::new("instance", target)],
            nullable: false,
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_params(self, params: Vec<Param>) -> Self {
        Self { params, ..self }
    }

    /// Sets the qualifier.
    #[must_use]
    pub fn qualified(self, qualifier: Qualifier) -> Self {
        Self {
            qualifier: Some(qualifier),
            ..self
        }
    }

    /// Marks the returned value as possibly absent.
    #[must_use]
    pub fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }
}

/// A setter of a component creator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreatorSetter {
    /// The setter name.
    pub name: Arc<str>,
    /// The value passed to the setter.
    pub param: Param,
    /// Whether the value is bound into the graph rather than being a module or dependency.
    pub bind_instance: bool,
}

/// The builder that creates a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreatorDecl {
    /// The builder type.
    pub name: TypeName,
    /// Setters in declaration order.
    pub setters: Vec<CreatorSetter>,
}

impl CreatorDecl {
    /// A builder without setters.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
            setters: Vec::new(),
        }
    }

    /// Adds a setter for a module or dependency.
    #[must_use]
    pub fn with_setter(mut self, name: impl AsRef<str>, ty: TypeRef) -> Self {
        self.setters.push(CreatorSetter {
            name: Arc::from(name.as_ref()),
            param: Param::new(name, ty),
            bind_instance: false,
        });
        self
    }

    /// Adds a setter that binds its argument into the graph.
    #[must_use]
    pub fn with_bound_instance(mut self, param: Param) -> Self {
        self.setters.push(CreatorSetter {
            name: Arc::clone(&param.name),
            param,
            bind_instance: true,
        });
        self
    }
}

/// A component or subcomponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentDecl {
    /// The component type.
    pub name: TypeName,
    /// Component or subcomponent, provision or production.
    pub kind: ComponentKind,
    /// The scopes whose bindings this component caches.
    pub scopes: Vec<Scope>,
    /// Installed modules.
    pub modules: Vec<TypeName>,
    /// Types whose provision methods become bindings.
    pub dependencies: Vec<TypeName>,
    /// Entry points, subcomponent factory methods and members-injection methods.
    pub methods: Vec<ComponentMethodDecl>,
    /// The creator, if the component declares one.
    pub creator: Option<CreatorDecl>,
}

impl ComponentDecl {
    fn with_kind(kind: ComponentKind, name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
            kind,
            scopes: Vec::new(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            methods: Vec::new(),
            creator: None,
        }
    }

    /// A root component.
    #[must_use]
    pub fn component(name: impl AsRef<str>) -> Self {
        Self::with_kind(ComponentKind::Component, name)
    }

    /// A subcomponent.
    #[must_use]
    pub fn subcomponent(name: impl AsRef<str>) -> Self {
        Self::with_kind(ComponentKind::Subcomponent, name)
    }

    /// A production component.
    #[must_use]
    pub fn production_component(name: impl AsRef<str>) -> Self {
        Self::with_kind(ComponentKind::ProductionComponent, name)
    }

    /// A production subcomponent.
    #[must_use]
    pub fn production_subcomponent(name: impl AsRef<str>) -> Self {
        Self::with_kind(ComponentKind::ProductionSubcomponent, name)
    }

    /// Adds a scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Installs a module.
    #[must_use]
    pub fn with_module(mut self, module: impl AsRef<str>) -> Self {
        self.modules.push(TypeName::new(module));
        self
    }

    /// Adds a component dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: impl AsRef<str>) -> Self {
        self.dependencies.push(TypeName::new(dependency));
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn with_method(mut self, method: ComponentMethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Sets the creator.
    #[must_use]
    pub fn with_creator(self, creator: CreatorDecl) -> Self {
        Self {
            creator: Some(creator),
            ..self
        }
    }
}

/// Everything the front end discovered in one processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    /// Injectable classes and component dependency types.
    pub classes: Vec<ClassDecl>,
    /// Modules.
    pub modules: Vec<ModuleDecl>,
    /// Components and subcomponents.
    pub components: Vec<ComponentDecl>,
}

impl Declarations {
    /// No declarations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: ClassDecl) -> Self {
        self.classes.push(class);
        self
    }

    /// Adds a module.
    #[must_use]
    pub fn with_module(mut self, module: ModuleDecl) -> Self {
        self.modules.push(module);
        self
    }

    /// Adds a component.
    #[must_use]
    pub fn with_component(mut self, component: ComponentDecl) -> Self {
        self.components.push(component);
        self
    }

    /// Finds a class by name.
    #[must_use]
    pub fn class(&self, name: &TypeName) -> Option<&ClassDecl> {
        self.classes.iter().find(|class| &class.name == name)
    }

    /// Finds a module by name.
    #[must_use]
    pub fn module(&self, name: &TypeName) -> Option<&ModuleDecl> {
        self.modules.iter().find(|module| &module.name == name)
    }

    /// Finds a component by name.
    #[must_use]
    pub fn component(&self, name: &TypeName) -> Option<&ComponentDecl> {
        self.components.iter().find(|component| &component.name == name)
    }

    /// Finds the component created by the creator named `creator`.
    #[must_use]
    pub fn component_for_creator(&self, creator: &TypeName) -> Option<&ComponentDecl> {
        self.components
            .iter()
            .find(|component| component.creator.as_ref().is_some_and(|decl| &decl.name == creator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_type_uses_type_params() {
        let class = ClassDecl::new("crate::Repo").with_type_params(["T"]);

        assert_eq!(class.as_type(), TypeRef::generic("crate::Repo", vec![TypeRef::variable("T")]));
    }

    #[test]
    fn map_key_literals() {
        assert_eq!(
            MapKeyValue::Str(Arc::from("a")).to_token_stream().to_string(),
            quote!(::std::string::String::from("a")).to_string()
        );
        assert_eq!(MapKeyValue::Int(7).to_token_stream().to_string(), "7");
    }

    #[test]
    fn lookup_by_creator() {
        let declarations = Declarations::new().with_component(
            ComponentDecl::subcomponent("crate::Request").with_creator(CreatorDecl::new("crate::RequestBuilder")),
        );

        assert_eq!(
            declarations
                .component_for_creator(&TypeName::new("crate::RequestBuilder"))
                .map(|component| component.name.as_str()),
            Some("crate::Request")
        );
    }
}
