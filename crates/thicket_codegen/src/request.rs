// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dependency requests: what a consumer asks for and how it wants to receive it.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::key::{Key, Qualifier};
use crate::types::{TypeRef, well_known};

/// How a consumer receives a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    /// The value itself.
    Instance,
    /// `Arc<dyn Provider<T>>`.
    Provider,
    /// `Lazy<T>`.
    Lazy,
    /// `Arc<dyn Provider<Lazy<T>>>`.
    ProviderOfLazy,
    /// `Arc<dyn Producer<T>>`.
    Producer,
    /// `Produced<T>`, the result of a production including its failure.
    Produced,
    /// `ProducerFuture<T>`.
    Future,
    /// Injection of the members of an existing instance.
    MembersInjection,
}

impl RequestKind {
    /// The kind implied by a requested type.
    ///
    /// Members injection is never implied by a type; it is only requested by members-injection
    /// entry points.
    #[must_use]
    pub fn of(ty: &TypeRef) -> Self {
        if let Some(provided) = ty.unwrap_in(well_known::PROVIDER) {
            if provided.is_wrapped_in(well_known::LAZY) {
                return Self::ProviderOfLazy;
            }
            return Self::Provider;
        }
        if ty.is_wrapped_in(well_known::LAZY) {
            Self::Lazy
        } else if ty.is_wrapped_in(well_known::PRODUCER) {
            Self::Producer
        } else if ty.is_wrapped_in(well_known::PRODUCED) {
            Self::Produced
        } else if ty.is_wrapped_in(well_known::PRODUCER_FUTURE) {
            Self::Future
        } else {
            Self::Instance
        }
    }

    /// Strips the wrapper implied by this kind from a requested type.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is not wrapped the way this kind requires.
    #[must_use]
    pub fn extract_key_type<'a>(self, ty: &'a TypeRef) -> &'a TypeRef {
        let unwrap = |ty: &'a TypeRef, wrapper: &str| {
            ty.unwrap_in(wrapper)
                .unwrap_or_else(|| unreachable!("internal error: {ty} is not wrapped in {wrapper}"))
        };
        match self {
            Self::Instance | Self::MembersInjection => ty,
            Self::Provider => unwrap(ty, well_known::PROVIDER),
            Self::Lazy => unwrap(ty, well_known::LAZY),
            Self::ProviderOfLazy => unwrap(unwrap(ty, well_known::PROVIDER), well_known::LAZY),
            Self::Producer => unwrap(ty, well_known::PRODUCER),
            Self::Produced => unwrap(ty, well_known::PRODUCED),
            Self::Future => unwrap(ty, well_known::PRODUCER_FUTURE),
        }
    }

    /// The type a consumer of this kind receives for a key type.
    #[must_use]
    pub fn request_type(self, key_type: &TypeRef) -> TypeRef {
        let key_type = key_type.clone();
        match self {
            Self::Instance | Self::MembersInjection => key_type,
            Self::Provider => key_type.wrapped_in(well_known::PROVIDER),
            Self::Lazy => key_type.wrapped_in(well_known::LAZY),
            Self::ProviderOfLazy => key_type.wrapped_in(well_known::LAZY).wrapped_in(well_known::PROVIDER),
            Self::Producer => key_type.wrapped_in(well_known::PRODUCER),
            Self::Produced => key_type.wrapped_in(well_known::PRODUCED),
            Self::Future => key_type.wrapped_in(well_known::PRODUCER_FUTURE),
        }
    }

    /// Returns `true` for kinds that can only be satisfied inside a production component.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Producer | Self::Produced | Self::Future)
    }

    /// Returns `true` for kinds that defer access to the value, breaking dependency cycles.
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        matches!(self, Self::Provider | Self::Lazy | Self::ProviderOfLazy | Self::Producer)
    }
}

/// The framework type a binding is exposed through when it needs a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkType {
    /// `Arc<dyn Provider<T>>`.
    Provider,
    /// `Arc<dyn Producer<T>>`.
    Producer,
}

impl FrameworkType {
    /// The request kind that obtains this framework type directly.
    #[must_use]
    pub const fn request_kind(self) -> RequestKind {
        match self {
            Self::Provider => RequestKind::Provider,
            Self::Producer => RequestKind::Producer,
        }
    }

    /// The wrapper's type name.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Provider => well_known::PROVIDER,
            Self::Producer => well_known::PRODUCER,
        }
    }
}

/// Which kind of binding satisfies a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKey {
    /// A contribution binding satisfying the key.
    Contribution(Key),
    /// The members-injection binding of the key's type.
    MembersInjection(Key),
}

impl BindingKey {
    /// The key, regardless of binding kind.
    #[must_use]
    pub const fn key(&self) -> &Key {
        match self {
            Self::Contribution(key) | Self::MembersInjection(key) => key,
        }
    }
}

impl Display for BindingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contribution(key) => write!(f, "{key}"),
            Self::MembersInjection(key) => write!(f, "members of {key}"),
        }
    }
}

/// A request that cannot be turned into a dependency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// A framework type was requested with a wildcard argument, as in `Provider<_>`.
    #[error("`{requested}` cannot be requested: framework types must name their value type")]
    WildcardFrameworkRequest {
        /// The requested type.
        requested: TypeRef,
    },
}

/// One consumption point of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRequest {
    /// How the value is received.
    pub kind: RequestKind,
    /// What is requested.
    pub key: Key,
    /// The parameter, field or method that makes the request.
    pub element: Option<Arc<str>>,
    /// Whether the consumer accepts an absent value.
    pub nullable: bool,
}

impl DependencyRequest {
    /// Creates a request of the given kind for a key.
    #[must_use]
    pub const fn new(kind: RequestKind, key: Key) -> Self {
        Self {
            kind,
            key,
            element: None,
            nullable: false,
        }
    }

    /// Creates a request from a requested type, inferring the kind from its framework wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::WildcardFrameworkRequest`] for framework types with a wildcard
    /// argument.
    pub fn try_from_type(ty: &TypeRef, qualifier: Option<Qualifier>) -> Result<Self, RequestError> {
        let kind = RequestKind::of(ty);
        let key_type = kind.extract_key_type(ty);
        if kind != RequestKind::Instance && matches!(key_type, TypeRef::Wildcard) {
            return Err(RequestError::WildcardFrameworkRequest { requested: ty.clone() });
        }
        Ok(Self::new(kind, Key::qualified(key_type.clone(), qualifier)))
    }

    /// Like [`try_from_type`](Self::try_from_type) for requests already validated, keeping a
    /// wildcard as the key type.
    #[must_use]
    pub fn from_type(ty: &TypeRef, qualifier: Option<Qualifier>) -> Self {
        let kind = RequestKind::of(ty);
        Self::new(kind, Key::qualified(kind.extract_key_type(ty).clone(), qualifier))
    }

    /// Records the requesting element.
    #[must_use]
    pub fn with_element(self, element: impl AsRef<str>) -> Self {
        Self {
            element: Some(Arc::from(element.as_ref())),
            ..self
        }
    }

    /// Marks the request as accepting an absent value.
    #[must_use]
    pub fn with_nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }

    /// The binding key this request resolves against.
    #[must_use]
    pub fn binding_key(&self) -> BindingKey {
        match self.kind {
            RequestKind::MembersInjection => BindingKey::MembersInjection(self.key.clone()),
            _ => BindingKey::Contribution(self.key.clone()),
        }
    }

    /// The type the consumer receives.
    #[must_use]
    pub fn requested_type(&self) -> TypeRef {
        self.kind.request_type(self.key.ty())
    }
}

impl Display for DependencyRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.element {
            Some(element) => write!(f, "{element} requests {}", self.requested_type()),
            None => write!(f, "{}", self.requested_type()),
        }
    }
}
