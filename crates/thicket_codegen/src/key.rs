// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binding keys and the key transformations used during resolution.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::types::{TypeName, TypeRef, well_known};

/// Distinguishes otherwise identical keys, for example two differently configured clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Qualifier {
    /// The qualifier type.
    pub name: TypeName,
    /// The qualifier's value, if it carries one.
    pub value: Option<Arc<str>>,
}

impl Qualifier {
    /// A qualifier without a value.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new(name),
            value: None,
        }
    }

    /// A `thicket::Named` qualifier with the given value.
    #[must_use]
    pub fn named(value: impl AsRef<str>) -> Self {
        Self {
            name: TypeName::new("thicket::Named"),
            value: Some(Arc::from(value.as_ref())),
        }
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "#[{}({value:?})]", self.name.simple_name()),
            None => write!(f, "#[{}]", self.name.simple_name()),
        }
    }
}

/// Identifies one contribution to a set or map multibinding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributionId {
    /// The module declaring the contribution.
    pub module: TypeName,
    /// The contributing method.
    pub method: Arc<str>,
}

/// The identity of a binding target.
///
/// Two keys are the same binding target only if their types, qualifiers and multibinding
/// contribution identifiers are all equal. Primitive types are canonicalized to their declared form
/// on construction, so `i32` and its boxed form name the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    ty: TypeRef,
    qualifier: Option<Qualifier>,
    contribution: Option<ContributionId>,
}

impl Key {
    /// An unqualified key.
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty: ty.boxed(),
            qualifier: None,
            contribution: None,
        }
    }

    /// A key with an optional qualifier.
    #[must_use]
    pub fn qualified(ty: TypeRef, qualifier: Option<Qualifier>) -> Self {
        Self {
            ty: ty.boxed(),
            qualifier,
            contribution: None,
        }
    }

    /// This key marked as a contribution to a multibinding.
    #[must_use]
    pub fn with_contribution(self, contribution: ContributionId) -> Self {
        Self {
            contribution: Some(contribution),
            ..self
        }
    }

    /// This key without its multibinding contribution identifier.
    #[must_use]
    pub fn without_contribution(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            contribution: None,
        }
    }

    /// The same qualifier, different type.
    #[must_use]
    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self {
            ty: ty.boxed(),
            qualifier: self.qualifier.clone(),
            contribution: self.contribution.clone(),
        }
    }

    /// The bound type.
    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The qualifier, if any.
    #[must_use]
    pub const fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    /// The multibinding contribution identifier, if any.
    #[must_use]
    pub const fn contribution(&self) -> Option<&ContributionId> {
        self.contribution.as_ref()
    }

    /// `Set<T>` for a `Set<Produced<T>>` key, and more generally `Set<T>` for `Set<wrapper<T>>`.
    #[must_use]
    pub fn unwrap_set_key(&self, wrapper: &str) -> Option<Self> {
        let element = self.ty.as_set()?;
        let unwrapped = element.unwrap_in(wrapper)?;
        Some(self.with_type(TypeRef::set_of(unwrapped.clone())))
    }

    /// `Map<K, to<V>>` for a `Map<K, from<V>>` key.
    #[must_use]
    pub fn rewrap_map_key(&self, from: &str, to: &str) -> Option<Self> {
        let (key, value) = self.ty.as_map()?;
        let unwrapped = value.unwrap_in(from)?;
        Some(self.with_type(TypeRef::map_of(key.clone(), unwrapped.clone().wrapped_in(to))))
    }

    /// `Map<K, wrapper<V>>` for a `Map<K, V>` key whose values are not framework-wrapped already.
    #[must_use]
    pub fn wrap_map_value(&self, wrapper: &str) -> Option<Self> {
        let (key, value) = self.ty.as_map()?;
        if is_framework_wrapped(value) {
            return None;
        }
        Some(self.with_type(TypeRef::map_of(key.clone(), value.clone().wrapped_in(wrapper))))
    }

    /// `Map<K, V>` for a `Map<K, Provider<V>>` or `Map<K, Producer<V>>` key, otherwise the key
    /// itself.
    #[must_use]
    pub fn unwrap_map_value_type(&self) -> Self {
        if let Some((key, value)) = self.ty.as_map() {
            for wrapper in [well_known::PROVIDER, well_known::PRODUCER] {
                if let Some(unwrapped) = value.unwrap_in(wrapper) {
                    return self.with_type(TypeRef::map_of(key.clone(), unwrapped.clone()));
                }
            }
        }
        self.clone()
    }

    /// The map keys whose contributions can satisfy a request for this map with unwrapped values.
    ///
    /// For `Map<K, V>` these are `Map<K, Provider<V>>` and `Map<K, Producer<V>>`; for
    /// `Map<K, Produced<V>>` the `Produced` wrapper is rewrapped instead.
    #[must_use]
    pub fn implicit_framework_map_keys(&self) -> Vec<Self> {
        [well_known::PROVIDER, well_known::PRODUCER]
            .into_iter()
            .filter_map(|wrapper| {
                self.rewrap_map_key(well_known::PRODUCED, wrapper)
                    .or_else(|| self.wrap_map_value(wrapper))
            })
            .collect()
    }

    /// Every key whose declarations may satisfy a request for this key, the key itself first.
    #[must_use]
    pub fn keys_matching_request(&self) -> Vec<Self> {
        let mut keys = vec![self.clone()];
        let candidates = [
            self.unwrap_set_key(well_known::PRODUCED),
            self.rewrap_map_key(well_known::PRODUCER, well_known::PROVIDER),
            self.rewrap_map_key(well_known::PROVIDER, well_known::PRODUCER),
        ];
        for candidate in candidates.into_iter().flatten().chain(self.implicit_framework_map_keys()) {
            if !keys.contains(&candidate) {
                keys.push(candidate);
            }
        }
        keys
    }

    /// The key of `T` for an `Option<T>` key, looking through framework wrappers such as
    /// `Option<Provider<T>>`.
    #[must_use]
    pub fn unwrap_optional(&self) -> Option<Self> {
        let value = self.ty.as_optional()?;
        let kind = crate::request::RequestKind::of(value);
        Some(Self {
            ty: kind.extract_key_type(value).clone().boxed(),
            qualifier: self.qualifier.clone(),
            contribution: None,
        })
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{qualifier} ")?;
        }
        write!(f, "{}", self.ty)?;
        if let Some(contribution) = &self.contribution {
            write!(f, " (contributed by {}::{})", contribution.module, contribution.method)?;
        }
        Ok(())
    }
}

pub(crate) fn is_framework_wrapped(ty: &TypeRef) -> bool {
    [
        well_known::PROVIDER,
        well_known::PRODUCER,
        well_known::PRODUCED,
        well_known::LAZY,
    ]
    .into_iter()
    .any(|wrapper| ty.is_wrapped_in(wrapper))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::Primitive;

    fn string() -> TypeRef {
        TypeRef::declared("String")
    }

    fn handler() -> TypeRef {
        TypeRef::declared("crate::Handler")
    }

    #[test]
    fn primitive_and_boxed_keys_are_equal() {
        assert_eq!(
            Key::new(TypeRef::Primitive(Primitive::I64)),
            Key::new(TypeRef::declared("i64"))
        );
    }

    #[test]
    fn qualifier_and_contribution_distinguish_keys() {
        let plain = Key::new(handler());
        let qualified = Key::qualified(handler(), Some(Qualifier::named("admin")));
        let contributed = plain.clone().with_contribution(ContributionId {
            module: TypeName::new("crate::Handlers"),
            method: Arc::from("admin"),
        });

        assert_ne!(plain, qualified);
        assert_ne!(plain, contributed);
        assert_eq!(contributed.without_contribution(), plain);
    }

    #[test]
    fn map_request_matches_framework_value_keys() {
        let request = Key::new(TypeRef::map_of(string(), handler()));

        assert_eq!(
            request.keys_matching_request(),
            vec![
                request.clone(),
                Key::new(TypeRef::map_of(string(), handler().wrapped_in(well_known::PROVIDER))),
                Key::new(TypeRef::map_of(string(), handler().wrapped_in(well_known::PRODUCER))),
            ]
        );
    }

    #[test]
    fn producer_map_request_matches_provider_map() {
        let request = Key::new(TypeRef::map_of(string(), handler().wrapped_in(well_known::PRODUCER)));

        assert!(
            request
                .keys_matching_request()
                .contains(&Key::new(TypeRef::map_of(string(), handler().wrapped_in(well_known::PROVIDER))))
        );
    }

    #[test]
    fn produced_set_request_matches_plain_set() {
        let request = Key::new(TypeRef::set_of(handler().wrapped_in(well_known::PRODUCED)));

        assert_eq!(request.unwrap_set_key(well_known::PRODUCED), Some(Key::new(TypeRef::set_of(handler()))));
    }

    #[test]
    fn unwrap_map_value_type_strips_framework() {
        let key = Key::new(TypeRef::map_of(string(), handler().wrapped_in(well_known::PROVIDER)));

        assert_eq!(key.unwrap_map_value_type(), Key::new(TypeRef::map_of(string(), handler())));
    }

    #[test]
    fn unwrap_optional_looks_through_provider() {
        let key = Key::qualified(
            TypeRef::option_of(handler().wrapped_in(well_known::PROVIDER)),
            Some(Qualifier::named("a")),
        );

        assert_eq!(
            key.unwrap_optional(),
            Some(Key::qualified(handler(), Some(Qualifier::named("a"))))
        );
    }
}
