// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Produces instances of `T` on demand.
///
/// Generated components hold their providers as `Arc<dyn Provider<T>>`. Any `Fn() -> T` closure
/// that is `Send + Sync` is a provider, which is how generated code builds most of them.
pub trait Provider<T>: Send + Sync {
    /// Returns an instance of `T`.
    ///
    /// Unscoped providers return a new instance on every call, scoped providers return a clone of
    /// the cached instance.
    fn get(&self) -> T;
}

impl<T, F> Provider<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn get(&self) -> T {
        self()
    }
}

/// Boxes a closure as a shareable provider.
///
/// Generated code uses this instead of `Arc::new` so that the provider's type is fixed to
/// `Arc<dyn Provider<T>>` where it is created.
pub fn provider_fn<T, F>(provide: F) -> Arc<dyn Provider<T>>
where
    F: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(provide)
}

/// A provider that always returns a clone of the same instance.
///
/// Used for component requirements such as bound instances and component dependencies.
pub struct InstanceFactory<T> {
    instance: T,
}

impl<T> InstanceFactory<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a provider for `instance`.
    #[must_use]
    pub fn create(instance: T) -> Arc<dyn Provider<T>> {
        Arc::new(Self { instance })
    }
}

impl<T> Provider<T> for InstanceFactory<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self) -> T {
        self.instance.clone()
    }
}

impl<T> Debug for InstanceFactory<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceFactory").finish_non_exhaustive()
    }
}
