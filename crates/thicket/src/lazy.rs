// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::{Memoized, Provider};

/// A value computed on first use and cached afterwards.
///
/// Each `Lazy` caches independently: two `Lazy` handles obtained from the same unscoped provider
/// construct two instances. Clones of one `Lazy` share its cache.
pub struct Lazy<T> {
    inner: Arc<LazyInner<T>>,
}

struct LazyInner<T> {
    provider: Arc<dyn Provider<T>>,
    cell: Memoized<T>,
}

impl<T> Lazy<T>
where
    T: Clone,
{
    /// Creates a lazy value backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider<T>>) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                provider,
                cell: Memoized::new(),
            }),
        }
    }

    /// Returns the value, computing it on the first call.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.cell.get_or_init(|| self.inner.provider.get())
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Lazy<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lazy").field("cell", &self.inner.cell).finish_non_exhaustive()
    }
}

/// A provider of fresh [`Lazy`] handles over the same underlying provider.
pub struct ProviderOfLazy<T> {
    provider: Arc<dyn Provider<T>>,
}

impl<T> ProviderOfLazy<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a provider whose instances are new `Lazy` values backed by `provider`.
    #[must_use]
    pub fn create(provider: Arc<dyn Provider<T>>) -> Arc<dyn Provider<Lazy<T>>> {
        Arc::new(Self { provider })
    }
}

impl<T> Provider<Lazy<T>> for ProviderOfLazy<T>
where
    T: Clone,
{
    fn get(&self) -> Lazy<T> {
        Lazy::new(Arc::clone(&self.provider))
    }
}

impl<T> Debug for ProviderOfLazy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOfLazy").finish_non_exhaustive()
    }
}
