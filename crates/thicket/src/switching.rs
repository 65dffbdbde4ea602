// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::Provider;

/// A shared dispatcher that constructs instances for many providers by integer id.
///
/// Components generated in fast-init mode implement this once per group of up to 10,000
/// bindings instead of allocating one provider type per binding.
pub trait Dispatch: Send + Sync {
    /// Constructs the instance bound to `id`.
    fn dispatch(&self, id: usize) -> Box<dyn Any + Send>;
}

/// A provider that forwards to a [`Dispatch`] with a fixed id.
pub struct SwitchingProvider<T> {
    dispatch: Arc<dyn Dispatch>,
    id: usize,
    _instance: PhantomData<fn() -> T>,
}

impl<T> SwitchingProvider<T>
where
    T: Send + 'static,
{
    /// Creates the provider for binding `id` of `dispatch`.
    #[must_use]
    pub fn create(dispatch: Arc<dyn Dispatch>, id: usize) -> Arc<dyn Provider<T>> {
        Arc::new(Self {
            dispatch,
            id,
            _instance: PhantomData,
        })
    }
}

impl<T> Provider<T> for SwitchingProvider<T>
where
    T: Send + 'static,
{
    #[expect(clippy::panic, reason = "a type mismatch means the dispatcher was generated incorrectly")]
    fn get(&self) -> T {
        match self.dispatch.dispatch(self.id).downcast::<T>() {
            Ok(instance) => *instance,
            Err(_) => panic!("switching provider id {} is bound to a different type", self.id),
        }
    }
}

impl<T> Debug for SwitchingProvider<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchingProvider").field("id", &self.id).finish_non_exhaustive()
    }
}
