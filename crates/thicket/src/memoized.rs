// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

use parking_lot::ReentrantMutex;

use crate::Provider;

/// A double-checked, lazily initialized value.
///
/// The first caller of [`get_or_init`](Self::get_or_init) constructs the value while holding a
/// lock, every other caller (concurrent or later) receives a clone of that same value. If the
/// initializer panics, the panic propagates to the caller and the cell stays empty so that a later
/// call can try again.
///
/// Calling `get_or_init` again from inside the initializer on the same thread is a dependency
/// cycle between scoped bindings and panics instead of deadlocking.
pub struct Memoized<T> {
    value: OnceLock<T>,
    lock: ReentrantMutex<Cell<bool>>,
}

impl<T> Memoized<T> {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            lock: ReentrantMutex::new(Cell::new(false)),
        }
    }

    /// Returns `true` once the value has been constructed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T> Memoized<T>
where
    T: Clone,
{
    /// Returns a clone of the value, constructing it with `init` first if needed.
    ///
    /// # Panics
    ///
    /// Panics if `init` panics, or if `init` re-enters this cell on the same thread.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> T {
        if let Some(value) = self.value.get() {
            return value.clone();
        }

        let initializing = self.lock.lock();
        if let Some(value) = self.value.get() {
            return value.clone();
        }

        assert!(
            !initializing.replace(true),
            "scoped provider was invoked recursively while constructing its own instance"
        );
        let reset = ResetOnDrop(&*initializing);
        let value = init();
        drop(reset);

        self.value.get_or_init(|| value).clone()
    }
}

impl<T> Default for Memoized<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Memoized<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("is_initialized", &self.is_initialized())
            .finish()
    }
}

struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A provider that constructs its instance at most once and caches it.
///
/// This is how generated components scope bindings: the unscoped provider is wrapped once and
/// every request observes the same instance.
pub struct DoubleCheck<T> {
    provider: Arc<dyn Provider<T>>,
    cell: Memoized<T>,
}

impl<T> DoubleCheck<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps `provider` so that it is invoked at most once.
    #[must_use]
    pub fn provider(provider: Arc<dyn Provider<T>>) -> Arc<dyn Provider<T>> {
        Arc::new(Self {
            provider,
            cell: Memoized::new(),
        })
    }
}

impl<T> Provider<T> for DoubleCheck<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self) -> T {
        self.cell.get_or_init(|| self.provider.get())
    }
}

impl<T> Debug for DoubleCheck<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleCheck").field("cell", &self.cell).finish_non_exhaustive()
    }
}

/// A provider that caches its instance without locking.
///
/// Concurrent first calls may each construct an instance, but only one of them is kept and all
/// later calls observe it. Used for reusable bindings, where sharing is an optimization rather than
/// a guarantee.
pub struct SingleCheck<T> {
    provider: Arc<dyn Provider<T>>,
    value: OnceLock<T>,
}

impl<T> SingleCheck<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps `provider` so that its first result is reused.
    #[must_use]
    pub fn provider(provider: Arc<dyn Provider<T>>) -> Arc<dyn Provider<T>> {
        Arc::new(Self {
            provider,
            value: OnceLock::new(),
        })
    }
}

impl<T> Provider<T> for SingleCheck<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self) -> T {
        if let Some(value) = self.value.get() {
            return value.clone();
        }
        let fresh = self.provider.get();
        self.value.get_or_init(|| fresh).clone()
    }
}

impl<T> Debug for SingleCheck<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleCheck")
            .field("is_initialized", &self.value.get().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_provider(calls: &Arc<AtomicUsize>) -> Arc<dyn Provider<Arc<usize>>> {
        let calls = Arc::clone(calls);
        Arc::new(move || Arc::new(calls.fetch_add(1, Ordering::SeqCst)))
    }

    #[test]
    fn double_check_constructs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = DoubleCheck::provider(counting_provider(&calls));

        let first = provider.get();
        let second = provider.get();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_check_caches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = SingleCheck::provider(counting_provider(&calls));

        assert!(Arc::ptr_eq(&provider.get(), &provider.get()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_initializer_leaves_cell_empty() {
        let cell: Memoized<u32> = Memoized::new();

        let result = catch_unwind(AssertUnwindSafe(|| cell.get_or_init(|| panic!("boom"))));

        assert!(result.is_err());
        assert!(!cell.is_initialized());
        assert_eq!(cell.get_or_init(|| 3), 3);
    }

    #[test]
    #[should_panic]
    fn reentrant_initialization_panics() {
        let cell: Memoized<u32> = Memoized::new();
        cell.get_or_init(|| cell.get_or_init(|| 1) + 1);
    }
}
