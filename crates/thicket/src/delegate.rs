// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

use crate::{Producer, ProducerFuture, Provider};

/// A provider that forwards to another provider installed after construction.
///
/// Generated components use it to break dependency cycles during initialization: a provider that
/// is still being built is handed out as a `DelegateFactory`, and the real provider is installed
/// once it exists.
pub struct DelegateFactory<T> {
    delegate: OnceLock<Arc<dyn Provider<T>>>,
}

impl<T> DelegateFactory<T> {
    /// Creates a factory with no delegate.
    #[must_use]
    pub const fn new() -> Self {
        Self { delegate: OnceLock::new() }
    }

    /// Installs the provider that this factory forwards to.
    ///
    /// # Panics
    ///
    /// Panics if a delegate was already installed.
    #[track_caller]
    pub fn set_delegate(&self, delegate: Arc<dyn Provider<T>>) {
        assert!(self.delegate.set(delegate).is_ok(), "delegate already set");
    }
}

impl<T> Default for DelegateFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Provider<T> for DelegateFactory<T> {
    fn get(&self) -> T {
        self.delegate
            .get()
            .expect("delegate provider used before its component finished initializing")
            .get()
    }
}

impl<T> Debug for DelegateFactory<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateFactory")
            .field("has_delegate", &self.delegate.get().is_some())
            .finish()
    }
}

/// The field type that holds one provider of a generated component.
///
/// A slot is filled exactly once, either directly with [`set`](Self::set) or in two steps with
/// [`install_delegate`](Self::install_delegate) followed by [`set_delegate`](Self::set_delegate)
/// when the provider takes part in a dependency cycle.
pub struct ProviderSlot<T> {
    provider: OnceLock<Arc<dyn Provider<T>>>,
    delegate: OnceLock<Arc<DelegateFactory<T>>>,
}

impl<T> ProviderSlot<T>
where
    T: 'static,
{
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            provider: OnceLock::new(),
            delegate: OnceLock::new(),
        }
    }

    /// Fills the slot with its final provider.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already filled.
    #[track_caller]
    pub fn set(&self, provider: Arc<dyn Provider<T>>) {
        assert!(self.provider.set(provider).is_ok(), "provider slot initialized twice");
    }

    /// Fills the slot with a [`DelegateFactory`] placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already filled.
    #[track_caller]
    pub fn install_delegate(&self) {
        let delegate = Arc::new(DelegateFactory::new());
        assert!(
            self.delegate.set(Arc::clone(&delegate)).is_ok(),
            "provider slot delegated twice"
        );
        self.set(delegate);
    }

    /// Points the placeholder installed by [`install_delegate`](Self::install_delegate) at the
    /// real provider.
    ///
    /// # Panics
    ///
    /// Panics if no placeholder was installed.
    #[track_caller]
    pub fn set_delegate(&self, provider: Arc<dyn Provider<T>>) {
        self.delegate
            .get()
            .expect("provider slot has no delegate placeholder")
            .set_delegate(provider);
    }

    /// Returns the provider held by the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never filled.
    #[track_caller]
    #[must_use]
    pub fn get(&self) -> &Arc<dyn Provider<T>> {
        self.provider
            .get()
            .expect("provider slot read before it was initialized")
    }

    /// Returns the provider, filling the slot with `init` first if it is empty.
    pub fn get_or_init(&self, init: impl FnOnce() -> Arc<dyn Provider<T>>) -> &Arc<dyn Provider<T>> {
        self.provider.get_or_init(init)
    }
}

impl<T> Default for ProviderSlot<T>
where
    T: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for ProviderSlot<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("is_set", &self.provider.get().is_some())
            .field("is_delegated", &self.delegate.get().is_some())
            .finish()
    }
}

/// A producer that forwards to another producer installed after construction.
///
/// The production counterpart of [`DelegateFactory`].
pub struct DelegateProducer<T> {
    delegate: OnceLock<Arc<dyn Producer<T>>>,
}

impl<T> DelegateProducer<T> {
    /// Creates a producer with no delegate.
    #[must_use]
    pub const fn new() -> Self {
        Self { delegate: OnceLock::new() }
    }

    /// Installs the producer that this producer forwards to.
    ///
    /// # Panics
    ///
    /// Panics if a delegate was already installed.
    #[track_caller]
    pub fn set_delegate(&self, delegate: Arc<dyn Producer<T>>) {
        assert!(self.delegate.set(delegate).is_ok(), "delegate already set");
    }
}

impl<T> Default for DelegateProducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Producer<T> for DelegateProducer<T> {
    fn get(&self) -> ProducerFuture<T> {
        self.delegate
            .get()
            .expect("delegate producer used before its component finished initializing")
            .get()
    }
}

impl<T> Debug for DelegateProducer<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateProducer")
            .field("has_delegate", &self.delegate.get().is_some())
            .finish()
    }
}

/// The field type that holds one producer of a generated production component.
///
/// Filled the same way as a [`ProviderSlot`].
pub struct ProducerSlot<T> {
    producer: OnceLock<Arc<dyn Producer<T>>>,
    delegate: OnceLock<Arc<DelegateProducer<T>>>,
}

impl<T> ProducerSlot<T>
where
    T: 'static,
{
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            producer: OnceLock::new(),
            delegate: OnceLock::new(),
        }
    }

    /// Fills the slot with its final producer.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already filled.
    #[track_caller]
    pub fn set(&self, producer: Arc<dyn Producer<T>>) {
        assert!(self.producer.set(producer).is_ok(), "producer slot initialized twice");
    }

    /// Fills the slot with a [`DelegateProducer`] placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already filled.
    #[track_caller]
    pub fn install_delegate(&self) {
        let delegate = Arc::new(DelegateProducer::new());
        assert!(
            self.delegate.set(Arc::clone(&delegate)).is_ok(),
            "producer slot delegated twice"
        );
        self.set(delegate);
    }

    /// Points the placeholder at the real producer.
    ///
    /// # Panics
    ///
    /// Panics if no placeholder was installed.
    #[track_caller]
    pub fn set_delegate(&self, producer: Arc<dyn Producer<T>>) {
        self.delegate
            .get()
            .expect("producer slot has no delegate placeholder")
            .set_delegate(producer);
    }

    /// Returns the producer held by the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never filled.
    #[track_caller]
    #[must_use]
    pub fn get(&self) -> &Arc<dyn Producer<T>> {
        self.producer
            .get()
            .expect("producer slot read before it was initialized")
    }
}

impl<T> Default for ProducerSlot<T>
where
    T: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for ProducerSlot<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerSlot")
            .field("is_set", &self.producer.get().is_some())
            .field("is_delegated", &self.delegate.get().is_some())
            .finish()
    }
}
