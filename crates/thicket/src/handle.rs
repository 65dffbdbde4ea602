// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Weak};

use futures::FutureExt;

use crate::{Producer, ProducerFuture, Provider};

/// The component reached through `this`, the weak self-reference every generated component
/// holds.
///
/// # Panics
///
/// Panics if the component was dropped. Generated code calls this while the component is
/// borrowed, or from a provider the component itself holds.
#[must_use]
#[expect(clippy::panic, reason = "generated code only upgrades a component that is still referenced")]
pub fn upgrade_component<C>(this: &Weak<C>) -> Arc<C> {
    match this.upgrade() {
        Some(component) => component,
        None => panic!("component was dropped before a provider it holds"),
    }
}

/// How a switching-provider dispatcher reaches the component whose bindings it constructs.
///
/// Providers handed out of a component hold it strongly, so they stay usable after the caller
/// drops its own handle. Providers stored in the component's own fields hold it weakly, so the
/// component and its fields do not form a cycle.
pub enum ComponentHandle<C> {
    /// Keeps the component alive.
    Strong(Arc<C>),
    /// Does not keep the component alive.
    Weak(Weak<C>),
}

impl<C> ComponentHandle<C> {
    /// A strong handle to the component reached through `this`.
    ///
    /// # Panics
    ///
    /// Panics if the component was dropped.
    #[must_use]
    pub fn strong(this: &Weak<C>) -> Self {
        Self::Strong(upgrade_component(this))
    }

    /// A weak handle to the component reached through `this`.
    #[must_use]
    pub fn weak(this: &Weak<C>) -> Self {
        Self::Weak(Weak::clone(this))
    }

    /// The component.
    ///
    /// # Panics
    ///
    /// Panics if the handle is weak and the component was dropped.
    #[must_use]
    pub fn component(&self) -> Arc<C> {
        match self {
            Self::Strong(component) => Arc::clone(component),
            Self::Weak(component) => upgrade_component(component),
        }
    }
}

impl<C> Clone for ComponentHandle<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Strong(component) => Self::Strong(Arc::clone(component)),
            Self::Weak(component) => Self::Weak(Weak::clone(component)),
        }
    }
}

impl<C> Debug for ComponentHandle<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong(_) => f.write_str("ComponentHandle::Strong"),
            Self::Weak(_) => f.write_str("ComponentHandle::Weak"),
        }
    }
}

/// Wraps `provider`, held in a field of the component reached through `this`, so that it keeps
/// the component alive while it is used outside of it.
///
/// # Panics
///
/// Panics if the component was dropped.
#[must_use]
pub fn retain_provider<C, T>(this: &Weak<C>, provider: Arc<dyn Provider<T>>) -> Arc<dyn Provider<T>>
where
    C: Send + Sync + 'static,
    T: 'static,
{
    Arc::new(RetainedProvider {
        component: upgrade_component(this),
        provider,
    })
}

/// Wraps `producer`, held in a field of the component reached through `this`, so that it and
/// the futures it returns keep the component alive.
///
/// # Panics
///
/// Panics if the component was dropped.
#[must_use]
pub fn retain_producer<C, T>(this: &Weak<C>, producer: Arc<dyn Producer<T>>) -> Arc<dyn Producer<T>>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    Arc::new(RetainedProducer {
        component: upgrade_component(this),
        producer,
    })
}

struct RetainedProvider<C, T> {
    component: Arc<C>,
    provider: Arc<dyn Provider<T>>,
}

impl<C, T> Provider<T> for RetainedProvider<C, T>
where
    C: Send + Sync,
{
    fn get(&self) -> T {
        self.provider.get()
    }
}

impl<C, T> Debug for RetainedProvider<C, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainedProvider")
            .field("component_count", &Arc::strong_count(&self.component))
            .finish_non_exhaustive()
    }
}

struct RetainedProducer<C, T> {
    component: Arc<C>,
    producer: Arc<dyn Producer<T>>,
}

impl<C, T> Producer<T> for RetainedProducer<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    fn get(&self) -> ProducerFuture<T> {
        let component = Arc::clone(&self.component);
        let future = self.producer.get();
        async move {
            let result = future.await;
            drop(component);
            result
        }
        .boxed()
    }
}

impl<C, T> Debug for RetainedProducer<C, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainedProducer")
            .field("component_count", &Arc::strong_count(&self.component))
            .finish_non_exhaustive()
    }
}
