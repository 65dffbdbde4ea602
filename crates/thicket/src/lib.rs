// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Runtime support for dependency-injection components generated by `thicket_codegen`.
//!
//! # Summary
//!
//! `thicket_codegen` turns a set of binding declarations into a plain Rust component struct.
//! The generated code does not use reflection or dynamic registries. It wires bindings together
//! with the types in this crate:
//!
//! - [`Provider`] produces instances on demand. Every closure `Fn() -> T` is a provider.
//! - [`ProviderSlot`] is the set-once field type that holds a component's providers, including
//!   the temporary [`DelegateFactory`] used to break initialization cycles.
//! - [`DoubleCheck`], [`SingleCheck`] and [`Memoized`] cache scoped bindings.
//! - [`Lazy`] and [`ProviderOfLazy`] defer construction until first use.
//! - [`Set`], [`Map`] and their factories back multibindings.
//! - [`Producer`], [`Produced`] and [`ProducerFuture`] support asynchronous production
//!   components.
//! - [`SwitchingProvider`] routes provider requests through a shared dispatcher in components
//!   generated in fast-init mode. The dispatcher reaches its component through a
//!   [`ComponentHandle`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use thicket::{DoubleCheck, Provider};
//!
//! #[derive(Clone)]
//! struct Database(Arc<String>);
//!
//! let unscoped: Arc<dyn Provider<Database>> = Arc::new(|| Database(Arc::new("db".to_string())));
//! let scoped = DoubleCheck::provider(unscoped);
//!
//! assert!(Arc::ptr_eq(&scoped.get().0, &scoped.get().0));
//! ```

mod collections;
mod delegate;
mod error;
mod handle;
mod lazy;
mod members;
mod memoized;
mod producer;
mod provider;
mod switching;

pub use collections::{Map, MapBuilder, MapFactory, MapProviderFactory, MapProviderFactoryBuilder, Set, SetBuilder, SetFactory};
pub use delegate::{DelegateFactory, DelegateProducer, ProducerSlot, ProviderSlot};
pub use error::{MissingRequirement, ProductionError};
pub use handle::{ComponentHandle, retain_producer, retain_provider, upgrade_component};
pub use lazy::{Lazy, ProviderOfLazy};
pub use members::{MembersInjector, members_injector_fn};
pub use memoized::{DoubleCheck, Memoized, SingleCheck};
pub use producer::{
    Produced, Producer, ProducerFuture, immediate, immediate_failed, producer_fn, producer_from_provider,
};
pub use provider::{InstanceFactory, Provider, provider_fn};
pub use switching::{Dispatch, SwitchingProvider};
