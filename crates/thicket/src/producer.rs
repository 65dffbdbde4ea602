// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::{ProductionError, Provider};

/// The future returned by a [`Producer`].
pub type ProducerFuture<T> = BoxFuture<'static, Result<T, ProductionError>>;

/// Produces a value asynchronously.
///
/// Producers in a generated production component run their production method once per component
/// instance; every call to [`get`](Producer::get) observes the same result.
pub trait Producer<T>: Send + Sync {
    /// Returns a future for the produced value.
    fn get(&self) -> ProducerFuture<T>;
}

/// The outcome of a producer, requested by consumers that want to handle failures themselves.
#[derive(Debug, Clone)]
pub enum Produced<T> {
    /// The producer completed with a value.
    Successful(T),
    /// The producer, or one of its dependencies, failed.
    Failed(ProductionError),
}

impl<T> Produced<T> {
    /// Returns the produced value, or the failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ProductionError`] if production failed.
    pub fn get(&self) -> Result<&T, &ProductionError> {
        match self {
            Self::Successful(value) => Ok(value),
            Self::Failed(error) => Err(error),
        }
    }

    /// Returns `true` if production succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Successful(_))
    }
}

impl<T> From<Result<T, ProductionError>> for Produced<T> {
    fn from(result: Result<T, ProductionError>) -> Self {
        match result {
            Ok(value) => Self::Successful(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Returns a future that is already complete with `value`.
pub fn immediate<T>(value: T) -> ProducerFuture<T>
where
    T: Send + 'static,
{
    futures::future::ready(Ok(value)).boxed()
}

/// Returns a future that is already complete with `error`.
pub fn immediate_failed<T>(error: ProductionError) -> ProducerFuture<T>
where
    T: Send + 'static,
{
    futures::future::ready(Err(error)).boxed()
}

/// Creates a producer that runs `produce` on first use and shares its result afterwards.
pub fn producer_fn<T, F>(produce: F) -> Arc<dyn Producer<T>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> ProducerFuture<T> + Send + Sync + 'static,
{
    Arc::new(MemoizedProducer {
        produce,
        future: OnceLock::new(),
    })
}

/// Adapts a provider so that it can be requested as a producer.
pub fn producer_from_provider<T>(provider: Arc<dyn Provider<T>>) -> Arc<dyn Producer<T>>
where
    T: Clone + Send + Sync + 'static,
{
    producer_fn(move || immediate(provider.get()))
}

struct MemoizedProducer<T, F> {
    produce: F,
    future: OnceLock<Shared<ProducerFuture<T>>>,
}

impl<T, F> Producer<T> for MemoizedProducer<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> ProducerFuture<T> + Send + Sync,
{
    fn get(&self) -> ProducerFuture<T> {
        self.future.get_or_init(|| (self.produce)().shared()).clone().boxed()
    }
}

impl<T, F> Debug for MemoizedProducer<T, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizedProducer")
            .field("started", &self.future.get().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("unavailable")]
    struct Unavailable;

    #[test]
    fn producer_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let producer = producer_fn(move || immediate(counter.fetch_add(1, Ordering::SeqCst)));

        assert_eq!(block_on(producer.get()).expect("should succeed"), 0);
        assert_eq!(block_on(producer.get()).expect("should succeed"), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn producer_from_provider_wraps_value() {
        let producer = producer_from_provider(Arc::new(|| "ready".to_string()));

        assert_eq!(block_on(producer.get()).expect("should succeed"), "ready");
    }

    #[test]
    fn produced_captures_failure() {
        let producer: Arc<dyn Producer<u8>> = producer_fn(|| immediate_failed(ProductionError::new(Unavailable)));

        let produced = Produced::from(block_on(producer.get()));

        assert!(!produced.is_successful());
        assert_eq!(produced.get().map_err(ToString::to_string), Err("production failed: unavailable".to_string()));
    }
}
