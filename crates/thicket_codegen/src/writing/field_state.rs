// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Initialization states of framework fields.
//!
//! A field is initialized the first time an expression reads it. Computing its initializer may
//! read other fields, and through a dependency cycle may read the field itself again. The
//! re-entrant read installs a delegate placeholder; the frame that started the initialization
//! later back-patches the placeholder with the real provider.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// The initialization state of one field. States only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldState {
    /// Never read.
    Uninitialized,
    /// Its initializer is being computed.
    Initializing,
    /// Read again while initializing; a delegate placeholder stands in for it.
    Delegated,
    /// Its initialization statement has been emitted.
    Initialized,
}

/// Proof that the holder started initializing a field.
///
/// Only the frame returned by [`FieldStates::begin`] can finish the field, so the real
/// initializer and the back-patch of a delegate are emitted exactly once.
#[must_use = "a started field must be finished"]
#[derive(Debug)]
pub struct InitializationFrame<K> {
    field: K,
}

impl<K> InitializationFrame<K> {
    /// The field being initialized.
    pub const fn field(&self) -> &K {
        &self.field
    }
}

/// What a read of a field has to emit.
#[derive(Debug)]
pub enum Begin<K> {
    /// First read: compute the initializer, then [`finish`](FieldStates::finish) the frame.
    Start(InitializationFrame<K>),
    /// Re-entrant read: emit the delegate placeholder.
    Delegate,
    /// Re-entrant read of a field whose placeholder already exists.
    AlreadyDelegated,
    /// The field is ready.
    Initialized,
}

/// How a finished frame writes the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Assign the initializer.
    Direct,
    /// Point the delegate placeholder at the initializer.
    BackPatch,
}

/// The states of a component's fields and the stack of fields being initialized.
#[derive(Debug)]
pub struct FieldStates<K> {
    states: HashMap<K, FieldState>,
    in_flight: Vec<K>,
    delegated: Vec<K>,
}

impl<K> Default for FieldStates<K> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            in_flight: Vec::new(),
            delegated: Vec::new(),
        }
    }
}

impl<K> FieldStates<K>
where
    K: Clone + Eq + Hash + Debug,
{
    /// The current state of `field`.
    pub fn state(&self, field: &K) -> FieldState {
        self.states.get(field).copied().unwrap_or(FieldState::Uninitialized)
    }

    /// Records a read of `field`.
    ///
    /// # Panics
    ///
    /// Panics if `field` is marked initializing but no frame for it is in flight.
    pub fn begin(&mut self, field: &K) -> Begin<K> {
        match self.state(field) {
            FieldState::Uninitialized => {
                self.transition(field, FieldState::Initializing);
                self.in_flight.push(field.clone());
                Begin::Start(InitializationFrame { field: field.clone() })
            }
            FieldState::Initializing => {
                assert!(
                    self.in_flight.contains(field),
                    "internal error: {field:?} is initializing outside of any frame"
                );
                self.transition(field, FieldState::Delegated);
                self.delegated.push(field.clone());
                Begin::Delegate
            }
            FieldState::Delegated => Begin::AlreadyDelegated,
            FieldState::Initialized => Begin::Initialized,
        }
    }

    /// Finishes the initialization started by `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not the innermost frame in flight.
    pub fn finish(&mut self, frame: InitializationFrame<K>) -> Completion {
        let innermost = self.in_flight.pop();
        assert_eq!(
            innermost.as_ref(),
            Some(&frame.field),
            "internal error: fields must finish initializing in reverse order"
        );
        let completion = match self.state(&frame.field) {
            FieldState::Initializing => Completion::Direct,
            FieldState::Delegated => Completion::BackPatch,
            state => unreachable!("internal error: {:?} finished while {state:?}", frame.field),
        };
        self.transition(&frame.field, FieldState::Initialized);
        completion
    }

    /// The fields being initialized, outermost first.
    pub fn in_flight(&self) -> &[K] {
        &self.in_flight
    }

    /// The fields that passed through [`FieldState::Delegated`], in order.
    pub fn delegated(&self) -> &[K] {
        &self.delegated
    }

    fn transition(&mut self, field: &K, to: FieldState) {
        let from = self.state(field);
        assert!(from < to, "internal error: {field:?} cannot move from {from:?} to {to:?}");
        self.states.insert(field.clone(), to);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn start(states: &mut FieldStates<&'static str>, field: &'static str) -> InitializationFrame<&'static str> {
        match states.begin(&field) {
            Begin::Start(frame) => frame,
            other => panic!("expected to start {field}, got {other:?}"),
        }
    }

    #[test]
    fn plain_initialization_is_direct() {
        let mut states = FieldStates::default();

        let frame = start(&mut states, "a");
        assert_eq!(states.state(&"a"), FieldState::Initializing);
        assert_eq!(states.finish(frame), Completion::Direct);

        assert_eq!(states.state(&"a"), FieldState::Initialized);
        assert!(matches!(states.begin(&"a"), Begin::Initialized));
        assert!(states.delegated().is_empty());
    }

    #[test]
    fn reentrant_read_delegates_once() {
        let mut states = FieldStates::default();

        let a = start(&mut states, "a");
        let b = start(&mut states, "b");
        assert!(matches!(states.begin(&"a"), Begin::Delegate));
        assert!(matches!(states.begin(&"a"), Begin::AlreadyDelegated));
        assert_eq!(states.in_flight(), ["a", "b"]);

        assert_eq!(states.finish(b), Completion::Direct);
        assert_eq!(states.finish(a), Completion::BackPatch);

        assert_eq!(states.delegated(), ["a"]);
        assert_eq!(states.state(&"a"), FieldState::Initialized);
        assert!(states.in_flight().is_empty());
    }

    #[test]
    #[should_panic(expected = "reverse order")]
    fn frames_finish_innermost_first() {
        let mut states = FieldStates::default();

        let a = start(&mut states, "a");
        let _b = start(&mut states, "b");
        let _ = states.finish(a);
    }

    #[test]
    fn observed_states_only_increase() {
        let mut states = FieldStates::default();
        let mut observed = vec![states.state(&"a")];

        let a = start(&mut states, "a");
        observed.push(states.state(&"a"));
        let _ = states.begin(&"a");
        observed.push(states.state(&"a"));
        let _ = states.finish(a);
        observed.push(states.state(&"a"));

        assert!(observed.windows(2).all(|pair| pair[0] < pair[1]), "{observed:?}");
    }
}
