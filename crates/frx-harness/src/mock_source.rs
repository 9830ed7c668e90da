#![forbid(unsafe_code)]

//! Controllable sources.
//!
//! # Design
//!
//! A [`MockSource`] is a small state holder created **before** any producer
//! runs. Its [`observable`](MockSource::observable) hands the producer a
//! shared `Rc` to that holder; the producer parks its [`Subscriber`] there,
//! and the test drives it afterwards through explicit triggers
//! ([`emit`](MockSource::emit), [`complete`](MockSource::complete),
//! [`fail`](MockSource::fail)).
//!
//! A source can also carry a *script*: signals replayed synchronously
//! inside `subscribe`, which is how tests model sources that finish before
//! their subscribe call returns.
//!
//! Every source counts subscriptions and teardowns so tests can assert
//! exactly which sources were reached and released.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use frx_core::{Observable, Subscriber, Teardown, TeardownResult};
use tracing::trace;

/// One signal of a replay script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T, E> {
    Next(T),
    Error(E),
    Complete,
}

struct MockState<T, E> {
    label: String,
    subscriber: Option<Subscriber<T, E>>,
    script: Vec<Signal<T, E>>,
    teardown_failure: Option<String>,
    subscribes: usize,
    teardowns: usize,
}

/// A source driven by the test.
///
/// Cloning shares the same counters and parked subscriber.
pub struct MockSource<T, E> {
    state: Rc<RefCell<MockState<T, E>>>,
}

impl<T, E> Clone for MockSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T, E> fmt::Debug for MockSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MockSource")
            .field("label", &state.label)
            .field("subscribes", &state.subscribes)
            .field("teardowns", &state.teardowns)
            .field("parked", &state.subscriber.is_some())
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> MockSource<T, E> {
    /// A silent source that waits for triggers.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                label: label.into(),
                subscriber: None,
                script: Vec::new(),
                teardown_failure: None,
                subscribes: 0,
                teardowns: 0,
            })),
        }
    }

    /// Replay `script` synchronously on every subscribe.
    #[must_use]
    pub fn scripted(label: impl Into<String>, script: Vec<Signal<T, E>>) -> Self {
        let source = Self::new(label);
        source.state.borrow_mut().script = script;
        source
    }

    /// Make this source's teardown fail with `message`.
    #[must_use]
    pub fn with_failing_teardown(self, message: impl Into<String>) -> Self {
        self.state.borrow_mut().teardown_failure = Some(message.into());
        self
    }

    /// The observable backed by this source.
    pub fn observable(&self) -> Observable<T, E> {
        let state = Rc::clone(&self.state);
        Observable::new(move |subscriber: Subscriber<T, E>| {
            let script = {
                let mut st = state.borrow_mut();
                st.subscribes += 1;
                st.subscriber = Some(subscriber.clone());
                trace!(label = %st.label, "mock source subscribed");
                st.script.clone()
            };
            let teardown_state = Rc::clone(&state);
            // Registered before the script runs so a scripted terminal
            // signal releases it like any other teardown.
            subscriber.subscription().add(Teardown::fallible(move || {
                let mut st = teardown_state.borrow_mut();
                st.teardowns += 1;
                st.subscriber = None;
                trace!(label = %st.label, "mock source torn down");
                match st.teardown_failure.clone() {
                    Some(message) => Err(message),
                    None => Ok(()),
                }
            }))?;
            for signal in script {
                match signal {
                    Signal::Next(value) => subscriber.next(value),
                    Signal::Error(err) => subscriber.error(err)?,
                    Signal::Complete => subscriber.complete()?,
                }
            }
            Ok(Teardown::none())
        })
    }

    /// Push a value to the current subscriber, if any.
    pub fn emit(&self, value: T) {
        if let Some(subscriber) = self.parked() {
            subscriber.next(value);
        }
    }

    /// Push several values in order.
    pub fn emit_all(&self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.emit(value);
        }
    }

    /// Complete the current subscriber, if any.
    pub fn complete(&self) -> TeardownResult {
        match self.parked() {
            Some(subscriber) => subscriber.complete(),
            None => Ok(()),
        }
    }

    /// Error the current subscriber, if any.
    pub fn fail(&self, err: E) -> TeardownResult {
        match self.parked() {
            Some(subscriber) => subscriber.error(err),
            None => Ok(()),
        }
    }

    /// The live subscriber, if any. Keep a clone to poke a subscription
    /// after it ended.
    pub fn subscriber(&self) -> Option<Subscriber<T, E>> {
        self.parked()
    }

    /// Number of times the observable was subscribed.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.state.borrow().subscribes
    }

    /// Number of teardowns that ran.
    #[must_use]
    pub fn teardown_count(&self) -> usize {
        self.state.borrow().teardowns
    }

    /// Whether a live subscription is parked here.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state
            .borrow()
            .subscriber
            .as_ref()
            .is_some_and(Subscriber::is_active)
    }

    // The borrow must end before delivery: teardown re-borrows the state.
    fn parked(&self) -> Option<Subscriber<T, E>> {
        self.state.borrow().subscriber.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Event, Recorder};

    #[test]
    fn counts_subscribes_and_teardowns() {
        let source: MockSource<i32, String> = MockSource::new("a");
        let recorder = Recorder::new();
        let sub = source.observable().subscribe(recorder.clone()).unwrap();
        assert_eq!(source.subscribe_count(), 1);
        assert!(source.is_subscribed());

        sub.unsubscribe().unwrap();
        assert_eq!(source.teardown_count(), 1);
        assert!(!source.is_subscribed());
    }

    #[test]
    fn triggers_reach_the_observer() {
        let source: MockSource<i32, String> = MockSource::new("a");
        let recorder = Recorder::new();
        source.observable().subscribe(recorder.clone()).unwrap();

        source.emit_all([1, 2]);
        source.complete().unwrap();
        assert_eq!(
            recorder.events(),
            vec![Event::Next(1), Event::Next(2), Event::Complete]
        );
        assert_eq!(source.teardown_count(), 1);
    }

    #[test]
    fn script_replays_synchronously() {
        let source: MockSource<i32, String> =
            MockSource::scripted("s", vec![Signal::Next(4), Signal::Complete]);
        let recorder = Recorder::new();
        let sub = source.observable().subscribe(recorder.clone()).unwrap();
        assert!(!sub.is_active());
        assert_eq!(recorder.events(), vec![Event::Next(4), Event::Complete]);
        assert_eq!(source.teardown_count(), 1);
    }

    #[test]
    fn failing_teardown_surfaces() {
        let source: MockSource<i32, String> =
            MockSource::new("f").with_failing_teardown("fd close failed");
        let sub = source.observable().subscribe(Recorder::new()).unwrap();
        let err = sub.unsubscribe().unwrap_err();
        assert_eq!(err.to_string(), "teardown failed: fd close failed");
    }

    #[test]
    fn triggers_without_subscriber_are_inert() {
        let source: MockSource<i32, String> = MockSource::new("idle");
        source.emit(1);
        assert!(source.complete().is_ok());
        assert!(source.fail("x".into()).is_ok());
        assert_eq!(source.subscribe_count(), 0);
    }

    #[test]
    fn debug_shows_counters() {
        let source: MockSource<i32, String> = MockSource::new("dbg");
        let dbg = format!("{source:?}");
        assert!(dbg.contains("dbg"));
        assert!(dbg.contains("subscribes: 0"));
    }
}
