#![forbid(unsafe_code)]

//! The guarded observer handed to producers.
//!
//! # Design
//!
//! A [`Subscriber`] pairs the user's observer with the [`Subscription`] of
//! one `subscribe()` call. Every signal is checked against the shared
//! `active` flag before it reaches the observer, so a producer that keeps
//! emitting after the subscription ended is silently ignored.
//!
//! Terminal delivery (`error`/`complete`) happens in a fixed order:
//!
//! ```text
//! complete()
//!   1. flip active -> false       (later signals are dropped)
//!   2. run teardowns              (implicit unsubscribe)
//!   3. observer.complete()        (exactly once)
//!   4. release the observer
//! ```
//!
//! Running the teardowns before the observer hears the terminal signal means
//! anything the observer starts in reaction (the next source of a concat)
//! never overlaps resources still held by this subscription.
//!
//! # Failure Modes
//!
//! - **Terminal signal during `next`**: if the observer reacts to a value by
//!   ending the same subscription (`complete`/`error` on this subscriber),
//!   teardowns run at once but the observer hears the terminal signal only
//!   after its `next` returns. A failure the observer reports for that
//!   deferred signal is logged at `warn`.
//! - **Re-entrant `next`**: calling `next` on the same subscriber from
//!   inside its own `next` callback panics. Such a cycle indicates a design
//!   bug in the pipeline.
//! - **Teardown failure**: returned from the terminal call after the
//!   observer has still been told about the terminal signal.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::error::{self, TeardownResult};
use crate::observer::Observer;
use crate::subscription::{Subscription, run_all};

enum Terminal<E> {
    Error(E),
    Complete,
}

impl<E> Terminal<E> {
    fn name(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Complete => "complete",
        }
    }

    fn deliver<T>(self, mut observer: Box<dyn Observer<T, E>>) -> TeardownResult {
        match self {
            Self::Error(err) => observer.error(err),
            Self::Complete => observer.complete(),
        }
    }
}

struct Slot<T, E> {
    observer: Option<Box<dyn Observer<T, E>>>,
    /// A `next` call has the observer out of the slot.
    delivering: bool,
    /// Terminal signal that arrived while `delivering`.
    pending: Option<Terminal<E>>,
}

/// Observer wrapper that enforces the subscription contract.
///
/// Cloning creates another handle for the **same** subscription, which lets
/// an asynchronous producer keep a copy for later delivery.
pub struct Subscriber<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
    subscription: Subscription,
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T, E> Subscriber<T, E> {
    pub(crate) fn new(observer: Box<dyn Observer<T, E>>, subscription: Subscription) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                observer: Some(observer),
                delivering: false,
                pending: None,
            })),
            subscription,
        }
    }

    /// Whether signals are still wanted: the subscription is live and the
    /// observer has not reported itself closed. Producers can poll this to
    /// stop work early.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active() && !self.observer_closed()
    }

    /// The subscription this subscriber delivers for. Producers may attach
    /// extra teardowns to it.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Deliver a value. Dropped when the subscription has ended.
    ///
    /// No borrow is held while the observer runs, so it may end this
    /// subscription from inside the callback.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from within this subscriber's own
    /// `next` callback.
    pub fn next(&self, value: T) {
        if !self.subscription.is_active() {
            return;
        }
        let taken = {
            let mut slot = self.slot.borrow_mut();
            assert!(!slot.delivering, "re-entrant `next` on one subscriber");
            let observer = slot.observer.take();
            slot.delivering = observer.is_some();
            observer
        };
        let Some(mut observer) = taken else {
            return;
        };
        observer.next(value);

        let pending = {
            let mut slot = self.slot.borrow_mut();
            slot.delivering = false;
            let pending = slot.pending.take();
            if pending.is_none() && self.subscription.is_active() {
                slot.observer = Some(observer);
                return;
            }
            pending
        };
        // Ended during the callback: a terminal signal is owed, or the
        // subscription was cancelled and the observer is released.
        if let Some(terminal) = pending {
            trace!(signal = terminal.name(), "deferred terminal");
            if let Err(err) = terminal.deliver(observer) {
                warn!(%err, "teardown failed while delivering a deferred terminal signal");
            }
        }
    }

    /// Deliver the terminal error. No-op when the subscription has ended.
    pub fn error(&self, err: E) -> TeardownResult {
        self.terminate(Terminal::Error(err))
    }

    /// Deliver completion. No-op when the subscription has ended.
    pub fn complete(&self) -> TeardownResult {
        self.terminate(Terminal::Complete)
    }

    fn terminate(&self, signal: Terminal<E>) -> TeardownResult {
        let Some(teardowns) = self.subscription.deactivate() else {
            return Ok(());
        };
        trace!(signal = signal.name(), "terminal");
        let released = run_all(teardowns);
        let observer = {
            let mut slot = self.slot.borrow_mut();
            if slot.delivering {
                slot.pending = Some(signal);
                return released;
            }
            slot.observer.take()
        };
        let delivered = match observer {
            Some(observer) => signal.deliver(observer),
            None => Ok(()),
        };
        error::join([released, delivered])
    }

    // An observer that is out of the slot for `next` counts as open.
    fn observer_closed(&self) -> bool {
        self.slot
            .borrow()
            .observer
            .as_ref()
            .is_some_and(|observer| observer.is_closed())
    }
}

/// Forwarding: a subscriber can be the downstream of another subscription.
impl<T, E> Observer<T, E> for Subscriber<T, E> {
    fn next(&mut self, value: T) {
        Subscriber::next(self, value);
    }

    fn error(&mut self, err: E) -> TeardownResult {
        Subscriber::error(self, err)
    }

    fn complete(&mut self) -> TeardownResult {
        Subscriber::complete(self)
    }

    fn is_closed(&self) -> bool {
        !self.is_active()
    }
}

impl<T, E> fmt::Debug for Subscriber<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attached = {
            let slot = self.slot.borrow();
            slot.observer.is_some() || slot.delivering
        };
        f.debug_struct("Subscriber")
            .field("subscription", &self.subscription)
            .field("observer_attached", &attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teardown::Teardown;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Next(i32),
        Error(&'static str),
        Complete,
    }

    struct Log(Rc<RefCell<Vec<Seen>>>);

    impl Observer<i32, &'static str> for Log {
        fn next(&mut self, value: i32) {
            self.0.borrow_mut().push(Seen::Next(value));
        }
        fn error(&mut self, err: &'static str) -> TeardownResult {
            self.0.borrow_mut().push(Seen::Error(err));
            Ok(())
        }
        fn complete(&mut self) -> TeardownResult {
            self.0.borrow_mut().push(Seen::Complete);
            Ok(())
        }
    }

    fn logged() -> (Subscriber<i32, &'static str>, Rc<RefCell<Vec<Seen>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let subscriber = Subscriber::new(Box::new(Log(Rc::clone(&log))), Subscription::new());
        (subscriber, log)
    }

    #[test]
    fn forwards_values_while_active() {
        let (sub, log) = logged();
        sub.next(1);
        sub.next(2);
        assert_eq!(*log.borrow(), vec![Seen::Next(1), Seen::Next(2)]);
    }

    #[test]
    fn complete_is_delivered_once() {
        let (sub, log) = logged();
        sub.complete().unwrap();
        sub.complete().unwrap();
        sub.error("late").unwrap();
        sub.next(9);
        assert_eq!(*log.borrow(), vec![Seen::Complete]);
        assert!(!sub.is_active());
    }

    #[test]
    fn error_is_terminal() {
        let (sub, log) = logged();
        sub.next(1);
        sub.error("boom").unwrap();
        sub.next(2);
        sub.complete().unwrap();
        assert_eq!(*log.borrow(), vec![Seen::Next(1), Seen::Error("boom")]);
    }

    #[test]
    fn unsubscribe_silences_delivery() {
        let (sub, log) = logged();
        sub.subscription().unsubscribe().unwrap();
        sub.next(1);
        sub.complete().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn teardown_runs_before_observer_hears_completion() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let o2 = Rc::clone(&order);
        let observer = crate::FnObserver::<i32, ()>::new()
            .on_complete(move || o1.borrow_mut().push("observer"));
        let sub = Subscriber::new(Box::new(observer), Subscription::new());
        sub.subscription()
            .add(Teardown::new(move || o2.borrow_mut().push("teardown")))
            .unwrap();

        sub.complete().unwrap();
        assert_eq!(*order.borrow(), vec!["teardown", "observer"]);
    }

    #[test]
    fn terminal_releases_observer() {
        let (sub, _log) = logged();
        assert!(format!("{sub:?}").contains("observer_attached: true"));
        sub.complete().unwrap();
        assert!(format!("{sub:?}").contains("observer_attached: false"));
    }

    #[test]
    fn teardown_failure_still_delivers_terminal() {
        let (sub, log) = logged();
        sub.subscription()
            .add(Teardown::fallible(|| Err::<(), _>("release failed")))
            .unwrap();
        let err = sub.error("source broke").unwrap_err();
        assert_eq!(err.to_string(), "teardown failed: release failed");
        assert_eq!(*log.borrow(), vec![Seen::Error("source broke")]);
    }

    #[test]
    fn observer_failure_is_returned_to_producer() {
        struct Failing;
        impl Observer<(), ()> for Failing {
            fn complete(&mut self) -> TeardownResult {
                Err(crate::TeardownError::new("downstream release failed"))
            }
        }
        let sub = Subscriber::new(Box::new(Failing), Subscription::new());
        assert!(sub.complete().is_err());
    }

    #[test]
    fn clones_share_the_contract() {
        let (sub, log) = logged();
        let other = sub.clone();
        other.complete().unwrap();
        sub.next(5);
        assert_eq!(*log.borrow(), vec![Seen::Complete]);
    }

    #[test]
    fn forwarding_through_observer_impl() {
        let (downstream, log) = logged();
        let mut as_observer: Box<dyn Observer<i32, &'static str>> = Box::new(downstream);
        as_observer.next(4);
        as_observer.complete().unwrap();
        assert_eq!(*log.borrow(), vec![Seen::Next(4), Seen::Complete]);
    }

    #[test]
    fn observer_may_unsubscribe_during_next() {
        let hits = Rc::new(Cell::new(0));
        let subscription = Subscription::new();
        let handle = subscription.clone();
        let h = Rc::clone(&hits);
        let observer = crate::FnObserver::<i32, ()>::new().on_next(move |_| {
            h.set(h.get() + 1);
            handle.unsubscribe().unwrap();
        });
        let sub = Subscriber::new(Box::new(observer), subscription);
        sub.next(1);
        sub.next(2);
        assert_eq!(hits.get(), 1);
    }

    type Parked = Rc<RefCell<Option<Subscriber<i32, ()>>>>;

    #[test]
    fn complete_from_inside_next_is_deferred() {
        let parked: Parked = Rc::new(RefCell::new(None));
        let order = Rc::new(RefCell::new(Vec::new()));
        let (slot, o1, o2) = (Rc::clone(&parked), Rc::clone(&order), Rc::clone(&order));
        let observer = crate::FnObserver::<i32, ()>::new()
            .on_next(move |v| {
                o1.borrow_mut().push(format!("next {v}"));
                let me = slot.borrow().clone();
                if let Some(me) = me {
                    me.complete().unwrap();
                    o1.borrow_mut().push("complete returned".to_string());
                }
            })
            .on_complete(move || o2.borrow_mut().push("complete".to_string()));
        let sub = Subscriber::new(Box::new(observer), Subscription::new());
        *parked.borrow_mut() = Some(sub.clone());

        sub.next(1);
        sub.next(2);
        assert_eq!(
            *order.borrow(),
            vec!["next 1", "complete returned", "complete"]
        );
        assert!(!sub.is_active());
        assert!(format!("{sub:?}").contains("observer_attached: false"));
    }

    #[test]
    fn error_from_inside_next_runs_teardown_at_once() {
        let parked: Parked = Rc::new(RefCell::new(None));
        let released = Rc::new(Cell::new(false));
        let slot = Rc::clone(&parked);
        let seen = Rc::clone(&released);
        let observer = crate::FnObserver::<i32, ()>::new().on_next(move |_| {
            let me = slot.borrow().clone();
            if let Some(me) = me {
                me.error(()).unwrap();
                assert!(seen.get());
            }
        });
        let sub = Subscriber::new(Box::new(observer), Subscription::new());
        let flag = Rc::clone(&released);
        sub.subscription()
            .add(Teardown::new(move || flag.set(true)))
            .unwrap();
        *parked.borrow_mut() = Some(sub.clone());

        sub.next(1);
        assert!(released.get());
    }

    #[test]
    #[should_panic(expected = "re-entrant")]
    fn reentrant_next_panics() {
        let parked: Parked = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&parked);
        let observer = crate::FnObserver::<i32, ()>::new().on_next(move |v| {
            let me = slot.borrow().clone();
            if let Some(me) = me {
                me.next(v + 1);
            }
        });
        let sub = Subscriber::new(Box::new(observer), Subscription::new());
        *parked.borrow_mut() = Some(sub.clone());
        sub.next(1);
    }

    #[test]
    fn closed_downstream_deactivates_upstream() {
        let (downstream, _log) = logged();
        let upstream = Subscriber::new(Box::new(downstream.clone()), Subscription::new());
        assert!(upstream.is_active());

        downstream.subscription().unsubscribe().unwrap();
        assert!(!upstream.is_active());
        assert!(upstream.subscription().is_active());
    }
}
