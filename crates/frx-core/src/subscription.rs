#![forbid(unsafe_code)]

//! Cancellation handles.
//!
//! # Design
//!
//! A [`Subscription`] is a cloneable handle over shared state
//! (`Rc<RefCell<..>>`): an `active` flag plus the teardowns registered while
//! the subscription was live. The [`Subscriber`](crate::Subscriber) handed
//! to a producer shares the same state, so a terminal signal from the
//! producer and an explicit `unsubscribe()` from the consumer race for the
//! same flag and exactly one of them wins.
//!
//! # Invariants
//!
//! 1. `active` goes from `true` to `false` at most once and never back.
//! 2. Every registered teardown runs exactly once, in registration order.
//! 3. A teardown added after the subscription ended runs immediately.
//! 4. No borrow of the shared state is held while a teardown runs, so a
//!    teardown may freely touch its own subscription.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::error::{self, TeardownResult};
use crate::teardown::Teardown;

struct SubscriptionState {
    active: bool,
    teardowns: Vec<Teardown>,
}

/// Handle used to cancel a subscription and release its resources.
///
/// Cloning creates another handle to the **same** subscription.
/// Dropping a handle does not cancel; use [`Subscription::into_guard`] for
/// scope-bound cancellation.
#[derive(Clone)]
pub struct Subscription {
    state: Rc<RefCell<SubscriptionState>>,
}

impl Subscription {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SubscriptionState {
                active: true,
                teardowns: Vec::new(),
            })),
        }
    }

    /// A handle that has already ended.
    #[must_use]
    pub fn closed() -> Self {
        let subscription = Self::new();
        subscription.state.borrow_mut().active = false;
        subscription
    }

    /// Whether the subscription can still deliver signals.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// End the subscription and run its teardowns.
    ///
    /// Idempotent: on an inactive subscription this is a no-op returning
    /// `Ok(())`. Every teardown runs even if an earlier one fails; all
    /// failures come back as one [`TeardownError`](crate::TeardownError).
    pub fn unsubscribe(&self) -> TeardownResult {
        match self.deactivate() {
            Some(teardowns) => {
                trace!(teardowns = teardowns.len(), "unsubscribe");
                run_all(teardowns)
            }
            None => Ok(()),
        }
    }

    /// Register an extra teardown to run when the subscription ends.
    ///
    /// On an inactive subscription the teardown runs right away and its
    /// outcome is returned.
    pub fn add(&self, teardown: impl Into<Teardown>) -> TeardownResult {
        let teardown = teardown.into();
        if teardown.is_none() {
            return Ok(());
        }
        {
            let mut state = self.state.borrow_mut();
            if state.active {
                state.teardowns.push(teardown);
                return Ok(());
            }
        }
        teardown.run()
    }

    /// Tie the subscription to a scope: the returned guard unsubscribes
    /// when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            subscription: self,
            armed: true,
        }
    }

    /// Flip to inactive, handing back the pending teardowns if this call
    /// performed the transition.
    pub(crate) fn deactivate(&self) -> Option<Vec<Teardown>> {
        let mut state = self.state.borrow_mut();
        if !state.active {
            return None;
        }
        state.active = false;
        Some(mem::take(&mut state.teardowns))
    }
}

pub(crate) fn run_all(teardowns: Vec<Teardown>) -> TeardownResult {
    error::join(teardowns.into_iter().map(Teardown::run))
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Subscription")
            .field("active", &state.active)
            .field("teardowns", &state.teardowns.len())
            .finish()
    }
}

/// RAII guard that unsubscribes on drop.
///
/// `Drop` cannot return a teardown failure, so one raised here is logged
/// at `warn` instead. Call [`SubscriptionGuard::unsubscribe`] to observe it.
#[must_use = "dropping the guard cancels the subscription immediately"]
pub struct SubscriptionGuard {
    subscription: Subscription,
    armed: bool,
}

impl SubscriptionGuard {
    /// The guarded subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Cancel now and report the outcome.
    pub fn unsubscribe(mut self) -> TeardownResult {
        self.armed = false;
        self.subscription.unsubscribe()
    }

    /// Give up the guard without cancelling.
    pub fn disarm(mut self) -> Subscription {
        self.armed = false;
        self.subscription.clone()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.subscription.unsubscribe() {
            warn!(%err, "teardown failed while dropping subscription guard");
        }
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("subscription", &self.subscription)
            .field("armed", &self.armed)
            .finish()
    }
}
