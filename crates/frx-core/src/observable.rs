#![forbid(unsafe_code)]

//! Cold observable: a reusable recipe for a push-based sequence.
//!
//! # Design
//!
//! [`Observable<T, E>`] wraps a producer function in reference-counted
//! storage (`Rc<dyn Fn>`). Nothing runs until [`Observable::subscribe`] is
//! called; each call invokes the producer again with a fresh
//! [`Subscriber`] and returns a fresh [`Subscription`]. Two subscriptions
//! to the same observable share no state.
//!
//! # Performance
//!
//! | Operation      | Cost                                      |
//! |----------------|-------------------------------------------|
//! | `clone()`      | O(1), one `Rc` increment                  |
//! | `subscribe()`  | two small allocations + producer run time |
//! | `unsubscribe()`| O(K) where K = registered teardowns       |
//!
//! # Failure Modes
//!
//! - **Producer failure**: a producer returning `Err` has its subscription
//!   closed (teardowns added so far still run) and the error is returned
//!   from `subscribe`.
//! - **Synchronous termination**: if the producer completes or errors
//!   before returning, the teardown it returns runs immediately, and a
//!   failure there is returned from `subscribe`.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::TeardownError;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;
use crate::teardown::Teardown;

type Producer<T, E> = dyn Fn(Subscriber<T, E>) -> Result<Teardown, TeardownError>;

/// A cold, reusable producer of values.
///
/// Cloning an `Observable` shares the **recipe**, never subscription state.
pub struct Observable<T, E> {
    producer: Rc<Producer<T, E>>,
}

// Manual Clone: shares the same Rc without requiring `T: Clone`.
impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T, E> fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Create an observable from a producer.
    ///
    /// The producer receives a [`Subscriber`], pushes signals into it
    /// (now or later), and returns the [`Teardown`] that stops its work.
    ///
    /// ```
    /// use frx_core::{Observable, Teardown};
    ///
    /// let ticks: Observable<u32, String> = Observable::new(|subscriber| {
    ///     subscriber.next(1);
    ///     subscriber.next(2);
    ///     subscriber.complete()?;
    ///     Ok(Teardown::none())
    /// });
    /// # let _ = ticks;
    /// ```
    #[must_use]
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Subscriber<T, E>) -> Result<Teardown, TeardownError> + 'static,
    {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// Run the producer for `observer` and return the cancellation handle.
    pub fn subscribe(
        &self,
        observer: impl Observer<T, E> + 'static,
    ) -> Result<Subscription, TeardownError> {
        let subscription = Subscription::new();
        let subscriber = Subscriber::new(Box::new(observer), subscription.clone());
        trace!("subscribe");
        match (self.producer)(subscriber) {
            Ok(teardown) => {
                subscription.add(teardown)?;
                Ok(subscription)
            }
            Err(err) => match subscription.unsubscribe() {
                Ok(()) => Err(err),
                Err(more) => Err(err.merge(more)),
            },
        }
    }

    /// Completes synchronously without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|subscriber| {
            subscriber.complete()?;
            Ok(Teardown::none())
        })
    }

    /// Errors synchronously with a clone of `err`.
    #[must_use]
    pub fn fail(err: E) -> Self
    where
        E: Clone,
    {
        Self::new(move |subscriber| {
            subscriber.error(err.clone())?;
            Ok(Teardown::none())
        })
    }

    /// Emits every item of a fresh clone of `items`, then completes.
    /// Emission stops early once the subscription ends.
    #[must_use]
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + 'static,
    {
        Self::new(move |subscriber| {
            for item in items.clone() {
                if !subscriber.is_active() {
                    return Ok(Teardown::none());
                }
                subscriber.next(item);
            }
            subscriber.complete()?;
            Ok(Teardown::none())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
