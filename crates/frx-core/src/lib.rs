#![forbid(unsafe_code)]

//! Core: cold observables, subscriptions, and sequential concatenation.
//!
//! # Role in FrankenRx
//! `frx-core` owns the push-based sequence primitive and the one combinator
//! built on it. Everything is single-threaded (`Rc`/`RefCell`) and
//! synchronous unless a producer chooses to deliver later.
//!
//! # Primary responsibilities
//! - **Observable**: a reusable recipe; every `subscribe` re-runs it.
//! - **Observer**: three optional slots (`next`, `error`, `complete`).
//! - **Subscriber**: the guarded observer a producer pushes into; drops
//!   anything sent after the subscription ended.
//! - **Subscription / Teardown**: idempotent cancellation with run-once
//!   resource release and surfaced release failures.
//! - **concat**: strictly sequential composition with exactly-once
//!   termination.
//!
//! # Contract
//!
//! 1. Signals after `error`, `complete`, or `unsubscribe()` are dropped.
//! 2. Teardown runs exactly once per subscription, before the observer
//!    hears the terminal signal.
//! 3. Teardown failures are returned to whoever ended the subscription.
//!
//! ```
//! use frx_core::{FnObserver, Observable, concat};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let numbers = concat([
//!     Observable::<i32, String>::from_items(vec![1, 2]),
//!     Observable::from_items(vec![3]),
//! ]);
//! numbers
//!     .subscribe(FnObserver::<i32, String>::new().on_next(move |v| sink.borrow_mut().push(v)))
//!     .unwrap();
//! assert_eq!(*seen.borrow(), vec![1, 2, 3]);
//! ```

pub mod concat;
pub mod error;
pub mod logging;
pub mod observable;
pub mod observer;
pub mod subscriber;
pub mod subscription;
pub mod teardown;
pub mod union;

pub use concat::concat;
pub use error::{BoxError, TeardownError, TeardownResult};
pub use observable::Observable;
pub use observer::{Discard, FnObserver, Observer};
pub use subscriber::Subscriber;
pub use subscription::{Subscription, SubscriptionGuard};
pub use teardown::Teardown;
pub use union::{Union2, Union3, Union4, concat2, concat3, concat4};
