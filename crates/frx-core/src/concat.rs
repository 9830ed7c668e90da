#![forbid(unsafe_code)]

//! Sequential composition of observables.
//!
//! [`concat`] subscribes to its sources one at a time, in order, forwarding
//! every value as it arrives and moving to the next source only after the
//! current one completes.
//!
//! # State machine
//!
//! One machine exists per outer subscription:
//!
//! ```text
//!            subscribe           complete(i), i+1 < n
//!   Idle ──────────────▶ ActiveOn(0) ──▶ ActiveOn(1) ──▶ ... ──▶ ActiveOn(n-1)
//!                            │                                        │
//!                            │ error(e)                               │ complete
//!                            ▼                                        ▼
//!                         Errored                                 Completed
//!
//!   any ActiveOn(i) ── outer unsubscribe ──▶ Cancelled
//!   any ActiveOn(i) ── downstream closed, before next subscribe ──▶ Cancelled
//! ```
//!
//! # Invariants
//!
//! 1. At most one inner subscription is active at any time.
//! 2. Source `i + 1` is subscribed strictly after source `i` completed and
//!    its teardown ran, so values never interleave across sources.
//! 3. `Completed`, `Errored`, and `Cancelled` are terminal; later signals
//!    are ignored.
//! 4. An error is forwarded verbatim exactly once and no later source is
//!    ever subscribed.
//! 5. Cancelling tears down only the current inner subscription. Sources
//!    not yet reached were never subscribed.
//!
//! # Trampolining
//!
//! A source that completes inside its own `subscribe` call does not recurse
//! into the next subscription. The completion is recorded and the loop in
//! `drive` advances once the call returns, so any number of synchronous
//! sources run in constant stack depth.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Source teardown fails on completion | Sequencing continues; the failure is returned to the delivering producer |
//! | Source producer fails without terminating | The concat subscription is closed; the failure is returned |
//! | Outer teardown fails on cancel | Returned from the outer `unsubscribe()` |

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::error::{self, TeardownResult};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;
use crate::teardown::Teardown;

/// Concatenate `sources` into one observable.
///
/// The result emits every value of the first source, then every value of
/// the second, and so on, completing after the last source completes. The
/// first error from any source is forwarded and ends the sequence.
/// An empty `sources` completes synchronously without emitting.
///
/// ```
/// use frx_core::{Observable, concat};
///
/// let digits: Observable<u8, ()> = concat([
///     Observable::from_items(vec![1, 2]),
///     Observable::empty(),
///     Observable::from_items(vec![3]),
/// ]);
/// # let _ = digits;
/// ```
pub fn concat<T, E, I>(sources: I) -> Observable<T, E>
where
    T: 'static,
    E: 'static,
    I: IntoIterator<Item = Observable<T, E>>,
{
    let sources: Rc<[Observable<T, E>]> = sources.into_iter().collect();
    Observable::new(move |subscriber| {
        let state = Rc::new(RefCell::new(ConcatState::new(Rc::clone(&sources))));
        // Registered before the first source runs: a cancel from inside
        // that source must already reach the state machine.
        let cancel_state = Rc::clone(&state);
        subscriber
            .subscription()
            .add(Teardown::chain(move || cancel(&cancel_state)))?;
        drive(&state, &subscriber)?;
        Ok(Teardown::none())
    })
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// This observable followed by `next`.
    #[must_use]
    pub fn concat_with(&self, next: &Observable<T, E>) -> Observable<T, E> {
        concat([self.clone(), next.clone()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ActiveOn(usize),
    Completed,
    Errored,
    Cancelled,
}

impl Phase {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }
}

struct ConcatState<T, E> {
    sources: Rc<[Observable<T, E>]>,
    phase: Phase,
    /// Index of the next source to subscribe.
    cursor: usize,
    /// Subscription to the source named by `phase`, once its subscribe call
    /// has returned.
    current: Option<Subscription>,
    /// Inside `Observable::subscribe` for the current source.
    subscribing: bool,
    /// The current source completed before its subscribe call returned.
    completed_inline: bool,
}

impl<T, E> ConcatState<T, E> {
    fn new(sources: Rc<[Observable<T, E>]>) -> Self {
        Self {
            sources,
            phase: Phase::Idle,
            cursor: 0,
            current: None,
            subscribing: false,
            completed_inline: false,
        }
    }
}

type SharedState<T, E> = Rc<RefCell<ConcatState<T, E>>>;

enum Step<T, E> {
    Subscribe(usize, Observable<T, E>),
    Exhausted,
    Halted,
}

/// Subscribe to sources from the cursor onward until one stays active, the
/// list runs out, or the machine reaches a terminal phase.
fn drive<T: 'static, E: 'static>(
    state: &SharedState<T, E>,
    out: &Subscriber<T, E>,
) -> TeardownResult {
    let mut failures = Vec::new();
    loop {
        let (index, source) = match begin_next(state, out) {
            Step::Subscribe(index, source) => (index, source),
            Step::Exhausted => {
                debug!("concat completed");
                failures.push(out.complete());
                return error::join(failures);
            }
            Step::Halted => return error::join(failures),
        };

        trace!(index, "concat subscribing to source");
        let subscribed = source.subscribe(ConcatInner {
            state: Rc::clone(state),
            out: out.clone(),
        });

        let mut st = state.borrow_mut();
        st.subscribing = false;
        if std::mem::take(&mut st.completed_inline) {
            drop(st);
            // Already closed; only a failure from its late teardown matters.
            failures.push(subscribed.map(drop));
            continue;
        }
        match subscribed {
            Ok(subscription) if st.phase == Phase::Cancelled => {
                drop(st);
                debug!(index, "concat cancelled during source subscribe");
                failures.push(subscription.unsubscribe());
            }
            Ok(subscription) => {
                if !st.phase.is_terminal() {
                    st.current = Some(subscription);
                }
            }
            Err(err) => {
                let stalled = !st.phase.is_terminal();
                if stalled {
                    st.phase = Phase::Cancelled;
                }
                drop(st);
                failures.push(Err(err));
                if stalled {
                    warn!(index, "concat source failed to start; closing");
                    failures.push(out.subscription().unsubscribe());
                }
            }
        }
        return error::join(failures);
    }
}

fn begin_next<T, E>(state: &SharedState<T, E>, out: &Subscriber<T, E>) -> Step<T, E> {
    let mut st = state.borrow_mut();
    if st.phase.is_terminal() {
        return Step::Halted;
    }
    if !out.is_active() {
        debug!(phase = ?st.phase, "concat downstream closed; not advancing");
        st.phase = Phase::Cancelled;
        return Step::Halted;
    }
    let index = st.cursor;
    let Some(source) = st.sources.get(index).cloned() else {
        st.phase = Phase::Completed;
        return Step::Exhausted;
    };
    st.phase = Phase::ActiveOn(index);
    st.subscribing = true;
    Step::Subscribe(index, source)
}

fn cancel<T, E>(state: &SharedState<T, E>) -> TeardownResult {
    let current = {
        let mut st = state.borrow_mut();
        if st.phase.is_terminal() {
            return Ok(());
        }
        debug!(phase = ?st.phase, "concat cancelled");
        st.phase = Phase::Cancelled;
        st.current.take()
    };
    current.map_or(Ok(()), |subscription| subscription.unsubscribe())
}

/// Observer attached to the current source.
struct ConcatInner<T, E> {
    state: SharedState<T, E>,
    out: Subscriber<T, E>,
}

impl<T: 'static, E: 'static> Observer<T, E> for ConcatInner<T, E> {
    fn next(&mut self, value: T) {
        self.out.next(value);
    }

    fn is_closed(&self) -> bool {
        !self.out.is_active()
    }

    fn error(&mut self, err: E) -> TeardownResult {
        {
            let mut st = self.state.borrow_mut();
            // Cancelled while this source was still inside its subscribe
            // call; the source has not been released yet.
            if st.phase.is_terminal() {
                return Ok(());
            }
            debug!(phase = ?st.phase, "concat source errored");
            st.phase = Phase::Errored;
            st.current = None;
        }
        self.out.error(err)
    }

    fn complete(&mut self) -> TeardownResult {
        {
            let mut st = self.state.borrow_mut();
            // Same window as in `error`.
            if st.phase.is_terminal() {
                return Ok(());
            }
            trace!(phase = ?st.phase, "concat source completed");
            st.current = None;
            st.cursor += 1;
            if st.subscribing {
                st.completed_inline = true;
                return Ok(());
            }
        }
        drive(&self.state, &self.out)
    }
}
