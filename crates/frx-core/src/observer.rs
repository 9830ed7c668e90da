#![forbid(unsafe_code)]

//! Observer trait and closure-built observers.
//!
//! An observer is a set of three independently optional slots. Every slot
//! has a no-op default, so an implementation only writes the ones it cares
//! about and an unsupplied slot can never fail with "handler missing".
//!
//! The terminal slots return a [`TeardownResult`]: work done inside them
//! (for instance subscribing to the next source of a concatenation) may end
//! other subscriptions, and a teardown failure raised there must reach the
//! producer that delivered the signal.
//!
//! [`Observer::is_closed`] lets a forwarding observer report that its own
//! downstream has gone away, so producers can stop before the next value.

use std::fmt;

use crate::error::TeardownResult;

/// Receiver of an observable's signals.
pub trait Observer<T, E> {
    /// A value was produced.
    fn next(&mut self, _value: T) {}

    /// The source failed. Terminal.
    fn error(&mut self, _err: E) -> TeardownResult {
        Ok(())
    }

    /// The source finished. Terminal.
    fn complete(&mut self) -> TeardownResult {
        Ok(())
    }

    /// Whether this observer no longer wants signals, for instance because
    /// it forwards to a subscription that already ended. Producers upstream
    /// see it through [`Subscriber::is_active`](crate::Subscriber::is_active).
    fn is_closed(&self) -> bool {
        false
    }
}

impl<T, E, O> Observer<T, E> for Box<O>
where
    O: Observer<T, E> + ?Sized,
{
    fn next(&mut self, value: T) {
        (**self).next(value);
    }

    fn error(&mut self, err: E) -> TeardownResult {
        (**self).error(err)
    }

    fn complete(&mut self) -> TeardownResult {
        (**self).complete()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Observer that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<T, E> Observer<T, E> for Discard {}

/// Observer assembled from closures.
///
/// ```
/// use frx_core::{FnObserver, Observable};
///
/// let source: Observable<i32, String> = Observable::from_items(vec![1, 2]);
/// let _sub = source
///     .subscribe(FnObserver::new().on_next(|v| println!("got {v}")))
///     .unwrap();
/// ```
pub struct FnObserver<T, E> {
    next: Option<Box<dyn FnMut(T)>>,
    error: Option<Box<dyn FnOnce(E)>>,
    complete: Option<Box<dyn FnOnce()>>,
}

impl<T, E> FnObserver<T, E> {
    /// An observer with no slots filled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Handle values.
    #[must_use]
    pub fn on_next(mut self, f: impl FnMut(T) + 'static) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    /// Handle the terminal error.
    #[must_use]
    pub fn on_error(mut self, f: impl FnOnce(E) + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Handle completion.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T, E> Default for FnObserver<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Observer<T, E> for FnObserver<T, E> {
    fn next(&mut self, value: T) {
        if let Some(f) = self.next.as_mut() {
            f(value);
        }
    }

    fn error(&mut self, err: E) -> TeardownResult {
        if let Some(f) = self.error.take() {
            f(err);
        }
        Ok(())
    }

    fn complete(&mut self) -> TeardownResult {
        if let Some(f) = self.complete.take() {
            f();
        }
        Ok(())
    }
}

impl<T, E> fmt::Debug for FnObserver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver")
            .field("next", &self.next.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NextOnly(Vec<i32>);

    impl Observer<i32, ()> for NextOnly {
        fn next(&mut self, value: i32) {
            self.0.push(value);
        }
    }

    #[test]
    fn missing_slots_are_no_ops() {
        let mut observer = NextOnly(Vec::new());
        observer.next(7);
        assert!(observer.error(()).is_ok());
        assert!(observer.complete().is_ok());
        assert_eq!(observer.0, vec![7]);
    }

    #[test]
    fn discard_accepts_everything() {
        let mut observer = Discard;
        Observer::<&str, &str>::next(&mut observer, "x");
        assert!(Observer::<&str, &str>::error(&mut observer, "e").is_ok());
        assert!(Observer::<&str, &str>::complete(&mut observer).is_ok());
    }

    #[test]
    fn empty_fn_observer_is_inert() {
        let mut observer: FnObserver<u8, u8> = FnObserver::default();
        observer.next(1);
        assert!(observer.error(2).is_ok());
        assert!(observer.complete().is_ok());
    }

    #[test]
    fn fn_observer_dispatches_each_slot() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let mut observer: FnObserver<i32, &str> = FnObserver::new()
            .on_next(move |v| l1.borrow_mut().push(format!("next {v}")))
            .on_error(move |e| l2.borrow_mut().push(format!("error {e}")))
            .on_complete(move || l3.borrow_mut().push("complete".to_string()));

        observer.next(1);
        observer.next(2);
        observer.error("bad").unwrap();
        observer.complete().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["next 1", "next 2", "error bad", "complete"]
        );
    }

    #[test]
    fn terminal_closures_fire_at_most_once() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let mut observer: FnObserver<(), ()> =
            FnObserver::new().on_complete(move || *c.borrow_mut() += 1);
        observer.complete().unwrap();
        observer.complete().unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn boxed_observer_delegates() {
        let mut boxed: Box<dyn Observer<i32, ()>> = Box::new(NextOnly(Vec::new()));
        boxed.next(3);
        assert!(boxed.complete().is_ok());
    }

    #[test]
    fn debug_lists_filled_slots() {
        let observer: FnObserver<i32, ()> = FnObserver::new().on_next(|_| {});
        let dbg = format!("{observer:?}");
        assert!(dbg.contains("next: true"));
        assert!(dbg.contains("error: false"));
    }
}
