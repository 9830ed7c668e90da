#![forbid(unsafe_code)]

//! Recording observer.
//!
//! [`Recorder`] appends every signal it hears to a shared log. Clone it
//! before subscribing; the clone kept by the test reads the same log.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use frx_core::{Observer, TeardownResult};

/// One observed signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
    Next(T),
    Error(E),
    Complete,
}

impl<T, E> Event<T, E> {
    /// Whether this is `Error` or `Complete`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

/// Observer that logs every signal.
pub struct Recorder<T, E> {
    events: Rc<RefCell<Vec<Event<T, E>>>>,
}

impl<T, E> Clone for Recorder<T, E> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<T, E> Default for Recorder<T, E> {
    fn default() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Recorder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("events", &self.events.borrow())
            .finish()
    }
}

impl<T: Clone, E: Clone> Recorder<T, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything heard so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event<T, E>> {
        self.events.borrow().clone()
    }

    /// The `next` values, in order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// The error delivered, if any.
    #[must_use]
    pub fn error_value(&self) -> Option<E> {
        self.events.borrow().iter().find_map(|event| match event {
            Event::Error(err) => Some(err.clone()),
            _ => None,
        })
    }

    #[must_use]
    pub fn next_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Next(_)))
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Error(_)))
    }

    #[must_use]
    pub fn complete_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Complete))
    }

    /// Number of terminal signals heard. Anything but 0 or 1 is a bug.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.count(Event::is_terminal)
    }

    /// Whether a terminal signal was heard.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminal_count() > 0
    }

    /// Forget everything heard so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn count(&self, pred: impl Fn(&Event<T, E>) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| pred(*event)).count()
    }
}

impl<T, E> Observer<T, E> for Recorder<T, E> {
    fn next(&mut self, value: T) {
        self.events.borrow_mut().push(Event::Next(value));
    }

    fn error(&mut self, err: E) -> TeardownResult {
        self.events.borrow_mut().push(Event::Error(err));
        Ok(())
    }

    fn complete(&mut self) -> TeardownResult {
        self.events.borrow_mut().push(Event::Complete);
        Ok(())
    }
}
