#![forbid(unsafe_code)]

//! Release procedures returned by producers.

use std::fmt;

use crate::error::{BoxError, TeardownError, TeardownResult};
use crate::subscription::Subscription;

type Action = Box<dyn FnOnce() -> TeardownResult>;

/// An optional, run-once release procedure.
///
/// A producer returns a `Teardown` describing how to stop whatever it
/// started (timers, sockets, nested subscriptions). The owning
/// [`Subscription`] runs it exactly once, when the subscription ends by
/// completion, error, or explicit cancellation.
#[must_use]
pub struct Teardown {
    action: Option<Action>,
}

impl Teardown {
    /// A teardown that does nothing.
    pub fn none() -> Self {
        Self { action: None }
    }

    /// Wrap an infallible release closure.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            action: Some(Box::new(move || {
                release();
                Ok(())
            })),
        }
    }

    /// Wrap a release closure that can fail. The failure surfaces from the
    /// call that ended the subscription.
    pub fn fallible<Er>(release: impl FnOnce() -> Result<(), Er> + 'static) -> Self
    where
        Er: Into<BoxError>,
    {
        Self {
            action: Some(Box::new(move || release().map_err(TeardownError::new))),
        }
    }

    /// Wrap a release closure that itself ends other subscriptions and
    /// already reports in [`TeardownError`] form.
    pub fn chain(release: impl FnOnce() -> TeardownResult + 'static) -> Self {
        Self {
            action: Some(Box::new(release)),
        }
    }

    /// Whether this teardown has no work to do.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.action.is_none()
    }

    pub(crate) fn run(self) -> TeardownResult {
        match self.action {
            Some(action) => action(),
            None => Ok(()),
        }
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Subscription> for Teardown {
    fn from(subscription: Subscription) -> Self {
        Self::chain(move || subscription.unsubscribe())
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("armed", &self.action.is_some())
            .finish()
    }
}
