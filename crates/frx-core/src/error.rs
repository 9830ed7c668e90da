#![forbid(unsafe_code)]

//! Errors raised while releasing subscription resources.
//!
//! Teardown procedures run during `unsubscribe()` and during the implicit
//! unsubscribe that accompanies `complete`/`error`. A failing teardown is
//! never dropped: every failure observed in one release pass is collected
//! into a single [`TeardownError`] and handed back to whoever triggered the
//! release.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | One teardown fails | Producer cleanup returned `Err` | Remaining teardowns still run |
//! | Several fail | Multiple cleanups in one pass | Causes kept in run order |
//! | Guard drop fails | [`SubscriptionGuard`](crate::SubscriptionGuard) dropped | Logged at `warn` |

use std::error::Error;
use std::fmt;

/// Boxed cause carried by a [`TeardownError`].
pub type BoxError = Box<dyn Error + 'static>;

/// Result of running one or more teardown procedures.
pub type TeardownResult = Result<(), TeardownError>;

/// One or more failures raised by teardown procedures.
///
/// Causes are stored in the order their teardowns ran. `source()` reports
/// the first one.
#[derive(Debug)]
pub struct TeardownError {
    causes: Vec<BoxError>,
}

impl TeardownError {
    /// Wrap a single cause.
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self {
            causes: vec![cause.into()],
        }
    }

    /// All causes, in run order. Never empty.
    #[must_use]
    pub fn causes(&self) -> &[BoxError] {
        &self.causes
    }

    /// Number of teardowns that failed.
    #[must_use]
    pub fn cause_count(&self) -> usize {
        self.causes.len()
    }

    /// Append the causes of `other` after this error's own.
    #[must_use]
    pub fn merge(mut self, other: TeardownError) -> Self {
        self.causes.extend(other.causes);
        self
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.causes.as_slice() {
            [only] => write!(f, "teardown failed: {only}"),
            causes => {
                write!(f, "{} teardowns failed: ", causes.len())?;
                for (i, cause) in causes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{cause}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for TeardownError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.causes.first().map(|cause| cause.as_ref())
    }
}

/// Drain `results`, running every lazy step, and fold the failures into one
/// error.
pub(crate) fn join(results: impl IntoIterator<Item = TeardownResult>) -> TeardownResult {
    let mut failed: Option<TeardownError> = None;
    for result in results {
        if let Err(err) = result {
            failed = Some(match failed {
                Some(acc) => acc.merge(err),
                None => err,
            });
        }
    }
    failed.map_or(Ok(()), Err)
}
