#![forbid(unsafe_code)]

//! Concatenation of sources with different element types.
//!
//! The combined element type of `concat(a: A, b: B, ...)` is "one of A, B,
//! ...". Rust expresses that as an explicit sum type, so this module ships
//! [`Union2`], [`Union3`], and [`Union4`] plus matching `concatN` functions
//! that tag each source's values with the variant of its position.
//!
//! ```
//! use frx_core::{Observable, Union3, concat3};
//!
//! let mixed = concat3(
//!     Observable::<i32, ()>::from_items(vec![1]),
//!     Observable::from_items(vec!["one"]),
//!     Observable::from_items(vec![true]),
//! );
//! let observer = frx_core::FnObserver::<Union3<i32, &str, bool>, ()>::new()
//!     .on_next(|v| println!("{v:?}"));
//! let _sub = mixed.subscribe(observer).unwrap();
//! ```

use crate::concat::concat;
use crate::error::TeardownResult;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::teardown::Teardown;

/// A value from one of two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Union2<A, B> {
    First(A),
    Second(B),
}

/// A value from one of three sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Union3<A, B, C> {
    First(A),
    Second(B),
    Third(C),
}

/// A value from one of four sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Union4<A, B, C, D> {
    First(A),
    Second(B),
    Third(C),
    Fourth(D),
}

impl<A, B> Union2<A, B> {
    /// Zero-based position of the source that produced this value.
    #[must_use]
    pub fn source_index(&self) -> usize {
        match self {
            Self::First(_) => 0,
            Self::Second(_) => 1,
        }
    }
}

impl<A, B, C> Union3<A, B, C> {
    /// Zero-based position of the source that produced this value.
    #[must_use]
    pub fn source_index(&self) -> usize {
        match self {
            Self::First(_) => 0,
            Self::Second(_) => 1,
            Self::Third(_) => 2,
        }
    }
}

impl<A, B, C, D> Union4<A, B, C, D> {
    /// Zero-based position of the source that produced this value.
    #[must_use]
    pub fn source_index(&self) -> usize {
        match self {
            Self::First(_) => 0,
            Self::Second(_) => 1,
            Self::Third(_) => 2,
            Self::Fourth(_) => 3,
        }
    }
}

impl<T> Union2<T, T> {
    /// Unwrap when every source shares one element type.
    pub fn into_inner(self) -> T {
        match self {
            Self::First(v) | Self::Second(v) => v,
        }
    }
}

impl<T> Union3<T, T, T> {
    /// Unwrap when every source shares one element type.
    pub fn into_inner(self) -> T {
        match self {
            Self::First(v) | Self::Second(v) | Self::Third(v) => v,
        }
    }
}

impl<T> Union4<T, T, T, T> {
    /// Unwrap when every source shares one element type.
    pub fn into_inner(self) -> T {
        match self {
            Self::First(v) | Self::Second(v) | Self::Third(v) | Self::Fourth(v) => v,
        }
    }
}

/// `a` then `b`.
pub fn concat2<A, B, E>(a: Observable<A, E>, b: Observable<B, E>) -> Observable<Union2<A, B>, E>
where
    A: 'static,
    B: 'static,
    E: 'static,
{
    concat([tag(a, Union2::First), tag(b, Union2::Second)])
}

/// `a`, then `b`, then `c`.
pub fn concat3<A, B, C, E>(
    a: Observable<A, E>,
    b: Observable<B, E>,
    c: Observable<C, E>,
) -> Observable<Union3<A, B, C>, E>
where
    A: 'static,
    B: 'static,
    C: 'static,
    E: 'static,
{
    concat([
        tag(a, Union3::First),
        tag(b, Union3::Second),
        tag(c, Union3::Third),
    ])
}

/// `a`, `b`, `c`, then `d`.
pub fn concat4<A, B, C, D, E>(
    a: Observable<A, E>,
    b: Observable<B, E>,
    c: Observable<C, E>,
    d: Observable<D, E>,
) -> Observable<Union4<A, B, C, D>, E>
where
    A: 'static,
    B: 'static,
    C: 'static,
    D: 'static,
    E: 'static,
{
    concat([
        tag(a, Union4::First),
        tag(b, Union4::Second),
        tag(c, Union4::Third),
        tag(d, Union4::Fourth),
    ])
}

/// Re-emit `source`'s values wrapped by `wrap`; signals otherwise pass
/// through untouched.
fn tag<T, U, E>(source: Observable<T, E>, wrap: fn(T) -> U) -> Observable<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
{
    Observable::new(move |downstream| {
        source
            .subscribe(Tagged { wrap, downstream })
            .map(Teardown::from)
    })
}

struct Tagged<T, U, E> {
    wrap: fn(T) -> U,
    downstream: Subscriber<U, E>,
}

impl<T, U, E> Observer<T, E> for Tagged<T, U, E> {
    fn next(&mut self, value: T) {
        self.downstream.next((self.wrap)(value));
    }

    fn is_closed(&self) -> bool {
        !self.downstream.is_active()
    }

    fn error(&mut self, err: E) -> TeardownResult {
        self.downstream.error(err)
    }

    fn complete(&mut self) -> TeardownResult {
        self.downstream.complete()
    }
}
