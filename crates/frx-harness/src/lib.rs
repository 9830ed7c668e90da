#![forbid(unsafe_code)]

//! Test harness for `frx-core` pipelines.
//!
//! # Role
//! Tests need sources whose timing they control and observers whose
//! history they can inspect. This crate supplies both:
//!
//! - [`MockSource`]: a source parked on its subscriber until the test
//!   calls [`emit`](MockSource::emit), [`complete`](MockSource::complete),
//!   or [`fail`](MockSource::fail); optionally replays a script inside
//!   `subscribe`. Counts subscribes and teardowns.
//! - [`Recorder`]: an observer that logs every [`Event`].
//!
//! ```
//! use frx_harness::{Event, MockSource, Recorder};
//!
//! let source: MockSource<i32, String> = MockSource::new("numbers");
//! let recorder = Recorder::new();
//! let _sub = source.observable().subscribe(recorder.clone()).unwrap();
//!
//! source.emit(7);
//! source.complete().unwrap();
//! assert_eq!(recorder.events(), vec![Event::Next(7), Event::Complete]);
//! assert_eq!(source.teardown_count(), 1);
//! ```

pub mod mock_source;
pub mod recorder;

pub use mock_source::{MockSource, Signal};
pub use recorder::{Event, Recorder};
