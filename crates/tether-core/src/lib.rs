#![forbid(unsafe_code)]

//! Core: cancellation tokens, error types, and the minimal push-stream
//! protocol that the tether runtime consumes.
//!
//! Everything here is single-threaded by construction (`Rc`, `Cell`,
//! `RefCell`); producers and consumers cooperate on one thread and handlers
//! run to completion.

pub mod cancel;
pub mod error;
pub mod stream;

pub use cancel::{CancelController, CancelToken};
pub use error::{Cancelled, StreamError};
pub use stream::{Observable, Observer, Source, Subject, Subscriber, Subscription};
