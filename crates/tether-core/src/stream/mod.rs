#![forbid(unsafe_code)]

//! Minimal push-stream protocol.
//!
//! - [`Observer`]: receives `next`, `error`, and `complete` events.
//! - [`Source`] / [`Observable`]: a producer, compared by identity.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Subject`]: a multicast channel fed by explicit calls.
//! - [`report_unhandled_error`]: where failures without a handler go.
//!
//! # Architecture
//!
//! Everything uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Observers are stored as `Rc<dyn Observer>` and invoked outside of any
//! borrow, so handlers may re-enter the stream that is calling them.
//!
//! # Invariants
//!
//! 1. A subscription delivers at most one terminal event.
//! 2. Nothing is delivered through a [`Subscriber`] after its terminal event
//!    or after its subscription was closed.
//! 3. Subscribers of a [`Subject`] are notified in registration order.
//! 4. Dropping a [`Subscription`] runs its teardowns exactly once.

pub mod observable;
pub mod observer;
pub mod subject;
pub mod subscription;
pub mod unhandled;

pub use observable::{Observable, Source, SourceId, Subscriber};
pub use observer::{FnObserver, Observer, SharedObserver};
pub use subject::Subject;
pub use subscription::{Subscription, Teardown};
pub use unhandled::{
    UnhandledErrorHook, UnhandledErrorHookGuard, report_unhandled_error, set_unhandled_error_hook,
    unhandled_errors_total,
};
