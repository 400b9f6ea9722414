//! The consumer half of the push protocol.

use std::fmt;
use std::rc::Rc;

use super::unhandled::report_unhandled_error;

/// Receives the events of one subscription.
///
/// Methods take `&self`: observers are shared behind `Rc` and invoked
/// without holding any borrow, so an observer may re-enter the source that
/// is calling it. Implementations keep their mutable state in `Cell` or
/// `RefCell`.
pub trait Observer<T, E> {
    fn next(&self, value: T);
    fn error(&self, err: E);
    fn complete(&self);
}

/// Type-erased, shared observer as stored by sources.
pub type SharedObserver<T, E> = Rc<dyn Observer<T, E>>;

/// An [`Observer`] assembled from closures.
///
/// Without an error handler, failures are forwarded to the unhandled-error
/// hook rather than dropped.
pub struct FnObserver<T, E> {
    on_next: Box<dyn Fn(T)>,
    on_error: Option<Box<dyn Fn(E)>>,
    on_complete: Option<Box<dyn Fn()>>,
}

impl<T, E> FnObserver<T, E> {
    pub fn new(on_next: impl Fn(T) + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
            on_complete: None,
        }
    }

    #[must_use]
    pub fn on_error(mut self, on_error: impl Fn(E) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    #[must_use]
    pub fn on_complete(mut self, on_complete: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }
}

impl<T, E: fmt::Debug> Observer<T, E> for FnObserver<T, E> {
    fn next(&self, value: T) {
        (self.on_next)(value);
    }

    fn error(&self, err: E) {
        match &self.on_error {
            Some(on_error) => on_error(err),
            None => report_unhandled_error(&err),
        }
    }

    fn complete(&self) {
        if let Some(on_complete) = &self.on_complete {
            on_complete();
        }
    }
}

impl<T, E> fmt::Debug for FnObserver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver")
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish_non_exhaustive()
    }
}
