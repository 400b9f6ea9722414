#![forbid(unsafe_code)]

//! Multicast channels fed by explicit calls.
//!
//! A [`Subject`] is both a sink (`next` / `error` / `complete`) and a source.
//! Every subscriber sees the events pushed after it subscribed, in push
//! order; nothing is replayed.
//!
//! # Invariants
//!
//! 1. Once `error` or `complete` has been called, the subject is stopped:
//!    later pushes are ignored.
//! 2. A subscriber that attaches to a stopped subject immediately receives
//!    the terminal event and gets a closed subscription.
//! 3. Emission iterates a snapshot of the subscriber list, so observers may
//!    subscribe, unsubscribe, or push re-entrantly.
//! 4. [`Subject::as_observable`] returns the same identity on every call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::observable::{Observable, Source, Subscriber};
use super::observer::{Observer, SharedObserver};
use super::subscription::Subscription;
use crate::error::StreamError;

enum SubjectState<E> {
    Active,
    Errored(E),
    Completed,
}

struct SubjectInner<T, E> {
    observers: RefCell<Vec<(u64, Subscriber<T, E>)>>,
    next_key: Cell<u64>,
    state: RefCell<SubjectState<E>>,
}

impl<T, E> SubjectInner<T, E> {
    fn is_active(&self) -> bool {
        matches!(*self.state.borrow(), SubjectState::Active)
    }

    fn snapshot(&self) -> Vec<Subscriber<T, E>> {
        self.observers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect()
    }

    fn remove(&self, key: u64) {
        self.observers.borrow_mut().retain(|(k, _)| *k != key);
    }
}

/// A multicast push channel.
///
/// Cloning a `Subject` creates a new handle to the **same** channel.
pub struct Subject<T, E = StreamError> {
    inner: Rc<SubjectInner<T, E>>,
    observable: Observable<T, E>,
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            observable: self.observable.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Subject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.inner.state.borrow() {
            SubjectState::Active => "active",
            SubjectState::Errored(_) => "errored",
            SubjectState::Completed => "completed",
        };
        f.debug_struct("Subject")
            .field("observers", &self.inner.observers.borrow().len())
            .field("state", &state)
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Subject<T, E> {
    #[must_use]
    pub fn new() -> Self {
        let inner = Rc::new(SubjectInner {
            observers: RefCell::new(Vec::new()),
            next_key: Cell::new(0),
            state: RefCell::new(SubjectState::Active),
        });
        let observable = Observable::from_source(SubjectSource {
            inner: Rc::downgrade(&inner),
        });
        Self { inner, observable }
    }

    /// Deliver `value` to every current subscriber. Ignored once stopped.
    pub fn next(&self, value: T) {
        if !self.inner.is_active() {
            return;
        }
        for subscriber in self.inner.snapshot() {
            subscriber.next(value.clone());
        }
    }

    /// Stop the channel with a failure delivered to every subscriber.
    pub fn error(&self, err: E) {
        if !self.inner.is_active() {
            return;
        }
        *self.inner.state.borrow_mut() = SubjectState::Errored(err.clone());
        let subscribers = std::mem::take(&mut *self.inner.observers.borrow_mut());
        for (_, subscriber) in subscribers {
            subscriber.error(err.clone());
        }
    }

    /// Stop the channel normally.
    pub fn complete(&self) {
        if !self.inner.is_active() {
            return;
        }
        *self.inner.state.borrow_mut() = SubjectState::Completed;
        let subscribers = std::mem::take(&mut *self.inner.observers.borrow_mut());
        for (_, subscriber) in subscribers {
            subscriber.complete();
        }
    }

    /// Read-only source view of this channel. Same identity on every call.
    #[must_use]
    pub fn as_observable(&self) -> Observable<T, E> {
        self.observable.clone()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Whether `error` or `complete` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        !self.inner.is_active()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Default for Subject<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Observer<T, E> for Subject<T, E> {
    fn next(&self, value: T) {
        Subject::next(self, value);
    }

    fn error(&self, err: E) {
        Subject::error(self, err);
    }

    fn complete(&self) {
        Subject::complete(self);
    }
}

/// Source side of a subject. Holds the channel weakly so the observable view
/// does not keep a dropped subject's subscriber list alive.
struct SubjectSource<T, E> {
    inner: Weak<SubjectInner<T, E>>,
}

impl<T: 'static, E: Clone + 'static> Source<T, E> for SubjectSource<T, E> {
    fn subscribe(&self, observer: SharedObserver<T, E>) -> Subscription {
        let Some(inner) = self.inner.upgrade() else {
            return Subscription::closed();
        };

        let terminal = match &*inner.state.borrow() {
            SubjectState::Active => None,
            SubjectState::Errored(err) => Some(Some(err.clone())),
            SubjectState::Completed => Some(None),
        };
        if let Some(terminal) = terminal {
            match terminal {
                Some(err) => observer.error(err),
                None => observer.complete(),
            }
            return Subscription::closed();
        }

        let subscription = Subscription::new();
        let key = inner.next_key.get();
        inner.next_key.set(key + 1);
        inner
            .observers
            .borrow_mut()
            .push((key, Subscriber::new(observer, Rc::clone(subscription.inner()))));

        let weak = Rc::downgrade(&inner);
        subscription.add(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(key);
            }
        });
        subscription
    }
}
