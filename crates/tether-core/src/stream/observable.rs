#![forbid(unsafe_code)]

//! Identity-compared source handles.
//!
//! # Design
//!
//! [`Observable<T, E>`] wraps an `Rc<dyn Source<T, E>>`. Cloning shares the
//! same producer, and equality is pointer identity of that producer: two
//! handles are equal iff they are clones of one another. Consumers that must
//! decide whether to resubscribe compare handles, never values.
//!
//! Producers built with [`Observable::new`] receive a [`Subscriber`] that
//! enforces the protocol on their behalf:
//!
//! 1. Nothing is delivered after a terminal event or after unsubscribe.
//! 2. A terminal event closes the subscription and runs its teardowns.
//! 3. Each `subscribe` call runs the producer afresh (cold sources), so
//!    `of`, `map` and `scan` can be subscribed to any number of times.
//!
//! Sources implemented directly through [`Source`] get none of these
//! guarantees; consumers that need them must guard themselves.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::observer::{Observer, SharedObserver};
use super::subscription::{Subscription, SubscriptionInner, Teardown};
use crate::error::StreamError;

/// The producer half of the push protocol.
pub trait Source<T, E> {
    /// Bind `observer` to this source. Events may be delivered before this
    /// call returns.
    fn subscribe(&self, observer: SharedObserver<T, E>) -> Subscription;
}

/// Opaque identity of a source, stable for as long as any handle is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

/// Shared, identity-compared handle to a [`Source`].
pub struct Observable<T, E = StreamError> {
    source: Rc<dyn Source<T, E>>,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
        }
    }
}

impl<T, E> PartialEq for Observable<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T, E> Eq for Observable<T, E> {}

impl<T, E> fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").field("id", &self.id()).finish()
    }
}

impl<T, E> Observable<T, E> {
    /// Identity of the underlying producer.
    #[must_use]
    pub fn id(&self) -> SourceId {
        SourceId(Rc::as_ptr(&self.source).cast::<()>() as usize)
    }

    /// Whether both handles point at the same producer.
    #[must_use]
    pub fn same_source(&self, other: &Self) -> bool {
        self == other
    }

    /// Bind an already-shared observer.
    pub fn subscribe_shared(&self, observer: SharedObserver<T, E>) -> Subscription {
        self.source.subscribe(observer)
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Wrap a hand-written [`Source`].
    pub fn from_source(source: impl Source<T, E> + 'static) -> Self {
        Self {
            source: Rc::new(source),
        }
    }

    /// Build a cold source from a producer function.
    ///
    /// The producer runs once per `subscribe` call and may emit
    /// synchronously, keep the [`Subscriber`] for later, and register
    /// teardowns with [`Subscriber::add_teardown`].
    pub fn new(produce: impl Fn(Subscriber<T, E>) + 'static) -> Self {
        Self::from_source(Producer { produce })
    }

    /// Bind `observer`; events may arrive before this returns.
    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        self.source.subscribe(Rc::new(observer))
    }

    /// Emits nothing and never terminates.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| {})
    }

    /// Completes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|subscriber| subscriber.complete())
    }

    /// Fails immediately with `err`.
    pub fn throw_error(err: E) -> Self
    where
        E: Clone,
    {
        Self::new(move |subscriber| subscriber.error(err.clone()))
    }

    /// Emits every value synchronously on subscribe, then completes.
    pub fn of(values: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        let values: Vec<T> = values.into_iter().collect();
        Self::new(move |subscriber| {
            for value in &values {
                if subscriber.is_closed() {
                    return;
                }
                subscriber.next(value.clone());
            }
            subscriber.complete();
        })
    }

    /// Transform every value. Terminal events pass through unchanged.
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Observable<U, E> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Observable::new(move |downstream: Subscriber<U, E>| {
            let f = Rc::clone(&f);
            let inner = upstream.subscribe(Relay {
                downstream: downstream.clone(),
                on_next: move |value: T, downstream: &Subscriber<U, E>| downstream.next(f(value)),
            });
            downstream.add_teardown(move || drop(inner));
        })
    }

    /// Fold values into an accumulator, emitting each intermediate result.
    ///
    /// The accumulator restarts from `seed` for every subscription.
    pub fn scan<A>(&self, seed: A, f: impl Fn(&A, T) -> A + 'static) -> Observable<A, E>
    where
        A: Clone + 'static,
    {
        let upstream = self.clone();
        let f = Rc::new(f);
        Observable::new(move |downstream: Subscriber<A, E>| {
            let f = Rc::clone(&f);
            let acc = RefCell::new(seed.clone());
            let inner = upstream.subscribe(Relay {
                downstream: downstream.clone(),
                on_next: move |value: T, downstream: &Subscriber<A, E>| {
                    let next = f(&*acc.borrow(), value);
                    *acc.borrow_mut() = next.clone();
                    downstream.next(next);
                },
            });
            downstream.add_teardown(move || drop(inner));
        })
    }
}

// ─── Producer-backed sources ─────────────────────────────────────────────────

struct Producer<F> {
    produce: F,
}

impl<T, E, F> Source<T, E> for Producer<F>
where
    F: Fn(Subscriber<T, E>),
{
    fn subscribe(&self, observer: SharedObserver<T, E>) -> Subscription {
        let subscription = Subscription::new();
        let subscriber = Subscriber::new(observer, Rc::clone(subscription.inner()));
        (self.produce)(subscriber);
        subscription
    }
}

/// Forwards upstream events into a downstream subscriber, rewriting `next`.
struct Relay<U, E, N> {
    downstream: Subscriber<U, E>,
    on_next: N,
}

impl<T, U, E, N> Observer<T, E> for Relay<U, E, N>
where
    N: Fn(T, &Subscriber<U, E>),
{
    fn next(&self, value: T) {
        (self.on_next)(value, &self.downstream);
    }

    fn error(&self, err: E) {
        self.downstream.error(err);
    }

    fn complete(&self) {
        self.downstream.complete();
    }
}

// ─── Subscriber ──────────────────────────────────────────────────────────────

/// Protocol-enforcing sink handed to producers.
///
/// Cheaply cloneable; all clones share one closed flag.
pub struct Subscriber<T, E> {
    observer: SharedObserver<T, E>,
    subscription: Rc<SubscriptionInner>,
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            observer: Rc::clone(&self.observer),
            subscription: Rc::clone(&self.subscription),
        }
    }
}

impl<T, E> Subscriber<T, E> {
    pub(crate) fn new(observer: SharedObserver<T, E>, subscription: Rc<SubscriptionInner>) -> Self {
        Self {
            observer,
            subscription,
        }
    }

    /// Whether the consumer unsubscribed or a terminal event was delivered.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Run `teardown` when the subscription closes (immediately if it
    /// already has).
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) {
        let teardown: Teardown = Box::new(teardown);
        self.subscription.add(teardown);
    }

    pub fn next(&self, value: T) {
        if self.is_closed() {
            return;
        }
        self.observer.next(value);
    }

    pub fn error(&self, err: E) {
        if !self.subscription.mark_closed() {
            return;
        }
        self.observer.error(err);
        self.subscription.run_teardowns();
    }

    pub fn complete(&self) {
        if !self.subscription.mark_closed() {
            return;
        }
        self.observer.complete();
        self.subscription.run_teardowns();
    }
}

impl<T, E> Observer<T, E> for Subscriber<T, E> {
    fn next(&self, value: T) {
        Subscriber::next(self, value);
    }

    fn error(&self, err: E) {
        Subscriber::error(self, err);
    }

    fn complete(&self) {
        Subscriber::complete(self);
    }
}

impl<T, E> fmt::Debug for Subscriber<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("subscription_id", &self.subscription.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
