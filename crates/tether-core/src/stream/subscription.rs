#![forbid(unsafe_code)]

//! RAII subscription handles.
//!
//! A [`Subscription`] owns the teardown logic registered by a producer. It
//! closes exactly once: either through [`Subscription::unsubscribe`], through
//! `Drop`, or when the producer delivers a terminal event. Teardowns run in
//! registration order on that first close; a teardown added after the close
//! runs immediately.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cleanup registered by a producer, run once when its subscription closes.
pub type Teardown = Box<dyn FnOnce()>;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct SubscriptionInner {
    id: u64,
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Teardown>>,
}

impl SubscriptionInner {
    fn new(closed: bool) -> Rc<Self> {
        Rc::new(Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            closed: Cell::new(closed),
            teardowns: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Flip to closed without running teardowns. Returns `true` on the first
    /// call only.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.replace(true)
    }

    /// Drain and run teardowns. The borrow is released before any teardown
    /// runs, so a teardown may safely touch this subscription again.
    pub(crate) fn run_teardowns(&self) {
        let teardowns = std::mem::take(&mut *self.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }

    pub(crate) fn close(&self) {
        if self.mark_closed() {
            tracing::trace!(subscription_id = self.id, "subscription closed");
        }
        self.run_teardowns();
    }

    pub(crate) fn add(&self, teardown: Teardown) {
        if self.is_closed() {
            teardown();
        } else {
            self.teardowns.borrow_mut().push(teardown);
        }
    }
}

/// Handle to a live binding between a source and an observer.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// A fresh, open subscription with no teardowns.
    pub fn new() -> Self {
        Self {
            inner: SubscriptionInner::new(false),
        }
    }

    /// An already-closed subscription, returned by sources that finished
    /// synchronously or had nothing to bind.
    pub fn closed() -> Self {
        Self {
            inner: SubscriptionInner::new(true),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<SubscriptionInner> {
        &self.inner
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Register cleanup to run when this subscription closes.
    ///
    /// Runs immediately if the subscription is already closed.
    pub fn add(&self, teardown: impl FnOnce() + 'static) {
        self.inner.add(Box::new(teardown));
    }

    /// Close the subscription and run its teardowns. Idempotent.
    pub fn unsubscribe(&self) {
        self.inner.close();
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id())
            .field("closed", &self.inner.is_closed())
            .finish()
    }
}
