//! Per-subscription cancellation tokens.
//!
//! A [`CancelToken`] marks one specific subscription instance as live or
//! cancelled. Handlers bound to a subscription hold the token and check it
//! before touching any state; the owner holds the companion
//! [`CancelController`] and flips it exactly once.
//!
//! Every subscription gets a fresh token. A token is never reset or reused
//! for a later subscription, so a stale handler that fires after its
//! subscription was replaced always observes `is_cancelled() == true`.
//!
//! # Example
//!
//! ```
//! use tether_core::cancel::CancelToken;
//!
//! let (token, ctrl) = CancelToken::new();
//! assert!(!token.is_cancelled());
//!
//! ctrl.cancel();
//! assert!(token.is_cancelled());
//! assert!(token.check().is_err());
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Cancelled;

// ─── Token ID generation ─────────────────────────────────────────────────────

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

fn next_token_id() -> u64 {
    NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Metrics counters ────────────────────────────────────────────────────────

/// Total number of token cancellations observed (first cancel only).
static CANCELLATIONS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Read the total cancellation count (for diagnostics).
#[must_use]
pub fn cancellations_total() -> u64 {
    CANCELLATIONS_TOTAL.load(Ordering::Relaxed)
}

// ─── Inner shared state ──────────────────────────────────────────────────────

#[derive(Debug)]
struct TokenInner {
    id: u64,
    cancelled: Cell<bool>,
}

// ─── CancelToken ─────────────────────────────────────────────────────────────

/// Read side of a one-shot cancellation flag.
///
/// Cheaply cloneable; all clones observe the same flag.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Rc<TokenInner>,
}

impl CancelToken {
    /// Create a fresh, live token together with its controller.
    #[must_use]
    pub fn new() -> (Self, CancelController) {
        let inner = Rc::new(TokenInner {
            id: next_token_id(),
            cancelled: Cell::new(false),
        });
        let token = Self {
            inner: Rc::clone(&inner),
        };
        (token, CancelController { inner })
    }

    /// Unique identifier for this token (for tracing/logging).
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Return `Err(Cancelled)` once the token has been cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

// ─── CancelController ────────────────────────────────────────────────────────

/// Control handle for a [`CancelToken`].
///
/// Dropping the controller does **not** cancel the token; cancellation is
/// always explicit.
#[derive(Debug)]
pub struct CancelController {
    inner: Rc<TokenInner>,
}

impl CancelController {
    /// Cancel the associated token. Idempotent.
    pub fn cancel(&self) {
        let was_cancelled = self.inner.cancelled.replace(true);
        if !was_cancelled {
            CANCELLATIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(token_id = self.inner.id, "subscription token cancelled");
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Another read handle for the same flag.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            inner: Rc::clone(&self.inner),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
