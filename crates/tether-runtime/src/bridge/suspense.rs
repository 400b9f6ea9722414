#![forbid(unsafe_code)]

//! Per-bridge suspension state machine.
//!
//! ```text
//!   Idle ──poll()──▶ Awaiting ──resolve()──▶ Resolved
//!    │                                          │
//!    └──────────────resolve()──────────────────▶│
//!    ▲                                          │
//!    └──────────────begin_cycle()───────────────┘
//! ```
//!
//! `begin_cycle()` leaves `Awaiting` untouched.
//!
//! A cycle begins with every new subscription. The first event of the cycle
//! (or a token fired earlier in it) means later renders never suspend again
//! until the next cycle.

use crate::host::{SuspendHandle, SuspendResolver, suspend_pair};

/// Observable state of a [`SuspenseGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No token exists.
    Idle,
    /// A token exists and has not fired.
    Awaiting,
    /// The current cycle already saw its first event.
    Resolved,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Awaiting {
        resolver: SuspendResolver,
        handle: SuspendHandle,
    },
    Resolved,
}

/// Gives one bridge the ability to block a render until its first event.
#[derive(Debug)]
pub struct SuspenseGate {
    phase: Phase,
    tokens_issued: u64,
}

impl SuspenseGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            tokens_issued: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        match self.phase {
            Phase::Idle => GateState::Idle,
            Phase::Awaiting { .. } => GateState::Awaiting,
            Phase::Resolved => GateState::Resolved,
        }
    }

    /// A new subscription cycle starts.
    ///
    /// A pending token is kept: the new subscription's first event fires it.
    pub fn begin_cycle(&mut self) {
        if matches!(self.phase, Phase::Resolved) {
            self.phase = Phase::Idle;
        }
    }

    /// A render wants to suspend. Returns the handle to wait on, or `None`
    /// when the cycle already saw its first event.
    pub fn poll(&mut self) -> Option<SuspendHandle> {
        match &self.phase {
            Phase::Resolved => None,
            Phase::Awaiting { handle, .. } => Some(handle.clone()),
            Phase::Idle => {
                let (resolver, handle) = suspend_pair();
                self.tokens_issued += 1;
                tracing::trace!(handle_id = handle.id(), "suspense token issued");
                self.phase = Phase::Awaiting {
                    resolver,
                    handle: handle.clone(),
                };
                Some(handle)
            }
        }
    }

    /// The outstanding token, if any, without issuing a new one.
    #[must_use]
    pub fn pending(&self) -> Option<SuspendHandle> {
        match &self.phase {
            Phase::Awaiting { handle, .. } => Some(handle.clone()),
            Phase::Idle | Phase::Resolved => None,
        }
    }

    /// An event arrived. Returns whether a token fired.
    pub fn resolve(&mut self) -> bool {
        match std::mem::replace(&mut self.phase, Phase::Resolved) {
            Phase::Awaiting { resolver, .. } => {
                tracing::trace!(handle_id = resolver.id(), "suspense token resolved");
                resolver.resolve();
                true
            }
            Phase::Idle | Phase::Resolved => false,
        }
    }

    /// Number of tokens created over this gate's lifetime.
    #[must_use]
    pub fn tokens_issued(&self) -> u64 {
        self.tokens_issued
    }
}

impl Default for SuspenseGate {
    fn default() -> Self {
        Self::new()
    }
}
