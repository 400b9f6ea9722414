#![forbid(unsafe_code)]

//! Push-to-pull value bridging.
//!
//! A [`ValueBridge`] turns an [`Observable`] into a value a render can read
//! synchronously:
//!
//! ```text
//!   Observable ──subscribe──▶ BridgeObserver ──set──▶ StateCell ──▶ render
//!                                  │
//!                                  └──resolve──▶ SuspenseGate ──▶ SuspendHandle
//! ```
//!
//! # Invariants
//!
//! 1. At most one subscription is live per bridge. Switching sources
//!    cancels the old subscription before the new one is created.
//! 2. A cancelled or terminated subscription never touches render state,
//!    the gate, or the caller's handlers again.
//! 3. A failure without an `on_error` handler reaches the unhandled-error
//!    hook; it is never dropped.
//! 4. With `suspense`, each subscription cycle issues at most one token, and
//!    a render after the first event never suspends.
//!
//! [`Observable`]: tether_core::Observable

pub mod options;
pub mod suspense;
mod value_bridge;

pub use options::{BridgeOptions, CompleteHandler, ErrorHandler};
pub use suspense::{GateState, SuspenseGate};
pub use value_bridge::ValueBridge;
