#![forbid(unsafe_code)]

//! Runtime: value bridging, suspense, and callback emitters on top of the
//! tether-core stream protocol.
//!
//! - [`bridge`]: [`ValueBridge`] exposes the latest value of a source to a
//!   pull-based render, optionally suspending until the first event.
//! - [`emitter`]: [`CallbackEmitter`] turns a plain callback into a
//!   multicast source.
//! - [`host`]: the state, effect, and suspension primitives the bridge
//!   renders against, plus a minimal [`Host`] driver.

pub mod bridge;
pub mod emitter;
pub mod host;

pub use bridge::{BridgeOptions, GateState, SuspenseGate, ValueBridge};
pub use emitter::{CallbackEmitter, Emit, EmitterOptions, make_reactive_callback};
pub use host::{
    EffectSlot, Frame, Host, RenderResult, RenderSignal, StateCell, StateSetter, SuspendHandle,
    Suspended,
};
