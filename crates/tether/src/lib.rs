#![forbid(unsafe_code)]

//! tether public facade crate.
//!
//! Bridges push-based value sources into a pull-based render and turns
//! callbacks back into sources.
//!
//! ```
//! use tether::prelude::*;
//!
//! let emitter = CallbackEmitter::new(EmitterOptions::<&str>::new());
//! let source = emitter.channel();
//! let emit = emitter.emitter();
//!
//! let signal = RenderSignal::new();
//! let mut bridge = ValueBridge::new(signal.clone());
//! let mut host = Host::mount(signal, move || {
//!     bridge.bridge_value(Some(&source), &BridgeOptions::new().default_value("Default"))
//! });
//! assert_eq!(host.value(), Some(&Some("Default")));
//!
//! emit.call("Updated!");
//! host.flush();
//! assert_eq!(host.value(), Some(&Some("Updated!")));
//! ```

pub mod prelude {
    pub use tether_core as core;
    pub use tether_core::stream::{FnObserver, set_unhandled_error_hook};
    pub use tether_core::{
        CancelController, CancelToken, Observable, Observer, StreamError, Subject, Subscription,
    };

    #[cfg(feature = "runtime")]
    pub use tether_runtime as runtime;
    #[cfg(feature = "runtime")]
    pub use tether_runtime::{
        BridgeOptions, CallbackEmitter, Emit, EmitterOptions, Frame, Host, RenderResult,
        RenderSignal, ValueBridge, make_reactive_callback,
    };
}
