#![forbid(unsafe_code)]

//! Per-call configuration for [`ValueBridge::bridge_value`].
//!
//! [`ValueBridge::bridge_value`]: super::ValueBridge::bridge_value

use std::fmt;
use std::rc::Rc;

use tether_core::StreamError;

/// Failure terminal handler.
pub type ErrorHandler<E> = Rc<dyn Fn(E)>;

/// Normal terminal handler.
pub type CompleteHandler = Rc<dyn Fn()>;

/// Options for one bridged value.
///
/// All fields are public; the builder methods are a convenience.
///
/// # Example
///
/// ```
/// use tether_runtime::bridge::BridgeOptions;
///
/// let options: BridgeOptions<&str> = BridgeOptions::new()
///     .default_value("Awaiting input")
///     .on_complete(|| println!("done"));
/// assert_eq!(options.default_value, Some("Awaiting input"));
/// assert!(!options.suspense);
/// ```
pub struct BridgeOptions<V, E = StreamError> {
    /// Exposed before the first emission. Only read on the first render.
    pub default_value: Option<V>,
    /// Receives the source's failure. Without it the failure goes to the
    /// unhandled-error hook.
    pub on_error: Option<ErrorHandler<E>>,
    pub on_complete: Option<CompleteHandler>,
    /// Suspend the first render of each subscription cycle until an event
    /// arrives.
    pub suspense: bool,
}

impl<V, E> BridgeOptions<V, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_value: None,
            on_error: None,
            on_complete: None,
            suspense: false,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: V) -> Self {
        self.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(E) + 'static) -> Self {
        self.on_error = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn on_complete(mut self, handler: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn suspense(mut self, suspense: bool) -> Self {
        self.suspense = suspense;
        self
    }
}

impl<V, E> Default for BridgeOptions<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, E> Clone for BridgeOptions<V, E> {
    fn clone(&self) -> Self {
        Self {
            default_value: self.default_value.clone(),
            on_error: self.on_error.clone(),
            on_complete: self.on_complete.clone(),
            suspense: self.suspense,
        }
    }
}

impl<V: fmt::Debug, E> fmt::Debug for BridgeOptions<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("default_value", &self.default_value)
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("suspense", &self.suspense)
            .finish()
    }
}
