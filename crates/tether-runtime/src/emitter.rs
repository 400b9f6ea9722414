#![forbid(unsafe_code)]

//! Callback-to-stream adapter.
//!
//! A [`CallbackEmitter`] owns a multicast [`Subject`] and hands out two
//! things: a read-only [`Observable`] view of it, and an [`Emit`] handle
//! whose calls push (optionally transformed) values into it. Both keep the
//! same identity for the emitter's lifetime, so a bridge fed by
//! [`CallbackEmitter::channel`] subscribes once.
//!
//! A selector that returns `Err` stops the channel with that failure; the
//! value it was given is not delivered.

use std::fmt;
use std::rc::Rc;

use tether_core::{Observable, StreamError, Subject};

/// Maps an incoming payload to the value pushed into the channel.
pub type Selector<V, R, E> = Rc<dyn Fn(V) -> Result<R, E>>;

/// Builds the channel. Called once per emitter.
pub type Connector<R, E> = Box<dyn FnOnce() -> Subject<R, E>>;

/// Options for [`CallbackEmitter::new`].
pub struct EmitterOptions<V, R = V, E = StreamError> {
    pub selector: Selector<V, R, E>,
    /// `None` means `Subject::new`.
    pub connector: Option<Connector<R, E>>,
}

impl<V: 'static, E: 'static> EmitterOptions<V, V, E> {
    /// Identity selector, default channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selector: Rc::new(Ok::<V, E>),
            connector: None,
        }
    }
}

impl<V: 'static, E: 'static> Default for EmitterOptions<V, V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, R, E> EmitterOptions<V, R, E> {
    /// Options with a transforming selector and the default channel.
    #[must_use]
    pub fn with_selector(selector: impl Fn(V) -> Result<R, E> + 'static) -> Self {
        Self {
            selector: Rc::new(selector),
            connector: None,
        }
    }

    /// Supply the channel instead of `Subject::new`.
    #[must_use]
    pub fn connector(mut self, connector: impl FnOnce() -> Subject<R, E> + 'static) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }
}

impl<V, R, E> fmt::Debug for EmitterOptions<V, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterOptions")
            .field("connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

/// Callable handle that pushes into an emitter's channel.
///
/// Cloning shares the same handle; [`Emit::ptr_eq`] compares identity.
pub struct Emit<V> {
    f: Rc<dyn Fn(V)>,
}

impl<V> Clone for Emit<V> {
    fn clone(&self) -> Self {
        Self { f: Rc::clone(&self.f) }
    }
}

impl<V> Emit<V> {
    /// Push `value` through the selector into the channel.
    pub fn call(&self, value: V) {
        (self.f)(value);
    }

    /// Whether both handles are the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl<V: 'static> Emit<V> {
    /// A plain closure for APIs that want `Fn(V)`.
    #[must_use]
    pub fn into_fn(self) -> impl Fn(V) + 'static {
        move |value| self.call(value)
    }
}

impl<V> fmt::Debug for Emit<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emit")
            .field("ptr", &Rc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Owns a channel and the callback that feeds it.
pub struct CallbackEmitter<V, R = V, E = StreamError> {
    subject: Subject<R, E>,
    emit: Emit<V>,
}

impl<V, R, E> CallbackEmitter<V, R, E>
where
    V: 'static,
    R: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Build the channel (calling the connector once) and the callback.
    #[must_use]
    pub fn new(options: EmitterOptions<V, R, E>) -> Self {
        let EmitterOptions { selector, connector } = options;
        let subject = match connector {
            Some(connector) => connector(),
            None => Subject::new(),
        };

        let target = subject.clone();
        let emit = Emit {
            f: Rc::new(move |value: V| match selector(value) {
                Ok(mapped) => target.next(mapped),
                Err(err) => {
                    tracing::debug!(error = ?err, "selector failed; erroring emission channel");
                    target.error(err);
                }
            }),
        };
        tracing::trace!(channel = ?subject.as_observable().id(), "callback emitter created");
        Self { subject, emit }
    }

    /// Read-only view of the channel. Same identity on every call.
    #[must_use]
    pub fn channel(&self) -> Observable<R, E> {
        self.subject.as_observable()
    }

    /// The feeding callback. Same identity on every call.
    #[must_use]
    pub fn emitter(&self) -> Emit<V> {
        self.emit.clone()
    }

    /// Shorthand for `self.emitter().call(value)`.
    pub fn emit(&self, value: V) {
        self.emit.call(value);
    }

    /// Whether the channel has terminated.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.subject.is_stopped()
    }

    /// Split into the channel view and the callback.
    #[must_use]
    pub fn into_parts(self) -> (Observable<R, E>, Emit<V>) {
        (self.subject.as_observable(), self.emit)
    }
}

impl<V, R, E> fmt::Debug for CallbackEmitter<V, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackEmitter")
            .field("subject", &self.subject)
            .field("emit", &self.emit)
            .finish()
    }
}

/// Build an emitter and return its `(channel, callback)` pair.
///
/// The callback keeps the channel alive; dropping every callback handle
/// leaves the channel view with no producer.
#[must_use]
pub fn make_reactive_callback<V, R, E>(options: EmitterOptions<V, R, E>) -> (Observable<R, E>, Emit<V>)
where
    V: 'static,
    R: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    CallbackEmitter::new(options).into_parts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tether_core::stream::FnObserver;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder<T: fmt::Display + 'static>(log: &Log) -> FnObserver<T, StreamError> {
        let (n, e, c) = (Rc::clone(log), Rc::clone(log), Rc::clone(log));
        FnObserver::new(move |v: T| n.borrow_mut().push(format!("next:{v}")))
            .on_error(move |err: StreamError| e.borrow_mut().push(format!("error:{err}")))
            .on_complete(move || c.borrow_mut().push("complete".to_owned()))
    }

    #[test]
    fn identity_selector_multicasts_without_replay() {
        let emitter = CallbackEmitter::new(EmitterOptions::<i32>::default());
        let early = Log::default();
        let late = Log::default();

        let _a = emitter.channel().subscribe(recorder(&early));
        emitter.emit(1);
        let _b = emitter.channel().subscribe(recorder(&late));
        emitter.emit(2);

        assert_eq!(*early.borrow(), vec!["next:1", "next:2"]);
        assert_eq!(*late.borrow(), vec!["next:2"]);
    }

    #[test]
    fn handles_keep_identity() {
        let emitter = CallbackEmitter::new(EmitterOptions::<i32>::new());
        assert_eq!(emitter.channel(), emitter.channel());
        assert!(emitter.emitter().ptr_eq(&emitter.emitter()));
    }

    #[test]
    fn selector_transforms_payload() {
        struct Event {
            payload: &'static str,
        }

        let (channel, emit) =
            make_reactive_callback(EmitterOptions::with_selector(|e: Event| Ok::<_, StreamError>(e.payload)));
        let log = Log::default();
        let _sub = channel.subscribe(recorder(&log));
        emit.call(Event { payload: "Hello" });
        emit.call(Event { payload: "World" });
        assert_eq!(*log.borrow(), vec!["next:Hello", "next:World"]);
    }

    #[test]
    fn selector_failure_errors_the_channel() {
        let emitter = CallbackEmitter::new(EmitterOptions::with_selector(|v: i32| {
            if v < 0 {
                Err(StreamError::transform("negative"))
            } else {
                Ok(v * 10)
            }
        }));
        let log = Log::default();
        let _sub = emitter.channel().subscribe(recorder(&log));

        emitter.emit(1);
        emitter.emit(-1);
        emitter.emit(2);

        assert!(emitter.is_stopped());
        assert_eq!(
            *log.borrow(),
            vec!["next:10", "error:transform failed: negative"]
        );
    }

    #[test]
    fn connector_called_once_and_used() {
        let calls = Rc::new(Cell::new(0));
        let external = Subject::<i32>::new();
        let c = Rc::clone(&calls);
        let handed = external.clone();
        let emitter = CallbackEmitter::new(EmitterOptions::new().connector(move || {
            c.set(c.get() + 1);
            handed
        }));

        let _ = emitter.channel();
        let _ = emitter.emitter();
        assert_eq!(calls.get(), 1);
        assert_eq!(emitter.channel(), external.as_observable());

        let log = Log::default();
        let _sub = external.as_observable().subscribe(recorder(&log));
        emitter.emit(5);
        assert_eq!(*log.borrow(), vec!["next:5"]);
    }

    #[test]
    fn late_subscriber_to_stopped_channel_sees_failure() {
        let emitter = CallbackEmitter::new(EmitterOptions::with_selector(|_: i32| {
            Err::<i32, _>(StreamError::msg("nope"))
        }));
        emitter.emit(0);

        let log = Log::default();
        let _sub = emitter.channel().subscribe(recorder(&log));
        assert_eq!(*log.borrow(), vec!["error:nope"]);
    }

    #[test]
    fn into_fn_pushes() {
        let (channel, emit) = make_reactive_callback(EmitterOptions::<u8>::new());
        let log = Log::default();
        let _sub = channel.subscribe(recorder(&log));
        let f = emit.into_fn();
        f(3);
        assert_eq!(*log.borrow(), vec!["next:3"]);
    }
}
