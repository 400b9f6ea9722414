#![forbid(unsafe_code)]

//! The value bridge: one live subscription per source identity, exposed as
//! a synchronously readable current value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::stream::{Observable, Observer, SourceId, report_unhandled_error};
use tether_core::{CancelToken, StreamError};

use super::options::{BridgeOptions, CompleteHandler, ErrorHandler};
use super::suspense::{GateState, SuspenseGate};
use crate::host::{Cleanup, EffectSlot, RenderResult, RenderSignal, StateCell, StateSetter, Suspended};

/// Bridges a push source into render state.
///
/// Own one per rendering component and call [`bridge_value`] on every
/// render. Dropping the bridge cancels its subscription.
///
/// [`bridge_value`]: ValueBridge::bridge_value
pub struct ValueBridge<V, E = StreamError> {
    signal: RenderSignal,
    state: Option<StateCell<Option<V>>>,
    gate: Rc<RefCell<SuspenseGate>>,
    subscription: EffectSlot<Option<Observable<V, E>>>,
    /// Cleared once the live subscription closes or sees a terminal event.
    live: Rc<Cell<bool>>,
}

impl<V: Clone + 'static, E: fmt::Debug + 'static> ValueBridge<V, E> {
    /// Create a bridge whose state updates request renders through `signal`.
    #[must_use]
    pub fn new(signal: RenderSignal) -> Self {
        Self {
            signal,
            state: None,
            gate: Rc::new(RefCell::new(SuspenseGate::new())),
            subscription: EffectSlot::new(),
            live: Rc::new(Cell::new(false)),
        }
    }

    /// Read the current value of `source` for this render.
    ///
    /// Subscribes when `source` is new (by identity), cancelling the previous
    /// subscription first. An absent source cancels any subscription and
    /// leaves the value untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Suspended`] when `options.suspense` is set and the current
    /// subscription cycle has not seen an event yet.
    pub fn bridge_value(
        &mut self,
        source: Option<&Observable<V, E>>,
        options: &BridgeOptions<V, E>,
    ) -> RenderResult<Option<V>> {
        let signal = &self.signal;
        let state = self
            .state
            .get_or_insert_with(|| StateCell::new(options.default_value.clone(), signal.clone()));

        let setter = state.setter();
        let gate = Rc::clone(&self.gate);
        let on_error = options.on_error.clone();
        let on_complete = options.on_complete.clone();
        let live = Rc::clone(&self.live);
        self.subscription.sync(source.cloned(), move |source| {
            let source = source.as_ref()?;
            gate.borrow_mut().begin_cycle();

            let (token, controller) = CancelToken::new();
            let token_id = token.id();
            live.set(true);
            let observer = BridgeObserver {
                token,
                terminated: Cell::new(false),
                live: Rc::clone(&live),
                state: setter,
                gate,
                on_error,
                on_complete,
            };
            tracing::debug!(source = ?source.id(), token_id, "bridge subscribing");
            let subscription = source.subscribe(observer);
            tracing::trace!(
                token_id,
                subscription_id = subscription.id(),
                closed = subscription.is_closed(),
                "bridge subscribed"
            );
            if subscription.is_closed() {
                live.set(false);
            }

            Some(Box::new(move || {
                tracing::debug!(token_id, "bridge cancelling subscription");
                controller.cancel();
                live.set(false);
                subscription.unsubscribe();
            }) as Cleanup)
        });

        if options.suspense {
            // Without a source nothing could fire a new token, so only an
            // outstanding one suspends.
            let handle = match source {
                Some(_) => self.gate.borrow_mut().poll(),
                None => self.gate.borrow().pending(),
            };
            if let Some(handle) = handle {
                tracing::trace!(handle_id = handle.id(), "bridge suspending render");
                return Err(Suspended::new(handle));
            }
        }

        Ok(state.get())
    }

    /// Cancel the active subscription, if any. Idempotent.
    ///
    /// The next `bridge_value` with a source subscribes afresh.
    pub fn teardown(&mut self) {
        self.subscription.teardown();
    }

    /// Whether a subscription is open and its source has not terminated.
    ///
    /// A source that already stopped keeps its slot (rerenders with the
    /// same identity do not resubscribe) but reports `false` here.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active() && self.live.get()
    }

    /// Identity of the source the live subscription belongs to.
    #[must_use]
    pub fn subscribed_source(&self) -> Option<SourceId> {
        if !self.is_subscribed() {
            return None;
        }
        self.subscription.deps().and_then(|deps| deps.as_ref()).map(Observable::id)
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        self.gate.borrow().state()
    }

    /// Number of suspense tokens this bridge has issued.
    #[must_use]
    pub fn tokens_issued(&self) -> u64 {
        self.gate.borrow().tokens_issued()
    }

    /// The current value without subscribing. `None` before the first render.
    #[must_use]
    pub fn current(&self) -> Option<V> {
        self.state.as_ref().and_then(StateCell::get)
    }
}

impl<V, E> fmt::Debug for ValueBridge<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueBridge")
            .field("subscribed", &(self.subscription.is_active() && self.live.get()))
            .field("gate", &self.gate.borrow().state())
            .finish()
    }
}

/// Handler triple of one subscription.
///
/// Events are honoured only while the subscription's own token is live and
/// no terminal event has been seen.
struct BridgeObserver<V, E> {
    token: CancelToken,
    terminated: Cell<bool>,
    live: Rc<Cell<bool>>,
    state: StateSetter<Option<V>>,
    gate: Rc<RefCell<SuspenseGate>>,
    on_error: Option<ErrorHandler<E>>,
    on_complete: Option<CompleteHandler>,
}

impl<V, E> BridgeObserver<V, E> {
    fn accepts(&self, event: &'static str) -> bool {
        if self.token.is_cancelled() || self.terminated.get() {
            tracing::trace!(token_id = self.token.id(), event, "discarding event from inactive subscription");
            return false;
        }
        true
    }

    fn settle(&self) {
        let fired = self.gate.borrow_mut().resolve();
        if fired {
            tracing::trace!(token_id = self.token.id(), "first event released suspended render");
        }
    }
}

impl<V, E: fmt::Debug> Observer<V, E> for BridgeObserver<V, E> {
    fn next(&self, value: V) {
        if !self.accepts("next") {
            return;
        }
        self.settle();
        self.state.set(Some(value));
    }

    fn error(&self, err: E) {
        if !self.accepts("error") {
            return;
        }
        self.terminated.set(true);
        self.live.set(false);
        self.settle();
        match &self.on_error {
            Some(handler) => handler(err),
            None => report_unhandled_error(&err),
        }
    }

    fn complete(&self) {
        if !self.accepts("complete") {
            return;
        }
        self.terminated.set(true);
        self.live.set(false);
        self.settle();
        if let Some(handler) = &self.on_complete {
            handler();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::stream::Subject;

    fn bridge() -> (RenderSignal, ValueBridge<i32>) {
        let signal = RenderSignal::new();
        (signal.clone(), ValueBridge::new(signal))
    }

    #[test]
    fn exposes_default_until_first_emission() {
        let (signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let source = subject.as_observable();
        let options = BridgeOptions::new().default_value(7);

        assert_eq!(bridge.bridge_value(Some(&source), &options).ok(), Some(Some(7)));
        subject.next(9);
        assert!(signal.is_pending());
        assert_eq!(bridge.bridge_value(Some(&source), &options).ok(), Some(Some(9)));
    }

    #[test]
    fn same_identity_subscribes_once() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let options = BridgeOptions::new();

        for _ in 0..3 {
            let _ = bridge.bridge_value(Some(&subject.as_observable()), &options);
        }
        assert_eq!(subject.observer_count(), 1);
        assert_eq!(bridge.subscribed_source(), Some(subject.as_observable().id()));
    }

    #[test]
    fn absent_source_cancels_and_keeps_value() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let options = BridgeOptions::new();

        let _ = bridge.bridge_value(Some(&subject.as_observable()), &options);
        subject.next(4);
        assert_eq!(bridge.bridge_value(None, &options).ok(), Some(Some(4)));
        assert!(!bridge.is_subscribed());
        assert_eq!(subject.observer_count(), 0);
        assert_eq!(bridge.subscribed_source(), None);
    }

    #[test]
    fn drop_cancels_subscription() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let _ = bridge.bridge_value(Some(&subject.as_observable()), &BridgeOptions::new());
        assert_eq!(subject.observer_count(), 1);
        drop(bridge);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn teardown_is_idempotent_and_resubscribes_afterwards() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let source = subject.as_observable();
        let options = BridgeOptions::new();

        let _ = bridge.bridge_value(Some(&source), &options);
        bridge.teardown();
        bridge.teardown();
        assert_eq!(subject.observer_count(), 0);

        let _ = bridge.bridge_value(Some(&source), &options);
        assert_eq!(subject.observer_count(), 1);
    }

    #[test]
    fn stopped_source_is_not_reported_as_subscribed() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        subject.complete();
        let source = subject.as_observable();

        let _ = bridge.bridge_value(Some(&source), &BridgeOptions::new());
        assert!(!bridge.is_subscribed());
        assert_eq!(bridge.subscribed_source(), None);

        // Same identity keeps the slot: no second subscription.
        let _ = bridge.bridge_value(Some(&source), &BridgeOptions::new());
        assert!(!bridge.is_subscribed());
    }

    #[test]
    fn terminal_event_ends_the_subscription() {
        let (_signal, mut bridge) = bridge();
        let subject = Subject::<i32>::new();
        let source = subject.as_observable();
        let options = BridgeOptions::new().on_error(|_: StreamError| {});

        let _ = bridge.bridge_value(Some(&source), &options);
        assert!(bridge.is_subscribed());
        subject.error(StreamError::msg("gone"));
        assert!(!bridge.is_subscribed());

        let other = Subject::<i32>::new();
        let _ = bridge.bridge_value(Some(&other.as_observable()), &options);
        assert!(bridge.is_subscribed());
    }

    #[test]
    fn current_reads_without_rendering() {
        let (_signal, mut bridge) = bridge();
        assert_eq!(bridge.current(), None);
        let source = Observable::<i32, StreamError>::of([1, 2]);
        let _ = bridge.bridge_value(Some(&source), &BridgeOptions::new());
        assert_eq!(bridge.current(), Some(2));
    }
}
