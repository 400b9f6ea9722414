#![forbid(unsafe_code)]

//! Rendering collaborator primitives and a minimal driver.
//!
//! The bridge needs three things from whatever renders it:
//!
//! - a **state cell** whose setter requests a re-render ([`StateCell`],
//!   [`StateSetter`], [`RenderSignal`]);
//! - a **lifecycle effect** keyed by dependencies, whose cleanup runs before
//!   the next setup and on teardown ([`EffectSlot`]);
//! - a **suspension primitive**: an awaitable the renderer can park on
//!   before retrying ([`SuspendHandle`], [`Suspended`], [`RenderResult`]).
//!
//! [`Host`] is the smallest driver that honours those contracts: it owns one
//! render closure, re-runs it while re-renders are requested, and retries a
//! suspended frame once its handle resolves. It is not a rendering engine;
//! there is no tree, no reconciliation, and no scheduling beyond "flush
//! until quiet".
//!
//! # Invariants
//!
//! 1. `StateSetter::set` after the cell is gone is a no-op.
//! 2. `EffectSlot::sync` runs the previous cleanup before the next setup,
//!    and never runs setup for unchanged dependencies.
//! 3. A `SuspendHandle` resolves at most once; every clone observes it.
//! 4. `Host::flush` runs at most `max_passes` renders per call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use thiserror::Error;

// ─── Render requests ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SignalInner {
    pending: Cell<bool>,
    requests: Cell<u64>,
}

/// Shared "please render again" flag.
///
/// Cloning creates a new handle to the **same** flag.
#[derive(Clone, Debug, Default)]
pub struct RenderSignal {
    inner: Rc<SignalInner>,
}

impl RenderSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for another render.
    pub fn request(&self) {
        self.inner.pending.set(true);
        self.inner.requests.set(self.inner.requests.get() + 1);
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    /// Clear the pending flag, returning whether it was set.
    pub fn take_pending(&self) -> bool {
        self.inner.pending.replace(false)
    }

    /// Total number of requests ever made through this signal.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.inner.requests.get()
    }
}

// ─── State cell ──────────────────────────────────────────────────────────────

/// A render-owned value whose updates request a re-render.
pub struct StateCell<T> {
    value: Rc<RefCell<T>>,
    signal: RenderSignal,
}

impl<T> StateCell<T> {
    pub fn new(initial: T, signal: RenderSignal) -> Self {
        Self {
            value: Rc::new(RefCell::new(initial)),
            signal,
        }
    }

    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.signal.request();
    }

    /// A detachable setter that does not keep the cell alive.
    #[must_use]
    pub fn setter(&self) -> StateSetter<T> {
        StateSetter {
            value: Rc::downgrade(&self.value),
            signal: self.signal.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &*self.value.borrow())
            .finish()
    }
}

/// Setter half of a [`StateCell`].
pub struct StateSetter<T> {
    value: Weak<RefCell<T>>,
    signal: RenderSignal,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            value: Weak::clone(&self.value),
            signal: self.signal.clone(),
        }
    }
}

impl<T> StateSetter<T> {
    /// Store `value` and request a re-render. Returns `false` (and does
    /// nothing) once the cell has been dropped.
    pub fn set(&self, value: T) -> bool {
        let Some(cell) = self.value.upgrade() else {
            return false;
        };
        *cell.borrow_mut() = value;
        self.signal.request();
        true
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("alive", &(self.value.strong_count() > 0))
            .finish()
    }
}

// ─── Lifecycle effect ────────────────────────────────────────────────────────

/// Cleanup returned by an effect setup.
pub type Cleanup = Box<dyn FnOnce()>;

/// One lifecycle effect keyed by its dependencies.
pub struct EffectSlot<K> {
    deps: Option<K>,
    cleanup: Option<Cleanup>,
    runs: u64,
}

impl<K> EffectSlot<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            deps: None,
            cleanup: None,
            runs: 0,
        }
    }

    /// Run `setup` if `deps` differs from the dependencies of the last run
    /// (or if the effect never ran). The previous cleanup runs first.
    ///
    /// Returns whether `setup` ran.
    pub fn sync(&mut self, deps: K, setup: impl FnOnce(&K) -> Option<Cleanup>) -> bool
    where
        K: PartialEq,
    {
        if self.deps.as_ref() == Some(&deps) {
            return false;
        }
        self.run_cleanup();
        self.cleanup = setup(&deps);
        self.deps = Some(deps);
        self.runs += 1;
        true
    }

    /// Dependencies of the last run.
    #[must_use]
    pub fn deps(&self) -> Option<&K> {
        self.deps.as_ref()
    }

    /// Whether a cleanup is currently registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Number of times setup has run.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Run the cleanup and forget the dependencies, so the next `sync`
    /// always runs setup.
    pub fn teardown(&mut self) {
        self.run_cleanup();
        self.deps = None;
    }

    fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl<K> Default for EffectSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for EffectSlot<K> {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

impl<K: fmt::Debug> fmt::Debug for EffectSlot<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSlot")
            .field("deps", &self.deps)
            .field("active", &self.cleanup.is_some())
            .field("runs", &self.runs)
            .finish()
    }
}

// ─── Suspension ──────────────────────────────────────────────────────────────

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Awaitable side of a one-shot suspension token.
///
/// Completes once the matching [`SuspendResolver`] fires (or is dropped).
/// Cloning shares the same token.
#[derive(Clone)]
pub struct SuspendHandle {
    id: u64,
    resolved: Rc<Cell<bool>>,
    ready: Shared<oneshot::Receiver<()>>,
}

/// Resolve side of a one-shot suspension token.
pub struct SuspendResolver {
    id: u64,
    resolved: Rc<Cell<bool>>,
    tx: oneshot::Sender<()>,
}

/// Create a linked resolver/handle pair.
#[must_use]
pub fn suspend_pair() -> (SuspendResolver, SuspendHandle) {
    let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
    let resolved = Rc::new(Cell::new(false));
    let (tx, rx) = oneshot::channel();
    let resolver = SuspendResolver {
        id,
        resolved: Rc::clone(&resolved),
        tx,
    };
    let handle = SuspendHandle {
        id,
        resolved,
        ready: rx.shared(),
    };
    (resolver, handle)
}

impl SuspendHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }
}

impl Future for SuspendHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped resolver also completes the wait so the renderer retries.
        self.ready.poll_unpin(cx).map(|_| ())
    }
}

impl fmt::Debug for SuspendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendHandle")
            .field("id", &self.id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl SuspendResolver {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fire the token, waking every task parked on its handles.
    pub fn resolve(self) {
        self.resolved.set(true);
        // The receiver may already be gone; nobody is waiting then.
        let _ = self.tx.send(());
    }
}

impl fmt::Debug for SuspendResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendResolver").field("id", &self.id).finish()
    }
}

/// A render that cannot complete until `handle` resolves.
#[derive(Debug, Clone, Error)]
#[error("render suspended until handle {} resolves", .handle.id())]
pub struct Suspended {
    handle: SuspendHandle,
}

impl Suspended {
    #[must_use]
    pub fn new(handle: SuspendHandle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> &SuspendHandle {
        &self.handle
    }

    #[must_use]
    pub fn into_handle(self) -> SuspendHandle {
        self.handle
    }
}

/// Outcome of one render: a value, or a request to park and retry.
pub type RenderResult<T> = Result<T, Suspended>;

// ─── Host ────────────────────────────────────────────────────────────────────

/// Default upper bound on renders per [`Host::flush`].
pub const DEFAULT_MAX_PASSES: usize = 64;

/// Result of the most recent render.
#[derive(Debug, Clone)]
pub enum Frame<V> {
    Ready(V),
    Suspended(SuspendHandle),
}

type RenderFn<V> = Box<dyn FnMut() -> RenderResult<V>>;

/// Drives one render closure the way a rendering runtime would.
pub struct Host<V> {
    signal: RenderSignal,
    render: Option<RenderFn<V>>,
    frame: Option<Frame<V>>,
    renders: u64,
    max_passes: usize,
}

impl<V> Host<V> {
    /// Mount `render`: render once, then flush until quiet.
    ///
    /// `signal` must be the signal handed to the state the closure reads,
    /// otherwise updates never trigger a re-render.
    pub fn mount(signal: RenderSignal, render: impl FnMut() -> RenderResult<V> + 'static) -> Self {
        let mut host = Self {
            signal,
            render: Some(Box::new(render)),
            frame: None,
            renders: 0,
            max_passes: DEFAULT_MAX_PASSES,
        };
        host.render_once();
        host.flush();
        host
    }

    /// Builder form of [`Host::set_max_passes`]. Applies from the next flush.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.set_max_passes(max_passes);
        self
    }

    pub fn set_max_passes(&mut self, max_passes: usize) {
        self.max_passes = max_passes.max(1);
    }

    /// Render once, regardless of pending requests.
    pub fn render_once(&mut self) {
        let Some(render) = self.render.as_mut() else {
            return;
        };
        // Requests raised during this render schedule the next one.
        self.signal.take_pending();
        let frame = match render() {
            Ok(value) => Frame::Ready(value),
            Err(suspended) => Frame::Suspended(suspended.into_handle()),
        };
        self.renders += 1;
        self.frame = Some(frame);
    }

    /// Re-render while renders are requested or a suspended frame's handle
    /// has resolved. Returns the number of renders performed.
    pub fn flush(&mut self) -> usize {
        let mut passes = 0;
        while self.needs_render() {
            if passes >= self.max_passes {
                tracing::warn!(
                    passes,
                    renders = self.renders,
                    "host flush hit its pass limit; render loop may not settle"
                );
                break;
            }
            self.render_once();
            passes += 1;
        }
        passes
    }

    fn needs_render(&self) -> bool {
        if self.render.is_none() {
            return false;
        }
        let retry = matches!(&self.frame, Some(Frame::Suspended(handle)) if handle.is_resolved());
        self.signal.is_pending() || retry
    }

    #[must_use]
    pub fn frame(&self) -> Option<&Frame<V>> {
        self.frame.as_ref()
    }

    /// The value of the last frame, if it rendered.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match &self.frame {
            Some(Frame::Ready(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self.frame, Some(Frame::Suspended(_)))
    }

    /// The handle the last frame suspended on.
    #[must_use]
    pub fn suspended_on(&self) -> Option<&SuspendHandle> {
        match &self.frame {
            Some(Frame::Suspended(handle)) => Some(handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }

    #[must_use]
    pub fn signal(&self) -> &RenderSignal {
        &self.signal
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.render.is_some()
    }

    /// Drop the render closure and everything it owns.
    pub fn unmount(&mut self) {
        self.render = None;
        self.frame = None;
    }
}

impl<V: fmt::Debug> fmt::Debug for Host<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("frame", &self.frame)
            .field("renders", &self.renders)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
