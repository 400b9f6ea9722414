//! Process-wide channel for errors nobody handled.
//!
//! When a source fails and its consumer supplied no error handler, the
//! failure is reported here instead of being dropped. The default reporter
//! logs through `tracing` at `ERROR` level. Tests and hosts can install their
//! own hook with [`set_unhandled_error_hook`]; the returned guard restores the
//! previous hook when dropped.
//!
//! Hooks are thread-local, matching the single-threaded stream model.
//! Reporting is synchronous: the hook runs inside the failing `error` call.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives every error reported through [`report_unhandled_error`].
pub type UnhandledErrorHook = Rc<dyn Fn(&dyn fmt::Debug)>;

thread_local! {
    static HOOK: RefCell<Option<UnhandledErrorHook>> = const { RefCell::new(None) };
}

static UNHANDLED_ERRORS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total number of unhandled errors reported on any thread.
#[must_use]
pub fn unhandled_errors_total() -> u64 {
    UNHANDLED_ERRORS_TOTAL.load(Ordering::Relaxed)
}

/// Report an error that no consumer handled.
pub fn report_unhandled_error(err: &dyn fmt::Debug) {
    UNHANDLED_ERRORS_TOTAL.fetch_add(1, Ordering::Relaxed);
    // Clone the hook out so it may install or remove hooks itself.
    let hook = HOOK.with(|slot| slot.borrow().clone());
    match hook {
        Some(hook) => hook(err),
        None => default_report(err),
    }
}

fn default_report(err: &dyn fmt::Debug) {
    tracing::error!(error = ?err, "unhandled stream error");
}

/// Install `hook` for the current thread until the guard is dropped.
#[must_use = "the previous hook is restored as soon as the guard is dropped"]
pub fn set_unhandled_error_hook(hook: impl Fn(&dyn fmt::Debug) + 'static) -> UnhandledErrorHookGuard {
    let hook: UnhandledErrorHook = Rc::new(hook);
    let previous = HOOK.with(|slot| slot.borrow_mut().replace(hook));
    UnhandledErrorHookGuard { previous }
}

/// Restores the previously installed hook on drop.
pub struct UnhandledErrorHookGuard {
    previous: Option<UnhandledErrorHook>,
}

impl Drop for UnhandledErrorHookGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        HOOK.with(|slot| *slot.borrow_mut() = previous);
    }
}

impl fmt::Debug for UnhandledErrorHookGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnhandledErrorHookGuard")
            .field("restores_hook", &self.previous.is_some())
            .finish()
    }
}
