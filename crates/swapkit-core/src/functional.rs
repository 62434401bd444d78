//! Small combinators used across the crate.
//!
//! [`Pipe`] threads a value through a chain of stages left to right.
//! [`Debouncer`] and [`Debounced`] implement cancel-and-reschedule timers on
//! the Tokio runtime: only the last call inside the window runs. Without a
//! runtime there is nothing to wait on, so actions run immediately.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Left-to-right function application, `x.pipe(f).pipe(g)` == `g(f(x))`.
pub trait Pipe: Sized {
    fn pipe<R, F>(self, stage: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        stage(self)
    }
}

impl<T> Pipe for T {}

/// Holds at most one pending delayed task.
///
/// Scheduling a new task aborts the pending one, so a burst of calls inside
/// the delay window collapses into the last call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Debouncer bound to the current Tokio runtime, if there is one.
    pub fn new(delay: Duration) -> Self {
        Self::with_runtime(delay, Handle::try_current().ok())
    }

    pub fn with_runtime(delay: Duration, runtime: Option<Handle>) -> Self {
        Self {
            delay,
            runtime,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` once `delay` has elapsed without another call to `schedule`.
    ///
    /// With no runtime bound at construction or current at the call, any
    /// pending task is dropped and `action` runs before this returns.
    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            trace!("debounce: no runtime, running immediately");
            self.cancel();
            action();
            return;
        };

        let delay = self.delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        let mut pending = self.lock_pending();
        if let Some(previous) = pending.replace(handle) {
            if !previous.is_finished() {
                trace!("debounce: superseding pending task");
            }
            previous.abort();
        }
    }

    /// Abort the pending task, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guard is never held while an action runs.
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A function whose invocations are debounced; the last argument wins.
pub struct Debounced<A> {
    debouncer: Debouncer,
    action: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A: Send + 'static> Debounced<A> {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            debouncer: Debouncer::new(delay),
            action: Arc::new(action),
        }
    }

    pub fn call(&self, arg: A) {
        let action = Arc::clone(&self.action);
        self.debouncer.schedule(move || action(arg));
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl<A> std::fmt::Debug for Debounced<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
