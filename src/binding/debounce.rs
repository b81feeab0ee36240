//! Trailing-edge debouncer.
//!
//! Each pushed value restarts a quiescence timer; only the last value of a burst is
//! emitted, once the timer runs out. A zero window emits inline.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Delays values until input has been quiet for `window`.
///
/// # Examples
///
/// ```
/// use pagesync::binding::Debouncer;
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
/// # rt.block_on(async {
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let mut debouncer = Debouncer::new(Duration::from_millis(300), tokio::runtime::Handle::current());
///
/// for term in ["s", "sm", "smi"] {
///     let seen = Arc::clone(&seen);
///     debouncer.push(term.to_string(), move |v| seen.lock().unwrap().push(v));
/// }
/// tokio::time::sleep(Duration::from_millis(301)).await;
/// assert_eq!(*seen.lock().unwrap(), vec!["smi".to_string()]);
/// # });
/// ```
#[derive(Debug)]
pub struct Debouncer<V> {
    window: Duration,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
    _value: std::marker::PhantomData<fn(V)>,
}

impl<V: Send + 'static> Debouncer<V> {
    /// Creates a debouncer spawning its timers on `runtime`.
    #[must_use]
    pub const fn new(window: Duration, runtime: Handle) -> Self {
        Self {
            window,
            runtime,
            pending: None,
            _value: std::marker::PhantomData,
        }
    }

    /// Quiescence window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Supersedes any pending value with `value`, calling `emit` once the window
    /// elapses without another push.
    pub fn push<F>(&mut self, value: V, emit: F)
    where
        F: FnOnce(V) + Send + 'static,
    {
        self.cancel();

        if self.window.is_zero() {
            emit(value);
            return;
        }

        let window = self.window;
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            emit(value);
        }));
    }

    /// Returns `true` while a value is waiting for the window to elapse.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Drops the pending value, if any, without emitting it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                tracing::trace!("pending debounced value superseded");
            }
            handle.abort();
        }
    }
}

impl<V> Drop for Debouncer<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
