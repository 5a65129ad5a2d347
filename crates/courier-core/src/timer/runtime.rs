//! Tokio-backed one-shot timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{OneShotTimer, TimerCallback};
use crate::error::{Result, TimerError};

/// Internal state shared with the sleeping task.
struct TimerInner {
    callback: Option<TimerCallback>,
    /// Bumped on every arm/disarm. A sleeping task only fires if the
    /// generation it was spawned with is still current.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// A one-shot timer that sleeps on a tokio runtime.
///
/// Each [`arm`](OneShotTimer::arm) spawns a task that sleeps for the requested
/// duration and then invokes the callback. Disarming aborts the task; the
/// generation check covers the window where the task has already woken up.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use courier_core::{OneShotTimer, TokioTimer};
///
/// let timer = TokioTimer::new()?;
/// timer.set_callback(Arc::new(|| println!("reply timed out")));
/// timer.arm(Duration::from_secs(2));
/// ```
pub struct TokioTimer {
    handle: Handle,
    inner: Arc<Mutex<TimerInner>>,
}

impl TokioTimer {
    /// Create a timer on the current tokio runtime.
    ///
    /// Fails with [`TimerError::NoRuntime`] when called outside a runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        Ok(Self::with_handle(handle))
    }

    /// Create a timer that spawns its sleeps on the given runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            inner: Arc::new(Mutex::new(TimerInner {
                callback: None,
                generation: 0,
                task: None,
            })),
        }
    }
}

impl OneShotTimer for TokioTimer {
    fn set_callback(&self, callback: TimerCallback) {
        self.inner.lock().callback = Some(callback);
    }

    fn arm(&self, duration: Duration) {
        let mut guard = self.inner.lock();
        guard.generation += 1;
        if let Some(task) = guard.task.take() {
            task.abort();
        }

        let generation = guard.generation;
        let inner = self.inner.clone();
        guard.task = Some(self.handle.spawn(async move {
            tokio::time::sleep(duration).await;

            let callback = {
                let mut guard = inner.lock();
                if guard.generation != generation {
                    return;
                }
                guard.task = None;
                guard.callback.clone()
            };

            tracing::trace!(target: "courier_core::timer", ?duration, "timer fired");
            if let Some(callback) = callback {
                callback();
            }
        }));
    }

    fn disarm(&self) {
        let mut guard = self.inner.lock();
        if let Some(task) = guard.task.take() {
            guard.generation += 1;
            task.abort();
        }
    }

    fn is_armed(&self) -> bool {
        self.inner.lock().task.is_some()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl std::fmt::Debug for TokioTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}
