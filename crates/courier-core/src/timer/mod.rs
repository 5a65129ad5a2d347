//! One-shot timer service for Courier.
//!
//! A [`OneShotTimer`] is armed with a duration and invokes its registered
//! callback once on expiry, unless it is disarmed first. Two implementations
//! are provided:
//!
//! - [`ManualClock`] / [`ManualTimer`]: virtual time advanced explicitly by
//!   the caller, for deterministic tests and simulations
//! - [`TokioTimer`] (`tokio` feature): backed by `tokio::time::sleep` on a
//!   runtime handle

mod manual;
#[cfg(feature = "tokio")]
mod runtime;

use std::sync::Arc;
use std::time::Duration;

pub use manual::{ManualClock, ManualTimer, TimerId};

#[cfg(feature = "tokio")]
pub use runtime::TokioTimer;

/// Callback invoked when a timer expires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// A single one-shot countdown.
///
/// # Contract
///
/// - [`arm`](Self::arm) starts the countdown. Arming an already armed timer
///   restarts it with the new duration; only one expiry is ever pending.
/// - [`disarm`](Self::disarm) cancels a pending expiry. Disarming a timer that
///   is not armed is a no-op.
/// - On expiry the timer becomes disarmed *before* the callback runs, so the
///   callback may re-arm it.
/// - Expiry with no callback registered does nothing.
pub trait OneShotTimer: Send + Sync {
    /// Register the expiry callback, replacing any previous one.
    fn set_callback(&self, callback: TimerCallback);

    /// Arm the timer to fire once after `duration`.
    fn arm(&self, duration: Duration);

    /// Cancel a pending expiry. Idempotent.
    fn disarm(&self);

    /// Check whether an expiry is pending.
    fn is_armed(&self) -> bool;
}

impl<T: OneShotTimer + ?Sized> OneShotTimer for Arc<T> {
    fn set_callback(&self, callback: TimerCallback) {
        (**self).set_callback(callback)
    }

    fn arm(&self, duration: Duration) {
        (**self).arm(duration)
    }

    fn disarm(&self) {
        (**self).disarm()
    }

    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }
}
