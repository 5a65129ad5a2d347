//! Core plumbing for Courier.
//!
//! This crate provides the collaborator-agnostic building blocks the UDP
//! session in `courier-net` is assembled from:
//!
//! - **Timers**: the one-shot timer service contract ([`OneShotTimer`]) with a
//!   tokio-backed implementation ([`TokioTimer`], `tokio` feature) and a
//!   virtual-time implementation for deterministic tests ([`ManualClock`])
//! - **Callback slots**: optional, wholesale-replaceable callbacks
//!   ([`CallbackSlot`]) where an unset slot is a no-op
//! - **Diagnostics**: the runtime debug switch ([`DebugGate`]) and the
//!   `tracing` target names used across the workspace
//!
//! # Timer Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use courier_core::{ManualClock, OneShotTimer};
//!
//! let clock = ManualClock::new();
//! let timer = clock.timer();
//!
//! let fired = Arc::new(AtomicUsize::new(0));
//! let counter = fired.clone();
//! timer.set_callback(Arc::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! timer.arm(Duration::from_secs(1));
//! clock.advance(Duration::from_millis(999));
//! assert_eq!(fired.load(Ordering::SeqCst), 0);
//!
//! clock.advance(Duration::from_millis(1));
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! assert!(!timer.is_armed());
//! ```
//!
//! # Callback Slot Example
//!
//! ```
//! use courier_core::CallbackSlot;
//!
//! let slot = CallbackSlot::<u16>::new();
//!
//! // Emitting into an empty slot does nothing.
//! assert!(!slot.emit(&7));
//!
//! slot.set(|len| println!("received {len} bytes"));
//! assert!(slot.emit(&4));
//! ```

mod error;
pub mod logging;
pub mod slot;
pub mod timer;

pub use error::{Result, TimerError};
pub use logging::DebugGate;
pub use slot::CallbackSlot;
pub use timer::{ManualClock, ManualTimer, OneShotTimer, TimerCallback, TimerId};

#[cfg(feature = "tokio")]
pub use timer::TokioTimer;
