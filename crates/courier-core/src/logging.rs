//! Logging and diagnostic facilities for Courier.
//!
//! Courier uses the `tracing` crate for all diagnostic output. Library code
//! never installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! On top of the subscriber's level filtering, a session carries a
//! [`DebugGate`]: the per-session diagnostic switch exposed to callers as
//! `set_debug`. Chatty progress messages are only emitted while it is on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Timer system target.
    pub const TIMER: &str = "courier_core::timer";
    /// Name resolution supervision target.
    pub const RESOLVE: &str = "courier_net::resolve";
    /// Session state machine target.
    pub const SESSION: &str = "courier_net::session";
    /// UDP transport target.
    pub const UDP: &str = "courier_net::udp";
    /// DNS resolver collaborator target.
    pub const DNS: &str = "courier_net::dns";
}

/// A shared on/off switch for diagnostic output.
///
/// Clones share the same flag, so a session and its resolution supervisor
/// observe the same setting.
#[derive(Clone, Debug, Default)]
pub struct DebugGate {
    enabled: Arc<AtomicBool>,
}

impl DebugGate {
    /// Create a gate in the given state.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Turn diagnostic output on or off.
    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Check whether diagnostic output is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
