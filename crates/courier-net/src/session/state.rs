//! Session lifecycle state.

use std::sync::Arc;

use parking_lot::Mutex;

/// Lifecycle state of a UDP session.
///
/// ```text
/// Uninitialized ──initialize──▶ Ready ──resolve(literal)──▶ Resolved
///                                 │                          ▲   │
///                                 └─resolve(name)─▶ Resolving┘   │ sent
///                                                     │          ▼
///                                  failed/exhausted   │    AwaitingReply
///                                                     ▼          │
///                                                   Error        └─reply/timeout─▶ Resolved
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// `initialize` has not been called.
    #[default]
    Uninitialized,
    /// Configured, not yet resolved.
    Ready,
    /// A name lookup is in flight.
    Resolving,
    /// The remote address is known; a datagram may be sent.
    Resolved,
    /// A datagram has left the device and the reply timer is running.
    AwaitingReply,
    /// Resolution failed.
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Ready => write!(f, "Ready"),
            Self::Resolving => write!(f, "Resolving"),
            Self::Resolved => write!(f, "Resolved"),
            Self::AwaitingReply => write!(f, "AwaitingReply"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// The lifecycle slot shared by the session and its resolution supervisor.
///
/// The lock is only ever held for a single read or write.
#[derive(Clone, Debug, Default)]
pub(crate) struct StateCell {
    state: Arc<Mutex<SessionState>>,
}

impl StateCell {
    pub(crate) fn get(&self) -> SessionState {
        *self.state.lock()
    }

    pub(crate) fn set(&self, state: SessionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            tracing::trace!(target: "courier_net::session", %previous, %state, "state changed");
        }
    }
}
