//! Outcome of one send/await-reply cycle.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::udp::Datagram;

/// What the data-ready callback receives.
///
/// Exactly one `Reply` is delivered per successful `send`. A timeout is its
/// own variant, so an empty datagram is never mistaken for one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// A datagram arrived before the reply timer expired.
    Data(Datagram),
    /// No datagram arrived within the reply timeout.
    Timeout,
}

impl Reply {
    /// The received payload, or `None` on timeout.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Data(datagram) => Some(&datagram.data),
            Self::Timeout => None,
        }
    }

    /// Payload length; zero on timeout.
    pub fn len(&self) -> usize {
        self.payload().map_or(0, Bytes::len)
    }

    /// Whether there is no payload (timeout or empty datagram).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where the reply came from.
    pub fn source(&self) -> Option<SocketAddr> {
        match self {
            Self::Data(datagram) => Some(datagram.source),
            Self::Timeout => None,
        }
    }

    /// Whether this is the timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
