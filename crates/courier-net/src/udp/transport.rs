//! UDP transport collaborator contract.

use std::sync::Arc;

use bytes::Bytes;

use super::config::{Datagram, UdpDescriptor};
use crate::Result;
use crate::error::NetworkError;

/// Notifications a channel delivers back to whoever opened it.
///
/// Handlers may be invoked from the transport's own task; they must not
/// block.
#[derive(Clone)]
pub struct UdpEvents {
    /// The datagram left the device. Not an acknowledgment.
    pub on_sent: Arc<dyn Fn() + Send + Sync>,
    /// A datagram arrived on the channel.
    pub on_received: Arc<dyn Fn(Datagram) + Send + Sync>,
    /// An asynchronous socket error after the send call returned.
    pub on_error: Arc<dyn Fn(NetworkError) + Send + Sync>,
}

impl UdpEvents {
    /// Events that do nothing; replace the fields that matter.
    pub fn ignored() -> Self {
        Self {
            on_sent: Arc::new(|| {}),
            on_received: Arc::new(|_| {}),
            on_error: Arc::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for UdpEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpEvents").finish_non_exhaustive()
    }
}

/// The network stack's UDP half.
pub trait UdpTransport: Send + Sync {
    /// Pick an ephemeral local port for the next channel.
    fn allocate_port(&self) -> u16;

    /// Open a channel for `descriptor`, registering `events`.
    ///
    /// Must not invoke any of the event handlers before returning.
    fn open(&self, descriptor: UdpDescriptor, events: UdpEvents) -> Result<Arc<dyn UdpChannel>>;
}

impl<T: UdpTransport + ?Sized> UdpTransport for Arc<T> {
    fn allocate_port(&self) -> u16 {
        (**self).allocate_port()
    }

    fn open(&self, descriptor: UdpDescriptor, events: UdpEvents) -> Result<Arc<dyn UdpChannel>> {
        (**self).open(descriptor, events)
    }
}

/// One open UDP session on the transport.
pub trait UdpChannel: Send + Sync {
    /// The local port actually bound.
    fn local_port(&self) -> u16;

    /// Issue a send to the descriptor's remote address.
    ///
    /// `Ok` means the stack accepted the datagram; `on_sent` follows once it
    /// has left the device.
    fn send(&self, payload: Bytes) -> Result<()>;

    /// Close the channel. Further events are not delivered. Idempotent.
    fn close(&self);
}
