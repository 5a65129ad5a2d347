//! Descriptor and datagram types for UDP transmission.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;

use bytes::Bytes;

/// Port range ephemeral local ports are drawn from (IANA dynamic range).
pub const EPHEMERAL_PORTS: RangeInclusive<u16> = 49152..=65535;

/// Everything the transport needs to open a channel for one send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UdpDescriptor {
    /// Local address to bind. Port 0 lets the OS choose.
    pub local: SocketAddr,
    /// Where datagrams are sent.
    pub remote: SocketAddr,
}

impl UdpDescriptor {
    /// Create a descriptor binding `local_port` on all IPv4 interfaces.
    pub fn new(local_port: u16, remote: SocketAddr) -> Self {
        Self {
            local: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), local_port),
            remote,
        }
    }

    /// Bind to a specific local address instead of all interfaces.
    pub fn local_addr(mut self, local: SocketAddr) -> Self {
        self.local = local;
        self
    }

    /// The requested local port.
    pub fn local_port(&self) -> u16 {
        self.local.port()
    }
}

/// A received datagram with its source address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    /// The datagram payload.
    pub data: Bytes,
    /// The source address of the datagram.
    pub source: SocketAddr,
}

impl Datagram {
    /// Create a new datagram.
    pub fn new(data: impl Into<Bytes>, source: SocketAddr) -> Self {
        Self {
            data: data.into(),
            source,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
