//! UDP transport for Courier.
//!
//! The session never touches sockets directly. It asks a [`UdpTransport`] for
//! an ephemeral port, opens a [`UdpChannel`] described by a [`UdpDescriptor`],
//! and learns about progress through [`UdpEvents`]:
//!
//! - `on_sent`: the datagram has left the device
//! - `on_received`: a datagram arrived on the channel
//! - `on_error`: the socket failed after the send call returned
//!
//! [`TokioUdpTransport`] is the production implementation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_net::udp::{TokioUdpTransport, UdpDescriptor, UdpEvents, UdpTransport};
//!
//! let transport = TokioUdpTransport::new()?;
//! let events = UdpEvents {
//!     on_received: Arc::new(|datagram| {
//!         println!("Received {} bytes from {}", datagram.len(), datagram.source);
//!     }),
//!     ..UdpEvents::ignored()
//! };
//!
//! let descriptor = UdpDescriptor::new(transport.allocate_port(), "127.0.0.1:9000".parse()?);
//! let channel = transport.open(descriptor, events)?;
//! channel.send(bytes::Bytes::from_static(b"Hello!"))?;
//! ```

mod config;
mod socket;
mod transport;

pub use config::{Datagram, EPHEMERAL_PORTS, UdpDescriptor};
pub use socket::TokioUdpTransport;
pub use transport::{UdpChannel, UdpEvents, UdpTransport};
