//! Single-session UDP client for Courier.
//!
//! This crate resolves one remote endpoint, sends a datagram to it and
//! supervises the round trip:
//!
//! - **Resolution**: by host name through DNS, with a retry timer that
//!   re-issues the lookup and gives up after a bounded number of expiries,
//!   or directly from a literal address
//! - **Send/await-reply**: one outstanding datagram at a time on a fresh
//!   ephemeral port, settled by the first reply or by the reply timeout
//! - **Callbacks**: optional data-sent and data-ready notifications
//!
//! # Example
//!
//! ```ignore
//! use courier_net::{ClientSettings, SessionCallbacks, UdpSession};
//!
//! let settings = ClientSettings::from_file("courier.toml")?;
//! let session = UdpSession::with_tokio(&settings)?;
//! session.set_callbacks(SessionCallbacks::new().on_data_ready(|reply| {
//!     match reply.payload() {
//!         Some(data) => println!("reply: {:?}", data),
//!         None => println!("timed out"),
//!     }
//! }));
//!
//! session.initialize(settings.session_config()?);
//! let sender = session.clone();
//! session.resolve(move |result| {
//!     if let Ok(addr) = result {
//!         println!("resolved to {addr}");
//!         let _ = sender.send(&b"ping"[..]);
//!     }
//! })?;
//! ```
//!
//! # Modules
//!
//! - [`session`]: the session state machine and its configuration
//! - [`dns`]: the name-resolution collaborator and its hickory implementation
//! - [`udp`]: the socket collaborator and its tokio implementation

mod error;

pub mod dns;
pub mod session;
pub mod udp;

pub use error::{NetworkError, Result};
pub use session::{
    ClientSettings, HostTarget, Reply, RetryPolicy, SessionCallbacks, SessionConfig, SessionState,
    UdpSession, UdpSessionBuilder,
};
