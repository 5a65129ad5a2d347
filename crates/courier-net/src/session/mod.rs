//! The UDP session state machine.
//!
//! A [`UdpSession`] owns one remote endpoint. It resolves the endpoint
//! through a [`ResolutionSupervisor`], which bounds each name lookup with a
//! retry timer, then runs one send/await-reply cycle at a time with a reply
//! timer. The outcome of every send reaches the data-ready callback as a
//! [`Reply`].
//!
//! Collaborators are injected through [`UdpSessionBuilder`]:
//!
//! | Collaborator | Trait | Tokio implementation |
//! |--------------|-------|----------------------|
//! | Name lookup | [`NameResolver`](crate::dns::NameResolver) | [`HickoryResolver`](crate::dns::HickoryResolver) |
//! | Sockets | [`UdpTransport`](crate::udp::UdpTransport) | [`TokioUdpTransport`](crate::udp::TokioUdpTransport) |
//! | Timers | [`OneShotTimer`](courier_core::OneShotTimer) | [`TokioTimer`](courier_core::TokioTimer) |

mod client;
mod config;
mod reply;
mod resolution;
mod settings;
mod state;

pub use client::{SessionCallbacks, UdpSession, UdpSessionBuilder};
pub use config::{
    DEFAULT_MAX_RETRIES, DEFAULT_REPLY_TIMEOUT, DEFAULT_RETRY_INTERVAL, HostTarget, RetryPolicy,
    SessionConfig,
};
pub use reply::Reply;
pub use resolution::{ResolutionSupervisor, ResolveCompletion};
pub use settings::{ClientSettings, DnsSettings, EndpointSettings};
pub use state::SessionState;
