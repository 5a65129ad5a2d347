//! DNS resolution for Courier.
//!
//! The session talks to name resolution through the [`NameResolver`] trait:
//! an asynchronous `lookup` that reports through a callback, plus server
//! selection. [`HickoryResolver`] implements it on top of hickory-resolver.
//!
//! # Configuration
//!
//! ```ignore
//! use courier_net::dns::{DnsConfig, HickoryResolver, IpStrategy};
//!
//! let config = DnsConfig::with_servers(&["1.1.1.1".parse()?])
//!     .ip_strategy(IpStrategy::Ipv4Only);
//!
//! let resolver = HickoryResolver::new(config)?;
//! ```

mod config;
mod resolver;

pub use config::{DNS_PORT, DnsConfig, IpStrategy};
pub use resolver::{HickoryResolver, LookupCallback, NameResolver, validate_server_count};
