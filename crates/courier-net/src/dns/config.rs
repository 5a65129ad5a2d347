//! DNS configuration types.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Standard DNS port used for servers given as bare addresses.
pub const DNS_PORT: u16 = 53;

/// Configuration for the hickory-backed resolver.
#[derive(Debug, Clone)]
pub struct DnsConfig {
    /// Use system DNS configuration (reads /etc/resolv.conf on Unix).
    /// If false, uses `nameservers`.
    pub use_system_config: bool,

    /// Custom nameservers to use when `use_system_config` is false.
    pub nameservers: Vec<SocketAddr>,

    /// Maximum number of cached entries.
    pub cache_size: usize,

    /// Whether to read from /etc/hosts file.
    pub use_hosts_file: bool,

    /// IP version preference for lookups.
    pub ip_strategy: IpStrategy,

    /// Number of attempts hickory makes per lookup.
    ///
    /// The session supervises its own retry budget on top of this, so the
    /// default keeps hickory to a single attempt.
    pub attempts: usize,

    /// Timeout for each DNS query attempt.
    pub timeout: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            use_system_config: true,
            nameservers: Vec::new(),
            cache_size: 32,
            use_hosts_file: true,
            ip_strategy: IpStrategy::default(),
            attempts: 1,
            timeout: Duration::from_secs(5),
        }
    }
}

impl DnsConfig {
    /// Create a new DNS configuration with system defaults.
    pub fn system() -> Self {
        Self::default()
    }

    /// Create a configuration with custom nameservers.
    pub fn with_nameservers(nameservers: Vec<SocketAddr>) -> Self {
        Self {
            use_system_config: false,
            nameservers,
            ..Default::default()
        }
    }

    /// Create a configuration from bare server addresses on port 53.
    pub fn with_servers(servers: &[IpAddr]) -> Self {
        Self::with_nameservers(
            servers
                .iter()
                .map(|ip| SocketAddr::new(*ip, DNS_PORT))
                .collect(),
        )
    }

    /// Set the cache size.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set whether to use the hosts file.
    pub fn use_hosts_file(mut self, use_hosts: bool) -> Self {
        self.use_hosts_file = use_hosts;
        self
    }

    /// Set the IP strategy.
    pub fn ip_strategy(mut self, strategy: IpStrategy) -> Self {
        self.ip_strategy = strategy;
        self
    }

    /// Set the number of attempts per lookup.
    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the timeout per attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// IP version lookup strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IpStrategy {
    /// Look up IPv4 addresses only.
    #[default]
    Ipv4Only,
    /// Look up IPv6 addresses only.
    Ipv6Only,
    /// Look up both IPv4 and IPv6, prefer IPv4.
    Ipv4ThenIpv6,
    /// Look up both IPv4 and IPv6, prefer IPv6.
    Ipv6ThenIpv4,
}
