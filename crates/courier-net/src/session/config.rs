//! Configuration types for a UDP session.

use std::time::Duration;

/// Default number of retry-timer expiries before resolution gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default interval of the resolution retry timer.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default reply timeout.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// How the remote endpoint is identified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostTarget {
    /// A host name, resolved through DNS.
    Name(String),
    /// A literal address, parsed without any lookup.
    Literal(String),
    /// Nothing usable was configured.
    Unspecified,
}

impl HostTarget {
    /// Select the authoritative target.
    ///
    /// A non-empty name wins; otherwise a non-empty literal is used.
    pub fn select(host_name: Option<&str>, host_literal: Option<&str>) -> Self {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        match (non_empty(host_name), non_empty(host_literal)) {
            (Some(name), _) => Self::Name(name.to_string()),
            (None, Some(literal)) => Self::Literal(literal.to_string()),
            (None, None) => Self::Unspecified,
        }
    }

    /// The host name, if resolution goes through DNS.
    pub fn host_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Endpoint configuration for one session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use courier_net::session::{HostTarget, SessionConfig};
///
/// let config = SessionConfig::new(None, Some("93.184.216.34"), 9999, Duration::from_millis(2000));
/// assert_eq!(config.target, HostTarget::Literal("93.184.216.34".into()));
///
/// let config = SessionConfig::named("time.example.com", 123).reply_timeout(Duration::from_secs(1));
/// assert_eq!(config.host_name(), Some("time.example.com"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// The remote endpoint.
    pub target: HostTarget,
    /// The remote port.
    pub remote_port: u16,
    /// How long to wait for a reply after a datagram has been sent.
    pub reply_timeout: Duration,
}

impl SessionConfig {
    /// Create a configuration from an optional name and an optional literal.
    ///
    /// Empty strings count as absent. If a name is present it is resolved;
    /// otherwise the literal is used directly.
    pub fn new(
        host_name: Option<&str>,
        host_literal: Option<&str>,
        remote_port: u16,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            target: HostTarget::select(host_name, host_literal),
            remote_port,
            reply_timeout,
        }
    }

    /// Target a host name resolved through DNS.
    pub fn named(host_name: impl Into<String>, remote_port: u16) -> Self {
        Self {
            target: HostTarget::Name(host_name.into()),
            remote_port,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Target a literal address.
    pub fn literal(address: impl Into<String>, remote_port: u16) -> Self {
        Self {
            target: HostTarget::Literal(address.into()),
            remote_port,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Set the reply timeout.
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// The configured host name, if any.
    pub fn host_name(&self) -> Option<&str> {
        self.target.host_name()
    }
}

/// Resolution retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry-timer expiries allowed before resolution is abandoned.
    pub max_retries: u32,
    /// How long each lookup is given before the retry timer fires.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Upper bound on how long a resolution attempt can take.
    ///
    /// A budget of zero retries still waits one interval. Saturates at
    /// [`Duration::MAX`].
    pub fn max_latency(&self) -> Duration {
        self.interval.saturating_mul(self.max_retries.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_wins_over_literal() {
        assert_eq!(
            HostTarget::select(Some("example.com"), Some("10.0.0.1")),
            HostTarget::Name("example.com".into())
        );
    }

    #[test]
    fn test_empty_name_falls_back_to_literal() {
        assert_eq!(
            HostTarget::select(Some(""), Some("93.184.216.34")),
            HostTarget::Literal("93.184.216.34".into())
        );
        assert_eq!(
            HostTarget::select(None, Some("10.0.0.1")),
            HostTarget::Literal("10.0.0.1".into())
        );
    }

    #[test]
    fn test_nothing_configured() {
        assert_eq!(HostTarget::select(None, None), HostTarget::Unspecified);
        assert_eq!(HostTarget::select(Some(" "), Some("")), HostTarget::Unspecified);
    }

    #[test]
    fn test_config_constructors() {
        let config = SessionConfig::new(
            Some("nonexistent.invalid"),
            Some(""),
            9999,
            Duration::from_millis(2000),
        );
        assert_eq!(config.host_name(), Some("nonexistent.invalid"));
        assert_eq!(config.remote_port, 9999);
        assert_eq!(config.reply_timeout, Duration::from_millis(2000));

        let config = SessionConfig::literal("127.0.0.1", 7);
        assert_eq!(config.host_name(), None);
        assert_eq!(config.reply_timeout, DEFAULT_REPLY_TIMEOUT);
    }

    #[test]
    fn test_retry_policy_latency_bound() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.max_latency(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_policy_zero_retries_waits_one_interval() {
        let policy = RetryPolicy::new(0, Duration::from_millis(250));
        assert_eq!(policy.max_latency(), Duration::from_millis(250));
    }

    #[test]
    fn test_retry_policy_latency_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::MAX);
        assert_eq!(policy.max_latency(), Duration::MAX);

        let policy = RetryPolicy::new(3, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.max_latency(), Duration::MAX);
    }
}
