//! Error types for the networking module.

use courier_core::TimerError;

use crate::session::SessionState;

/// Network-specific errors.
///
/// Every failure the session reports, whether returned from a call or passed
/// to a callback, is one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The session has not been initialized.
    #[error("Session has not been initialized")]
    NotInitialized,
    /// Neither a host name nor a literal address was configured.
    #[error("No host name or host address configured")]
    NoHost,
    /// The configured literal address could not be parsed.
    #[error("Invalid host address: {0}")]
    InvalidAddress(String),
    /// Name resolution failed.
    #[error("DNS error: {0}")]
    Dns(String),
    /// Name resolution did not complete within the retry budget.
    #[error("DNS resolution gave up after {attempts} retries")]
    DnsExhausted {
        /// Number of retry-timer expiries before giving up.
        attempts: u32,
    },
    /// Only one or two DNS servers may be configured.
    #[error("Expected 1 or 2 DNS servers, got {0}")]
    InvalidDnsServers(usize),
    /// A datagram cannot be sent in the current state.
    #[error("Cannot send in state {0}; resolve the host first")]
    NotResolved(SessionState),
    /// A previous datagram is still awaiting its reply or timeout.
    #[error("A reply is still pending")]
    ReplyPending,
    /// UDP socket error.
    #[error("UDP socket error: {0}")]
    UdpSocket(String),
    /// The immediate send call was rejected.
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
    /// Invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Timer service error.
    #[error("Timer error: {0}")]
    Timer(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<TimerError> for NetworkError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err.to_string())
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            NetworkError::DnsExhausted { attempts: 5 }.to_string(),
            "DNS resolution gave up after 5 retries"
        );
        assert_eq!(
            NetworkError::NotResolved(SessionState::Resolving).to_string(),
            "Cannot send in state Resolving; resolve the host first"
        );
        assert_eq!(
            NetworkError::InvalidDnsServers(3).to_string(),
            "Expected 1 or 2 DNS servers, got 3"
        );
    }

    #[test]
    fn test_from_io_error() {
        let err: NetworkError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken").into();
        assert!(matches!(err, NetworkError::Io(msg) if msg.contains("port taken")));
    }

    #[test]
    fn test_from_timer_error() {
        let err: NetworkError = TimerError::NoRuntime.into();
        assert!(matches!(err, NetworkError::Timer(_)));
    }
}
