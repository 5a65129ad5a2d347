//! TOML client settings.
//!
//! ```toml
//! debug = true
//!
//! [dns]
//! servers = ["8.8.8.8", "1.1.1.1"]
//! max_retries = 5
//! retry_interval_ms = 1000
//!
//! [endpoint]
//! host_name = "time.example.com"
//! port = 9999
//! reply_timeout_ms = 2000
//! ```
//!
//! Every field is optional. An empty `servers` list means the system
//! resolver configuration.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::config::{
    DEFAULT_MAX_RETRIES, DEFAULT_REPLY_TIMEOUT, DEFAULT_RETRY_INTERVAL, RetryPolicy, SessionConfig,
};
use crate::dns::validate_server_count;
use crate::error::{NetworkError, Result};

/// Settings for a tokio-backed [`UdpSession`](super::UdpSession).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    /// Debug default applied by every `initialize`.
    pub debug: bool,
    /// Name resolution.
    pub dns: DnsSettings,
    /// The remote endpoint, if configured in the file.
    pub endpoint: Option<EndpointSettings>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            debug: true,
            dns: DnsSettings::default(),
            endpoint: None,
        }
    }
}

/// The `[dns]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DnsSettings {
    /// Up to two DNS servers. Empty means the system configuration.
    pub servers: Vec<IpAddr>,
    pub max_retries: u32,
    pub retry_interval_ms: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
        }
    }
}

/// The `[endpoint]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSettings {
    /// Resolved through DNS when present and non-empty.
    #[serde(default)]
    pub host_name: Option<String>,
    /// Literal address, used when no host name is given.
    #[serde(default)]
    pub host_address: Option<String>,
    pub port: u16,
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_reply_timeout_ms() -> u64 {
    DEFAULT_REPLY_TIMEOUT.as_millis() as u64
}

impl ClientSettings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(
            target: "courier_net::session",
            path = %path.display(),
            "loading client settings"
        );
        Self::from_toml_str(&text)
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.dns.servers.is_empty() {
            validate_server_count(&self.dns.servers)?;
        }
        if self.dns.max_retries == 0 {
            return Err(NetworkError::Config("dns.max_retries must be at least 1".into()));
        }
        if self.dns.retry_interval_ms == 0 {
            return Err(NetworkError::Config("dns.retry_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// The resolution retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.dns.max_retries,
            Duration::from_millis(self.dns.retry_interval_ms),
        )
    }

    /// The session configuration from the `[endpoint]` table.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| NetworkError::Config("no [endpoint] table".into()))?;

        Ok(SessionConfig::new(
            endpoint.host_name.as_deref(),
            endpoint.host_address.as_deref(),
            endpoint.port,
            Duration::from_millis(endpoint.reply_timeout_ms),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::HostTarget;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::from_toml_str("").unwrap();
        assert!(settings.debug);
        assert!(settings.dns.servers.is_empty());
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert!(settings.session_config().is_err());
    }

    #[test]
    fn test_endpoint_literal() {
        let settings = ClientSettings::from_toml_str(
            r#"
            [endpoint]
            host_address = "93.184.216.34"
            port = 9999
            "#,
        )
        .unwrap();

        let config = settings.session_config().unwrap();
        assert_eq!(config.target, HostTarget::Literal("93.184.216.34".into()));
        assert_eq!(config.reply_timeout, DEFAULT_REPLY_TIMEOUT);
    }

    #[test]
    fn test_too_many_servers() {
        let result = ClientSettings::from_toml_str(
            r#"
            [dns]
            servers = ["8.8.8.8", "8.8.4.4", "1.1.1.1"]
            "#,
        );
        assert_eq!(result, Err(NetworkError::InvalidDnsServers(3)));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = ClientSettings::from_toml_str("[dns]\nmax_retries = 0\n");
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }
}
