//! Name resolution collaborator.

use std::net::IpAddr;

use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, ResolveHosts, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;

use crate::dns::config::{DnsConfig, IpStrategy};
use crate::error::{NetworkError, Result};

/// Completion handed to [`NameResolver::lookup`].
///
/// Invoked at most once, with the resolved address or the reason the lookup
/// failed.
pub type LookupCallback = Box<dyn FnOnce(Result<IpAddr>) + Send + 'static>;

/// Asynchronous hostname-to-address resolution.
///
/// This is the network stack's half of the resolution contract: `lookup`
/// returns immediately and reports later through the callback. The session's
/// resolution supervisor layers its own retry timer on top.
pub trait NameResolver: Send + Sync {
    /// Start resolving `hostname`. `done` is called once the lookup completes.
    fn lookup(&self, hostname: &str, done: LookupCallback);

    /// Replace the DNS servers used for subsequent lookups.
    ///
    /// One or two servers are accepted; anything else is
    /// [`NetworkError::InvalidDnsServers`] and leaves the resolver unchanged.
    fn set_servers(&self, servers: &[IpAddr]) -> Result<()>;
}

impl<T: NameResolver + ?Sized> NameResolver for std::sync::Arc<T> {
    fn lookup(&self, hostname: &str, done: LookupCallback) {
        (**self).lookup(hostname, done)
    }

    fn set_servers(&self, servers: &[IpAddr]) -> Result<()> {
        (**self).set_servers(servers)
    }
}

/// Check the server count accepted by [`NameResolver::set_servers`].
pub fn validate_server_count(servers: &[IpAddr]) -> Result<()> {
    match servers.len() {
        1 | 2 => Ok(()),
        n => Err(NetworkError::InvalidDnsServers(n)),
    }
}

/// A [`NameResolver`] backed by hickory-resolver on a tokio runtime.
///
/// # Example
///
/// ```ignore
/// use courier_net::dns::{DnsConfig, HickoryResolver, NameResolver};
///
/// let resolver = HickoryResolver::new(DnsConfig::system())?;
/// resolver.lookup("example.com", Box::new(|result| {
///     println!("resolved: {:?}", result);
/// }));
/// ```
pub struct HickoryResolver {
    handle: Handle,
    config: Mutex<DnsConfig>,
    /// The underlying hickory resolver (handles caching internally).
    resolver: RwLock<TokioResolver>,
}

impl HickoryResolver {
    /// Create a resolver on the current tokio runtime.
    pub fn new(config: DnsConfig) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|_| NetworkError::Dns("No tokio runtime available".into()))?;
        Self::with_handle(config, handle)
    }

    /// Create a resolver using system DNS settings.
    pub fn system() -> Result<Self> {
        Self::new(DnsConfig::system())
    }

    /// Create a resolver that spawns lookups on the given runtime.
    pub fn with_handle(config: DnsConfig, handle: Handle) -> Result<Self> {
        let resolver = build_resolver(&config)?;
        Ok(Self {
            handle,
            config: Mutex::new(config),
            resolver: RwLock::new(resolver),
        })
    }

    /// The configuration the current resolver was built from.
    pub fn config(&self) -> DnsConfig {
        self.config.lock().clone()
    }

    /// Clear the DNS cache.
    pub fn clear_cache(&self) {
        self.resolver.read().clear_cache();
    }
}

impl NameResolver for HickoryResolver {
    fn lookup(&self, hostname: &str, done: LookupCallback) {
        let hostname = hostname.to_string();
        let resolver = self.resolver.read().clone();

        self.handle.spawn(async move {
            let result = resolve_first(&resolver, &hostname).await;
            if let Err(e) = &result {
                tracing::debug!(target: "courier_net::dns", %hostname, error = %e, "lookup failed");
            }
            done(result);
        });
    }

    fn set_servers(&self, servers: &[IpAddr]) -> Result<()> {
        validate_server_count(servers)?;

        let mut config = self.config.lock();
        let updated = DnsConfig {
            use_system_config: false,
            nameservers: DnsConfig::with_servers(servers).nameservers,
            ..config.clone()
        };
        let resolver = build_resolver(&updated)?;

        *self.resolver.write() = resolver;
        *config = updated;
        tracing::debug!(target: "courier_net::dns", ?servers, "DNS servers updated");
        Ok(())
    }
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("config", &*self.config.lock())
            .finish()
    }
}

/// Build a hickory resolver from our DnsConfig.
fn build_resolver(config: &DnsConfig) -> Result<TokioResolver> {
    let resolver_config = if config.use_system_config {
        ResolverConfig::default()
    } else if config.nameservers.is_empty() {
        return Err(NetworkError::Dns("No nameservers configured".to_string()));
    } else {
        let mut resolver_config = ResolverConfig::new();
        for addr in &config.nameservers {
            resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
        }
        resolver_config
    };

    let mut opts = ResolverOpts::default();
    opts.cache_size = config.cache_size;
    opts.use_hosts_file = if config.use_hosts_file {
        ResolveHosts::Auto
    } else {
        ResolveHosts::Never
    };
    opts.attempts = config.attempts;
    opts.timeout = config.timeout;
    opts.ip_strategy = match config.ip_strategy {
        IpStrategy::Ipv4Only => LookupIpStrategy::Ipv4Only,
        IpStrategy::Ipv6Only => LookupIpStrategy::Ipv6Only,
        IpStrategy::Ipv4ThenIpv6 => LookupIpStrategy::Ipv4thenIpv6,
        IpStrategy::Ipv6ThenIpv4 => LookupIpStrategy::Ipv6thenIpv4,
    };

    Ok(
        Resolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
            .with_options(opts)
            .build(),
    )
}

/// Resolve a hostname to the first address the strategy yields.
async fn resolve_first(resolver: &TokioResolver, hostname: &str) -> Result<IpAddr> {
    let response = resolver
        .lookup_ip(hostname)
        .await
        .map_err(|e| NetworkError::Dns(e.to_string()))?;

    response.iter().next().ok_or_else(|| {
        NetworkError::Dns(format!("No addresses found for hostname: {}", hostname))
    })
}
