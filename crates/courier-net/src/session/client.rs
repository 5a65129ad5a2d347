//! The single-session UDP client.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use courier_core::slot::Callback;
use courier_core::{CallbackSlot, DebugGate, OneShotTimer, TokioTimer};
use parking_lot::Mutex;

use super::config::{RetryPolicy, SessionConfig};
use super::reply::Reply;
use super::resolution::ResolutionSupervisor;
use super::settings::ClientSettings;
use super::state::{SessionState, StateCell};
use crate::dns::{DnsConfig, HickoryResolver, NameResolver};
use crate::error::{NetworkError, Result};
use crate::udp::{Datagram, TokioUdpTransport, UdpChannel, UdpDescriptor, UdpEvents, UdpTransport};

/// Caller-supplied notifications, installed wholesale with
/// [`UdpSession::set_callbacks`].
///
/// Unset callbacks are no-ops.
#[derive(Clone, Default)]
pub struct SessionCallbacks {
    data_sent: Option<Callback<()>>,
    data_ready: Option<Callback<Reply>>,
}

impl SessionCallbacks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once the datagram has left the device.
    pub fn on_data_sent<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.data_sent = Some(Arc::new(move |_: &()| f()));
        self
    }

    /// Invoked with the outcome of each send: the reply or a timeout.
    pub fn on_data_ready<F>(mut self, f: F) -> Self
    where
        F: Fn(&Reply) + Send + Sync + 'static,
    {
        self.data_ready = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("data_sent", &self.data_sent.is_some())
            .field("data_ready", &self.data_ready.is_some())
            .finish()
    }
}

/// One outstanding send/await-reply cycle.
struct ReplyCycle {
    id: u64,
    /// Attached once the transport has opened the channel.
    channel: Option<Arc<dyn UdpChannel>>,
    /// The datagram has left the device and the reply timer is armed.
    awaiting: bool,
}

impl ReplyCycle {
    /// Whether this is cycle `id` and `send` has handed it its channel.
    fn is_attached(&self, id: u64) -> bool {
        self.id == id && self.channel.is_some()
    }

    fn close(&self) {
        if let Some(channel) = &self.channel {
            channel.close();
        }
    }
}

#[derive(Default)]
struct SessionInner {
    config: Option<SessionConfig>,
    local_port: Option<u16>,
    next_cycle: u64,
    cycle: Option<ReplyCycle>,
}

struct SessionShared {
    resolver: Arc<dyn NameResolver>,
    transport: Arc<dyn UdpTransport>,
    reply_timer: Arc<dyn OneShotTimer>,
    supervisor: ResolutionSupervisor,
    lifecycle: StateCell,
    debug: DebugGate,
    /// Debug setting applied by `initialize`.
    debug_default: bool,
    data_sent: CallbackSlot<()>,
    data_ready: CallbackSlot<Reply>,
    inner: Mutex<SessionInner>,
}

/// A single-session UDP client.
///
/// The session resolves one configured endpoint, sends a datagram to it and
/// reports one [`Reply`] per send: the datagram that came back, or
/// [`Reply::Timeout`].
///
/// # Lifecycle
///
/// 1. [`initialize`](Self::initialize) with a [`SessionConfig`]
/// 2. [`resolve`](Self::resolve) the endpoint
/// 3. [`send`](Self::send) a payload; the data-ready callback reports the
///    outcome
///
/// Steps 2 and 3 may be repeated. At most one send is outstanding at a time.
///
/// # Example
///
/// ```ignore
/// use courier_net::session::{ClientSettings, SessionCallbacks, SessionConfig, UdpSession};
///
/// let session = UdpSession::with_tokio(&ClientSettings::default())?;
/// session.set_callbacks(
///     SessionCallbacks::new()
///         .on_data_sent(|| println!("sent"))
///         .on_data_ready(|reply| println!("reply: {} bytes", reply.len())),
/// );
///
/// session.initialize(SessionConfig::named("time.example.com", 9999));
/// let handle = session.clone();
/// session.resolve(move |result| {
///     if result.is_ok() {
///         let _ = handle.send(&b"ping"[..]);
///     }
/// })?;
/// ```
#[derive(Clone)]
pub struct UdpSession {
    shared: Arc<SessionShared>,
}

impl UdpSession {
    /// Start building a session from its collaborators.
    pub fn builder() -> UdpSessionBuilder {
        UdpSessionBuilder::new()
    }

    /// Build a session on the current tokio runtime.
    ///
    /// Uses hickory for lookups (the settings' DNS servers, or the system
    /// configuration when none are listed), tokio sockets and tokio timers.
    pub fn with_tokio(settings: &ClientSettings) -> Result<Self> {
        settings.validate()?;

        let dns = if settings.dns.servers.is_empty() {
            DnsConfig::system()
        } else {
            DnsConfig::with_servers(&settings.dns.servers)
        };

        Self::builder()
            .resolver(HickoryResolver::new(dns)?)
            .transport(TokioUdpTransport::new()?)
            .retry_timer(TokioTimer::new()?)
            .reply_timer(TokioTimer::new()?)
            .retry_policy(settings.retry_policy())
            .debug(settings.debug)
            .build()
    }

    /// Configure the endpoint and move to `Ready`.
    ///
    /// Disarms both timers and abandons any resolution or reply cycle in
    /// flight; their late results are ignored. Diagnostics are switched back
    /// to the session's debug default.
    pub fn initialize(&self, config: SessionConfig) {
        let abandoned = {
            let mut inner = self.shared.inner.lock();
            inner.config = Some(config);
            inner.local_port = None;
            let abandoned = inner.cycle.take();

            self.shared.supervisor.cancel();
            self.shared.reply_timer.disarm();
            self.shared.lifecycle.set(SessionState::Ready);
            abandoned
        };

        if let Some(cycle) = abandoned {
            cycle.close();
        }

        self.shared.debug.set(self.shared.debug_default);
        if self.shared.debug.is_enabled() {
            tracing::debug!(target: "courier_net::session", "session initialized");
        }
    }

    /// Switch diagnostic output on or off.
    pub fn set_debug(&self, enabled: bool) {
        self.shared.debug.set(enabled);
    }

    /// Whether diagnostic output is on.
    pub fn is_debug(&self) -> bool {
        self.shared.debug.is_enabled()
    }

    /// Replace the DNS servers used for subsequent lookups.
    ///
    /// Accepts one or two servers; anything else fails with
    /// [`NetworkError::InvalidDnsServers`] and changes nothing.
    pub fn set_dns_servers(&self, servers: &[IpAddr]) -> Result<()> {
        self.shared.resolver.set_servers(servers)
    }

    /// Install both callbacks, replacing the previous pair.
    pub fn set_callbacks(&self, callbacks: SessionCallbacks) {
        self.shared.data_sent.replace(callbacks.data_sent);
        self.shared.data_ready.replace(callbacks.data_ready);
    }

    /// Resolve the configured endpoint.
    ///
    /// `done` receives the address or the reason resolution failed, exactly
    /// once. For a literal address or a missing host it runs before `resolve`
    /// returns.
    pub fn resolve<F>(&self, done: F) -> Result<()>
    where
        F: FnOnce(Result<IpAddr>) + Send + 'static,
    {
        let target = {
            let inner = self.shared.inner.lock();
            let config = inner.config.as_ref().ok_or(NetworkError::NotInitialized)?;
            if inner.cycle.is_some() {
                return Err(NetworkError::ReplyPending);
            }
            config.target.clone()
        };

        self.shared.supervisor.resolve(&target, done);
        Ok(())
    }

    /// Send one datagram to the resolved endpoint.
    ///
    /// A fresh ephemeral port is used. `Ok` means the network stack accepted
    /// the datagram; the data-sent callback follows once it has left the
    /// device, and the data-ready callback later reports the reply or a
    /// timeout. On `Err` neither callback fires.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.shared.send(payload.into())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.lifecycle.get()
    }

    /// The configuration passed to the last `initialize`.
    pub fn config(&self) -> Option<SessionConfig> {
        self.shared.inner.lock().config.clone()
    }

    /// The configured host name, if the endpoint is resolved through DNS.
    pub fn host_name(&self) -> Option<String> {
        self.shared
            .inner
            .lock()
            .config
            .as_ref()
            .and_then(|config| config.host_name().map(str::to_string))
    }

    /// The configured remote port.
    pub fn remote_port(&self) -> Option<u16> {
        self.shared.inner.lock().config.as_ref().map(|c| c.remote_port)
    }

    /// The configured reply timeout.
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.shared.inner.lock().config.as_ref().map(|c| c.reply_timeout)
    }

    /// The local port used by the most recent send.
    pub fn local_port(&self) -> Option<u16> {
        self.shared.inner.lock().local_port
    }

    /// The address found by the most recent successful resolution.
    pub fn resolved_address(&self) -> Option<IpAddr> {
        self.shared.supervisor.resolved_address()
    }

    /// Retry-timer expiries in the current resolution attempt.
    pub fn retry_count(&self) -> u32 {
        self.shared.supervisor.retry_count()
    }

    /// The resolution retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.shared.supervisor.policy()
    }

    /// Whether a send is still waiting for its reply or timeout.
    pub fn is_reply_pending(&self) -> bool {
        self.shared.inner.lock().cycle.is_some()
    }
}

impl std::fmt::Debug for UdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("UdpSession")
            .field("state", &self.shared.lifecycle.get())
            .field("config", &inner.config)
            .field("local_port", &inner.local_port)
            .field("reply_pending", &inner.cycle.is_some())
            .field("debug", &self.shared.debug.is_enabled())
            .finish()
    }
}

impl SessionShared {
    fn send(self: &Arc<Self>, payload: Bytes) -> Result<()> {
        let (id, remote) = {
            let mut inner = self.inner.lock();
            let state = self.lifecycle.get();
            if inner.cycle.is_some() {
                return Err(NetworkError::ReplyPending);
            }
            if state != SessionState::Resolved {
                return Err(NetworkError::NotResolved(state));
            }
            let remote_port = inner
                .config
                .as_ref()
                .map(|c| c.remote_port)
                .ok_or(NetworkError::NotInitialized)?;
            let address = self
                .supervisor
                .resolved_address()
                .ok_or(NetworkError::NotResolved(state))?;

            inner.next_cycle += 1;
            let id = inner.next_cycle;
            inner.cycle = Some(ReplyCycle {
                id,
                channel: None,
                awaiting: false,
            });
            (id, SocketAddr::new(address, remote_port))
        };

        let port = self.transport.allocate_port();
        let mut descriptor = UdpDescriptor::new(port, remote);
        if remote.is_ipv6() {
            let any = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            descriptor = descriptor.local_addr(any);
        }

        let channel = match self.transport.open(descriptor, self.cycle_events(id)) {
            Ok(channel) => channel,
            Err(e) => {
                self.abandon(id);
                if self.debug.is_enabled() {
                    tracing::debug!(
                        target: "courier_net::session",
                        error = %e,
                        "could not open UDP channel"
                    );
                }
                return Err(e);
            }
        };

        {
            let mut inner = self.inner.lock();
            let attached = match inner.cycle.as_mut() {
                Some(cycle) if cycle.id == id => {
                    cycle.channel = Some(channel.clone());
                    true
                }
                _ => false,
            };
            if !attached {
                drop(inner);
                channel.close();
                return Err(NetworkError::SendFailed("session was re-initialized".into()));
            }
            inner.local_port = Some(channel.local_port());
        }

        let len = payload.len();
        if let Err(e) = channel.send(payload) {
            self.abandon(id);
            if self.debug.is_enabled() {
                tracing::debug!(target: "courier_net::session", error = %e, "data send error");
            }
            return Err(match e {
                NetworkError::SendFailed(_) => e,
                other => NetworkError::SendFailed(other.to_string()),
            });
        }

        if self.debug.is_enabled() {
            tracing::debug!(
                target: "courier_net::session",
                len,
                local_port = channel.local_port(),
                %remote,
                "data sent"
            );
        }
        Ok(())
    }

    fn cycle_events(self: &Arc<Self>, id: u64) -> UdpEvents {
        let sent: Weak<Self> = Arc::downgrade(self);
        let received = sent.clone();
        let failed = sent.clone();

        UdpEvents {
            on_sent: Arc::new(move || {
                if let Some(shared) = sent.upgrade() {
                    shared.on_sent(id);
                }
            }),
            on_received: Arc::new(move |datagram| {
                if let Some(shared) = received.upgrade() {
                    shared.on_received(id, datagram);
                }
            }),
            on_error: Arc::new(move |error| {
                if let Some(shared) = failed.upgrade() {
                    shared.on_channel_error(id, error);
                }
            }),
        }
    }

    /// Drop cycle `id` if it is still current and close its channel.
    fn abandon(&self, id: u64) {
        let cycle = self.inner.lock().cycle.take_if(|cycle| cycle.id == id);
        if let Some(cycle) = cycle {
            cycle.close();
        }
    }

    /// Put cycle `id` into the awaiting phase. Returns the reply timeout to
    /// arm, or `None` when the cycle is stale, not yet attached or already
    /// awaiting.
    fn begin_awaiting(&self, id: u64) -> Option<Duration> {
        let mut inner = self.inner.lock();
        let timeout = inner
            .config
            .as_ref()
            .map_or(super::config::DEFAULT_REPLY_TIMEOUT, |c| c.reply_timeout);

        let cycle = inner
            .cycle
            .as_mut()
            .filter(|c| c.is_attached(id) && !c.awaiting)?;
        cycle.awaiting = true;
        self.lifecycle.set(SessionState::AwaitingReply);
        Some(timeout)
    }

    /// Arm the reply timer for cycle `id`.
    ///
    /// The callback is replaced on every arm so that an expiry already in
    /// flight for an earlier cycle still names that cycle.
    fn arm_reply_timer(self: &Arc<Self>, id: u64, timeout: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.reply_timer.set_callback(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_reply_timeout(id);
            }
        }));
        self.reply_timer.arm(timeout);
    }

    fn on_sent(self: &Arc<Self>, id: u64) {
        let Some(timeout) = self.begin_awaiting(id) else {
            return;
        };

        self.data_sent.emit(&());

        // The reply may already have been delivered from inside the callback.
        let still_waiting = self
            .inner
            .lock()
            .cycle
            .as_ref()
            .is_some_and(|c| c.id == id);
        if still_waiting {
            self.arm_reply_timer(id, timeout);
        }
    }

    fn on_received(&self, id: u64, datagram: Datagram) {
        let cycle = {
            let mut inner = self.inner.lock();
            // A datagram that beats `send` to the channel hand-off is stray.
            let cycle = inner.cycle.take_if(|cycle| cycle.is_attached(id));
            if cycle.is_some() {
                self.lifecycle.set(SessionState::Resolved);
            }
            cycle
        };

        let Some(cycle) = cycle else {
            tracing::trace!(
                target: "courier_net::session",
                len = datagram.len(),
                "dropping datagram outside an attached send"
            );
            return;
        };

        self.reply_timer.disarm();
        cycle.close();

        if self.debug.is_enabled() {
            tracing::debug!(
                target: "courier_net::session",
                len = datagram.len(),
                source = %datagram.source,
                "data received"
            );
        }
        self.data_ready.emit(&Reply::Data(datagram));
    }

    fn on_reply_timeout(&self, id: u64) {
        let cycle = {
            let mut inner = self.inner.lock();
            let cycle = inner.cycle.take_if(|cycle| cycle.id == id && cycle.awaiting);
            if cycle.is_some() {
                self.lifecycle.set(SessionState::Resolved);
            }
            cycle
        };

        let Some(cycle) = cycle else {
            tracing::trace!(
                target: "courier_net::session",
                cycle = id,
                "ignoring stale reply expiry"
            );
            return;
        };
        cycle.close();

        if self.debug.is_enabled() {
            tracing::debug!(
                target: "courier_net::session",
                "reply timer expired, no data received"
            );
        }
        self.data_ready.emit(&Reply::Timeout);
    }

    fn on_channel_error(self: &Arc<Self>, id: u64, error: NetworkError) {
        tracing::warn!(target: "courier_net::session", error = %error, "UDP channel error");

        // A datagram that failed after the send call returned never left the
        // device. It is treated as lost: the reply timer still decides.
        if let Some(timeout) = self.begin_awaiting(id) {
            self.arm_reply_timer(id, timeout);
        }
    }
}

/// Assembles a [`UdpSession`] from its collaborators.
///
/// The resolver and transport are required. Timers left unset are created
/// as [`TokioTimer`]s on the current runtime.
pub struct UdpSessionBuilder {
    resolver: Option<Arc<dyn NameResolver>>,
    transport: Option<Arc<dyn UdpTransport>>,
    retry_timer: Option<Arc<dyn OneShotTimer>>,
    reply_timer: Option<Arc<dyn OneShotTimer>>,
    retry_policy: RetryPolicy,
    debug: bool,
}

impl Default for UdpSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpSessionBuilder {
    /// Create a builder with the default retry policy and debug on.
    pub fn new() -> Self {
        Self {
            resolver: None,
            transport: None,
            retry_timer: None,
            reply_timer: None,
            retry_policy: RetryPolicy::default(),
            debug: true,
        }
    }

    /// Set the name resolver.
    pub fn resolver<R: NameResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Set the UDP transport.
    pub fn transport<T: UdpTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the timer that bounds each lookup.
    pub fn retry_timer<T: OneShotTimer + 'static>(mut self, timer: T) -> Self {
        self.retry_timer = Some(Arc::new(timer));
        self
    }

    /// Set the timer that bounds the wait for a reply.
    pub fn reply_timer<T: OneShotTimer + 'static>(mut self, timer: T) -> Self {
        self.reply_timer = Some(Arc::new(timer));
        self
    }

    /// Set the resolution retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the debug default applied on construction and by every
    /// `initialize`.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Build the session.
    pub fn build(self) -> Result<UdpSession> {
        let resolver = self
            .resolver
            .ok_or_else(|| NetworkError::Config("a name resolver is required".into()))?;
        let transport = self
            .transport
            .ok_or_else(|| NetworkError::Config("a UDP transport is required".into()))?;
        let retry_timer = match self.retry_timer {
            Some(timer) => timer,
            None => Arc::new(TokioTimer::new()?),
        };
        let reply_timer = match self.reply_timer {
            Some(timer) => timer,
            None => Arc::new(TokioTimer::new()?),
        };

        let lifecycle = StateCell::default();
        let debug = DebugGate::new(self.debug);
        let supervisor = ResolutionSupervisor::with_shared(
            resolver.clone(),
            retry_timer,
            self.retry_policy,
            lifecycle.clone(),
            debug.clone(),
        );

        let shared = Arc::new(SessionShared {
            resolver,
            transport,
            reply_timer,
            supervisor,
            lifecycle,
            debug,
            debug_default: self.debug,
            data_sent: CallbackSlot::new(),
            data_ready: CallbackSlot::new(),
            inner: Mutex::new(SessionInner::default()),
        });
        Ok(UdpSession { shared })
    }
}

impl std::fmt::Debug for UdpSessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSessionBuilder")
            .field("resolver", &self.resolver.is_some())
            .field("transport", &self.transport.is_some())
            .field("retry_policy", &self.retry_policy)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoResolver;

    impl NameResolver for NoResolver {
        fn lookup(&self, _hostname: &str, _done: crate::dns::LookupCallback) {}

        fn set_servers(&self, servers: &[IpAddr]) -> Result<()> {
            crate::dns::validate_server_count(servers)
        }
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let clock = courier_core::ManualClock::new();
        let result = UdpSession::builder()
            .retry_timer(clock.timer())
            .reply_timer(clock.timer())
            .build();
        assert!(matches!(result, Err(NetworkError::Config(_))));

        let result = UdpSession::builder()
            .resolver(NoResolver)
            .retry_timer(clock.timer())
            .reply_timer(clock.timer())
            .build();
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_callbacks_debug() {
        let callbacks = SessionCallbacks::new().on_data_sent(|| {});
        let rendered = format!("{:?}", callbacks);
        assert!(rendered.contains("data_sent: true"));
        assert!(rendered.contains("data_ready: false"));
    }
}
