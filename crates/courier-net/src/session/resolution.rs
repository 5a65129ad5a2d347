//! Resolution supervisor: drives one host lookup to a single outcome.
//!
//! A named host is looked up through the [`NameResolver`] while a one-shot
//! retry timer runs alongside. Each expiry counts a retry and re-issues the
//! lookup; when the count reaches the policy maximum the attempt fails. A
//! lookup result that arrives first wins and disarms the timer.
//!
//! Both paths settle the same per-attempt slot (`pending` plus the stored
//! completion), so whichever runs second finds nothing to do. Lookup results
//! carry the attempt id they were issued for; results belonging to an
//! earlier attempt are ignored.

use std::net::IpAddr;
use std::sync::{Arc, Weak};

use courier_core::{DebugGate, OneShotTimer};
use parking_lot::Mutex;

use super::config::{HostTarget, RetryPolicy};
use super::state::{SessionState, StateCell};
use crate::dns::NameResolver;
use crate::error::{NetworkError, Result};

/// Completion invoked once per resolution attempt.
pub type ResolveCompletion = Box<dyn FnOnce(Result<IpAddr>) + Send + 'static>;

/// Per-attempt resolution state.
#[derive(Default)]
struct ResolutionState {
    /// Identifies the current attempt; bumped by every `resolve` and `cancel`.
    attempt: u64,
    /// A named lookup is in flight and has not been settled.
    pending: bool,
    hostname: Option<String>,
    /// Retry-timer expiries in the current attempt.
    retries: u32,
    resolved: Option<IpAddr>,
    completion: Option<ResolveCompletion>,
}

impl ResolutionState {
    /// Close the current attempt, handing back its completion.
    fn settle(&mut self) -> Option<ResolveCompletion> {
        self.pending = false;
        self.completion.take()
    }
}

struct SupervisorShared {
    resolver: Arc<dyn NameResolver>,
    timer: Arc<dyn OneShotTimer>,
    policy: RetryPolicy,
    lifecycle: StateCell,
    debug: DebugGate,
    state: Mutex<ResolutionState>,
}

/// Supervises name resolution with a bounded retry budget.
///
/// # Example
///
/// ```ignore
/// use courier_net::session::{HostTarget, ResolutionSupervisor, RetryPolicy};
///
/// let supervisor = ResolutionSupervisor::new(resolver, retry_timer, RetryPolicy::default());
/// supervisor.resolve(&HostTarget::Name("example.com".into()), |result| match result {
///     Ok(addr) => println!("resolved to {addr}"),
///     Err(e) => println!("resolution failed: {e}"),
/// });
/// ```
pub struct ResolutionSupervisor {
    shared: Arc<SupervisorShared>,
}

impl ResolutionSupervisor {
    /// Create a standalone supervisor.
    ///
    /// The supervisor owns the retry timer's callback and replaces it on
    /// every arm.
    pub fn new<R, T>(resolver: R, retry_timer: T, policy: RetryPolicy) -> Self
    where
        R: NameResolver + 'static,
        T: OneShotTimer + 'static,
    {
        Self::with_shared(
            Arc::new(resolver),
            Arc::new(retry_timer),
            policy,
            StateCell::default(),
            DebugGate::new(true),
        )
    }

    pub(crate) fn with_shared(
        resolver: Arc<dyn NameResolver>,
        timer: Arc<dyn OneShotTimer>,
        policy: RetryPolicy,
        lifecycle: StateCell,
        debug: DebugGate,
    ) -> Self {
        let shared = Arc::new(SupervisorShared {
            resolver,
            timer,
            policy,
            lifecycle,
            debug,
            state: Mutex::new(ResolutionState::default()),
        });
        Self { shared }
    }

    /// Start a new resolution attempt for `target`.
    ///
    /// - [`HostTarget::Name`]: issues a lookup, arms the retry timer and moves
    ///   to `Resolving`. `completion` runs later, exactly once.
    /// - [`HostTarget::Literal`]: parses the address and runs `completion`
    ///   before returning.
    /// - [`HostTarget::Unspecified`]: fails with [`NetworkError::NoHost`]
    ///   before returning.
    ///
    /// Any attempt still in flight is abandoned without reporting.
    pub fn resolve<F>(&self, target: &HostTarget, completion: F)
    where
        F: FnOnce(Result<IpAddr>) + Send + 'static,
    {
        self.shared.start(target, Box::new(completion));
    }

    /// Abandon the attempt in flight, if any, and forget the last result.
    ///
    /// Late results of the abandoned attempt are ignored.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// The address found by the most recent successful attempt.
    pub fn resolved_address(&self) -> Option<IpAddr> {
        self.shared.state.lock().resolved
    }

    /// Retry-timer expiries counted in the current attempt.
    pub fn retry_count(&self) -> u32 {
        self.shared.state.lock().retries
    }

    /// Whether a named lookup is in flight.
    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().pending
    }

    /// The retry policy in force.
    pub fn policy(&self) -> RetryPolicy {
        self.shared.policy
    }

    /// The lifecycle state this supervisor last wrote.
    pub fn state(&self) -> SessionState {
        self.shared.lifecycle.get()
    }
}

impl std::fmt::Debug for ResolutionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ResolutionSupervisor")
            .field("attempt", &state.attempt)
            .field("pending", &state.pending)
            .field("hostname", &state.hostname)
            .field("retries", &state.retries)
            .field("resolved", &state.resolved)
            .finish()
    }
}

impl SupervisorShared {
    fn max_retries(&self) -> u32 {
        self.policy.max_retries.max(1)
    }

    fn start(self: &Arc<Self>, target: &HostTarget, completion: ResolveCompletion) {
        let mut state = self.state.lock();
        state.attempt += 1;
        state.retries = 0;
        state.resolved = None;
        state.pending = false;
        state.hostname = None;
        state.completion = None;

        match target {
            HostTarget::Name(hostname) => {
                state.pending = true;
                state.hostname = Some(hostname.clone());
                state.completion = Some(completion);
                let attempt = state.attempt;
                drop(state);

                self.lifecycle.set(SessionState::Resolving);
                if self.debug.is_enabled() {
                    tracing::debug!(
                        target: "courier_net::resolve",
                        %hostname,
                        attempt,
                        "resolving host name"
                    );
                }

                // Armed before the lookup so a synchronous answer still disarms it.
                self.arm_retry(attempt, 0);
                self.issue_lookup(hostname.clone(), attempt);
            }
            HostTarget::Literal(literal) => {
                let result = literal
                    .parse::<IpAddr>()
                    .map_err(|_| NetworkError::InvalidAddress(literal.clone()));
                state.resolved = result.as_ref().ok().copied();
                drop(state);

                self.timer.disarm();
                self.finish(result, completion);
            }
            HostTarget::Unspecified => {
                drop(state);

                self.timer.disarm();
                self.finish(Err(NetworkError::NoHost), completion);
            }
        }
    }

    fn cancel(&self) {
        {
            let mut state = self.state.lock();
            state.attempt += 1;
            state.pending = false;
            state.retries = 0;
            state.resolved = None;
            state.hostname = None;
            state.completion = None;
        }
        self.timer.disarm();
    }

    /// Arm the retry timer for round `round` of `attempt`.
    ///
    /// The callback carries both ids, so an expiry that was already running
    /// when the timer was re-armed or disarmed cannot count against a later
    /// round or attempt.
    fn arm_retry(self: &Arc<Self>, attempt: u64, round: u32) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.timer.set_callback(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_retry_timer(attempt, round);
            }
        }));
        self.timer.arm(self.policy.interval);
    }

    fn issue_lookup(self: &Arc<Self>, hostname: String, attempt: u64) {
        let weak = Arc::downgrade(self);
        self.resolver.lookup(
            &hostname,
            Box::new(move |result| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_found(attempt, result);
                }
            }),
        );
    }

    /// Retry-timer expiry for round `round` of `attempt`.
    fn on_retry_timer(self: &Arc<Self>, attempt: u64, round: u32) {
        let mut state = self.state.lock();
        if state.attempt != attempt || !state.pending || state.retries != round {
            tracing::trace!(
                target: "courier_net::resolve",
                attempt,
                round,
                "ignoring stale retry expiry"
            );
            return;
        }

        state.retries += 1;
        if state.retries >= self.max_retries() {
            let attempts = state.retries;
            let completion = state.settle();
            drop(state);

            self.timer.disarm();
            if self.debug.is_enabled() {
                tracing::debug!(
                    target: "courier_net::resolve",
                    attempts,
                    "max retries exceeded, resolution unsuccessful"
                );
            }
            if let Some(completion) = completion {
                self.finish(Err(NetworkError::DnsExhausted { attempts }), completion);
            }
            return;
        }

        let hostname = state.hostname.clone();
        let retries = state.retries;
        drop(state);

        if self.debug.is_enabled() {
            tracing::debug!(
                target: "courier_net::resolve",
                retries,
                interval = ?self.policy.interval,
                "retry timer expired, issuing another lookup"
            );
        }

        self.arm_retry(attempt, retries);
        if let Some(hostname) = hostname {
            self.issue_lookup(hostname, attempt);
        }
    }

    /// A lookup issued for `attempt` completed.
    fn on_found(&self, attempt: u64, result: Result<IpAddr>) {
        let mut state = self.state.lock();
        if state.attempt != attempt || !state.pending {
            tracing::trace!(
                target: "courier_net::resolve",
                attempt,
                "ignoring lookup result for a settled attempt"
            );
            return;
        }

        if let Ok(addr) = &result {
            state.resolved = Some(*addr);
        }
        let completion = state.settle();
        drop(state);

        self.timer.disarm();
        if let Some(completion) = completion {
            self.finish(result, completion);
        }
    }

    /// Publish the outcome: lifecycle first, then the caller's completion.
    fn finish(&self, result: Result<IpAddr>, completion: ResolveCompletion) {
        match &result {
            Ok(addr) => {
                self.lifecycle.set(SessionState::Resolved);
                if self.debug.is_enabled() {
                    tracing::debug!(target: "courier_net::resolve", %addr, "host resolved");
                }
            }
            Err(e) => {
                self.lifecycle.set(SessionState::Error);
                if self.debug.is_enabled() {
                    tracing::debug!(
                        target: "courier_net::resolve",
                        error = %e,
                        "host could not be resolved"
                    );
                }
            }
        }
        completion(result);
    }
}
