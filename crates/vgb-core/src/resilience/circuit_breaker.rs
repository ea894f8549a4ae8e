//! Circuit breaker guarding one logical dependency.
//!
//! # States
//!
//! - **Closed**: calls pass through, qualifying failures are counted.
//! - **Open**: calls fail fast with [`CircuitOpen`] without touching the dependency.
//! - **Half-Open**: the recovery timeout elapsed; exactly one probe call is let through.
//!
//! The breaker is an explicitly owned handle: build one per dependency and
//! share it (`Arc<CircuitBreaker>`) with whatever calls that dependency.

use std::{
    fmt,
    future::Future,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;

/// Returned instead of invoking the operation while the circuit is open.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("circuit '{name}' is open (retry in {}s)", .retry_in.as_secs())]
pub struct CircuitOpen {
    pub name: String,
    pub retry_in: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// Coarse failure classes the breaker understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    Timeout,
    Connection,
    Api,
    MalformedResponse,
    RateLimited,
}

/// Errors routed through a breaker report their class here.
///
/// `None` means the error says nothing about the dependency's health (bad
/// input, local bugs) and never moves the breaker.
pub trait Classify {
    fn failure_class(&self) -> Option<FailureClass>;
}

/// Which failure classes count toward opening the circuit.
#[derive(Clone, Debug)]
pub struct FailurePolicy {
    pub count_timeouts: bool,
    pub count_connection_errors: bool,
    pub count_api_errors: bool,
    pub count_malformed_responses: bool,
    /// 429s mean "slow down", not "down"; off by default.
    pub count_rate_limits: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            count_timeouts: true,
            count_connection_errors: true,
            count_api_errors: true,
            count_malformed_responses: true,
            count_rate_limits: false,
        }
    }
}

impl FailurePolicy {
    pub fn counts(&self, class: FailureClass) -> bool {
        match class {
            FailureClass::Timeout => self.count_timeouts,
            FailureClass::Connection => self.count_connection_errors,
            FailureClass::Api => self.count_api_errors,
            FailureClass::MalformedResponse => self.count_malformed_responses,
            FailureClass::RateLimited => self.count_rate_limits,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive qualifying failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a half-open probe is allowed.
    pub recovery_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Point-in-time view of a breaker, for status output and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub since_last_failure: Option<Duration>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    /// Ticket of the half-open probe currently in flight.
    probe: Option<u64>,
    next_probe: u64,
}

impl BreakerInner {
    fn issue_probe(&mut self) -> u64 {
        let ticket = self.next_probe;
        self.next_probe = self.next_probe.wrapping_add(1);
        self.probe = Some(ticket);
        ticket
    }

    /// Only the call holding the current probe ticket frees the slot; calls
    /// admitted before the trip finish without touching it.
    fn release_probe(&mut self, ticket: Option<u64>) {
        if ticket.is_some() && self.probe == ticket {
            self.probe = None;
        }
    }
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe: None,
                next_probe: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            since_last_failure: inner.last_failure.map(|t| t.elapsed()),
        }
    }

    /// Force the breaker back to a fresh closed state.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.probe = None;
    }

    /// Run `op` under the breaker.
    ///
    /// The lock is only held for bookkeeping before and after `op`, never
    /// across it, so concurrent calls are not serialized.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + From<CircuitOpen>,
    {
        let ticket = self.acquire().map_err(E::from)?;
        let mut guard = ProbeGuard {
            breaker: self,
            ticket,
        };

        let out = op().await;
        guard.ticket = None;

        match &out {
            Ok(_) => self.record_success(ticket),
            Err(e) => self.record_failure(ticket, e.failure_class()),
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decide whether a call may proceed. `Ok(Some(ticket))` marks a half-open probe.
    fn acquire(&self) -> Result<Option<u64>, CircuitOpen> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(None),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(self.config.recovery_timeout + Duration::from_millis(1));
                if elapsed <= self.config.recovery_timeout {
                    return Err(self.open_error(self.config.recovery_timeout - elapsed));
                }
                tracing::info!(breaker = %self.name, "circuit half-open, probing dependency");
                inner.state = CircuitState::HalfOpen;
                Ok(Some(inner.issue_probe()))
            }
            CircuitState::HalfOpen => {
                if inner.probe.is_some() {
                    return Err(self.open_error(Duration::ZERO));
                }
                Ok(Some(inner.issue_probe()))
            }
        }
    }

    fn record_success(&self, ticket: Option<u64>) {
        let mut inner = self.lock();
        inner.release_probe(ticket);
        if inner.state != CircuitState::Closed {
            tracing::info!(breaker = %self.name, "circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
    }

    fn record_failure(&self, ticket: Option<u64>, class: Option<FailureClass>) {
        let mut inner = self.lock();
        inner.release_probe(ticket);

        let counts = class
            .map(|c| self.config.failure_policy.counts(c))
            .unwrap_or(false);
        if !counts {
            return;
        }

        let now = Instant::now();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(now);

        if inner.failure_count >= self.config.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    recovery_secs = self.config.recovery_timeout.as_secs(),
                    "circuit opened"
                );
            }
            inner.state = CircuitState::Open;
        }
    }

    fn open_error(&self, retry_in: Duration) -> CircuitOpen {
        CircuitOpen {
            name: self.name.clone(),
            retry_in,
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &*self.lock())
            .field("config", &self.config)
            .finish()
    }
}

/// Releases the half-open probe slot if the probing future is dropped mid-flight.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Option<u64>,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.ticket.is_some() {
            self.breaker.lock().release_probe(self.ticket);
        }
    }
}
