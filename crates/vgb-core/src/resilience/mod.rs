//! Resilience primitives for calling unreliable dependencies.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, Classify,
    FailureClass, FailurePolicy,
};
pub use retry::{RetryPolicy, Transient};
