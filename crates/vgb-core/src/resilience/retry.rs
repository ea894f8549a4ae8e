//! Bounded exponential-backoff retry for flaky transport.
//!
//! This governs a single logical call. The circuit breaker tracks the
//! dependency's health across calls; a call that exhausts its retries still
//! reaches the breaker as exactly one failure.

use std::{future::Future, time::Duration};

use tokio::time::sleep;

/// Errors that can tell whether another attempt might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay slept before retry `k` (1-indexed): `base_delay * 2^(k-1)`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op`, retrying only transient errors.
    ///
    /// Non-transient errors and all `Ok` values return immediately. After the
    /// last retry the final transient error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.backoff_delay(retry);
                    tracing::warn!(
                        attempt = retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum Flaky {
        Timeout,
        Fatal,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for Flaky {
        fn is_transient(&self) -> bool {
            matches!(self, Self::Timeout)
        }
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let p = RetryPolicy::new(3, Duration::from_millis(300));
        assert_eq!(p.backoff_delay(0), Duration::ZERO);
        assert_eq!(p.backoff_delay(1), Duration::from_millis(300));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(600));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_with_exponential_spacing() {
        let p = RetryPolicy::new(2, Duration::from_millis(300));
        let start = Instant::now();
        let attempts = Mutex::new(Vec::new());

        let out: Result<(), Flaky> = p
            .run(|| {
                attempts.lock().unwrap().push(start.elapsed());
                async { Err(Flaky::Timeout) }
            })
            .await;

        assert_eq!(out, Err(Flaky::Timeout));
        let at = attempts.lock().unwrap().clone();
        assert_eq!(at.len(), 3);
        assert_eq!(at[0], Duration::ZERO);
        assert_eq!(at[1] - at[0], Duration::from_millis(300));
        assert_eq!(at[2] - at[1], Duration::from_millis(600));
        // No sleep after the final failure.
        assert_eq!(start.elapsed(), Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_are_not_retried() {
        let p = RetryPolicy::new(5, Duration::from_millis(100));
        let calls = Mutex::new(0);
        let out: Result<(), Flaky> = p
            .run(|| {
                *calls.lock().unwrap() += 1;
                async { Err(Flaky::Fatal) }
            })
            .await;
        assert_eq!(out, Err(Flaky::Fatal));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_a_later_attempt() {
        let p = RetryPolicy::new(2, Duration::from_millis(10));
        let calls = Mutex::new(0);
        let out = p
            .run(|| {
                let n = {
                    let mut c = calls.lock().unwrap();
                    *c += 1;
                    *c
                };
                async move {
                    if n < 2 {
                        Err(Flaky::Timeout)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(out, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let p = RetryPolicy::new(0, Duration::from_millis(10));
        let calls = Mutex::new(0);
        let out: Result<(), Flaky> = p
            .run(|| {
                *calls.lock().unwrap() += 1;
                async { Err(Flaky::Timeout) }
            })
            .await;
        assert_eq!(out, Err(Flaky::Timeout));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
