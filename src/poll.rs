//! Polling of asynchronous service jobs until they leave a pending state.
//!
//! Both exporters sleep before each status check. Insights queries back off
//! exponentially under a wall-clock timeout; export tasks use a fixed interval
//! and a fixed number of checks.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn backoff(initial: Duration, max_interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval: initial,
            max_interval: max_interval.max(initial),
            multiplier: 2.0,
            max_attempts: None,
            timeout: Some(timeout),
        }
    }

    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            max_attempts: Some(max_attempts),
            timeout: None,
        }
    }

    /// Interval to sleep before the given zero-based attempt.
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(32) as i32);
        let secs = self.initial_interval.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PollError {
    #[error("polling timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("gave up after {attempts} status checks")]
    Exhausted { attempts: u32 },
}

/// Repeatedly calls `fetch` until it yields a value for which `is_pending`
/// is false.
///
/// Fetch errors are logged and count as an attempt. A sleep that would cross
/// the timeout is shortened so the final check happens at the deadline.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    what: &str,
    mut fetch: F,
    is_pending: P,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if let Some(max) = policy.max_attempts {
            if attempt >= max {
                return Err(PollError::Exhausted { attempts: attempt });
            }
        }

        let mut wait = policy.interval_for(attempt);
        if let Some(timeout) = policy.timeout {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(PollError::Timeout { elapsed });
            }
            wait = wait.min(timeout - elapsed);
        }
        tokio::time::sleep(wait).await;
        attempt += 1;

        match fetch().await {
            Ok(value) if !is_pending(&value) => {
                tracing::debug!(what, attempt, "Poll reached terminal state");
                return Ok(value);
            }
            Ok(_) => {
                tracing::debug!(what, attempt, "Still pending");
            }
            Err(e) => {
                tracing::warn!(what, attempt, error = %e, "Status check failed");
            }
        }
    }
}
