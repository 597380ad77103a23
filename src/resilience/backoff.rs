//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Per-provider backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Upper bound of the random fraction added on top of the exponential delay.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

/// `min(base * 2^attempt * (1 + jitter_sample), cap)`.
///
/// `attempt` is zero-based within one provider; `jitter_sample` is the random
/// fraction in `[0, policy.jitter)`.
pub fn exponential_delay(attempt: u32, policy: &BackoffPolicy, jitter_sample: f64) -> Duration {
    let exponential = policy.base.as_secs_f64() * 2f64.powi(attempt.min(64) as i32);
    let delay = exponential + jitter_sample.max(0.0) * exponential;
    Duration::from_secs_f64(delay.min(policy.cap.as_secs_f64()))
}

/// Delay before the next attempt. An explicit `retry_after` from the
/// upstream is used as-is instead of the exponential formula.
pub fn calculate_backoff(
    attempt: u32,
    policy: &BackoffPolicy,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after;
    }

    let jitter_sample = if policy.jitter > 0.0 {
        rand::thread_rng().gen_range(0.0..policy.jitter)
    } else {
        0.0
    };

    exponential_delay(attempt, policy, jitter_sample)
}
