// Retry policy - bounded exponential backoff with jitter for the metadata probe
//
// The probe is read-only, so repeating it is safe. The materializing call
// is never retried.

use std::time::Duration;

use rand::Rng;

use super::errors::DownloadError;
use super::extractors::BlockingReason;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(4);
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of a probe failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Network hiccup or unexplained exit; may succeed on retry
    Transient,
    /// Platform throttling; retry with backoff
    RateLimited,
    /// Retrying would not change the outcome
    Permanent,
}

/// Decision after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        delay: Duration,
        /// 1-indexed number of the next attempt
        attempt: u32,
    },
    DoNotRetry {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            max_jitter,
        }
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// No backoff at all; used by tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is the 1-indexed attempt that just failed
    pub fn should_retry(&self, failure: FailureType, attempt: u32) -> RetryDecision {
        if failure == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        tracing::debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "[Retry] will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// min(base * 2^(attempt-1), max) + jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        backoff.min(self.max_delay) + self.calculate_jitter()
    }

    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Classify a probe error for retry decisions
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::ProbeFailed { reason, .. } => {
            reason.map(classify_reason).unwrap_or(FailureType::Transient)
        }
        _ => FailureType::Permanent,
    }
}

fn classify_reason(reason: BlockingReason) -> FailureType {
    match reason {
        BlockingReason::RateLimited => FailureType::RateLimited,
        r if r.is_retryable() => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
