use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;

use crate::transport::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Error, PartialEq)]
pub enum RetryPolicyError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,

    #[error("base delay must be non-zero")]
    ZeroDelay,

    #[error("multiplier must be finite and greater than 1.0, got {0}")]
    NonIncreasing(f64),
}

/// Bounded exponential backoff for connection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        multiplier: f64,
    ) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError::NoAttempts);
        }
        if base_delay.is_zero() {
            return Err(RetryPolicyError::ZeroDelay);
        }
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(RetryPolicyError::NonIncreasing(multiplier));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            multiplier,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying after the `attempt`-th consecutive failure
    ///
    /// Saturates at `Duration::MAX` once the backoff overflows.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// `attempt` is the 1-based count of consecutive failures so far
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if kind != ErrorKind::Transient || attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.delay_for(attempt.max(1)))
    }
}

/// Source of backoff delays; swapped out in tests to avoid real timers
pub trait DelayScheduler: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl DelayScheduler for TokioScheduler {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
