//! Exponential backoff for transient generation failures

use conclave_common::{ConclaveError, GenerationError, RetryConfig};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that can tell whether another attempt may succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl Retryable for ConclaveError {
    fn is_retryable(&self) -> bool {
        matches!(self, ConclaveError::Generation(e) if e.is_transient())
    }
}

/// Backoff schedule applied around a single generation call site
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fractional jitter (0.1 = +/-10%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier.max(1.0),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        // Clamp before jitter and conversion; large exponents overflow to infinity
        let base = (self.base_delay.as_secs_f64() * self.multiplier.powi(exponent)).min(cap);

        let wait = if self.jitter > 0.0 && base > 0.0 {
            let range = base * self.jitter;
            base + rand::thread_rng().gen_range(-range..range)
        } else {
            base
        };

        Duration::from_secs_f64(wait.clamp(0.0, cap))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only errors whose [`Retryable::is_retryable`] is true are retried; the
    /// last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:.2}s",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
