//! Shared call budget for the generation service
//!
//! Sliding window over the timestamps of the most recent calls: at most
//! `max_calls` acquisitions complete inside any rolling `period`.

use conclave_common::{ConclaveError, RateLimitConfig, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Sliding-window limiter shared by every agent call
#[derive(Debug)]
pub struct RateBudget {
    max_calls: usize,
    period: Duration,
    /// Timestamps of granted calls, oldest first
    calls: Mutex<VecDeque<Instant>>,
}

impl RateBudget {
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1) as usize,
            period,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_calls, config.period())
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until `n` calls fit in the window, then record them.
    ///
    /// The lock is held while sleeping so waiters are served in arrival order
    /// and nobody can slip into a slot another caller is waiting for.
    /// Returns how long the caller waited.
    pub async fn acquire(&self, n: usize) -> Result<Duration> {
        if n == 0 {
            return Ok(Duration::ZERO);
        }
        if n > self.max_calls {
            return Err(ConclaveError::InvalidInput(format!(
                "requested {} calls exceeds the budget of {} per {:?}",
                n, self.max_calls, self.period
            )));
        }

        let started = Instant::now();
        let mut calls = self.calls.lock().await;
        loop {
            let now = Instant::now();
            while calls
                .front()
                .is_some_and(|oldest| now.duration_since(*oldest) >= self.period)
            {
                calls.pop_front();
            }

            if calls.len() + n <= self.max_calls {
                calls.extend(std::iter::repeat_n(now, n));
                break;
            }

            // The slot we need frees up when this timestamp leaves the window
            let blocking = calls[calls.len() + n - self.max_calls - 1];
            let wait = (blocking + self.period).saturating_duration_since(now);
            debug!("Rate budget exhausted, waiting {:.2}s for {} call(s)", wait.as_secs_f64(), n);
            tokio::time::sleep(wait).await;
        }

        let waited = started.elapsed();
        if waited > Duration::from_millis(100) {
            info!("Rate limited: waited {:.2}s for {} call(s)", waited.as_secs_f64(), n);
        }
        Ok(waited)
    }

    /// Calls currently counted against the window
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        let calls = self.calls.lock().await;
        calls
            .iter()
            .filter(|at| now.duration_since(**at) < self.period)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fourth_call_waits_for_the_window() {
        let budget = RateBudget::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            budget.acquire(1).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(10));

        budget.acquire(1).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60), "waited only {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let budget = RateBudget::new(2, Duration::from_secs(10));
        budget.acquire(1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        budget.acquire(1).await.unwrap();

        // The first call expires at t=10, the second at t=16
        let before = Instant::now();
        budget.acquire(1).await.unwrap();
        assert_eq!(before.elapsed(), Duration::from_secs(4));
        assert_eq!(budget.in_flight().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_unit_acquire() {
        let budget = RateBudget::new(3, Duration::from_secs(30));
        budget.acquire(2).await.unwrap();

        let before = Instant::now();
        budget.acquire(2).await.unwrap();
        assert_eq!(before.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_oversized_request_is_rejected() {
        let budget = RateBudget::new(2, Duration::from_secs(1));
        assert!(matches!(budget.acquire(3).await, Err(ConclaveError::InvalidInput(_))));
        assert_eq!(budget.acquire(0).await.unwrap(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_exceed_budget() {
        let budget = Arc::new(RateBudget::new(2, Duration::from_secs(5)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let budget = budget.clone();
            handles.push(tokio::spawn(async move {
                budget.acquire(1).await.unwrap();
                start.elapsed()
            }));
        }

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();

        // Two per window: 0,0,5,5,10,10
        for (i, at) in finished.iter().enumerate() {
            assert_eq!(at.as_secs(), (i as u64 / 2) * 5);
        }
    }
}
