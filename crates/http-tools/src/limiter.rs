//! Sliding-window admission control shared by every outbound call.
//!
//! At most `capacity` admissions are granted in any rolling window of `period`. A caller over
//! budget suspends until the oldest admission in the window ages out; nothing fails and nothing
//! is dropped.
//!
//! Waiters queue on a `tokio::sync::Mutex`, which hands the lock out in FIFO order, and the
//! admission timestamp is recorded only once the caller is let through. Dropping an
//! `acquire()` future while it waits therefore leaves the window untouched.

use crate::error::{Result, TransportError};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    period: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if `capacity` is zero or `period` is zero.
    pub fn new(capacity: usize, period: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(TransportError::Config(
                "rate limit capacity must be at least 1".to_string(),
            ));
        }
        if period.is_zero() {
            return Err(TransportError::Config(
                "rate limit period must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            period,
            admissions: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for admission and return the instant it was granted.
    pub async fn acquire(&self) -> Instant {
        let mut window = self.admissions.lock().await;
        loop {
            let now = Instant::now();
            while let Some(&oldest) = window.front() {
                if now.saturating_duration_since(oldest) >= self.period {
                    window.pop_front();
                } else {
                    break;
                }
            }

            if window.len() < self.capacity {
                window.push_back(now);
                return now;
            }

            // Full window: the front entry is the next one to expire.
            let Some(&oldest) = window.front() else {
                continue;
            };
            let ready_at = oldest + self.period;
            tracing::debug!(
                wait_ms = ready_at.saturating_duration_since(now).as_millis() as u64,
                capacity = self.capacity,
                "rate limit reached, waiting for admission"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }

    /// Number of admissions still inside the current window.
    pub async fn admitted_in_window(&self) -> usize {
        let window = self.admissions.lock().await;
        let now = Instant::now();
        window
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < self.period)
            .count()
    }
}
