//! Sliding-window rate limiting for outbound notification calls
//!
//! The messaging service enforces both a short burst limit and a longer
//! sustained limit on bot calls. [`RateLimiter`] tracks the timestamps of recent
//! calls and suspends the caller until both windows have room.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
/// Extra wait after the oldest call leaves the minute window
const MINUTE_MARGIN: Duration = Duration::from_millis(100);

/// Two simultaneous sliding windows: at most `per_second` calls in any 1s span
/// and at most `per_minute` calls in any 60s span.
///
/// Callers are served one at a time; a caller that has to wait holds its place
/// in line, so throttled calls keep their submission order.
pub struct RateLimiter {
    per_second: usize,
    per_minute: usize,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given window capacities (each clamped to at least 1)
    ///
    /// # Examples
    ///
    /// ```
    /// use tgmedia_dl::rate_limiter::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(20, 1000);
    /// assert_eq!(limiter.limits(), (20, 1000));
    /// ```
    #[must_use]
    pub fn new(per_second: usize, per_minute: usize) -> Self {
        Self {
            per_second: per_second.max(1),
            per_minute: per_minute.max(1),
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Window capacities as `(per_second, per_minute)`
    pub fn limits(&self) -> (usize, usize) {
        (self.per_second, self.per_minute)
    }

    /// Wait until a call is permitted, then record it
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;

        loop {
            let now = Instant::now();
            while let Some(oldest) = calls.front() {
                if now.duration_since(*oldest) >= MINUTE {
                    calls.pop_front();
                } else {
                    break;
                }
            }

            let in_last_second = calls
                .iter()
                .rev()
                .take_while(|t| now.duration_since(**t) < SECOND)
                .count();
            if in_last_second >= self.per_second {
                tracing::debug!(in_last_second, "notification burst limit reached, waiting 1s");
                tokio::time::sleep(SECOND).await;
                continue;
            }

            if calls.len() >= self.per_minute
                && let Some(oldest) = calls.front()
            {
                let wait = MINUTE.saturating_sub(now.duration_since(*oldest)) + MINUTE_MARGIN;
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    "notification minute limit reached"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            calls.push_back(now);
            return;
        }
    }

    /// Number of calls recorded in the last minute
    pub async fn recent_calls(&self) -> usize {
        let calls = self.calls.lock().await;
        let now = Instant::now();
        calls
            .iter()
            .filter(|t| now.duration_since(**t) < MINUTE)
            .count()
    }
}
