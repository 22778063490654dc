//! Sliding-window rate limiter.
//!
//! Enforces two constraints against the remote dependency: at most
//! `max_calls` within any rolling `window`, and consecutive calls spaced by
//! at least `window / max_calls` (5 calls per 60s also means 12s apart).
//!
//! Waits happen in short slices so cancellation is observed promptly, and
//! admissibility is re-checked after every slice — another run sharing the
//! limiter may have consumed or freed capacity in the meantime.
//!
//! Built on [`tokio::time::Instant`] so paused-clock tests are deterministic.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Margin added to every computed wait, covering clock skew between the
/// wait computation and the re-check.
const SAFETY_MARGIN: Duration = Duration::from_millis(500);

/// Longest single sleep slice while waiting for a slot.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Error from [`RateLimiter::acquire`].
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The cancellation token fired while waiting for a slot.
    #[error("rate-limit wait cancelled")]
    Cancelled,
}

/// Sliding-window rate limiter, shared across concurrent pipeline runs via
/// `Arc`. The timestamp window is the only mutable state and sits behind a
/// mutex; the lock is never held across an await.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    min_interval: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_calls` per `window`.
    #[must_use]
    pub fn new(max_calls: usize, window: Duration) -> Self {
        let min_interval = if max_calls > 0 {
            window / u32::try_from(max_calls).unwrap_or(u32::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            max_calls,
            window,
            min_interval,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a call slot is available, then reserve it.
    ///
    /// Returns the total wait incurred (zero when a slot was free). Waits
    /// sleep in slices of at most 100ms, each raced against `cancel`;
    /// cancellation returns [`AcquireError::Cancelled`] without recording
    /// a timestamp.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Duration, AcquireError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }

            let required = {
                let mut calls = self.calls.lock();
                let now = Instant::now();
                Self::evict(&mut calls, now, self.window);

                match self.required_wait(&calls, now) {
                    None => {
                        calls.push_back(now);
                        let waited = started.elapsed();
                        if !waited.is_zero() {
                            debug!(waited_ms = waited.as_millis(), "rate-limit slot acquired after wait");
                        }
                        return Ok(waited);
                    }
                    Some(wait) => wait,
                }
            };

            let slice = required.min(WAIT_SLICE);
            tokio::select! {
                () = tokio::time::sleep(slice) => {}
                () = cancel.cancelled() => return Err(AcquireError::Cancelled),
            }
        }
    }

    /// How many calls could be issued right now without waiting.
    ///
    /// Observational only: counts against the current time without evicting
    /// or otherwise mutating the window.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        let calls = self.calls.lock();
        let now = Instant::now();
        let in_window = calls
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count();
        self.max_calls.saturating_sub(in_window)
    }

    /// Clear all recorded timestamps.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    /// Wait needed before a call can be admitted, or `None` if admissible
    /// now. Takes the larger of the window and spacing constraints, plus
    /// the safety margin.
    fn required_wait(&self, calls: &VecDeque<Instant>, now: Instant) -> Option<Duration> {
        let mut wait = Duration::ZERO;

        if calls.len() >= self.max_calls {
            if let Some(&oldest) = calls.front() {
                let elapsed = now.duration_since(oldest);
                wait = wait.max(self.window.saturating_sub(elapsed) + SAFETY_MARGIN);
            }
        }

        if let Some(&last) = calls.back() {
            let since_last = now.duration_since(last);
            if since_last < self.min_interval {
                wait = wait.max(self.min_interval - since_last + SAFETY_MARGIN);
            }
        }

        (!wait.is_zero()).then_some(wait)
    }

    fn evict(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&front) = calls.front() {
            if now.duration_since(front) >= window {
                let _ = calls.pop_front();
            } else {
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
