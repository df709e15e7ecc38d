//! Combined concurrency + sliding-window rate limiter.
//!
//! A permit is granted only when both constraints hold: fewer than
//! `max_threads` permits are outstanding, and fewer than
//! `max_requests_per_minute` requests started within the trailing minute.
//! The window retains start timestamps after release, so bursts are bounded
//! no matter how fast permits are returned.
//!
//! Time uses `tokio::time::Instant`, so tests drive it with the paused
//! clock.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ScrapeError;

/// The sliding window length.
const WINDOW: Duration = Duration::from_secs(60);

/// An acquired permit. Dropping it releases the concurrency slot; the
/// request-start timestamp stays in the window until it ages out.
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

/// Point-in-time limiter statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub in_flight: usize,
    pub total_requests: u64,
    pub requests_last_minute: usize,
}

/// The limiter itself. Cheap to clone via `Arc`.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_threads: usize,
    max_per_minute: usize,
    window: Mutex<VecDeque<Instant>>,
    total: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_threads: usize, max_requests_per_minute: usize) -> Self {
        let max_threads = max_threads.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_threads)),
            max_threads,
            max_per_minute: max_requests_per_minute.max(1),
            window: Mutex::new(VecDeque::new()),
            total: AtomicU64::new(0),
        }
    }

    /// Block until both constraints admit a new request, or the token is
    /// cancelled.
    ///
    /// Waiters queue on the semaphore in FIFO order; when only the window
    /// is saturated they sleep until the oldest in-window timestamp ages
    /// out, plus a small deterministic jitter to de-synchronize wakers.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, ScrapeError> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| ScrapeError::Cancelled)?
            }
        };

        loop {
            let wait = {
                let mut window = self.window.lock().expect("rate limiter window poisoned");
                let now = Instant::now();
                prune(&mut window, now);

                if window.len() < self.max_per_minute {
                    window.push_back(now);
                    self.total.fetch_add(1, Ordering::Relaxed);
                    None
                } else {
                    // Sleep until the oldest start leaves the window.
                    let oldest = *window.front().expect("window is non-empty");
                    Some((oldest + WINDOW).saturating_duration_since(now))
                }
            };

            match wait {
                None => return Ok(Permit { _permit: permit }),
                Some(delay) => {
                    let jitter =
                        Duration::from_millis(self.total.load(Ordering::Relaxed) % 23 + 1);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
                        _ = tokio::time::sleep(delay + jitter) => {}
                    }
                }
            }
        }
    }

    /// Current counters, sampled under the window lock.
    pub fn stats(&self) -> RateLimiterStats {
        let requests_last_minute = {
            let mut window = self.window.lock().expect("rate limiter window poisoned");
            prune(&mut window, Instant::now());
            window.len()
        };
        RateLimiterStats {
            in_flight: self.max_threads - self.semaphore.available_permits(),
            total_requests: self.total.load(Ordering::Relaxed),
            requests_last_minute,
        }
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}
