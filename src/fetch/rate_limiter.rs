//! Process-wide request admission control.
//!
//! One limiter is shared by every concurrent fetch task; it is the
//! single point of cross-task coordination. Admission is bounded to a
//! configured number of requests per rolling window. Callers suspend
//! cooperatively until a slot frees up, so the scheduler can run other
//! tasks during the wait.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Rolling-window rate limiter.
///
/// Tracks the admission time of recent requests; no trailing window of
/// the configured length ever contains more than `limit` admissions.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    recent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Limiter with a rolling 60-second window.
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, DEFAULT_WINDOW)
    }

    /// Suspend until a request slot is available, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut recent = self.recent.lock().await;
                let now = Instant::now();
                while let Some(&front) = recent.front() {
                    if now.duration_since(front) >= self.window {
                        recent.pop_front();
                    } else {
                        break;
                    }
                }
                if recent.len() < self.limit {
                    recent.push_back(now);
                    return;
                }
                // Oldest admission decides when the window next rolls over.
                match recent.front() {
                    Some(&front) => self.window.saturating_sub(now.duration_since(front)),
                    None => Duration::ZERO,
                }
            };
            debug!("rate limiter saturated, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Admissions currently counted in the window. Diagnostic only.
    pub async fn current_load(&self) -> usize {
        let mut recent = self.recent.lock().await;
        let now = Instant::now();
        while let Some(&front) = recent.front() {
            if now.duration_since(front) >= self.window {
                recent.pop_front();
            } else {
                break;
            }
        }
        recent.len()
    }
}
