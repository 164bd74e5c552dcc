//! Sliding-window accounting for the global send rate limit.
//!
//! The window is rolled forward lazily: only a gate check resets it, never a
//! timer. The gate is cooperative: the sequential drain loop is the only
//! sender, which is what keeps `sent_in_window <= max_emails` true without
//! cross-task coordination.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::{RateLimitConfig, RateLimitUpdate};
use crate::types::RateLimitStatus;

/// Outcome of a rate-gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    Allowed,
    /// Budget exhausted; `wait` is the time until the window is guaranteed
    /// to have reset.
    Exhausted { wait: Duration },
}

#[derive(Debug)]
pub(crate) struct RateWindow {
    max_emails: u32,
    window: Duration,
    sent_in_window: u32,
    window_start: Instant,
}

impl RateWindow {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_emails: config.max_emails,
            window: Duration::from_millis(config.window_ms),
            sent_in_window: 0,
            window_start: Instant::now(),
        }
    }

    /// Roll the window forward if it has expired.
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= self.window {
            self.sent_in_window = 0;
            self.window_start = now;
        }
    }

    /// Check whether another send fits in the current window's budget.
    ///
    /// Rolls the window first, so a check after an idle window always starts
    /// a fresh one. Does not consume budget; call [`Self::record_sent`] after
    /// a successful send.
    pub fn check(&mut self, now: Instant) -> Gate {
        self.roll(now);

        if self.sent_in_window < self.max_emails {
            Gate::Allowed
        } else {
            let wait = self.window - now.duration_since(self.window_start);
            Gate::Exhausted { wait }
        }
    }

    /// Count one successful send against the current window.
    pub fn record_sent(&mut self) {
        self.sent_in_window += 1;
    }

    /// Merge a partial limit update. Counter and window start are kept; the
    /// new limits apply from the next gate check.
    pub fn apply(&mut self, update: &RateLimitUpdate) {
        if let Some(max_emails) = update.max_emails {
            self.max_emails = max_emails;
        }
        if let Some(window_ms) = update.window_ms {
            self.window = Duration::from_millis(window_ms);
        }
    }

    /// Milliseconds until the current window resets; negative when a reset
    /// is overdue but hasn't been lazily applied yet.
    pub fn time_until_reset_ms(&self, now: Instant) -> i64 {
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let elapsed_ms =
            i64::try_from(now.duration_since(self.window_start).as_millis()).unwrap_or(i64::MAX);
        window_ms.saturating_sub(elapsed_ms)
    }

    pub fn snapshot(&self, now: Instant) -> RateLimitStatus {
        RateLimitStatus {
            sent_in_window: self.sent_in_window,
            max_emails: self.max_emails,
            window_age: now.duration_since(self.window_start),
            time_until_reset_ms: self.time_until_reset_ms(now),
        }
    }
}
