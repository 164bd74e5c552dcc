//! Retry delay schedule with exponential backoff.

use std::time::Duration;

/// Calculate the delay before the Nth retry.
///
/// # Formula
/// `delay = min(base * 2^(attempt - 1), max)`
///
/// `attempt` is the 1-indexed retry number, so the schedule with the stock
/// configuration is 1s, 2s, 4s, ... capped at 30s. Uses saturating
/// operations so absurd attempt numbers cannot overflow.
pub(crate) fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1);
    if exponent >= 63 {
        // 2^63 would overflow the millisecond arithmetic
        return max;
    }

    let multiplier = 1u64 << exponent;
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(multiplier).min(max_ms))
}
