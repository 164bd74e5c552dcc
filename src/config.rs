//! Dispatch queue configuration.
//!
//! All fields carry serde defaults so a partial configuration file (or an
//! empty one) deserializes to the stock behavior.

use serde::{Deserialize, Serialize};

/// Configuration for a [`DispatchQueue`](crate::DispatchQueue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Fixed pause between dispatches, in milliseconds, regardless of
    /// outcome. Keeps the downstream mailer from seeing bursts.
    ///
    /// Default: 100ms
    #[serde(default = "defaults::dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Base delay for exponential backoff (in milliseconds).
    ///
    /// The delay before the Nth retry is `base * 2^(N-1)`, capped at
    /// `max_retry_delay_ms`.
    ///
    /// Default: 1000ms (1 second)
    #[serde(default = "defaults::base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Maximum retry delay (in milliseconds).
    ///
    /// Default: 30000ms (30 seconds)
    #[serde(default = "defaults::max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Retry ceiling applied to items whose enqueue options don't set one.
    /// Total attempts for an item are `max_retries + 1`.
    ///
    /// Default: 3
    #[serde(default = "defaults::default_max_retries")]
    pub default_max_retries: u32,

    /// Global sending rate limit.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Emit a structured decision record for every terminal outcome
    /// (delivered or permanently dropped).
    ///
    /// Default: taken from the `EMAIL_QUEUE_DEBUG` environment variable
    /// (`1` or `true` enables it).
    #[serde(default = "defaults::debug_log")]
    pub debug_log: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatch_interval_ms: defaults::dispatch_interval_ms(),
            base_retry_delay_ms: defaults::base_retry_delay_ms(),
            max_retry_delay_ms: defaults::max_retry_delay_ms(),
            default_max_retries: defaults::default_max_retries(),
            rate_limit: RateLimitConfig::default(),
            debug_log: defaults::debug_log(),
        }
    }
}

/// Sliding-window cap on total sends per unit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum sends per window.
    ///
    /// Default: 100
    #[serde(default = "defaults::max_emails")]
    pub max_emails: u32,

    /// Window duration in milliseconds.
    ///
    /// Default: 3,600,000ms (1 hour)
    #[serde(default = "defaults::window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_emails: defaults::max_emails(),
            window_ms: defaults::window_ms(),
        }
    }
}

/// Partial overlay merged into the rate limit at runtime via
/// [`DispatchQueue::update_rate_limit`](crate::DispatchQueue::update_rate_limit).
///
/// Unset fields leave the current value untouched. Takes effect at the next
/// gate check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitUpdate {
    pub max_emails: Option<u32>,
    pub window_ms: Option<u64>,
}

mod defaults {
    pub const fn dispatch_interval_ms() -> u64 {
        100
    }

    pub const fn base_retry_delay_ms() -> u64 {
        1000 // 1 second
    }

    pub const fn max_retry_delay_ms() -> u64 {
        30000 // 30 seconds
    }

    pub const fn default_max_retries() -> u32 {
        3
    }

    pub const fn max_emails() -> u32 {
        100
    }

    pub const fn window_ms() -> u64 {
        3_600_000 // 1 hour
    }

    pub fn debug_log() -> bool {
        matches!(
            std::env::var("EMAIL_QUEUE_DEBUG").ok().as_deref(),
            Some("1" | "true")
        )
    }
}
