//! Core types for queued email work.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::mailer::Mailer;

/// Queue placement for an item.
///
/// `High` inserts at the front of the pending list; `Normal` at the back.
/// Priority affects queue position only, never preemption of in-flight work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// The email to send, as described by the caller.
///
/// The queue treats `data` as opaque; `email_type`, `user_id` and `trigger`
/// are read only for the structured decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Category of email, e.g. `"new_message"` or `"meeting_scheduled"`.
    pub email_type: String,

    /// The user this email concerns, if any.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Name of the application event that triggered the send.
    #[serde(default)]
    pub trigger: Option<String>,

    /// Whatever else the mailer needs (recipient address, template
    /// variables, ...). Never inspected by the queue.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EmailPayload {
    /// Create a payload with only a category set.
    #[must_use]
    pub fn new(email_type: impl Into<String>) -> Self {
        Self {
            email_type: email_type.into(),
            user_id: None,
            trigger: None,
            data: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Options accepted at enqueue time.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Queue placement. Default: [`Priority::Normal`].
    pub priority: Priority,

    /// Per-item retry ceiling. `None` uses the queue's configured default.
    pub max_retries: Option<u32>,
}

impl EnqueueOptions {
    /// Options for a high-priority item with default retries.
    #[must_use]
    pub fn high_priority() -> Self {
        Self {
            priority: Priority::High,
            ..Self::default()
        }
    }
}

/// One pending email-send request with its own sender and retry state.
///
/// Invariant: `retry_count <= max_retries` while the item is queued; the
/// attempt that would exceed the ceiling drops the item permanently instead.
pub(crate) struct QueueItem {
    pub id: Ulid,
    pub payload: EmailPayload,
    /// Each item owns its sender, so heterogeneous mailers mix in one queue.
    pub mailer: Arc<dyn Mailer>,
    pub priority: Priority,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueItem")
            .field("id", &self.id)
            .field("email_type", &self.payload.email_type)
            .field("priority", &self.priority)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Terminal-failure record handed to a
/// [`DeadLetterSink`](crate::DeadLetterSink) once an item exhausts its
/// retries.
#[derive(Debug, Clone)]
pub struct FailedEmail {
    /// The submission id returned by `enqueue`.
    pub id: Ulid,
    pub payload: EmailPayload,
    /// Total send attempts made (initial + retries).
    pub attempts: u32,
    /// Display form of the last send error.
    pub last_error: String,
}

/// Point-in-time queue snapshot for monitoring.
#[derive(Debug, Clone)]
pub struct QueueStatus {
    /// Items currently in the pending list. Items waiting out a retry
    /// backoff are not counted until they re-enter the list.
    pub queue_length: usize,
    /// Whether a drain loop is currently running.
    pub processing: bool,
    pub rate_limit: RateLimitStatus,
}

/// Rate-window portion of a [`QueueStatus`] snapshot.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub sent_in_window: u32,
    pub max_emails: u32,
    /// Time elapsed since the current window opened.
    pub window_age: Duration,
    /// Milliseconds until the window resets. Negative when a lazy reset is
    /// overdue but no gate check has applied it yet.
    pub time_until_reset_ms: i64,
}
