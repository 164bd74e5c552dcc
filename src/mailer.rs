//! Collaborator contracts supplied by the caller.

use async_trait::async_trait;

use crate::{error::SendError, types::FailedEmail};

/// Performs the actual send for one queued item.
///
/// Each enqueued item carries its own `Arc<dyn Mailer>`, so different email
/// categories can use different transports within one queue. The queue
/// imposes no shape beyond "resolve on success, error on failure": any `Err`
/// triggers retry-or-drop handling, and never reaches the enqueuing caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the email described by `payload`.
    ///
    /// # Errors
    /// Returns a [`SendError`] if the send failed; the queue retries with
    /// exponential backoff up to the item's retry ceiling.
    async fn send(&self, payload: &crate::EmailPayload) -> Result<(), SendError>;
}

/// Optional terminal-failure sink.
///
/// When configured on the queue, receives one [`FailedEmail`] for each item
/// dropped after exhausting its retries. Without a sink, terminal failures
/// are visible only in the logs.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn dead_letter(&self, failed: FailedEmail);
}
