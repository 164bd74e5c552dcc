//! Outbound email dispatch queue for the ShareSkippy marketplace.
//!
//! This crate provides the delivery engine behind ShareSkippy's
//! transactional email: an in-process, priority-aware queue that
//! - serializes sends through a single drain loop,
//! - enforces a global sliding-window rate limit,
//! - retries transient failures with capped exponential backoff,
//! - and hands permanently failed items to an optional dead-letter sink.
//!
//! The actual transport is supplied by the caller: every enqueued item
//! carries its own [`Mailer`], so heterogeneous senders mix in one queue.
//! Enqueuing is fire-and-forget: the returned id confirms submission, not
//! delivery, and send failures are never surfaced to the caller.

mod config;
mod error;
mod mailer;
mod queue;
mod types;

pub use config::{DispatchConfig, RateLimitConfig, RateLimitUpdate};
pub use error::SendError;
pub use mailer::{DeadLetterSink, Mailer};
pub use queue::DispatchQueue;
pub use types::{
    EmailPayload, EnqueueOptions, FailedEmail, Priority, QueueStatus, RateLimitStatus,
};
