//! The email dispatch queue engine.
//!
//! A single sequential drain loop dispatches pending items one at a time,
//! pausing for the configured inter-dispatch delay, suspending when the rate
//! window's budget is spent, and rescheduling failed items with exponential
//! backoff. At most one drain loop runs per queue instance; a single atomic
//! flag is the entire concurrency-control mechanism.

pub(crate) mod backoff;
pub(crate) mod window;

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::{
    config::{DispatchConfig, RateLimitUpdate},
    error::SendError,
    mailer::{DeadLetterSink, Mailer},
    types::{EmailPayload, EnqueueOptions, FailedEmail, Priority, QueueItem, QueueStatus},
};

use window::{Gate, RateWindow};

/// Priority-aware, rate-limited retry queue for outbound transactional
/// email.
///
/// Cheaply cloneable handle; clones share the same pending list, rate
/// window, and drain loop. Intended usage is one instance per process, owned
/// by the composition root and handed out by clone.
///
/// The queue is fire-and-forget: [`enqueue`](Self::enqueue) returns a
/// submission id immediately and send failures are retried or dropped
/// internally, never surfaced to the caller. All state is in memory; a
/// process restart loses queued and in-flight items.
#[derive(Clone)]
pub struct DispatchQueue {
    shared: Arc<Shared>,
}

struct Shared {
    pending: Mutex<VecDeque<QueueItem>>,
    window: Mutex<RateWindow>,
    /// Set before a drain task is spawned, cleared when it exits. Must be
    /// flipped synchronously, before any suspension point, so concurrent
    /// enqueues never start a second loop.
    processing: AtomicBool,
    dispatch_interval: Duration,
    base_retry_delay: Duration,
    max_retry_delay: Duration,
    default_max_retries: u32,
    debug_log: bool,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
}

impl DispatchQueue {
    /// Create a queue with the given configuration and no dead-letter sink.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a queue that hands permanently failed items to `sink`.
    #[must_use]
    pub fn with_dead_letter_sink(config: DispatchConfig, sink: Arc<dyn DeadLetterSink>) -> Self {
        Self::build(config, Some(sink))
    }

    fn build(config: DispatchConfig, dead_letter: Option<Arc<dyn DeadLetterSink>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(VecDeque::new()),
                window: Mutex::new(RateWindow::new(&config.rate_limit)),
                processing: AtomicBool::new(false),
                dispatch_interval: Duration::from_millis(config.dispatch_interval_ms),
                base_retry_delay: Duration::from_millis(config.base_retry_delay_ms),
                max_retry_delay: Duration::from_millis(config.max_retry_delay_ms),
                default_max_retries: config.default_max_retries,
                debug_log: config.debug_log,
                dead_letter,
            }),
        }
    }

    /// Queue an email for sending and return its submission id.
    ///
    /// High-priority items enter at the front of the pending list, normal
    /// ones at the back. Starts the drain loop if one isn't already running
    /// and returns immediately; the id confirms submission, not delivery.
    /// Send failures are handled internally and never reach the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(
        &self,
        payload: EmailPayload,
        mailer: Arc<dyn Mailer>,
        options: EnqueueOptions,
    ) -> Ulid {
        let item = QueueItem {
            id: Ulid::new(),
            payload,
            mailer,
            priority: options.priority,
            retry_count: 0,
            max_retries: options.max_retries.unwrap_or(self.shared.default_max_retries),
            created_at: Utc::now(),
        };
        let id = item.id;

        debug!(
            message_id = %id,
            email_type = %item.payload.email_type,
            priority = ?item.priority,
            "email queued"
        );

        {
            let mut pending = self.shared.pending.lock();
            match item.priority {
                Priority::High => pending.push_front(item),
                Priority::Normal => pending.push_back(item),
            }
        }

        Shared::ensure_draining(&self.shared);
        id
    }

    /// Point-in-time snapshot for monitoring.
    ///
    /// Reads the rate window without rolling it, so
    /// [`time_until_reset_ms`](crate::RateLimitStatus::time_until_reset_ms)
    /// can be negative when a lazy reset is overdue.
    #[must_use]
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            queue_length: self.shared.pending.lock().len(),
            processing: self.shared.processing.load(Ordering::SeqCst),
            rate_limit: self.shared.window.lock().snapshot(Instant::now()),
        }
    }

    /// Discard all pending items and clear the processing flag.
    ///
    /// Guarantees only that no further items will be started: an in-flight
    /// send runs to completion, and retries already waiting out their
    /// backoff will still re-enter the queue. Items enqueued afterwards
    /// start a fresh drain.
    pub fn clear_queue(&self) {
        let dropped = {
            let mut pending = self.shared.pending.lock();
            let dropped = pending.len();
            pending.clear();
            dropped
        };
        self.shared.processing.store(false, Ordering::SeqCst);
        debug!(dropped, "queue cleared");
    }

    /// Merge a partial rate-limit update, effective at the next gate check.
    pub fn update_rate_limit(&self, update: RateLimitUpdate) {
        debug!(
            max_emails = ?update.max_emails,
            window_ms = ?update.window_ms,
            "rate limit updated"
        );
        self.shared.window.lock().apply(&update);
    }
}

impl Shared {
    /// Start a drain task unless one is already running.
    fn ensure_draining(shared: &Arc<Self>) {
        if shared
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let shared = Arc::clone(shared);
            tokio::spawn(async move {
                Self::drain(shared).await;
            });
        }
    }

    /// Dispatch pending items until the queue is empty.
    async fn drain(shared: Arc<Self>) {
        loop {
            if shared.pending.lock().is_empty() {
                break;
            }

            let gate = shared.window.lock().check(Instant::now());
            if let Gate::Exhausted { wait } = gate {
                debug!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "rate limit reached, suspending dispatch"
                );
                sleep(wait).await;
                // Re-check from the top: items and limits may have changed
                continue;
            }

            // clear_queue can race the emptiness check above
            let Some(mut item) = shared.pending.lock().pop_front() else {
                break;
            };

            match item.mailer.send(&item.payload).await {
                Ok(()) => {
                    shared.window.lock().record_sent();
                    debug!(message_id = %item.id, email_type = %item.payload.email_type, "email sent");
                    shared.log_decision(&item, "sent", "delivered");
                }
                Err(error) => {
                    item.retry_count += 1;
                    Self::handle_failure(&shared, item, &error);
                }
            }

            sleep(shared.dispatch_interval).await;
        }

        shared.processing.store(false, Ordering::SeqCst);

        // An item enqueued between the final emptiness check and the flag
        // clear saw the flag still set and did not spawn a loop
        if !shared.pending.lock().is_empty() {
            Self::ensure_draining(&shared);
        }
    }

    /// Schedule a retry for a failed item, or drop it once retries are
    /// exhausted. `item.retry_count` has already been incremented for this
    /// failure.
    fn handle_failure(shared: &Arc<Self>, item: QueueItem, error: &SendError) {
        if item.retry_count <= item.max_retries {
            let delay = backoff::retry_delay(
                item.retry_count,
                shared.base_retry_delay,
                shared.max_retry_delay,
            );
            debug!(
                message_id = %item.id,
                attempt = item.retry_count,
                max_retries = item.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "send failed, retry scheduled"
            );

            let shared = Arc::clone(shared);
            tokio::spawn(async move {
                sleep(delay).await;
                // Retries re-enter at the back regardless of priority
                shared.pending.lock().push_back(item);
                Self::ensure_draining(&shared);
            });
        } else {
            warn!(
                message_id = %item.id,
                email_type = %item.payload.email_type,
                attempts = item.retry_count,
                error = %error,
                "retries exhausted, dropping email"
            );
            shared.log_decision(&item, "failed", &format!("retries exhausted: {error}"));

            if let Some(sink) = &shared.dead_letter {
                let failed = FailedEmail {
                    id: item.id,
                    payload: item.payload,
                    attempts: item.retry_count,
                    last_error: error.to_string(),
                };
                let sink = Arc::clone(sink);
                tokio::spawn(async move {
                    sink.dead_letter(failed).await;
                });
            }
        }
    }

    /// Structured decision record for a terminal outcome, gated by the
    /// debug flag.
    fn log_decision(&self, item: &QueueItem, decision: &str, reason: &str) {
        if !self.debug_log {
            return;
        }
        debug!(
            email_type = %item.payload.email_type,
            user_id = item.payload.user_id.as_deref().unwrap_or("-"),
            trigger = item.payload.trigger.as_deref().unwrap_or("-"),
            timestamp = %Utc::now().to_rfc3339(),
            decision = decision,
            reason = reason,
            message_id = %item.id,
            "email dispatch decision"
        );
    }
}
