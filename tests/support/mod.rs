//! Test mailers and sinks for exercising the dispatch queue.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use skippy_dispatch::{DeadLetterSink, EmailPayload, FailedEmail, Mailer, SendError};
use tokio::time::{Duration, Instant};

/// Records the category and (virtual) timestamp of every send, succeeding
/// each one.
#[derive(Default)]
pub struct RecordingMailer {
    pub sends: Mutex<Vec<(String, Instant)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, payload: &EmailPayload) -> Result<(), SendError> {
        self.sends
            .lock()
            .push((payload.email_type.clone(), Instant::now()));
        Ok(())
    }
}

impl RecordingMailer {
    pub fn sent_types(&self) -> Vec<String> {
        self.sends.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn sent_times(&self) -> Vec<Instant> {
        self.sends.lock().iter().map(|(_, at)| *at).collect()
    }
}

/// Fails every send, recording attempt timestamps.
#[derive(Default)]
pub struct FailingMailer {
    pub calls: AtomicU32,
    pub attempts: Mutex<Vec<Instant>>,
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _payload: &EmailPayload) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(Instant::now());
        Err(SendError::msg("smtp unavailable"))
    }
}

impl FailingMailer {
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Fails the first `failures` sends, then succeeds, recording every
/// attempt's timestamp.
pub struct FlakyMailer {
    failures: u32,
    calls: AtomicU32,
    pub attempts: Mutex<Vec<Instant>>,
}

impl FlakyMailer {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailer for FlakyMailer {
    async fn send(&self, _payload: &EmailPayload) -> Result<(), SendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(Instant::now());
        if call < self.failures {
            Err(SendError::msg("smtp unavailable"))
        } else {
            Ok(())
        }
    }
}

/// Succeeds after holding the send open for a fixed duration.
pub struct SlowMailer {
    pub delay: Duration,
    pub completed: AtomicU32,
}

impl SlowMailer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            completed: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Mailer for SlowMailer {
    async fn send(&self, _payload: &EmailPayload) -> Result<(), SendError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Detects overlapping sends: counts a violation whenever a send starts
/// while another is still in flight.
pub struct OverlapDetectingMailer {
    in_flight: AtomicBool,
    pub violations: AtomicU32,
    pub completed: AtomicU32,
    hold: Duration,
}

impl OverlapDetectingMailer {
    pub fn new(hold: Duration) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            violations: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            hold,
        }
    }
}

#[async_trait]
impl Mailer for OverlapDetectingMailer {
    async fn send(&self, _payload: &EmailPayload) -> Result<(), SendError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(self.hold).await;
        self.in_flight.store(false, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects every dead-lettered item.
#[derive(Default)]
pub struct CollectingSink {
    pub failed: Mutex<Vec<FailedEmail>>,
}

#[async_trait]
impl DeadLetterSink for CollectingSink {
    async fn dead_letter(&self, failed: FailedEmail) {
        self.failed.lock().push(failed);
    }
}
