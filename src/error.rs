//! Error types for dispatch operations.
//!
//! The queue is fire-and-forget: send failures never propagate to the
//! enqueuing caller. The only error type crossing the API boundary is
//! [`SendError`], produced by caller-supplied [`Mailer`](crate::Mailer)
//! implementations and consumed by the drain loop's retry handling.

use thiserror::Error;

/// Opaque failure raised by a [`Mailer`](crate::Mailer).
///
/// The queue never inspects the cause; it only decides retry-or-drop and
/// records the display form in logs and dead-letter records.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(Box<dyn std::error::Error + Send + Sync>);

impl SendError {
    /// Wrap any error as a send failure.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(error.into())
    }

    /// Create a send failure from a plain message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }
}

impl From<String> for SendError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for SendError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<std::io::Error> for SendError {
    fn from(error: std::io::Error) -> Self {
        Self::new(error)
    }
}
