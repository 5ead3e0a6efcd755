//! Notification system error types.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::types::EventKind;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The notification command is not installed.
    #[error("notification command not found: {0}")]
    CommandNotFound(String),

    /// Failed to send a notification.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// The notification command did not finish in time.
    #[error("notification command timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid input provided to the notification system.
    #[error("invalid notification: {0}")]
    InvalidInput(String),

    /// The worker lost the broker.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A kind arrived that the worker has no case for.
    #[error("notifier received unexpected event: {0}")]
    UnexpectedEvent(EventKind),
}

impl NotificationError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::CommandNotFound(_) => "install libnotify (notify-send) for desktop notifications",
            Self::SendFailed(_) | Self::Timeout(_) => "check that a notification daemon is running",
            Self::InvalidInput(_) => "notifications need a non-empty summary",
            Self::Broker(_) | Self::UnexpectedEvent(_) => "restart tomato",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotificationError::CommandNotFound("notify-send".to_string());
        assert_eq!(err.to_string(), "notification command not found: notify-send");

        let err = NotificationError::Timeout(5);
        assert!(err.to_string().contains("5 seconds"));
    }

    #[test]
    fn test_suggestion() {
        assert!(NotificationError::CommandNotFound("x".into())
            .suggestion()
            .contains("notify-send"));
        assert!(NotificationError::Timeout(1)
            .suggestion()
            .contains("daemon"));
    }
}
