//! Desktop notifications.
//!
//! This module provides:
//!
//! - The `Notifier` seam with a `notify-send` backend and a mock
//! - Completion notification content
//! - The notifier worker, which turns `Notification` events into desktop
//!   notifications until `StopPrinter`

mod content;
pub mod error;

use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

pub use self::content::{completion_content, NotificationContent, RunSummary, COMPLETION_BODY};
pub use self::error::NotificationError;

use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::types::{EventKind, SubscriberId};

/// Command used to deliver notifications.
const NOTIFY_SEND: &str = "notify-send";

/// Application name passed to the notification daemon.
const APP_NAME: &str = "tomato";

/// Display time requested from the daemon, in milliseconds.
const EXPIRE_MS: &str = "60";

/// Maximum time to wait for the notification command.
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Kinds the notifier worker consumes.
const SUBSCRIBED_KINDS: [EventKind; 2] = [EventKind::Notification, EventKind::StopPrinter];

/// Delivers one desktop notification. Called from a blocking thread.
pub trait Notifier: Send + Sync {
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError>;
}

// ============================================================================
// NotifySend
// ============================================================================

/// Notifier backed by the `notify-send` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySend;

impl Notifier for NotifySend {
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        let output = Command::new(NOTIFY_SEND)
            .args(["-a", APP_NAME, "-t", EXPIRE_MS])
            .arg(&content.summary)
            .arg(&content.body)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    NotificationError::CommandNotFound(NOTIFY_SEND.to_string())
                }
                _ => NotificationError::SendFailed(e.to_string()),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotificationError::SendFailed(stderr.trim().to_string()))
        }
    }
}

// ============================================================================
// MockNotifier
// ============================================================================

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<NotificationContent>>,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<NotificationContent> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(content.clone());
        }
        Ok(())
    }
}

// ============================================================================
// NotificationWorker
// ============================================================================

/// Worker delivering `Notification` events until `StopPrinter`.
pub struct NotificationWorker {
    broker: BrokerHandle,
    notifier: Arc<dyn Notifier>,
    subscription: Subscription,
}

impl NotificationWorker {
    pub fn new(broker: BrokerHandle, notifier: Arc<dyn Notifier>) -> Result<Self, BrokerError> {
        let subscription = broker.subscribe(SubscriberId::new(), &SUBSCRIBED_KINDS)?;
        Ok(Self {
            broker,
            notifier,
            subscription,
        })
    }

    pub async fn run(mut self) -> Result<(), NotificationError> {
        while let Some(message) = self.subscription.recv().await {
            match message.kind {
                EventKind::Notification => {
                    match NotificationContent::from_payload(message.payload().unwrap_or_default()) {
                        Ok(content) => self.deliver(content).await,
                        Err(e) => warn!(error = %e, "ignoring notification request"),
                    }
                }
                EventKind::StopPrinter => break,
                other => return Err(NotificationError::UnexpectedEvent(other)),
            }
        }

        self.broker
            .unsubscribe(self.subscription.subscriber(), &SUBSCRIBED_KINDS)?;
        debug!("notifier stopped");
        Ok(())
    }

    async fn deliver(&self, content: NotificationContent) {
        let notifier = Arc::clone(&self.notifier);
        let summary = content.summary.clone();
        let task = tokio::task::spawn_blocking(move || notifier.notify(&content));

        match timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS), task).await {
            Ok(Ok(Ok(()))) => info!(summary = %summary, "notification sent"),
            Ok(Ok(Err(e))) => warn!(error = %e, suggestion = e.suggestion(), "notification failed"),
            Ok(Err(e)) => warn!(error = %e, "notification task failed"),
            Err(_) => warn!(
                error = %NotificationError::Timeout(DEFAULT_TIMEOUT_SECONDS),
                "notification failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::EventBroker;

    #[tokio::test]
    async fn test_worker_delivers_until_stop_printer() {
        let (_task, broker) = EventBroker::spawn();
        let notifier = Arc::new(MockNotifier::new());
        let worker = NotificationWorker::new(broker.clone(), notifier.clone()).unwrap();

        let content = completion_content(RunSummary::Timer { minutes: 25 }, Some("work"));
        broker
            .emit_with(EventKind::Notification, content.to_payload())
            .unwrap();
        broker.emit_with(EventKind::Notification, "").unwrap();
        broker.emit(EventKind::StopPrinter).unwrap();

        worker.run().await.unwrap();
        assert_eq!(notifier.sent(), vec![content]);
    }

    #[tokio::test]
    async fn test_worker_picks_up_replayed_requests() {
        let (_task, broker) = EventBroker::spawn();
        broker
            .emit_with(EventKind::Notification, "Early\nbody")
            .unwrap();
        broker.emit(EventKind::StopPrinter).unwrap();

        let notifier = Arc::new(MockNotifier::new());
        NotificationWorker::new(broker, notifier.clone())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].summary, "Early");
    }
}
