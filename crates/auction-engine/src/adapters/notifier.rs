//! Watch/notify emitter.
//!
//! Translates domain events into per-recipient notifications and hands
//! them to the external notification port. Emission is enqueue-and-forget
//! through an unbounded channel drained by a background task: the bid
//! arbiter never blocks on a notification, and a dropped notification is
//! not a correctness failure.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::UserId;
use crate::events::{AuctionEvent, Notification};
use crate::metrics::Metrics;

/// External notification sink (Driven Port). Fire-and-forget.
pub trait NotificationPort: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), PublishError>;
}

/// Error type for publish operations.
#[derive(Debug, Clone)]
pub enum PublishError {
    /// The sink is not connected.
    NotConnected,
    /// Internal error.
    Internal(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Notification sink not connected"),
            Self::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for PublishError {}

/// Fan-out emitter in front of a [`NotificationPort`].
pub struct WatchNotifier {
    tx: mpsc::UnboundedSender<Notification>,
    metrics: Arc<Metrics>,
}

impl WatchNotifier {
    /// Spawns the drain task and returns the emitter handle.
    pub fn spawn(port: Arc<dyn NotificationPort>, metrics: Arc<Metrics>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        let task_metrics = metrics.clone();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let topic = notification.event.topic();
                let auction_id = notification.event.auction_id();
                if let Err(e) = port.publish(notification) {
                    warn!(topic, %auction_id, error = %e, "notification publish failed");
                    task_metrics.record_notification_dropped();
                }
            }
        });
        Self { tx, metrics }
    }

    /// Enqueues one notification. Never blocks.
    pub fn notify(&self, recipient: UserId, event: AuctionEvent) {
        if self.tx.send(Notification { recipient, event }).is_err() {
            self.metrics.record_notification_dropped();
        } else {
            self.metrics.record_notification_emitted();
        }
    }

    /// Enqueues the same event for every recipient, deduplicated.
    pub fn fan_out(&self, recipients: &[UserId], event: &AuctionEvent) {
        let mut seen = std::collections::HashSet::new();
        for &recipient in recipients {
            if seen.insert(recipient) {
                self.notify(recipient, event.clone());
            }
        }
    }
}

/// No-op sink for running without a notification backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationPort;

impl NotificationPort for NoOpNotificationPort {
    fn publish(&self, _notification: Notification) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct RecordingNotificationPort {
    pub notifications: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingNotificationPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications.lock().unwrap())
    }
}

impl NotificationPort for RecordingNotificationPort {
    fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        self.notifications.lock().unwrap().push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event() -> AuctionEvent {
        AuctionEvent::EndingSoon {
            auction_id: Uuid::new_v4(),
            ends_at: 9_000,
        }
    }

    #[tokio::test]
    async fn test_notify_reaches_the_port() {
        let port = Arc::new(RecordingNotificationPort::new());
        let metrics = Arc::new(Metrics::new());
        let notifier = WatchNotifier::spawn(port.clone(), metrics.clone());

        notifier.notify(7, event());
        tokio::task::yield_now().await;

        // drain task runs on the same runtime; give it a moment
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let notes = port.take();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].recipient, 7);
        assert_eq!(metrics.snapshot().notifications_emitted, 1);
    }

    #[tokio::test]
    async fn test_fan_out_deduplicates_recipients() {
        let port = Arc::new(RecordingNotificationPort::new());
        let metrics = Arc::new(Metrics::new());
        let notifier = WatchNotifier::spawn(port.clone(), metrics);

        notifier.fan_out(&[1, 2, 2, 3, 1], &event());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let mut recipients: Vec<_> = port.take().into_iter().map(|n| n.recipient).collect();
        recipients.sort_unstable();
        assert_eq!(recipients, vec![1, 2, 3]);
    }

    #[test]
    fn test_no_op_port() {
        let port = NoOpNotificationPort;
        assert!(port
            .publish(Notification {
                recipient: 1,
                event: AuctionEvent::Cancelled {
                    auction_id: Uuid::new_v4(),
                    reason: "test".to_string(),
                },
            })
            .is_ok());
    }
}
