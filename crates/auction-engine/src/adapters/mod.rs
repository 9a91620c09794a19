//! Adapters: in-memory port implementations and the notify emitter.

pub mod in_memory;
pub mod notifier;

pub use in_memory::{InMemoryAccess, InMemoryLedger, RecordingDelivery};
pub use notifier::{
    NoOpNotificationPort, NotificationPort, PublishError, RecordingNotificationPort, WatchNotifier,
};
