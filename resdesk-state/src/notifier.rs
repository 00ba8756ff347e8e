use tokio::sync::broadcast;

use resdesk_shared::Notification;

/// User-facing, fire-and-forget notifications
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes notifications to the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = "success", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::warn!(notification = "error", "{}", message);
    }
}

/// Fans notifications out to any number of subscribers.
///
/// Messages sent while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    fn publish(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::trace!("No notification subscribers");
        }
    }
}

impl Notifier for BroadcastNotifier {
    fn success(&self, message: &str) {
        self.publish(Notification::success(message));
    }

    fn error(&self, message: &str) {
        self.publish(Notification::error(message));
    }
}
