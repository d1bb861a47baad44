// Notification sink. A real host pops desktop toasts; this one records
// them so the session and tests can observe what was sent.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct Notifications {
    sent: Mutex<Vec<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, title: impl Into<String>, message: impl Into<String>) {
        let notification = Notification {
            title: title.into(),
            message: message.into(),
        };
        tracing::info!("🔔 {}: {}", notification.title, notification.message);
        self.sent
            .lock()
            .expect("notification log poisoned")
            .push(notification);
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .expect("notification log poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_are_recorded_in_order() {
        let notifications = Notifications::new();
        notifications.notify("first", "a");
        notifications.notify("second", "b");

        let sent = notifications.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].title, "first");
        assert_eq!(sent[1].message, "b");
    }
}
