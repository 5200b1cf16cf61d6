use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
    Mutex,
};

use crate::{
    notifications::{Notification, NotificationKind},
    traits::{NotificationError, NotificationSender},
};

/// A [`NotificationSender`] that keeps every delivered notification in memory. It can be switched into a failing
/// mode to exercise the dead-letter path.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.sent.lock().unwrap().iter().filter(|n| n.kind == kind).count()
    }
}

impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::DeliveryFailed("The mail server is down".into()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
