use thiserror::Error;

use crate::{db_types::FailedNotification, notifications::Notification};

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Could not deliver the notification. {0}")]
    DeliveryFailed(String),
    #[error("Could not (de)serialize the notification. {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for NotificationError {
    fn from(e: sqlx::Error) -> Self {
        NotificationError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(e: serde_json::Error) -> Self {
        NotificationError::SerializationError(e.to_string())
    }
}

/// Delivers a rendered notification, typically by e-mail.
#[allow(async_fn_in_trait)]
pub trait NotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Dead-letter storage for notifications that could not be delivered.
#[allow(async_fn_in_trait)]
pub trait NotificationOutbox {
    /// Stores an undelivered notification. Returns the id of the stored record.
    async fn record_failed_notification(
        &self,
        notification: &Notification,
        error: &str,
    ) -> Result<i64, NotificationError>;

    /// Fetches the stored notifications that have been attempted fewer than `max_attempts` times, oldest first.
    async fn fetch_failed_notifications(&self, max_attempts: i64) -> Result<Vec<FailedNotification>, NotificationError>;

    /// Removes a notification that has now been delivered.
    async fn remove_failed_notification(&self, id: i64) -> Result<(), NotificationError>;

    /// Records another failed delivery attempt.
    async fn record_failed_attempt(&self, id: i64, error: &str) -> Result<(), NotificationError>;
}
