use std::sync::Arc;

use log::*;
use market_engine::{
    notifications::Notification,
    traits::{NotificationError, NotificationSender},
};
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: String,
    subject: &'a str,
    text: &'a str,
}

/// Delivers notifications through a transactional e-mail HTTP API.
///
/// When e-mail is disabled in the configuration, notifications are logged and reported as delivered.
#[derive(Clone)]
pub struct EmailClient {
    config: EmailConfig,
    client: Arc<Client>,
}

impl EmailClient {
    pub fn new(config: EmailConfig) -> Self {
        Self { config, client: Arc::new(Client::new()) }
    }

    fn message<'a>(&'a self, notification: &'a Notification) -> OutgoingEmail<'a> {
        OutgoingEmail {
            from: &self.config.from,
            to: format!("{} <{}>", notification.recipient_name, notification.recipient_email),
            subject: &notification.subject,
            text: &notification.body,
        }
    }
}

impl NotificationSender for EmailClient {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if !self.config.enabled {
            info!(
                "📬️ E-mail disabled. Would have sent \"{}\" to {}",
                notification.subject, notification.recipient_email
            );
            return Ok(());
        }
        let message = self.message(notification);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_token.reveal())
            .json(&message)
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            debug!("📬️ Sent \"{}\" to {}", notification.subject, notification.recipient_email);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::DeliveryFailed(format!("E-mail API returned {status}. {body}")))
        }
    }
}
