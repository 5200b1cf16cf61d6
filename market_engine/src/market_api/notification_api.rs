use std::fmt::Debug;

use log::*;
use serde::Serialize;

use crate::{
    events::{OrderCreatedEvent, OrderDeclinedEvent, OrderPaidEvent, OrderShippedEvent, PaymentFailedEvent},
    notifications::{Notification, NotificationTemplates},
    traits::{NotificationError, NotificationOutbox, NotificationSender},
};

/// The result of a pass over the stored, undelivered notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Renders and delivers notifications. A notification that cannot be delivered is stored in the outbox and retried
/// later by [`NotificationApi::retry_failed`]; delivery failures are never reported to the caller.
pub struct NotificationApi<B, N> {
    outbox: B,
    sender: N,
    templates: NotificationTemplates,
}

impl<B, N> Debug for NotificationApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B, N> NotificationApi<B, N> {
    pub fn new(outbox: B, sender: N, templates: NotificationTemplates) -> Self {
        Self { outbox, sender, templates }
    }

    pub fn templates(&self) -> &NotificationTemplates {
        &self.templates
    }
}

impl<B, N> NotificationApi<B, N>
where
    B: NotificationOutbox,
    N: NotificationSender,
{
    /// Sends the notification. Returns `true` if it was delivered straight away.
    pub async fn deliver(&self, notification: Notification) -> bool {
        match self.sender.send(&notification).await {
            Ok(()) => {
                debug!("📬️ {:?} notification sent to {}", notification.kind, notification.recipient_email);
                true
            },
            Err(e) => {
                warn!(
                    "📬️ Could not send {:?} notification to {}. It will be retried later. {e}",
                    notification.kind, notification.recipient_email
                );
                if let Err(e) = self.outbox.record_failed_notification(&notification, &e.to_string()).await {
                    error!("📬️ Could not store the undelivered notification. It is lost. {e}");
                }
                false
            },
        }
    }

    pub async fn on_order_created(&self, event: OrderCreatedEvent) {
        if !event.vendor.notify_new_orders {
            trace!("📬️ {} does not want new order e-mails", event.vendor.id);
            return;
        }
        let notification = self.templates.new_order(&event.vendor, &event.order);
        self.deliver(notification).await;
    }

    pub async fn on_order_paid(&self, event: OrderPaidEvent) {
        let notification = self.templates.payment_succeeded(&event.order);
        self.deliver(notification).await;
    }

    pub async fn on_payment_failed(&self, event: PaymentFailedEvent) {
        let notification = self.templates.payment_failed(&event.order);
        self.deliver(notification).await;
    }

    pub async fn on_order_shipped(&self, event: OrderShippedEvent) {
        let notification = self.templates.order_shipped(&event.order);
        self.deliver(notification).await;
    }

    pub async fn on_order_declined(&self, event: OrderDeclinedEvent) {
        let notification = self.templates.order_declined(&event.order);
        self.deliver(notification).await;
    }

    /// Retries every stored notification that has been attempted fewer than `max_attempts` times.
    pub async fn retry_failed(&self, max_attempts: i64) -> Result<RetryReport, NotificationError> {
        let pending = self.outbox.fetch_failed_notifications(max_attempts).await?;
        let mut report = RetryReport::default();
        for record in pending {
            let notification = match serde_json::from_str::<Notification>(&record.payload) {
                Ok(n) => n,
                Err(e) => {
                    error!("📬️ Stored notification #{} is unreadable and will be dropped. {e}", record.id);
                    self.outbox.remove_failed_notification(record.id).await?;
                    report.failed += 1;
                    continue;
                },
            };
            match self.sender.send(&notification).await {
                Ok(()) => {
                    self.outbox.remove_failed_notification(record.id).await?;
                    report.delivered += 1;
                },
                Err(e) => {
                    let attempts = record.attempts + 1;
                    if attempts >= max_attempts {
                        warn!("📬️ Giving up on notification #{} after {attempts} attempts. {e}", record.id);
                    }
                    self.outbox.record_failed_attempt(record.id, &e.to_string()).await?;
                    report.failed += 1;
                },
            }
        }
        if report.delivered + report.failed > 0 {
            info!("📬️ Notification retry: {} delivered, {} failed", report.delivered, report.failed);
        }
        Ok(report)
    }
}
