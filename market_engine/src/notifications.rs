//! Notifications sent to vendors and customers as orders move through their lifecycle.
//!
//! Notifications are rendered into their final subject and body when they are created, so that a notification stored
//! for a later retry is delivered exactly as it was first attempted.
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Vendor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    PaymentSucceeded,
    PaymentFailed,
    OrderShipped,
    OrderDeclined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

/// Renders notifications. Customer notifications link to the storefront's order page, which uses the order's access
/// token to fetch the order without a login.
#[derive(Debug, Clone)]
pub struct NotificationTemplates {
    storefront_url: String,
}

impl NotificationTemplates {
    pub fn new<S: Into<String>>(storefront_url: S) -> Self {
        Self { storefront_url: storefront_url.into() }
    }

    pub fn order_link(&self, order: &Order) -> String {
        format!("{}/order/{}?token={}", self.storefront_url.trim_end_matches('/'), order.id.value(), order.access_token)
    }

    pub fn new_order(&self, vendor: &Vendor, order: &Order) -> Notification {
        let items = order
            .items
            .iter()
            .map(|i| format!("  {} x {} ({})", i.quantity, i.product_name, i.descriptor))
            .collect::<Vec<String>>()
            .join("\n");
        let body = format!(
            "Hi {},\n\nYou have received a new order ({}) from {}.\n\n{items}\n\nTotal: {}\n\nThe order will be \
             marked as paid once the payment has been confirmed.",
            vendor.owner, order.order_number, order.customer.name, order.total
        );
        Notification {
            kind: NotificationKind::NewOrder,
            recipient_name: vendor.owner.clone(),
            recipient_email: vendor.email.clone(),
            subject: format!("New order {}", order.order_number),
            body,
        }
    }

    pub fn payment_succeeded(&self, order: &Order) -> Notification {
        let body = format!(
            "Hi {},\n\nThank you for your order! Your payment of {} for order {} was successful.\n\nYou can check the \
             status of your order at any time here: {}",
            order.customer.name,
            order.total,
            order.order_number,
            self.order_link(order)
        );
        self.customer_notification(order, NotificationKind::PaymentSucceeded, "Order confirmation", body)
    }

    pub fn payment_failed(&self, order: &Order) -> Notification {
        let body = format!(
            "Hi {},\n\nUnfortunately the payment for your order {} did not go through. No money has been taken from \
             your account.\n\nOrder details: {}",
            order.customer.name,
            order.order_number,
            self.order_link(order)
        );
        self.customer_notification(order, NotificationKind::PaymentFailed, "Payment failed", body)
    }

    pub fn order_shipped(&self, order: &Order) -> Notification {
        let body = format!(
            "Hi {},\n\nGood news! Your order {} has shipped.\n\nOrder details: {}",
            order.customer.name,
            order.order_number,
            self.order_link(order)
        );
        self.customer_notification(order, NotificationKind::OrderShipped, "Your order has shipped", body)
    }

    pub fn order_declined(&self, order: &Order) -> Notification {
        let note = order.vendor_note.as_deref().unwrap_or_default();
        let body = format!(
            "Hi {},\n\nWe're sorry, the vendor has declined your order {}.\n\nMessage from the vendor: {note}\n\nOrder \
             details: {}",
            order.customer.name,
            order.order_number,
            self.order_link(order)
        );
        self.customer_notification(order, NotificationKind::OrderDeclined, "Your order was declined", body)
    }

    fn customer_notification(&self, order: &Order, kind: NotificationKind, subject: &str, body: String) -> Notification {
        Notification {
            kind,
            recipient_name: order.customer.name.clone(),
            recipient_email: order.customer.email.clone(),
            subject: format!("{subject} ({})", order.order_number),
            body,
        }
    }
}
