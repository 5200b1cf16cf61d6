use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentEventKind};

/// The before and after snapshots of an order whose status was modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderChanged {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }

    pub fn status_changed(&self) -> bool {
        self.old_order.status != self.new_order.status
    }
}

/// The outcome of applying a payment event to the order it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventResult {
    /// The event id has been processed before. Nothing was done.
    Duplicate,
    /// No order carries the event's payment intent. The event was not recorded, so a redelivery will be processed.
    OrderNotFound,
    /// The event was recorded, but did not move the order's status.
    Unchanged(Order),
    /// The event was recorded and moved the order's status.
    Changed(OrderChanged),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// The processor's event id. Used to process each delivery at most once.
    pub id: String,
    pub payment_intent: String,
    pub kind: PaymentEventKind,
}

/// A verified webhook event, narrowed down to the kinds the marketplace acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Payment(PaymentEvent),
    AccountUpdated { account_id: String, charges_enabled: bool },
    Unhandled { id: String, event_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub store: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSession {
    pub account_id: String,
    pub session_secret: String,
}
