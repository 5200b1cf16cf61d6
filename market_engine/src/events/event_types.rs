use crate::db_types::{Order, Vendor};

/// A customer placed an order. The vendor is included so that hooks can honour its notification preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreatedEvent {
    pub vendor: Vendor,
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(vendor: Vendor, order: Order) -> Self {
        Self { vendor, order }
    }
}

/// The payment processor confirmed payment, and the order moved to `paid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The payment failed or was cancelled, and the order moved to `paymentFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFailedEvent {
    pub order: Order,
}

impl PaymentFailedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderShippedEvent {
    pub order: Order,
}

impl OrderShippedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The vendor declined the order. The order carries the vendor's note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDeclinedEvent {
    pub order: Order,
}

impl OrderDeclinedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
