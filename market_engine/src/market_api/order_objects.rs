use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db_types::{
        AccessToken,
        Cents,
        CustomerInfo,
        LineItem,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Refund,
        VendorId,
        VendorPublicInfo,
    },
    market_api::errors::OrderFlowError,
};

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    /// Inclusive lower bound on the order's creation time
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the order's creation time
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn since<T>(mut self, since: T) -> Result<Self, OrderFlowError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| OrderFlowError::invalid_input(format!("Invalid 'from' date. {e}")))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, OrderFlowError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| OrderFlowError::invalid_input(format!("Invalid 'to' date. {e}")))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<OrderStatusType>) -> Self {
        self.status = if statuses.is_empty() { None } else { Some(statuses) };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.since.is_none() && self.until.is_none() && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters");
        }
        let mut parts = vec![];
        if let Some(since) = self.since {
            parts.push(format!("since: {since}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("until: {until}"));
        }
        if let Some(status) = &self.status {
            let s = status.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            parts.push(format!("status: [{s}]"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

//--------------------------------------     OrderSummary      ---------------------------------------------------------
/// The projection of an order used in vendor order listings.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total: Cents,
    pub refunded: Cents,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     OrderDetails      ---------------------------------------------------------
/// The full view of an order, as shown to its customer or its vendor. The access token is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub id: OrderId,
    pub order_number: String,
    pub vendor: VendorPublicInfo,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub sub_total: Cents,
    pub shipping: Cents,
    pub total: Cents,
    pub status: OrderStatusType,
    pub vendor_note: Option<String>,
    pub refunds: Vec<Refund>,
    pub refundable: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetails {
    pub fn new(order: Order, vendor: VendorPublicInfo) -> Self {
        let refundable = if order.paid_at.is_some() { order.refundable() } else { Cents::from(0) };
        Self {
            id: order.id,
            order_number: order.order_number,
            vendor,
            customer: order.customer,
            items: order.items,
            sub_total: order.sub_total,
            shipping: order.shipping,
            total: order.total,
            status: order.status,
            vendor_note: order.vendor_note,
            refunds: order.refunds,
            refundable,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

//--------------------------------------       Checkout        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub vendor: VendorId,
    pub items: Vec<LineItem>,
    pub customer: CustomerInfo,
    /// When present, must match `customer.email`
    #[serde(default)]
    pub confirm_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutResult {
    pub order_id: OrderId,
    pub order_number: String,
    /// Lets the customer view the order later without logging in
    pub access_token: AccessToken,
    /// Completes the payment on the client side
    pub client_secret: String,
    /// The vendor's connected account, which the client needs to complete the payment
    pub connected_account: String,
    pub total: Cents,
}

//--------------------------------------   Vendor operations   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatusType,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    /// The amount to refund. Defaults to everything that is still refundable.
    #[serde(default)]
    pub amount: Option<Cents>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundResult {
    pub refund: Refund,
    pub refunded: Cents,
    pub refundable: Cents,
}

/// The result of one pass over the refunds that were left pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingRefundReport {
    /// Confirmed as issued by the payment processor
    pub issued: usize,
    /// Rejected by the payment processor, so the amount is refundable again
    pub released: usize,
    /// Still unanswered
    pub pending: usize,
}

//--------------------------------------        Webhooks       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WebhookOutcome {
    /// The event moved the order to a new status
    StatusChanged { order_id: OrderId, status: OrderStatusType },
    /// The event was recorded but the order's status stayed the same
    Unchanged { order_id: OrderId, status: OrderStatusType },
    Duplicate,
    OrderNotFound,
    AccountUpdated { account_id: String, active: bool },
    Ignored,
}
