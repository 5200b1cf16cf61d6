use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Cents, NewOrder, Order, OrderId, OrderStatusType, Refund, VariationId},
    traits::{
        data_objects::{OrderChanged, PaymentEvent, PaymentEventResult},
        InventoryError,
        InventoryManagement,
        NotificationOutbox,
        OrderManagement,
        OrderManagementError,
    },
};

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Not enough stock for {variation}. Requested {requested}")]
    InsufficientStock { variation: VariationId, requested: i64 },
    #[error("The requested {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Refund #{0} is not pending")]
    RefundNotPending(i64),
    #[error("{0}")]
    InventoryError(#[from] InventoryError),
    #[error("{0}")]
    OrderManagementError(#[from] OrderManagementError),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}

/// This trait defines the highest level of behaviour for backends supporting the marketplace engine.
///
/// Every write that touches more than one record happens in a single atomic transaction:
/// * Placing an order together with the stock decrements it implies.
/// * Applying a payment event together with the record that the event has been processed.
/// * Reserving a refund amount together with the check that the order still has that much left to refund.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + InventoryManagement + OrderManagement + NotificationOutbox {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order and, in a single atomic transaction,
    /// * stores the order with status `incomplete`, along with its line items,
    /// * decrements the stock of every variation in the order.
    ///
    /// A stock decrement only succeeds if enough stock remains. If any decrement fails, nothing is stored and
    /// [`MarketplaceError::InsufficientStock`] is returned.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError>;

    /// Applies a payment event to the order carrying the event's payment intent, in a single atomic transaction.
    ///
    /// The event id is recorded alongside the status change, so redelivered events are reported as
    /// [`PaymentEventResult::Duplicate`] and have no effect. The new status follows
    /// [`OrderStatusType::after_payment_event`].
    async fn apply_payment_event(&self, event: &PaymentEvent) -> Result<PaymentEventResult, MarketplaceError>;

    /// Sets the order's status and vendor note. No transition rules are checked here.
    async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        note: Option<String>,
    ) -> Result<OrderChanged, MarketplaceError>;

    /// Reserves `amount` against the order as a pending refund, provided that the order total minus every refund
    /// recorded so far (pending or issued) is at least `amount`. The check and the insert are a single statement,
    /// so concurrent reservations can never exceed the order total between them.
    ///
    /// Returns `None` if there is not enough left to refund.
    async fn reserve_refund(&self, order_id: OrderId, amount: Cents) -> Result<Option<Refund>, MarketplaceError>;

    /// Marks a pending refund as issued by the payment processor under `external_refund_id`. Returns the updated
    /// order.
    async fn confirm_refund(&self, refund_id: i64, external_refund_id: &str) -> Result<Order, MarketplaceError>;

    /// Releases a pending refund reservation, e.g. after the payment processor rejected the refund. Issued refunds
    /// are never removed.
    async fn cancel_refund(&self, refund_id: i64) -> Result<(), MarketplaceError>;

    /// Fetches the refunds reserved before `created_before` that the payment processor has not yet confirmed, oldest
    /// first.
    async fn fetch_pending_refunds(&self, created_before: DateTime<Utc>) -> Result<Vec<Refund>, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}
