use thiserror::Error;

use crate::{
    db_types::{Order, OrderId, VendorId},
    order_objects::{OrderQueryFilter, OrderSummary},
};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over orders. Every [`Order`] returned is fully assembled, i.e. it carries its snapshotted line
/// items and its refund history.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_by_payment_intent(&self, payment_intent: &str)
        -> Result<Option<Order>, OrderManagementError>;

    /// Returns the vendor's orders that match the filter, newest first.
    ///
    /// The date range is inclusive of `since` and exclusive of `until`.
    async fn search_orders(
        &self,
        vendor_id: VendorId,
        query: OrderQueryFilter,
    ) -> Result<Vec<OrderSummary>, OrderManagementError>;
}
