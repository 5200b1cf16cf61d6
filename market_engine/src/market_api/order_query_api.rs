use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, VendorId, VendorPublicInfo},
    market_api::{
        errors::OrderFlowError,
        order_objects::{OrderDetails, OrderQueryFilter, OrderSummary},
    },
    traits::{InventoryManagement, OrderManagement},
};

/// Read access to orders, for customers (by access token) and for vendors (by ownership).
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement + InventoryManagement
{
    /// Fetches an order for a customer holding its access token. Fails with `Forbidden` unless the token matches.
    pub async fn order_by_token(&self, order_id: OrderId, token: &str) -> Result<OrderDetails, OrderFlowError> {
        let order = self.fetch(order_id).await?;
        if order.access_token.as_str() != token {
            debug!("🛒️ Wrong access token presented for {order_id}");
            return Err(OrderFlowError::Forbidden);
        }
        self.details(order).await
    }

    /// Fetches an order for the vendor that owns it.
    pub async fn order_for_vendor(&self, order_id: OrderId, vendor_id: VendorId) -> Result<OrderDetails, OrderFlowError> {
        let order = self.fetch(order_id).await?;
        if order.vendor_id != vendor_id {
            debug!("🛒️ {vendor_id} asked for {order_id}, which belongs to {}", order.vendor_id);
            return Err(OrderFlowError::Forbidden);
        }
        self.details(order).await
    }

    /// The vendor's orders matching the filter, newest first.
    pub async fn search_orders(
        &self,
        vendor_id: VendorId,
        filter: OrderQueryFilter,
    ) -> Result<Vec<OrderSummary>, OrderFlowError> {
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err(OrderFlowError::invalid_input("'from' must not be later than 'to'"));
            }
        }
        trace!("🛒️ Searching orders of {vendor_id}. {filter}");
        let orders = self.db.search_orders(vendor_id, filter).await?;
        Ok(orders)
    }

    async fn fetch(&self, order_id: OrderId) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::not_found(order_id))
    }

    async fn details(&self, order: Order) -> Result<OrderDetails, OrderFlowError> {
        let vendor = self
            .db
            .fetch_vendor(order.vendor_id)
            .await?
            .ok_or_else(|| OrderFlowError::DatabaseError(format!("{} of {} is missing", order.vendor_id, order.id)))?;
        Ok(OrderDetails::new(order, VendorPublicInfo::from(&vendor)))
    }
}
