//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, notifications, orders, payment_events, products, refunds, vendors};
use crate::{
    db_types::{
        Cents,
        FailedNotification,
        NewOrder,
        NewProduct,
        NewVariation,
        NewVendor,
        Order,
        OrderId,
        OrderStatusType,
        PaymentEventKind,
        Product,
        ProductId,
        ProductUpdate,
        Refund,
        Variation,
        VariationId,
        Vendor,
        VendorId,
    },
    notifications::Notification,
    order_objects::{OrderQueryFilter, OrderSummary},
    traits::{
        InventoryError,
        InventoryManagement,
        MarketplaceDatabase,
        MarketplaceError,
        NotificationError,
        NotificationOutbox,
        OrderChanged,
        OrderManagement,
        OrderManagementError,
        PaymentEvent,
        PaymentEventResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let vendor = vendors::insert_vendor(vendor, &mut tx).await?;
        tx.commit().await?;
        Ok(vendor)
    }

    async fn fetch_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::fetch_vendor(vendor_id, &mut conn).await?)
    }

    async fn fetch_vendor_by_account(&self, account_id: &str) -> Result<Option<Vendor>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::fetch_vendor_by_account(account_id, &mut conn).await?)
    }

    async fn set_connected_account(&self, vendor_id: VendorId, account_id: &str) -> Result<Vendor, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let vendor = vendors::set_connected_account(vendor_id, account_id, &mut tx)
            .await?
            .ok_or(InventoryError::VendorNotFound(vendor_id))?;
        tx.commit().await?;
        info!("🗃️ {vendor_id} is now linked to connected account {account_id}");
        Ok(vendor)
    }

    async fn set_connected_account_status(
        &self,
        account_id: &str,
        active: bool,
    ) -> Result<Option<Vendor>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let vendor = vendors::set_connected_account_status(account_id, active, &mut tx).await?;
        tx.commit().await?;
        match &vendor {
            Some(v) => info!("🗃️ Connected account {account_id} of {} is now active={active}", v.id),
            None => debug!("🗃️ No vendor owns connected account {account_id}"),
        }
        Ok(vendor)
    }

    async fn insert_product(&self, vendor_id: VendorId, product: NewProduct) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;
        if vendors::fetch_vendor(vendor_id, &mut tx).await?.is_none() {
            return Err(InventoryError::VendorNotFound(vendor_id));
        }
        let product = products::insert_product(vendor_id, product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn update_product(&self, product_id: ProductId, update: ProductUpdate) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let product = products::update_product(product_id, update, &mut tx)
            .await?
            .ok_or(InventoryError::ProductNotFound(product_id))?;
        tx.commit().await?;
        debug!("🗃️ {product_id} updated");
        Ok(product)
    }

    async fn archive_product(&self, product_id: ProductId) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let product = products::archive_product(product_id, &mut tx)
            .await?
            .ok_or(InventoryError::ProductNotFound(product_id))?;
        tx.commit().await?;
        info!("🗃️ {product_id} archived");
        Ok(product)
    }

    async fn fetch_products_for_vendor(
        &self,
        vendor_id: VendorId,
        include_inactive: bool,
    ) -> Result<Vec<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products_for_vendor(vendor_id, include_inactive, &mut conn).await?)
    }

    async fn insert_variation(
        &self,
        product_id: ProductId,
        variation: NewVariation,
    ) -> Result<Variation, InventoryError> {
        let mut tx = self.pool.begin().await?;
        if products::fetch_product(product_id, &mut tx).await?.is_none() {
            return Err(InventoryError::ProductNotFound(product_id));
        }
        let variation = products::insert_variation(product_id, variation, &mut tx).await?;
        tx.commit().await?;
        Ok(variation)
    }

    async fn update_variation(
        &self,
        variation_id: VariationId,
        variation: NewVariation,
    ) -> Result<Variation, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let variation = products::update_variation(variation_id, variation, &mut tx)
            .await?
            .ok_or(InventoryError::VariationNotFound(variation_id))?;
        tx.commit().await?;
        Ok(variation)
    }

    async fn archive_variation(&self, variation_id: VariationId) -> Result<Variation, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let variation = products::archive_variation(variation_id, &mut tx)
            .await?
            .ok_or(InventoryError::VariationNotFound(variation_id))?;
        tx.commit().await?;
        info!("🗃️ {variation_id} archived");
        Ok(variation)
    }

    async fn fetch_variation(&self, variation_id: VariationId) -> Result<Option<Variation>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_variation(variation_id, &mut conn).await?)
    }

    async fn fetch_variations_for_product(&self, product_id: ProductId) -> Result<Vec<Variation>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_variations_for_product(product_id, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_payment_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_intent(payment_intent, &mut conn).await?)
    }

    async fn search_orders(
        &self,
        vendor_id: VendorId,
        query: OrderQueryFilter,
    ) -> Result<Vec<OrderSummary>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(vendor_id, query, &mut conn).await?)
    }
}

impl NotificationOutbox for SqliteDatabase {
    async fn record_failed_notification(
        &self,
        notification: &Notification,
        error: &str,
    ) -> Result<i64, NotificationError> {
        let payload = serde_json::to_string(notification)?;
        let mut tx = self.pool.begin().await?;
        let id = notifications::insert_failed_notification(&payload, error, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Undelivered {:?} notification stored with id {id}", notification.kind);
        Ok(id)
    }

    async fn fetch_failed_notifications(&self, max_attempts: i64) -> Result<Vec<FailedNotification>, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_failed_notifications(max_attempts, &mut conn).await?)
    }

    async fn remove_failed_notification(&self, id: i64) -> Result<(), NotificationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::delete_failed_notification(id, &mut conn).await?)
    }

    async fn record_failed_attempt(&self, id: i64, error: &str) -> Result<(), NotificationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::increment_attempts(id, error, &mut conn).await?)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let reservations = order.items.iter().map(|i| (i.variation_id, i.quantity)).collect::<Vec<_>>();
        let order_number = order.order_number.clone();
        let id = orders::insert_order(order, &mut tx).await?;
        for (variation, quantity) in reservations {
            if !products::reserve_stock(variation, quantity, &mut tx).await? {
                warn!("🗃️ Not enough stock of {variation} for order {order_number}. Rolling back.");
                // Dropping the transaction rolls it back
                return Err(MarketplaceError::InsufficientStock { variation, requested: quantity });
            }
            trace!("🗃️ Reserved {quantity} of {variation} for order {order_number}");
        }
        let order = orders::fetch_order(id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(id))?;
        tx.commit().await?;
        info!("🗃️ Order {order_number} ({id}) stored and stock reserved");
        Ok(order)
    }

    async fn apply_payment_event(&self, event: &PaymentEvent) -> Result<PaymentEventResult, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::fetch_order_by_payment_intent(&event.payment_intent, &mut tx).await? else {
            debug!("🗃️ No order for payment intent {}. Event {} not recorded.", event.payment_intent, event.id);
            return Ok(PaymentEventResult::OrderNotFound);
        };
        if !payment_events::record_event(event, order.id, &mut tx).await? {
            debug!("🗃️ Payment event {} has already been processed", event.id);
            return Ok(PaymentEventResult::Duplicate);
        }
        if event.kind == PaymentEventKind::Succeeded {
            orders::mark_paid(order.id, &mut tx).await?;
        }
        let result = match order.status.after_payment_event(event.kind) {
            Some(status) => {
                orders::update_order_status(order.id, status, None, &mut tx).await?;
                let new_order =
                    orders::fetch_order(order.id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order.id))?;
                info!("🗃️ {} moved from {} to {status} by event {}", order.id, order.status, event.id);
                PaymentEventResult::Changed(OrderChanged::new(order, new_order))
            },
            None => {
                let current =
                    orders::fetch_order(order.id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order.id))?;
                debug!("🗃️ Event {} ({:?}) leaves {} at {}", event.id, event.kind, order.id, order.status);
                PaymentEventResult::Unchanged(current)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        note: Option<String>,
    ) -> Result<OrderChanged, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let old_order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if old_order.status == status && note.is_none() {
            return Err(MarketplaceError::OrderModificationNoOp);
        }
        orders::update_order_status(order_id, status, note, &mut tx).await?;
        let new_order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ {order_id} status changed from {} to {status}", old_order.status);
        Ok(OrderChanged::new(old_order, new_order))
    }

    async fn reserve_refund(&self, order_id: OrderId, amount: Cents) -> Result<Option<Refund>, MarketplaceError> {
        // The guarded insert must be the first statement so that SQLite takes the write lock before reading.
        let mut tx = self.pool.begin().await?;
        let refund = refunds::reserve_refund(order_id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(refund)
    }

    async fn confirm_refund(&self, refund_id: i64, external_refund_id: &str) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let refund = refunds::confirm_refund(refund_id, external_refund_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::RefundNotPending(refund_id))?;
        let order_id = refund.order_id;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        tx.commit().await?;
        info!("🗃️ Refund {external_refund_id} of {} recorded against {order_id}", refund.amount);
        Ok(order)
    }

    async fn cancel_refund(&self, refund_id: i64) -> Result<(), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if !refunds::delete_pending_refund(refund_id, &mut tx).await? {
            return Err(MarketplaceError::RefundNotPending(refund_id));
        }
        tx.commit().await?;
        debug!("🗃️ Pending refund #{refund_id} released");
        Ok(())
    }

    async fn fetch_pending_refunds(&self, created_before: DateTime<Utc>) -> Result<Vec<Refund>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(refunds::fetch_pending_refunds(created_before, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Migrations are embedded in the binary at compile time.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
