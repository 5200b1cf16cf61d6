use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{AccessToken, Cents, LineItem, NewOrder, OrderItem, Vendor},
    events::{EventProducers, OrderCreatedEvent},
    helpers::{validate_customer, validate_line_items, OrderNumberGenerator, SequentialOrderNumbers},
    market_api::{
        errors::OrderFlowError,
        order_objects::{CheckoutRequest, CheckoutResult},
    },
    pricing::{calculate_totals, PriceLine},
    traits::{MarketplaceDatabase, MarketplaceError, PaymentGateway},
};

/// The platform's default cut of every order, in percent.
pub const DEFAULT_PLATFORM_FEE_PERCENT: i64 = 1;

/// `CheckoutApi` turns a customer's cart into a persisted, payable order.
///
/// A successful checkout
/// 1. validates the customer details and the cart against the vendor's live inventory,
/// 2. computes the totals from the current catalog prices,
/// 3. opens a payment intent on the vendor's connected account, with the platform fee attached,
/// 4. stores the order and decrements the stock in a single transaction,
/// 5. publishes an [`OrderCreatedEvent`].
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    order_numbers: Arc<dyn OrderNumberGenerator>,
    producers: EventProducers,
    fee_percent: i64,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi (fee: {}%)", self.fee_percent)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self {
            db,
            gateway,
            order_numbers: Arc::new(SequentialOrderNumbers::random()),
            producers,
            fee_percent: DEFAULT_PLATFORM_FEE_PERCENT,
        }
    }

    pub fn with_order_numbers(mut self, generator: Arc<dyn OrderNumberGenerator>) -> Self {
        self.order_numbers = generator;
        self
    }

    pub fn with_platform_fee(mut self, percent: i64) -> Self {
        self.fee_percent = percent;
        self
    }

    /// The platform's cut of `total`. `None` if the fee cannot be represented.
    pub fn platform_fee(&self, total: Cents) -> Option<Cents> {
        total.percentage_floor(self.fee_percent)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<CheckoutResult, OrderFlowError> {
        let CheckoutRequest { vendor: vendor_id, items, customer, confirm_email } = request;
        validate_customer(&customer, confirm_email.as_deref())?;
        validate_line_items(&items)?;
        let vendor = self.db.fetch_vendor(vendor_id).await?.ok_or_else(|| OrderFlowError::not_found(vendor_id))?;
        if !vendor.active {
            return Err(OrderFlowError::not_found(vendor_id));
        }
        let items = self.resolve_items(&vendor, &items).await?;
        let totals = calculate_totals(items.iter().map(PriceLine::from))
            .map_err(|e| OrderFlowError::InvalidPurchase(e.to_string()))?;
        let total = totals.total();
        if !total.is_positive() {
            return Err(OrderFlowError::InvalidPurchase("The order total must be greater than zero".into()));
        }
        let account = vendor.connected_account_id.clone().ok_or_else(|| {
            info!("🛒️ {vendor_id} has no payment account. Checkout refused.");
            OrderFlowError::VendorNotPayable(vendor_id)
        })?;
        let now = Utc::now();
        let order_number = self.order_numbers.next_order_number(now);
        let fee = self
            .platform_fee(total)
            .ok_or_else(|| OrderFlowError::InvalidPurchase(format!("Cannot compute the platform fee on {total}")))?;
        let intent = self.gateway.create_payment_intent(&account, total, fee).await.map_err(|e| {
            warn!("🛒️ Could not open a payment intent for order {order_number}. {e}");
            OrderFlowError::from(e)
        })?;
        debug!("🛒️ Payment intent {} opened for order {order_number}: {total} (fee {fee})", intent.id);
        let new_order = NewOrder {
            vendor_id,
            order_number,
            access_token: AccessToken::random(),
            customer,
            items,
            sub_total: totals.sub_total,
            shipping: totals.shipping,
            total,
            payment_intent: intent.id.clone(),
            created_at: now,
        };
        let order = self.db.insert_order(new_order).await.map_err(|e| {
            if let MarketplaceError::InsufficientStock { .. } = e {
                warn!("🛒️ Stock ran out while placing the order. Payment intent {} will not be used.", intent.id);
            }
            OrderFlowError::from(e)
        })?;
        info!("🛒️ Order {} ({}) placed with {vendor_id} for {total}", order.order_number, order.id);
        let result = CheckoutResult {
            order_id: order.id,
            order_number: order.order_number.clone(),
            access_token: order.access_token.clone(),
            client_secret: intent.client_secret,
            connected_account: account,
            total,
        };
        self.producers.publish_order_created(OrderCreatedEvent::new(vendor, order)).await;
        Ok(result)
    }

    /// Checks each cart line against the vendor's live inventory and snapshots it into an order item.
    ///
    /// Lines for the same variation are merged, so that the stock check covers the combined quantity.
    async fn resolve_items(&self, vendor: &Vendor, lines: &[LineItem]) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut merged: Vec<LineItem> = Vec::with_capacity(lines.len());
        for line in lines {
            match merged.iter_mut().find(|m| m.product == line.product && m.variation == line.variation) {
                Some(m) => {
                    m.quantity = m
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| OrderFlowError::InvalidPurchase("Invalid quantity".into()))?
                },
                None => merged.push(line.clone()),
            }
        }
        let mut items = Vec::with_capacity(merged.len());
        for line in merged {
            let product = self
                .db
                .fetch_product(line.product)
                .await?
                .filter(|p| p.vendor_id == vendor.id)
                .ok_or_else(|| OrderFlowError::not_found(line.product))?;
            if !product.is_available() {
                return Err(OrderFlowError::InvalidPurchase(format!("{} is no longer available", product.name)));
            }
            let variation = self
                .db
                .fetch_variation(line.variation)
                .await?
                .filter(|v| v.product_id == product.id)
                .ok_or_else(|| OrderFlowError::not_found(line.variation))?;
            if variation.archived {
                return Err(OrderFlowError::InvalidPurchase(format!(
                    "{} ({}) is no longer available",
                    product.name, variation.descriptor
                )));
            }
            if !variation.purchase_option.is_purchasable() {
                return Err(OrderFlowError::InvalidPurchase(format!(
                    "{} ({}) cannot be bought online",
                    product.name, variation.descriptor
                )));
            }
            if variation.quantity < line.quantity {
                return Err(OrderFlowError::InvalidPurchase(format!(
                    "Not enough stock for {} ({}). {} requested, {} available",
                    product.name, variation.descriptor, line.quantity, variation.quantity
                )));
            }
            items.push(OrderItem {
                product_id: product.id,
                variation_id: variation.id,
                product_name: product.name.clone(),
                descriptor: variation.descriptor,
                unit_price: variation.price,
                unit_shipping: variation.shipping,
                quantity: line.quantity,
            });
        }
        Ok(items)
    }
}
