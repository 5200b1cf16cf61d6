use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Cents, Order, OrderId, OrderStatusType, VendorId},
    events::{EventProducers, OrderDeclinedEvent, OrderPaidEvent, OrderShippedEvent, PaymentFailedEvent},
    helpers::validate_vendor_note,
    market_api::{
        errors::OrderFlowError,
        order_objects::{PendingRefundReport, RefundResult, WebhookOutcome},
    },
    traits::{
        GatewayError,
        GatewayEvent,
        MarketplaceDatabase,
        MarketplaceError,
        PaymentEvent,
        PaymentEventResult,
        PaymentGateway,
    },
};

/// `ReconciliationApi` drives an order's status after checkout: payment processor webhooks, vendor status updates and
/// refunds.
///
/// ## Status transitions
///
/// | From \ Event     | payment succeeded | payment failed / canceled | vendor: confirmed | vendor: shipped / declined |
/// |------------------|-------------------|---------------------------|-------------------|----------------------------|
/// | incomplete       | paid              | paymentFailed             | confirmed         | shipped / declined         |
/// | paymentFailed    | paid              | -                         | confirmed         | shipped / declined         |
/// | paid             | -                 | -                         | confirmed         | shipped / declined         |
/// | confirmed        | -                 | -                         | -                 | shipped / declined         |
/// | shipped/declined | -                 | -                         | Err               | Err                        |
///
/// `-` means the event is recorded but the status is left alone. Refunds never change the status.
pub struct ReconciliationApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for ReconciliationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, G> ReconciliationApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> ReconciliationApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Verifies and processes a raw webhook delivery.
    ///
    /// Only a bad signature (or a storage failure) is reported as an error. Events for unknown orders, duplicates and
    /// event types the marketplace does not act on are all successful outcomes, so that the processor stops
    /// redelivering them.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, OrderFlowError> {
        let event = self.gateway.verify_webhook(payload, signature).map_err(|e| {
            warn!("🔄️ Rejected webhook delivery. {e}");
            OrderFlowError::SignatureInvalid(e.to_string())
        })?;
        match event {
            GatewayEvent::Payment(event) => self.process_payment_event(event).await,
            GatewayEvent::AccountUpdated { account_id, charges_enabled } => {
                self.set_account_status(&account_id, charges_enabled).await
            },
            GatewayEvent::Unhandled { id, event_type } => {
                debug!("🔄️ Ignoring webhook event {id} of type {event_type}");
                Ok(WebhookOutcome::Ignored)
            },
        }
    }

    /// Applies a verified payment event to its order, at most once per event id.
    pub async fn process_payment_event(&self, event: PaymentEvent) -> Result<WebhookOutcome, OrderFlowError> {
        trace!("🔄️ Processing payment event {} ({:?}) for {}", event.id, event.kind, event.payment_intent);
        let result = self.db.apply_payment_event(&event).await?;
        let outcome = match result {
            PaymentEventResult::Duplicate => {
                debug!("🔄️ Payment event {} has already been processed", event.id);
                WebhookOutcome::Duplicate
            },
            PaymentEventResult::OrderNotFound => {
                warn!(
                    "🔄️ Payment event {} refers to payment intent {}, but no order carries it. Dropping the event.",
                    event.id, event.payment_intent
                );
                WebhookOutcome::OrderNotFound
            },
            PaymentEventResult::Unchanged(order) => {
                debug!("🔄️ Payment event {} left {} in status {}", event.id, order.id, order.status);
                WebhookOutcome::Unchanged { order_id: order.id, status: order.status }
            },
            PaymentEventResult::Changed(change) => {
                let order = change.new_order;
                info!("🔄️ {} moved from {} to {}", order.id, change.old_order.status, order.status);
                let outcome = WebhookOutcome::StatusChanged { order_id: order.id, status: order.status };
                match order.status {
                    OrderStatusType::Paid => self.producers.publish_order_paid(OrderPaidEvent::new(order)).await,
                    OrderStatusType::PaymentFailed => {
                        self.producers.publish_payment_failed(PaymentFailedEvent::new(order)).await
                    },
                    _ => {},
                }
                outcome
            },
        };
        Ok(outcome)
    }

    /// Records whether a vendor's connected account may accept charges.
    pub async fn set_account_status(&self, account_id: &str, active: bool) -> Result<WebhookOutcome, OrderFlowError> {
        match self.db.set_connected_account_status(account_id, active).await? {
            Some(vendor) => info!("🔄️ Payment account of {} is now {}", vendor.id, if active { "active" } else { "inactive" }),
            None => warn!("🔄️ Received an account update for {account_id}, which does not belong to any vendor"),
        }
        Ok(WebhookOutcome::AccountUpdated { account_id: account_id.to_string(), active })
    }

    /// Lets a vendor move one of their orders to `confirmed`, `shipped` or `declined`.
    ///
    /// Declining requires a note, which is passed on to the customer. Re-applying the current status is a no-op and
    /// returns the order unchanged.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        vendor_id: VendorId,
        status: OrderStatusType,
        note: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        validate_vendor_note(status, note.as_deref())?;
        let order = self.vendor_order(order_id, vendor_id).await?;
        if order.status == status {
            debug!("🔄️ {order_id} is already {status}. Nothing to do.");
            return Ok(order);
        }
        if !status.is_vendor_settable() || order.status.is_terminal() {
            return Err(OrderFlowError::InvalidStatusTransition { from: order.status, to: status });
        }
        let change = self.db.update_order_status(order_id, status, note).await?;
        let order = change.new_order;
        info!("🔄️ {vendor_id} moved {order_id} from {} to {status}", change.old_order.status);
        match status {
            OrderStatusType::Shipped => self.producers.publish_order_shipped(OrderShippedEvent::new(order.clone())).await,
            OrderStatusType::Declined => {
                self.producers.publish_order_declined(OrderDeclinedEvent::new(order.clone())).await
            },
            _ => {},
        }
        Ok(order)
    }

    /// Refunds part or all of a paid order.
    ///
    /// The refundable amount is the order's stored total less everything already refunded. If `amount` is `None`, the
    /// whole refundable amount is refunded.
    ///
    /// The amount is first reserved against the order as a pending refund, which fails if concurrent refunds have
    /// already claimed it. The reservation is confirmed once the payment processor has accepted the refund, and
    /// released if the processor rejects it. If the processor cannot be reached, the reservation is kept and
    /// [`Self::retry_pending_refunds`] settles it later.
    pub async fn refund(
        &self,
        order_id: OrderId,
        vendor_id: VendorId,
        amount: Option<Cents>,
    ) -> Result<RefundResult, OrderFlowError> {
        let order = self.vendor_order(order_id, vendor_id).await?;
        if order.paid_at.is_none() {
            return Err(OrderFlowError::InvalidAmount(format!("{order_id} has not been paid, so it cannot be refunded")));
        }
        let refundable = order.refundable();
        if !refundable.is_positive() {
            return Err(OrderFlowError::InvalidAmount(format!("{order_id} has already been refunded in full")));
        }
        let amount = match amount {
            Some(a) if !a.is_positive() => {
                return Err(OrderFlowError::InvalidAmount("The refund amount must be greater than zero".into()))
            },
            Some(a) if a > refundable => {
                return Err(OrderFlowError::InvalidAmount(format!(
                    "Cannot refund {a}. At most {refundable} can be refunded"
                )))
            },
            Some(a) => a,
            None => refundable,
        };
        let vendor = self.db.fetch_vendor(vendor_id).await?.ok_or_else(|| OrderFlowError::not_found(vendor_id))?;
        let account = vendor.connected_account_id.ok_or(OrderFlowError::VendorNotPayable(vendor_id))?;
        let pending = self.db.reserve_refund(order_id, amount).await?.ok_or_else(|| {
            warn!("💸️ Refund of {amount} for {order_id} lost the race against another refund");
            OrderFlowError::InvalidAmount(format!(
                "Cannot refund {amount}. Another refund of {order_id} has claimed part of the refundable amount"
            ))
        })?;
        let key = pending.idempotency_key();
        let gateway_refund = match self.gateway.create_refund(&account, &order.payment_intent, amount, &key).await {
            Ok(r) => r,
            Err(e @ GatewayError::Unavailable(_)) => {
                // The processor may have issued the refund before the connection dropped. The reservation stays, and
                // `retry_pending_refunds` repeats the request under the same idempotency key.
                warn!(
                    "💸️ No answer from the payment processor for the refund of {amount} for {order_id}. Refund #{} \
                     stays pending and will be retried. {e}",
                    pending.id
                );
                return Err(e.into());
            },
            Err(e) => {
                warn!("💸️ The payment processor did not refund {amount} for {order_id}. {e}");
                if let Err(e) = self.db.cancel_refund(pending.id).await {
                    error!("💸️ Could not release pending refund #{} of {order_id}. Release it manually. {e}", pending.id);
                }
                return Err(e.into());
            },
        };
        let order = self.db.confirm_refund(pending.id, &gateway_refund.id).await.map_err(|e| {
            error!(
                "💸️ Refund {} of {amount} for {order_id} was issued, but pending refund #{} could not be confirmed. \
                 Confirm it manually. {e}",
                gateway_refund.id, pending.id
            );
            OrderFlowError::from(e)
        })?;
        info!("💸️ Refunded {amount} of {order_id} ({})", gateway_refund.id);
        let refund = order
            .refunds
            .iter()
            .find(|r| r.id == pending.id)
            .cloned()
            .ok_or_else(|| OrderFlowError::DatabaseError(format!("Refund {} was not stored", gateway_refund.id)))?;
        Ok(RefundResult { refund, refunded: order.refunded(), refundable: order.refundable() })
    }

    /// Repeats the processor request for every refund reserved before `created_before` that is still pending.
    ///
    /// Each request reuses the refund's idempotency key, so a refund the processor already issued is confirmed rather
    /// than issued again. Refunds the processor rejects are released. Those it still does not answer stay pending for
    /// the next pass.
    pub async fn retry_pending_refunds(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<PendingRefundReport, OrderFlowError> {
        let pending = self.db.fetch_pending_refunds(created_before).await?;
        let mut report = PendingRefundReport::default();
        for refund in pending {
            let Some(order) = self.db.fetch_order(refund.order_id).await? else {
                error!("💸️ Pending refund #{} refers to {}, which does not exist", refund.id, refund.order_id);
                report.pending += 1;
                continue;
            };
            let vendor = self.db.fetch_vendor(order.vendor_id).await?;
            let Some(account) = vendor.and_then(|v| v.connected_account_id) else {
                error!(
                    "💸️ Pending refund #{} for {} cannot be retried. {} has no payment account",
                    refund.id, order.id, order.vendor_id
                );
                report.pending += 1;
                continue;
            };
            let key = refund.idempotency_key();
            match self.gateway.create_refund(&account, &order.payment_intent, refund.amount, &key).await {
                Ok(issued) => match self.db.confirm_refund(refund.id, &issued.id).await {
                    Ok(_) => {
                        info!(
                            "💸️ Pending refund #{} of {} for {} confirmed as {}",
                            refund.id, refund.amount, order.id, issued.id
                        );
                        report.issued += 1;
                    },
                    Err(MarketplaceError::RefundNotPending(_)) => {
                        debug!("💸️ Refund #{} was settled while it was being retried", refund.id);
                    },
                    Err(e) => return Err(e.into()),
                },
                Err(GatewayError::Unavailable(e)) => {
                    debug!("💸️ Refund #{} for {} is still unanswered. {e}", refund.id, order.id);
                    report.pending += 1;
                },
                Err(e) => {
                    warn!(
                        "💸️ The payment processor rejected pending refund #{} for {}. Releasing it. {e}",
                        refund.id, order.id
                    );
                    match self.db.cancel_refund(refund.id).await {
                        Ok(()) | Err(MarketplaceError::RefundNotPending(_)) => report.released += 1,
                        Err(e) => return Err(e.into()),
                    }
                },
            }
        }
        Ok(report)
    }

    async fn vendor_order(&self, order_id: OrderId, vendor_id: VendorId) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::not_found(order_id))?;
        if order.vendor_id != vendor_id {
            warn!("🔄️ {vendor_id} tried to modify {order_id}, which belongs to {}", order.vendor_id);
            return Err(OrderFlowError::Forbidden);
        }
        Ok(order)
    }
}
