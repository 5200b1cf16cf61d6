use log::*;
use market_engine::{
    db_types::{Cents, PaymentEventKind},
    traits::{
        ConnectedAccount,
        GatewayError,
        GatewayEvent,
        GatewayRefund,
        OnboardingSession,
        PaymentEvent,
        PaymentGateway,
        PaymentIntent,
        VendorProfile,
    },
};
use stripe_tools::{StripeApi, StripeApiError, StripeConfig, StripeEvent, WebhookError};

/// [`PaymentGateway`] backed by the Stripe Connect API.
#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }
}

fn gateway_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::QueryError { status, message } if (400..500).contains(&status) => {
            GatewayError::Rejected(format!("{status}: {message}"))
        },
        e => GatewayError::Unavailable(e.to_string()),
    }
}

fn webhook_error(e: WebhookError) -> GatewayError {
    GatewayError::SignatureInvalid(e.to_string())
}

/// Narrows a Stripe event down to the ones the marketplace acts on.
pub fn gateway_event(event: StripeEvent) -> GatewayEvent {
    let kind = match event.event_type.as_str() {
        "payment_intent.succeeded" => Some(PaymentEventKind::Succeeded),
        "payment_intent.canceled" => Some(PaymentEventKind::Canceled),
        "payment_intent.payment_failed" => Some(PaymentEventKind::Failed),
        _ => None,
    };
    let object_id = event.object_id().map(String::from);
    match (kind, object_id) {
        (Some(kind), Some(payment_intent)) => GatewayEvent::Payment(PaymentEvent { id: event.id, payment_intent, kind }),
        (None, Some(account_id)) if event.event_type == "account.updated" => {
            let charges_enabled = event.object_bool("charges_enabled");
            GatewayEvent::AccountUpdated { account_id, charges_enabled }
        },
        _ => GatewayEvent::Unhandled { id: event.id, event_type: event.event_type },
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        account: &str,
        amount: Cents,
        application_fee: Cents,
    ) -> Result<PaymentIntent, GatewayError> {
        let intent = self.api.create_payment_intent(account, amount, application_fee, None).await.map_err(gateway_error)?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::Unavailable(format!("Payment intent {} has no client secret", intent.id)))?;
        Ok(PaymentIntent { id: intent.id, client_secret })
    }

    async fn create_refund(
        &self,
        account: &str,
        payment_intent: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        let refund =
            self.api.create_refund(account, payment_intent, amount, idempotency_key).await.map_err(gateway_error)?;
        Ok(GatewayRefund { id: refund.id })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        let event = self.api.verify_webhook(payload, signature).map_err(webhook_error)?;
        debug!("💳️ Verified webhook event {} ({})", event.id, event.event_type);
        Ok(gateway_event(event))
    }

    async fn create_connected_account(&self, profile: &VendorProfile) -> Result<ConnectedAccount, GatewayError> {
        let account = self.api.create_account(&profile.email, &profile.store).await.map_err(gateway_error)?;
        Ok(ConnectedAccount { id: account.id })
    }

    async fn create_onboarding_session(&self, account: &str) -> Result<OnboardingSession, GatewayError> {
        let session = self.api.create_account_session(account).await.map_err(gateway_error)?;
        Ok(OnboardingSession { account_id: session.account, session_secret: session.client_secret })
    }
}
