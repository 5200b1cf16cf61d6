use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::json;

use crate::{
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

/// The only signature [`FakeGateway::verify_webhook`] accepts.
pub const FAKE_WEBHOOK_SIGNATURE: &str = "t=0,v1=fake-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIntent {
    pub id: String,
    pub account: String,
    pub amount: Cents,
    pub application_fee: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRefund {
    pub id: String,
    pub account: String,
    pub payment_intent: String,
    pub amount: Cents,
    pub idempotency_key: String,
}

#[derive(Debug, Default)]
struct FakeGatewayState {
    counter: u64,
    intents: Vec<RecordedIntent>,
    refunds: Vec<RecordedRefund>,
    accounts: Vec<String>,
    reject_refunds: bool,
    drop_refund_responses: bool,
    reject_intents: bool,
}

/// An in-memory payment processor. It records every request and understands a simple JSON webhook format:
///
/// ```json
/// {"id": "evt_1", "type": "payment_intent.succeeded", "payment_intent": "pi_1"}
/// {"id": "evt_2", "type": "account.updated", "account": "acct_1", "charges_enabled": true}
/// ```
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeGatewayState>>,
}

#[derive(Deserialize)]
struct FakeWebhook {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    payment_intent: Option<String>,
    account: Option<String>,
    charges_enabled: Option<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> Vec<RecordedIntent> {
        self.state.lock().unwrap().intents.clone()
    }

    pub fn last_intent(&self) -> Option<RecordedIntent> {
        self.state.lock().unwrap().intents.last().cloned()
    }

    pub fn refunds(&self) -> Vec<RecordedRefund> {
        self.state.lock().unwrap().refunds.clone()
    }

    pub fn accounts(&self) -> Vec<String> {
        self.state.lock().unwrap().accounts.clone()
    }

    pub fn reject_refunds(&self, reject: bool) {
        self.state.lock().unwrap().reject_refunds = reject;
    }

    /// Issues refunds as usual, but answers with a connection error, as if the response had been lost on the way back.
    pub fn drop_refund_responses(&self, drop: bool) {
        self.state.lock().unwrap().drop_refund_responses = drop;
    }

    pub fn reject_intents(&self, reject: bool) {
        self.state.lock().unwrap().reject_intents = reject;
    }

    /// A webhook body for a payment event, in the format this gateway understands.
    pub fn payment_webhook(event_id: &str, event_type: &str, payment_intent: &str) -> Vec<u8> {
        json!({"id": event_id, "type": event_type, "payment_intent": payment_intent}).to_string().into_bytes()
    }

    pub fn account_webhook(event_id: &str, account: &str, charges_enabled: bool) -> Vec<u8> {
        json!({"id": event_id, "type": "account.updated", "account": account, "charges_enabled": charges_enabled})
            .to_string()
            .into_bytes()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        format!("{prefix}_{:04}", state.counter)
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        account: &str,
        amount: Cents,
        application_fee: Cents,
    ) -> Result<PaymentIntent, GatewayError> {
        if self.state.lock().unwrap().reject_intents {
            return Err(GatewayError::Unavailable("The fake gateway is offline".into()));
        }
        let id = self.next_id("pi");
        let intent = RecordedIntent { id: id.clone(), account: account.to_string(), amount, application_fee };
        self.state.lock().unwrap().intents.push(intent);
        Ok(PaymentIntent { client_secret: format!("{id}_secret"), id })
    }

    async fn create_refund(
        &self,
        account: &str,
        payment_intent: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        if self.state.lock().unwrap().reject_refunds {
            return Err(GatewayError::Rejected("Refunds are disabled on the fake gateway".into()));
        }
        let replayed = self.state.lock().unwrap().refunds.iter().find(|r| r.idempotency_key == idempotency_key).cloned();
        if let Some(refund) = replayed {
            if self.state.lock().unwrap().drop_refund_responses {
                return Err(GatewayError::Unavailable("Connection reset by peer".into()));
            }
            return Ok(GatewayRefund { id: refund.id });
        }
        let id = self.next_id("re");
        let refund = RecordedRefund {
            id: id.clone(),
            account: account.to_string(),
            payment_intent: payment_intent.to_string(),
            amount,
            idempotency_key: idempotency_key.to_string(),
        };
        let mut state = self.state.lock().unwrap();
        state.refunds.push(refund);
        if state.drop_refund_responses {
            return Err(GatewayError::Unavailable("Connection reset by peer".into()));
        }
        Ok(GatewayRefund { id })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        if signature != FAKE_WEBHOOK_SIGNATURE {
            return Err(GatewayError::SignatureInvalid("Signature mismatch".into()));
        }
        let hook: FakeWebhook =
            serde_json::from_slice(payload).map_err(|e| GatewayError::SignatureInvalid(e.to_string()))?;
        let kind = match hook.event_type.as_str() {
            "payment_intent.succeeded" => Some(PaymentEventKind::Succeeded),
            "payment_intent.canceled" => Some(PaymentEventKind::Canceled),
            "payment_intent.payment_failed" => Some(PaymentEventKind::Failed),
            _ => None,
        };
        let event = match (kind, hook.payment_intent, hook.account) {
            (Some(kind), Some(payment_intent), _) => {
                GatewayEvent::Payment(PaymentEvent { id: hook.id, payment_intent, kind })
            },
            (None, _, Some(account_id)) if hook.event_type == "account.updated" => GatewayEvent::AccountUpdated {
                account_id,
                charges_enabled: hook.charges_enabled.unwrap_or(false),
            },
            _ => GatewayEvent::Unhandled { id: hook.id, event_type: hook.event_type },
        };
        Ok(event)
    }

    async fn create_connected_account(&self, _profile: &VendorProfile) -> Result<ConnectedAccount, GatewayError> {
        let id = self.next_id("acct");
        self.state.lock().unwrap().accounts.push(id.clone());
        Ok(ConnectedAccount { id })
    }

    async fn create_onboarding_session(&self, account: &str) -> Result<OnboardingSession, GatewayError> {
        Ok(OnboardingSession { account_id: account.to_string(), session_secret: format!("{account}_session") })
    }
}
